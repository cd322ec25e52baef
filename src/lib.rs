//! scplayer - playback orchestration for a SoundCloud streaming client
//!
//! The [`player`] task owns playback state and the connection to an
//! out-of-process engine. [`likes`] and [`library`] supply the data that
//! feeds the queue; [`presenter`] and [`console`] are UI surfaces over the
//! player's events.

pub mod api;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod library;
pub mod likes;
pub mod logging;
pub mod model;
pub mod player;
pub mod presenter;
