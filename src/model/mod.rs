//! Model module - playback data types and state
//!
//! - `track`: Track and playlist metadata
//! - `queue`: Play queue with reversible shuffle
//! - `playback`: Playback state, timing and snapshots
//! - `stream`: Stream candidates and resolved locators
//! - `cache`: Liked-track id set with disk persistence

mod cache;
mod playback;
mod queue;
mod stream;
mod track;

pub use cache::LikedTracksCache;
pub use playback::{PlaybackPhase, PlaybackSnapshot, PlaybackState, PlaybackTiming};
pub use queue::Queue;
pub use stream::{QualityTier, StreamCandidate, StreamLocator};
pub use track::{LIKED_SONGS_PLAYLIST_ID, Playlist, RELATED_PLAYLIST_ID, Track, TrackId};
