//! Messages processed by the player task

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::engine::{EngineEvent, PlaybackEngine};
use crate::error::PlayerError;
use crate::model::{PlaybackSnapshot, StreamLocator, Track, TrackId};

pub(crate) type CommandSender = mpsc::UnboundedSender<Command>;

pub(crate) enum Command {
    // Requests from UI surfaces
    PlayTrack(Track),
    SetQueue {
        tracks: Vec<Track>,
        start_index: usize,
    },
    TogglePlayPause,
    Next,
    Previous,
    SetShuffle(bool),
    SetRepeat(bool),
    Seek(u64),
    Stop,
    NotifyLikeChanged {
        track_id: TrackId,
        liked: bool,
    },
    InitializeEngine,
    PollPosition,
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    Shutdown,

    // Completions posted back by tasks the player spawned
    StreamResolved {
        request: u64,
        track_id: TrackId,
        result: Result<StreamLocator, PlayerError>,
    },
    EngineBound {
        generation: u64,
        engine: Arc<dyn PlaybackEngine>,
    },
    EngineEvent {
        generation: u64,
        event: EngineEvent,
    },
    EngineLost {
        generation: u64,
        reason: Option<String>,
    },
}

impl Command {
    /// Short name for logs.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::PlayTrack(_) => "play_track",
            Command::SetQueue { .. } => "set_queue",
            Command::TogglePlayPause => "toggle_play_pause",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::SetShuffle(_) => "set_shuffle",
            Command::SetRepeat(_) => "set_repeat",
            Command::Seek(_) => "seek",
            Command::Stop => "stop",
            Command::NotifyLikeChanged { .. } => "notify_like_changed",
            Command::InitializeEngine => "initialize_engine",
            Command::PollPosition => "poll_position",
            Command::Snapshot(_) => "snapshot",
            Command::Shutdown => "shutdown",
            Command::StreamResolved { .. } => "stream_resolved",
            Command::EngineBound { .. } => "engine_bound",
            Command::EngineEvent { .. } => "engine_event",
            Command::EngineLost { .. } => "engine_lost",
        }
    }
}
