//! Playback-related types and state management

use std::time::Instant;

use super::track::Track;
use crate::engine::ConnectionState;
use crate::error::PlayerError;

/// Where the orchestrator is in the play lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// A stream locator is being fetched for the current track.
    Resolving,
    Playing,
    Paused,
}

/// Position tracking between engine polls, for smooth progress display
#[derive(Clone, Debug)]
pub struct PlaybackTiming {
    pub position_ms: u64,
    pub last_update: Instant,
    pub duration_ms: u64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            position_ms: 0,
            last_update: Instant::now(),
            duration_ms: 0,
        }
    }
}

impl PlaybackTiming {
    /// Last polled position, extrapolated by wall time while playing.
    pub fn current_position_ms(&self, is_playing: bool) -> u64 {
        if is_playing && self.duration_ms > 0 {
            let elapsed = self.last_update.elapsed().as_millis() as u64;
            self.position_ms.saturating_add(elapsed).min(self.duration_ms)
        } else {
            self.position_ms
        }
    }

    pub fn update_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
        self.last_update = Instant::now();
    }

    pub fn reset(&mut self, duration_ms: u64) {
        self.position_ms = 0;
        self.duration_ms = duration_ms;
        self.last_update = Instant::now();
    }
}

/// Logical playback state owned by the orchestrator.
#[derive(Clone, Debug, Default)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub shuffle_enabled: bool,
    pub repeat_enabled: bool,
    pub phase: PlaybackPhase,
    pub timing: PlaybackTiming,
    pub last_error: Option<PlayerError>,
}

/// Read-only copy of the orchestrator state handed to consumers
#[derive(Clone, Debug)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub queue: Vec<Track>,
    pub is_playing: bool,
    pub shuffle_enabled: bool,
    pub repeat_enabled: bool,
    pub phase: PlaybackPhase,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub connection: ConnectionState,
    pub last_error: Option<PlayerError>,
}
