//! Engine binding lifecycle and engine callbacks

use std::sync::Arc;

use crate::engine::{EngineEvent, EngineState, PlaybackEngine};
use crate::error::PlayerError;
use crate::model::PlaybackPhase;

use super::{Orchestrator, PlayerEvent};

impl Orchestrator {
    /// Handshake finished: adopt the engine's play state if it disagrees.
    pub(super) fn engine_bound(&mut self, generation: u64, engine: Arc<dyn PlaybackEngine>) {
        let engine_playing = engine.is_playing();
        if !self.bridge.on_bound(generation, engine) {
            return;
        }

        tracing::info!(generation, engine_playing, logical_playing = self.state.is_playing, "Engine bound");
        if engine_playing != self.state.is_playing {
            tracing::info!(engine_playing, "Reconciling play state with engine");
            self.state.is_playing = engine_playing;
            self.sync_phase_with_play_state();
            self.emit(PlayerEvent::PlayStateChanged {
                is_playing: engine_playing,
            });
        }
    }

    /// The binding is gone. Play state drops to paused; no reconnect is attempted.
    pub(super) fn engine_lost(&mut self, generation: u64, reason: Option<String>) {
        if !self.bridge.on_lost(generation) {
            tracing::debug!(generation, "Ignoring loss of a stale engine binding");
            return;
        }

        tracing::warn!(generation, reason = reason.as_deref().unwrap_or("event stream closed"), "Engine disconnected");
        self.state.is_playing = false;
        if self.state.phase != PlaybackPhase::Idle {
            self.state.phase = PlaybackPhase::Paused;
        }
        self.state.last_error = Some(PlayerError::EngineDisconnected);
        self.emit(PlayerEvent::PlayStateChanged { is_playing: false });
        self.emit(PlayerEvent::Error(PlayerError::EngineDisconnected));
    }

    pub(super) fn engine_event(&mut self, generation: u64, event: EngineEvent) {
        if !self.bridge.is_current(generation) {
            tracing::debug!(generation, ?event, "Dropping event from stale engine binding");
            return;
        }

        match event {
            EngineEvent::StateChanged(state) => self.engine_state_changed(state),
            EngineEvent::TrackEnded => self.track_ended(),
            EngineEvent::Error(message) if self.state.phase == PlaybackPhase::Resolving => {
                tracing::debug!(%message, "Ignoring engine error for the previous stream");
            }
            EngineEvent::Error(message) => {
                tracing::error!(%message, "Engine reported an error");
                self.fail_playback(PlayerError::Engine(message));
            }
        }
    }

    fn engine_state_changed(&mut self, state: EngineState) {
        // Until the new stream is handed over, the engine is describing the previous one.
        if self.state.phase == PlaybackPhase::Resolving {
            tracing::trace!(?state, "Ignoring engine state while resolving");
            return;
        }
        let Some(engine_playing) = state.is_playing() else {
            return;
        };
        if engine_playing == self.state.is_playing {
            return;
        }

        tracing::debug!(?state, "Engine changed play state");
        self.state.is_playing = engine_playing;
        if state == EngineState::Idle {
            self.state.phase = PlaybackPhase::Idle;
        } else {
            self.sync_phase_with_play_state();
        }
        self.emit(PlayerEvent::PlayStateChanged {
            is_playing: engine_playing,
        });
    }

    fn track_ended(&mut self) {
        if self.state.phase == PlaybackPhase::Resolving {
            tracing::trace!("Ignoring end of previous stream");
            return;
        }

        if self.queue.is_empty() {
            tracing::debug!("Track ended with empty queue, going idle");
            self.state.phase = PlaybackPhase::Idle;
            if self.state.is_playing {
                self.state.is_playing = false;
                self.emit(PlayerEvent::PlayStateChanged { is_playing: false });
            }
            return;
        }

        tracing::debug!("Track ended, advancing");
        self.next();
    }
}
