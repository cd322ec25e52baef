//! Transport and queue operations

use crate::config::ModePolicy;
use crate::error::PlayerError;
use crate::model::{PlaybackPhase, StreamLocator, Track, TrackId};

use super::commands::Command;
use super::{Orchestrator, PlayerEvent};

impl Orchestrator {
    /// Standalone play request. Keeps queue navigation anchored on the track
    /// when it is part of the queue.
    pub(super) fn play_requested(&mut self, track: Track) {
        if let Some(index) = self.queue.position_of(track.id) {
            self.state.current_index = Some(index);
        }
        self.play_track(track);
    }

    /// Make `track` current, mark it playing and start resolving its stream.
    pub(super) fn play_track(&mut self, track: Track) {
        tracing::info!(track_id = %track.id, title = %track.title, index = ?self.state.current_index, "Playing track");

        self.state.current_track = Some(track.clone());
        self.state.is_playing = true;
        self.state.phase = PlaybackPhase::Resolving;
        self.state.last_error = None;
        self.state.timing.reset(track.duration_ms);

        self.spawn_resolution(track.id);

        self.emit(PlayerEvent::TrackChanged {
            track,
            index: self.state.current_index,
        });
        self.emit(PlayerEvent::PlayStateChanged { is_playing: true });
    }

    fn spawn_resolution(&mut self, track_id: TrackId) {
        self.resolution += 1;
        let request = self.resolution;
        let resolver = self.resolver.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(track_id).await;
            let _ = commands.send(Command::StreamResolved { request, track_id, result });
        });
    }

    /// Apply a resolution result if it answers the request still pending.
    pub(super) fn stream_resolved(
        &mut self,
        request: u64,
        track_id: TrackId,
        result: Result<StreamLocator, PlayerError>,
    ) {
        let current = self.state.current_track.as_ref().map(|t| t.id);
        if request != self.resolution || current != Some(track_id) {
            tracing::debug!(request, %track_id, current = ?current, "Discarding stale stream resolution");
            return;
        }
        if self.state.phase != PlaybackPhase::Resolving {
            tracing::debug!(%track_id, phase = ?self.state.phase, "Discarding resolution, playback moved on");
            return;
        }

        match result {
            Ok(stream) => {
                tracing::debug!(%track_id, tier = %stream.tier, playing = self.state.is_playing, "Stream resolved");
                let sent = if self.state.is_playing {
                    self.bridge.play(&stream)
                } else {
                    // Paused or stopped while resolving; load but hold.
                    self.bridge.load(&stream)
                };
                if sent.is_err() {
                    tracing::warn!(%track_id, "Resolved stream not handed to engine");
                }
                self.state.phase = if self.state.is_playing {
                    PlaybackPhase::Playing
                } else {
                    PlaybackPhase::Paused
                };
            }
            Err(error) => {
                tracing::error!(%track_id, error = %error, "Stream resolution failed");
                self.fail_playback(error);
            }
        }
    }

    /// Return to idle and report `error`.
    pub(super) fn fail_playback(&mut self, error: PlayerError) {
        self.state.phase = PlaybackPhase::Idle;
        self.state.last_error = Some(error.clone());
        if self.state.is_playing {
            self.state.is_playing = false;
            self.emit(PlayerEvent::PlayStateChanged { is_playing: false });
        }
        self.emit(PlayerEvent::Error(error));
    }

    pub(super) fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        tracing::info!(len = tracks.len(), start_index, shuffle = self.state.shuffle_enabled, "Setting queue");

        self.queue.replace(tracks);
        let start = self.queue.get(start_index).cloned();

        if self.state.shuffle_enabled {
            self.queue.shuffle(&mut self.rng);
        }

        match start {
            Some(track) => {
                self.state.current_index = self.queue.position_of(track.id);
                self.play_track(track);
            }
            None => {
                tracing::debug!(start_index, "Start index outside queue, not starting playback");
                self.state.current_index = None;
            }
        }
    }

    pub(super) fn toggle_play_pause(&mut self) {
        let is_playing = !self.state.is_playing;
        self.state.is_playing = is_playing;
        tracing::debug!(is_playing, "Toggling playback");

        let sent = if self.state.phase == PlaybackPhase::Resolving && is_playing {
            // The pending stream starts when it resolves.
            Ok(())
        } else if is_playing {
            self.bridge.resume()
        } else {
            self.bridge.pause()
        };
        if let Err(e) = sent {
            tracing::debug!(error = %e, "Toggle not forwarded to engine");
        }

        self.sync_phase_with_play_state();
        self.emit(PlayerEvent::PlayStateChanged { is_playing });
    }

    /// Keep the phase in line with `is_playing` once a stream is loaded.
    pub(super) fn sync_phase_with_play_state(&mut self) {
        if matches!(self.state.phase, PlaybackPhase::Playing | PlaybackPhase::Paused) {
            self.state.phase = if self.state.is_playing {
                PlaybackPhase::Playing
            } else {
                PlaybackPhase::Paused
            };
        }
    }

    pub(super) fn next(&mut self) {
        let index = if self.state.repeat_enabled {
            self.state
                .current_index
                .filter(|i| *i < self.queue.len())
                .or_else(|| self.queue.next_index(None))
        } else {
            self.queue.next_index(self.state.current_index)
        };
        self.play_at(index, "next");
    }

    pub(super) fn previous(&mut self) {
        let index = self.queue.previous_index(self.state.current_index);
        self.play_at(index, "previous");
    }

    fn play_at(&mut self, index: Option<usize>, operation: &'static str) {
        let Some((index, track)) = index.and_then(|i| self.queue.get(i).cloned().map(|t| (i, t))) else {
            tracing::debug!(operation, "Queue is empty, nothing to play");
            return;
        };
        self.state.current_index = Some(index);
        self.play_track(track);
    }

    pub(super) fn set_shuffle(&mut self, enabled: bool) {
        if self.state.shuffle_enabled == enabled {
            return;
        }
        if enabled && self.state.repeat_enabled {
            match self.policy {
                ModePolicy::KeepExisting => {
                    tracing::debug!("Shuffle request ignored while repeat is on");
                    return;
                }
                ModePolicy::LastRequestWins => self.state.repeat_enabled = false,
            }
        }

        self.state.shuffle_enabled = enabled;
        if enabled {
            self.queue.shuffle(&mut self.rng);
        } else {
            self.queue.restore_original();
        }
        self.relocate_current();

        tracing::info!(shuffle = enabled, repeat = self.state.repeat_enabled, "Shuffle changed");
        self.emit_modes();
    }

    pub(super) fn set_repeat(&mut self, enabled: bool) {
        if self.state.repeat_enabled == enabled {
            return;
        }
        if enabled && self.state.shuffle_enabled {
            match self.policy {
                ModePolicy::KeepExisting => {
                    tracing::debug!("Repeat request ignored while shuffle is on");
                    return;
                }
                ModePolicy::LastRequestWins => {
                    self.state.shuffle_enabled = false;
                    self.queue.restore_original();
                    self.relocate_current();
                }
            }
        }

        self.state.repeat_enabled = enabled;
        tracing::info!(shuffle = self.state.shuffle_enabled, repeat = enabled, "Repeat changed");
        self.emit_modes();
    }

    fn emit_modes(&self) {
        self.emit(PlayerEvent::ShuffleRepeatChanged {
            shuffle: self.state.shuffle_enabled,
            repeat: self.state.repeat_enabled,
        });
    }

    /// Point the index back at the current track after a reorder. Left alone
    /// when the track is not in the queue.
    fn relocate_current(&mut self) {
        let Some(id) = self.state.current_track.as_ref().map(|t| t.id) else {
            return;
        };
        if let Some(index) = self.queue.position_of(id) {
            self.state.current_index = Some(index);
        }
    }

    pub(super) fn seek(&mut self, position_ms: u64) {
        if let Err(e) = self.bridge.seek(position_ms) {
            tracing::debug!(position_ms, error = %e, "Seek not forwarded to engine");
        }
    }

    pub(super) fn stop(&mut self) {
        tracing::info!("Stopping playback");
        if let Err(e) = self.bridge.pause() {
            tracing::debug!(error = %e, "Stop not forwarded to engine");
        }
        self.state.is_playing = false;
        // A pending resolution still loads the stream, held.
        if matches!(self.state.phase, PlaybackPhase::Playing | PlaybackPhase::Paused) {
            self.state.phase = PlaybackPhase::Paused;
        }
        self.emit(PlayerEvent::PlayStateChanged { is_playing: false });
    }

    pub(super) fn poll_position(&mut self) {
        // The engine still reports the previous stream until the new one loads.
        if self.state.phase == PlaybackPhase::Resolving {
            return;
        }
        if let Ok((position_ms, duration_ms)) = self.bridge.progress() {
            self.state.timing.update_position(position_ms);
            if duration_ms > 0 {
                self.state.timing.duration_ms = duration_ms;
            }
        }
    }
}
