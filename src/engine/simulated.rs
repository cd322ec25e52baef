//! In-process stand-in for the engine host.
//!
//! Keeps a wall-clock position for whatever stream it was told to play and
//! reports the end of track after a fixed length. Used by the binary when no
//! real renderer is attached, so the queue, auto-advance and notification paths
//! can be driven end to end.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{EngineConnection, EngineEvent, EngineHost, EngineState, PlaybackEngine};
use crate::model::StreamLocator;

const TICK_INTERVAL: Duration = Duration::from_millis(250);
const PREVIEW_LENGTH_MS: u64 = 30_000;

#[derive(Default)]
struct SimState {
    stream: Option<StreamLocator>,
    playing: bool,
    position_ms: u64,
    resumed_at: Option<Instant>,
    length_ms: u64,
}

impl SimState {
    fn position(&self) -> u64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.position_ms + running).min(self.length_ms)
    }

    fn freeze(&mut self) {
        self.position_ms = self.position();
        self.resumed_at = None;
    }
}

struct SimulatedEngine {
    state: Arc<Mutex<SimState>>,
    events: mpsc::UnboundedSender<EngineEvent>,
    track_length_ms: u64,
}

impl SimulatedEngine {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

impl SimulatedEngine {
    fn open(&self, stream: &StreamLocator, start: bool) {
        tracing::info!(url = %stream.url, tier = %stream.tier, start, "Simulated engine loading stream");
        {
            let mut state = self.state();
            state.length_ms = if stream.tier.is_preview() {
                PREVIEW_LENGTH_MS
            } else {
                self.track_length_ms
            };
            state.stream = Some(stream.clone());
            state.position_ms = 0;
            state.playing = start;
            state.resumed_at = start.then(Instant::now);
        }
        self.emit(EngineEvent::StateChanged(EngineState::Buffering));
        self.emit(EngineEvent::StateChanged(if start {
            EngineState::Playing
        } else {
            EngineState::Paused
        }));
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn play(&self, stream: &StreamLocator) {
        self.open(stream, true);
    }

    fn load(&self, stream: &StreamLocator) {
        self.open(stream, false);
    }

    fn pause(&self) {
        let changed = {
            let mut state = self.state();
            let was_playing = state.playing;
            state.freeze();
            state.playing = false;
            was_playing
        };
        if changed {
            self.emit(EngineEvent::StateChanged(EngineState::Paused));
        }
    }

    fn resume(&self) {
        let changed = {
            let mut state = self.state();
            if state.stream.is_none() || state.playing {
                false
            } else {
                state.playing = true;
                state.resumed_at = Some(Instant::now());
                true
            }
        };
        if changed {
            self.emit(EngineEvent::StateChanged(EngineState::Playing));
        }
    }

    fn seek(&self, position_ms: u64) {
        let mut state = self.state();
        state.position_ms = position_ms.min(state.length_ms);
        if state.playing {
            state.resumed_at = Some(Instant::now());
        }
    }

    fn position_ms(&self) -> u64 {
        self.state().position()
    }

    fn duration_ms(&self) -> u64 {
        self.state().length_ms
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }
}

/// Engine host that runs the simulated engine inside this process.
#[derive(Clone)]
pub struct SimulatedEngineHost {
    track_length_ms: u64,
    handshake_delay: Duration,
}

impl SimulatedEngineHost {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length_ms: track_length.as_millis() as u64,
            handshake_delay: Duration::from_millis(50),
        }
    }

    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }
}

#[async_trait]
impl EngineHost for SimulatedEngineHost {
    async fn connect(&self) -> Result<EngineConnection> {
        tokio::time::sleep(self.handshake_delay).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(SimState::default()));
        let engine = Arc::new(SimulatedEngine {
            state: state.clone(),
            events: tx.clone(),
            track_length_ms: self.track_length_ms,
        });

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                let ended = {
                    let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
                    if state.playing && state.length_ms > 0 && state.position() >= state.length_ms {
                        state.freeze();
                        state.playing = false;
                        true
                    } else {
                        false
                    }
                };
                if ended {
                    tracing::debug!("Simulated engine reached end of stream");
                    let _ = tx.send(EngineEvent::StateChanged(EngineState::Idle));
                    let _ = tx.send(EngineEvent::TrackEnded);
                }
            }
        });

        tracing::info!("Simulated engine host connected");
        Ok(EngineConnection { engine, events: rx })
    }
}
