//! Connection to the playback engine
//!
//! Commands are forwarded only while a binding is established. Anything issued
//! while unbound, binding or disconnected is dropped and reported back as
//! [`EngineCommandError::NotBound`]; nothing is queued for replay.

use std::sync::Arc;

use tokio::sync::watch;

use super::commands::{Command, CommandSender};
use crate::engine::{ConnectionState, EngineConnection, EngineHost, PlaybackEngine};
use crate::error::EngineCommandError;
use crate::model::StreamLocator;

pub(crate) struct EngineBridge {
    host: Arc<dyn EngineHost>,
    engine: Option<Arc<dyn PlaybackEngine>>,
    /// Bumped on every bind attempt; completions from older attempts are stale.
    generation: u64,
    state: watch::Sender<ConnectionState>,
}

impl EngineBridge {
    pub(crate) fn new(host: Arc<dyn EngineHost>) -> (Self, watch::Receiver<ConnectionState>) {
        let (state, rx) = watch::channel(ConnectionState::Unbound);
        let bridge = Self {
            host,
            engine: None,
            generation: 0,
            state,
        };
        (bridge, rx)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = ?previous, to = ?next, "Engine connection state changed");
        }
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Start a bind attempt unless one is in flight or already established.
    pub(crate) fn begin_bind(&mut self, commands: &CommandSender) -> bool {
        match self.state() {
            ConnectionState::Binding | ConnectionState::Bound => {
                tracing::debug!(state = ?self.state(), "Engine bind already in progress or established");
                false
            }
            ConnectionState::Unbound | ConnectionState::Disconnected => {
                self.generation += 1;
                self.set_state(ConnectionState::Binding);
                spawn_binding(self.host.clone(), self.generation, commands.clone());
                true
            }
        }
    }

    /// Accept a finished handshake. Returns `false` for a stale generation.
    pub(crate) fn on_bound(&mut self, generation: u64, engine: Arc<dyn PlaybackEngine>) -> bool {
        if !self.is_current(generation) || self.state() != ConnectionState::Binding {
            tracing::debug!(generation, current = self.generation, "Ignoring stale engine binding");
            return false;
        }
        self.engine = Some(engine);
        self.set_state(ConnectionState::Bound);
        true
    }

    /// Drop the binding after its event stream ended or the handshake failed.
    pub(crate) fn on_lost(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        match self.state() {
            ConnectionState::Binding | ConnectionState::Bound => {
                self.engine = None;
                self.set_state(ConnectionState::Disconnected);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn bound_engine(&self) -> Option<&Arc<dyn PlaybackEngine>> {
        match self.state() {
            ConnectionState::Bound => self.engine.as_ref(),
            _ => None,
        }
    }

    fn with_engine<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&dyn PlaybackEngine) -> T,
    ) -> Result<T, EngineCommandError> {
        match self.bound_engine() {
            Some(engine) => Ok(f(engine.as_ref())),
            None => {
                let state = self.state();
                tracing::debug!(operation, ?state, "Engine command dropped");
                Err(EngineCommandError::NotBound(state))
            }
        }
    }

    pub(crate) fn play(&self, stream: &StreamLocator) -> Result<(), EngineCommandError> {
        self.with_engine("play", |engine| engine.play(stream))
    }

    pub(crate) fn load(&self, stream: &StreamLocator) -> Result<(), EngineCommandError> {
        self.with_engine("load", |engine| engine.load(stream))
    }

    pub(crate) fn pause(&self) -> Result<(), EngineCommandError> {
        self.with_engine("pause", |engine| engine.pause())
    }

    pub(crate) fn resume(&self) -> Result<(), EngineCommandError> {
        self.with_engine("resume", |engine| engine.resume())
    }

    pub(crate) fn seek(&self, position_ms: u64) -> Result<(), EngineCommandError> {
        self.with_engine("seek", |engine| engine.seek(position_ms))
    }

    /// Current `(position, duration)` reported by the engine.
    pub(crate) fn progress(&self) -> Result<(u64, u64), EngineCommandError> {
        self.with_engine("progress", |engine| (engine.position_ms(), engine.duration_ms()))
    }
}

/// Run the handshake, then forward engine events tagged with `generation`
/// until the stream closes.
fn spawn_binding(host: Arc<dyn EngineHost>, generation: u64, commands: CommandSender) {
    tracing::info!(generation, "Binding to playback engine");

    tokio::spawn(async move {
        let EngineConnection { engine, mut events } = match host.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(generation, error = %e, "Engine handshake failed");
                let _ = commands.send(Command::EngineLost {
                    generation,
                    reason: Some(e.to_string()),
                });
                return;
            }
        };

        if commands.send(Command::EngineBound { generation, engine }).is_err() {
            return;
        }

        while let Some(event) = events.recv().await {
            tracing::trace!(generation, ?event, "Engine event");
            if commands.send(Command::EngineEvent { generation, event }).is_err() {
                tracing::debug!(generation, "Player task gone, engine event pump exiting");
                return;
            }
        }

        tracing::warn!(generation, "Engine event stream closed");
        let _ = commands.send(Command::EngineLost {
            generation,
            reason: None,
        });
    });
}
