//! Contract with the out-of-process playback engine.
//!
//! The engine decodes and renders audio; the player core only issues
//! fire-and-forget commands and consumes the events it emits. An
//! [`EngineHost`] performs the bind handshake and hands back a command handle
//! plus the event stream for that binding. The stream ending means the
//! connection was lost.

mod simulated;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::model::StreamLocator;

pub use simulated::SimulatedEngineHost;

/// Connection lifecycle of the engine bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unbound,
    Binding,
    Bound,
    Disconnected,
}

/// Render state reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

impl EngineState {
    /// `None` when the state says nothing about play/pause (buffering).
    pub fn is_playing(&self) -> Option<bool> {
        match self {
            EngineState::Playing => Some(true),
            EngineState::Paused | EngineState::Idle => Some(false),
            EngineState::Buffering => None,
        }
    }
}

/// Callbacks emitted by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged(EngineState),
    TrackEnded,
    Error(String),
}

/// Commands accepted by a bound engine.
pub trait PlaybackEngine: Send + Sync {
    fn play(&self, stream: &StreamLocator);
    /// Load `stream` paused at the start, ready for `resume`.
    fn load(&self, stream: &StreamLocator);
    fn pause(&self);
    fn resume(&self);
    fn seek(&self, position_ms: u64);
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;
    fn is_playing(&self) -> bool;
}

/// Result of a completed bind handshake.
pub struct EngineConnection {
    pub engine: Arc<dyn PlaybackEngine>,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

/// Starts or reaches the process hosting the engine.
#[async_trait]
pub trait EngineHost: Send + Sync {
    /// Performs the handshake. May take arbitrarily long; callers do not time out.
    async fn connect(&self) -> Result<EngineConnection>;
}
