//! Error taxonomy shared by the playback core.
//!
//! `PlayerError` travels inside events and snapshots, so every variant carries
//! owned, cloneable data instead of wrapping transport error types.

use thiserror::Error;

use crate::engine::ConnectionState;
use crate::model::TrackId;

/// Why a like/unlike round-trip did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LikeFailure {
    #[error("server answered with HTTP {0}")]
    Http(u16),
    #[error("network error: {0}")]
    Network(String),
}

/// Errors surfaced by the orchestrator and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// The resolver returned no playable candidate.
    #[error("no stream available for track {track_id}")]
    StreamUnavailable { track_id: TrackId },

    /// Transport failure while resolving a stream.
    #[error("failed to load stream for track {track_id}: {message}")]
    ResolutionNetwork { track_id: TrackId, message: String },

    /// Decode or render failure reported by the engine.
    #[error("playback engine error: {0}")]
    Engine(String),

    /// The connection to the engine host was lost.
    #[error("playback engine disconnected")]
    EngineDisconnected,

    #[error("like toggle failed: {0}")]
    LikeToggleFailed(LikeFailure),
}

/// Errors from the remote API layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<ApiError> for LikeFailure {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { status } => LikeFailure::Http(status),
            other => LikeFailure::Network(other.to_string()),
        }
    }
}

/// A bridge command was dropped because no engine is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineCommandError {
    #[error("engine not bound (connection is {0:?})")]
    NotBound(ConnectionState),
}
