//! Remote API surface consumed by the player core.
//!
//! The traits are the seams the resolver, the like manager and the library
//! loader are written against; [`SoundCloudClient`] is the HTTP implementation.

mod soundcloud;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{Playlist, StreamCandidate, Track, TrackId};

pub use soundcloud::SoundCloudClient;

/// Stream resolution endpoint.
#[async_trait]
pub trait StreamApi: Send + Sync {
    /// Every stream flavour the server knows for `track_id`, in any order.
    async fn resolve_stream(&self, track_id: TrackId) -> Result<Vec<StreamCandidate>, ApiError>;
}

/// The user's liked-tracks collection.
#[async_trait]
pub trait LikeApi: Send + Sync {
    async fn list_liked(&self, limit: u32, offset: u32) -> Result<Vec<Track>, ApiError>;
    async fn like(&self, track_id: TrackId) -> Result<(), ApiError>;
    async fn unlike(&self, track_id: TrackId) -> Result<(), ApiError>;
}

/// Listings used as queue sources.
#[async_trait]
pub trait LibraryApi: Send + Sync {
    async fn user_playlists(&self, limit: u32) -> Result<Vec<Playlist>, ApiError>;
    async fn liked_playlists(&self, limit: u32, offset: u32) -> Result<Vec<Playlist>, ApiError>;
    async fn playlist_tracks(&self, playlist: &Playlist, limit: u32) -> Result<Vec<Track>, ApiError>;
    /// Free-text track search.
    async fn search_tracks(&self, query: &str, limit: u32, offset: u32) -> Result<Vec<Track>, ApiError>;
    /// Playable tracks similar to `track_id`.
    async fn related_tracks(&self, track_id: TrackId, limit: u32) -> Result<Vec<Track>, ApiError>;
}
