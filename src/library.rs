//! Queue sources: liked tracks, playlists, search and related tracks

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::LibraryApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::likes::LikeStateManager;
use crate::model::{Playlist, Track, TrackId};

/// Page sizes for library requests.
#[derive(Clone, Copy, Debug)]
pub struct LibraryLimits {
    pub liked_tracks: u32,
    pub playlist_tracks: u32,
    pub playlists: u32,
    pub search: u32,
    pub related_tracks: u32,
}

impl From<&Config> for LibraryLimits {
    fn from(config: &Config) -> Self {
        Self {
            liked_tracks: config.liked_tracks_limit,
            playlist_tracks: config.playlist_tracks_limit,
            playlists: config.playlists_limit,
            search: config.search_limit,
            related_tracks: config.related_tracks_limit,
        }
    }
}

/// Everything the library screen lists.
#[derive(Clone, Debug, Default)]
pub struct LibraryListing {
    /// The liked-songs and related entries first when non-empty, then playlists.
    pub playlists: Vec<Playlist>,
    pub liked_tracks: Vec<Track>,
    pub related_tracks: Vec<Track>,
}

#[derive(Clone)]
pub struct Library {
    api: Arc<dyn LibraryApi>,
    likes: LikeStateManager,
    limits: LibraryLimits,
}

impl Library {
    pub fn new(api: Arc<dyn LibraryApi>, likes: LikeStateManager, limits: LibraryLimits) -> Self {
        Self { api, likes, limits }
    }

    /// Liked tracks, newest first. Also refreshes the like set.
    pub async fn liked_tracks(&self) -> Result<Vec<Track>, ApiError> {
        self.likes.load_liked_tracks(self.limits.liked_tracks).await
    }

    /// The user's playlists followed by liked playlists not already listed.
    ///
    /// Falls back to liked playlists alone when the user's list fails, and to
    /// an empty list when both fail.
    pub async fn playlists(&self) -> Vec<Playlist> {
        let limit = self.limits.playlists;
        let (user, liked) = futures::future::join(
            self.api.user_playlists(limit),
            self.api.liked_playlists(limit, 0),
        )
        .await;

        match (user, liked) {
            (Ok(user), Ok(liked)) => merge_playlists(user, liked),
            (Ok(user), Err(e)) => {
                tracing::warn!(error = %e, "Liked playlists unavailable, showing own playlists only");
                user
            }
            (Err(e), Ok(liked)) => {
                tracing::warn!(error = %e, "Own playlists unavailable, showing liked playlists only");
                liked
            }
            (Err(user_err), Err(liked_err)) => {
                tracing::error!(user_error = %user_err, liked_error = %liked_err, "No playlists could be loaded");
                Vec::new()
            }
        }
    }

    /// Tracks matching `query`. A blank query matches nothing and sends no request.
    pub async fn search(&self, query: &str) -> Result<Vec<Track>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(query, "Searching tracks");
        self.api.search_tracks(query, self.limits.search, 0).await
    }

    /// Tracks related to the most recent like; empty when nothing is liked.
    pub async fn related_tracks(&self) -> Result<Vec<Track>, ApiError> {
        match self.likes.latest_liked().await? {
            Some(seed) => self.related_to(seed.id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn related_to(&self, seed: TrackId) -> Result<Vec<Track>, ApiError> {
        tracing::debug!(%seed, "Loading related tracks");
        self.api.related_tracks(seed, self.limits.related_tracks).await
    }

    /// Liked tracks, related tracks and playlists.
    pub async fn listing(&self) -> LibraryListing {
        let (liked, playlists) = futures::future::join(self.liked_tracks(), self.playlists()).await;
        let liked_tracks = liked.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Liked tracks unavailable");
            Vec::new()
        });

        // Liked tracks come newest first, so the head seeds the related feed.
        let related_tracks = match liked_tracks.first() {
            Some(seed) => self.related_to(seed.id).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Related tracks unavailable");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut all = Vec::with_capacity(playlists.len() + 2);
        if let Some(first) = liked_tracks.first() {
            all.push(Playlist {
                artwork_url: first.artwork_url.clone(),
                ..Playlist::liked_songs(liked_tracks.len() as u32)
            });
        }
        if let Some(first) = related_tracks.first() {
            all.push(Playlist {
                artwork_url: first.artwork_url.clone(),
                ..Playlist::related(related_tracks.len() as u32)
            });
        }
        all.extend(playlists);

        LibraryListing {
            playlists: all,
            liked_tracks,
            related_tracks,
        }
    }

    /// Tracks to queue for `playlist`. The pseudo-playlists map to liked and
    /// related tracks.
    pub async fn tracks_for(&self, playlist: &Playlist) -> Result<Vec<Track>, ApiError> {
        if playlist.is_liked_songs() {
            return self.liked_tracks().await;
        }
        if playlist.is_related() {
            return self.related_tracks().await;
        }
        tracing::debug!(playlist_id = playlist.id, title = %playlist.title, "Loading playlist tracks");
        self.api
            .playlist_tracks(playlist, self.limits.playlist_tracks)
            .await
    }
}

/// Append liked playlists whose id is not already among `user`'s.
pub fn merge_playlists(mut user: Vec<Playlist>, liked: Vec<Playlist>) -> Vec<Playlist> {
    let mut seen: HashSet<i64> = user.iter().map(|p| p.id).collect();
    user.extend(liked.into_iter().filter(|p| seen.insert(p.id)));
    user
}
