//! Liked-track id set with JSON persistence so the like badges are correct at startup

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::track::TrackId;

const LIKED_TRACKS_CACHE_FILE: &str = "liked_tracks.json";

#[derive(Serialize, Deserialize)]
struct CacheFile {
    refreshed_at: Option<DateTime<Utc>>,
    track_ids: Vec<TrackId>,
}

/// The in-memory LikeSet plus its on-disk mirror.
#[derive(Clone)]
pub struct LikedTracksCache {
    liked_ids: Arc<RwLock<HashSet<TrackId>>>,
    refreshed_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    path: PathBuf,
}

impl LikedTracksCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            liked_ids: Arc::new(RwLock::new(HashSet::new())),
            refreshed_at: Arc::new(RwLock::new(None)),
            path: cache_dir.as_ref().join(LIKED_TRACKS_CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `false` when no cache file exists yet.
    pub async fn load_from_disk(&self) -> Result<bool> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let file: CacheFile = serde_json::from_str(&content)?;
        *self.liked_ids.write().await = file.track_ids.into_iter().collect();
        *self.refreshed_at.write().await = file.refreshed_at;
        Ok(true)
    }

    pub async fn save_to_disk(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut track_ids: Vec<TrackId> = self.liked_ids.read().await.iter().copied().collect();
        track_ids.sort();
        let file = CacheFile {
            refreshed_at: *self.refreshed_at.read().await,
            track_ids,
        };
        let content = serde_json::to_string(&file)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Bulk replace after a remote load.
    pub async fn replace(&self, track_ids: impl IntoIterator<Item = TrackId>) {
        *self.liked_ids.write().await = track_ids.into_iter().collect();
        *self.refreshed_at.write().await = Some(Utc::now());
    }

    pub async fn is_liked(&self, track_id: TrackId) -> bool {
        self.liked_ids.read().await.contains(&track_id)
    }

    pub async fn add(&self, track_id: TrackId) {
        self.liked_ids.write().await.insert(track_id);
    }

    pub async fn remove(&self, track_id: TrackId) {
        self.liked_ids.write().await.remove(&track_id);
    }

    pub async fn snapshot(&self) -> HashSet<TrackId> {
        self.liked_ids.read().await.clone()
    }

    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.refreshed_at.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LikedTracksCache::new(dir.path());
        cache.replace([TrackId(3), TrackId(1)]).await;
        cache.save_to_disk().await.unwrap();

        let reloaded = LikedTracksCache::new(dir.path());
        assert!(reloaded.load_from_disk().await.unwrap());
        assert!(reloaded.is_liked(TrackId(1)).await);
        assert!(reloaded.is_liked(TrackId(3)).await);
        assert!(reloaded.refreshed_at().await.is_some());
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LikedTracksCache::new(dir.path().join("nested"));
        assert!(!cache.load_from_disk().await.unwrap());
        assert!(cache.snapshot().await.is_empty());
    }
}
