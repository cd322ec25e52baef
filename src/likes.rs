//! Liked-track state
//!
//! The server is authoritative. The local set changes only after a like or
//! unlike call has been confirmed, so there is never an optimistic update to
//! roll back. Toggles on the same track are not serialized: two in flight at
//! once can finish out of order and leave the local set disagreeing with the
//! server until the next [`LikeStateManager::load_liked`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::LikeApi;
use crate::error::{ApiError, LikeFailure, PlayerError};
use crate::model::{LikedTracksCache, Track, TrackId};
use crate::player::PlayerHandle;

#[derive(Clone)]
pub struct LikeStateManager {
    api: Arc<dyn LikeApi>,
    cache: LikedTracksCache,
    player: Option<PlayerHandle>,
}

impl LikeStateManager {
    pub fn new(api: Arc<dyn LikeApi>, cache: LikedTracksCache) -> Self {
        Self {
            api,
            cache,
            player: None,
        }
    }

    /// Confirmed changes are broadcast through `player` as like events.
    pub fn with_player(mut self, player: PlayerHandle) -> Self {
        self.player = Some(player);
        self
    }

    /// Seed the set from the last persisted copy. Returns whether one existed.
    pub async fn warm_from_disk(&self) -> bool {
        match self.cache.load_from_disk().await {
            Ok(found) => {
                if found {
                    tracing::debug!(path = %self.cache.path().display(), "Liked tracks loaded from disk");
                }
                found
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable liked tracks cache");
                false
            }
        }
    }

    /// Replace the set with the first `limit` liked tracks from the server.
    pub async fn load_liked(&self, limit: u32) -> Result<HashSet<TrackId>, ApiError> {
        let tracks = self.load_liked_tracks(limit).await?;
        Ok(tracks.iter().map(|t| t.id).collect())
    }

    /// [`LikeStateManager::load_liked`], keeping the track metadata for queueing.
    pub async fn load_liked_tracks(&self, limit: u32) -> Result<Vec<Track>, ApiError> {
        tracing::debug!(limit, "Refreshing liked tracks");
        let tracks = self.api.list_liked(limit, 0).await?;

        self.cache.replace(tracks.iter().map(|t| t.id)).await;
        self.persist().await;

        tracing::info!(count = tracks.len(), "Liked tracks refreshed");
        Ok(tracks)
    }

    /// The most recently liked track, read without touching the local set.
    pub async fn latest_liked(&self) -> Result<Option<Track>, ApiError> {
        Ok(self.api.list_liked(1, 0).await?.into_iter().next())
    }

    /// Like or unlike `track` depending on `currently_liked`, as the caller
    /// sees it. Returns the confirmed new state.
    ///
    /// Failures go back to the caller only; nothing is broadcast.
    pub async fn toggle_like(&self, track: &Track, currently_liked: bool) -> Result<bool, PlayerError> {
        let track_id = track.id;
        tracing::debug!(%track_id, currently_liked, "Toggling like");

        let result = if currently_liked {
            self.api.unlike(track_id).await
        } else {
            self.api.like(track_id).await
        };

        if let Err(e) = result {
            let failure = LikeFailure::from(e);
            tracing::warn!(%track_id, error = %failure, "Like toggle failed");
            return Err(PlayerError::LikeToggleFailed(failure));
        }

        let liked = !currently_liked;
        if liked {
            self.cache.add(track_id).await;
        } else {
            self.cache.remove(track_id).await;
        }
        self.persist().await;

        tracing::info!(%track_id, liked, "Like state confirmed");
        if let Some(player) = &self.player {
            player.notify_like_changed(track_id, liked);
        }
        Ok(liked)
    }

    pub async fn is_liked(&self, track_id: TrackId) -> bool {
        self.cache.is_liked(track_id).await
    }

    pub async fn liked_ids(&self) -> HashSet<TrackId> {
        self.cache.snapshot().await
    }

    async fn persist(&self) {
        if let Err(e) = self.cache.save_to_disk().await {
            tracing::warn!(error = %e, "Failed to persist liked tracks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    /// Applies mutations the moment a call arrives, then answers when released.
    #[derive(Default)]
    struct FakeLikes {
        server: Mutex<HashSet<TrackId>>,
        listing: Mutex<Vec<Track>>,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        fail_with: Mutex<Option<ApiError>>,
        calls: Mutex<Vec<(&'static str, TrackId)>>,
    }

    impl FakeLikes {
        fn hold_next(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn server_has(&self, id: TrackId) -> bool {
            self.server.lock().unwrap().contains(&id)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        async fn respond(&self, op: &'static str, id: TrackId) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push((op, id));
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            match op {
                "like" => self.server.lock().unwrap().insert(id),
                _ => self.server.lock().unwrap().remove(&id),
            };
            let gate = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LikeApi for FakeLikes {
        async fn list_liked(&self, limit: u32, _offset: u32) -> Result<Vec<Track>, ApiError> {
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            let listing = self.listing.lock().unwrap();
            Ok(listing.iter().take(limit as usize).cloned().collect())
        }

        async fn like(&self, track_id: TrackId) -> Result<(), ApiError> {
            self.respond("like", track_id).await
        }

        async fn unlike(&self, track_id: TrackId) -> Result<(), ApiError> {
            self.respond("unlike", track_id).await
        }
    }

    fn track(id: u64) -> Track {
        Track::new(id, format!("Track {id}"), "Artist", 1_000)
    }

    fn manager(api: Arc<FakeLikes>) -> (LikeStateManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = LikedTracksCache::new(dir.path());
        (LikeStateManager::new(api, cache), dir)
    }

    #[tokio::test]
    async fn load_replaces_the_whole_set() {
        let api = Arc::new(FakeLikes::default());
        *api.listing.lock().unwrap() = vec![track(1), track(2), track(3)];
        let (likes, _dir) = manager(api.clone());

        likes.cache.add(TrackId(99)).await;
        let ids = likes.load_liked(2).await.unwrap();

        assert_eq!(ids, HashSet::from([TrackId(1), TrackId(2)]));
        assert_eq!(likes.liked_ids().await, ids);
    }

    #[tokio::test]
    async fn latest_liked_leaves_the_set_alone() {
        let api = Arc::new(FakeLikes::default());
        *api.listing.lock().unwrap() = vec![track(8), track(9)];
        let (likes, _dir) = manager(api);
        likes.cache.add(TrackId(1)).await;

        assert_eq!(likes.latest_liked().await.unwrap().map(|t| t.id), Some(TrackId(8)));
        assert_eq!(likes.liked_ids().await, HashSet::from([TrackId(1)]));
    }

    #[tokio::test]
    async fn load_failure_keeps_previous_set() {
        let api = Arc::new(FakeLikes::default());
        *api.fail_with.lock().unwrap() = Some(ApiError::Network("offline".into()));
        let (likes, _dir) = manager(api);
        likes.cache.add(TrackId(5)).await;

        assert!(likes.load_liked(50).await.is_err());
        assert!(likes.is_liked(TrackId(5)).await);
    }

    #[tokio::test]
    async fn double_toggle_restores_membership() {
        let api = Arc::new(FakeLikes::default());
        let (likes, _dir) = manager(api.clone());
        let song = track(7);

        let liked = likes.toggle_like(&song, false).await.unwrap();
        assert!(liked);
        assert!(likes.is_liked(song.id).await);

        let liked = likes.toggle_like(&song, liked).await.unwrap();
        assert!(!liked);
        assert!(!likes.is_liked(song.id).await);
        assert!(!api.server_has(song.id));
    }

    #[tokio::test]
    async fn failed_toggle_leaves_set_untouched() {
        let api = Arc::new(FakeLikes::default());
        *api.fail_with.lock().unwrap() = Some(ApiError::Http { status: 429 });
        let (likes, _dir) = manager(api);

        let err = likes.toggle_like(&track(3), false).await.unwrap_err();

        assert_eq!(err, PlayerError::LikeToggleFailed(LikeFailure::Http(429)));
        assert!(!likes.is_liked(TrackId(3)).await);
    }

    #[tokio::test]
    async fn confirmed_toggle_survives_restart() {
        let api = Arc::new(FakeLikes::default());
        let (likes, dir) = manager(api.clone());
        likes.toggle_like(&track(11), false).await.unwrap();

        let reloaded = LikeStateManager::new(api, LikedTracksCache::new(dir.path()));
        assert!(reloaded.warm_from_disk().await);
        assert!(reloaded.is_liked(TrackId(11)).await);
    }

    /// Known race: a like and an unlike in flight together can complete out of
    /// order, leaving the local set disagreeing with the server.
    #[tokio::test]
    async fn overlapping_toggles_can_diverge_from_server() {
        let api = Arc::new(FakeLikes::default());
        let (likes, _dir) = manager(api.clone());
        let song = track(21);

        let release_like = api.hold_next();
        let release_unlike = api.hold_next();

        let first = {
            let likes = likes.clone();
            let song = song.clone();
            tokio::spawn(async move { likes.toggle_like(&song, false).await })
        };
        while api.call_count() < 1 {
            tokio::task::yield_now().await;
        }
        let second = {
            let likes = likes.clone();
            let song = song.clone();
            tokio::spawn(async move { likes.toggle_like(&song, true).await })
        };
        while api.call_count() < 2 {
            tokio::task::yield_now().await;
        }

        // Server applied like then unlike; answers arrive in reverse.
        release_unlike.send(()).unwrap();
        assert_eq!(second.await.unwrap(), Ok(false));
        release_like.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok(true));

        assert!(!api.server_has(song.id));
        assert!(likes.is_liked(song.id).await);
    }
}
