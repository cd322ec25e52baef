//! Stream resolution and quality-tier selection

use std::sync::Arc;

use crate::api::StreamApi;
use crate::error::PlayerError;
use crate::model::{StreamCandidate, StreamLocator, TrackId};

/// Turns a track id into a playable stream locator.
#[derive(Clone)]
pub struct StreamResolver {
    api: Arc<dyn StreamApi>,
}

impl StreamResolver {
    pub fn new(api: Arc<dyn StreamApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, track_id: TrackId) -> Result<StreamLocator, PlayerError> {
        tracing::debug!(%track_id, "Resolving stream");
        let candidates = self
            .api
            .resolve_stream(track_id)
            .await
            .map_err(|e| PlayerError::ResolutionNetwork {
                track_id,
                message: e.to_string(),
            })?;
        select_stream(track_id, &candidates)
    }
}

/// Best usable candidate in [`QualityTier::PREFERENCE`](crate::model::QualityTier::PREFERENCE) order.
pub fn select_stream(
    track_id: TrackId,
    candidates: &[StreamCandidate],
) -> Result<StreamLocator, PlayerError> {
    candidates
        .iter()
        .filter_map(|c| c.usable_url().map(|url| (c.tier, url)))
        .min_by_key(|(tier, _)| *tier)
        .map(|(tier, url)| {
            tracing::debug!(%track_id, %tier, "Selected stream");
            StreamLocator {
                url: url.to_string(),
                tier,
            }
        })
        .ok_or(PlayerError::StreamUnavailable { track_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::model::QualityTier;
    use async_trait::async_trait;

    struct FixedStreams(Result<Vec<StreamCandidate>, ApiError>);

    #[async_trait]
    impl StreamApi for FixedStreams {
        async fn resolve_stream(&self, _track_id: TrackId) -> Result<Vec<StreamCandidate>, ApiError> {
            self.0.clone()
        }
    }

    #[test]
    fn progressive_mp3_beats_everything() {
        let candidates = vec![
            StreamCandidate::new(QualityTier::PreviewMp3_128, "https://cdn/preview"),
            StreamCandidate::new(QualityTier::HlsOpus64, "https://cdn/opus"),
            StreamCandidate::new(QualityTier::HttpMp3_128, "https://cdn/mp3"),
        ];
        let stream = select_stream(TrackId(1), &candidates).unwrap();
        assert_eq!(stream.tier, QualityTier::HttpMp3_128);
        assert_eq!(stream.url, "https://cdn/mp3");
    }

    #[test]
    fn blank_urls_are_skipped() {
        let candidates = vec![
            StreamCandidate::new(QualityTier::HttpMp3_128, ""),
            StreamCandidate::new(QualityTier::HlsMp3_128, "   "),
            StreamCandidate::new(QualityTier::PreviewMp3_128, "https://cdn/preview"),
        ];
        let stream = select_stream(TrackId(1), &candidates).unwrap();
        assert_eq!(stream.tier, QualityTier::PreviewMp3_128);
    }

    #[test]
    fn nothing_usable_is_stream_unavailable() {
        let candidates = vec![StreamCandidate {
            url: None,
            tier: QualityTier::HttpMp3_128,
        }];
        assert_eq!(
            select_stream(TrackId(9), &candidates),
            Err(PlayerError::StreamUnavailable { track_id: TrackId(9) })
        );
        assert!(select_stream(TrackId(9), &[]).is_err());
    }

    #[tokio::test]
    async fn api_failures_become_resolution_network_errors() {
        let resolver = StreamResolver::new(Arc::new(FixedStreams(Err(ApiError::Http { status: 503 }))));
        let err = resolver.resolve(TrackId(4)).await.unwrap_err();
        assert!(matches!(err, PlayerError::ResolutionNetwork { track_id: TrackId(4), .. }));
    }
}
