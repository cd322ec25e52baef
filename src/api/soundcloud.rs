//! SoundCloud REST client

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{LibraryApi, LikeApi, StreamApi};
use crate::error::ApiError;
use crate::model::{Playlist, QualityTier, StreamCandidate, Track, TrackId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct UserDto {
    username: Option<String>,
}

#[derive(Deserialize)]
struct TrackDto {
    id: u64,
    title: Option<String>,
    #[serde(default)]
    duration: u64,
    artwork_url: Option<String>,
    user: Option<UserDto>,
    permalink_url: Option<String>,
}

impl From<TrackDto> for Track {
    fn from(dto: TrackDto) -> Self {
        Track {
            id: TrackId(dto.id),
            title: dto.title.unwrap_or_default(),
            artist: dto
                .user
                .and_then(|u| u.username)
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            duration_ms: dto.duration,
            artwork_url: dto.artwork_url,
            permalink_url: dto.permalink_url,
        }
    }
}

#[derive(Deserialize, Default)]
struct TrackStreamsDto {
    http_mp3_128_url: Option<String>,
    hls_mp3_128_url: Option<String>,
    hls_opus_64_url: Option<String>,
    preview_mp3_128_url: Option<String>,
}

impl TrackStreamsDto {
    fn into_candidates(self) -> Vec<StreamCandidate> {
        vec![
            StreamCandidate { url: self.http_mp3_128_url, tier: QualityTier::HttpMp3_128 },
            StreamCandidate { url: self.hls_mp3_128_url, tier: QualityTier::HlsMp3_128 },
            StreamCandidate { url: self.hls_opus_64_url, tier: QualityTier::HlsOpus64 },
            StreamCandidate { url: self.preview_mp3_128_url, tier: QualityTier::PreviewMp3_128 },
        ]
    }
}

#[derive(Deserialize)]
struct PlaylistDto {
    id: i64,
    title: Option<String>,
    #[serde(default)]
    track_count: u32,
    artwork_url: Option<String>,
}

impl From<PlaylistDto> for Playlist {
    fn from(dto: PlaylistDto) -> Self {
        Playlist {
            id: dto.id,
            title: dto.title.unwrap_or_default(),
            track_count: dto.track_count,
            artwork_url: dto.artwork_url,
        }
    }
}

#[derive(Deserialize)]
struct Paginated<T> {
    collection: Vec<T>,
}

/// HTTP client for the SoundCloud API with OAuth header injection
#[derive(Clone)]
pub struct SoundCloudClient {
    http: Client,
    base_url: String,
    client_id: String,
    access_token: Option<String>,
}

impl SoundCloudClient {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        // Anonymous requests authenticate with the client id instead of a user token.
        let credential = self.access_token.as_deref().unwrap_or(&self.client_id);
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {credential}"))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, builder: RequestBuilder, operation: &'static str) -> Result<Response, ApiError> {
        crate::log_api_request!(operation);
        let result = builder.send().await.map_err(ApiError::from).and_then(|response| {
            let status = response.status();
            if status.is_success() {
                Ok(response)
            } else {
                Err(ApiError::Http { status: status.as_u16() })
            }
        });
        crate::log_api_result!(operation, result);
        result
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation: &'static str,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, path).query(query), operation)
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StreamApi for SoundCloudClient {
    async fn resolve_stream(&self, track_id: TrackId) -> Result<Vec<StreamCandidate>, ApiError> {
        let path = format!("tracks/{}/streams", track_id.urn());
        let streams: TrackStreamsDto = self.get_json(&path, &[], "resolve_stream").await?;
        Ok(streams.into_candidates())
    }
}

#[async_trait]
impl LikeApi for SoundCloudClient {
    async fn list_liked(&self, limit: u32, offset: u32) -> Result<Vec<Track>, ApiError> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let tracks: Vec<TrackDto> = self.get_json("me/likes/tracks", &query, "list_liked").await?;
        Ok(tracks.into_iter().map(Track::from).collect())
    }

    async fn like(&self, track_id: TrackId) -> Result<(), ApiError> {
        let path = format!("likes/tracks/{}", track_id.urn());
        self.send(self.request(Method::POST, &path), "like").await?;
        Ok(())
    }

    async fn unlike(&self, track_id: TrackId) -> Result<(), ApiError> {
        let path = format!("likes/tracks/{}", track_id.urn());
        self.send(self.request(Method::DELETE, &path), "unlike").await?;
        Ok(())
    }
}

#[async_trait]
impl LibraryApi for SoundCloudClient {
    async fn user_playlists(&self, limit: u32) -> Result<Vec<Playlist>, ApiError> {
        let query = [("limit", limit.to_string()), ("linked_partitioning", "true".to_string())];
        let page: Paginated<PlaylistDto> = self.get_json("me/playlists", &query, "user_playlists").await?;
        Ok(page.collection.into_iter().map(Playlist::from).collect())
    }

    async fn liked_playlists(&self, limit: u32, offset: u32) -> Result<Vec<Playlist>, ApiError> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let playlists: Vec<PlaylistDto> = self.get_json("me/likes/playlists", &query, "liked_playlists").await?;
        Ok(playlists.into_iter().map(Playlist::from).collect())
    }

    async fn playlist_tracks(&self, playlist: &Playlist, limit: u32) -> Result<Vec<Track>, ApiError> {
        let path = format!("playlists/{}/tracks", playlist.urn());
        let query = [("limit", limit.to_string())];
        let tracks: Vec<TrackDto> = self.get_json(&path, &query, "playlist_tracks").await?;
        Ok(tracks.into_iter().map(Track::from).collect())
    }

    async fn search_tracks(&self, query: &str, limit: u32, offset: u32) -> Result<Vec<Track>, ApiError> {
        let query = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let tracks: Vec<TrackDto> = self.get_json("tracks", &query, "search_tracks").await?;
        Ok(tracks.into_iter().map(Track::from).collect())
    }

    async fn related_tracks(&self, track_id: TrackId, limit: u32) -> Result<Vec<Track>, ApiError> {
        let path = format!("tracks/{}/related", track_id.urn());
        let query = [
            ("access", "playable,preview".to_string()),
            ("limit", limit.to_string()),
            ("linked_partitioning", "true".to_string()),
        ];
        let page: Paginated<TrackDto> = self.get_json(&path, &query, "related_tracks").await?;
        Ok(page.collection.into_iter().map(Track::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_dto_falls_back_to_unknown_artist() {
        let dto: TrackDto = serde_json::from_str(r#"{"id": 7, "title": "Song", "duration": 1234}"#).unwrap();
        let track = Track::from(dto);
        assert_eq!(track.id, TrackId(7));
        assert_eq!(track.artist, "Unknown Artist");
        assert_eq!(track.duration_ms, 1234);
    }

    #[test]
    fn streams_dto_maps_every_tier() {
        let dto: TrackStreamsDto = serde_json::from_str(
            r#"{"hls_mp3_128_url": "https://cdn/hls", "preview_mp3_128_url": ""}"#,
        )
        .unwrap();
        let candidates = dto.into_candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[1].usable_url(), Some("https://cdn/hls"));
        assert_eq!(candidates[0].usable_url(), None);
        assert_eq!(candidates[3].usable_url(), None);
    }

    #[test]
    fn related_page_decodes_collection() {
        let page: Paginated<TrackDto> = serde_json::from_str(
            r#"{"collection": [{"id": 3, "title": "Near", "user": {"username": "Someone"}}], "next_href": null}"#,
        )
        .unwrap();
        let tracks: Vec<Track> = page.collection.into_iter().map(Track::from).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist, "Someone");
    }

    #[test]
    fn anonymous_requests_use_client_id() {
        let client = SoundCloudClient::new("https://api.example.test/", "cid", Some(String::new())).unwrap();
        let request = client.request(Method::GET, "/me/likes/tracks").build().unwrap();
        assert_eq!(request.url().as_str(), "https://api.example.test/me/likes/tracks");
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "OAuth cid");
    }
}
