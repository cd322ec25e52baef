//! Track and playlist metadata

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a remote track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl TrackId {
    /// URN form expected by the like and stream endpoints.
    pub fn urn(&self) -> String {
        format!("soundcloud:tracks:{}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        TrackId(id)
    }
}

/// A playable track. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    pub artwork_url: Option<String>,
    pub permalink_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>, artist: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            duration_ms,
            artwork_url: None,
            permalink_url: None,
        }
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    /// Artwork at the largest size the CDN serves (`-large` is 100x100).
    pub fn high_quality_artwork_url(&self) -> Option<String> {
        self.artwork_url
            .as_ref()
            .map(|url| url.replace("-large", "-t500x500"))
    }
}

/// Id of the pseudo-playlist that holds the user's liked tracks.
pub const LIKED_SONGS_PLAYLIST_ID: i64 = -1;
/// Id of the pseudo-playlist of tracks related to the latest like.
pub const RELATED_PLAYLIST_ID: i64 = -2;

/// A user or liked playlist (for library listings)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub title: String,
    pub track_count: u32,
    pub artwork_url: Option<String>,
}

impl Playlist {
    pub fn liked_songs(track_count: u32) -> Self {
        Self {
            id: LIKED_SONGS_PLAYLIST_ID,
            title: "Liked Songs".to_string(),
            track_count,
            artwork_url: None,
        }
    }

    pub fn related(track_count: u32) -> Self {
        Self {
            id: RELATED_PLAYLIST_ID,
            title: "Related".to_string(),
            track_count,
            artwork_url: None,
        }
    }

    pub fn is_liked_songs(&self) -> bool {
        self.id == LIKED_SONGS_PLAYLIST_ID
    }

    pub fn is_related(&self) -> bool {
        self.id == RELATED_PLAYLIST_ID
    }

    pub fn urn(&self) -> String {
        format!("soundcloud:playlists:{}", self.id)
    }
}
