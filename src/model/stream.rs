//! Stream candidates and the locator handed to the engine

use std::fmt;

/// Stream flavours, declared from most to least preferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    /// Direct progressive MP3 at 128 kbps.
    HttpMp3_128,
    /// HLS MP3 at 128 kbps.
    HlsMp3_128,
    /// HLS Opus at 64 kbps.
    HlsOpus64,
    /// 30 second preview clip.
    PreviewMp3_128,
}

impl QualityTier {
    pub const PREFERENCE: [QualityTier; 4] = [
        QualityTier::HttpMp3_128,
        QualityTier::HlsMp3_128,
        QualityTier::HlsOpus64,
        QualityTier::PreviewMp3_128,
    ];

    pub fn is_preview(&self) -> bool {
        matches!(self, QualityTier::PreviewMp3_128)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityTier::HttpMp3_128 => "http_mp3_128",
            QualityTier::HlsMp3_128 => "hls_mp3_128",
            QualityTier::HlsOpus64 => "hls_opus_64",
            QualityTier::PreviewMp3_128 => "preview_mp3_128",
        };
        f.write_str(name)
    }
}

/// One entry of a resolution response. `url` may be missing or empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamCandidate {
    pub url: Option<String>,
    pub tier: QualityTier,
}

impl StreamCandidate {
    pub fn new(tier: QualityTier, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            tier,
        }
    }

    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// A resolved, playable stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamLocator {
    pub url: String,
    pub tier: QualityTier,
}
