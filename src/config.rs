//! Runtime configuration.
//!
//! Read from `scplayer.json` in the working directory when present; every
//! field is optional. The access token can also come from the
//! `SCPLAYER_ACCESS_TOKEN` environment variable, which wins over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "scplayer.json";
pub const ACCESS_TOKEN_ENV: &str = "SCPLAYER_ACCESS_TOKEN";

const DEFAULT_API_BASE_URL: &str = "https://api.soundcloud.com";

/// How to settle a request that would enable shuffle while repeat is on, or
/// the other way round. The two modes are never on together either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePolicy {
    /// The newer request is applied and switches the other mode off.
    #[default]
    LastRequestWins,
    /// The request is ignored while the other mode is on.
    KeepExisting,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub client_id: String,
    pub access_token: Option<String>,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
    pub liked_tracks_limit: u32,
    pub playlist_tracks_limit: u32,
    pub playlists_limit: u32,
    pub search_limit: u32,
    pub related_tracks_limit: u32,
    pub position_poll_interval_ms: u64,
    pub mode_policy: ModePolicy,
    pub shuffle_seed: Option<u64>,
    /// Track length used by the simulated engine host.
    pub simulated_track_length_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_id: String::new(),
            access_token: None,
            cache_dir: PathBuf::from(".cache"),
            log_dir: PathBuf::from(".logs"),
            liked_tracks_limit: 50,
            playlist_tracks_limit: 50,
            playlists_limit: 50,
            search_limit: 20,
            related_tracks_limit: 20,
            position_poll_interval_ms: 500,
            mode_policy: ModePolicy::default(),
            shuffle_seed: None,
            simulated_track_length_ms: 180_000,
        }
    }
}

impl Config {
    /// Load from [`CONFIG_FILE`] and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_access_token(std::env::var(ACCESS_TOKEN_ENV).ok());
        Ok(config)
    }

    /// Defaults when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    fn apply_access_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token);
        }
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms.max(50))
    }
}
