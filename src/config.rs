use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_max_retries")]
    pub max_retries_on_error: u32,

    /// Base wait before the first transient retry; doubled per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cap for the exponential backoff between retries.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Maximum tracks per playlist-add call. The service rejects more than 100.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// When set, logs additionally go to a daily-rotated file in this directory.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_max_retries() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 500 }
fn default_max_backoff_secs() -> u64 { 60 }
fn default_max_batch_size() -> usize { 100 }
fn default_request_timeout_secs() -> u64 { 30 }

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries_on_error: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            max_batch_size: default_max_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Default config location, e.g. ~/.config/top-tracks-playlist-gen/config.toml.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("top-tracks-playlist-gen").join("config.toml"))
    }

    /// Load from an explicit path, the default location, or fall back to
    /// built-in defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(p) = explicit {
            return Self::from_path(p);
        }
        if let Some(p) = Self::default_path() {
            if p.exists() {
                return Self::from_path(&p);
            }
        }
        Ok(Self::default())
    }
}
