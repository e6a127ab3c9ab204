use crate::error::{MediaError, MediaResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upload worker slots
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 5;

/// Succeeded uploads disappear from the queue after this window
pub const DEFAULT_SUCCESS_EXPIRY_MS: u64 = 2000;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the media API, e.g. `https://host/api/v1`
    pub base_url: String,
    /// Bearer token attached to every request
    pub auth_token: Option<String>,
    /// Upload admission limit. `None` or `0` starts every upload immediately.
    pub max_concurrent_uploads: Option<usize>,
    pub success_expiry_ms: u64,
    pub page_size: usize,
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8000/api/v1".to_string(),
            auth_token: None,
            max_concurrent_uploads: Some(DEFAULT_MAX_CONCURRENT_UPLOADS),
            success_expiry_ms: DEFAULT_SUCCESS_EXPIRY_MS,
            page_size: DEFAULT_PAGE_SIZE,
            download_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> MediaResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&raw)
            .map_err(|e| MediaError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MEDIA_API_URL`, `MEDIA_API_TOKEN` and `MEDIA_MAX_UPLOADS` if set.
    pub fn with_env_overrides(mut self) -> MediaResult<Self> {
        if let Ok(url) = std::env::var("MEDIA_API_URL") {
            self.base_url = url;
        }
        if let Ok(token) = std::env::var("MEDIA_API_TOKEN") {
            self.auth_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Ok(limit) = std::env::var("MEDIA_MAX_UPLOADS") {
            let parsed: usize = limit
                .trim()
                .parse()
                .map_err(|e| MediaError::Config(format!("MEDIA_MAX_UPLOADS={}: {}", limit, e)))?;
            self.max_concurrent_uploads = Some(parsed);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> MediaResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(MediaError::Config("base_url must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(MediaError::Config("page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Effective upload limit, `None` meaning unbounded.
    pub fn upload_limit(&self) -> Option<usize> {
        self.max_concurrent_uploads.filter(|n| *n > 0)
    }

    pub fn success_expiry(&self) -> Duration {
        Duration::from_millis(self.success_expiry_ms)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
