//! Deployment settings, read from a RON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use console_engine::{ApiSettings, EngineConfig, Session};
use console_logging::console_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    pub poll_interval_ms: u64,
    pub search_debounce_ms: u64,
    pub recent_jobs_limit: usize,
    pub page_cache_capacity: usize,
    pub download_dir: PathBuf,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_download_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4003/api/v1".to_string(),
            token_env: "CONSOLE_TOKEN".to_string(),
            poll_interval_ms: 10_000,
            search_debounce_ms: 300,
            recent_jobs_limit: 10,
            page_cache_capacity: 32,
            download_dir: PathBuf::from("./downloads"),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_download_bytes: 200 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// A missing file means defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                console_info!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn session(&self) -> Session {
        Session::new(self.base_url.clone(), std::env::var(&self.token_env).ok())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            api: ApiSettings {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                max_bytes: self.max_download_bytes,
            },
            download_dir: self.download_dir.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            recent_jobs_limit: self.recent_jobs_limit,
        }
    }
}
