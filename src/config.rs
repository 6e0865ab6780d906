use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CatalogError, Result};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
const DEFAULT_STATE_PATH: &str = "state/session.json";

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the catalog API, without trailing slash
    pub backend_url: String,
    /// File holding the persisted session entries
    pub state_path: PathBuf,
    /// Request timeout; the transport default applies when unset
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("GEARHUB_BACKEND_URL")
            .or_else(|| lookup("REACT_APP_BACKEND_URL"))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let state_path = lookup("GEARHUB_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        let timeout = match lookup("GEARHUB_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| CatalogError::Config {
                    message: format!("GEARHUB_TIMEOUT_SECS must be a number of seconds, got '{}'", raw),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Self {
            backend_url,
            state_path,
            timeout,
        }
        .validated()
    }

    /// Override the backend URL (from the command line)
    pub fn with_backend_url(mut self, url: Option<String>) -> Result<Self> {
        if let Some(url) = url {
            self.backend_url = url;
        }
        self.validated()
    }

    pub fn with_state_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.state_path = path;
        }
        self
    }

    fn validated(mut self) -> Result<Self> {
        self.backend_url = self.backend_url.trim().trim_end_matches('/').to_string();
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(CatalogError::Config {
                message: format!("backend URL must start with http:// or https://, got '{}'", self.backend_url),
            });
        }
        Ok(self)
    }
}
