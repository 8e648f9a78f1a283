//! Client configuration, loaded from RON.
//!
//! Default location: `~/.config/dossier/client.ron`. Every field is optional;
//! a missing file means defaults. `DOSSIER_API_URL` overrides the base URL.
//!
//! ```ron
//! (
//!     api_base_url: "https://reports.example.com/api/",
//!     quiet_window_ms: 1500,
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_ALLOWED_IMAGE_TYPES, DEFAULT_API_BASE_URL, DEFAULT_QUIET_WINDOW,
    DEFAULT_REQUEST_TIMEOUT, ENV_API_URL,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root; routes are joined onto it.
    pub api_base_url: String,
    pub quiet_window_ms: u64,
    pub request_timeout_ms: u64,
    pub allowed_image_types: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            quiet_window_ms: DEFAULT_QUIET_WINDOW.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            allowed_image_types: DEFAULT_ALLOWED_IMAGE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ClientConfig {
    /// `~/.config/dossier/client.ron`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dossier").join("client.ron"))
    }

    /// Parse a RON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    /// Load from `path` (or the default path), falling back to defaults.
    ///
    /// A missing file is normal. A malformed one is logged and ignored.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };
        if !path.exists() {
            debug!(path = %path.display(), "no client config, using defaults");
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid client config, using defaults");
                Self::default()
            }
        }
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (an environment-like getter).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    /// Base URL with a guaranteed trailing slash, so relative joins append.
    pub fn normalized_base_url(&self) -> String {
        let base = self.api_base_url.trim();
        if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        }
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.quiet_window(), Duration::from_millis(2000));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.allowed_image_types, vec!["image/jpeg", "image/jpg"]);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(quiet_window_ms: 500)").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.quiet_window_ms, 500);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_malformed_ron_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(quiet_window_ms: \"soon\")").unwrap();
        assert!(matches!(ClientConfig::load(file.path()), Err(ConfigError::Ron(_))));
        assert_eq!(ClientConfig::load_or_default(Some(file.path())), ClientConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(Some(&dir.path().join("nope.ron")));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_env_override_and_trailing_slash() {
        let config = ClientConfig::default().with_overrides(|key| {
            (key == ENV_API_URL).then(|| "https://example.test/api".to_string())
        });
        assert_eq!(config.normalized_base_url(), "https://example.test/api/");
    }
}
