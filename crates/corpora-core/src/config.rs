//! Client configuration.
//!
//! Configuration is read from `CORPORA_*` environment variables, falling back
//! to the values in [`crate::defaults`].
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CORPORA_BASE_URL` | `http://127.0.0.1:8000` | API origin |
//! | `CORPORA_TOKEN` | (none) | Bearer token sent with every request |
//! | `CORPORA_TIMEOUT_SECS` | `30` | Per-request timeout |
//! | `CORPORA_SPRAWL_TIMEOUT_SECS` | `60` | Deadline for one graph sprawl |
//! | `CORPORA_UPLOAD_CHUNK_SIZE` | `5242880` | Chunk size for file uploads |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for crate::Error {
    fn from(e: ConfigError) -> Self {
        crate::Error::Config(e.to_string())
    }
}

/// Connection settings shared by every client component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API origin, without trailing slash.
    pub base_url: String,
    /// Optional bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Deadline for one network-neighborhood request made by a sprawl.
    pub sprawl_timeout_secs: u64,
    /// Chunk size for the chunked upload protocol.
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            token: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            sprawl_timeout_secs: defaults::SPRAWL_TIMEOUT_SECS,
            upload_chunk_size: defaults::UPLOAD_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("CORPORA_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config.token = env::var("CORPORA_TOKEN").ok().filter(|t| !t.is_empty());
        config.timeout_secs = parse_var("CORPORA_TIMEOUT_SECS", config.timeout_secs)?;
        config.sprawl_timeout_secs =
            parse_var("CORPORA_SPRAWL_TIMEOUT_SECS", config.sprawl_timeout_secs)?;
        config.upload_chunk_size =
            parse_var("CORPORA_UPLOAD_CHUNK_SIZE", config.upload_chunk_size)?;

        config.validate()?;
        debug!(base_url = %config.base_url, "Loaded client config from environment");
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 || self.sprawl_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        if self.upload_chunk_size == 0 {
            return Err(ConfigError::Validation(
                "upload_chunk_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the sprawl deadline.
    pub fn with_sprawl_timeout_secs(mut self, secs: u64) -> Self {
        self.sprawl_timeout_secs = secs;
        self
    }

    /// Set the upload chunk size.
    pub fn with_upload_chunk_size(mut self, bytes: usize) -> Self {
        self.upload_chunk_size = bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sprawl_timeout(&self) -> Duration {
        Duration::from_secs(self.sprawl_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, fallback: T) -> ConfigResult<T> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ClientConfig::new("https://corpora.example.org/");
        assert_eq!(config.base_url, "https://corpora.example.org");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = ClientConfig::new("ftp://corpora.example.org");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ClientConfig::default().with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::new("http://localhost:8000")
            .with_token("abc")
            .with_sprawl_timeout_secs(5)
            .with_upload_chunk_size(1024);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.sprawl_timeout(), Duration::from_secs(5));
        assert_eq!(config.upload_chunk_size, 1024);
    }

    #[test]
    fn test_config_error_converts() {
        let err: crate::Error = ConfigError::Validation("x".into()).into();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
