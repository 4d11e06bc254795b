//! Client configuration.
//!
//! Loaded from environment variables with defaults suitable for a local
//! backend. The binary loads `.env` first via `dotenvy`.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default advertiser session poll interval in seconds
pub const DEFAULT_ADVERTISER_POLL_SECS: u64 = 60;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL could not be parsed or is not http(s)
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected value
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A numeric variable could not be parsed
    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber {
        /// Variable name
        name: &'static str,
        /// The rejected value
        value: String,
    },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash (`SORTEOHUB_API_URL`)
    pub api_url: String,
    /// Per-request timeout in seconds (`SORTEOHUB_TIMEOUT_SECS`)
    pub timeout_secs: u64,
    /// Advertiser session poll interval in seconds (`SORTEOHUB_ADVERTISER_POLL_SECS`)
    pub advertiser_poll_secs: u64,
}

impl ClientConfig {
    /// Build a configuration for `api_url` with default timings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `api_url` is not an http(s) URL.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_url = normalize_url(&api_url.into())?;
        Ok(Self {
            api_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            advertiser_poll_secs: DEFAULT_ADVERTISER_POLL_SECS,
        })
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable is present but invalid.
    /// Missing variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("SORTEOHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_url: normalize_url(&api_url)?,
            timeout_secs: parse_var("SORTEOHUB_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            advertiser_poll_secs: parse_var(
                "SORTEOHUB_ADVERTISER_POLL_SECS",
                DEFAULT_ADVERTISER_POLL_SECS,
            )?,
        })
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Override the advertiser poll interval
    #[must_use]
    pub const fn with_advertiser_poll_secs(mut self, secs: u64) -> Self {
        self.advertiser_poll_secs = secs;
        self
    }

    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Advertiser poll interval (never zero)
    #[must_use]
    pub fn advertiser_poll_interval(&self) -> Duration {
        Duration::from_secs(self.advertiser_poll_secs.max(1))
    }
}

fn normalize_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(trimmed.to_string())
}

fn parse_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn trailing_slash_is_removed() {
        let config = ClientConfig::new("https://api.sorteohub.com/api/").unwrap();
        assert_eq!(config.api_url, "https://api.sorteohub.com/api");
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            ClientConfig::new("ftp://example.com"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn poll_interval_is_never_zero() {
        let config = ClientConfig::new(DEFAULT_API_URL)
            .unwrap()
            .with_advertiser_poll_secs(0)
            .with_timeout_secs(3);
        assert_eq!(config.advertiser_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }
}
