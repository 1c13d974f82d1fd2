//! # Provider Configuration
//!
//! The provider client is configured from the environment:
//!
//! - `IDV_API_BASE_URL` — base URL of the verification provider API
//! - `IDV_API_TOKEN` — bearer token for provider authentication
//! - `IDV_API_TIMEOUT_SECS` — per-request timeout (default: 30)
//! - `IDV_API_MAX_RETRIES` — transport retries per provider call (default: 3)
//!
//! When the base URL or token is absent the provider is simply not
//! configured — verification routes respond 503 rather than failing at
//! startup, so a kiosk can boot and serve health probes without credentials.

use url::Url;

/// Default per-request timeout toward the provider.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default transport retries per provider call.
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Errors constructing an [`IdvConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("invalid IDV_API_BASE_URL: {0}")]
    InvalidBaseUrl(String),
    /// The timeout value could not be parsed as an integer.
    #[error("invalid IDV_API_TIMEOUT_SECS: {0}")]
    InvalidTimeout(String),
    /// The retry count could not be parsed as an integer.
    #[error("invalid IDV_API_MAX_RETRIES: {0}")]
    InvalidMaxRetries(String),
    /// The API token contains characters that cannot appear in a header.
    #[error("IDV_API_TOKEN contains invalid header characters")]
    InvalidToken,
}

/// Configuration for [`crate::HttpIdvProvider`].
#[derive(Debug, Clone)]
pub struct IdvConfig {
    /// Base URL of the provider API, without a trailing slash.
    pub base_url: String,
    /// Bearer token for provider authentication.
    pub api_token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport retries after the initial attempt of each provider call.
    pub max_retries: u32,
}

impl IdvConfig {
    /// Create a configuration with the default timeout and retry count.
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Read configuration from the environment.
    ///
    /// Returns `Ok(None)` when `IDV_API_BASE_URL` or `IDV_API_TOKEN` is
    /// unset (unconfigured mode). Returns `Err` when a variable is set but
    /// malformed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let (base_url, api_token) = match (
            std::env::var("IDV_API_BASE_URL"),
            std::env::var("IDV_API_TOKEN"),
        ) {
            (Ok(url), Ok(token)) => (url, token),
            _ => return Ok(None),
        };

        Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?;

        let timeout_secs = match std::env::var("IDV_API_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let max_retries = match std::env::var("IDV_API_MAX_RETRIES") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidMaxRetries(raw))?,
            Err(_) => DEFAULT_MAX_RETRIES,
        };

        Ok(Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout_secs,
            max_retries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strips_trailing_slash() {
        let config = IdvConfig::new("https://idv.example.com/", "token");
        assert_eq!(config.base_url, "https://idv.example.com");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidBaseUrl("relative URL without a base".to_string());
        assert!(err.to_string().contains("IDV_API_BASE_URL"));
    }
}
