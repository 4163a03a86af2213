//! Client configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `ClientConfig` is built at process start and handed to
//! [`crate::net::api::ApiClient::new`]. The request timeout is a single
//! deadline applied uniformly to every backend call.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8082/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Errors produced while building client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub login_path: String,
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BOOKREVIEW_API_URL`: default `http://localhost:8082/api`
    /// - `BOOKREVIEW_REQUEST_TIMEOUT_SECS`: default 10
    /// - `BOOKREVIEW_LOGIN_PATH`: default `/login`
    /// - `BOOKREVIEW_TOKEN_FILE`: credential file for durable token storage
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the API URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("BOOKREVIEW_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let request_timeout =
            Duration::from_secs(env_parse_u64("BOOKREVIEW_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        let login_path = std::env::var("BOOKREVIEW_LOGIN_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_owned());
        let token_file = std::env::var_os("BOOKREVIEW_TOKEN_FILE").map(PathBuf::from);

        Self { request_timeout, login_path, token_file, ..Self::default() }.with_base_url(&base_url)
    }

    /// Replace the API base URL after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for relative or non-http(s) URLs.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl(format!("{trimmed}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(format!("{trimmed}: unsupported scheme '{}'", url.scheme())));
    }
    Ok(trimmed.to_owned())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
