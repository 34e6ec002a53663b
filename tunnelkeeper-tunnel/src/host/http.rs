//! HTTP client with tracing and URL validation.
//!
//! Used for reachability probes against public tunnel URLs and the local
//! service. Every request is bounded by the client timeout.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent string for tunnelkeeper.
const USER_AGENT: &str = concat!("tunnelkeeper/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This should only occur
    /// if the system's TLS configuration is fundamentally broken,
    /// making network operations impossible.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to create HTTP client: {}. \
                    This usually indicates a broken TLS/SSL configuration.",
                    e
                )
            });

        Self {
            inner: client,
            timeout,
        }
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks that `url` is an absolute http(s) URL.
    fn validate(url: &str) -> Result<Url, HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(HttpError::InvalidUrl(format!("unsupported scheme {other}"))),
        }

        if parsed.host_str().is_none() {
            return Err(HttpError::InvalidUrl("No host in URL".to_string()));
        }

        Ok(parsed)
    }

    /// Performs a GET request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        let parsed = Self::validate(url)?;
        debug!("GET request");

        let response = self.inner.get(parsed).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_tunnel_urls() {
        assert!(HttpClient::validate("https://abc.serveo.net/health").is_ok());
        assert!(HttpClient::validate("http://127.0.0.1:5000/health").is_ok());
    }

    #[test]
    fn test_validate_rejects_other_urls() {
        assert!(HttpClient::validate("not-a-valid-url").is_err());
        assert!(HttpClient::validate("ftp://abc.serveo.net").is_err());
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let client = HttpClient::new();
        let result = client.get("serveo.net").await;
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }
}
