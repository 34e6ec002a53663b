//! Reachability probes.
//!
//! A candidate tunnel URL is only trusted after `GET <url><health-path>`
//! answers HTTP 200. The same probe is used against the local service and
//! by the health monitor against the active URL. Probes never retry; the
//! failover pipeline owns retry policy.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use tunnelkeeper_core::join_url;

use crate::host::http::HttpClient;

/// Result of a probe check.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Whether the probe succeeded (HTTP 200).
    pub success: bool,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
    /// Status code, when a response arrived.
    pub status_code: Option<u16>,
    /// Transport error, when no response arrived.
    pub error: Option<String>,
}

impl ProbeResult {
    /// A successful probe.
    pub fn ok(status_code: u16, elapsed: Duration) -> Self {
        Self {
            success: status_code == 200,
            response_time_ms: millis(elapsed),
            status_code: Some(status_code),
            error: None,
        }
    }

    /// A probe that got no response.
    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            response_time_ms: millis(elapsed),
            status_code: None,
            error: Some(error.into()),
        }
    }

    /// Short description of why the probe failed.
    pub fn failure_reason(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(e), _) => e.clone(),
            (None, Some(code)) => format!("HTTP {code}"),
            (None, None) => "no response".to_string(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Probe API
// ============================================================================

/// Something that can check whether a URL answers HTTP 200.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Issues a single GET against `url`.
    async fn check(&self, url: &str) -> ProbeResult;
}

/// Probe backed by [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: HttpClient,
}

impl HttpProbe {
    /// Creates a probe whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: HttpClient::with_timeout(timeout),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self, url: &str) -> ProbeResult {
        let start = Instant::now();

        match self.client.get(url).await {
            Ok(response) => ProbeResult::ok(response.status().as_u16(), start.elapsed()),
            Err(e) => ProbeResult::failed(e.to_string(), start.elapsed()),
        }
    }
}

/// Verifies `base_url` by probing its health path.
#[instrument(skip(probe), fields(url = %base_url))]
pub async fn verify(probe: &dyn HealthProbe, base_url: &str, health_path: &str) -> ProbeResult {
    let url = join_url(base_url, health_path);
    let result = probe.check(&url).await;

    debug!(
        success = result.success,
        status = ?result.status_code,
        response_time_ms = result.response_time_ms,
        "Probe finished"
    );

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProbe;

    #[test]
    fn test_only_200_is_success() {
        assert!(ProbeResult::ok(200, Duration::ZERO).success);
        assert!(!ProbeResult::ok(204, Duration::ZERO).success);
        assert!(!ProbeResult::ok(502, Duration::ZERO).success);
        assert_eq!(ProbeResult::ok(502, Duration::ZERO).failure_reason(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_verify_appends_health_path() {
        let probe = ScriptedProbe::healthy(["https://x.example/health"]);

        assert!(verify(&probe, "https://x.example", "/health").await.success);
        assert!(verify(&probe, "https://x.example/", "health").await.success);
        assert!(!verify(&probe, "https://y.example", "/health").await.success);
        assert_eq!(probe.calls("https://x.example/health"), 2);
    }

    /// Serves every connection with a fixed status line.
    async fn serve_status(status: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_http_probe_accepts_200() {
        let base = serve_status("200 OK").await;
        let probe = HttpProbe::new(Duration::from_secs(2));

        let result = verify(&probe, &base, "/health").await;

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_http_probe_rejects_other_statuses() {
        let probe = HttpProbe::new(Duration::from_secs(2));

        for status in ["204 No Content", "502 Bad Gateway", "404 Not Found"] {
            let base = serve_status(status).await;
            let result = verify(&probe, &base, "/health").await;

            assert!(!result.success, "{status} must not verify");
            assert_eq!(result.status_code, status[..3].parse::<u16>().ok());
        }
    }

    #[tokio::test]
    async fn test_http_probe_unreachable() {
        // Port 9 (discard) on loopback is closed on test machines.
        let probe = HttpProbe::new(Duration::from_secs(2));
        let result = probe.check("http://127.0.0.1:9/health").await;

        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
