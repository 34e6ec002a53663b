//! Single connection attempt.
//!
//! Spawns the provider, scans its merged output for the URL pattern and
//! gives up once the provider's timeout elapses. The wall-clock deadline is
//! checked on every poll tick, so a silent provider is abandoned on time no
//! matter how much output it produces later.

use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::context::TunnelContext;
use crate::error::AttemptError;
use crate::provider::{Candidate, TunnelProvider};

/// Poll interval while waiting for output.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs one attempt for `provider` against the context's local target.
///
/// Returns a [`Candidate`] owning the live process on a URL match. Every
/// failure path terminates the child before returning.
#[instrument(skip_all, fields(provider = %provider.id()))]
pub async fn run_attempt<P>(provider: &P, ctx: &TunnelContext) -> Result<Candidate, AttemptError>
where
    P: TunnelProvider + ?Sized,
{
    let spec = provider.command(ctx.target());
    let timeout = provider.connect_timeout();
    let grace = ctx.settings.terminate_grace;

    let (mut process, mut output) = ctx.process.spawn_streaming(&spec)?;
    let start = Instant::now();
    let mut output_open = true;

    loop {
        let elapsed = start.elapsed();

        if elapsed >= timeout {
            debug!(timeout = ?timeout, "No URL before timeout");
            process.terminate(grace).await;
            return Err(AttemptError::ConnectTimeout(timeout));
        }

        let wait = (timeout - elapsed).min(POLL_INTERVAL);

        if !output_open {
            // Pipes closed; only the exit status and the deadline are left.
            if let Some(code) = process.exit_status() {
                return Err(AttemptError::ProcessExited { code });
            }
            tokio::time::sleep(wait).await;
            continue;
        }

        match tokio::time::timeout(wait, output.next_line()).await {
            Ok(Some(line)) => {
                debug!(line = %line, "provider output");
                if let Some(url) = provider.extract_url(&line) {
                    debug!(url = %url, elapsed = ?start.elapsed(), "URL matched");
                    return Ok(Candidate::new(provider.id(), url, process));
                }
            }
            Ok(None) => {
                debug!("Provider output closed");
                output_open = false;
            }
            Err(_) => {
                if let Some(code) = process.exit_status() {
                    warn!(code = ?code, "Provider exited before printing a URL");
                    return Err(AttemptError::ProcessExited { code });
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::host::process::pid_is_alive;
    use crate::test_support::ShellProvider;

    const PATTERN: &str = r"https://[a-z0-9-]+\.example\.test";

    #[tokio::test]
    async fn test_match_returns_candidate_with_live_process() {
        let provider = ShellProvider::new(
            "echo connecting; echo 'your url is: \x1b[1mhttps://abc-1.example.test\x1b[0m'; sleep 30",
            PATTERN,
        );
        let ctx = TunnelContext::default();

        let mut candidate = provider.connect(&ctx).await.unwrap();
        assert_eq!(candidate.url, "https://abc-1.example.test");
        assert_eq!(candidate.provider_id, "shell");
        assert!(candidate.process.is_running());

        candidate.discard(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn test_url_on_stderr_is_seen() {
        let provider = ShellProvider::new("echo https://err.example.test 1>&2; sleep 30", PATTERN);
        let ctx = TunnelContext::default();

        let candidate = provider.connect(&ctx).await.unwrap();
        assert_eq!(candidate.url, "https://err.example.test");
        candidate.discard(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn test_timeout_terminates_child() {
        let provider = ShellProvider::new("echo waiting; exec sleep 30", PATTERN)
            .with_timeout(Duration::from_millis(400));
        let ctx = TunnelContext::default();

        let started = Instant::now();
        let err = provider.connect(&ctx).await.unwrap_err();

        assert!(matches!(err, AttemptError::ConnectTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        let pid = provider.last_pid().unwrap();
        assert!(!pid_is_alive(pid));
    }

    #[tokio::test]
    async fn test_late_url_is_ignored() {
        let provider = ShellProvider::new("sleep 2; echo https://late.example.test; sleep 30", PATTERN)
            .with_timeout(Duration::from_millis(300));
        let ctx = TunnelContext::default();

        let err = provider.connect(&ctx).await.unwrap_err();
        assert!(matches!(err, AttemptError::ConnectTimeout(_)));
    }

    #[tokio::test]
    async fn test_early_exit_is_reported() {
        let provider = ShellProvider::new("echo boom; exit 3", PATTERN);
        let ctx = TunnelContext::default();

        let err = provider.connect(&ctx).await.unwrap_err();
        assert!(matches!(err, AttemptError::ProcessExited { code: Some(3) }));
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let provider = ShellProvider::new("true", PATTERN).with_program("no_such_tunnel_binary_42");
        let ctx = TunnelContext::default();

        let err = provider.connect(&ctx).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!provider.is_available(&ctx).await);
    }
}
