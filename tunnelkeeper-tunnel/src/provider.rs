//! Tunnel provider trait and types.
//!
//! A provider represents one mechanism for exposing a local port publicly:
//! a command-line tool that connects to an external relay and prints the
//! public URL it was assigned. Providers are tried in configured order by
//! the failover pipeline.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tunnelkeeper_core::LocalTarget;

use crate::attempt;
use crate::context::TunnelContext;
use crate::error::AttemptError;
use crate::host::process::{CommandSpec, TunnelProcess};

// ============================================================================
// Candidate
// ============================================================================

/// A URL printed by a provider, bound to the process that serves it.
///
/// Not trusted until verified.
#[derive(Debug)]
pub struct Candidate {
    /// Provider that produced the URL.
    pub provider_id: String,
    /// The matched public URL.
    pub url: String,
    /// The live provider process.
    pub process: TunnelProcess,
}

impl Candidate {
    /// Creates a new candidate.
    pub fn new(provider_id: impl Into<String>, url: impl Into<String>, process: TunnelProcess) -> Self {
        Self {
            provider_id: provider_id.into(),
            url: url.into(),
            process,
        }
    }

    /// Tears the candidate's process down.
    pub async fn discard(mut self, grace: Duration) {
        self.process.terminate(grace).await;
    }
}

// ============================================================================
// Tunnel Provider Trait
// ============================================================================

/// One interchangeable tunneling mechanism.
///
/// ## Implementing a Provider
///
/// ```ignore
/// struct BoreProvider;
///
/// #[async_trait]
/// impl TunnelProvider for BoreProvider {
///     fn id(&self) -> &str {
///         "bore"
///     }
///
///     fn command(&self, target: &LocalTarget) -> CommandSpec {
///         CommandSpec::new("bore").args(["local", &target.port.to_string(), "--to", "bore.pub"])
///     }
///
///     fn url_pattern(&self) -> &Regex {
///         &BORE_URL
///     }
///
///     fn connect_timeout(&self) -> Duration {
///         Duration::from_secs(15)
///     }
/// }
/// ```
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    /// Unique identifier (e.g., "serveo", "cloudflared").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> String {
        self.id().to_string()
    }

    /// The command that opens a tunnel to `target`.
    fn command(&self, target: &LocalTarget) -> CommandSpec;

    /// Matches the public URL in the provider's output.
    fn url_pattern(&self) -> &Regex;

    /// How long an attempt may wait for the URL to appear.
    fn connect_timeout(&self) -> Duration;

    /// Attempt bound for this provider. `None` uses the retry policy.
    fn max_attempts(&self) -> Option<u32> {
        None
    }

    /// Whether a matched URL must pass a reachability probe.
    fn requires_verification(&self) -> bool {
        true
    }

    /// Health path to probe through the tunnel. `None` uses the settings.
    fn health_path(&self) -> Option<&str> {
        None
    }

    /// Extracts the public URL from one line of output.
    fn extract_url(&self, line: &str) -> Option<String> {
        self.url_pattern().find(line).map(|m| m.as_str().to_string())
    }

    /// Quick local check: is the provider's binary installed?
    async fn is_available(&self, ctx: &TunnelContext) -> bool {
        ctx.process
            .command_exists(&self.command(ctx.target()).program)
    }

    /// Runs one connection attempt.
    ///
    /// On success exactly one child process is live and owned by the
    /// returned [`Candidate`]. On failure no child from this call remains.
    async fn connect(&self, ctx: &TunnelContext) -> Result<Candidate, AttemptError> {
        attempt::run_attempt(self, ctx).await
    }
}

// ============================================================================
// Provider Info
// ============================================================================

/// Information about a provider (for reporting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Program that gets launched.
    pub program: String,
    /// Whether the program is installed.
    pub available: bool,
    /// Connect timeout in seconds.
    pub timeout_secs: u64,
    /// Attempt bound, if the provider sets its own.
    pub max_attempts: Option<u32>,
}

impl ProviderInfo {
    /// Creates provider info from a provider implementation.
    pub async fn from_provider(provider: &dyn TunnelProvider, ctx: &TunnelContext) -> Self {
        Self {
            id: provider.id().to_string(),
            name: provider.display_name(),
            program: provider.command(ctx.target()).program,
            available: provider.is_available(ctx).await,
            timeout_secs: provider.connect_timeout().as_secs(),
            max_attempts: provider.max_attempts(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
