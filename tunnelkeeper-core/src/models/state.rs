//! Tunnel lifecycle state.
//!
//! The orchestrator moves through these states:
//!
//! ```text
//! Idle -> Attempting(provider, n) -> Verifying -> Active
//!                ^                                  |
//!                |                            probe fails
//!                |                                  v
//!           CoolingDown <- (all failed)        Deactivated
//! ```
//!
//! `Stopped` is only entered on an external shutdown signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Tunnel State
// ============================================================================

/// Current state of the tunnel orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TunnelState {
    /// Nothing attempted yet.
    #[default]
    Idle,
    /// Waiting for the local service to report healthy.
    WaitingForLocal,
    /// Launching a provider.
    Attempting {
        /// Provider being attempted.
        provider: String,
        /// One-based attempt index.
        attempt: u32,
    },
    /// Probing a candidate URL.
    Verifying {
        /// Provider that produced the candidate.
        provider: String,
        /// Candidate URL.
        url: String,
    },
    /// A verified tunnel is published.
    Active {
        /// Provider serving the tunnel.
        provider: String,
        /// Public URL.
        url: String,
    },
    /// The active tunnel failed a health probe and was torn down.
    Deactivated,
    /// Every provider failed; waiting before the next cycle.
    CoolingDown {
        /// When the next cycle starts.
        until: DateTime<Utc>,
    },
    /// Shut down by a signal.
    Stopped,
}

impl TunnelState {
    /// Returns true if a verified tunnel is published.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Returns the public URL when active.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Active { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForLocal => "waiting-for-local",
            Self::Attempting { .. } => "attempting",
            Self::Verifying { .. } => "verifying",
            Self::Active { .. } => "active",
            Self::Deactivated => "deactivated",
            Self::CoolingDown { .. } => "cooling-down",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempting { provider, attempt } => {
                write!(f, "attempting {provider} (#{attempt})")
            }
            Self::Verifying { provider, url } => write!(f, "verifying {url} ({provider})"),
            Self::Active { provider, url } => write!(f, "active {url} ({provider})"),
            Self::CoolingDown { until } => {
                write!(f, "cooling down until {}", until.format("%H:%M:%S"))
            }
            other => f.write_str(other.label()),
        }
    }
}

// ============================================================================
// Session Info
// ============================================================================

/// Serializable snapshot of the orchestrator, written to the status file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionInfo {
    /// Current state.
    #[serde(flatten)]
    pub state: TunnelState,
    /// When the current tunnel was activated.
    pub activated_at: Option<DateTime<Utc>>,
    /// Number of failover cycles started.
    pub cycles: u64,
    /// Most recent failure.
    pub last_error: Option<String>,
    /// When this snapshot was taken.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionInfo {
    /// Returns the published URL, if active.
    pub fn url(&self) -> Option<&str> {
        self.state.url()
    }

    /// Returns true if a verified tunnel is published.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_has_url() {
        let active = TunnelState::Active {
            provider: "serveo".into(),
            url: "https://x.serveo.net".into(),
        };
        let verifying = TunnelState::Verifying {
            provider: "serveo".into(),
            url: "https://x.serveo.net".into(),
        };

        assert_eq!(active.url(), Some("https://x.serveo.net"));
        assert!(active.is_active());
        assert_eq!(verifying.url(), None);
        assert!(!TunnelState::Deactivated.is_active());
    }

    #[test]
    fn test_display() {
        let state = TunnelState::Attempting {
            provider: "pinggy".into(),
            attempt: 3,
        };
        assert_eq!(state.to_string(), "attempting pinggy (#3)");
        assert_eq!(TunnelState::Idle.to_string(), "idle");
    }
}
