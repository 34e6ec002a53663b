//! Provider-related types.
//!
//! This module contains types describing tunnel providers and the local
//! service they expose:
//! - [`ProviderKind`] - Enum of built-in tunnel providers
//! - [`ProviderMetadata`] - Provider capabilities and display info
//! - [`ProviderOverride`] - User overrides of timeout and attempt bound
//! - [`LocalTarget`] - The local `host:port` being published

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

// ============================================================================
// Provider Kind
// ============================================================================

/// Built-in tunnel provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// serveo.net over SSH reverse forwarding
    Serveo,
    /// localhost.run over SSH reverse forwarding
    LocalhostRun,
    /// Cloudflare quick tunnels (`cloudflared`)
    Cloudflared,
    /// pinggy.io over SSH reverse forwarding
    Pinggy,
    /// localtunnel (`lt`)
    Localtunnel,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Serveo => "Serveo",
            Self::LocalhostRun => "localhost.run",
            Self::Cloudflared => "Cloudflare Tunnel",
            Self::Pinggy => "Pinggy",
            Self::Localtunnel => "localtunnel",
        }
    }

    /// Returns all provider kinds in default priority order.
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::Serveo,
            Self::LocalhostRun,
            Self::Cloudflared,
            Self::Pinggy,
            Self::Localtunnel,
        ]
    }

    /// Returns the CLI name for this provider (lowercase, no spaces).
    ///
    /// This is also the identifier recorded in attempt logs.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Serveo => "serveo",
            Self::LocalhostRun => "localhost-run",
            Self::Cloudflared => "cloudflared",
            Self::Pinggy => "pinggy",
            Self::Localtunnel => "localtunnel",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

// ============================================================================
// Provider Metadata
// ============================================================================

/// Static description of a tunnel provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider kind.
    pub id: ProviderKind,
    /// Human readable name.
    pub display_name: String,
    /// Executable that has to be on `PATH`.
    pub binary: String,
    /// Public domain suffix the provider hands out URLs under.
    pub public_domain: String,
    /// Whether a matched URL must pass an HTTP probe before it is trusted.
    pub requires_verification: bool,
    /// Provider homepage.
    pub homepage: Option<String>,
}

/// Per-provider overrides of the built-in timeout and attempt bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverride {
    /// Connect timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Attempts per cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

// ============================================================================
// Local Target
// ============================================================================

/// The local HTTP service a tunnel forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalTarget {
    /// Host the service listens on.
    pub host: String,
    /// Port the service listens on.
    pub port: u16,
}

impl LocalTarget {
    /// Creates a new target.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Creates a target on the IPv4 loopback address.
    pub fn localhost(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }

    /// Parses `host:port` (or a bare port).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if let Ok(port) = s.parse::<u16>() {
            return Ok(Self::localhost(port));
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CoreError::InvalidTarget(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| CoreError::InvalidTarget(s.to_string()))?;
        if host.is_empty() {
            return Err(CoreError::InvalidTarget(s.to_string()));
        }

        Ok(Self::new(host, port))
    }

    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns a plain-HTTP URL to `path` on the local service.
    pub fn http_url(&self, path: &str) -> String {
        join_url(&format!("http://{}", self.addr()), path)
    }
}

impl fmt::Display for LocalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

// ============================================================================
// Tests
// ============================================================================
