//! Connection attempt records.
//!
//! An [`AttemptRecord`] is produced for every connection attempt the
//! failover pipeline makes. Records are kept for logging and diagnostics
//! only and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Attempt Outcome
// ============================================================================

/// How a single connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// A URL was observed and passed verification.
    Success,
    /// No URL was observed within the provider's timeout.
    Timeout,
    /// A URL was observed but the public endpoint did not answer 200.
    VerificationFailed,
    /// The provider binary is missing or could not be spawned.
    Unavailable,
    /// The child exited before printing a URL.
    Exited,
}

impl AttemptOutcome {
    /// Returns true for [`AttemptOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::VerificationFailed => "verification-failed",
            Self::Unavailable => "unavailable",
            Self::Exited => "exited",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Attempt Record
// ============================================================================

/// Record of a single connection attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// The provider that was attempted.
    pub provider_id: String,
    /// One-based attempt index within the current cycle.
    pub attempt: u32,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// The candidate URL, if one was observed.
    pub url: Option<String>,
    /// Error description for failed attempts.
    pub error: Option<String>,
    /// How long the attempt took.
    pub duration: Duration,
    /// When the attempt finished.
    pub at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Creates a successful attempt record.
    pub fn success(
        provider_id: impl Into<String>,
        attempt: u32,
        url: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            attempt,
            outcome: AttemptOutcome::Success,
            url: Some(url.into()),
            error: None,
            duration,
            at: Utc::now(),
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        provider_id: impl Into<String>,
        attempt: u32,
        outcome: AttemptOutcome,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            attempt,
            outcome,
            url: None,
            error: Some(error.into()),
            duration,
            at: Utc::now(),
        }
    }

    /// Attaches the candidate URL that was observed.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
