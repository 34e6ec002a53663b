//! Tunnel error types.

use std::time::Duration;
use thiserror::Error;

use tunnelkeeper_core::AttemptOutcome;

// ============================================================================
// Main Tunnel Error
// ============================================================================

/// Error type for orchestrator-level operations.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Process error.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Publishing the URL failed.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// A failover cycle did not produce a tunnel.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] tunnelkeeper_core::CoreError),
}

// ============================================================================
// Attempt Error
// ============================================================================

/// Why a single connection attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The provider binary is not installed.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The OS refused to create the child process.
    #[error("Failed to spawn provider process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    /// No URL was observed within the provider timeout.
    #[error("No public URL within {0:?}")]
    ConnectTimeout(Duration),

    /// The child exited before printing a URL.
    #[error("Provider process exited before printing a URL (code {code:?})")]
    ProcessExited {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },

    /// A URL was observed but the public endpoint did not answer 200.
    #[error("Verification of {url} failed: {reason}")]
    VerificationFailed {
        /// The candidate URL.
        url: String,
        /// Probe status or transport error.
        reason: String,
    },
}

impl AttemptError {
    /// Returns true if retrying this provider within the cycle is pointless.
    ///
    /// Spawn failures count as unavailability: a missing binary will not
    /// appear later in the same cycle.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::ProcessSpawn(_))
    }

    /// Maps the error onto the outcome recorded in attempt logs.
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::ProviderUnavailable(_) | Self::ProcessSpawn(_) => AttemptOutcome::Unavailable,
            Self::ConnectTimeout(_) => AttemptOutcome::Timeout,
            Self::ProcessExited { .. } => AttemptOutcome::Exited,
            Self::VerificationFailed { .. } => AttemptOutcome::VerificationFailed,
        }
    }
}

impl From<ProcessError> for AttemptError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(cmd) => Self::ProviderUnavailable(cmd),
            ProcessError::Spawn(e) | ProcessError::Io(e) => Self::ProcessSpawn(e),
        }
    }
}

// ============================================================================
// Cycle Error
// ============================================================================

/// Why a whole failover cycle failed.
#[derive(Debug, Error)]
pub enum CycleError {
    /// No providers are configured.
    #[error("No tunnel providers configured")]
    NoProviders,

    /// Every provider used up its attempts or was unavailable.
    #[error("All providers exhausted after {attempts} attempts")]
    AllProvidersExhausted {
        /// Number of attempts made during the cycle.
        attempts: usize,
    },
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found on `PATH`.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Spawning the child failed.
    #[error("Spawn failed: {0}")]
    Spawn(#[source] std::io::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Publish Error
// ============================================================================

/// Error type for URL publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other publisher failure.
    #[error("{0}")]
    Other(String),
}
