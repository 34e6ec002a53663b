//! Domain models for tunnelkeeper.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider types (ProviderKind, Metadata, LocalTarget)
//! - [`attempt`] - Connection attempt records
//! - [`state`] - Orchestrator lifecycle state (TunnelState, SessionInfo)

mod attempt;
mod provider;
mod state;

// Re-export everything at the models level
pub use attempt::{AttemptOutcome, AttemptRecord};
pub use provider::{join_url, LocalTarget, ProviderKind, ProviderMetadata, ProviderOverride};
pub use state::{SessionInfo, TunnelState};
