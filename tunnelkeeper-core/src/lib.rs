// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # tunnelkeeper core
//!
//! Core types shared by every tunnelkeeper crate.
//!
//! ## Key Types
//!
//! ### Providers
//! - [`ProviderKind`] - Built-in tunnel providers
//! - [`ProviderMetadata`] - Binary, public domain and display info
//! - [`LocalTarget`] - The local `host:port` being exposed
//!
//! ### Attempts
//! - [`AttemptRecord`] - One connection attempt, for diagnostics
//! - [`AttemptOutcome`] - How an attempt ended
//!
//! ### Lifecycle
//! - [`TunnelState`] - Orchestrator state machine
//! - [`SessionInfo`] - Serializable status snapshot

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    join_url, AttemptOutcome, AttemptRecord, LocalTarget, ProviderKind, ProviderMetadata,
    ProviderOverride, SessionInfo, TunnelState,
};
