// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tunnelkeeper Tunnel
//!
//! Provider processes, verification and failover for tunnelkeeper.
//!
//! ## Host APIs
//!
//! The [`host`] module wraps system interactions:
//!
//! - [`host::process`] - Spawning provider binaries and reading their output
//! - [`host::http`] - HTTP client used by the reachability probe
//! - [`host::publish`] - Where the active URL is published
//!
//! ## Orchestration
//!
//! - [`provider::TunnelProvider`] - Trait for one tunneling mechanism
//! - [`attempt::run_attempt`] - Drives one connection attempt
//! - [`pipeline::FailoverPipeline`] - Tries providers in order, verifying candidates
//! - [`session::SessionState`] - The single published tunnel
//! - [`supervisor::Supervisor`] - Reconnection loop and health monitor
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tunnelkeeper_tunnel::{FailoverPipeline, Supervisor, TunnelContext};
//!
//! let ctx = Arc::new(TunnelContext::default());
//! let pipeline = FailoverPipeline::new(tunnelkeeper_providers::providers());
//! let supervisor = Supervisor::new(ctx, pipeline);
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! supervisor.run(shutdown).await;
//! ```

pub mod attempt;
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod probe;
pub mod provider;
pub mod retry;
pub mod session;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_support;

// Errors
pub use error::{AttemptError, CycleError, HttpError, ProcessError, PublishError, TunnelError};

// Host APIs
pub use host::{
    http::HttpClient,
    process::{CommandSpec, OutputStream, ProcessRunner, TunnelProcess, pid_is_alive},
    publish::{MemoryPublisher, UrlPublisher},
};

// Orchestration
pub use attempt::run_attempt;
pub use context::{TunnelContext, TunnelContextBuilder, TunnelSettings};
pub use pipeline::{Activation, CycleOutcome, FailoverPipeline};
pub use probe::{HealthProbe, HttpProbe, ProbeResult, verify};
pub use provider::{Candidate, ProviderInfo, TunnelProvider};
pub use retry::{CycleState, RetryPolicy};
pub use session::SessionState;
pub use supervisor::{ReconnectReason, Supervisor};
