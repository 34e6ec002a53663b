// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tunnelkeeper Providers
//!
//! Built-in tunnel providers. Each provider module contains a descriptor:
//! the launch command template, the URL pattern and the connect timeout.
//! [`CommandProvider`] turns a descriptor into a runnable
//! [`TunnelProvider`](tunnelkeeper_tunnel::TunnelProvider).
//!
//! ## Supported Providers
//!
//! | Provider | Binary | Public domain | Timeout |
//! |----------|--------|---------------|---------|
//! | Serveo | `ssh` | serveo.net | 20s |
//! | localhost.run | `ssh` | lhr.life | 20s |
//! | Cloudflare Tunnel | `cloudflared` | trycloudflare.com | 30s |
//! | Pinggy | `ssh` | a.free.pinggy.link | 15s |
//! | localtunnel | `lt` | loca.lt | 15s |
//!
//! ## Usage
//!
//! ```ignore
//! use tunnelkeeper_providers::ProviderRegistry;
//! use tunnelkeeper_tunnel::FailoverPipeline;
//!
//! let providers = ProviderRegistry::build(&order, &disabled, &overrides)?;
//! let pipeline = FailoverPipeline::new(providers);
//! ```

pub mod command;
pub mod descriptor;
pub mod registry;

// Provider modules (priority order)
pub mod serveo;
pub mod localhost_run;
pub mod cloudflared;
pub mod pinggy;
pub mod localtunnel;

// Re-export key types
pub use command::CommandProvider;
pub use descriptor::{CliConfig, LaunchConfig, ProviderDescriptor};
pub use registry::{ProviderRegistry, providers};

// Re-export provider descriptors
pub use cloudflared::cloudflared_descriptor;
pub use localhost_run::localhost_run_descriptor;
pub use localtunnel::localtunnel_descriptor;
pub use pinggy::pinggy_descriptor;
pub use serveo::serveo_descriptor;
