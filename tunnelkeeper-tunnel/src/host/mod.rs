//! Host APIs used by the orchestrator.
//!
//! - [`http`] - HTTP client with tracing and URL validation
//! - [`process`] - Provider subprocesses with merged line output
//! - [`publish`] - Sinks for the active public URL

pub mod http;
pub mod process;
pub mod publish;

// Re-export key types
pub use http::HttpClient;
pub use process::{CommandSpec, OutputStream, ProcessRunner, TunnelProcess};
pub use publish::{MemoryPublisher, UrlPublisher};
