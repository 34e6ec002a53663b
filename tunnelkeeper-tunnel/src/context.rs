//! Tunnel context providing access to host APIs.
//!
//! The context is passed to every provider and to the failover pipeline.
//! It bundles the process runner, the health probe, the URL publisher and
//! the runtime settings.

use std::sync::Arc;
use std::time::Duration;

use tunnelkeeper_core::LocalTarget;

use crate::host::{
    process::{DEFAULT_TERMINATE_GRACE, ProcessRunner},
    publish::{MemoryPublisher, UrlPublisher},
};
use crate::probe::{HealthProbe, HttpProbe};
use crate::retry::RetryPolicy;

/// Default path probed on the local service and through the tunnel.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

// ============================================================================
// Tunnel Settings
// ============================================================================

/// Runtime settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    /// Local service to expose.
    pub target: LocalTarget,
    /// Health path probed through candidate URLs and on the local service.
    pub health_path: String,
    /// Attempt bound, inter-attempt delay and cooldown.
    pub retry: RetryPolicy,
    /// Interval between health checks of the active tunnel.
    pub health_interval: Duration,
    /// Timeout of a single verification request.
    pub verify_timeout: Duration,
    /// Wait after a URL appears before probing it.
    pub verify_delay: Duration,
    /// Grace period between SIGTERM and SIGKILL.
    pub terminate_grace: Duration,
    /// Whether to wait for the local service before launching providers.
    pub require_local_health: bool,
    /// Wait between local service probes.
    pub local_wait: Duration,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            target: LocalTarget::localhost(5000),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            retry: RetryPolicy::default(),
            health_interval: Duration::from_secs(60),
            verify_timeout: Duration::from_secs(10),
            verify_delay: Duration::from_secs(3),
            terminate_grace: DEFAULT_TERMINATE_GRACE,
            require_local_health: true,
            local_wait: Duration::from_secs(5),
        }
    }
}

impl TunnelSettings {
    /// Settings for exposing `target` with everything else at defaults.
    pub fn for_target(target: LocalTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the health endpoint on the local service.
    pub fn local_health_url(&self) -> String {
        self.target.http_url(&self.health_path)
    }
}

// ============================================================================
// Tunnel Context
// ============================================================================

/// Context provided to providers and the pipeline.
pub struct TunnelContext {
    /// Process runner for provider binaries.
    pub process: Arc<ProcessRunner>,
    /// Reachability probe.
    pub probe: Arc<dyn HealthProbe>,
    /// Sink for the active URL.
    pub publisher: Arc<dyn UrlPublisher>,
    /// Runtime settings.
    pub settings: TunnelSettings,
}

impl TunnelContext {
    /// Creates a context with default host APIs and the given settings.
    ///
    /// The URL is only kept in memory; use the builder to publish elsewhere.
    pub fn with_settings(settings: TunnelSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> TunnelContextBuilder {
        TunnelContextBuilder::new()
    }

    /// Returns the local target.
    pub fn target(&self) -> &LocalTarget {
        &self.settings.target
    }
}

impl Default for TunnelContext {
    fn default() -> Self {
        Self::with_settings(TunnelSettings::default())
    }
}

impl std::fmt::Debug for TunnelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tunnel Context Builder
// ============================================================================

/// Builder for constructing a `TunnelContext`.
pub struct TunnelContextBuilder {
    process: Option<Arc<ProcessRunner>>,
    probe: Option<Arc<dyn HealthProbe>>,
    publisher: Option<Arc<dyn UrlPublisher>>,
    settings: TunnelSettings,
}

impl TunnelContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            process: None,
            probe: None,
            publisher: None,
            settings: TunnelSettings::default(),
        }
    }

    /// Sets the process runner.
    pub fn process(mut self, process: Arc<ProcessRunner>) -> Self {
        self.process = Some(process);
        self
    }

    /// Sets the health probe.
    pub fn probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the URL publisher.
    pub fn publisher(mut self, publisher: Arc<dyn UrlPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Sets the settings.
    pub fn settings(mut self, settings: TunnelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the local target.
    pub fn target(mut self, target: LocalTarget) -> Self {
        self.settings.target = target;
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Builds the context.
    pub fn build(self) -> TunnelContext {
        let verify_timeout = self.settings.verify_timeout;
        TunnelContext {
            process: self.process.unwrap_or_else(|| Arc::new(ProcessRunner::new())),
            probe: self
                .probe
                .unwrap_or_else(|| Arc::new(HttpProbe::new(verify_timeout))),
            publisher: self
                .publisher
                .unwrap_or_else(|| Arc::new(MemoryPublisher::new())),
            settings: self.settings,
        }
    }
}

impl Default for TunnelContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
