//! Tunnel provider driven by a descriptor's command template.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use tunnelkeeper_core::{LocalTarget, ProviderOverride};
use tunnelkeeper_tunnel::{CommandSpec, TunnelProvider};

use crate::descriptor::ProviderDescriptor;

/// Launches a descriptor's command and watches for its URL pattern.
#[derive(Debug, Clone, Copy)]
pub struct CommandProvider {
    descriptor: &'static ProviderDescriptor,
    timeout: Duration,
    max_attempts: Option<u32>,
}

impl CommandProvider {
    /// Creates a provider with the descriptor's defaults.
    pub fn new(descriptor: &'static ProviderDescriptor) -> Self {
        Self {
            descriptor,
            timeout: descriptor.timeout,
            max_attempts: descriptor.max_attempts,
        }
    }

    /// Applies user overrides of timeout and attempt bound.
    pub fn with_override(mut self, config: ProviderOverride) -> Self {
        if let Some(secs) = config.timeout_secs {
            self.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = config.max_attempts {
            self.max_attempts = Some(n.max(1));
        }
        self
    }

    /// Returns the descriptor.
    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        self.descriptor
    }
}

#[async_trait]
impl TunnelProvider for CommandProvider {
    fn id(&self) -> &str {
        self.descriptor.cli_name()
    }

    fn display_name(&self) -> String {
        self.descriptor.display_name().to_string()
    }

    fn command(&self, target: &LocalTarget) -> CommandSpec {
        self.descriptor.command(target)
    }

    fn url_pattern(&self) -> &Regex {
        self.descriptor.url_pattern()
    }

    fn connect_timeout(&self) -> Duration {
        self.timeout
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    fn requires_verification(&self) -> bool {
        self.descriptor.metadata.requires_verification
    }
}
