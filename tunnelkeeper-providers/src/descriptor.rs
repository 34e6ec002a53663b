//! Provider descriptor system.
//!
//! A descriptor contains all the static configuration for a provider:
//! - Metadata (display name, binary, public domain)
//! - Launch command template
//! - URL pattern and connect timeout
//! - CLI names

use regex::Regex;
use std::time::Duration;

use tunnelkeeper_core::{LocalTarget, ProviderKind, ProviderMetadata};
use tunnelkeeper_tunnel::CommandSpec;

// ============================================================================
// Provider Descriptor
// ============================================================================

/// Complete descriptor for a provider.
pub struct ProviderDescriptor {
    /// Provider identifier.
    pub id: ProviderKind,
    /// Display metadata.
    pub metadata: ProviderMetadata,
    /// How to start the tunnel.
    pub launch: LaunchConfig,
    /// Pattern matching the public URL in the provider's output.
    pub url_pattern: fn() -> &'static Regex,
    /// How long to wait for the URL.
    pub timeout: Duration,
    /// Attempts per cycle. `None` uses the configured default.
    pub max_attempts: Option<u32>,
    /// CLI names.
    pub cli: CliConfig,
}

impl ProviderDescriptor {
    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.metadata.display_name
    }

    /// Returns the CLI name.
    pub fn cli_name(&self) -> &str {
        self.cli.name
    }

    /// Returns the URL pattern.
    pub fn url_pattern(&self) -> &'static Regex {
        (self.url_pattern)()
    }

    /// Renders the launch command for `target`.
    pub fn command(&self, target: &LocalTarget) -> CommandSpec {
        self.launch.render(target)
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("program", &self.launch.program)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Launch Config
// ============================================================================

/// Command template. `{host}` and `{port}` in arguments are replaced with
/// the local target.
#[derive(Debug, Clone, Copy)]
pub struct LaunchConfig {
    /// Program to run.
    pub program: &'static str,
    /// Argument templates.
    pub args: &'static [&'static str],
}

impl LaunchConfig {
    /// Substitutes the target into the argument templates.
    pub fn render(&self, target: &LocalTarget) -> CommandSpec {
        let port = target.port.to_string();
        CommandSpec::new(self.program).args(
            self.args
                .iter()
                .map(|arg| arg.replace("{host}", &target.host).replace("{port}", &port)),
        )
    }
}

// ============================================================================
// CLI Config
// ============================================================================

/// Names the provider is known by on the command line and in settings.
#[derive(Debug, Clone, Copy)]
pub struct CliConfig {
    /// Primary CLI name.
    pub name: &'static str,
    /// Alternative names.
    pub aliases: &'static [&'static str],
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Metadata for a provider whose URLs must be verified.
pub(crate) fn verified_metadata(
    id: ProviderKind,
    binary: &str,
    public_domain: &str,
    homepage: &str,
) -> ProviderMetadata {
    ProviderMetadata {
        id,
        display_name: id.display_name().to_string(),
        binary: binary.to_string(),
        public_domain: public_domain.to_string(),
        requires_verification: true,
        homepage: Some(homepage.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_target() {
        let launch = LaunchConfig {
            program: "ssh",
            args: &["-R", "80:{host}:{port}", "example.net"],
        };
        let spec = launch.render(&LocalTarget::new("0.0.0.0", 8080));

        assert_eq!(spec.program, "ssh");
        assert_eq!(spec.args, vec!["-R", "80:0.0.0.0:8080", "example.net"]);
    }
}
