//! Pinggy: SSH reverse forwarding over port 443.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use tunnelkeeper_core::ProviderKind;

use crate::descriptor::{CliConfig, LaunchConfig, ProviderDescriptor, verified_metadata};

static PINGGY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[a-z0-9-]+\.a\.free\.pinggy\.link").expect("Invalid regex")
});

fn url_pattern() -> &'static Regex {
    &PINGGY_URL
}

/// Pinggy descriptor.
pub fn pinggy_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Pinggy,
        metadata: verified_metadata(
            ProviderKind::Pinggy,
            "ssh",
            "a.free.pinggy.link",
            "https://pinggy.io",
        ),
        launch: LaunchConfig {
            program: "ssh",
            args: &[
                "-p",
                "443",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "ServerAliveInterval=30",
                "-R0:{host}:{port}",
                "a.pinggy.io",
            ],
        },
        url_pattern,
        timeout: Duration::from_secs(15),
        max_attempts: None,
        cli: CliConfig {
            name: "pinggy",
            aliases: &[],
        },
    }
}
