//! localhost.run: SSH reverse forwarding, URLs under `lhr.life`.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use tunnelkeeper_core::ProviderKind;

use crate::descriptor::{CliConfig, LaunchConfig, ProviderDescriptor, verified_metadata};

static LHR_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[a-z0-9-]+\.lhr\.life").expect("Invalid regex"));

fn url_pattern() -> &'static Regex {
    &LHR_URL
}

/// localhost.run descriptor.
pub fn localhost_run_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::LocalhostRun,
        metadata: verified_metadata(
            ProviderKind::LocalhostRun,
            "ssh",
            "lhr.life",
            "https://localhost.run",
        ),
        launch: LaunchConfig {
            program: "ssh",
            args: &[
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "ServerAliveInterval=30",
                "-R",
                "80:{host}:{port}",
                "nokey@localhost.run",
            ],
        },
        url_pattern,
        timeout: Duration::from_secs(20),
        max_attempts: None,
        cli: CliConfig {
            name: "localhost-run",
            aliases: &["lhr", "localhost.run"],
        },
    }
}
