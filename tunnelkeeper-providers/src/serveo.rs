//! Serveo: SSH reverse forwarding through serveo.net.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use tunnelkeeper_core::ProviderKind;

use crate::descriptor::{CliConfig, LaunchConfig, ProviderDescriptor, verified_metadata};

/// Serveo hands out both `serveo.net` and `serveousercontent.com` hosts.
static SERVEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[a-zA-Z0-9-]+\.(?:serveo\.net|serveousercontent\.com)")
        .expect("Invalid regex")
});

fn url_pattern() -> &'static Regex {
    &SERVEO_URL
}

/// Serveo descriptor.
pub fn serveo_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Serveo,
        metadata: verified_metadata(
            ProviderKind::Serveo,
            "ssh",
            "serveo.net",
            "https://serveo.net",
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
                "serveo.net",
            ],
        },
        url_pattern,
        timeout: Duration::from_secs(20),
        max_attempts: None,
        cli: CliConfig {
            name: "serveo",
            aliases: &[],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_forwarding_banner() {
        let line = "Forwarding HTTP traffic from https://f00dcafe.serveo.net";
        let m = SERVEO_URL.find(line).unwrap();
        assert_eq!(m.as_str(), "https://f00dcafe.serveo.net");
    }

    #[test]
    fn test_matches_usercontent_host() {
        let line = "Forwarding HTTP traffic from https://8a1b2c3d-1-2-3-4.serveousercontent.com";
        assert_eq!(
            SERVEO_URL.find(line).unwrap().as_str(),
            "https://8a1b2c3d-1-2-3-4.serveousercontent.com"
        );
    }

    #[test]
    fn test_ignores_other_hosts() {
        assert!(SERVEO_URL.find("Press g to start a GUI session").is_none());
        assert!(SERVEO_URL.find("https://abc.lhr.life").is_none());
    }
}
