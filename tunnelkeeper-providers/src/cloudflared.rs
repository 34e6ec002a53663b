//! Cloudflare quick tunnels via `cloudflared`.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use tunnelkeeper_core::ProviderKind;

use crate::descriptor::{CliConfig, LaunchConfig, ProviderDescriptor, verified_metadata};

/// Quick tunnel hosts are hyphenated word lists, which keeps
/// `https://api.trycloudflare.com` in error lines from matching.
static TRYCLOUDFLARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[a-z0-9]+(?:-[a-z0-9]+)+\.trycloudflare\.com").expect("Invalid regex")
});

fn url_pattern() -> &'static Regex {
    &TRYCLOUDFLARE_URL
}

/// cloudflared descriptor.
pub fn cloudflared_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Cloudflared,
        metadata: verified_metadata(
            ProviderKind::Cloudflared,
            "cloudflared",
            "trycloudflare.com",
            "https://developers.cloudflare.com/cloudflare-one/connections/connect-networks/",
        ),
        launch: LaunchConfig {
            program: "cloudflared",
            args: &["tunnel", "--no-autoupdate", "--url", "http://{host}:{port}"],
        },
        url_pattern,
        timeout: Duration::from_secs(30),
        max_attempts: None,
        cli: CliConfig {
            name: "cloudflared",
            aliases: &["cf", "trycloudflare"],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_banner_box() {
        let line = "2024-05-01T10:00:00Z INF |  https://gentle-river-bright-stone.trycloudflare.com                |";
        assert_eq!(
            TRYCLOUDFLARE_URL.find(line).unwrap().as_str(),
            "https://gentle-river-bright-stone.trycloudflare.com"
        );
    }

    #[test]
    fn test_ignores_api_endpoint() {
        let line = r#"ERR failed to request quick Tunnel: Post "https://api.trycloudflare.com/tunnel""#;
        assert!(TRYCLOUDFLARE_URL.find(line).is_none());
    }
}
