//! localtunnel via the `lt` npm client.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use tunnelkeeper_core::ProviderKind;

use crate::descriptor::{CliConfig, LaunchConfig, ProviderDescriptor, verified_metadata};

static LOCA_LT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[a-z0-9-]+\.loca\.lt").expect("Invalid regex"));

fn url_pattern() -> &'static Regex {
    &LOCA_LT_URL
}

/// localtunnel descriptor.
pub fn localtunnel_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Localtunnel,
        metadata: verified_metadata(
            ProviderKind::Localtunnel,
            "lt",
            "loca.lt",
            "https://theboroer.github.io/localtunnel-www/",
        ),
        launch: LaunchConfig {
            program: "lt",
            args: &["--port", "{port}", "--local-host", "{host}"],
        },
        url_pattern,
        timeout: Duration::from_secs(15),
        max_attempts: None,
        cli: CliConfig {
            name: "localtunnel",
            aliases: &["lt"],
        },
    }
}
