//! CLI command implementations.

pub mod check;
pub mod config;
pub mod providers;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use tunnelkeeper_providers::ProviderRegistry;
use tunnelkeeper_store::{Settings, SettingsStore, default_settings_path};
use tunnelkeeper_tunnel::{FailoverPipeline, TunnelContext, UrlPublisher};

use crate::Cli;

/// Flags overriding saved settings for one invocation.
#[derive(Args, Debug, Clone, Default)]
pub struct TunnelArgs {
    /// Local port to expose.
    #[arg(long)]
    pub port: Option<u16>,

    /// Local host to expose.
    #[arg(long)]
    pub host: Option<String>,

    /// Health path probed locally and through the tunnel.
    #[arg(long)]
    pub health_path: Option<String>,

    /// File the active URL is written to.
    #[arg(long)]
    pub publish_path: Option<PathBuf>,

    /// Providers to try, in order. Comma-separated: "cloudflared,serveo".
    #[arg(long, short, value_delimiter = ',')]
    pub provider: Vec<String>,

    /// Seconds to wait after every provider failed.
    #[arg(long)]
    pub cooldown: Option<u64>,

    /// Attempts per provider.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Launch providers without waiting for the local service.
    #[arg(long)]
    pub skip_local_check: bool,
}

impl TunnelArgs {
    /// Applies the flags on top of `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.local_port = port;
        }
        if let Some(host) = &self.host {
            settings.local_host.clone_from(host);
        }
        if let Some(path) = &self.health_path {
            settings.health_path.clone_from(path);
        }
        if let Some(path) = &self.publish_path {
            settings.publish_path = Some(path.clone());
        }
        if !self.provider.is_empty() {
            settings.provider_order.clone_from(&self.provider);
            settings.disabled_providers.clear();
        }
        if let Some(secs) = self.cooldown {
            settings.cooldown_secs = secs;
        }
        if let Some(n) = self.max_attempts {
            settings.max_attempts_per_provider = n;
        }
        if self.skip_local_check {
            settings.require_local_health = false;
        }
    }
}

/// Path of the settings file in use.
pub fn settings_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_settings_path)
}

/// Loads the settings file with `args` applied, validated.
pub async fn load_settings(cli: &Cli, args: &TunnelArgs) -> Result<Settings> {
    let store = SettingsStore::load(settings_path(cli)).await;
    let mut settings = store.get().await;
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// Builds the context and pipeline for `settings`.
///
/// Without a publisher the URL is only kept in memory.
pub fn build_runtime(
    settings: &Settings,
    publisher: Option<Arc<dyn UrlPublisher>>,
) -> Result<(TunnelContext, FailoverPipeline)> {
    let providers = ProviderRegistry::build(
        &settings.provider_order,
        &settings.disabled_providers,
        &settings.provider_overrides,
    )
    .context("Invalid provider selection")?;

    if providers.is_empty() {
        anyhow::bail!("No providers enabled");
    }

    let mut builder = TunnelContext::builder().settings(settings.tunnel_settings());
    if let Some(publisher) = publisher {
        builder = builder.publisher(publisher);
    }

    Ok((builder.build(), FailoverPipeline::new(providers)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = TunnelArgs {
            port: Some(8080),
            provider: vec!["cf".to_string(), "serveo".to_string()],
            cooldown: Some(30),
            skip_local_check: true,
            ..TunnelArgs::default()
        };
        let mut settings = Settings {
            disabled_providers: vec!["serveo".to_string()],
            ..Settings::default()
        };
        args.apply(&mut settings);

        assert_eq!(settings.local_port, 8080);
        assert_eq!(settings.local_host, "127.0.0.1");
        assert_eq!(settings.provider_order, vec!["cf", "serveo"]);
        assert!(settings.disabled_providers.is_empty());
        assert_eq!(settings.cooldown_secs, 30);
        assert!(!settings.require_local_health);
    }

    #[tokio::test]
    async fn test_out_of_range_cooldown_is_rejected() {
        use clap::Parser;

        let missing = std::env::temp_dir().join("tunnelkeeper-no-such-settings.json");
        let cli = Cli::parse_from(["tunnelkeeper", "--config", missing.to_str().unwrap()]);
        let args = TunnelArgs {
            cooldown: Some(10_000_000_000_000),
            ..TunnelArgs::default()
        };

        assert!(load_settings(&cli, &args).await.is_err());
    }

    #[test]
    fn test_build_runtime_follows_order() {
        let settings = Settings {
            provider_order: vec!["lt".to_string(), "pinggy".to_string()],
            ..Settings::default()
        };
        let (ctx, pipeline) = build_runtime(&settings, None).unwrap();

        assert_eq!(pipeline.provider_ids(), vec!["localtunnel", "pinggy"]);
        assert_eq!(ctx.target().port, 5000);
    }

    #[test]
    fn test_build_runtime_rejects_unknown_and_empty() {
        let unknown = Settings {
            provider_order: vec!["ngrok".to_string()],
            ..Settings::default()
        };
        assert!(build_runtime(&unknown, None).is_err());

        let none = Settings {
            provider_order: vec!["serveo".to_string()],
            disabled_providers: vec!["serveo".to_string()],
            ..Settings::default()
        };
        assert!(build_runtime(&none, None).is_err());
    }
}
