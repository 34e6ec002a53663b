//! Providers command - list tunnel providers.

use anyhow::Result;
use futures::future::join_all;
use tracing::info;

use tunnelkeeper_providers::ProviderRegistry;
use tunnelkeeper_tunnel::{ProviderInfo, TunnelContext};

use super::{TunnelArgs, load_settings};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Listing providers");

    let settings = load_settings(cli, &TunnelArgs::default()).await?;
    let enabled: Vec<String> =
        ProviderRegistry::ordered(&settings.provider_order, &settings.disabled_providers)?
            .iter()
            .map(|d| d.cli_name().to_string())
            .collect();

    // Every registered provider, enabled or not, with the user's overrides.
    let providers = ProviderRegistry::build(&[], &[], &settings.provider_overrides)?;
    let ctx = TunnelContext::with_settings(settings.tunnel_settings());
    let infos: Vec<ProviderInfo> = join_all(
        providers
            .iter()
            .map(|p| ProviderInfo::from_provider(p.as_ref(), &ctx)),
    )
    .await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_providers_header());
            println!("{}", "─".repeat(70));

            for info in &infos {
                let position = enabled.iter().position(|id| *id == info.id);
                println!("{}", formatter.format_provider_line(info, position));
            }

            println!();
            println!(
                "Total: {} providers ({} installed, {} enabled)",
                infos.len(),
                infos.iter().filter(|i| i.available).count(),
                enabled.len()
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_providers(&infos, &enabled)?);
        }
    }

    Ok(ExitCode::Success)
}
