//! Check command - open one verified tunnel, report it, close it.
//!
//! The URL is not written to the publish file: the tunnel is torn down
//! before the command exits.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use tunnelkeeper_tunnel::Supervisor;

use super::{TunnelArgs, build_runtime, load_settings};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the check command.
pub async fn run(args: &TunnelArgs, cli: &Cli) -> Result<ExitCode> {
    let settings = load_settings(cli, args).await?;
    let (ctx, pipeline) = build_runtime(&settings, None)?;

    if ctx.settings.require_local_health {
        let url = ctx.settings.local_health_url();
        let local = ctx.probe.check(&url).await;
        if !local.success {
            anyhow::bail!(
                "Local service at {url} is not healthy: {}",
                local.failure_reason()
            );
        }
    }

    info!(providers = ?pipeline.provider_ids(), "Running one failover cycle");
    let supervisor = Supervisor::new(Arc::new(ctx), pipeline);
    let outcome = supervisor.run_once().await;
    supervisor.session().deactivate().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for record in &outcome.attempts {
                println!("{}", formatter.format_attempt(record));
            }
            println!();
            println!("{}", formatter.format_cycle_result(&outcome));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_cycle(&outcome)?);
        }
    }

    Ok(if outcome.is_success() {
        ExitCode::Success
    } else {
        ExitCode::NoTunnel
    })
}
