//! Run command - keep a tunnel up until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use tunnelkeeper_store::{StatusFile, UrlFile, default_status_path};
use tunnelkeeper_tunnel::Supervisor;

use super::{TunnelArgs, build_runtime, load_settings};
use crate::{Cli, ExitCode};

/// Runs the orchestrator until SIGINT or SIGTERM.
pub async fn run(args: &TunnelArgs, cli: &Cli) -> Result<ExitCode> {
    let settings = load_settings(cli, args).await?;
    let publisher = UrlFile::new(settings.publish_path());
    info!(path = %publisher.path().display(), "Publishing URL to file");

    let (ctx, pipeline) = build_runtime(&settings, Some(Arc::new(publisher)))?;
    let supervisor = Supervisor::new(Arc::new(ctx), pipeline);

    let status = StatusFile::new(default_status_path());
    let writer = status.clone().follow(supervisor.session().subscribe());

    let (stop_tx, stop_rx) = watch::channel(false);
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    supervisor.run(stop_rx).await;
    signals.abort();

    // Final snapshot, written after the follower so it cannot be overwritten.
    writer.abort();
    let _ = writer.await;
    if let Err(e) = status.save(&supervisor.session().snapshot()).await {
        warn!(path = %status.path().display(), error = %e, "Failed to write final status");
    }

    Ok(ExitCode::Success)
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received interrupt"),
        () = terminate => info!("Received SIGTERM"),
    }
}
