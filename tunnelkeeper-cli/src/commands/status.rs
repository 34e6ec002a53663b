//! Status and url commands - report on a running orchestrator.

use anyhow::Result;

use tunnelkeeper_store::{StatusFile, UrlFile, default_status_path};

use super::{TunnelArgs, load_settings};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Prints the last status snapshot.
pub async fn run_status(cli: &Cli) -> Result<ExitCode> {
    let status = StatusFile::new(default_status_path());
    let Some(info) = status.load().await? else {
        if cli.format == OutputFormat::Json {
            println!("null");
        } else {
            println!("No status recorded. Is tunnelkeeper running?");
        }
        return Ok(ExitCode::NoTunnel);
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_status(&info));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&info)?);
        }
    }

    Ok(if info.is_active() {
        ExitCode::Success
    } else {
        ExitCode::NoTunnel
    })
}

/// Prints the published URL.
///
/// The file outlives the tunnel, so this is the last URL that was
/// published, not necessarily a live one. `status` tells the difference.
pub async fn run_url(cli: &Cli) -> Result<ExitCode> {
    let settings = load_settings(cli, &TunnelArgs::default()).await?;
    let file = UrlFile::new(settings.publish_path());

    match file.read().await? {
        Some(url) => {
            if cli.format == OutputFormat::Json {
                let formatter = JsonFormatter::new(cli.pretty);
                println!(
                    "{}",
                    formatter.format(&serde_json::json!({
                        "url": url,
                        "path": file.path().display().to_string(),
                    }))?
                );
            } else {
                println!("{url}");
            }
            Ok(ExitCode::Success)
        }
        None => {
            eprintln!("No URL published at {}", file.path().display());
            Ok(ExitCode::NoTunnel)
        }
    }
}
