//! Config command - manage configuration.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use tunnelkeeper_providers::ProviderRegistry;
use tunnelkeeper_store::{
    SettingsStore, default_config_dir, default_data_dir, default_status_path,
};

use super::settings_path;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration and data paths.
    Path,

    /// Write a settings file with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Set the local port to expose.
    SetPort {
        /// Port number.
        port: u16,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await?,
        ConfigAction::Path => show_paths(cli).await?,
        ConfigAction::Init { force } => init_config(*force, cli).await?,
        ConfigAction::SetPort { port } => set_port(*port, cli).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load(settings_path(cli)).await;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            let order = ProviderRegistry::ordered(
                &settings.provider_order,
                &settings.disabled_providers,
            )
            .map(|descs| {
                descs
                    .iter()
                    .map(|d| d.cli_name())
                    .collect::<Vec<_>>()
                    .join(" → ")
            })
            .unwrap_or_else(|e| format!("invalid ({e})"));

            println!("tunnelkeeper configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Local service:   {}", settings.target());
            println!("Health path:     {}", settings.health_path);
            println!("Publish file:    {}", settings.publish_path().display());
            println!("Providers:       {order}");
            println!();
            println!("Attempts/provider:   {}", settings.max_attempts_per_provider);
            println!("Attempt delay:       {}s", settings.inter_attempt_delay_secs);
            println!("Cooldown:            {}s", settings.cooldown_secs);
            println!("Health interval:     {}s", settings.health_interval_secs);
            println!("Verify timeout:      {}s", settings.verify_timeout_secs);
            println!("Wait for local:      {}", settings.require_local_health);

            for (name, config) in &settings.provider_overrides {
                println!(
                    "Override {name}: timeout={:?} max_attempts={:?}",
                    config.timeout_secs, config.max_attempts
                );
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load(settings_path(cli)).await;
    let settings = store.get().await;

    let config_dir = default_config_dir();
    let data_dir = default_data_dir();
    let publish = settings.publish_path();
    let status = default_status_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", store.path().display());
            println!("Data dir:      {}", data_dir.display());
            println!("URL file:      {}", publish.display());
            println!("Status file:   {}", status.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": store.path().display().to_string(),
                "data_dir": data_dir.display().to_string(),
                "url_file": publish.display().to_string(),
                "status_file": status.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = settings_path(cli);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let store = SettingsStore::new(path);
    store.save().await.context("Failed to write settings")?;

    info!(path = %store.path().display(), "Settings initialized");
    println!("Wrote defaults to {}", store.path().display());
    Ok(())
}

async fn set_port(port: u16, cli: &Cli) -> Result<()> {
    if port == 0 {
        anyhow::bail!("Port must be non-zero");
    }

    let store = SettingsStore::load(settings_path(cli)).await;
    store.update(|s| s.local_port = port).await;
    store.save().await.context("Failed to write settings")?;

    info!(port, "Local port updated");
    println!("Local port set to: {port}");
    Ok(())
}
