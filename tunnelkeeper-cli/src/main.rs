// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! tunnelkeeper - keeps a local HTTP service reachable through public
//! tunnel providers.
//!
//! # Examples
//!
//! ```bash
//! # Expose port 5000 until Ctrl+C
//! tunnelkeeper
//!
//! # Expose port 8080, trying cloudflared first
//! tunnelkeeper run --port 8080 --provider cloudflared,serveo
//!
//! # One-shot check: open, verify and close a tunnel
//! tunnelkeeper check --provider lhr
//!
//! # List providers and whether they are installed
//! tunnelkeeper providers --format json
//!
//! # Current state of a running instance
//! tunnelkeeper status
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{TunnelArgs, check, config, providers, run, status};

// ============================================================================
// CLI Definition
// ============================================================================

/// tunnelkeeper - public tunnel orchestrator.
#[derive(Parser)]
#[command(name = "tunnelkeeper")]
#[command(about = "Keeps a local HTTP service reachable through public tunnels")]
#[command(long_about = r#"
tunnelkeeper launches a tunnel provider, verifies the public URL through the
service's health endpoint, publishes it to a file and fails over to the next
provider whenever the tunnel stops answering.

Providers, in default order:
  • Serveo (serveo)
  • localhost.run (localhost-run, lhr)
  • Cloudflare Tunnel (cloudflared, cf)
  • Pinggy (pinggy)
  • localtunnel (localtunnel, lt)

Examples:
  tunnelkeeper                             # Run with saved settings
  tunnelkeeper run --port 8080             # Expose another port
  tunnelkeeper check --provider cf         # One-shot tunnel check
  tunnelkeeper url                         # Print the published URL
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'run' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (defaults to the user config directory).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Keep a tunnel up until interrupted (default).
    #[command(visible_alias = "r")]
    Run(TunnelArgs),

    /// Open one verified tunnel, report it and close it again.
    Check(TunnelArgs),

    /// List tunnel providers.
    #[command(visible_alias = "p")]
    Providers,

    /// Show the state of the running orchestrator.
    #[command(visible_alias = "s")]
    Status,

    /// Print the published URL.
    Url,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No verified tunnel (check failed, nothing published).
    NoTunnel = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let default = if verbose {
        "tunnelkeeper=debug,info"
    } else {
        "tunnelkeeper=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result: Result<ExitCode> = match &cli.command {
        Some(Commands::Run(args)) => run::run(args, &cli).await,
        Some(Commands::Check(args)) => check::run(args, &cli).await,
        Some(Commands::Providers) => providers::run(&cli).await,
        Some(Commands::Status) => status::run_status(&cli).await,
        Some(Commands::Url) => status::run_url(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        None => run::run(&TunnelArgs::default(), &cli).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::Error
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code as i32);
    }
}
