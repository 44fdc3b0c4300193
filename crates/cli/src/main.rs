//! # lapsync
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Lap listing and single-lap analysis
//! - Synthetic session generation

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::debug;

use cli::{Cli, Commands};
use commands::{run_analyze, run_demo, run_info, run_laps, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(
        ObservabilityConfig {
            log_format: cli.log_format.into(),
            metrics_port: None,
            ..Default::default()
        }
        .with_verbosity(cli.verbose, cli.quiet),
    )?;

    debug!(version = env!("CARGO_PKG_VERSION"), "lapsync starting");

    let result = match &cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Laps(args) => run_laps(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Demo(args) => run_demo(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
