//! `analyze` command implementation.

use anyhow::{Context, Result};
use lapsync_cli::{LapSelection, Pipeline};
use tracing::{info, warn};

use super::{load_config, open_store, shutdown_signal};
use crate::cli::AnalyzeArgs;
use crate::error::CliError;

/// Execute the `analyze` command
pub async fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    info!(config = %args.config.display(), db = %args.db.display(), "Loading configuration");

    let mut config = load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(stride) = args.stride {
        info!(stride, "Overriding stride from CLI");
        config.alignment.stride = stride;
    }
    if let Some(timeout) = args.timeout {
        info!(timeout_s = timeout, "Overriding timeout from CLI");
        config.limits.timeout_s = timeout;
    }
    config_loader::ConfigLoader::validate(&config)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let store = open_store(&args.db, &config)?;
    let pipeline = Pipeline::new(config, store);
    let selection = LapSelection::from(args.lap);

    let output = tokio::select! {
        result = pipeline.analyze(selection) => {
            result.context("Analysis failed")?
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning analysis");
            return Err(CliError::Interrupted.into());
        }
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&output.analysis)
    } else {
        serde_json::to_string(&output.analysis)
    }
    .context("Failed to serialize analysis")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), points = output.analysis.points.len(), "Analysis written");
        }
        None => println!("{}", json),
    }

    if !args.no_summary {
        output.stats.print_summary();
    }

    Ok(())
}
