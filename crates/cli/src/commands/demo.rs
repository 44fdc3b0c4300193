//! `demo` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{
    AlignmentConfig, ChannelRole, ChannelSpec, ConfigVersion, LimitsConfig, RateCheckConfig,
    SessionConfig, StoreConfig,
};
use ingestion::{SqliteSessionStore, SyntheticSession};
use lap_timing::LapTable;
use lapsync_cli::Pipeline;
use tracing::info;

use super::load_config;
use crate::cli::DemoArgs;
use crate::error::CliError;

/// Channels written when no configuration is given
fn demo_config() -> SessionConfig {
    SessionConfig {
        version: ConfigVersion::V1,
        store: StoreConfig::default(),
        channels: vec![
            ChannelSpec::new("Ground Speed", ChannelRole::Speed, 100.0),
            ChannelSpec::new("Lap Distance", ChannelRole::Distance, 10.0),
            ChannelSpec::new("Throttle Pos", ChannelRole::Throttle, 50.0),
            ChannelSpec::new("Brake Pos", ChannelRole::Brake, 50.0),
            ChannelSpec::new("GPS Latitude", ChannelRole::Latitude, 10.0),
            ChannelSpec::new("GPS Longitude", ChannelRole::Longitude, 10.0),
            ChannelSpec::new("Engine RPM", ChannelRole::EngineRpm, 100.0),
            ChannelSpec::new("Steering Angle", ChannelRole::SteeringAngle, 50.0),
        ],
        alignment: AlignmentConfig::default(),
        limits: LimitsConfig::default(),
        rate_check: RateCheckConfig::default(),
    }
}

fn ensure_writable(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() {
        if !force {
            return Err(CliError::output_exists(path.display().to_string()).into());
        }
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Execute the `demo` command
pub async fn run_demo(args: &DemoArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => demo_config(),
    };

    ensure_writable(&args.output, args.force)?;
    if let Some(path) = &args.write_config {
        ensure_writable(path, args.force)?;
        let toml = config_loader::ConfigLoader::to_toml(&config)
            .context("Failed to serialize configuration")?;
        std::fs::write(path, toml)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Configuration written");
    }

    let session = SyntheticSession::new(args.lap_times.clone()).with_pre_roll(args.pre_roll);
    info!(
        laps = session.lap_count(),
        duration_s = session.duration_s(),
        channels = config.channels.len(),
        "Generating synthetic session"
    );

    let output = args.output.clone();
    let write_config = config.clone();
    let store = tokio::task::spawn_blocking(move || {
        SqliteSessionStore::create(&output, &write_config, &session)
    })
    .await
    .context("Session writer panicked")?
    .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let pipeline = Pipeline::new(config, Arc::new(store));
    let laps = pipeline
        .resolve_laps()
        .await
        .context("Failed to read back the generated session")?;

    println!("✓ Session written: {}\n", args.output.display());
    print!("{}", LapTable::new(&laps));

    Ok(())
}
