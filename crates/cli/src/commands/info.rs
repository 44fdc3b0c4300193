//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::SessionConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    store: StoreInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<ChannelInfo>,
    alignment: AlignmentInfo,
    limits: LimitsInfo,
}

#[derive(Serialize)]
struct StoreInfo {
    lap_times_table: String,
    sector1_table: String,
    sector2_table: String,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    role: String,
    table: String,
    sample_rate_hz: f64,
}

#[derive(Serialize)]
struct AlignmentInfo {
    reference_channel: Option<String>,
    stride: usize,
    missing_channels: String,
    rate_check: String,
}

#[derive(Serialize)]
struct LimitsInfo {
    max_samples_per_channel: u64,
    timeout_s: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn rate_check_label(config: &SessionConfig) -> String {
    if config.rate_check.enabled {
        format!(
            "{:?} above {:.1}%",
            config.rate_check.policy,
            config.rate_check.tolerance * 100.0
        )
    } else {
        "disabled".to_string()
    }
}

fn build_config_info(config: &SessionConfig, args: &InfoArgs) -> ConfigInfo {
    let channels = if args.channels {
        config
            .channels
            .iter()
            .map(|c| ChannelInfo {
                name: c.name.to_string(),
                role: c.role.to_string(),
                table: c.table_name().to_string(),
                sample_rate_hz: c.sample_rate_hz,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        store: StoreInfo {
            lap_times_table: config.store.lap_times_table.clone(),
            sector1_table: config.store.sector1_table.clone(),
            sector2_table: config.store.sector2_table.clone(),
        },
        channels,
        alignment: AlignmentInfo {
            reference_channel: config.reference_channel().map(|c| c.name.to_string()),
            stride: config.stride().get(),
            missing_channels: format!("{:?}", config.alignment.missing_channels),
            rate_check: rate_check_label(config),
        },
        limits: LimitsInfo {
            max_samples_per_channel: config.limits.max_samples_per_channel,
            timeout_s: config.limits.timeout_s,
        },
    }
}

fn print_config_info(config: &SessionConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  lapsync Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🗄  Store");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Lap times: {}", config.store.lap_times_table);
    println!("   ├─ Sector 1: {}", config.store.sector1_table);
    println!("   └─ Sector 2: {}", config.store.sector2_table);

    println!("\n📡 Channels ({})", config.channels.len());
    if args.channels {
        for (i, channel) in config.channels.iter().enumerate() {
            let prefix = if i == config.channels.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {} {} ({}, {} Hz, table {})",
                prefix,
                channel.name,
                channel.role,
                channel.sample_rate_hz,
                channel.table_name()
            );
        }
    } else {
        let roles: Vec<&str> = config.channels.iter().map(|c| c.role.as_str()).collect();
        println!("   └─ {}", roles.join(", "));
    }

    println!("\n⚙️  Alignment");
    match config.reference_channel() {
        Some(reference) => println!(
            "   ├─ Reference: {} ({} Hz)",
            reference.name, reference.sample_rate_hz
        ),
        None => println!("   ├─ Reference: (none)"),
    }
    println!("   ├─ Stride: {}", config.stride());
    println!(
        "   ├─ Missing channels: {:?}",
        config.alignment.missing_channels
    );
    println!("   └─ Rate check: {}", rate_check_label(config));

    println!("\n⏱  Limits");
    println!(
        "   ├─ Max samples per channel: {}",
        config.limits.max_samples_per_channel
    );
    println!("   └─ Timeout: {}s", config.limits.timeout_s);

    println!();
}
