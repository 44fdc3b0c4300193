//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelRole, MissingChannelPolicy, SessionConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    channel_count: usize,
    reference_channel: String,
    reference_rate_hz: f64,
    stride: usize,
    max_samples_per_channel: u64,
    timeout_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let (reference_channel, reference_rate_hz) = config
                .reference_channel()
                .map(|c| (c.name.to_string(), c.sample_rate_hz))
                .unwrap_or_default();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    channel_count: config.channels.len(),
                    reference_channel,
                    reference_rate_hz,
                    stride: config.stride().get(),
                    max_samples_per_channel: config.limits.max_samples_per_channel,
                    timeout_s: config.limits.timeout_s,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SessionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let has_lat = config.channel(ChannelRole::Latitude).is_some();
    let has_lon = config.channel(ChannelRole::Longitude).is_some();
    match (has_lat, has_lon) {
        (false, false) => {
            warnings.push("No GPS channels configured - lat/lon will be null".to_string())
        }
        (true, false) | (false, true) => warnings.push(
            "Only one GPS axis configured - lat/lon will be null without both".to_string(),
        ),
        (true, true) => {}
    }

    for role in ChannelRole::ALL {
        if !role.is_gps() && !role.is_mandatory() && config.channel(role).is_none() {
            warnings.push(format!("No '{}' channel configured", role));
        }
    }

    if config.alignment.missing_channels == MissingChannelPolicy::Zero {
        warnings.push(
            "alignment.missing_channels = \"zero\" reports empty channels as 0.0".to_string(),
        );
    }

    if !config.rate_check.enabled {
        warnings.push("rate_check is disabled - sample rates are trusted as declared".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Channels: {}", summary.channel_count);
            println!(
                "  Reference: {} ({} Hz)",
                summary.reference_channel, summary.reference_rate_hz
            );
            println!("  Stride: {}", summary.stride);
            println!(
                "  Limits: {} samples/channel, {}s",
                summary.max_samples_per_channel, summary.timeout_s
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
