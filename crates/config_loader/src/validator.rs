//! Configuration validation
//!
//! Rules:
//! - channel names and roles are unique
//! - sample_rate_hz is finite and > 0
//! - `speed` and `distance` channels are present
//! - the speed channel has the highest rate (it is the reference axis)
//! - stride >= 1, limits > 0, rate tolerance in [0, 1)
//! - store identifiers are non-empty and contain no quote characters

use std::collections::HashSet;
use std::time::Duration;

use contracts::{ChannelRole, ContractError, SessionConfig};
use validator::Validate;

/// Validate a `SessionConfig`
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &SessionConfig) -> Result<(), ContractError> {
    validate_channel_names(config)?;
    validate_channel_roles(config)?;
    validate_sample_rates(config)?;
    validate_mandatory_roles(config)?;
    validate_reference_rate(config)?;
    validate_alignment(config)?;
    validate_limits(config)?;
    validate_rate_check(config)?;
    validate_identifiers(config)?;
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))?;
    Ok(())
}

fn validate_channel_names(config: &SessionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for channel in &config.channels {
        if channel.name.is_empty() {
            return Err(ContractError::config_validation(
                "channels[].name",
                "channel name cannot be empty",
            ));
        }
        if !seen.insert(&channel.name) {
            return Err(ContractError::config_validation(
                format!("channels[name={}]", channel.name),
                "duplicate channel name",
            ));
        }
    }
    Ok(())
}

fn validate_channel_roles(config: &SessionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for channel in &config.channels {
        if !seen.insert(channel.role) {
            return Err(ContractError::config_validation(
                format!("channels[name={}].role", channel.name),
                format!("duplicate channel role '{}'", channel.role),
            ));
        }
    }
    Ok(())
}

fn validate_sample_rates(config: &SessionConfig) -> Result<(), ContractError> {
    for channel in &config.channels {
        let hz = channel.sample_rate_hz;
        if !hz.is_finite() || hz <= 0.0 {
            return Err(ContractError::config_validation(
                format!("channels[name={}].sample_rate_hz", channel.name),
                format!("sample_rate_hz must be finite and > 0, got {hz}"),
            ));
        }
    }
    Ok(())
}

fn validate_mandatory_roles(config: &SessionConfig) -> Result<(), ContractError> {
    for role in ChannelRole::ALL.into_iter().filter(|r| r.is_mandatory()) {
        if config.channel(role).is_none() {
            return Err(ContractError::config_validation(
                "channels",
                format!("a '{role}' channel is required"),
            ));
        }
    }
    Ok(())
}

/// The reference channel indexes the output, so no channel may be faster
fn validate_reference_rate(config: &SessionConfig) -> Result<(), ContractError> {
    let Some(reference) = config.reference_channel() else {
        return Ok(());
    };
    if let Some(faster) = config
        .channels
        .iter()
        .find(|c| c.sample_rate_hz > reference.sample_rate_hz)
    {
        return Err(ContractError::config_validation(
            format!("channels[name={}].sample_rate_hz", faster.name),
            format!(
                "channel rate {} Hz exceeds the speed reference rate {} Hz",
                faster.sample_rate_hz, reference.sample_rate_hz
            ),
        ));
    }
    Ok(())
}

fn validate_alignment(config: &SessionConfig) -> Result<(), ContractError> {
    if config.alignment.stride == 0 {
        return Err(ContractError::config_validation(
            "alignment.stride",
            "stride must be >= 1",
        ));
    }
    Ok(())
}

fn validate_limits(config: &SessionConfig) -> Result<(), ContractError> {
    let limits = &config.limits;
    if limits.max_samples_per_channel == 0 {
        return Err(ContractError::config_validation(
            "limits.max_samples_per_channel",
            "max_samples_per_channel must be > 0",
        ));
    }
    if !limits.timeout_s.is_finite() || limits.timeout_s <= 0.0 {
        return Err(ContractError::config_validation(
            "limits.timeout_s",
            format!("timeout_s must be finite and > 0, got {}", limits.timeout_s),
        ));
    }
    if Duration::try_from_secs_f64(limits.timeout_s).is_err() {
        return Err(ContractError::config_validation(
            "limits.timeout_s",
            format!("timeout_s is too large to represent, got {}", limits.timeout_s),
        ));
    }
    Ok(())
}

fn validate_rate_check(config: &SessionConfig) -> Result<(), ContractError> {
    let tolerance = config.rate_check.tolerance;
    if !(0.0..1.0).contains(&tolerance) {
        return Err(ContractError::config_validation(
            "rate_check.tolerance",
            format!("tolerance must be in [0, 1), got {tolerance}"),
        ));
    }
    Ok(())
}

/// Identifiers are double-quoted in SQL
fn validate_identifiers(config: &SessionConfig) -> Result<(), ContractError> {
    let store = &config.store;
    let fixed = [
        ("store.lap_times_table", store.lap_times_table.as_str()),
        ("store.sector1_table", store.sector1_table.as_str()),
        ("store.sector2_table", store.sector2_table.as_str()),
        ("store.key_column", store.key_column.as_str()),
        ("store.value_column", store.value_column.as_str()),
    ];
    for (field, ident) in fixed {
        check_identifier(field.to_string(), ident)?;
    }
    for channel in &config.channels {
        check_identifier(
            format!("channels[name={}].table", channel.name),
            channel.table_name(),
        )?;
    }
    Ok(())
}

fn check_identifier(field: String, ident: &str) -> Result<(), ContractError> {
    if ident.is_empty() {
        return Err(ContractError::config_validation(
            field,
            "identifier cannot be empty",
        ));
    }
    if ident.contains(['"', '\'', '`', '\0']) {
        return Err(ContractError::config_validation(
            field,
            format!("identifier '{ident}' contains a quote character"),
        ));
    }
    Ok(())
}
