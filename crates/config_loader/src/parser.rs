//! Configuration parsing
//!
//! TOML (primary) and JSON (optional) formats.

use contracts::{ContractError, SessionConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<SessionConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<SessionConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<SessionConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChannelRole, MissingChannelPolicy, RateMismatchPolicy};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[channels]]
name = "Ground Speed"
role = "speed"
sample_rate_hz = 100.0

[[channels]]
name = "Lap Dist"
role = "distance"
sample_rate_hz = 10.0
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].role, ChannelRole::Distance);
        assert_eq!(config.store.lap_times_table, "lap_times");
        assert_eq!(config.alignment.stride, 10);
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[store]
lap_times_table = "Lap Times"
sector1_table = "Sector 1"
sector2_table = "Sector 2"

[[channels]]
name = "Ground Speed"
role = "speed"
table = "speed_samples"
sample_rate_hz = 100.0

[[channels]]
name = "Lap Dist"
role = "distance"
sample_rate_hz = 10.0

[alignment]
stride = 5
missing_channels = "zero"

[limits]
max_samples_per_channel = 50000
timeout_s = 2.5

[rate_check]
enabled = false
tolerance = 0.05
policy = "fail"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.store.sector2_table, "Sector 2");
        assert_eq!(config.store.key_column, "ts");
        assert_eq!(config.channels[0].table_name(), "speed_samples");
        assert_eq!(config.alignment.stride, 5);
        assert_eq!(
            config.alignment.missing_channels,
            MissingChannelPolicy::Zero
        );
        assert_eq!(config.limits.max_samples_per_channel, 50_000);
        assert!(!config.rate_check.enabled);
        assert_eq!(config.rate_check.policy, RateMismatchPolicy::Fail);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "channels": [
                { "name": "speed", "role": "speed", "sample_rate_hz": 50.0 },
                { "name": "dist", "role": "distance", "sample_rate_hz": 50.0 }
            ],
            "limits": { "timeout_s": 5.0 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.limits.max_samples_per_channel, 1_000_000);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_unknown_role() {
        let content = r#"
[[channels]]
name = "Tyre Temp"
role = "tyre_temp"
sample_rate_hz = 10.0
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
