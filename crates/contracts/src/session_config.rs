//! SessionConfig - Config Loader output
//!
//! Describes how to read a session store: timing table names, the channel
//! rate table, alignment output settings, resource limits and rate checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Duration;
use validator::Validate;

use crate::{ChannelId, ChannelRole, ChannelSpec};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Store layout
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    /// Channel rate table
    #[validate(nested)]
    pub channels: Vec<ChannelSpec>,

    /// Output shaping
    #[serde(default)]
    #[validate(nested)]
    pub alignment: AlignmentConfig,

    /// Per-request resource ceilings
    #[serde(default)]
    #[validate(nested)]
    pub limits: LimitsConfig,

    /// Stored length vs. declared rate checks
    #[serde(default)]
    #[validate(nested)]
    pub rate_check: RateCheckConfig,
}

/// Table and column names of the session store
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// (end_time, duration) rows
    #[serde(default = "default_lap_times_table")]
    #[validate(length(min = 1))]
    pub lap_times_table: String,

    /// (lap, cumulative sector 1 time) rows
    #[serde(default = "default_sector1_table")]
    #[validate(length(min = 1))]
    pub sector1_table: String,

    /// (lap, cumulative sector 2 time) rows
    #[serde(default = "default_sector2_table")]
    #[validate(length(min = 1))]
    pub sector2_table: String,

    /// First column of every timing table
    #[serde(default = "default_key_column")]
    #[validate(length(min = 1))]
    pub key_column: String,

    /// Value column of timing and channel tables
    #[serde(default = "default_value_column")]
    #[validate(length(min = 1))]
    pub value_column: String,
}

fn default_lap_times_table() -> String {
    "lap_times".to_string()
}

fn default_sector1_table() -> String {
    "sector1_times".to_string()
}

fn default_sector2_table() -> String {
    "sector2_times".to_string()
}

fn default_key_column() -> String {
    "ts".to_string()
}

fn default_value_column() -> String {
    "value".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lap_times_table: default_lap_times_table(),
            sector1_table: default_sector1_table(),
            sector2_table: default_sector2_table(),
            key_column: default_key_column(),
            value_column: default_value_column(),
        }
    }
}

/// How empty optional channels appear in the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingChannelPolicy {
    /// Emit `null`
    #[default]
    Absent,
    /// Emit `0.0` (GPS stays `null`)
    Zero,
}

/// Alignment output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlignmentConfig {
    /// Keep every `stride`-th aligned point
    #[serde(default = "default_stride")]
    #[validate(range(min = 1))]
    pub stride: usize,

    #[serde(default)]
    pub missing_channels: MissingChannelPolicy,
}

fn default_stride() -> usize {
    10
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            missing_channels: MissingChannelPolicy::default(),
        }
    }
}

/// Resource ceilings applied to a single analysis
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LimitsConfig {
    /// Largest sample range fetched from any one channel
    #[serde(default = "default_max_samples")]
    #[validate(range(min = 1))]
    pub max_samples_per_channel: u64,

    /// Wall-clock budget for fetch + alignment (seconds)
    #[serde(default = "default_timeout_s")]
    #[validate(range(exclusive_min = 0.0))]
    pub timeout_s: f64,
}

fn default_max_samples() -> u64 {
    1_000_000
}

fn default_timeout_s() -> f64 {
    30.0
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_samples_per_channel: default_max_samples(),
            timeout_s: default_timeout_s(),
        }
    }
}

/// What to do when a channel's stored length contradicts its rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMismatchPolicy {
    /// Log and report in the analysis result
    #[default]
    Warn,
    /// Abort the analysis
    Fail,
}

/// Rate validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateCheckConfig {
    #[serde(default = "default_rate_check_enabled")]
    pub enabled: bool,

    /// Accepted relative duration error, in `[0, 1)`
    #[serde(default = "default_rate_tolerance")]
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub tolerance: f64,

    #[serde(default)]
    pub policy: RateMismatchPolicy,
}

fn default_rate_check_enabled() -> bool {
    true
}

fn default_rate_tolerance() -> f64 {
    0.02
}

impl Default for RateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_check_enabled(),
            tolerance: default_rate_tolerance(),
            policy: RateMismatchPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Channel configured for `role`, if any
    pub fn channel(&self, role: ChannelRole) -> Option<&ChannelSpec> {
        self.channels.iter().find(|channel| channel.role == role)
    }

    /// Reference axis channel (the speed channel)
    pub fn reference_channel(&self) -> Option<&ChannelSpec> {
        self.channel(ChannelRole::Speed)
    }

    /// Channel name -> sample rate (Hz)
    pub fn rate_table(&self) -> BTreeMap<ChannelId, f64> {
        self.channels
            .iter()
            .map(|channel| (channel.name.clone(), channel.sample_rate_hz))
            .collect()
    }

    /// Decimation stride; a zero stride is clamped to 1
    pub fn stride(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.alignment.stride).unwrap_or(NonZeroUsize::MIN)
    }

    /// Wall-clock budget for a single analysis
    ///
    /// Saturates at `Duration::MAX` for budgets too large to represent.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.limits.timeout_s.max(0.0)).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> SessionConfig {
        SessionConfig {
            version: ConfigVersion::V1,
            store: StoreConfig::default(),
            channels: vec![
                ChannelSpec::new("Ground Speed", ChannelRole::Speed, 100.0),
                ChannelSpec::new("Lap Dist", ChannelRole::Distance, 10.0),
                ChannelSpec::new("Throttle Pos", ChannelRole::Throttle, 50.0),
            ],
            alignment: AlignmentConfig::default(),
            limits: LimitsConfig::default(),
            rate_check: RateCheckConfig::default(),
        }
    }

    #[test]
    fn test_role_lookup() {
        let config = sample_config();
        assert_eq!(
            config.reference_channel().map(|c| c.name.as_str()),
            Some("Ground Speed")
        );
        assert!(config.channel(ChannelRole::Latitude).is_none());
    }

    #[test]
    fn test_rate_table() {
        let rates = sample_config().rate_table();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates.get("Lap Dist").copied(), Some(10.0));
    }

    #[test]
    fn test_defaults() {
        let config = sample_config();
        assert_eq!(config.stride().get(), 10);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.limits.max_samples_per_channel, 1_000_000);
        assert_eq!(config.rate_check.policy, RateMismatchPolicy::Warn);
        assert_eq!(
            config.alignment.missing_channels,
            MissingChannelPolicy::Absent
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_saturates() {
        let mut config = sample_config();
        config.limits.timeout_s = 1e300;
        assert_eq!(config.timeout(), Duration::MAX);
        config.limits.timeout_s = 0.25;
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_nested_validation() {
        let mut config = sample_config();
        config.alignment.stride = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.channels[1].sample_rate_hz = -1.0;
        assert!(config.validate().is_err());
    }
}
