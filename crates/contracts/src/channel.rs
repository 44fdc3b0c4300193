//! Channel description: name, role and fixed sample rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::ChannelId;

/// What a channel measures, which decides where it lands in a `TelemetryPoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Vehicle speed. Always the reference axis of the alignment.
    Speed,
    /// Distance travelled; used as the presentation x-axis.
    Distance,
    Throttle,
    Brake,
    Latitude,
    Longitude,
    EngineRpm,
    SteeringAngle,
}

impl ChannelRole {
    pub const ALL: [ChannelRole; 8] = [
        ChannelRole::Speed,
        ChannelRole::Distance,
        ChannelRole::Throttle,
        ChannelRole::Brake,
        ChannelRole::Latitude,
        ChannelRole::Longitude,
        ChannelRole::EngineRpm,
        ChannelRole::SteeringAngle,
    ];

    /// Roles without which no aligned output can be produced
    pub fn is_mandatory(self) -> bool {
        matches!(self, ChannelRole::Speed | ChannelRole::Distance)
    }

    pub fn is_gps(self) -> bool {
        matches!(self, ChannelRole::Latitude | ChannelRole::Longitude)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelRole::Speed => "speed",
            ChannelRole::Distance => "distance",
            ChannelRole::Throttle => "throttle",
            ChannelRole::Brake => "brake",
            ChannelRole::Latitude => "latitude",
            ChannelRole::Longitude => "longitude",
            ChannelRole::EngineRpm => "engine_rpm",
            ChannelRole::SteeringAngle => "steering_angle",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded channel.
///
/// Sample `k` is taken `k / sample_rate_hz` seconds after the session epoch;
/// the rate is constant for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChannelSpec {
    /// Channel name (also used in log fields and error messages)
    pub name: ChannelId,

    /// Role in the aligned output
    pub role: ChannelRole,

    /// Backing table in the session store (defaults to `name`)
    #[serde(default)]
    pub table: Option<String>,

    /// Sampling frequency (Hz), must be > 0
    #[validate(range(exclusive_min = 0.0))]
    pub sample_rate_hz: f64,
}

impl ChannelSpec {
    pub fn new(name: impl Into<ChannelId>, role: ChannelRole, sample_rate_hz: f64) -> Self {
        Self {
            name: name.into(),
            role,
            table: None,
            sample_rate_hz,
        }
    }

    /// Store table holding this channel's samples
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(self.name.as_str())
    }

    /// Seconds covered by `samples` readings of this channel
    pub fn duration_of(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate_hz
    }
}
