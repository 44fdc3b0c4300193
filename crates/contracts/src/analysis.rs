//! Aligned telemetry points and the per-lap analysis result.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, LapRecord, SectorBests};

/// One row of the aligned output, indexed by the reference channel.
///
/// `None` means the channel had no data for this lap; it is never a stand-in
/// for a zero reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPoint {
    /// Reference sample index within the lap window
    pub index: usize,
    /// Seconds since the lap window start, on the reference clock
    pub time: f64,
    pub distance: f64,
    pub speed: f64,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub lap_index: usize,
    pub engine_rpm: Option<f64>,
    pub steering_angle: Option<f64>,
}

/// Channel whose stored length disagrees with its declared rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateFinding {
    pub channel: ChannelId,
    pub sample_rate_hz: f64,
    pub samples: u64,
    /// `samples / sample_rate_hz`
    pub duration_s: f64,
    /// Duration covered by the reference channel
    pub reference_duration_s: f64,
    /// `|duration_s - reference_duration_s| / reference_duration_s`
    pub relative_error: f64,
}

/// Complete result for one lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapAnalysis {
    pub lap: LapRecord,
    pub sector_bests: SectorBests,
    /// Decimation step applied to the aligned sequence
    pub stride: usize,
    /// Aligned points before decimation
    pub reference_samples: usize,
    pub points: Vec<TelemetryPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_warnings: Vec<RateFinding>,
}
