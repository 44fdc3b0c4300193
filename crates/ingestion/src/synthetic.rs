//! Deterministic synthetic sessions for demos and tests.

use std::f64::consts::TAU;

use contracts::{ChannelRole, ChannelSpec, LapTimeRow, SectorRow, TimingTables};

/// Corners per lap in the generated speed trace
const CORNERS: f64 = 3.0;

/// A generated driving session
///
/// The car sits still for `pre_roll_s`, drives the configured laps back to
/// back, then sits still for `post_roll_s`. Every channel is a pure function
/// of session time, so any rate can be sampled from the same session.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSession {
    lap_durations: Vec<f64>,
    pre_roll_s: f64,
    post_roll_s: f64,
    track_length_m: f64,
    sector_splits: [f64; 2],
    empty_roles: Vec<ChannelRole>,
}

impl SyntheticSession {
    /// Laps with non-positive duration are recorded but occupy no time
    pub fn new(lap_durations: Vec<f64>) -> Self {
        Self {
            lap_durations,
            pre_roll_s: 5.0,
            post_roll_s: 3.0,
            track_length_m: 4_000.0,
            sector_splits: [0.35, 0.7],
            empty_roles: Vec::new(),
        }
    }

    pub fn with_pre_roll(mut self, seconds: f64) -> Self {
        self.pre_roll_s = seconds.max(0.0);
        self
    }

    pub fn with_track_length(mut self, meters: f64) -> Self {
        self.track_length_m = meters;
        self
    }

    /// Record no samples for channels with `role`
    pub fn with_empty(mut self, role: ChannelRole) -> Self {
        self.empty_roles.push(role);
        self
    }

    pub fn lap_count(&self) -> usize {
        self.lap_durations.len()
    }

    /// Seconds from recording start to recording end
    pub fn duration_s(&self) -> f64 {
        self.pre_roll_s + self.driving_time() + self.post_roll_s
    }

    fn driving_time(&self) -> f64 {
        self.lap_durations.iter().map(|d| d.max(0.0)).sum()
    }

    /// Lap table and cumulative sector tables, times relative to recording start
    pub fn timing_tables(&self) -> TimingTables {
        let mut tables = TimingTables::default();
        let mut end_time = self.pre_roll_s;
        for (lap, &duration) in self.lap_durations.iter().enumerate() {
            end_time += duration.max(0.0);
            // Shift the sector split a little per lap so sector bests differ
            let skew = 0.01 * ((lap % 3) as f64 - 1.0);
            let [split1, split2] = self.sector_splits;
            tables.lap_times.push(LapTimeRow { end_time, duration });
            tables.sector1.push(SectorRow {
                lap_key: lap as f64,
                cumulative: duration.max(0.0) * (split1 + skew),
            });
            tables.sector2.push(SectorRow {
                lap_key: lap as f64,
                cumulative: duration.max(0.0) * (split2 - skew),
            });
        }
        tables
    }

    /// All samples of `channel` over the whole recording
    pub fn channel_values(&self, channel: &ChannelSpec) -> Vec<f64> {
        if self.empty_roles.contains(&channel.role) {
            return Vec::new();
        }
        let hz = channel.sample_rate_hz;
        let samples = (self.duration_s() * hz).floor().max(0.0) as usize;
        (0..samples)
            .map(|k| self.value_at(channel.role, k as f64 / hz))
            .collect()
    }

    /// Fraction of the current lap completed at `t`, or `None` when stationary
    fn lap_phase(&self, t: f64) -> Option<f64> {
        let mut lap_start = self.pre_roll_s;
        for &duration in self.lap_durations.iter().filter(|d| **d > 0.0) {
            if t >= lap_start && t < lap_start + duration {
                return Some((t - lap_start) / duration);
            }
            lap_start += duration;
        }
        None
    }

    fn value_at(&self, role: ChannelRole, t: f64) -> f64 {
        let phase = self.lap_phase(t);
        let p = phase.unwrap_or(0.0);
        let moving = phase.is_some();
        let wave = (TAU * CORNERS * p).sin();
        let speed = if moving { 140.0 + 80.0 * wave } else { 0.0 };

        match role {
            ChannelRole::Speed => speed,
            ChannelRole::Distance => p * self.track_length_m,
            ChannelRole::Throttle if moving => (50.0 + 50.0 * wave).clamp(0.0, 100.0),
            ChannelRole::Brake if moving => (-100.0 * (TAU * CORNERS * p + 0.4).sin()).max(0.0),
            ChannelRole::Latitude => 45.6156 + 0.004 * (TAU * p).cos(),
            ChannelRole::Longitude => 9.2811 + 0.006 * (TAU * p).sin(),
            ChannelRole::EngineRpm => 900.0 + 45.0 * speed,
            ChannelRole::SteeringAngle if moving => 90.0 * (TAU * 2.0 * CORNERS * p).sin(),
            ChannelRole::Throttle | ChannelRole::Brake | ChannelRole::SteeringAngle => 0.0,
        }
    }
}
