//! Timing tables and the lap records resolved from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative tolerance for `s1 + s2 + s3 == duration`
pub const SECTOR_SUM_TOLERANCE: f64 = 1e-6;

/// Which of the three cumulative timing tables a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingTable {
    LapTimes,
    Sector1,
    Sector2,
}

impl TimingTable {
    pub fn as_str(self) -> &'static str {
        match self {
            TimingTable::LapTimes => "lap_times",
            TimingTable::Sector1 => "sector1",
            TimingTable::Sector2 => "sector2",
        }
    }
}

impl fmt::Display for TimingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the lap time table: when the lap ended and how long it took
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapTimeRow {
    /// Lap end, seconds since recording start
    pub end_time: f64,
    /// Lap duration (seconds); non-positive or non-finite for incomplete laps
    pub duration: f64,
}

/// Row of a cumulative sector table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorRow {
    /// Lap key as stored; rows are matched by position, not by this value
    pub lap_key: f64,
    /// Time from lap start to the sector boundary (seconds)
    pub cumulative: f64,
}

/// The three parallel timing tables, ordered by lap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingTables {
    pub lap_times: Vec<LapTimeRow>,
    pub sector1: Vec<SectorRow>,
    pub sector2: Vec<SectorRow>,
}

impl TimingTables {
    pub fn table_len(&self, table: TimingTable) -> usize {
        match table {
            TimingTable::LapTimes => self.lap_times.len(),
            TimingTable::Sector1 => self.sector1.len(),
            TimingTable::Sector2 => self.sector2.len(),
        }
    }
}

/// Per-sector durations of one lap (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectorTimes {
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl SectorTimes {
    /// Convert cumulative boundary times into per-sector durations
    pub fn from_cumulative(cumulative_s1: f64, cumulative_s2: f64, duration: f64) -> Self {
        let s1 = cumulative_s1;
        let s2 = cumulative_s2 - s1;
        let s3 = duration - s1 - s2;
        Self { s1, s2, s3 }
    }

    pub fn total(&self) -> f64 {
        self.s1 + self.s2 + self.s3
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.s1, self.s2, self.s3]
    }
}

/// One lap, resolved against the session epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapRecord {
    /// 0-based position in the timing tables
    pub lap_index: usize,
    /// Seconds from the session epoch
    pub start_time: f64,
    /// `start_time + duration`
    pub end_time: f64,
    pub duration: f64,
    pub sectors: SectorTimes,
    /// Finite, strictly positive duration
    pub valid: bool,
}

impl LapRecord {
    /// Whether `s1 + s2 + s3` matches the lap duration within tolerance
    pub fn sectors_consistent(&self) -> bool {
        let tolerance = SECTOR_SUM_TOLERANCE * self.duration.abs().max(1.0);
        (self.sectors.total() - self.duration).abs() < tolerance
    }
}

/// Fastest sector times across all valid laps ("purple" sectors)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectorBests {
    pub s1: Option<f64>,
    pub s2: Option<f64>,
    pub s3: Option<f64>,
}

impl SectorBests {
    pub fn as_array(&self) -> [Option<f64>; 3] {
        [self.s1, self.s2, self.s3]
    }
}
