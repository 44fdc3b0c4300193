//! Lap boundary resolution and lap selection.

use contracts::{
    ContractError, LapRecord, SectorBests, SectorTimes, TimingTable, TimingTables,
};
use tracing::instrument;

/// Which lap to analyze
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LapSelection {
    /// Smallest valid duration, lowest index on ties
    #[default]
    Fastest,
    /// Explicit 0-based lap index; validity is not checked
    Index(usize),
}

impl From<Option<usize>> for LapSelection {
    fn from(index: Option<usize>) -> Self {
        index.map_or(LapSelection::Fastest, LapSelection::Index)
    }
}

/// All laps of a session, anchored to the session epoch
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLaps {
    laps: Vec<LapRecord>,
    first_lap_offset: f64,
    fastest: Option<usize>,
    sector_bests: SectorBests,
}

impl ResolvedLaps {
    /// Build lap records from the three parallel timing tables
    ///
    /// Rows are matched by position. When the tables differ in length only
    /// the common prefix is used.
    ///
    /// # Errors
    /// - `MissingTable` if any table is empty
    /// - `InvalidTimingRow` if an end time is not finite, or the first lap's
    ///   duration is not finite
    #[instrument(
        name = "lap_timing_resolve",
        skip(tables),
        fields(
            lap_rows = tables.lap_times.len(),
            sector1_rows = tables.sector1.len(),
            sector2_rows = tables.sector2.len()
        )
    )]
    pub fn resolve(tables: &TimingTables) -> Result<Self, ContractError> {
        let all = [TimingTable::LapTimes, TimingTable::Sector1, TimingTable::Sector2];
        for table in all {
            if tables.table_len(table) == 0 {
                return Err(ContractError::MissingTable {
                    table: table.as_str().to_string(),
                });
            }
        }

        let row_count = all.iter().map(|&t| tables.table_len(t)).min().unwrap_or(0);
        let longest = all.iter().map(|&t| tables.table_len(t)).max().unwrap_or(0);
        if longest > row_count {
            tracing::warn!(
                rows = row_count,
                dropped = longest - row_count,
                "timing tables differ in length, trailing rows ignored"
            );
        }

        // The offset anchors every lap, so the first row must be complete
        let first = tables.lap_times[0];
        check_finite(TimingTable::LapTimes, 0, "end_time", first.end_time)?;
        check_finite(TimingTable::LapTimes, 0, "duration", first.duration)?;
        let first_lap_offset = first.end_time - first.duration;

        let mut laps = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let lap_time = tables.lap_times[row];
            let cumulative_s1 = tables.sector1[row].cumulative;
            let cumulative_s2 = tables.sector2[row].cumulative;
            check_finite(TimingTable::LapTimes, row, "end_time", lap_time.end_time)?;

            // Unfinished laps carry no sector splits; they stay addressable but invalid
            let duration = lap_time.duration;
            let timed = cumulative_s1.is_finite() && cumulative_s2.is_finite();
            if !timed {
                tracing::debug!(
                    row,
                    cumulative_s1,
                    cumulative_s2,
                    "lap has non-finite sector splits"
                );
            }
            let start_time = lap_time.end_time - duration - first_lap_offset;
            laps.push(LapRecord {
                lap_index: row,
                start_time,
                end_time: start_time + duration,
                duration,
                sectors: SectorTimes::from_cumulative(cumulative_s1, cumulative_s2, duration),
                valid: timed && duration.is_finite() && duration > 0.0,
            });
        }

        let fastest = fastest_lap(&laps);
        let sector_bests = sector_bests(&laps);
        let valid = laps.iter().filter(|lap| lap.valid).count();

        tracing::debug!(
            laps = laps.len(),
            valid,
            first_lap_offset,
            fastest = ?fastest,
            "resolved lap boundaries"
        );
        metrics::histogram!("lap_timing_laps_resolved").record(laps.len() as f64);

        Ok(Self {
            laps,
            first_lap_offset,
            fastest,
            sector_bests,
        })
    }

    /// Pick the lap of interest
    ///
    /// # Errors
    /// - `InvalidLapIndex` if an explicit index is out of range
    /// - `InvalidTimingRow` if the chosen lap has no finite duration or
    ///   sector splits
    /// - `NoValidLap` if no lap qualifies for fastest selection
    #[instrument(name = "lap_timing_select", skip(self), fields(lap_count = self.laps.len()))]
    pub fn select(&self, selection: LapSelection) -> Result<&LapRecord, ContractError> {
        let lap = match selection {
            LapSelection::Index(index) => {
                self.laps
                    .get(index)
                    .ok_or(ContractError::InvalidLapIndex {
                        index,
                        lap_count: self.laps.len(),
                    })?
            }
            LapSelection::Fastest => self
                .fastest
                .and_then(|index| self.laps.get(index))
                .ok_or(ContractError::NoValidLap {
                    lap_count: self.laps.len(),
                })?,
        };

        // A window cannot be built from an unknown duration
        if !lap.duration.is_finite() {
            return Err(ContractError::invalid_row(
                TimingTable::LapTimes.as_str(),
                lap.lap_index,
                "duration",
                lap.duration,
            ));
        }
        if let Some(position) = lap.sectors.as_array().iter().position(|t| !t.is_finite()) {
            // s2 and s3 both derive from the second cumulative split
            let table = if position == 0 {
                TimingTable::Sector1
            } else {
                TimingTable::Sector2
            };
            return Err(ContractError::invalid_row(
                table.as_str(),
                lap.lap_index,
                "cumulative",
                lap.sectors.as_array()[position],
            ));
        }

        if !lap.valid {
            tracing::warn!(
                lap_index = lap.lap_index,
                duration = lap.duration,
                "selected lap is not a valid timed lap"
            );
        }
        Ok(lap)
    }

    /// All laps in recording order, including invalid ones
    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// `end_time - duration` of the first row; subtracted from every lap
    pub fn first_lap_offset(&self) -> f64 {
        self.first_lap_offset
    }

    /// Index of the fastest valid lap
    pub fn fastest_index(&self) -> Option<usize> {
        self.fastest
    }

    pub fn sector_bests(&self) -> SectorBests {
        self.sector_bests
    }
}

fn check_finite(
    table: TimingTable,
    row: usize,
    field: &str,
    value: f64,
) -> Result<(), ContractError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ContractError::invalid_row(table.as_str(), row, field, value))
    }
}

/// Strict `<` keeps the first of equal durations
fn fastest_lap(laps: &[LapRecord]) -> Option<usize> {
    let mut best: Option<&LapRecord> = None;
    for lap in laps.iter().filter(|lap| lap.valid) {
        if best.map_or(true, |b| lap.duration < b.duration) {
            best = Some(lap);
        }
    }
    best.map(|lap| lap.lap_index)
}

fn sector_bests(laps: &[LapRecord]) -> SectorBests {
    let mut bests = [None::<f64>; 3];
    for lap in laps.iter().filter(|lap| lap.valid) {
        for (best, time) in bests.iter_mut().zip(lap.sectors.as_array()) {
            if time.is_finite() && time > 0.0 && best.map_or(true, |b| time < b) {
                *best = Some(time);
            }
        }
    }
    let [s1, s2, s3] = bests;
    SectorBests { s1, s2, s3 }
}
