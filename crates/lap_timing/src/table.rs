//! Lap listing with fastest-lap and purple-sector flags.

use std::fmt;

use contracts::{LapRecord, SectorBests};
use serde::Serialize;

use crate::ResolvedLaps;

/// One lap with its presentation flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTableRow {
    #[serde(flatten)]
    pub lap: LapRecord,
    pub fastest: bool,
    /// Sector time equals the session best for that sector
    pub purple: [bool; 3],
}

/// All laps of a session in recording order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTable {
    pub rows: Vec<LapTableRow>,
    pub sector_bests: SectorBests,
    pub fastest_index: Option<usize>,
}

impl LapTable {
    pub fn new(resolved: &ResolvedLaps) -> Self {
        let bests = resolved.sector_bests().as_array();
        let fastest_index = resolved.fastest_index();
        let rows = resolved
            .laps()
            .iter()
            .map(|lap| {
                let times = lap.sectors.as_array();
                let purple =
                    std::array::from_fn(|s| lap.valid && bests[s] == Some(times[s]));
                LapTableRow {
                    lap: *lap,
                    fastest: fastest_index == Some(lap.lap_index),
                    purple,
                }
            })
            .collect();

        Self {
            rows,
            sector_bests: resolved.sector_bests(),
            fastest_index,
        }
    }

    pub fn fastest(&self) -> Option<&LapTableRow> {
        self.fastest_index.and_then(|index| self.rows.get(index))
    }
}

impl From<&ResolvedLaps> for LapTable {
    fn from(resolved: &ResolvedLaps) -> Self {
        Self::new(resolved)
    }
}

impl fmt::Display for LapTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4}  {:>10}  {:>10}  {:>9}  {:>9}  {:>9}  {:>9}",
            "lap", "start", "end", "time", "s1", "s2", "s3"
        )?;
        for row in &self.rows {
            let lap = &row.lap;
            let marker = if row.fastest {
                '*'
            } else if !lap.valid {
                'x'
            } else {
                ' '
            };
            write!(
                f,
                "{:>3}{marker}  {:>10.3}  {:>10.3}  {:>9.3}",
                lap.lap_index, lap.start_time, lap.end_time, lap.duration
            )?;
            for (time, purple) in lap.sectors.as_array().into_iter().zip(row.purple) {
                let flag = if purple { 'P' } else { ' ' };
                write!(f, "  {time:>8.3}{flag}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
