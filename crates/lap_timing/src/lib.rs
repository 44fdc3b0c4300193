//! # Lap Timing
//!
//! Turns the cumulative timing tables of a session into lap records.
//!
//! Responsibilities:
//! - Derive per-sector durations from cumulative sector times
//! - Anchor every lap to the session epoch (start of the first lap)
//! - Select the lap of interest (explicit index or fastest valid lap)
//! - Compute per-sector bests and the lap table
//!
//! ## Usage
//!
//! ```ignore
//! use lap_timing::{LapSelection, ResolvedLaps};
//!
//! let laps = ResolvedLaps::resolve(&store.timing_tables().await?)?;
//! let lap = laps.select(LapSelection::Fastest)?;
//! println!("lap {} starts at {:.3}s", lap.lap_index, lap.start_time);
//! ```

mod resolver;
mod table;

pub use resolver::{LapSelection, ResolvedLaps};
pub use table::{LapTable, LapTableRow};
