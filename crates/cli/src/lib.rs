//! # lapsync
//!
//! Library half of the `lapsync` binary: the analysis pipeline, usable
//! from integration tests without going through the command line.

pub mod pipeline;

pub use lap_timing::LapSelection;
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats};
