//! # Sync Engine
//!
//! Multi-rate channel synchronization for a single lap.
//!
//! Responsibilities:
//! - Map a lap time window onto per-channel sample ranges
//! - Align channels onto the speed axis by nearest-neighbor lookup
//! - Decimate the aligned sequence at a fixed stride
//! - Check stored channel lengths against declared rates
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::SyncEngine;
//!
//! let engine = SyncEngine::new(&config)?;
//! let ranges = engine.lap_ranges(&lap)?;
//! let slices = fetch(ranges).await?;
//! let output = engine.synchronize(&lap, &slices)?;
//! ```

mod aligner;
mod downsample;
mod engine;
mod index;
mod rate_check;

pub use aligner::{nearest_index, ChannelAligner};
pub use downsample::{Downsampler, DEFAULT_STRIDE};
pub use engine::{SyncEngine, SyncOutput};
pub use index::{sample_range, RateIndexMapper};
pub use rate_check::{check_rates, enforce as enforce_rate_policy};

pub use contracts::{MissingChannelPolicy, RateCheckConfig, RateMismatchPolicy, TelemetryPoint};
