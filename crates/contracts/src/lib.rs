//! # Contracts
//!
//! Shared data model and interface contracts for the lap telemetry pipeline.
//! Every other crate in the workspace depends on this one; it depends on none
//! of them.
//!
//! ## Time Model
//! - Channels carry no timestamps: sample `k` of a channel recorded at `hz`
//!   corresponds to `k / hz` seconds after the session epoch.
//! - The session epoch is the start of the first lap in the timing tables
//!   (see `lap_timing`).

mod analysis;
mod channel;
mod channel_id;
mod error;
mod lap;
mod sample;
mod session_config;
mod store;

pub use analysis::*;
pub use channel::*;
pub use channel_id::ChannelId;
pub use error::*;
pub use lap::*;
pub use sample::*;
pub use session_config::*;
pub use store::{LocalSessionStore, SessionStore};
