//! SessionStore trait - Ingestion input interface
//!
//! Defines the read-only view of a recorded session that the pipeline needs.

use crate::{ChannelSlice, ChannelSpec, ContractError, SampleIndexRange, TimingTables};

/// Read access to a recorded session
///
/// Implementations own their connection lifecycle; callers only see
/// request-scoped reads.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Load the lap time and cumulative sector tables, ordered by lap
    ///
    /// # Errors
    /// Returns store error (should include table context)
    async fn timing_tables(&self) -> Result<TimingTables, ContractError>;

    /// Read `range` of a channel
    ///
    /// Returns exactly `range.len()` readings unless the channel ends inside
    /// the range, in which case the available prefix is returned.
    async fn channel_slice(
        &self,
        channel: &ChannelSpec,
        range: SampleIndexRange,
    ) -> Result<ChannelSlice, ContractError>;

    /// Total number of stored samples of a channel
    async fn channel_len(&self, channel: &ChannelSpec) -> Result<u64, ContractError>;
}
