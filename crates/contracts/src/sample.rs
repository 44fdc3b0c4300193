//! Sample-index windows and the channel slices fetched for them.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, ContractError};

/// Half-open sample index range `[start, end)`; never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleIndexRange {
    start: u64,
    end: u64,
}

impl SampleIndexRange {
    /// # Errors
    /// `InvalidWindow` if `end <= start`
    pub fn new(start: u64, end: u64) -> Result<Self, ContractError> {
        if end <= start {
            return Err(ContractError::InvalidWindow {
                start_time: start as f64,
                end_time: end as f64,
                message: "sample range must satisfy end > start".into(),
            });
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of samples requested; always >= 1
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Readings of one channel restricted to a `SampleIndexRange`.
///
/// `values[0]` is sample `range.start()`. The store may return fewer than
/// `range.len()` values when the channel ends inside the range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSlice {
    pub channel: ChannelId,
    pub range: SampleIndexRange,
    pub values: Vec<f64>,
}

impl ChannelSlice {
    pub fn new(channel: ChannelId, range: SampleIndexRange, values: Vec<f64>) -> Self {
        Self {
            channel,
            range,
            values,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the store returned fewer samples than requested
    pub fn is_truncated(&self) -> bool {
        (self.values.len() as u64) < self.range.len()
    }
}
