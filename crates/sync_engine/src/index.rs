//! Lap time window -> per-channel sample index ranges.

use std::collections::BTreeMap;

use contracts::{ChannelId, ContractError, SampleIndexRange};
use tracing::instrument;

/// Map `[start_time, end_time]` onto the samples of a channel recorded at `hz`
///
/// `start = floor(start_time * hz)` clamped to 0,
/// `end = max(start + 1, floor(end_time * hz))`. The range is never empty and
/// is not checked against the stored channel length.
///
/// # Errors
/// - `ConfigValidation` if `hz` is not a positive finite rate
/// - `InvalidWindow` if a bound is not finite or `end_time < start_time`
pub fn sample_range(
    start_time: f64,
    end_time: f64,
    hz: f64,
) -> Result<SampleIndexRange, ContractError> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(ContractError::config_validation(
            "sample_rate_hz",
            format!("sample rate must be finite and > 0, got {hz}"),
        ));
    }
    check_window(start_time, end_time)?;

    let start = to_index(start_time * hz);
    let end = to_index(end_time * hz).max(start.saturating_add(1));
    SampleIndexRange::new(start, end)
}

fn check_window(start_time: f64, end_time: f64) -> Result<(), ContractError> {
    let message = if !start_time.is_finite() || !end_time.is_finite() {
        "window bounds must be finite"
    } else if end_time < start_time {
        "window end precedes its start"
    } else {
        return Ok(());
    };
    Err(ContractError::InvalidWindow {
        start_time,
        end_time,
        message: message.into(),
    })
}

/// `floor`, clamped at zero; the float-to-int cast saturates above
#[inline]
fn to_index(samples: f64) -> u64 {
    samples.floor().max(0.0) as u64
}

/// Maps lap windows for a fixed channel rate table
#[derive(Debug, Clone)]
pub struct RateIndexMapper {
    rates: BTreeMap<ChannelId, f64>,
}

impl RateIndexMapper {
    /// # Errors
    /// `ConfigValidation` if any rate is not a positive finite number
    pub fn new(rates: BTreeMap<ChannelId, f64>) -> Result<Self, ContractError> {
        if let Some((channel, hz)) = rates.iter().find(|(_, hz)| !hz.is_finite() || **hz <= 0.0) {
            return Err(ContractError::config_validation(
                format!("channels[name={channel}].sample_rate_hz"),
                format!("sample rate must be finite and > 0, got {hz}"),
            ));
        }
        Ok(Self { rates })
    }

    pub fn rates(&self) -> &BTreeMap<ChannelId, f64> {
        &self.rates
    }

    /// Sample range of every channel for `[start_time, end_time]`
    #[instrument(name = "sync_engine_map_window", skip(self), fields(channels = self.rates.len()))]
    pub fn map_window(
        &self,
        start_time: f64,
        end_time: f64,
    ) -> Result<BTreeMap<ChannelId, SampleIndexRange>, ContractError> {
        check_window(start_time, end_time)?;
        self.rates
            .iter()
            .map(|(channel, &hz)| {
                let range = sample_range(start_time, end_time, hz)?;
                tracing::trace!(
                    channel = %channel,
                    start = range.start(),
                    end = range.end(),
                    "mapped channel window"
                );
                Ok((channel.clone(), range))
            })
            .collect()
    }
}
