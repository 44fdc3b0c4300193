//! Lap synchronizer: window mapping, alignment and decimation for one config.

use std::collections::BTreeMap;

use contracts::{
    ChannelId, ChannelSlice, ContractError, LapRecord, SampleIndexRange, SessionConfig,
    TelemetryPoint,
};
use tracing::instrument;

use crate::{ChannelAligner, Downsampler, RateIndexMapper};

/// Aligned output of one lap
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutput {
    /// Aligned points before decimation
    pub reference_samples: usize,
    pub points: Vec<TelemetryPoint>,
}

/// Synchronizes the channels of a session lap by lap
#[derive(Debug)]
pub struct SyncEngine<'a> {
    config: &'a SessionConfig,
    mapper: RateIndexMapper,
    downsampler: Downsampler,
}

impl<'a> SyncEngine<'a> {
    /// # Errors
    /// `ConfigValidation` if a channel rate is not positive
    pub fn new(config: &'a SessionConfig) -> Result<Self, ContractError> {
        Ok(Self {
            config,
            mapper: RateIndexMapper::new(config.rate_table())?,
            downsampler: Downsampler::new(config.stride()),
        })
    }

    pub fn downsampler(&self) -> Downsampler {
        self.downsampler
    }

    /// Sample range of every configured channel for `lap`
    ///
    /// An invalid lap with a negative duration ends before it starts; its
    /// window collapses onto the start so it maps to a single sample.
    pub fn lap_ranges(
        &self,
        lap: &LapRecord,
    ) -> Result<BTreeMap<ChannelId, SampleIndexRange>, ContractError> {
        let end_time = if !lap.valid && lap.end_time < lap.start_time {
            tracing::debug!(
                lap_index = lap.lap_index,
                duration = lap.duration,
                "collapsing inverted window of invalid lap"
            );
            lap.start_time
        } else {
            lap.end_time
        };
        self.mapper.map_window(lap.start_time, end_time)
    }

    /// Align `slices` onto the reference axis and decimate
    #[instrument(
        name = "sync_engine_synchronize",
        skip(self, lap, slices),
        fields(lap_index = lap.lap_index, stride = self.downsampler.stride().get())
    )]
    pub fn synchronize(
        &self,
        lap: &LapRecord,
        slices: &BTreeMap<ChannelId, ChannelSlice>,
    ) -> Result<SyncOutput, ContractError> {
        let aligner = ChannelAligner::new(
            &self.config.channels,
            self.config.alignment.missing_channels,
        );
        let aligned = aligner.align(lap.lap_index, slices)?;
        let reference_samples = aligned.len();
        let points = self.downsampler.apply(aligned);

        metrics::counter!("sync_laps_total").increment(1);
        tracing::debug!(reference_samples, points = points.len(), "lap synchronized");

        Ok(SyncOutput {
            reference_samples,
            points,
        })
    }
}
