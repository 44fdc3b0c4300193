//! Parallel per-channel slice fetch

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{
    ChannelId, ChannelSlice, ChannelSpec, ContractError, LimitsConfig, SampleIndexRange,
    SessionStore,
};
use tokio::task::JoinSet;
use tracing::instrument;

use crate::error::IngestionError;

/// Fetch counters
#[derive(Debug, Default)]
pub struct FetchMetrics {
    /// Slices returned by the store
    pub slices_fetched: AtomicU64,

    /// Samples across all slices
    pub samples_fetched: AtomicU64,

    /// Slices shorter than their requested range
    pub truncated_slices: AtomicU64,

    /// Failed fetch tasks
    pub fetch_errors: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_slice(&self, slice: &ChannelSlice) {
        self.slices_fetched.fetch_add(1, Ordering::Relaxed);
        self.samples_fetched
            .fetch_add(slice.len() as u64, Ordering::Relaxed);
        if slice.is_truncated() {
            self.truncated_slices.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            slices_fetched: self.slices_fetched.load(Ordering::Relaxed),
            samples_fetched: self.samples_fetched.load(Ordering::Relaxed),
            truncated_slices: self.truncated_slices.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
        }
    }
}

/// Fetch counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub slices_fetched: u64,
    pub samples_fetched: u64,
    pub truncated_slices: u64,
    pub fetch_errors: u64,
}

/// Fetches lap-windowed slices from a store, one task per channel
#[derive(Debug)]
pub struct SliceFetcher<S> {
    store: Arc<S>,
    limits: LimitsConfig,
    metrics: Arc<FetchMetrics>,
}

impl<S> Clone for SliceFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            limits: self.limits.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S> SliceFetcher<S>
where
    S: SessionStore + Sync + 'static,
{
    pub fn new(store: Arc<S>, limits: LimitsConfig) -> Self {
        Self {
            store,
            limits,
            metrics: Arc::new(FetchMetrics::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Reject any range above the per-channel sample ceiling
    ///
    /// # Errors
    /// `ResourceLimit` naming the first offending channel
    pub fn check_limits(
        &self,
        ranges: &BTreeMap<ChannelId, SampleIndexRange>,
    ) -> Result<(), ContractError> {
        let limit = self.limits.max_samples_per_channel;
        match ranges.iter().find(|(_, range)| range.len() > limit) {
            Some((channel, range)) => Err(ContractError::ResourceLimit {
                resource: format!("samples of channel '{channel}'"),
                requested: range.len(),
                limit,
            }),
            None => Ok(()),
        }
    }

    /// Fetch the slice of every channel that has a range
    ///
    /// Results are keyed by channel, independent of completion order. The
    /// first failure aborts the remaining tasks.
    #[instrument(
        name = "ingestion_fetch_lap_slices",
        skip(self, channels, ranges),
        fields(store = self.store.name(), channels = ranges.len())
    )]
    pub async fn fetch_lap_slices(
        &self,
        channels: &[ChannelSpec],
        ranges: &BTreeMap<ChannelId, SampleIndexRange>,
    ) -> Result<BTreeMap<ChannelId, ChannelSlice>, ContractError> {
        self.check_limits(ranges)?;

        let mut tasks = JoinSet::new();
        for channel in channels {
            let Some(&range) = ranges.get(&channel.name) else {
                continue;
            };
            let store = Arc::clone(&self.store);
            let channel = channel.clone();
            tasks.spawn(async move {
                let result = store.channel_slice(&channel, range).await;
                (channel.name, result)
            });
        }

        let mut slices = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (channel, result) = joined.map_err(|e| {
                self.metrics.record_error();
                ContractError::from(IngestionError::FetchTask {
                    channel: "<unknown>".into(),
                    message: e.to_string(),
                })
            })?;
            let slice = result.inspect_err(|err| {
                self.metrics.record_error();
                tracing::warn!(channel = %channel, error = %err, "slice fetch failed");
            })?;

            self.metrics.record_slice(&slice);
            metrics::histogram!("ingestion_samples_fetched", "channel" => channel.to_string())
                .record(slice.len() as f64);
            if slice.is_truncated() {
                tracing::warn!(
                    channel = %channel,
                    requested = slice.range.len(),
                    returned = slice.len(),
                    "channel ends inside the lap window"
                );
            } else {
                tracing::trace!(channel = %channel, samples = slice.len(), "slice fetched");
            }
            slices.insert(channel, slice);
        }
        Ok(slices)
    }

    /// Total stored length of every channel, in `channels` order
    #[instrument(
        name = "ingestion_channel_lengths",
        skip(self, channels),
        fields(store = self.store.name(), channels = channels.len())
    )]
    pub async fn channel_lengths(
        &self,
        channels: &[ChannelSpec],
    ) -> Result<Vec<(ChannelSpec, u64)>, ContractError> {
        let mut tasks = JoinSet::new();
        for (position, channel) in channels.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let channel = channel.clone();
            tasks.spawn(async move {
                let len = store.channel_len(&channel).await;
                (position, channel, len)
            });
        }

        let mut lengths = Vec::with_capacity(channels.len());
        while let Some(joined) = tasks.join_next().await {
            let (position, channel, len) = joined.map_err(|e| {
                ContractError::from(IngestionError::FetchTask {
                    channel: "<unknown>".into(),
                    message: e.to_string(),
                })
            })?;
            lengths.push((position, channel, len?));
        }
        lengths.sort_by_key(|(position, _, _)| *position);
        Ok(lengths
            .into_iter()
            .map(|(_, channel, len)| (channel, len))
            .collect())
    }
}

/// One-shot parallel fetch with a fresh `SliceFetcher`
pub async fn fetch_lap_slices<S>(
    store: Arc<S>,
    channels: &[ChannelSpec],
    ranges: &BTreeMap<ChannelId, SampleIndexRange>,
    limits: &LimitsConfig,
) -> Result<BTreeMap<ChannelId, ChannelSlice>, ContractError>
where
    S: SessionStore + Sync + 'static,
{
    SliceFetcher::new(store, limits.clone())
        .fetch_lap_slices(channels, ranges)
        .await
}
