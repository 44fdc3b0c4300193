//! In-memory session store

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ChannelSlice, ChannelSpec, ContractError, SampleIndexRange, SessionConfig, SessionStore,
    TimingTables,
};

use crate::synthetic::SyntheticSession;

/// Session held entirely in memory, keyed by channel table name
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    tables: TimingTables,
    channels: HashMap<String, Arc<[f64]>>,
    latency: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new(tables: TimingTables) -> Self {
        Self {
            tables,
            ..Default::default()
        }
    }

    /// Sample every configured channel of `session`
    pub fn from_synthetic(session: &SyntheticSession, config: &SessionConfig) -> Self {
        config.channels.iter().fold(
            Self::new(session.timing_tables()),
            |store, channel| store.with_channel(channel.table_name(), session.channel_values(channel)),
        )
    }

    pub fn with_channel(mut self, table: impl Into<String>, values: Vec<f64>) -> Self {
        self.channels.insert(table.into(), values.into());
        self
    }

    /// Delay every read, to exercise time budgets
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn values(&self, channel: &ChannelSpec) -> &[f64] {
        self.channels
            .get(channel.table_name())
            .map(|values| &values[..])
            .unwrap_or_default()
    }
}

impl SessionStore for MemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn timing_tables(&self) -> Result<TimingTables, ContractError> {
        self.wait().await;
        Ok(self.tables.clone())
    }

    async fn channel_slice(
        &self,
        channel: &ChannelSpec,
        range: SampleIndexRange,
    ) -> Result<ChannelSlice, ContractError> {
        self.wait().await;
        let values = self.values(channel);
        let start = usize::try_from(range.start()).unwrap_or(usize::MAX).min(values.len());
        let end = usize::try_from(range.end()).unwrap_or(usize::MAX).min(values.len());
        Ok(ChannelSlice::new(
            channel.name.clone(),
            range,
            values[start..end].to_vec(),
        ))
    }

    async fn channel_len(&self, channel: &ChannelSpec) -> Result<u64, ContractError> {
        self.wait().await;
        Ok(self.values(channel).len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ChannelRole;

    fn store() -> MemorySessionStore {
        MemorySessionStore::new(TimingTables::default())
            .with_channel("speed", (0..100).map(f64::from).collect())
    }

    #[tokio::test]
    async fn test_slice_within_bounds() {
        let spec = ChannelSpec::new("speed", ChannelRole::Speed, 10.0);
        let slice = store()
            .channel_slice(&spec, SampleIndexRange::new(10, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(slice.values, (10..20).map(f64::from).collect::<Vec<_>>());
        assert!(!slice.is_truncated());
    }

    #[tokio::test]
    async fn test_slice_past_end() {
        let spec = ChannelSpec::new("speed", ChannelRole::Speed, 10.0);
        let store = store();
        let slice = store
            .channel_slice(&spec, SampleIndexRange::new(95, 120).unwrap())
            .await
            .unwrap();
        assert_eq!(slice.len(), 5);

        let slice = store
            .channel_slice(&spec, SampleIndexRange::new(500, 600).unwrap())
            .await
            .unwrap();
        assert!(slice.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_channel_is_empty() {
        let spec = ChannelSpec::new("rpm", ChannelRole::EngineRpm, 10.0);
        assert_eq!(store().channel_len(&spec).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_table_override() {
        let mut spec = ChannelSpec::new("Ground Speed", ChannelRole::Speed, 10.0);
        spec.table = Some("speed".into());
        assert_eq!(store().channel_len(&spec).await.unwrap(), 100);
    }
}
