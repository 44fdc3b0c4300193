//! Pipeline orchestrator - runs one lap analysis against a session store.
//!
//! Lap resolution happens first and is not time-boxed. Everything after the
//! lap is chosen (range mapping, limits, rate check, fetch, alignment) runs
//! under the configured wall-clock budget.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    ChannelId, ChannelRole, ChannelSlice, ChannelSpec, ContractError, LapAnalysis, LapRecord,
    RateFinding, SessionConfig, SessionStore,
};
use ingestion::SliceFetcher;
use lap_timing::{LapSelection, ResolvedLaps};
use observability::{record_analysis, record_analysis_failure, record_stage_duration};
use sync_engine::{check_rates, enforce_rate_policy, SyncEngine};
use tracing::{info, instrument};

use super::PipelineStats;

/// Result of a successful analysis
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub analysis: LapAnalysis,
    pub stats: PipelineStats,
}

/// Main pipeline orchestrator
#[derive(Debug)]
pub struct Pipeline<S> {
    config: SessionConfig,
    fetcher: SliceFetcher<S>,
}

impl<S> Pipeline<S>
where
    S: SessionStore + Sync + 'static,
{
    pub fn new(config: SessionConfig, store: Arc<S>) -> Self {
        let fetcher = SliceFetcher::new(store, config.limits.clone());
        Self { config, fetcher }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read the timing tables and resolve every lap
    #[instrument(name = "pipeline_resolve_laps", skip(self), fields(store = self.fetcher.store().name()))]
    pub async fn resolve_laps(&self) -> Result<ResolvedLaps, ContractError> {
        let started = Instant::now();
        let tables = self.fetcher.store().timing_tables().await?;
        let laps = ResolvedLaps::resolve(&tables)?;
        record_stage_duration("timing", started.elapsed());
        Ok(laps)
    }

    /// Run the full analysis for the selected lap
    #[instrument(name = "pipeline_analyze", skip(self), fields(store = self.fetcher.store().name()))]
    pub async fn analyze(&self, selection: LapSelection) -> Result<PipelineOutput, ContractError> {
        let started = Instant::now();
        match self.run(selection, started).await {
            Ok(output) => {
                record_analysis(&output.analysis, output.stats.duration);
                Ok(output)
            }
            Err(err) => {
                record_analysis_failure(&err);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        selection: LapSelection,
        started: Instant,
    ) -> Result<PipelineOutput, ContractError> {
        let laps = self.resolve_laps().await?;
        let lap = *laps.select(selection)?;
        info!(
            lap_index = lap.lap_index,
            start_time = lap.start_time,
            duration = lap.duration,
            valid = lap.valid,
            "Lap selected"
        );

        let budget = self.config.timeout();
        let (output, rate_warnings) = tokio::time::timeout(budget, self.synchronize_lap(&lap))
            .await
            .map_err(|_| ContractError::Timeout {
                budget_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            })??;

        let fetch = self.fetcher.metrics();
        let mut stats = PipelineStats {
            laps_resolved: laps.len(),
            slices_fetched: fetch.slices_fetched,
            samples_fetched: fetch.samples_fetched,
            truncated_slices: fetch.truncated_slices,
            reference_samples: output.reference_samples,
            output_points: output.points.len(),
            rate_warnings: rate_warnings.len(),
            ..Default::default()
        };

        let analysis = LapAnalysis {
            lap,
            sector_bests: laps.sector_bests(),
            stride: self.config.stride().get(),
            reference_samples: output.reference_samples,
            points: output.points,
            rate_warnings,
        };

        stats.duration = started.elapsed();
        stats.metrics.update(&analysis, stats.duration);

        info!(
            lap_index = lap.lap_index,
            reference_samples = stats.reference_samples,
            points = stats.output_points,
            elapsed_ms = stats.duration.as_secs_f64() * 1000.0,
            "Analysis complete"
        );

        Ok(PipelineOutput { analysis, stats })
    }

    /// Time-boxed part of the analysis
    async fn synchronize_lap(
        &self,
        lap: &LapRecord,
    ) -> Result<(sync_engine::SyncOutput, Vec<RateFinding>), ContractError> {
        let engine = SyncEngine::new(&self.config)?;
        let ranges = engine.lap_ranges(lap)?;
        self.fetcher.check_limits(&ranges)?;

        let rate_warnings = if self.config.rate_check.enabled {
            let started = Instant::now();
            let findings = self.check_rates().await?;
            record_stage_duration("rate_check", started.elapsed());
            findings
        } else {
            Vec::new()
        };

        let started = Instant::now();
        let slices: BTreeMap<ChannelId, ChannelSlice> = self
            .fetcher
            .fetch_lap_slices(&self.config.channels, &ranges)
            .await?;
        record_stage_duration("fetch", started.elapsed());

        let started = Instant::now();
        let output = engine.synchronize(lap, &slices)?;
        record_stage_duration("align", started.elapsed());

        Ok((output, rate_warnings))
    }

    async fn check_rates(&self) -> Result<Vec<RateFinding>, ContractError> {
        let lengths = self.fetcher.channel_lengths(&self.config.channels).await?;
        let reference = lengths
            .iter()
            .find(|(spec, _)| spec.role == ChannelRole::Speed)
            .map(|(spec, len)| (spec, *len))
            .ok_or_else(|| {
                ContractError::config_validation("channels", "no channel has role 'speed'")
            })?;
        let pairs: Vec<(&ChannelSpec, u64)> =
            lengths.iter().map(|(spec, len)| (spec, *len)).collect();

        let findings = check_rates(reference, &pairs, self.config.rate_check.tolerance);
        enforce_rate_policy(findings, &self.config.rate_check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        AlignmentConfig, ConfigVersion, LimitsConfig, RateCheckConfig, RateMismatchPolicy,
        StoreConfig,
    };
    use ingestion::{MemorySessionStore, SyntheticSession};

    fn config() -> SessionConfig {
        SessionConfig {
            version: ConfigVersion::V1,
            store: StoreConfig::default(),
            channels: vec![
                ChannelSpec::new("Ground Speed", ChannelRole::Speed, 100.0),
                ChannelSpec::new("Lap Distance", ChannelRole::Distance, 10.0),
                ChannelSpec::new("Throttle Pos", ChannelRole::Throttle, 50.0),
            ],
            alignment: AlignmentConfig::default(),
            limits: LimitsConfig::default(),
            rate_check: RateCheckConfig::default(),
        }
    }

    fn pipeline(config: SessionConfig, session: &SyntheticSession) -> Pipeline<MemorySessionStore> {
        let store = MemorySessionStore::from_synthetic(session, &config);
        Pipeline::new(config, Arc::new(store))
    }

    #[tokio::test]
    async fn test_analyze_fastest_lap() {
        let session = SyntheticSession::new(vec![62.0, 60.0, 61.0]);
        let output = pipeline(config(), &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();

        let analysis = output.analysis;
        assert_eq!(analysis.lap.lap_index, 1);
        assert!((analysis.lap.duration - 60.0).abs() < 1e-9);
        assert_eq!(analysis.reference_samples, 6_000);
        assert_eq!(analysis.points.len(), 600);
        assert_eq!(analysis.stride, 10);
        assert!(analysis.rate_warnings.is_empty());
        assert!(analysis.points.iter().all(|p| p.lap_index == 1));
        assert!(analysis.points.iter().all(|p| p.lat.is_none()));
        assert_eq!(output.stats.laps_resolved, 3);
        assert_eq!(output.stats.slices_fetched, 3);
        assert_eq!(output.stats.metrics.total_analyses, 1);
    }

    #[tokio::test]
    async fn test_rate_mismatch_policy() {
        let mut config = config();
        let session = SyntheticSession::new(vec![30.0, 29.0]);
        let store = MemorySessionStore::from_synthetic(&session, &config)
            .with_channel("Throttle Pos", vec![0.5; 200]);

        config.rate_check.policy = RateMismatchPolicy::Warn;
        let warn = Pipeline::new(config.clone(), Arc::new(store.clone()));
        let output = warn.analyze(LapSelection::Index(0)).await.unwrap();
        assert_eq!(output.analysis.rate_warnings.len(), 1);
        assert_eq!(output.analysis.rate_warnings[0].channel, "Throttle Pos");

        config.rate_check.policy = RateMismatchPolicy::Fail;
        let fail = Pipeline::new(config, Arc::new(store));
        let err = fail.analyze(LapSelection::Index(0)).await.unwrap_err();
        assert!(matches!(err, ContractError::RateMismatch { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_invalid_lap_index() {
        let session = SyntheticSession::new(vec![30.0]);
        let err = pipeline(config(), &session)
            .analyze(LapSelection::Index(4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidLapIndex {
                index: 4,
                lap_count: 1
            }
        ));
    }
}
