//! Analysis metrics
//!
//! Records per-lap analysis results to the `metrics` facade and keeps an
//! in-memory aggregate for end-of-run summaries.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{ContractError, LapAnalysis, RateFinding, TelemetryPoint};
use metrics::{counter, gauge, histogram};

/// Record metrics for a completed lap analysis
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_analysis;
///
/// let started = Instant::now();
/// let analysis = analyze(&request).await?;
/// record_analysis(&analysis, started.elapsed());
/// ```
pub fn record_analysis(analysis: &LapAnalysis, elapsed: Duration) {
    counter!("lapsync_analyses_total", "status" => "ok").increment(1);

    gauge!("lapsync_last_lap_index").set(analysis.lap.lap_index as f64);
    histogram!("lapsync_analysis_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    histogram!("lapsync_reference_samples").record(analysis.reference_samples as f64);
    histogram!("lapsync_output_points").record(analysis.points.len() as f64);

    if analysis.lap.valid {
        histogram!("lapsync_lap_duration_s").record(analysis.lap.duration);
    } else {
        counter!("lapsync_invalid_laps_analyzed_total").increment(1);
    }

    for (channel, absent) in absent_counts(&analysis.points) {
        if absent > 0 {
            counter!("lapsync_absent_points_total", "channel" => channel).increment(absent);
        }
    }

    record_rate_findings(&analysis.rate_warnings);
}

/// Record a failed analysis, labelled by error kind
pub fn record_analysis_failure(error: &ContractError) {
    counter!(
        "lapsync_analyses_total",
        "status" => "error",
        "kind" => error.kind()
    )
    .increment(1);
}

/// Record how long one pipeline stage took
pub fn record_stage_duration(stage: &'static str, elapsed: Duration) {
    histogram!("lapsync_stage_duration_ms", "stage" => stage)
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Record channels whose stored length disagrees with their rate
pub fn record_rate_findings(findings: &[RateFinding]) {
    for finding in findings {
        counter!(
            "lapsync_rate_findings_total",
            "channel" => finding.channel.to_string()
        )
        .increment(1);
        histogram!(
            "lapsync_rate_relative_error",
            "channel" => finding.channel.to_string()
        )
        .record(finding.relative_error);
    }
}

/// Points with no value, per optional output field
fn absent_counts(points: &[TelemetryPoint]) -> [(&'static str, u64); 6] {
    let mut counts = [
        ("throttle", 0u64),
        ("brake", 0),
        ("lat", 0),
        ("lon", 0),
        ("engine_rpm", 0),
        ("steering_angle", 0),
    ];
    for point in points {
        let fields = [
            point.throttle,
            point.brake,
            point.lat,
            point.lon,
            point.engine_rpm,
            point.steering_angle,
        ];
        for (slot, value) in counts.iter_mut().zip(fields) {
            if value.is_none() {
                slot.1 += 1;
            }
        }
    }
    counts
}

/// Analysis metrics aggregator
///
/// Aggregates in memory so a run can print a summary without a scrape.
#[derive(Debug, Clone, Default)]
pub struct AnalysisMetricsAggregator {
    pub total_analyses: u64,

    pub failed_analyses: u64,

    /// Analyses of laps flagged invalid
    pub invalid_laps: u64,

    pub reference_samples: RunningStats,

    pub output_points: RunningStats,

    pub elapsed_ms: RunningStats,

    /// Durations of valid laps
    pub lap_duration_s: RunningStats,

    /// Rate findings per channel
    pub rate_findings: BTreeMap<String, u64>,

    /// Absent points per optional output field
    pub absent_points: BTreeMap<String, u64>,

    pub failures_by_kind: BTreeMap<String, u64>,
}

impl AnalysisMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a successful analysis into the aggregate
    pub fn update(&mut self, analysis: &LapAnalysis, elapsed: Duration) {
        self.total_analyses += 1;
        if analysis.lap.valid {
            self.lap_duration_s.push(analysis.lap.duration);
        } else {
            self.invalid_laps += 1;
        }

        self.reference_samples
            .push(analysis.reference_samples as f64);
        self.output_points.push(analysis.points.len() as f64);
        self.elapsed_ms.push(elapsed.as_secs_f64() * 1000.0);

        for finding in &analysis.rate_warnings {
            *self
                .rate_findings
                .entry(finding.channel.to_string())
                .or_insert(0) += 1;
        }

        for (channel, absent) in absent_counts(&analysis.points) {
            if absent > 0 {
                *self.absent_points.entry(channel.to_string()).or_insert(0) += absent;
            }
        }
    }

    /// Count a failed analysis
    pub fn record_failure(&mut self, error: &ContractError) {
        self.total_analyses += 1;
        self.failed_analyses += 1;
        *self
            .failures_by_kind
            .entry(error.kind().to_string())
            .or_insert(0) += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_analyses: self.total_analyses,
            failed_analyses: self.failed_analyses,
            invalid_laps: self.invalid_laps,
            failure_rate: if self.total_analyses > 0 {
                self.failed_analyses as f64 / self.total_analyses as f64 * 100.0
            } else {
                0.0
            },
            reference_samples: StatsSummary::from(&self.reference_samples),
            output_points: StatsSummary::from(&self.output_points),
            elapsed_ms: StatsSummary::from(&self.elapsed_ms),
            lap_duration_s: StatsSummary::from(&self.lap_duration_s),
            rate_findings: self.rate_findings.clone(),
            absent_points: self.absent_points.clone(),
            failures_by_kind: self.failures_by_kind.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of an `AnalysisMetricsAggregator`
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_analyses: u64,
    pub failed_analyses: u64,
    pub invalid_laps: u64,
    /// Percentage of analyses that failed
    pub failure_rate: f64,
    pub reference_samples: StatsSummary,
    pub output_points: StatsSummary,
    pub elapsed_ms: StatsSummary,
    pub lap_duration_s: StatsSummary,
    pub rate_findings: BTreeMap<String, u64>,
    pub absent_points: BTreeMap<String, u64>,
    pub failures_by_kind: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Analysis Metrics Summary ===")?;
        writeln!(f, "Analyses: {}", self.total_analyses)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.failed_analyses, self.failure_rate
        )?;
        writeln!(f, "Invalid laps analyzed: {}", self.invalid_laps)?;
        writeln!(f, "Reference samples: {}", self.reference_samples)?;
        writeln!(f, "Output points: {}", self.output_points)?;
        writeln!(f, "Elapsed (ms): {}", self.elapsed_ms)?;
        writeln!(f, "Lap duration (s): {}", self.lap_duration_s)?;

        if !self.rate_findings.is_empty() {
            writeln!(f, "Rate findings:")?;
            for (channel, count) in &self.rate_findings {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        if !self.absent_points.is_empty() {
            writeln!(f, "Absent points:")?;
            for (channel, count) in &self.absent_points {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        if !self.failures_by_kind.is_empty() {
            writeln!(f, "Failures:")?;
            for (kind, count) in &self.failures_by_kind {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// Summary statistics of one series
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean and variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
