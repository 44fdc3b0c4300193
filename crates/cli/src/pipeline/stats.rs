//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::AnalysisMetricsAggregator;

/// Statistics from one analysis
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Wall-clock time of the whole analysis
    pub duration: Duration,

    /// Laps found in the timing tables
    pub laps_resolved: usize,

    /// Channel slices read from the store
    pub slices_fetched: u64,

    /// Samples across all fetched slices
    pub samples_fetched: u64,

    /// Slices that ended inside the lap window
    pub truncated_slices: u64,

    /// Aligned points before decimation
    pub reference_samples: usize,

    /// Points after decimation
    pub output_points: usize,

    pub rate_warnings: usize,

    /// Analysis metrics aggregator
    pub metrics: AnalysisMetricsAggregator,
}

impl PipelineStats {
    /// Output points per reference sample
    pub fn reduction(&self) -> f64 {
        if self.reference_samples > 0 {
            self.output_points as f64 / self.reference_samples as f64
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                    Analysis Statistics                       ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("📊 Overview");
        eprintln!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Laps resolved: {}", self.laps_resolved);
        eprintln!("   ├─ Slices fetched: {}", self.slices_fetched);
        eprintln!("   ├─ Samples fetched: {}", self.samples_fetched);
        eprintln!("   └─ Truncated slices: {}", self.truncated_slices);

        eprintln!("\n📈 Alignment");
        eprintln!("   ├─ Reference samples: {}", self.reference_samples);
        eprintln!(
            "   ├─ Output points: {} ({:.1}%)",
            self.output_points,
            self.reduction() * 100.0
        );
        eprintln!("   └─ Rate warnings: {}", self.rate_warnings);

        let summary = self.metrics.summary();
        if !summary.absent_points.is_empty() {
            eprintln!("\n⚠️  Absent Points");
            for (channel, count) in &summary.absent_points {
                eprintln!("   ├─ {}: {}", channel, count);
            }
        }

        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction() {
        let stats = PipelineStats {
            reference_samples: 1200,
            output_points: 120,
            ..Default::default()
        };
        assert!((stats.reduction() - 0.1).abs() < 1e-12);
        assert_eq!(PipelineStats::default().reduction(), 0.0);
    }
}
