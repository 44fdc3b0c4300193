//! Stored channel length vs. declared sample rate.
//!
//! Every channel of a session covers the same wall-clock span, so
//! `len / hz` must agree with the reference channel. A channel whose stored
//! length contradicts its configured rate would silently misalign.

use contracts::{
    ChannelSpec, ContractError, RateCheckConfig, RateFinding, RateMismatchPolicy,
};
use tracing::instrument;

/// Compare every channel's covered duration with the reference's
///
/// `lengths` pairs each channel with its total stored sample count. Empty
/// channels are skipped; they surface as missing data during alignment.
#[instrument(
    name = "sync_engine_check_rates",
    skip(reference, lengths),
    fields(reference = %reference.0.name, channels = lengths.len())
)]
pub fn check_rates(
    reference: (&ChannelSpec, u64),
    lengths: &[(&ChannelSpec, u64)],
    tolerance: f64,
) -> Vec<RateFinding> {
    let (reference_spec, reference_len) = reference;
    if reference_len == 0 {
        return Vec::new();
    }
    let reference_duration_s = reference_spec.duration_of(reference_len);

    lengths
        .iter()
        .filter(|(spec, samples)| *samples > 0 && spec.name != reference_spec.name)
        .filter_map(|&(spec, samples)| {
            let duration_s = spec.duration_of(samples);
            let relative_error = (duration_s - reference_duration_s).abs() / reference_duration_s;
            (relative_error > tolerance).then(|| RateFinding {
                channel: spec.name.clone(),
                sample_rate_hz: spec.sample_rate_hz,
                samples,
                duration_s,
                reference_duration_s,
                relative_error,
            })
        })
        .collect()
}

/// Apply the configured policy to rate findings
///
/// # Errors
/// `RateMismatch` for the worst finding under `RateMismatchPolicy::Fail`
pub fn enforce(
    findings: Vec<RateFinding>,
    config: &RateCheckConfig,
) -> Result<Vec<RateFinding>, ContractError> {
    for finding in &findings {
        tracing::warn!(
            channel = %finding.channel,
            sample_rate_hz = finding.sample_rate_hz,
            samples = finding.samples,
            duration_s = finding.duration_s,
            reference_duration_s = finding.reference_duration_s,
            relative_error = finding.relative_error,
            "channel length disagrees with its sample rate"
        );
        metrics::counter!(
            "sync_rate_mismatch_total",
            "channel" => finding.channel.to_string()
        )
        .increment(1);
    }

    match config.policy {
        RateMismatchPolicy::Warn => Ok(findings),
        RateMismatchPolicy::Fail => match findings
            .iter()
            .max_by(|a, b| a.relative_error.total_cmp(&b.relative_error))
        {
            Some(worst) => Err(ContractError::RateMismatch {
                channel: worst.channel.to_string(),
                expected_s: worst.reference_duration_s,
                actual_s: worst.duration_s,
            }),
            None => Ok(findings),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ChannelRole;

    fn specs() -> [ChannelSpec; 3] {
        [
            ChannelSpec::new("speed", ChannelRole::Speed, 100.0),
            ChannelSpec::new("dist", ChannelRole::Distance, 10.0),
            ChannelSpec::new("rpm", ChannelRole::EngineRpm, 50.0),
        ]
    }

    #[test]
    fn test_consistent_lengths_pass() {
        let [speed, dist, rpm] = specs();
        let findings = check_rates(
            (&speed, 12_000),
            &[(&speed, 12_000), (&dist, 1_201), (&rpm, 5_990)],
            0.02,
        );
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_wrong_rate_detected() {
        let [speed, dist, rpm] = specs();
        // rpm actually logged at 20 Hz
        let findings = check_rates(
            (&speed, 12_000),
            &[(&dist, 1_200), (&rpm, 2_400), (&speed, 12_000)],
            0.02,
        );
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.channel, "rpm");
        assert!((finding.duration_s - 48.0).abs() < 1e-9);
        assert!((finding.reference_duration_s - 120.0).abs() < 1e-9);
        assert!((finding.relative_error - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_channels_skipped() {
        let [speed, dist, _] = specs();
        assert!(check_rates((&speed, 12_000), &[(&dist, 0)], 0.0).is_empty());
        assert!(check_rates((&speed, 0), &[(&dist, 100)], 0.0).is_empty());
    }

    #[test]
    fn test_policy() {
        let [speed, dist, rpm] = specs();
        let findings = check_rates((&speed, 12_000), &[(&dist, 600), (&rpm, 2_400)], 0.02);
        assert_eq!(findings.len(), 2);

        let warn = RateCheckConfig::default();
        assert_eq!(enforce(findings.clone(), &warn).unwrap().len(), 2);

        let fail = RateCheckConfig {
            policy: RateMismatchPolicy::Fail,
            ..Default::default()
        };
        match enforce(findings, &fail) {
            Err(ContractError::RateMismatch { channel, .. }) => assert_eq!(channel, "rpm"),
            other => panic!("expected RateMismatch, got {other:?}"),
        }
        assert!(enforce(Vec::new(), &fail).unwrap().is_empty());
    }
}
