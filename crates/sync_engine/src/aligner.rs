//! Nearest-neighbor alignment of multi-rate channels onto the reference axis.

use std::collections::BTreeMap;

use contracts::{
    ChannelId, ChannelRole, ChannelSlice, ChannelSpec, ContractError, MissingChannelPolicy,
    TelemetryPoint,
};
use tracing::instrument;

/// Index into a channel of `len` samples at `hz` nearest to `t_rel` seconds
///
/// `clamp(round(t_rel * hz), 0, len - 1)`; `None` for an empty channel.
#[inline]
pub fn nearest_index(t_rel: f64, hz: f64, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    Some(clamp_index(t_rel * hz, last))
}

#[inline]
fn clamp_index(position: f64, last: usize) -> usize {
    let local = position.round();
    if local <= 0.0 {
        0
    } else {
        (local as usize).min(last)
    }
}

/// Non-empty windowed readings of one channel
#[derive(Debug, Clone, Copy)]
struct Series<'s> {
    name: &'s ChannelId,
    hz: f64,
    values: &'s [f64],
}

impl Series<'_> {
    #[inline]
    fn at(&self, t_rel: f64) -> f64 {
        self.values[clamp_index(t_rel * self.hz, self.values.len() - 1)]
    }
}

/// Aligns fetched lap slices into `TelemetryPoint`s
///
/// The speed channel defines the axis: one point per speed sample. Every
/// other channel contributes the sample nearest in time, never an
/// interpolated value. Distance is resampled the same way, so the distance
/// axis keeps the staircase of its own rate.
#[derive(Debug, Clone)]
pub struct ChannelAligner<'a> {
    channels: BTreeMap<ChannelRole, &'a ChannelSpec>,
    missing: MissingChannelPolicy,
}

impl<'a> ChannelAligner<'a> {
    pub fn new(channels: &'a [ChannelSpec], missing: MissingChannelPolicy) -> Self {
        Self {
            channels: channels.iter().map(|spec| (spec.role, spec)).collect(),
            missing,
        }
    }

    /// Align one lap's slices
    ///
    /// # Errors
    /// - `EmptyChannel` if the speed or distance slice is missing or empty
    /// - `InvalidSample` if either holds a non-finite reading
    #[instrument(
        name = "sync_engine_align",
        skip(self, slices),
        fields(channels = slices.len())
    )]
    pub fn align(
        &self,
        lap_index: usize,
        slices: &BTreeMap<ChannelId, ChannelSlice>,
    ) -> Result<Vec<TelemetryPoint>, ContractError> {
        let reference = self.mandatory(ChannelRole::Speed, slices)?;
        let distance = self.mandatory(ChannelRole::Distance, slices)?;

        let throttle = self.optional(ChannelRole::Throttle, slices);
        let brake = self.optional(ChannelRole::Brake, slices);
        let engine_rpm = self.optional(ChannelRole::EngineRpm, slices);
        let steering = self.optional(ChannelRole::SteeringAngle, slices);

        // Position needs both axes
        let gps = self
            .optional(ChannelRole::Latitude, slices)
            .zip(self.optional(ChannelRole::Longitude, slices));

        // GPS is never zero-filled
        let fallback = match self.missing {
            MissingChannelPolicy::Absent => None,
            MissingChannelPolicy::Zero => Some(0.0),
        };
        let sample =
            |series: Option<Series<'_>>, t_rel: f64| series.map_or(fallback, |s| Some(s.at(t_rel)));

        let points: Vec<TelemetryPoint> = reference
            .values
            .iter()
            .enumerate()
            .map(|(index, &speed)| {
                let t_rel = index as f64 / reference.hz;
                let (lat, lon) = gps.map_or((None, None), |(lat, lon)| {
                    (Some(lat.at(t_rel)), Some(lon.at(t_rel)))
                });
                TelemetryPoint {
                    index,
                    time: t_rel,
                    distance: distance.at(t_rel),
                    speed,
                    throttle: sample(throttle, t_rel),
                    brake: sample(brake, t_rel),
                    lat,
                    lon,
                    lap_index,
                    engine_rpm: sample(engine_rpm, t_rel),
                    steering_angle: sample(steering, t_rel),
                }
            })
            .collect();

        tracing::debug!(
            lap_index,
            reference = %reference.name,
            points = points.len(),
            gps = gps.is_some(),
            "aligned lap channels"
        );
        metrics::histogram!("sync_aligned_points").record(points.len() as f64);
        Ok(points)
    }

    fn mandatory<'s>(
        &'s self,
        role: ChannelRole,
        slices: &'s BTreeMap<ChannelId, ChannelSlice>,
    ) -> Result<Series<'s>, ContractError> {
        let spec = self
            .channels
            .get(&role)
            .ok_or_else(|| ContractError::empty_channel(role.as_str()))?;
        let series = self
            .series(spec, slices)
            .ok_or_else(|| ContractError::empty_channel(spec.name.as_str()))?;
        // Speed and distance are never nullable in the output
        if let Some((index, &value)) = series
            .values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ContractError::InvalidSample {
                channel: spec.name.to_string(),
                index,
                value,
            });
        }
        Ok(series)
    }

    fn optional<'s>(
        &'s self,
        role: ChannelRole,
        slices: &'s BTreeMap<ChannelId, ChannelSlice>,
    ) -> Option<Series<'s>> {
        let spec = self.channels.get(&role)?;
        let series = self.series(spec, slices);
        if series.is_none() {
            tracing::debug!(channel = %spec.name, role = %role, "no samples in lap window");
        }
        series
    }

    fn series<'s>(
        &self,
        spec: &'s ChannelSpec,
        slices: &'s BTreeMap<ChannelId, ChannelSlice>,
    ) -> Option<Series<'s>> {
        let slice = slices.get(&spec.name).filter(|slice| !slice.is_empty())?;
        Some(Series {
            name: &spec.name,
            hz: spec.sample_rate_hz,
            values: &slice.values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SampleIndexRange;
    use proptest::prelude::*;

    fn specs() -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::new("Ground Speed", ChannelRole::Speed, 100.0),
            ChannelSpec::new("Lap Dist", ChannelRole::Distance, 10.0),
            ChannelSpec::new("Throttle Pos", ChannelRole::Throttle, 50.0),
            ChannelSpec::new("GPS Latitude", ChannelRole::Latitude, 10.0),
            ChannelSpec::new("GPS Longitude", ChannelRole::Longitude, 10.0),
        ]
    }

    fn slice(name: &str, values: Vec<f64>) -> (ChannelId, ChannelSlice) {
        let len = values.len().max(1) as u64;
        let range = SampleIndexRange::new(0, len).unwrap();
        (name.into(), ChannelSlice::new(name.into(), range, values))
    }

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    fn lap_slices() -> BTreeMap<ChannelId, ChannelSlice> {
        BTreeMap::from([
            slice("Ground Speed", ramp(1200)),
            slice("Lap Dist", ramp(120)),
            slice("Throttle Pos", ramp(600)),
            slice("GPS Latitude", vec![45.6; 120]),
            slice("GPS Longitude", vec![9.28; 120]),
        ])
    }

    #[test]
    fn test_reference_axis_resampling() {
        let specs = specs();
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let points = aligner.align(3, &lap_slices()).unwrap();

        assert_eq!(points.len(), 1200);
        let p = &points[500];
        assert_eq!(p.index, 500);
        assert_eq!(p.time, 5.0);
        assert_eq!(p.speed, 500.0);
        assert_eq!(p.distance, 50.0);
        assert_eq!(p.throttle, Some(250.0));
        assert_eq!(p.lat, Some(45.6));
        assert_eq!(p.lap_index, 3);
        assert_eq!(p.brake, None);
    }

    #[test]
    fn test_nearest_not_interpolated() {
        let specs = specs();
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let points = aligner.align(0, &lap_slices()).unwrap();
        // 0.04s -> 0.4 distance samples -> 0; 0.06s -> 0.6 -> 1
        assert_eq!(points[4].distance, 0.0);
        assert_eq!(points[6].distance, 1.0);
        assert_eq!(points[14].distance, 1.0);
        assert_eq!(points[16].distance, 2.0);
    }

    #[test]
    fn test_empty_gps_is_null() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.insert("GPS Latitude".into(), slice("GPS Latitude", vec![]).1);
        slices.insert("GPS Longitude".into(), slice("GPS Longitude", vec![]).1);

        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Zero);
        let points = aligner.align(0, &slices).unwrap();
        assert_eq!(points.len(), 1200);
        assert!(points.iter().all(|p| p.lat.is_none() && p.lon.is_none()));
    }

    #[test]
    fn test_single_gps_axis_drops_position() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.remove("GPS Longitude");
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let points = aligner.align(0, &slices).unwrap();
        assert!(points.iter().all(|p| p.lat.is_none()));
    }

    #[test]
    fn test_empty_reference_fails() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.insert("Ground Speed".into(), slice("Ground Speed", vec![]).1);
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let err = aligner.align(0, &slices).unwrap_err();
        assert!(matches!(err, ContractError::EmptyChannel { ref channel } if channel == "Ground Speed"));
    }

    #[test]
    fn test_missing_distance_fails() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.remove("Lap Dist");
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Zero);
        let err = aligner.align(0, &slices).unwrap_err();
        assert!(matches!(err, ContractError::EmptyChannel { ref channel } if channel == "Lap Dist"));

        let no_distance: Vec<_> = specs
            .into_iter()
            .filter(|s| s.role != ChannelRole::Distance)
            .collect();
        let aligner = ChannelAligner::new(&no_distance, MissingChannelPolicy::Absent);
        let err = aligner.align(0, &lap_slices()).unwrap_err();
        assert!(matches!(err, ContractError::EmptyChannel { ref channel } if channel == "distance"));
    }

    #[test]
    fn test_non_finite_mandatory_reading_fails() {
        let specs = specs();
        let mut slices = lap_slices();
        let mut speed = ramp(1200);
        speed[7] = f64::NAN;
        slices.insert("Ground Speed".into(), slice("Ground Speed", speed).1);
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let err = aligner.align(0, &slices).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidSample { ref channel, index: 7, .. } if channel == "Ground Speed"
        ));

        let mut slices = lap_slices();
        let mut distance = ramp(120);
        distance[119] = f64::INFINITY;
        slices.insert("Lap Dist".into(), slice("Lap Dist", distance).1);
        let err = aligner.align(0, &slices).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidSample { ref channel, index: 119, .. } if channel == "Lap Dist"
        ));

        // Optional channels keep their readings as-is
        let mut slices = lap_slices();
        slices.insert("Throttle Pos".into(), slice("Throttle Pos", vec![f64::NAN; 600]).1);
        assert!(aligner.align(0, &slices).is_ok());
    }

    #[test]
    fn test_missing_channel_policy() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.insert("Throttle Pos".into(), slice("Throttle Pos", vec![]).1);

        let absent = ChannelAligner::new(&specs, MissingChannelPolicy::Absent)
            .align(0, &slices)
            .unwrap();
        assert!(absent.iter().all(|p| p.throttle.is_none() && p.engine_rpm.is_none()));

        let zero = ChannelAligner::new(&specs, MissingChannelPolicy::Zero)
            .align(0, &slices)
            .unwrap();
        assert!(zero.iter().all(|p| p.throttle == Some(0.0) && p.engine_rpm == Some(0.0)));
        assert!(zero.iter().all(|p| p.lat.is_some()));
    }

    #[test]
    fn test_truncated_channel_holds_last_sample() {
        let specs = specs();
        let mut slices = lap_slices();
        slices.insert("Lap Dist".into(), slice("Lap Dist", ramp(60)).1);
        let aligner = ChannelAligner::new(&specs, MissingChannelPolicy::Absent);
        let points = aligner.align(0, &slices).unwrap();
        assert_eq!(points[1199].distance, 59.0);
    }

    #[test]
    fn test_nearest_index_bounds() {
        assert_eq!(nearest_index(5.0, 10.0, 120), Some(50));
        assert_eq!(nearest_index(-1.0, 10.0, 120), Some(0));
        assert_eq!(nearest_index(500.0, 10.0, 120), Some(119));
        assert_eq!(nearest_index(1.0, 10.0, 0), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_one_point_per_reference_sample(
            ref_len in 1usize..3_000,
            ref_hz in 10.0f64..200.0,
            ratio in 0.05f64..1.0,
            dist_len in 1usize..500,
        ) {
            let specs = vec![
                ChannelSpec::new("speed", ChannelRole::Speed, ref_hz),
                ChannelSpec::new("dist", ChannelRole::Distance, ref_hz * ratio),
            ];
            let slices = BTreeMap::from([
                slice("speed", ramp(ref_len)),
                slice("dist", ramp(dist_len)),
            ]);
            let points = ChannelAligner::new(&specs, MissingChannelPolicy::Absent)
                .align(0, &slices)
                .unwrap();

            prop_assert_eq!(points.len(), ref_len);
            // Distance values equal their local index, so they expose it
            for pair in points.windows(2) {
                prop_assert!(pair[1].distance >= pair[0].distance);
                prop_assert!(pair[1].index == pair[0].index + 1);
            }
            for p in &points {
                prop_assert!(p.distance < dist_len as f64);
            }
        }

        #[test]
        fn prop_nearest_index_monotonic(
            hz in 0.5f64..500.0,
            ref_hz in 1.0f64..1_000.0,
            len in 1usize..1_000,
        ) {
            let mut last = 0;
            for i in 0..2_000usize {
                let local = nearest_index(i as f64 / ref_hz, hz, len).unwrap();
                prop_assert!(local >= last);
                prop_assert!(local < len);
                last = local;
            }
        }
    }
}
