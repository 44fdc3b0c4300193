//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Config file round trips
//! - Full analyses over in-memory sessions (no database required)
//! - SQLite-backed sessions written to a temp directory

#[cfg(test)]
mod contract_tests {
    use config_loader::ConfigLoader;
    use contracts::{ChannelRole, MissingChannelPolicy};

    const CONFIG: &str = r#"
[store]
lap_times_table = "laps"

[[channels]]
name = "Ground Speed"
role = "speed"
sample_rate_hz = 100.0

[[channels]]
name = "Lap Distance"
role = "distance"
table = "dist"
sample_rate_hz = 10.0

[alignment]
stride = 5
missing_channels = "zero"
"#;

    #[test]
    fn test_config_round_trip() {
        let config = ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.store.lap_times_table, "laps");
        assert_eq!(config.store.sector1_table, "sector1_times");
        assert_eq!(
            config.channel(ChannelRole::Distance).map(|c| c.table_name()),
            Some("dist")
        );

        let json = ConfigLoader::to_json(&config).unwrap();
        let reloaded =
            ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.channels, config.channels);
        assert_eq!(reloaded.stride().get(), 5);
        assert_eq!(
            reloaded.alignment.missing_channels,
            MissingChannelPolicy::Zero
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::{
        AlignmentConfig, ChannelRole, ChannelSpec, ConfigVersion, ContractError, LimitsConfig,
        MissingChannelPolicy, RateCheckConfig, SessionConfig, SessionStore, StoreConfig,
        TimingTables,
    };
    use ingestion::{MemorySessionStore, SqliteSessionStore, SyntheticSession};
    use lap_timing::ResolvedLaps;
    use lapsync_cli::{LapSelection, Pipeline};
    use sync_engine::{ChannelAligner, Downsampler, RateIndexMapper};

    const LAPS: [f64; 3] = [62.0, 60.0, 61.0];

    fn session_config() -> SessionConfig {
        SessionConfig {
            version: ConfigVersion::V1,
            store: StoreConfig::default(),
            channels: vec![
                ChannelSpec::new("Ground Speed", ChannelRole::Speed, 100.0),
                ChannelSpec::new("Lap Distance", ChannelRole::Distance, 10.0),
                ChannelSpec::new("Throttle Pos", ChannelRole::Throttle, 50.0),
                ChannelSpec::new("Brake Pos", ChannelRole::Brake, 50.0),
                ChannelSpec::new("GPS Latitude", ChannelRole::Latitude, 10.0),
                ChannelSpec::new("GPS Longitude", ChannelRole::Longitude, 10.0),
                ChannelSpec::new("Engine RPM", ChannelRole::EngineRpm, 100.0),
                ChannelSpec::new("Steering Angle", ChannelRole::SteeringAngle, 50.0),
            ],
            alignment: AlignmentConfig::default(),
            limits: LimitsConfig::default(),
            rate_check: RateCheckConfig::default(),
        }
    }

    fn session() -> SyntheticSession {
        SyntheticSession::new(LAPS.to_vec()).with_pre_roll(0.0)
    }

    fn memory_pipeline(
        config: SessionConfig,
        session: &SyntheticSession,
    ) -> Pipeline<MemorySessionStore> {
        let store = MemorySessionStore::from_synthetic(session, &config);
        Pipeline::new(config, Arc::new(store))
    }

    /// Synthetic channels under hand-edited timing tables
    fn store_with_tables(
        config: &SessionConfig,
        session: &SyntheticSession,
        tables: TimingTables,
    ) -> MemorySessionStore {
        config.channels.iter().fold(MemorySessionStore::new(tables), |store, channel| {
            store.with_channel(channel.table_name(), session.channel_values(channel))
        })
    }

    /// End-to-end test: SyntheticSession -> MemorySessionStore -> Pipeline
    ///
    /// Verifies the complete flow:
    /// 1. Timing tables resolve into three laps, the second is fastest
    /// 2. Every channel is windowed onto the fastest lap
    /// 3. All channels are aligned onto the 100 Hz speed axis
    /// 4. The aligned sequence is decimated by the default stride
    #[tokio::test]
    async fn test_e2e_memory_pipeline() {
        let output = memory_pipeline(session_config(), &session())
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();
        let analysis = &output.analysis;

        assert_eq!(analysis.lap.lap_index, 1);
        assert!((analysis.lap.start_time - 62.0).abs() < 1e-9);
        assert!(analysis.lap.valid);
        assert!(analysis.lap.sectors_consistent());
        assert_eq!(analysis.reference_samples, 6_000);
        assert_eq!(analysis.points.len(), 600);
        assert!(analysis.rate_warnings.is_empty());

        // Indices and times follow the reference axis at stride 10
        for (n, point) in analysis.points.iter().enumerate() {
            assert_eq!(point.index, n * 10);
            assert!((point.time - n as f64 * 0.1).abs() < 1e-9);
            assert_eq!(point.lap_index, 1);
            assert!(point.lat.is_some() && point.lon.is_some());
            assert!(point.throttle.is_some());
            assert!(point.engine_rpm.is_some());
        }

        // Distance is a staircase: non-decreasing within the lap
        assert!(analysis
            .points
            .windows(2)
            .all(|w| w[1].distance >= w[0].distance));

        let bests = analysis.sector_bests;
        assert!(bests.s1.is_some() && bests.s2.is_some() && bests.s3.is_some());
        assert_eq!(output.stats.slices_fetched, 8);
        assert_eq!(output.stats.metrics.total_analyses, 1);
    }

    /// The orchestrator produces exactly what the components produce when
    /// wired by hand
    #[tokio::test]
    async fn test_manual_wiring_matches_pipeline() {
        let config = session_config();
        let store = Arc::new(MemorySessionStore::from_synthetic(&session(), &config));

        let tables = store.timing_tables().await.unwrap();
        let laps = ResolvedLaps::resolve(&tables).unwrap();
        let lap = *laps.select(LapSelection::Index(2)).unwrap();

        let mapper = RateIndexMapper::new(config.rate_table()).unwrap();
        let ranges = mapper.map_window(lap.start_time, lap.end_time).unwrap();
        let slices =
            ingestion::fetch_lap_slices(Arc::clone(&store), &config.channels, &ranges, &config.limits)
                .await
                .unwrap();
        let aligned = ChannelAligner::new(&config.channels, config.alignment.missing_channels)
            .align(lap.lap_index, &slices)
            .unwrap();
        let points = Downsampler::new(config.stride()).apply(aligned);

        let output = Pipeline::new(config, store)
            .analyze(LapSelection::Index(2))
            .await
            .unwrap();
        assert_eq!(output.analysis.lap, lap);
        assert_eq!(output.analysis.points, points);
    }

    /// GPS recorded on only one axis: lat/lon are absent, other channels intact
    #[tokio::test]
    async fn test_missing_gps_is_null() {
        let session = session().with_empty(ChannelRole::Latitude);
        let output = memory_pipeline(session_config(), &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();

        assert!(!output.analysis.points.is_empty());
        for point in &output.analysis.points {
            assert_eq!(point.lat, None);
            assert_eq!(point.lon, None);
            assert!(point.brake.is_some());
        }

        let json = serde_json::to_value(&output.analysis).unwrap();
        assert!(json["points"][0]["lat"].is_null());
        assert!(json["points"][0]["lon"].is_null());
    }

    /// Empty optional channels are null by default and zero under the legacy policy
    #[tokio::test]
    async fn test_missing_channel_policy() {
        let session = session()
            .with_empty(ChannelRole::Throttle)
            .with_empty(ChannelRole::Longitude);

        let output = memory_pipeline(session_config(), &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();
        assert!(output.analysis.points.iter().all(|p| p.throttle.is_none()));

        let mut config = session_config();
        config.alignment.missing_channels = MissingChannelPolicy::Zero;
        let output = memory_pipeline(config, &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();
        assert!(output
            .analysis
            .points
            .iter()
            .all(|p| p.throttle == Some(0.0) && p.lon.is_none()));
    }

    #[tokio::test]
    async fn test_empty_speed_channel() {
        let session = session().with_empty(ChannelRole::Speed);
        let err = memory_pipeline(session_config(), &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        match err {
            ContractError::EmptyChannel { channel } => assert_eq!(channel, "Ground Speed"),
            other => panic!("expected EmptyChannel, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_sample_ceiling() {
        let mut config = session_config();
        config.limits.max_samples_per_channel = 4_000;
        let err = memory_pipeline(config, &session())
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        match err {
            ContractError::ResourceLimit {
                resource,
                requested,
                limit,
            } => {
                assert!(resource.contains("Engine RPM"), "got: {resource}");
                assert_eq!(requested, 6_000);
                assert_eq!(limit, 4_000);
            }
            other => panic!("expected ResourceLimit, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let mut config = session_config();
        config.limits.timeout_s = 0.05;
        let store = MemorySessionStore::from_synthetic(&session(), &config)
            .with_latency(Duration::from_millis(200));

        let err = Pipeline::new(config, Arc::new(store))
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ContractError::Timeout { budget_ms: 50 }),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn test_invalid_lap_is_addressable() {
        let session = SyntheticSession::new(vec![30.0, -1.0, 29.0]).with_pre_roll(0.0);
        let pipeline = memory_pipeline(session_config(), &session);

        let fastest = pipeline.analyze(LapSelection::Fastest).await.unwrap();
        assert_eq!(fastest.analysis.lap.lap_index, 2);

        let laps = pipeline.resolve_laps().await.unwrap();
        assert!(!laps.laps()[1].valid);

        // The out-lap ends before it starts; it still analyzes as one sample
        let out_lap = pipeline.analyze(LapSelection::Index(1)).await.unwrap();
        let analysis = &out_lap.analysis;
        assert_eq!(analysis.lap.lap_index, 1);
        assert!(!analysis.lap.valid);
        assert_eq!(analysis.lap.duration, -1.0);
        assert_eq!(analysis.reference_samples, 1);
        assert_eq!(analysis.points.len(), 1);
        assert_eq!(analysis.points[0].lap_index, 1);
        assert!(analysis.points[0].speed.is_finite());
    }

    /// A lap without sector splits is skipped for fastest, not fatal
    #[tokio::test]
    async fn test_unfinished_sectors_do_not_abort() {
        let config = session_config();
        let session = session();
        let mut tables = session.timing_tables();
        tables.sector1[1].cumulative = f64::NAN;
        tables.sector2[1].cumulative = f64::INFINITY;
        let store = store_with_tables(&config, &session, tables);
        let pipeline = Pipeline::new(config, Arc::new(store));

        // Lap 1 would be fastest; lap 2 is next
        let output = pipeline.analyze(LapSelection::Fastest).await.unwrap();
        assert_eq!(output.analysis.lap.lap_index, 2);
        assert!(output.analysis.lap.valid);

        let err = pipeline
            .analyze(LapSelection::Index(1))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ContractError::InvalidTimingRow { ref table, row: 1, .. } if table == "sector1"),
            "got: {err}"
        );
    }

    /// Mandatory readings are never passed through as null
    #[tokio::test]
    async fn test_non_finite_mandatory_reading() {
        let config = session_config();
        let session = session();

        // Lap 1 starts at 62s: speed sample 6500 is local 300
        let mut speed = session.channel_values(&config.channels[0]);
        speed[6_500] = f64::NAN;
        let store = MemorySessionStore::from_synthetic(&session, &config)
            .with_channel("Ground Speed", speed);
        let err = Pipeline::new(config.clone(), Arc::new(store))
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        match err {
            ContractError::InvalidSample { channel, index, value } => {
                assert_eq!(channel, "Ground Speed");
                assert_eq!(index, 300);
                assert!(value.is_nan());
            }
            other => panic!("expected InvalidSample, got {other}"),
        }

        let mut distance = session.channel_values(&config.channels[1]);
        distance[650] = f64::INFINITY;
        let store = MemorySessionStore::from_synthetic(&session, &config)
            .with_channel("Lap Distance", distance);
        let err = Pipeline::new(config, Arc::new(store))
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ContractError::InvalidSample { ref channel, index: 30, .. } if channel == "Lap Distance"),
            "got: {err}"
        );
    }

    /// An unrepresentable budget is a config error, never a panic
    #[tokio::test]
    async fn test_extreme_timeout() {
        let mut config = session_config();
        config.limits.timeout_s = 1e300;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(err.to_string().contains("limits.timeout_s"), "got: {err}");

        // Unvalidated configs saturate the budget instead
        let output = memory_pipeline(config, &session())
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();
        assert_eq!(output.analysis.lap.lap_index, 1);
    }

    /// The same session read back from SQLite analyzes identically
    #[tokio::test]
    async fn test_e2e_sqlite_matches_memory() {
        let config = session_config();
        let session = session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.sqlite");

        let written = SqliteSessionStore::create(&path, &config, &session).unwrap();
        drop(written);
        let store = SqliteSessionStore::open(&path, &config.store).unwrap();

        let from_sqlite = Pipeline::new(config.clone(), Arc::new(store))
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();
        let from_memory = memory_pipeline(config, &session)
            .analyze(LapSelection::Fastest)
            .await
            .unwrap();

        assert_eq!(from_sqlite.analysis, from_memory.analysis);
        assert_eq!(from_sqlite.stats.samples_fetched, from_memory.stats.samples_fetched);
    }

    #[tokio::test]
    async fn test_sqlite_missing_timing_table() {
        let mut config = session_config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.sqlite");
        drop(SqliteSessionStore::create(&path, &config, &session()).unwrap());

        config.store.sector2_table = "no_such_table".to_string();
        let store = SqliteSessionStore::open(&path, &config.store).unwrap();
        let err = Pipeline::new(config, Arc::new(store))
            .analyze(LapSelection::Fastest)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ContractError::MissingTable { .. }),
            "got: {err}"
        );
    }
}
