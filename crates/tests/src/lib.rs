//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Settings file round trips through the loader
//! - Device line stream -> live window + history -> session -> CSV
//! - Mapping changes and link failures during a running session

#[cfg(test)]
mod contract_tests {
    use config_loader::ConfigLoader;
    use contracts::{MonitorSettings, TransportKind};

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airscout.toml");

        let mut settings = MonitorSettings::default();
        settings.device.transport = TransportKind::Replay;
        settings.device.address = "capture.jsonl".into();
        ConfigLoader::update_chart_limit(&mut settings, 300).unwrap();
        ConfigLoader::save_to_path(&settings, &path).unwrap();

        let loaded = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_channel::Receiver;
    use archive::{
        CsvExporter, HistoryArchive, JsonSessionStore, JsonlHistoryStore, SessionManager,
    };
    use contracts::{
        CanonicalField, ConnectionEvent, ConnectionState, DeviceConfig, DeviceRef,
        DisconnectCause, FieldMapping, SensorReading, TransportKind,
    };
    use ingestion::{ChannelTransport, ConnectionManager, FieldMappingResolver};
    use realtime::{RealtimeBuffer, SharedRealtimeBuffer};

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    async fn recv<T>(rx: &Receiver<T>) -> T {
        tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for the pipeline")
            .expect("channel closed")
    }

    fn line(temperature: f64, battery: f64) -> String {
        format!(
            r#"{{"tmp":{temperature},"hum":45.5,"CO2":412,"VOC+CO":0.8,"Akku":{battery}}}"#
        )
    }

    fn manager(transport: ChannelTransport) -> ConnectionManager {
        let resolver = Arc::new(FieldMappingResolver::new(FieldMapping::default()));
        ConnectionManager::new(Box::new(transport), resolver)
    }

    /// End-to-end: device lines -> window + history -> session -> CSV
    ///
    /// Verifies the complete data flow:
    /// 1. ConnectionManager turns lines into readings (malformed lines dropped)
    /// 2. The live window keeps only the newest readings, history keeps all
    /// 3. Freezing the window stores a session that survives a reopen
    /// 4. The session and history exports carry the expected rows
    #[tokio::test]
    async fn test_e2e_line_stream_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let transport = ChannelTransport::new();
        let device = transport.push_link();
        let mut manager = manager(transport);
        let readings = manager.take_readings().unwrap();
        let events = manager.take_events().unwrap();

        let window = SharedRealtimeBuffer::new(RealtimeBuffer::new(10).unwrap());
        let history = HistoryArchive::spawn(JsonlHistoryStore::open(&data_dir).unwrap());
        let sessions = SessionManager::new(JsonSessionStore::open(&data_dir).unwrap());

        manager
            .connect(&DeviceRef::new("airscout-test").with_name("Bench"))
            .unwrap();
        assert!(recv(&events).await.is_connected());

        for i in 0..15 {
            device.send_line(line(20.0 + i as f64, 100.0 - i as f64));
            if i == 7 {
                device.send_line("{\"tmp\": broken");
                device.send_line("");
            }
        }

        let mut aggregator = observability::RunAggregator::new();
        for _ in 0..15 {
            let reading = recv(&readings).await;
            aggregator.update(&reading);
            window.push(reading);
            assert!(history.insert(reading));
        }

        device.hang_up();
        let event = recv(&events).await;
        aggregator.on_event(&event);
        assert_eq!(
            event,
            ConnectionEvent::Disconnected {
                cause: DisconnectCause::EndOfStream
            }
        );
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        let summary = aggregator.summary();
        assert_eq!(summary.total_readings, 15);
        assert_eq!(summary.link_losses, 1);

        let metrics = manager.metrics().snapshot();
        assert_eq!(metrics.readings_emitted, 15);
        assert_eq!(metrics.parse_errors, 1);
        assert_eq!(metrics.blank_lines, 1);

        // Window holds the newest 10, oldest first
        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot[0].temperature, 25.0);
        assert_eq!(snapshot[9].temperature, 34.0);

        // History holds everything
        assert_eq!(history.query_all().await.unwrap().len(), 15);
        let recent = history.query_recent(3).await.unwrap();
        assert_eq!(recent[0].temperature, 34.0);

        // Save session then clear the window
        let session = sessions.freeze("Bench Run", &snapshot).await.unwrap();
        window.clear();
        assert!(window.is_empty());
        assert_eq!(session.reading_count, 10);
        assert_eq!(session.start_time, snapshot[0].timestamp);
        assert_eq!(session.end_time, snapshot[9].timestamp);

        // Session survives a reopen of the store
        let reopened = SessionManager::new(JsonSessionStore::open(&data_dir).unwrap());
        let stored = reopened.get(session.id).await.unwrap();
        assert_eq!(stored.readings, snapshot);

        // Export
        let exporter = CsvExporter::new(dir.path().join("exports"));
        let path = reopened.export(session.id, &exporter).await.unwrap();
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("session_Bench_Run_"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Session: Bench Run\n"));
        assert!(content.contains("Data Points: 10\n"));
        assert!(content.contains(archive::CSV_HEADER));
        let rows: Vec<&str> = content
            .lines()
            .skip_while(|l| *l != archive::CSV_HEADER)
            .skip(1)
            .collect();
        assert_eq!(rows.len(), 10);
        assert!(rows[0].ends_with(",25,45.5,412,0.8,95"));

        history.shutdown().await;
    }

    /// A mapping change applies to the next line, never to readings already emitted
    #[tokio::test]
    async fn test_mapping_change_mid_session() {
        let transport = ChannelTransport::new();
        let device = transport.push_link();
        let mut manager = manager(transport);
        let readings = manager.take_readings().unwrap();

        manager.connect(&DeviceRef::new("airscout-test")).unwrap();

        device.send_line(r#"{"tmp":21.5,"temp_c":30.0}"#);
        let before = recv(&readings).await;
        assert_eq!(before.temperature, 21.5);

        let mut mapping = FieldMapping::default();
        mapping.set_key(CanonicalField::Temperature, "temp_c");
        manager.resolver().update(mapping).unwrap();

        device.send_line(r#"{"tmp":21.5,"temp_c":30.0}"#);
        let after = recv(&readings).await;
        assert_eq!(after.temperature, 30.0);
        assert_eq!(before.temperature, 21.5);

        // Rejected mapping leaves the active one in place
        let mut invalid = FieldMapping::default();
        invalid.set_key(CanonicalField::Humidity, " ");
        assert!(manager.resolver().update(invalid).is_err());
        device.send_line(r#"{"temp_c":18.0,"hum":50}"#);
        let reading = recv(&readings).await;
        assert_eq!(reading.temperature, 18.0);
        assert_eq!(reading.humidity, 50.0);

        manager.disconnect();
    }

    /// Connect failure, successful retry, link drop, and a clean disconnect
    #[tokio::test]
    async fn test_connection_lifecycle_events() {
        let transport = ChannelTransport::new();
        transport.push_failure(contracts::ConnectFailureKind::PermissionDenied);
        let device = transport.push_link();

        let mut manager = manager(transport);
        let readings = manager.take_readings().unwrap();
        let events = manager.take_events().unwrap();
        let target = DeviceRef::new("airscout-test");

        let err = manager.connect(&target).unwrap_err();
        assert_eq!(
            err.connect_failure_kind(),
            Some(contracts::ConnectFailureKind::PermissionDenied)
        );
        assert!(!recv(&events).await.is_connected());
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager.connect(&target).unwrap();
        assert!(recv(&events).await.is_connected());

        device.send_line(line(22.0, 80.0));
        assert_eq!(recv(&readings).await.battery, 80.0);

        device.fail("connection reset by peer");
        match recv(&events).await {
            ConnectionEvent::Disconnected {
                cause: DisconnectCause::ReadError(message),
            } => assert!(message.contains("connection reset")),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(manager.metrics().snapshot().read_errors, 1);

        // Already disconnected: no further events
        manager.disconnect();
        manager.disconnect();
        assert!(events.is_empty());
        assert!(readings.is_empty());
    }

    /// Resizing the live window while readings keep arriving
    #[tokio::test]
    async fn test_window_resize_keeps_newest() {
        let transport = ChannelTransport::new();
        let device = transport.push_link();
        let mut manager = manager(transport);
        let readings = manager.take_readings().unwrap();

        let window = SharedRealtimeBuffer::new(RealtimeBuffer::new(50).unwrap());
        manager.connect(&DeviceRef::new("airscout-test")).unwrap();

        for i in 0..30 {
            device.send_line(line(i as f64, 90.0));
        }
        for _ in 0..30 {
            window.push(recv(&readings).await);
        }

        window.set_capacity(10).unwrap();
        let temps: Vec<f64> = window.snapshot().iter().map(|r| r.temperature).collect();
        assert_eq!(temps, (20..30).map(f64::from).collect::<Vec<_>>());

        assert!(window.set_capacity(5).is_err());
        assert_eq!(window.capacity(), 10);

        manager.disconnect();
    }

    /// Replay transport selected through settings reads a capture file to the end
    #[tokio::test]
    async fn test_replay_capture_file() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.jsonl");
        let content = [line(19.0, 70.0), String::new(), line(19.5, 69.0), "garbage".into()]
            .join("\n");
        std::fs::write(&capture, content).unwrap();

        let config = DeviceConfig {
            transport: TransportKind::Replay,
            address: capture.display().to_string(),
            ..DeviceConfig::default()
        };
        let resolver = Arc::new(FieldMappingResolver::new(FieldMapping::default()));
        let mut manager =
            ConnectionManager::new(ingestion::transports::from_config(&config), resolver);
        let readings = manager.take_readings().unwrap();
        let events = manager.take_events().unwrap();

        manager.connect(&config.device_ref()).unwrap();
        assert!(recv(&events).await.is_connected());

        let first: SensorReading = recv(&readings).await;
        let second: SensorReading = recv(&readings).await;
        assert_eq!(first.temperature, 19.0);
        assert_eq!(second.temperature, 19.5);
        assert!(first.timestamp <= second.timestamp);

        assert_eq!(
            recv(&events).await,
            ConnectionEvent::Disconnected {
                cause: DisconnectCause::EndOfStream
            }
        );
        assert_eq!(manager.metrics().snapshot().parse_errors, 1);
    }
}
