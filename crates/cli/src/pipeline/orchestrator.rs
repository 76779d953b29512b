//! Pipeline orchestrator - coordinates all components.
//!
//! Connects the device, feeds every reading through the [`Monitor`] until a
//! stop condition fires, then disconnects and runs the end-of-run actions
//! (save session, export history).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use archive::{ArchiveError, HistoryStore, SessionStore};
use chrono::Utc;
use contracts::{ConnectionEvent, MonitorSettings, SensorReading, Transport};
use ingestion::{ConnectionManager, FieldMappingResolver};
use tracing::{debug, error, info, warn};

use super::{FileMonitor, Monitor, PipelineStats, SavedSession, StopReason};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated settings (CLI overrides already applied)
    pub settings: MonitorSettings,

    /// Maximum number of readings to ingest (None = unlimited)
    pub max_readings: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Save the window under this name when the run ends
    pub session_name: Option<String>,

    /// Export the full history when the run ends
    pub export_history: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    transport: Box<dyn Transport>,
}

impl Pipeline {
    /// Create a pipeline using the transport selected in settings
    pub fn new(config: PipelineConfig) -> Self {
        let transport = ingestion::transports::from_config(&config.settings.device);
        Self::with_transport(config, transport)
    }

    /// Create a pipeline over an explicit transport
    pub fn with_transport(config: PipelineConfig, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Run the pipeline to completion
    ///
    /// `shutdown` resolving stops ingestion the same way a timeout does.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let Pipeline { config, transport } = self;
        let settings = &config.settings;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut monitor = FileMonitor::open(settings)?;
        let resolver = Arc::new(FieldMappingResolver::new(settings.field_mapping.clone()));
        let mut manager = ConnectionManager::new(transport, resolver);
        let readings = manager
            .take_readings()
            .context("Reading stream already taken")?;
        let events = manager.take_events().context("Event stream already taken")?;

        // Connect
        let device = settings.device.device_ref();
        info!(
            address = %device.address,
            transport = manager.transport_name(),
            "Connecting to device..."
        );

        let (mut manager, connected) = tokio::task::spawn_blocking(move || {
            let result = manager.connect(&device);
            (manager, result)
        })
        .await
        .context("Connect task panicked")?;

        if let Err(e) = connected {
            while let Ok(event) = events.try_recv() {
                monitor.on_event(&event);
            }
            monitor.shutdown().await;
            return Err(CliError::device_connection(&settings.device.address, e.to_string()).into());
        }

        info!(max_readings = ?config.max_readings, "Pipeline running");

        // Ingest
        let mut stats = PipelineStats::default();
        let deadline = config.timeout.map(|t| tokio::time::Instant::now() + t);
        let timeout = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout);
        tokio::pin!(shutdown);

        stats.stop_reason = loop {
            tokio::select! {
                reading = readings.recv() => match reading {
                    Ok(reading) => {
                        if forward(&mut monitor, &mut stats, reading, config.max_readings) {
                            info!(readings = stats.readings_received, "Reached max readings limit");
                            break StopReason::MaxReadings;
                        }
                    }
                    Err(_) => break StopReason::StreamClosed,
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        info!(connected = event.is_connected(), event = ?event, "Connection state changed");
                        monitor.on_event(&event);
                        if let ConnectionEvent::Disconnected { cause } = event {
                            warn!(cause = ?cause, "Device link lost");
                            break StopReason::LinkLost(cause);
                        }
                    }
                    Err(_) => break StopReason::StreamClosed,
                },
                _ = &mut timeout => {
                    warn!(timeout_secs = config.timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    break StopReason::Timeout;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break StopReason::Shutdown;
                }
            }
        };

        // Disconnect
        info!("Disconnecting...");
        let manager = tokio::task::spawn_blocking(move || {
            manager.disconnect();
            manager
        })
        .await
        .context("Disconnect task panicked")?;
        stats.ingestion = manager.metrics().snapshot();
        drop(manager);

        // Readings published before the disconnect are still queued
        let queued = std::iter::from_fn(|| readings.try_recv().ok());
        drain_queued(&mut monitor, &mut stats, queued, config.max_readings);
        while let Ok(event) = events.try_recv() {
            monitor.on_event(&event);
        }
        info!(
            stop_reason = %stats.stop_reason,
            window = monitor.window().len(),
            "Ingestion stopped"
        );

        let finished = finish(&config, &mut monitor, &mut stats).await;

        stats.summary = monitor.summary();
        stats.archive = monitor.shutdown().await;
        stats.duration = start_time.elapsed();

        info!(
            readings = stats.readings_received,
            duration_secs = stats.duration.as_secs_f64(),
            readings_per_sec = format!("{:.2}", stats.readings_per_sec()),
            "Pipeline shutdown complete"
        );

        finished.map(|()| stats)
    }
}

/// Forward one reading, returns true once the reading limit is reached
fn forward<H, S>(
    monitor: &mut Monitor<H, S>,
    stats: &mut PipelineStats,
    reading: SensorReading,
    max_readings: Option<u64>,
) -> bool
where
    H: HistoryStore + Send + Sync + 'static,
    S: SessionStore,
{
    monitor.on_reading(reading);
    stats.readings_received += 1;
    max_readings.is_some_and(|max| stats.readings_received >= max)
}

/// Forward readings queued at stop time
///
/// Once the reading limit is reached the rest are archived only.
fn drain_queued<H, S>(
    monitor: &mut Monitor<H, S>,
    stats: &mut PipelineStats,
    queued: impl IntoIterator<Item = SensorReading>,
    max_readings: Option<u64>,
) where
    H: HistoryStore + Send + Sync + 'static,
    S: SessionStore,
{
    for reading in queued {
        if max_readings.is_some_and(|max| stats.readings_received >= max) {
            monitor.archive_only(reading);
            stats.readings_past_limit += 1;
        } else {
            forward(monitor, stats, reading, max_readings);
        }
    }
    if stats.readings_past_limit > 0 {
        debug!(count = stats.readings_past_limit, "archived readings past the limit");
    }
}

/// End-of-run actions: save the window as a session, export history
async fn finish<H, S>(
    config: &PipelineConfig,
    monitor: &mut Monitor<H, S>,
    stats: &mut PipelineStats,
) -> Result<()>
where
    H: HistoryStore + Send + Sync + 'static,
    S: SessionStore,
{
    if let Some(ref name) = config.session_name {
        match monitor.save_session(name).await {
            Ok(session) => {
                stats.saved_session = Some(SavedSession {
                    id: session.id,
                    name: session.name,
                    readings: session.reading_count,
                });
            }
            Err(ArchiveError::EmptyWindow) => {
                warn!("No readings in the live window, session not saved");
            }
            Err(e) => {
                error!(error = %e, "Failed to save session");
                return Err(e).context("Failed to save session");
            }
        }
    }

    if config.export_history {
        let path = monitor
            .export_history(Utc::now())
            .await
            .context("Failed to export history")?;
        info!(path = %path.display(), "History exported");
        stats.history_export = Some(path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConnectFailureKind, DisconnectCause};
    use ingestion::ChannelTransport;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> PipelineConfig {
        let mut settings = MonitorSettings::default();
        settings.storage.data_dir = dir.join("data");
        settings.storage.export_dir = dir.join("exports");
        settings.display.chart_data_limit = 10;
        PipelineConfig {
            settings,
            max_readings: None,
            timeout: Some(Duration::from_secs(10)),
            session_name: None,
            export_history: false,
            metrics_port: None,
        }
    }

    fn line(temperature: f64) -> String {
        format!(r#"{{"tmp":{temperature},"hum":40,"CO2":400,"VOC+CO":1.5,"Akku":90}}"#)
    }

    #[tokio::test]
    async fn test_run_until_device_hangs_up() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.session_name = Some("Kitchen".into());
        config.export_history = true;

        let transport = ChannelTransport::new();
        let device = transport.push_link();
        for i in 0..12 {
            device.send_line(line(20.0 + i as f64));
        }
        device.send_line("not json");
        device.hang_up();

        let stats = Pipeline::with_transport(config, Box::new(transport))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(
            stats.stop_reason,
            StopReason::LinkLost(DisconnectCause::EndOfStream)
        );
        assert_eq!(stats.readings_received, 12);
        assert_eq!(stats.ingestion.parse_errors, 1);
        assert_eq!(stats.archive.insert_count, 12);
        assert_eq!(stats.summary.link_losses, 1);

        let session = stats.saved_session.unwrap();
        assert_eq!(session.name, "Kitchen");
        assert_eq!(session.readings, 10);

        let export = stats.history_export.unwrap();
        let content = std::fs::read_to_string(export).unwrap();
        assert_eq!(content.lines().count(), 13);
    }

    #[tokio::test]
    async fn test_run_stops_at_max_readings() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.max_readings = Some(3);

        let transport = ChannelTransport::new();
        let device = transport.push_link();
        for i in 0..5 {
            device.send_line(line(i as f64));
        }

        let stats = Pipeline::with_transport(config, Box::new(transport))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::MaxReadings);
        assert_eq!(stats.readings_received, 3);
        assert!(device.is_closed());
    }

    #[tokio::test]
    async fn test_queued_readings_past_limit_are_archived() {
        use archive::{
            CsvExporter, HistoryArchive, MemoryHistoryStore, MemorySessionStore, SessionManager,
        };
        use chrono::TimeZone;
        use realtime::{RealtimeBuffer, SharedRealtimeBuffer};

        let dir = tempdir().unwrap();
        let mut monitor = Monitor::new(
            SharedRealtimeBuffer::new(RealtimeBuffer::new(10).unwrap()),
            HistoryArchive::spawn(MemoryHistoryStore::new()),
            SessionManager::new(MemorySessionStore::new()),
            CsvExporter::new(dir.path()),
        );
        let queued: Vec<SensorReading> = (0..5)
            .map(|i| {
                SensorReading::from_values(Utc.timestamp_millis_opt(i * 1000).unwrap(), [i as f64; 5])
            })
            .collect();

        let mut stats = PipelineStats {
            readings_received: 2,
            ..Default::default()
        };
        drain_queued(&mut monitor, &mut stats, queued, Some(3));

        assert_eq!(stats.readings_received, 3);
        assert_eq!(stats.readings_past_limit, 4);
        assert_eq!(monitor.window().len(), 1);
        assert_eq!(monitor.history().query_all().await.unwrap().len(), 5);

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let dir = tempdir().unwrap();
        let transport = ChannelTransport::new();
        let device = transport.push_link();
        device.send_line(line(21.0));

        let stats = Pipeline::with_transport(config(dir.path()), Box::new(transport))
            .run(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Shutdown);
        assert_eq!(stats.readings_received, 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let dir = tempdir().unwrap();
        let transport = ChannelTransport::new();
        transport.push_failure(ConnectFailureKind::Transport);

        let err = Pipeline::with_transport(config(dir.path()), Box::new(transport))
            .run(std::future::pending())
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<CliError>().is_some());
    }

    #[tokio::test]
    async fn test_empty_window_does_not_fail_run() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.session_name = Some(String::new());

        let transport = ChannelTransport::new();
        let device = transport.push_link();
        device.hang_up();

        let stats = Pipeline::with_transport(config, Box::new(transport))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.readings_received, 0);
        assert!(stats.saved_session.is_none());
    }
}
