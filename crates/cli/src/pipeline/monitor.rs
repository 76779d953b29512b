//! Monitor - fans readings out to the live window and the history archive.
//!
//! Also owns the cross-component actions: saving the window as a session
//! (freeze then clear) and deleting all history (which clears the window too).

use std::path::PathBuf;

use anyhow::Context;
use archive::{
    CsvExporter, HistoryArchive, HistoryStore, JsonSessionStore, JsonlHistoryStore, Session,
    SessionManager, SessionStore,
};
use chrono::{DateTime, Utc};
use contracts::{ConnectionEvent, MonitorSettings, SensorReading};
use observability::{
    record_archive_backlog, record_connection_event, record_export, record_reading,
    record_window_depth, MetricsSummary, RunAggregator,
};
use realtime::{RealtimeBuffer, SharedRealtimeBuffer};
use tracing::{debug, info, warn};

/// Single consumer of the reading stream
pub struct Monitor<H, S> {
    window: SharedRealtimeBuffer,
    history: HistoryArchive<H>,
    sessions: SessionManager<S>,
    exporter: CsvExporter,
    aggregator: RunAggregator,
}

/// Monitor over the file-backed stores
pub type FileMonitor = Monitor<JsonlHistoryStore, JsonSessionStore>;

impl FileMonitor {
    /// Open the file-backed stores under `storage.data_dir`
    ///
    /// The live window starts empty with `display.chart_data_limit` capacity.
    pub fn open(settings: &MonitorSettings) -> anyhow::Result<Self> {
        let data_dir = &settings.storage.data_dir;
        debug!(data_dir = %data_dir.display(), "opening stores");

        let window = RealtimeBuffer::new(settings.display.chart_data_limit)
            .context("Invalid chart data limit")?;
        let history = JsonlHistoryStore::open(data_dir)
            .with_context(|| format!("Failed to open history in {}", data_dir.display()))?;
        let sessions = JsonSessionStore::open(data_dir)
            .with_context(|| format!("Failed to open sessions in {}", data_dir.display()))?;

        Ok(Self::new(
            SharedRealtimeBuffer::new(window),
            HistoryArchive::spawn(history),
            SessionManager::new(sessions),
            CsvExporter::new(settings.storage.export_dir.clone()),
        ))
    }

    /// Same as [`Monitor::open`] with exports sent to `export_dir`
    pub fn open_with_export_dir(
        settings: &MonitorSettings,
        export_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let mut monitor = Self::open(settings)?;
        if let Some(dir) = export_dir {
            monitor.exporter = CsvExporter::new(dir);
        }
        Ok(monitor)
    }
}

impl<H, S> Monitor<H, S>
where
    H: HistoryStore + Send + Sync + 'static,
    S: SessionStore,
{
    pub fn new(
        window: SharedRealtimeBuffer,
        history: HistoryArchive<H>,
        sessions: SessionManager<S>,
        exporter: CsvExporter,
    ) -> Self {
        Self {
            window,
            history,
            sessions,
            exporter,
            aggregator: RunAggregator::new(),
        }
    }

    /// Live window handle
    pub fn window(&self) -> &SharedRealtimeBuffer {
        &self.window
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    pub fn exporter(&self) -> &CsvExporter {
        &self.exporter
    }

    pub fn history(&self) -> &HistoryArchive<H> {
        &self.history
    }

    /// Forward one reading to the window and the archive
    pub fn on_reading(&mut self, reading: SensorReading) {
        record_reading(&reading);
        self.aggregator.update(&reading);

        self.window.push(reading);
        if !self.history.insert(reading) {
            warn!("history archive stopped, reading not archived");
        }

        record_window_depth(self.window.len(), self.window.capacity());
        record_archive_backlog(self.history.metrics().queue_len());
    }

    /// Archive a reading without showing it in the live window
    pub fn archive_only(&self, reading: SensorReading) {
        if !self.history.insert(reading) {
            warn!("history archive stopped, reading not archived");
        }
        record_archive_backlog(self.history.metrics().queue_len());
    }

    pub fn on_event(&mut self, event: &ConnectionEvent) {
        record_connection_event(event);
        self.aggregator.on_event(event);
    }

    /// Freeze the live window into a session, then clear the saved readings
    ///
    /// Readings that arrive while the session is written stay in the window.
    /// The window is left untouched when the save fails.
    pub async fn save_session(&mut self, name: &str) -> archive::Result<Session> {
        let (window, mark) = self.window.snapshot_marked();
        let session = self.sessions.freeze(name, &window).await?;
        let cleared = self.window.clear_through(mark);
        debug!(cleared, kept = self.window.len(), "saved readings removed from window");
        self.aggregator.on_session_saved();
        Ok(session)
    }

    /// Delete every archived reading and reset the live window
    pub async fn clear_history(&self) -> archive::Result<()> {
        self.history.delete_all().await?;
        self.window.clear();
        info!("history and live window cleared");
        Ok(())
    }

    /// Export the whole archive, newest first
    pub async fn export_history(&self, now: DateTime<Utc>) -> archive::Result<PathBuf> {
        let readings = self.history.query_all().await?;
        let result = self.exporter.export_history(&readings, now);
        record_export("history", result.is_ok());
        result
    }

    /// Run summary so far
    pub fn summary(&self) -> MetricsSummary {
        self.aggregator.summary()
    }

    /// Drain the archive queue and stop its worker
    pub async fn shutdown(self) -> archive::MetricsSnapshot {
        let metrics = self.history.metrics().clone();
        self.history.shutdown().await;
        metrics.snapshot()
    }
}
