//! HistoryArchive - durable reading history behind an isolated worker
//!
//! Inserts are queued and written by a worker task in arrival order, so the
//! caller never waits on the store. Insert failures are logged and counted,
//! never surfaced. Queries flush the queue first and then read the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{HistoryStore, SensorReading};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::{ArchiveError, Result};
use crate::metrics::ArchiveMetrics;

enum ArchiveCommand {
    Insert(SensorReading),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running history worker
pub struct HistoryArchive<S> {
    /// Store name
    name: String,
    /// Channel to the worker
    tx: mpsc::UnboundedSender<ArchiveCommand>,
    /// Store, shared with the worker for queries
    store: Arc<S>,
    /// Shared metrics
    metrics: Arc<ArchiveMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl<S> HistoryArchive<S>
where
    S: HistoryStore + Send + Sync + 'static,
{
    /// Spawn the worker task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: S) -> Self {
        let name = store.name().to_string();
        let store = Arc::new(store);
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(ArchiveMetrics::new());

        let worker_handle = tokio::spawn(archive_worker(
            Arc::clone(&store),
            rx,
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            tx,
            store,
            metrics,
            worker_handle,
        }
    }

    /// Get store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ArchiveMetrics> {
        &self.metrics
    }

    /// Queue a reading for insertion (non-blocking)
    ///
    /// Returns false only when the worker has stopped.
    pub fn insert(&self, reading: SensorReading) -> bool {
        match self.tx.send(ArchiveCommand::Insert(reading)) {
            Ok(()) => true,
            Err(_) => {
                error!(store = %self.name, "archive worker closed unexpectedly");
                self.metrics.inc_failure_count();
                false
            }
        }
    }

    /// Wait until every queued reading has been handed to the store
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(ArchiveCommand::Flush(done_tx))
            .map_err(|_| ArchiveError::WorkerStopped)?;
        done_rx.await.map_err(|_| ArchiveError::WorkerStopped)
    }

    /// All readings, newest first
    pub async fn query_all(&self) -> Result<Vec<SensorReading>> {
        self.flush().await?;
        Ok(self.store.query_all().await?)
    }

    /// At most `limit` readings, newest first
    pub async fn query_recent(&self, limit: usize) -> Result<Vec<SensorReading>> {
        self.flush().await?;
        Ok(self.store.query_recent(limit).await?)
    }

    /// Readings in `[start, end]`, oldest first
    pub async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>> {
        self.flush().await?;
        Ok(self.store.query_range(start, end).await?)
    }

    /// Delete every stored reading
    ///
    /// Readings queued before this call are written and then deleted too.
    #[instrument(name = "history_delete_all", skip(self), fields(store = %self.name))]
    pub async fn delete_all(&self) -> Result<()> {
        self.flush().await?;
        self.store.delete_all().await?;
        debug!("history cleared");
        Ok(())
    }

    /// Drain the queue and stop the worker
    #[instrument(name = "history_archive_shutdown", skip(self), fields(store = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(store = %self.name, error = ?e, "worker task panicked");
        }
        debug!("history archive shutdown complete");
    }
}

/// Worker task that writes queued readings to the store
#[instrument(name = "history_worker_loop", skip(store, rx, metrics), fields(store = %name))]
async fn archive_worker<S: HistoryStore>(
    store: Arc<S>,
    mut rx: mpsc::UnboundedReceiver<ArchiveCommand>,
    metrics: Arc<ArchiveMetrics>,
    name: String,
) {
    debug!("history worker started");

    while let Some(command) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match command {
            ArchiveCommand::Insert(reading) => match store.insert(&reading).await {
                Ok(()) => metrics.inc_insert_count(),
                Err(e) => {
                    // Ingestion must not stall on a failing store
                    metrics.inc_failure_count();
                    error!(
                        timestamp = %reading.timestamp,
                        error = %e,
                        "history insert failed"
                    );
                }
            },
            ArchiveCommand::Flush(done) => {
                if done.send(()).is_err() {
                    warn!("flush requester went away");
                }
            }
        }
    }

    debug!("history worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryHistoryStore;
    use chrono::TimeZone;

    fn reading(ms: i64, temperature: f64) -> SensorReading {
        SensorReading::from_values(
            Utc.timestamp_millis_opt(ms).unwrap(),
            [temperature, 0.0, 0.0, 0.0, 0.0],
        )
    }

    #[tokio::test]
    async fn test_inserts_preserve_arrival_order() {
        let archive = HistoryArchive::spawn(MemoryHistoryStore::new());
        for i in 0..50 {
            assert!(archive.insert(reading(i * 1000, i as f64)));
        }

        let all = archive.query_all().await.unwrap();
        assert_eq!(all.len(), 50);
        assert_eq!(all[0].temperature, 49.0);
        assert_eq!(all[49].temperature, 0.0);
        assert_eq!(archive.metrics().insert_count(), 50);

        archive.shutdown().await;
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let store = MemoryHistoryStore::new();
        store.set_failing(true);
        let archive = HistoryArchive::spawn(store);

        for i in 0..3 {
            assert!(archive.insert(reading(i, 1.0)));
        }
        archive.flush().await.unwrap();

        assert_eq!(archive.metrics().failure_count(), 3);
        assert_eq!(archive.metrics().insert_count(), 0);
        archive.shutdown().await;
    }

    #[tokio::test]
    async fn test_recent_and_range() {
        let archive = HistoryArchive::spawn(MemoryHistoryStore::new());
        for i in 0..10 {
            archive.insert(reading(i * 1000, i as f64));
        }

        let recent = archive.query_recent(3).await.unwrap();
        let temps: Vec<f64> = recent.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![9.0, 8.0, 7.0]);

        let range = archive
            .query_range(
                Utc.timestamp_millis_opt(2000).unwrap(),
                Utc.timestamp_millis_opt(4000).unwrap(),
            )
            .await
            .unwrap();
        let temps: Vec<f64> = range.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![2.0, 3.0, 4.0]);

        archive.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_all_includes_queued() {
        let archive = HistoryArchive::spawn(MemoryHistoryStore::new());
        archive.insert(reading(1, 1.0));
        archive.insert(reading(2, 2.0));

        archive.delete_all().await.unwrap();
        assert!(archive.query_all().await.unwrap().is_empty());

        archive.insert(reading(3, 3.0));
        assert_eq!(archive.query_all().await.unwrap().len(), 1);
        archive.shutdown().await;
    }
}
