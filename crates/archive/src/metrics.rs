//! Archive metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for the history worker
#[derive(Debug, Default)]
pub struct ArchiveMetrics {
    /// Readings waiting to be written
    queue_len: AtomicUsize,
    /// Total successful inserts
    insert_count: AtomicU64,
    /// Total insert failures (swallowed)
    failure_count: AtomicU64,
}

impl ArchiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn insert_count(&self) -> u64 {
        self.insert_count.load(Ordering::Relaxed)
    }

    pub fn inc_insert_count(&self) {
        self.insert_count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("airscout_archive_inserts_total").increment(1);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("airscout_archive_insert_failures_total").increment(1);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            insert_count: self.insert_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of archive metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub insert_count: u64,
    pub failure_count: u64,
}
