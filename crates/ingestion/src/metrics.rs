//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Read-loop counters
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Lines read from the link (blank lines included)
    pub lines_read: AtomicU64,

    /// Readings emitted
    pub readings_emitted: AtomicU64,

    /// Malformed lines dropped
    pub parse_errors: AtomicU64,

    /// Blank lines skipped
    pub blank_lines: AtomicU64,

    /// Read errors that ended a session
    pub read_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reading(&self) {
        self.readings_emitted.fetch_add(1, Ordering::Relaxed);
        counter!("airscout_readings_parsed_total").increment(1);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        counter!("airscout_parse_errors_total").increment(1);
    }

    pub fn record_blank_line(&self) {
        self.blank_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        counter!("airscout_read_errors_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            readings_emitted: self.readings_emitted.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            blank_lines: self.blank_lines.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_read: u64,
    pub readings_emitted: u64,
    pub parse_errors: u64,
    pub blank_lines: u64,
    pub read_errors: u64,
}
