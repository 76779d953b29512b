//! Telemetry metrics recording
//!
//! Thin helpers over the `metrics` facade plus an in-memory aggregator used
//! for the end-of-run summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use contracts::{CanonicalField, ConnectionEvent, DisconnectCause, SensorReading};
use metrics::{counter, gauge, histogram};

/// Record the latest value of every canonical field
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_reading;
///
/// while let Ok(reading) = readings.recv().await {
///     record_reading(&reading);
///     // ...
/// }
/// ```
pub fn record_reading(reading: &SensorReading) {
    counter!("airscout_readings_forwarded_total").increment(1);
    for field in CanonicalField::ALL {
        gauge!("airscout_reading_value", "field" => field.name()).set(reading.value(field));
    }
}

/// Record a connection state transition
pub fn record_connection_event(event: &ConnectionEvent) {
    let (state, cause) = match event {
        ConnectionEvent::Connected { .. } => ("connected", "none"),
        ConnectionEvent::Disconnected { cause } => ("disconnected", cause_label(cause)),
    };
    counter!(
        "airscout_connection_events_total",
        "state" => state,
        "cause" => cause
    )
    .increment(1);
}

fn cause_label(cause: &DisconnectCause) -> &'static str {
    match cause {
        DisconnectCause::Requested => "requested",
        DisconnectCause::ConnectFailed(_) => "connect_failed",
        DisconnectCause::ReadError(_) => "read_error",
        DisconnectCause::EndOfStream => "end_of_stream",
    }
}

/// Record realtime window depth
pub fn record_window_depth(len: usize, capacity: usize) {
    gauge!("airscout_realtime_window_depth").set(len as f64);
    gauge!("airscout_realtime_window_capacity").set(capacity as f64);
}

/// Record the history worker backlog
pub fn record_archive_backlog(queue_len: usize) {
    histogram!("airscout_archive_backlog").record(queue_len as f64);
}

/// Record an export attempt
pub fn record_export(kind: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "airscout_export_attempts_total",
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// Run aggregator
///
/// Aggregates readings and connection events in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct RunAggregator {
    /// Readings seen
    pub total_readings: u64,

    /// Sessions saved during the run
    pub sessions_saved: u64,

    /// Link losses (read error or end of stream)
    pub link_losses: u64,

    /// First and last reading timestamps
    pub first_reading: Option<DateTime<Utc>>,
    pub last_reading: Option<DateTime<Utc>>,

    /// Per-field value statistics
    pub field_stats: BTreeMap<&'static str, RunningStats>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one reading
    pub fn update(&mut self, reading: &SensorReading) {
        self.total_readings += 1;
        self.first_reading.get_or_insert(reading.timestamp);
        self.last_reading = Some(reading.timestamp);

        for field in CanonicalField::ALL {
            self.field_stats
                .entry(field.name())
                .or_default()
                .push(reading.value(field));
        }
    }

    /// Update with one connection event
    pub fn on_event(&mut self, event: &ConnectionEvent) {
        if let ConnectionEvent::Disconnected {
            cause: DisconnectCause::ReadError(_) | DisconnectCause::EndOfStream,
        } = event
        {
            self.link_losses += 1;
        }
    }

    pub fn on_session_saved(&mut self) {
        self.sessions_saved += 1;
    }

    /// Build the summary
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_readings: self.total_readings,
            sessions_saved: self.sessions_saved,
            link_losses: self.link_losses,
            span_seconds: match (self.first_reading, self.last_reading) {
                (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
                _ => 0.0,
            },
            fields: self
                .field_stats
                .iter()
                .map(|(name, stats)| (*name, StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_readings: u64,
    pub sessions_saved: u64,
    pub link_losses: u64,
    pub span_seconds: f64,
    pub fields: Vec<(&'static str, StatsSummary)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Reading Summary ===")?;
        writeln!(f, "Readings: {}", self.total_readings)?;
        writeln!(f, "Time span: {:.1}s", self.span_seconds)?;
        writeln!(f, "Link losses: {}", self.link_losses)?;
        writeln!(f, "Sessions saved: {}", self.sessions_saved)?;
        for (name, stats) in &self.fields {
            writeln!(f, "  {name}: {stats}")?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
