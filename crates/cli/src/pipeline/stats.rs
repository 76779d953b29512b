//! Pipeline statistics and run summary.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use contracts::{DisconnectCause, SessionId};
use observability::MetricsSummary;

/// Why the ingest loop stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    /// `--max-readings` reached
    MaxReadings,
    /// `--timeout` elapsed
    Timeout,
    /// Ctrl+C or SIGTERM
    Shutdown,
    /// Device dropped the link
    LinkLost(DisconnectCause),
    /// Reading or event stream closed unexpectedly
    #[default]
    StreamClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxReadings => write!(f, "reading limit reached"),
            StopReason::Timeout => write!(f, "timeout"),
            StopReason::Shutdown => write!(f, "shutdown signal"),
            StopReason::LinkLost(DisconnectCause::EndOfStream) => {
                write!(f, "device closed the stream")
            }
            StopReason::LinkLost(DisconnectCause::ReadError(message)) => {
                write!(f, "read error: {message}")
            }
            StopReason::LinkLost(cause) => write!(f, "link lost: {cause:?}"),
            StopReason::StreamClosed => write!(f, "stream closed"),
        }
    }
}

/// Session saved at the end of a run
#[derive(Debug, Clone)]
pub struct SavedSession {
    pub id: SessionId,
    pub name: String,
    pub readings: usize,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Readings forwarded to the window and archive
    pub readings_received: u64,

    /// Readings queued past the reading limit, archived only
    pub readings_past_limit: u64,

    /// Why ingestion stopped
    pub stop_reason: StopReason,

    /// Line-level counters from the connection manager
    pub ingestion: ingestion::MetricsSnapshot,

    /// Archive worker counters
    pub archive: archive::MetricsSnapshot,

    /// Session saved when the run ended
    pub saved_session: Option<SavedSession>,

    /// History CSV written when the run ended
    pub history_export: Option<PathBuf>,

    /// Total duration of the run
    pub duration: Duration,

    /// Reading value statistics
    pub summary: MetricsSummary,
}

impl PipelineStats {
    /// Readings per second throughput
    pub fn readings_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.readings_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== AirScout Run Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Readings: {}", self.readings_received);
        println!("   └─ Readings/s: {:.2}", self.readings_per_sec());

        println!("\nIngestion");
        println!("   ├─ Lines read: {}", self.ingestion.lines_read);
        println!("   ├─ Parse drops: {}", self.ingestion.parse_errors);
        println!("   ├─ Blank lines: {}", self.ingestion.blank_lines);
        println!("   └─ Read errors: {}", self.ingestion.read_errors);

        println!("\nArchive");
        if self.readings_past_limit > 0 {
            println!("   ├─ Past limit (archived only): {}", self.readings_past_limit);
        }
        println!("   ├─ Inserted: {}", self.archive.insert_count);
        println!("   └─ Failed: {}", self.archive.failure_count);

        if let Some(ref session) = self.saved_session {
            println!(
                "\nSession saved: #{} \"{}\" ({} readings)",
                session.id, session.name, session.readings
            );
        }
        if let Some(ref path) = self.history_export {
            println!("History exported: {}", path.display());
        }

        println!("\n{}", self.summary);
    }
}
