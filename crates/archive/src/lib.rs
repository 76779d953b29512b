//! # Archive
//!
//! Durable reading history, sessions and CSV export.
//!
//! Responsibilities:
//! - Queue accepted readings into the history store without blocking ingestion
//! - Freeze the realtime window into named, immutable sessions
//! - Render history and sessions as CSV files

pub mod csv;
pub mod error;
pub mod history;
pub mod metrics;
pub mod session;
pub mod stores;

pub use contracts::{HistoryStore, Session, SessionId, SessionStore};
pub use csv::{CsvExporter, SessionHeader, CSV_HEADER};
pub use error::{ArchiveError, Result};
pub use history::HistoryArchive;
pub use metrics::{ArchiveMetrics, MetricsSnapshot};
pub use session::SessionManager;
pub use stores::{JsonSessionStore, JsonlHistoryStore, MemoryHistoryStore, MemorySessionStore};
