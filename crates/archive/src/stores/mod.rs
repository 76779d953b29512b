//! Store implementations
//!
//! - [`MemoryHistoryStore`], [`MemorySessionStore`]: in-process, for tests and dry runs
//! - [`JsonlHistoryStore`], [`JsonSessionStore`]: files under the data directory

mod file;
mod memory;

pub use file::{JsonSessionStore, JsonlHistoryStore, HISTORY_SCHEMA_VERSION, SESSION_SCHEMA_VERSION};
pub use memory::{MemoryHistoryStore, MemorySessionStore};

use contracts::SensorReading;

/// Newest first; equal timestamps keep reverse arrival order
pub(crate) fn newest_first(mut readings: Vec<SensorReading>) -> Vec<SensorReading> {
    readings.reverse();
    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    readings
}

/// Oldest first; equal timestamps keep arrival order
pub(crate) fn oldest_first(mut readings: Vec<SensorReading>) -> Vec<SensorReading> {
    readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    readings
}
