//! Pipeline orchestration module.

mod monitor;
mod orchestrator;
mod stats;

pub use monitor::{FileMonitor, Monitor};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::{PipelineStats, SavedSession, StopReason};
