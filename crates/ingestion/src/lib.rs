//! # Ingestion
//!
//! Device link and line ingestion module.
//!
//! Responsibilities:
//! - Resolve raw device records through the active field mapping
//! - Parse newline-delimited JSON lines into `SensorReading`
//! - Own the transport and run the blocking read loop
//! - Publish readings and connection events via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ConnectionManager, FieldMappingResolver, TcpTransport};
//!
//! let resolver = Arc::new(FieldMappingResolver::default());
//! let mut manager = ConnectionManager::new(Box::new(TcpTransport::new(timeout)), resolver);
//! let readings = manager.take_readings().unwrap();
//!
//! manager.connect(&DeviceRef::new("192.168.4.1:8080"))?;
//! while let Ok(reading) = readings.recv().await {
//!     // Forward to realtime window and archive
//! }
//! ```

mod connection;
mod error;
mod mapping;
mod metrics;
mod parser;
pub mod transports;

// Re-exports
pub use connection::ConnectionManager;
pub use contracts::SensorReading;
pub use error::{IngestionError, ParseError, Result};
pub use mapping::{FieldMappingResolver, RawRecord};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use parser::LineParser;
pub use transports::{ChannelDevice, ChannelTransport, ReplayTransport, TcpTransport};
