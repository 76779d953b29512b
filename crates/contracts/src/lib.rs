//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the telemetry pipeline.
//! Business crates depend only on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Readings are stamped with wall-clock UTC time at ingestion (`chrono::DateTime<Utc>`)
//! - The device never supplies timestamps

mod connection;
mod error;
mod mapping;
mod reading;
mod session;
mod settings;
mod store;
mod transport;

pub use connection::*;
pub use error::*;
pub use mapping::*;
pub use reading::*;
pub use session::*;
pub use settings::*;
pub use store::{HistoryStore, LocalHistoryStore, LocalSessionStore, SessionStore};
pub use transport::{LinkCloser, Transport, TransportLink};
