//! # Realtime
//!
//! Bounded, most-recent-N window over incoming readings for live display.
//!
//! - [`RealtimeBuffer`]: single-owner ring buffer
//! - [`SharedRealtimeBuffer`]: lock-guarded handle shared between the
//!   reading fan-out and the session manager

mod buffer;
mod error;
mod shared;

pub use buffer::{CapacityBounds, RealtimeBuffer, WindowMark};
pub use error::{RealtimeError, Result};
pub use shared::SharedRealtimeBuffer;
