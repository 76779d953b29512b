//! Realtime window errors

use thiserror::Error;

/// Realtime window error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Capacity outside the accepted range
    #[error("invalid capacity {requested}: must be between {min} and {max}")]
    InvalidCapacity {
        requested: usize,
        min: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
