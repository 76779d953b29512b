//! Ingestion error types

use contracts::{ConnectFailureKind, ContractError};
use thiserror::Error;

/// Line parse error
///
/// Recoverable: the read loop logs the line and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line is not a flat key-value record
    #[error("malformed record: {message}")]
    MalformedRecord {
        /// Parser message
        message: String,
        /// Empty or whitespace-only line
        blank: bool,
    },
}

impl ParseError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
            blank: false,
        }
    }

    pub(crate) fn blank() -> Self {
        Self::MalformedRecord {
            message: "empty line".into(),
            blank: true,
        }
    }

    /// Blank lines are skipped without counting as failures
    pub fn is_blank(&self) -> bool {
        matches!(self, ParseError::MalformedRecord { blank: true, .. })
    }
}

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Opening the device link failed
    #[error("failed to connect to {device}: {source}")]
    ConnectFailed {
        /// Device address
        device: String,
        /// Failure classification
        kind: ConnectFailureKind,
        #[source]
        source: ContractError,
    },

    /// Field mapping update rejected
    #[error("invalid field mapping: {0}")]
    InvalidMapping(#[source] ContractError),

    /// Read-loop thread could not be started
    #[error("failed to spawn read loop: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

impl IngestionError {
    /// Failure kind for connect errors
    pub fn connect_failure_kind(&self) -> Option<ConnectFailureKind> {
        match self {
            IngestionError::ConnectFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
