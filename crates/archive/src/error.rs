//! Archive error types

use std::path::PathBuf;

use contracts::SessionId;
use thiserror::Error;

/// Archive-specific errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Freeze called on an empty window
    #[error("nothing to save: the realtime window is empty")]
    EmptyWindow,

    /// No session with this id
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// CSV export failed
    #[error("export to '{}' failed: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// History worker is no longer running
    #[error("history archive worker stopped")]
    WorkerStopped,

    /// Store error (from contract)
    #[error("store error: {0}")]
    Store(#[from] contracts::ContractError),
}

impl ArchiveError {
    pub(crate) fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Export {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
