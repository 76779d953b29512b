//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Settings file not found
    #[error("Settings file not found: {path}")]
    ConfigNotFound { path: String },

    /// Destructive command run without confirmation
    #[error("Refusing to {action} without --yes")]
    NotConfirmed { action: String },

    /// Device connection error
    #[error("Failed to connect to device at {address}: {message}")]
    DeviceConnection { address: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn not_confirmed(action: impl Into<String>) -> Self {
        Self::NotConfirmed {
            action: action.into(),
        }
    }

    pub fn device_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceConnection {
            address: address.into(),
            message: message.into(),
        }
    }
}
