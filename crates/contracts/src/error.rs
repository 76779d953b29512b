//! Layered error definitions
//!
//! Categorized by source: config / transport / storage / validation

use thiserror::Error;

use crate::ConnectFailureKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Opening the device link failed
    #[error("transport '{transport}' failed to open '{device}' ({kind}): {message}")]
    TransportOpen {
        transport: String,
        device: String,
        kind: ConnectFailureKind,
        message: String,
    },

    // ===== Storage Errors =====
    /// Persistent store read/write error
    #[error("store '{store}' error: {message}")]
    Store { store: String, message: String },

    /// Stored data uses an incompatible schema
    #[error("store '{store}' schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch {
        store: String,
        expected: u32,
        found: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport open error
    pub fn transport_open(
        transport: impl Into<String>,
        device: impl Into<String>,
        kind: ConnectFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportOpen {
            transport: transport.into(),
            device: device.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Failure kind when this error came from opening a transport
    pub fn connect_failure_kind(&self) -> Option<ConnectFailureKind> {
        match self {
            Self::TransportOpen { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = ContractError::config_validation("field_mapping.gas1", "key cannot be empty");
        assert_eq!(
            err.to_string(),
            "config validation error at 'field_mapping.gas1': key cannot be empty"
        );
    }

    #[test]
    fn test_connect_failure_kind() {
        let err = ContractError::transport_open(
            "tcp",
            "10.0.0.1:80",
            ConnectFailureKind::PermissionDenied,
            "denied",
        );
        assert_eq!(
            err.connect_failure_kind(),
            Some(ConnectFailureKind::PermissionDenied)
        );
        assert!(ContractError::Other("x".into())
            .connect_failure_kind()
            .is_none());
    }
}
