//! Connection state and events - Connection Manager output

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a device the transport can open
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Transport-specific address (socket address, file path, channel name)
    pub address: String,

    /// Human readable name
    #[serde(default)]
    pub name: Option<String>,
}

impl DeviceRef {
    /// Create a device reference from an address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Connection state of a device session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Metric gauge value (0 / 1 / 2)
    pub fn as_gauge(self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Connected => 2.0,
        }
    }
}

/// Why a connection open failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailureKind {
    /// Transport level error (unreachable, refused, timed out)
    Transport,
    /// Host platform denied access to the device
    PermissionDenied,
    /// Anything else
    Unexpected,
}

impl ConnectFailureKind {
    /// Classify an IO error
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ConnectFailureKind::PermissionDenied,
            std::io::ErrorKind::Other => ConnectFailureKind::Unexpected,
            _ => ConnectFailureKind::Transport,
        }
    }
}

impl fmt::Display for ConnectFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectFailureKind::Transport => "transport error",
            ConnectFailureKind::PermissionDenied => "permission denied",
            ConnectFailureKind::Unexpected => "unexpected error",
        };
        f.write_str(s)
    }
}

/// Reason a session reached `Disconnected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Caller invoked `disconnect()` (directly or through `connect()`)
    Requested,
    /// Opening the transport failed
    ConnectFailed(ConnectFailureKind),
    /// The blocking read returned an error
    ReadError(String),
    /// The device closed the stream
    EndOfStream,
}

/// Connection state transition published by the Connection Manager
///
/// `Connected` corresponds to a `true` state event, `Disconnected` to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { device: DeviceRef },
    Disconnected { cause: DisconnectCause },
}

impl ConnectionEvent {
    /// Boolean view of the event
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionEvent::Connected { .. })
    }
}
