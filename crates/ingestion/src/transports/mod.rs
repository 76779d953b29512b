//! Transport implementations
//!
//! - [`TcpTransport`]: newline-delimited stream from a TCP serial bridge
//! - [`ReplayTransport`]: recorded capture file, paced line by line
//! - [`ChannelTransport`]: in-memory device for tests and demos

mod channel;
mod replay;
mod tcp;

pub use channel::{ChannelDevice, ChannelTransport};
pub use replay::ReplayTransport;
pub use tcp::TcpTransport;

use contracts::{DeviceConfig, Transport, TransportKind};

/// Build the transport selected by device settings
pub fn from_config(config: &DeviceConfig) -> Box<dyn Transport> {
    match config.transport {
        TransportKind::Tcp => Box::new(TcpTransport::new(config.connect_timeout())),
        TransportKind::Replay => Box::new(ReplayTransport::new(config.replay_interval())),
    }
}
