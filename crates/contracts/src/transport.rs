//! Transport trait - device link abstraction
//!
//! Decouples the Connection Manager from the physical link. TCP bridges,
//! recorded capture files and in-memory test doubles all implement the same
//! interface.

use std::io::BufRead;

use crate::{ContractError, DeviceRef};

/// Factory for device links
///
/// Injected into the Connection Manager, which is the only component that
/// ever calls it.
pub trait Transport: Send + Sync {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Open a link to the device
    ///
    /// Blocks until the link is established or has failed.
    ///
    /// # Errors
    /// Returns [`ContractError::TransportOpen`] carrying the failure kind.
    fn open(&self, device: &DeviceRef) -> Result<TransportLink, ContractError>;
}

/// An open device link
///
/// The reader is moved onto the read-loop thread; the closer stays with the
/// Connection Manager so a blocked read can be interrupted from outside.
pub struct TransportLink {
    /// Blocking line source
    pub reader: Box<dyn BufRead + Send>,

    /// Handle that tears the link down
    pub closer: Box<dyn LinkCloser>,
}

impl TransportLink {
    /// Bundle a reader and its closer
    pub fn new(reader: Box<dyn BufRead + Send>, closer: Box<dyn LinkCloser>) -> Self {
        Self { reader, closer }
    }
}

/// Closes an open link
///
/// `close` must make any pending or future read on the paired reader return
/// (with end-of-stream or an error) within bounded time. Calling it more than
/// once is allowed.
pub trait LinkCloser: Send + Sync {
    /// Close the link
    fn close(&self) -> std::io::Result<()>;
}
