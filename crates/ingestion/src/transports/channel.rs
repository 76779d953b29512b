//! In-memory channel transport
//!
//! Each queued link is either a scripted connect failure or a live device fed
//! through a [`ChannelDevice`]. Links are handed out in queue order, one per
//! `open` call.

use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::sync::{Mutex, PoisonError};

use async_channel::{unbounded, Receiver, Sender};
use contracts::{ConnectFailureKind, ContractError, DeviceRef, LinkCloser, Transport, TransportLink};

enum Feed {
    Line(String),
    Fail(String),
}

enum LinkPlan {
    Open(Receiver<Feed>),
    Fail(ConnectFailureKind),
}

/// Mock transport
#[derive(Default)]
pub struct ChannelTransport {
    plans: Mutex<VecDeque<LinkPlan>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a link that opens successfully; returns its feeding handle
    pub fn push_link(&self) -> ChannelDevice {
        let (tx, rx) = unbounded();
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(LinkPlan::Open(rx));
        ChannelDevice { tx }
    }

    /// Queue a connect failure
    pub fn push_failure(&self, kind: ConnectFailureKind) {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(LinkPlan::Fail(kind));
    }
}

impl Transport for ChannelTransport {
    fn name(&self) -> &str {
        "channel"
    }

    fn open(&self, device: &DeviceRef) -> Result<TransportLink, ContractError> {
        let plan = self
            .plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match plan {
            Some(LinkPlan::Open(rx)) => Ok(TransportLink::new(
                Box::new(BufReader::new(ChannelReader {
                    rx: rx.clone(),
                    pending: Vec::new(),
                    pos: 0,
                })),
                Box::new(ChannelCloser { rx }),
            )),
            Some(LinkPlan::Fail(kind)) => Err(ContractError::transport_open(
                "channel",
                device.address.clone(),
                kind,
                "scripted failure",
            )),
            None => Err(ContractError::transport_open(
                "channel",
                device.address.clone(),
                ConnectFailureKind::Transport,
                "no device available",
            )),
        }
    }
}

/// Device side of a channel link
#[derive(Clone)]
pub struct ChannelDevice {
    tx: Sender<Feed>,
}

impl ChannelDevice {
    /// Send one line (the newline is appended)
    pub fn send_line(&self, line: impl Into<String>) {
        let _ = self.tx.try_send(Feed::Line(line.into()));
    }

    /// Make the next read fail with an IO error
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.tx.try_send(Feed::Fail(message.into()));
    }

    /// Close the device side; the reader sees end-of-stream
    pub fn hang_up(&self) {
        self.tx.close();
    }

    /// Whether the link has been closed from either side
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct ChannelReader {
    rx: Receiver<Feed>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos >= self.pending.len() {
            match self.rx.recv_blocking() {
                Ok(Feed::Line(line)) => {
                    self.pending = line.into_bytes();
                    self.pending.push(b'\n');
                    self.pos = 0;
                }
                Ok(Feed::Fail(message)) => return Err(std::io::Error::other(message)),
                Err(_) => return Ok(0),
            }
        }

        let n = (self.pending.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct ChannelCloser {
    rx: Receiver<Feed>,
}

impl LinkCloser for ChannelCloser {
    fn close(&self) -> std::io::Result<()> {
        self.rx.close();
        Ok(())
    }
}
