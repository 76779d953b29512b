//! Replay transport - plays back a recorded JSONL capture
//!
//! Every line of the capture is delivered as if the device had sent it,
//! optionally paced by a fixed interval.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ConnectFailureKind, ContractError, DeviceRef, LinkCloser, Transport, TransportLink};
use tracing::debug;

const STOP_POLL: Duration = Duration::from_millis(20);

/// Capture-file transport
///
/// `DeviceRef::address` is the capture file path.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    interval: Duration,
}

impl ReplayTransport {
    /// Create a replay transport pausing `interval` before each line
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Transport for ReplayTransport {
    fn name(&self) -> &str {
        "replay"
    }

    fn open(&self, device: &DeviceRef) -> Result<TransportLink, ContractError> {
        let path = Path::new(&device.address);
        let file = File::open(path).map_err(|e| {
            ContractError::transport_open(
                "replay",
                device.address.clone(),
                ConnectFailureKind::from_io(&e),
                e.to_string(),
            )
        })?;
        debug!(path = %path.display(), interval = ?self.interval, "replay opened");

        let stopped = Arc::new(AtomicBool::new(false));
        let reader = PacedReader {
            inner: BufReader::new(file),
            interval: self.interval,
            stopped: stopped.clone(),
            line: Vec::new(),
            pos: 0,
        };

        Ok(TransportLink::new(
            Box::new(BufReader::new(reader)),
            Box::new(ReplayCloser { stopped }),
        ))
    }
}

/// Hands out one line per read, sleeping `interval` before each
struct PacedReader {
    inner: BufReader<File>,
    interval: Duration,
    stopped: Arc<AtomicBool>,
    line: Vec<u8>,
    pos: usize,
}

impl PacedReader {
    /// Returns false if stopped while waiting
    fn pace(&self) -> bool {
        let mut remaining = self.interval;
        while !remaining.is_zero() {
            if self.stopped.load(Ordering::Relaxed) {
                return false;
            }
            let step = remaining.min(STOP_POLL);
            std::thread::sleep(step);
            remaining -= step;
        }
        !self.stopped.load(Ordering::Relaxed)
    }
}

impl Read for PacedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos >= self.line.len() {
            if !self.pace() {
                return Ok(0);
            }
            self.line.clear();
            self.pos = 0;
            if self.inner.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(0);
            }
        }

        let n = (self.line.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.line[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct ReplayCloser {
    stopped: Arc<AtomicBool>,
}

impl LinkCloser for ReplayCloser {
    fn close(&self) -> std::io::Result<()> {
        self.stopped.store(true, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_replays_all_lines_then_eof() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"tmp\":1}}").unwrap();
        writeln!(file, "{{\"tmp\":2}}").unwrap();
        file.flush().unwrap();

        let transport = ReplayTransport::default();
        let device = DeviceRef::new(file.path().to_string_lossy());
        let mut link = transport.open(&device).unwrap();

        let lines: Vec<String> = (&mut link.reader).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["{\"tmp\":1}", "{\"tmp\":2}"]);
    }

    #[test]
    fn test_close_stops_paced_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "{{\"tmp\":{i}}}").unwrap();
        }
        file.flush().unwrap();

        let transport = ReplayTransport::new(Duration::from_secs(10));
        let device = DeviceRef::new(file.path().to_string_lossy());
        let mut link = transport.open(&device).unwrap();

        link.closer.close().unwrap();
        let mut line = String::new();
        assert_eq!(link.reader.read_line(&mut line).unwrap(), 0);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = ReplayTransport::default()
            .open(&DeviceRef::new("/definitely/not/here.jsonl"))
            .err()
            .unwrap();
        assert_eq!(
            err.connect_failure_kind(),
            Some(ConnectFailureKind::Transport)
        );
    }
}
