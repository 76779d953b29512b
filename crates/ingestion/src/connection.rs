//! Connection Manager
//!
//! Owns the transport, drives the blocking read loop on a dedicated thread and
//! publishes readings and connection-state events on async channels.
//!
//! State machine: `Disconnected -> Connecting -> Connected -> Disconnected`.
//! Each connect starts a new generation. A read loop only publishes while its
//! generation is current, so a loop being torn down never leaks readings or
//! events into the next session.

use std::io::{BufRead, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use async_channel::{unbounded, Receiver, Sender};
use contracts::{
    ConnectFailureKind, ConnectionEvent, ConnectionState, DeviceRef, DisconnectCause, LinkCloser,
    SensorReading, Transport,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{IngestionError, Result};
use crate::mapping::FieldMappingResolver;
use crate::metrics::IngestionMetrics;
use crate::parser::LineParser;

/// Connection Manager
///
/// Readings and events are delivered on unbounded channels, so the read loop
/// never blocks on a slow consumer and nothing is dropped.
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    parser: LineParser,
    shared: Arc<Shared>,
    metrics: Arc<IngestionMetrics>,

    readings_tx: Sender<SensorReading>,
    readings_rx: Option<Receiver<SensorReading>>,
    events_tx: Sender<ConnectionEvent>,
    events_rx: Option<Receiver<ConnectionEvent>>,

    worker: Option<ReadWorker>,
}

/// Running read loop
struct ReadWorker {
    closer: Box<dyn LinkCloser>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<SharedState>,
}

#[derive(Debug, Default)]
struct SharedState {
    state: ConnectionState,
    generation: u64,
    device: Option<DeviceRef>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SharedState {
    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        metrics::gauge!("airscout_connection_state").set(state.as_gauge());
    }
}

impl ConnectionManager {
    /// Create a manager over `transport`, resolving records through `resolver`
    pub fn new(transport: Box<dyn Transport>, resolver: Arc<FieldMappingResolver>) -> Self {
        let (readings_tx, readings_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();

        Self {
            transport,
            parser: LineParser::new(resolver),
            shared: Arc::new(Shared::default()),
            metrics: Arc::new(IngestionMetrics::new()),
            readings_tx,
            readings_rx: Some(readings_rx),
            events_tx,
            events_rx: Some(events_rx),
            worker: None,
        }
    }

    /// Open a session to `device`
    ///
    /// Any active session is disconnected first. On failure the manager is
    /// back in `Disconnected`, a `false` event has been published and the
    /// error carries the failure kind. Failures are never retried.
    #[instrument(
        name = "connection_connect",
        skip(self),
        fields(transport = %self.transport.name(), device = %device)
    )]
    pub fn connect(&mut self, device: &DeviceRef) -> Result<()> {
        self.disconnect();

        let generation = {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.set_state(ConnectionState::Connecting);
            state.device = Some(device.clone());
            state.generation
        };
        debug!(generation, "opening transport");

        let link = match self.transport.open(device) {
            Ok(link) => link,
            Err(source) => {
                let kind = source
                    .connect_failure_kind()
                    .unwrap_or(ConnectFailureKind::Unexpected);
                warn!(%kind, error = %source, "connect failed");
                self.fail_connect(kind);
                return Err(IngestionError::ConnectFailed {
                    device: device.address.clone(),
                    kind,
                    source,
                });
            }
        };

        {
            let mut state = self.shared.lock();
            state.set_state(ConnectionState::Connected);
            let _ = self.events_tx.try_send(ConnectionEvent::Connected {
                device: device.clone(),
            });
        }

        let ctx = ReadLoop {
            parser: self.parser.clone(),
            shared: self.shared.clone(),
            metrics: self.metrics.clone(),
            readings_tx: self.readings_tx.clone(),
            events_tx: self.events_tx.clone(),
            generation,
        };
        let reader = link.reader;
        let spawned = std::thread::Builder::new()
            .name("airscout-read-loop".to_string())
            .spawn(move || ctx.run(reader));

        match spawned {
            Ok(handle) => {
                self.worker = Some(ReadWorker {
                    closer: link.closer,
                    handle,
                });
                info!("connected");
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = link.closer.close() {
                    warn!(error = %close_err, "failed to close link");
                }
                self.fail_connect(ConnectFailureKind::Unexpected);
                Err(IngestionError::SpawnFailed(e))
            }
        }
    }

    /// Close the session
    ///
    /// Idempotent. A `false` event is published only when this call moves the
    /// manager out of a non-`Disconnected` state, so repeated calls publish at
    /// most one event. Close errors are logged, never raised.
    #[instrument(name = "connection_disconnect", skip(self))]
    pub fn disconnect(&mut self) {
        {
            let mut state = self.shared.lock();
            state.generation += 1;
            if state.state != ConnectionState::Disconnected {
                state.set_state(ConnectionState::Disconnected);
                let _ = self.events_tx.try_send(ConnectionEvent::Disconnected {
                    cause: DisconnectCause::Requested,
                });
                info!("disconnected");
            }
        }

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.closer.close() {
                warn!(error = %e, "error while closing link");
            }
            if worker.handle.join().is_err() {
                warn!("read loop panicked");
            }
            debug!("read loop joined");
        }
    }

    fn fail_connect(&self, kind: ConnectFailureKind) {
        let mut state = self.shared.lock();
        state.set_state(ConnectionState::Disconnected);
        let _ = self.events_tx.try_send(ConnectionEvent::Disconnected {
            cause: DisconnectCause::ConnectFailed(kind),
        });
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Device of the current or most recent session
    pub fn device(&self) -> Option<DeviceRef> {
        self.shared.lock().device.clone()
    }

    /// Reading stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_readings(&mut self) -> Option<Receiver<SensorReading>> {
        self.readings_rx.take()
    }

    /// Connection event receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_events(&mut self) -> Option<Receiver<ConnectionEvent>> {
        self.events_rx.take()
    }

    /// Resolver shared with the parser
    pub fn resolver(&self) -> &Arc<FieldMappingResolver> {
        self.parser.resolver()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Transport name
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State moved onto the read-loop thread
struct ReadLoop {
    parser: LineParser,
    shared: Arc<Shared>,
    metrics: Arc<IngestionMetrics>,
    readings_tx: Sender<SensorReading>,
    events_tx: Sender<ConnectionEvent>,
    generation: u64,
}

impl ReadLoop {
    fn run(self, mut reader: Box<dyn BufRead + Send>) {
        debug!(generation = self.generation, "read loop started");
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    if self.end_session(DisconnectCause::EndOfStream) {
                        info!("device closed the stream");
                    }
                    break;
                }
                Ok(_) => {
                    self.metrics.record_line();
                    let line = String::from_utf8_lossy(&buf);
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.end_session(DisconnectCause::ReadError(e.to_string())) {
                        warn!(error = %e, "read failed, connection lost");
                    }
                    break;
                }
            }
        }

        debug!(generation = self.generation, "read loop exited");
    }

    /// Returns false once the session is no longer current
    fn handle_line(&self, line: &str) -> bool {
        match self.parser.parse(line) {
            Ok(reading) => self.publish(reading),
            Err(e) if e.is_blank() => {
                self.metrics.record_blank_line();
                trace!("blank line skipped");
                true
            }
            Err(e) => {
                self.metrics.record_parse_error();
                warn!(error = %e, line = %line.trim_end(), "dropping malformed line");
                true
            }
        }
    }

    fn publish(&self, reading: SensorReading) -> bool {
        let state = self.shared.lock();
        if state.generation != self.generation {
            return false;
        }
        if self.readings_tx.is_closed() {
            trace!("reading receiver closed");
            return true;
        }
        // Counted before the send so a consumer never sees an uncounted reading
        self.metrics.record_reading();
        let _ = self.readings_tx.try_send(reading);
        true
    }

    /// Moves a still-current session to `Disconnected` and publishes `false`
    fn end_session(&self, cause: DisconnectCause) -> bool {
        let mut state = self.shared.lock();
        if state.generation != self.generation || state.state != ConnectionState::Connected {
            return false;
        }
        state.set_state(ConnectionState::Disconnected);
        if matches!(cause, DisconnectCause::ReadError(_)) {
            self.metrics.record_read_error();
        }
        let _ = self
            .events_tx
            .try_send(ConnectionEvent::Disconnected { cause });
        true
    }
}
