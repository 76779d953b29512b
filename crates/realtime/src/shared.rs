//! Shared realtime window
//!
//! One lock guards the ring, so `push`, `clear` and `set_capacity` never
//! interleave and a snapshot is always taken between two whole operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::SensorReading;
use metrics::gauge;

use crate::buffer::{RealtimeBuffer, WindowMark};
use crate::error::Result;

/// Cloneable handle to a [`RealtimeBuffer`]
#[derive(Debug, Clone, Default)]
pub struct SharedRealtimeBuffer {
    inner: Arc<Mutex<RealtimeBuffer>>,
}

impl SharedRealtimeBuffer {
    pub fn new(buffer: RealtimeBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RealtimeBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, reading: SensorReading) {
        let mut buffer = self.lock();
        buffer.push(reading);
        gauge!("airscout_realtime_window_len").set(buffer.len() as f64);
    }

    pub fn snapshot(&self) -> Vec<SensorReading> {
        self.lock().snapshot()
    }

    pub fn clear(&self) {
        self.lock().clear();
        gauge!("airscout_realtime_window_len").set(0.0);
    }

    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        let mut buffer = self.lock();
        buffer.set_capacity(capacity)?;
        gauge!("airscout_realtime_window_len").set(buffer.len() as f64);
        Ok(())
    }

    pub fn snapshot_marked(&self) -> (Vec<SensorReading>, WindowMark) {
        self.lock().snapshot_marked()
    }

    /// Remove the readings of an earlier snapshot under one lock
    ///
    /// Readings pushed after the snapshot stay in the window.
    pub fn clear_through(&self, mark: WindowMark) -> usize {
        let mut buffer = self.lock();
        let removed = buffer.clear_through(mark);
        gauge!("airscout_realtime_window_len").set(buffer.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}
