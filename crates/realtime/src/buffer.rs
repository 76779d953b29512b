//! Bounded FIFO window over incoming readings.
//!
//! Backed by a `HeapRb`. A full ring drops its oldest reading before the new
//! one is pushed, so `len() <= capacity()` holds after every operation.
//! Capacity changes rebuild the ring, keeping the most recent readings.

use std::fmt;

use contracts::{SensorReading, CHART_LIMIT_DEFAULT, CHART_LIMIT_MAX, CHART_LIMIT_MIN};
use ringbuf::{traits::*, HeapRb};
use tracing::debug;

use crate::error::{RealtimeError, Result};

/// Accepted capacity range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityBounds {
    pub min: usize,
    pub max: usize,
}

impl Default for CapacityBounds {
    fn default() -> Self {
        Self {
            min: CHART_LIMIT_MIN,
            max: CHART_LIMIT_MAX,
        }
    }
}

impl CapacityBounds {
    /// Check `capacity` against the bounds
    pub fn check(&self, capacity: usize) -> Result<()> {
        if capacity >= self.min.max(1) && capacity <= self.max {
            Ok(())
        } else {
            Err(RealtimeError::InvalidCapacity {
                requested: capacity,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Position in the push sequence, taken with a snapshot
///
/// Passing it back to [`RealtimeBuffer::clear_through`] removes exactly the
/// readings that were in that snapshot and are still in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WindowMark(u64);

/// Realtime reading window
pub struct RealtimeBuffer {
    ring: HeapRb<SensorReading>,
    bounds: CapacityBounds,
    /// Readings pushed since creation
    pushed: u64,
}

impl fmt::Debug for RealtimeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeBuffer")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity())
            .field("pushed", &self.pushed)
            .finish()
    }
}

impl Default for RealtimeBuffer {
    fn default() -> Self {
        Self {
            ring: HeapRb::new(CHART_LIMIT_DEFAULT),
            bounds: CapacityBounds::default(),
            pushed: 0,
        }
    }
}

impl RealtimeBuffer {
    /// Create a window with `capacity` in the default bounds
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_bounds(capacity, CapacityBounds::default())
    }

    /// Create a window with custom capacity bounds
    pub fn with_bounds(capacity: usize, bounds: CapacityBounds) -> Result<Self> {
        bounds.check(capacity)?;
        Ok(Self {
            ring: HeapRb::new(capacity),
            bounds,
            pushed: 0,
        })
    }

    /// Append a reading, evicting the oldest when full
    #[inline]
    pub fn push(&mut self, reading: SensorReading) {
        if self.ring.is_full() {
            let _ = self.ring.try_pop();
        }
        let _ = self.ring.try_push(reading);
        self.pushed += 1;
    }

    /// Readings in arrival order
    pub fn snapshot(&self) -> Vec<SensorReading> {
        self.ring.iter().copied().collect()
    }

    /// Snapshot plus the mark to clear it with later
    pub fn snapshot_marked(&self) -> (Vec<SensorReading>, WindowMark) {
        (self.snapshot(), WindowMark(self.pushed))
    }

    /// Drop the readings pushed before `mark`, keep everything newer
    ///
    /// Returns how many readings were removed.
    pub fn clear_through(&mut self, mark: WindowMark) -> usize {
        let len = self.len() as u64;
        let oldest = self.pushed - len;
        let count = mark.0.saturating_sub(oldest).min(len) as usize;
        for _ in 0..count {
            let _ = self.ring.try_pop();
        }
        count
    }

    /// Empty the window
    pub fn clear(&mut self) {
        let dropped = self.ring.pop_iter().count();
        debug!(dropped, "realtime window cleared");
    }

    /// Change the capacity
    ///
    /// Shrinking evicts from the front immediately. Growing keeps every
    /// reading. Out-of-range values are rejected and leave the window as is.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.bounds.check(capacity)?;
        if capacity == self.capacity() {
            return Ok(());
        }

        let mut kept: Vec<SensorReading> = self.ring.pop_iter().collect();
        let excess = kept.len().saturating_sub(capacity);
        kept.drain(..excess);

        let mut ring = HeapRb::new(capacity);
        for reading in kept {
            let _ = ring.try_push(reading);
        }
        self.ring = ring;

        debug!(capacity, evicted = excess, "realtime window resized");
        Ok(())
    }

    /// Number of readings in the window
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Current capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }
}
