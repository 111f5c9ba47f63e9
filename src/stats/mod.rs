//! Per-worker statistics
//!
//! Each worker owns one [`WorkerStats`] and is its only writer. The coordinator
//! reads it from another task while the worker is still running. The running
//! sum and the value count are packed into a single `AtomicU64` so that every
//! snapshot pairs a sum with the count it was produced from.
//!
//! # Arithmetic
//!
//! Values are signed 32-bit integers and the sum wraps on overflow, the same
//! as 32-bit two's-complement arithmetic on the wire. The count is unsigned.

pub mod aggregator;

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared sum/count cell for one worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// High 32 bits: sum (as two's-complement bits), low 32 bits: count
    packed: AtomicU64,
}

/// Point-in-time view of a worker's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Running sum of all values received
    pub sum: i32,
    /// Number of values received (sentinel excluded)
    pub count: u32,
}

impl StatsSnapshot {
    fn pack(self) -> u64 {
        ((self.sum as u32 as u64) << 32) | self.count as u64
    }

    fn unpack(bits: u64) -> Self {
        Self {
            sum: (bits >> 32) as u32 as i32,
            count: bits as u32,
        }
    }

    /// Snapshot after folding in one more value
    pub fn with_value(self, value: i32) -> Self {
        Self {
            sum: self.sum.wrapping_add(value),
            count: self.count.wrapping_add(1),
        }
    }
}

impl WorkerStats {
    /// Create zeroed statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received value
    ///
    /// Updates sum and count together in one atomic step.
    pub fn record(&self, value: i32) {
        let mut current = self.packed.load(Ordering::Acquire);
        loop {
            let next = StatsSnapshot::unpack(current).with_value(value).pack();
            match self.packed.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Consistent snapshot of sum and count
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot::unpack(self.packed.load(Ordering::Acquire))
    }

    /// Current running sum
    pub fn sum(&self) -> i32 {
        self.snapshot().sum
    }

    /// Current number of values received
    pub fn count(&self) -> u32 {
        self.snapshot().count
    }
}
