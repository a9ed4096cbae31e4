//! Rolling throughput estimation.
//!
//! Ticks only add to a running tally. Once per sampling interval the tally is
//! pushed into a fixed-capacity window and the average is recomputed, so bursty
//! tick patterns produce a stable ops/sec figure at the cost of up to one
//! interval of staleness.

use std::{collections::VecDeque, time::Duration};

/// Number of samples kept in the window.
pub const SAMPLE_CAPACITY: usize = 20;

/// How often the tally is flushed into the window.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// A fixed-capacity buffer of per-interval work counts.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
    tally: u64,
    average: f64,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(SAMPLE_CAPACITY)
    }
}

impl SampleWindow {
    /// Creates an empty window holding at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            tally: 0,
            average: 0.0,
        }
    }

    /// Adds `delta` units of work to the current interval's tally.
    pub fn record(&mut self, delta: u64) {
        self.tally = self.tally.saturating_add(delta);
    }

    /// Closes the current interval: pushes the tally as a sample, evicts the
    /// oldest sample on overflow and recomputes the average.
    #[allow(clippy::cast_precision_loss)]
    pub fn flush(&mut self) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(std::mem::take(&mut self.tally));

        let sum: f64 = self.samples.iter().map(|&s| s as f64).sum();
        let mean = sum / self.samples.len() as f64;
        // Truncated to one decimal place.
        let average = (mean * 10.0).floor() / 10.0;
        self.average = if average.is_finite() { average } else { 0.0 };
    }

    /// Drops the work recorded since the last flush without sampling it.
    pub fn discard_tally(&mut self) {
        self.tally = 0;
    }

    /// Smoothed operations per second, truncated to one decimal place.
    #[must_use]
    pub const fn average_ops_per_sec(&self) -> f64 {
        self.average
    }

    /// Work recorded since the last flush.
    #[must_use]
    pub const fn tally(&self) -> u64 {
        self.tally
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` before the first flush.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
