//! Sliding-window RSSI smoothing.

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// RssiWindow
// ---------------------------------------------------------------------------

/// Bounded FIFO of the most recent raw RSSI samples for one device.
///
/// The average is the arithmetic mean rounded to the nearest integer and
/// clamped into the min/max of the current contents, so a smoothed value can
/// never leave the range of real samples. Capacity 1 passes raw values
/// through unchanged.
#[derive(Debug, Clone)]
pub struct RssiWindow {
    samples: VecDeque<i32>,
    capacity: usize,
}

impl RssiWindow {
    /// Creates an empty window. Callers validate that `capacity >= 1`; the
    /// session builder rejects zero before a window is ever built.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest when full, and returns the new
    /// smoothed value.
    pub fn push(&mut self, rssi: i32) -> i32 {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(rssi);
        Self::clamped_mean(self.samples.iter().copied())
    }

    /// The smoothed value `push(rssi)` would return, without mutating the
    /// window. Used to apply admission filters before a sample is committed.
    #[must_use]
    pub fn preview(&self, rssi: i32) -> i32 {
        let evict = usize::from(self.samples.len() == self.capacity);
        let samples = self
            .samples
            .iter()
            .skip(evict)
            .copied()
            .chain(std::iter::once(rssi));
        Self::clamped_mean(samples)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents, oldest first.
    #[must_use]
    pub fn contents(&self) -> Vec<i32> {
        self.samples.iter().copied().collect()
    }

    fn clamped_mean(samples: impl Iterator<Item = i32>) -> i32 {
        let mut sum: i64 = 0;
        let mut count: i64 = 0;
        let mut lo = i32::MAX;
        let mut hi = i32::MIN;
        for sample in samples {
            sum += i64::from(sample);
            count += 1;
            lo = lo.min(sample);
            hi = hi.max(sample);
        }
        debug_assert!(count > 0, "mean of an empty window");
        let mean = (sum as f64 / count as f64).round() as i32;
        mean.clamp(lo, hi)
    }
}
