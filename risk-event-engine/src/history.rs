//! Per-signal rolling history store
//!
//! Keeps a bounded ring of the most recent values for every tracked signal
//! name. The capacity is fixed at construction (derived from the loaded
//! event table) and the oldest value is discarded once it is exceeded.
//! Reading an unknown name yields empty results, never an error - callers
//! treat a short buffer as "insufficient data".

use std::collections::{HashMap, VecDeque};

/// Bounded per-signal-name history of past values
#[derive(Debug, Clone)]
pub struct SignalHistory {
    /// Ring buffer per signal name, oldest value first
    buffers: HashMap<String, VecDeque<f64>>,
    /// Maximum samples retained per signal
    capacity: usize,
}

impl SignalHistory {
    /// Create a new history store retaining `capacity` samples per signal
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Maximum samples retained per signal
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a value to a signal's buffer, trimming to capacity
    pub fn record(&mut self, name: &str, value: f64) {
        let buffer = self
            .buffers
            .entry(name.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        buffer.push_back(value);
        if buffer.len() > self.capacity {
            buffer.pop_front();
        }
    }

    /// Number of samples currently buffered for a signal (0 if unknown)
    pub fn len(&self, name: &str) -> usize {
        self.buffers.get(name).map_or(0, |b| b.len())
    }

    /// True if no signal has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// The most recent sample for a signal
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.buffers.get(name).and_then(|b| b.back().copied())
    }

    /// The sample `steps` positions back from the most recent (0 = latest)
    pub fn nth_back(&self, name: &str, steps: usize) -> Option<f64> {
        let buffer = self.buffers.get(name)?;
        buffer
            .len()
            .checked_sub(steps + 1)
            .and_then(|idx| buffer.get(idx).copied())
    }

    /// The last `count` samples in chronological order
    ///
    /// Returns `None` if the buffer holds fewer than `count` samples - the
    /// window has not warmed up yet.
    pub fn window(&self, name: &str, count: usize) -> Option<impl Iterator<Item = f64> + '_> {
        let buffer = self.buffers.get(name)?;
        if buffer.len() < count {
            return None;
        }
        Some(buffer.iter().skip(buffer.len() - count).copied())
    }
}
