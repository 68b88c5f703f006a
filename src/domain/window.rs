//! Rolling Windows
//!
//! Fixed-capacity FIFO buffer of the last W values, backed by a
//! preallocated ring with a write cursor. Pushing is O(1) and never
//! reallocates once constructed.
//!
//! Used for both per-leg close windows and the spread series.

use serde::Serialize;

/// Fixed-capacity circular buffer of f64 samples
#[derive(Debug, Clone)]
pub struct RollingWindow {
    slots: Vec<f64>,
    /// Index the next push writes to
    cursor: usize,
    len: usize,
}

/// Rolling buffer of one leg's bar closes
pub type PriceWindow = RollingWindow;

/// Rolling buffer of spread values
pub type SpreadSeries = RollingWindow;

impl RollingWindow {
    /// Create an empty window holding at most `capacity` values.
    ///
    /// A zero capacity is bumped to one; configuration validation rejects it
    /// long before a window is built.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)],
            cursor: 0,
            len: 0,
        }
    }

    /// Append a value, evicting the oldest when at capacity
    pub fn push(&mut self, value: f64) {
        let capacity = self.slots.len();
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Most recently pushed value
    pub fn latest(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let capacity = self.slots.len();
        Some(self.slots[(self.cursor + capacity - 1) % capacity])
    }

    /// Values in push order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.slots.len();
        let start = (self.cursor + capacity - self.len) % capacity;
        (0..self.len).map(move |i| self.slots[(start + i) % capacity])
    }

    /// The last min(count, W) values, most recent last
    pub fn snapshot(&self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
        self.len = 0;
    }

    pub fn fill(&self) -> WindowFill {
        WindowFill {
            len: self.len,
            capacity: self.slots.len(),
        }
    }
}

/// Fill level of a window, reported in engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowFill {
    pub len: usize,
    pub capacity: usize,
}
