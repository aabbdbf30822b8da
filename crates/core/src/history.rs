//! Bounded per-sensor sample history.
//!
//! [`HistoryBuffer`] keeps the most recent samples in arrival order and
//! evicts from the front once full. Arrival order is authoritative: samples
//! are never reordered by timestamp or deduplicated.

use std::collections::vec_deque;
use std::collections::VecDeque;
use std::iter::Skip;

use crate::error::CoreError;

/// Number of samples retained per sensor.
pub const HISTORY_CAPACITY: usize = 50;

/// Number of trailing samples plotted by the chart panels.
pub const CHART_WINDOW: usize = 20;

/// FIFO-truncated history of samples, newest last.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    /// Create an empty buffer holding [`HISTORY_CAPACITY`] samples.
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(HISTORY_CAPACITY),
            capacity: HISTORY_CAPACITY,
        }
    }

    /// Create an empty buffer with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self, CoreError> {
        if capacity == 0 {
            return Err(CoreError::Validation(
                "history capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, returning the evicted oldest sample if the buffer
    /// was already full.
    pub fn push(&mut self, sample: T) -> Option<T> {
        self.items.push_back(sample);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// The most recent `n` samples, oldest first.
    ///
    /// The returned iterator borrows the buffer without mutating it and can
    /// be cloned to walk the same window again.
    pub fn slice_last(&self, n: usize) -> Skip<vec_deque::Iter<'_, T>> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    /// Most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Items from oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of items held, never above the capacity.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a HistoryBuffer<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
