use std::collections::VecDeque;

use parking_lot::RwLock;

use super::{TimeRange, Timestamped};

/// Append-only, capacity-capped sample store.
///
/// Writers (append, trim) take the write lock; window filters take the read
/// lock, so a reader always sees a whole sequence, before or after a push.
pub struct SampleBuffer<T> {
    samples: RwLock<VecDeque<T>>,
    max_history: usize,
}

impl<T: Timestamped + Clone> SampleBuffer<T> {
    pub fn new(max_history: usize) -> Self {
        Self {
            samples: RwLock::new(VecDeque::with_capacity(max_history.min(1024) + 1)),
            max_history,
        }
    }

    /// Append one sample, then drop the oldest entries over capacity.
    pub fn push(&self, sample: T) {
        let mut samples = self.samples.write();
        samples.push_back(sample);
        Self::trim_locked(&mut samples, self.max_history);
    }

    /// Drop the oldest entries over capacity. Returns how many were dropped.
    pub fn trim(&self) -> usize {
        Self::trim_locked(&mut self.samples.write(), self.max_history)
    }

    /// Clones of every sample with a timestamp inside `range`, oldest first.
    pub fn in_range(&self, range: &TimeRange) -> Vec<T> {
        self.samples
            .read()
            .iter()
            .filter(|s| range.contains(s.timestamp()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    fn trim_locked(samples: &mut VecDeque<T>, max_history: usize) -> usize {
        let excess = samples.len().saturating_sub(max_history);
        if excess > 0 {
            samples.drain(..excess);
        }
        excess
    }
}

#[cfg(test)]
impl<T: Clone> SampleBuffer<T> {
    pub(crate) fn oldest(&self) -> Option<T> {
        self.samples.read().front().cloned()
    }

    pub(crate) fn newest(&self) -> Option<T> {
        self.samples.read().back().cloned()
    }
}
