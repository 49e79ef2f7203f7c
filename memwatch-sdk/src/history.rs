//! Fixed-capacity sample history.

use std::collections::VecDeque;

use memwatch_types::MemorySample;

/// How many samples the ring keeps before evicting the oldest.
pub const HISTORY_CAPACITY: usize = 1000;

/// Ordered, oldest-first ring buffer of memory samples.
///
/// Appending past capacity evicts the oldest entry; no other mutation
/// exists.
#[derive(Debug, Clone, Default)]
pub struct SampleHistory {
    samples: VecDeque<MemorySample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: MemorySample) {
        self.samples.push_back(sample);
        if self.samples.len() > HISTORY_CAPACITY {
            self.samples.pop_front();
        }
    }

    /// The last `n` samples in order, or fewer if unavailable.
    pub fn window(&self, n: usize) -> Vec<MemorySample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// The most recent sample, if any.
    pub fn latest(&self) -> Option<&MemorySample> {
        self.samples.back()
    }

    /// The oldest sample, if any.
    pub fn oldest(&self) -> Option<&MemorySample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemorySample> {
        self.samples.iter()
    }
}
