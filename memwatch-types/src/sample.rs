//! Memory samples - point-in-time views of process memory state.

use crate::current_timestamp_ms;

/// Live counts of tracked ephemeral resources, by category.
///
/// `event_listeners` is the total number of listener entries across all
/// emitters, not the number of emitter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceCounts {
    /// One-shot timers currently outstanding.
    pub timers: usize,

    /// Repeating intervals currently outstanding.
    pub intervals: usize,

    /// Event listener registrations across all emitters.
    pub event_listeners: usize,

    /// Generic handles (sockets, file descriptors, watchers, ...).
    pub handles: usize,

    /// In-flight requests.
    pub requests: usize,
}

impl ResourceCounts {
    /// Total tracked resources across every category.
    pub fn total(&self) -> usize {
        self.timers + self.intervals + self.event_listeners + self.handles + self.requests
    }
}

/// A point-in-time sample of process memory figures and resource counts.
///
/// Samples are produced only by the SDK's sampler and are immutable once
/// created. All memory figures are in bytes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemorySample {
    /// Unix timestamp in milliseconds when this sample was taken.
    pub timestamp_ms: u64,

    /// Resident set size.
    pub rss: u64,

    /// Total heap allocated to the process.
    pub heap_total: u64,

    /// Heap currently in use.
    pub heap_used: u64,

    /// `heap_used / heap_total`, in `[0, 1]`. Zero when `heap_total` is 0.
    pub heap_utilization: f64,

    /// Live resource counts at sampling time.
    pub resource_counts: ResourceCounts,
}

impl MemorySample {
    /// Create a sample stamped with the current time.
    ///
    /// Heap utilization is derived from the figures; a zero `heap_total`
    /// yields 0.0 rather than NaN.
    pub fn new(rss: u64, heap_total: u64, heap_used: u64, resource_counts: ResourceCounts) -> Self {
        Self::with_timestamp(current_timestamp_ms(), rss, heap_total, heap_used, resource_counts)
    }

    /// Create a sample with a specific timestamp.
    pub fn with_timestamp(
        timestamp_ms: u64,
        rss: u64,
        heap_total: u64,
        heap_used: u64,
        resource_counts: ResourceCounts,
    ) -> Self {
        let heap_utilization = if heap_total == 0 {
            0.0
        } else {
            heap_used as f64 / heap_total as f64
        };
        Self {
            timestamp_ms,
            rss,
            heap_total,
            heap_used,
            heap_utilization,
            resource_counts,
        }
    }

    /// A sample with zeroed memory figures, used when the underlying
    /// reader fails and the pipeline must still emit something.
    pub fn zeroed(resource_counts: ResourceCounts) -> Self {
        Self::new(0, 0, 0, resource_counts)
    }
}
