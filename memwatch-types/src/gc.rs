//! Garbage collection events recorded by the GC coordinator.

/// A single forced-collection pass and its measured effect.
///
/// `memory_freed` may be negative when the process allocated during the
/// collection window; it is recorded as measured, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GcEvent {
    /// Unix timestamp in milliseconds when the pass started.
    pub timestamp_ms: u64,

    /// How long the collection call took, in microseconds.
    pub duration_us: u64,

    /// Heap in use before the pass, in bytes.
    pub memory_before: u64,

    /// Heap in use after the pass, in bytes.
    pub memory_after: u64,

    /// `memory_before - memory_after`, in bytes. Negative means growth.
    pub memory_freed: i64,
}

impl GcEvent {
    /// Build an event from before/after heap figures.
    pub fn new(timestamp_ms: u64, duration_us: u64, memory_before: u64, memory_after: u64) -> Self {
        Self {
            timestamp_ms,
            duration_us,
            memory_before,
            memory_after,
            memory_freed: memory_before as i64 - memory_after as i64,
        }
    }
}
