//! Alerts raised by threshold checks and leak detection.

use crate::current_timestamp_ms;

/// A linear trend over a window of memory samples.
///
/// `slope` is bytes of heap growth per sample from an ordinary
/// least-squares fit; `correlation` is the Pearson coefficient of the
/// same series, in `[-1, 1]`. Degenerate inputs (too few samples, zero
/// variance) produce [`Trend::ZERO`] rather than NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trend {
    /// Heap growth in bytes per sample.
    pub slope: f64,

    /// How linearly consistent the growth is.
    pub correlation: f64,
}

impl Trend {
    /// The degenerate trend: no growth, no correlation.
    pub const ZERO: Trend = Trend {
        slope: 0.0,
        correlation: 0.0,
    };
}

/// What kind of condition an alert describes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum AlertKind {
    /// Heap usage met or exceeded the configured threshold.
    MemoryThreshold {
        /// Heap in use when the check fired, in bytes.
        heap_used: u64,
        /// The effective threshold (`memory_threshold * alert_threshold`).
        threshold: u64,
    },

    /// Sustained heap growth classified as a leak.
    MemoryLeakDetected {
        /// The fitted trend that triggered detection.
        trend: Trend,
        /// Number of samples in the evaluated window.
        window: usize,
    },
}

/// An alert published on the monitor's event bus.
///
/// Alerts are transient: they are published, never stored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alert {
    /// Unix timestamp in milliseconds when the alert was raised.
    pub timestamp_ms: u64,

    /// The condition being reported.
    pub kind: AlertKind,
}

impl Alert {
    /// Create an alert stamped with the current time.
    pub fn new(kind: AlertKind) -> Self {
        Self {
            timestamp_ms: current_timestamp_ms(),
            kind,
        }
    }

    /// Convenience constructor for a threshold alert.
    pub fn memory_threshold(heap_used: u64, threshold: u64) -> Self {
        Self::new(AlertKind::MemoryThreshold {
            heap_used,
            threshold,
        })
    }

    /// Convenience constructor for a leak alert.
    pub fn memory_leak(trend: Trend, window: usize) -> Self {
        Self::new(AlertKind::MemoryLeakDetected { trend, window })
    }
}
