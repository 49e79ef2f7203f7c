//! Monitor configuration options.

/// Default absolute memory threshold: 1.5 GiB.
pub const DEFAULT_MEMORY_THRESHOLD: u64 = 1536 * 1024 * 1024;

/// Default interval between monitoring ticks: 30 seconds.
pub const DEFAULT_MONITORING_INTERVAL_MS: u64 = 30_000;

/// Default minimum time between forced-collection passes: 60 seconds.
pub const DEFAULT_GC_INTERVAL_MS: u64 = 60_000;

/// Default fraction of the memory threshold at which alerts fire.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.85;

/// Configuration for a monitor instance.
///
/// Immutable once a monitor is constructed from it; applying new options
/// requires shutting the monitor down and re-acquiring it. Validation
/// happens at monitor construction, not here; this is plain data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorOptions {
    /// Absolute heap usage ceiling, in bytes.
    pub memory_threshold: u64,

    /// Interval between monitoring ticks, in milliseconds.
    pub monitoring_interval_ms: u64,

    /// Minimum time between opportunistic GC passes, in milliseconds.
    pub gc_interval_ms: u64,

    /// Fraction of `memory_threshold` at which threshold alerts fire,
    /// in `(0, 1]`.
    pub alert_threshold: f64,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            monitoring_interval_ms: DEFAULT_MONITORING_INTERVAL_MS,
            gc_interval_ms: DEFAULT_GC_INTERVAL_MS,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl MonitorOptions {
    /// The effective heap usage, in bytes, at which threshold alerts fire.
    pub fn effective_threshold(&self) -> u64 {
        (self.memory_threshold as f64 * self.alert_threshold) as u64
    }
}
