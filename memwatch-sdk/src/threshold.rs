//! Absolute memory threshold checks.

use memwatch_types::{Alert, MemorySample, MonitorOptions};

/// Compare a sample's heap usage against the configured ceiling.
///
/// Stateless and per-sample: the alert fires whenever `heap_used` meets
/// or exceeds `memory_threshold * alert_threshold`. Rate-limiting across
/// consecutive over-threshold samples is the monitor loop's concern.
pub fn check_threshold(sample: &MemorySample, options: &MonitorOptions) -> Option<Alert> {
    let threshold = options.effective_threshold();
    if sample.heap_used >= threshold {
        Some(Alert::memory_threshold(sample.heap_used, threshold))
    } else {
        None
    }
}
