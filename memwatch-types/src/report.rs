//! Reports - synchronous aggregate views across all monitor components.

use std::collections::BTreeMap;

use crate::{GcEvent, MemorySample, MonitorOptions, ResourceCounts, Trend};

/// Memory section of a report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryReport {
    /// The most recent sample, if any have been collected.
    pub current: Option<MemorySample>,

    /// How many samples the history currently holds.
    pub samples: usize,

    /// Trend over the trailing detection window, when enough samples
    /// exist to compute one.
    pub trend: Option<Trend>,
}

/// Ids of tracked resources, by category, for audit in reports.
///
/// `event_listeners` maps each emitter to its `(event, id)` pairs in
/// registration order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackedResources {
    pub timers: Vec<String>,
    pub intervals: Vec<String>,
    pub event_listeners: BTreeMap<String, Vec<(String, String)>>,
    pub handles: Vec<String>,
    pub requests: Vec<String>,
}

/// Resource section of a report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceReport {
    /// Live counts per category.
    pub counts: ResourceCounts,

    /// Tracked detail per category.
    pub tracked: TrackedResources,
}

/// GC section of a report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GcReport {
    /// How many collection passes have been recorded.
    pub events: usize,

    /// Net bytes freed across all recorded passes.
    pub total_freed: i64,

    /// The most recent pass, if any.
    pub last: Option<GcEvent>,
}

/// Monitoring lifecycle section of a report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitoringStatus {
    /// Whether the monitoring loop is currently running.
    pub is_active: bool,

    /// Milliseconds since monitoring first started; 0 if never started.
    pub uptime_ms: u64,

    /// The options this monitor was constructed with.
    pub options: MonitorOptions,
}

/// A point-in-time aggregate view of the whole monitor.
///
/// Assembled synchronously by the SDK; safe to serialize and hand to
/// diagnostics endpoints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    /// Unix timestamp in milliseconds when the report was assembled.
    pub timestamp_ms: u64,

    pub memory: MemoryReport,
    pub resources: ResourceReport,
    pub gc: GcReport,
    pub monitoring: MonitoringStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> Report {
        Report {
            timestamp_ms: crate::current_timestamp_ms(),
            memory: MemoryReport::default(),
            resources: ResourceReport::default(),
            gc: GcReport::default(),
            monitoring: MonitoringStatus {
                is_active: false,
                uptime_ms: 0,
                options: MonitorOptions::default(),
            },
        }
    }

    #[test]
    fn empty_report_has_no_current_sample() {
        let report = empty_report();
        assert!(report.memory.current.is_none());
        assert_eq!(report.memory.samples, 0);
        assert!(report.gc.last.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn report_serializes_all_sections() {
        let report = empty_report();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("memory").is_some());
        assert!(json.get("resources").is_some());
        assert!(json.get("gc").is_some());
        assert!(json.get("monitoring").is_some());
        assert_eq!(json["monitoring"]["is_active"], false);
        assert_eq!(json["monitoring"]["uptime_ms"], 0);
    }
}
