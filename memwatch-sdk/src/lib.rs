//! # memwatch-sdk
//!
//! Process memory and resource lifecycle monitor: periodic sampling,
//! statistical leak detection, threshold alerting, weak bookkeeping of
//! ephemeral resource handles with forced release, and opportunistic GC
//! coordination.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memwatch_sdk::{initialize, shutdown, track_resource, MonitorEvent, ResourceHandle, ResourceKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Start the process-wide monitor with default options.
//!     let monitor = initialize(None).unwrap();
//!     let mut events = monitor.subscribe();
//!
//!     // Register ephemeral resources as application code creates them.
//!     track_resource(ResourceKind::Timer, ResourceHandle::new("session-sweep"));
//!
//!     // React to alerts elsewhere in the application.
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let MonitorEvent::Alert(alert) = event {
//!                 eprintln!("memory alert: {alert:?}");
//!             }
//!         }
//!     });
//!
//!     // ... application runs ...
//!
//!     // Stop, force-release everything still tracked, clear the slot.
//!     shutdown();
//! }
//! ```
//!
//! ## Features
//!
//! - **Always-succeeding pipeline**: sampling and checks never fail
//!   across the public boundary; read errors degrade to zeroed samples
//! - **Statistical leak detection**: OLS slope plus Pearson correlation
//!   over a trailing window, not a last-vs-first delta
//! - **Weak resource bookkeeping**: the registry audits and
//!   force-releases, it never owns
//! - **Typed events**: one broadcast channel of a tagged event enum
//! - **Pluggable readings**: substitute the memory figure source for
//!   allocator-accurate stats or deterministic tests

mod bus;
mod config;
mod gc;
mod global;
mod history;
mod leak;
mod monitor;
mod registry;
mod sampler;
mod threshold;

pub use bus::{AlertBus, MonitorEvent, BUS_CAPACITY};
pub use config::ConfigError;
pub use gc::{GcCoordinator, GcHook};
pub use global::{get_monitor, get_report, initialize, shutdown, track_resource, untrack_resource};
pub use history::{SampleHistory, HISTORY_CAPACITY};
pub use leak::{
    trend, LeakDetector, LEAK_WINDOW, MIN_CORRELATION, MIN_GROWTH_PER_SAMPLE, MIN_LEAK_SAMPLES,
};
pub use monitor::{Monitor, MonitorBuilder};
pub use registry::{ReleaseError, ReleaseFn, ResourceHandle, ResourceKind, ResourceRegistry};
pub use sampler::{MemoryReader, MemoryReading, MemorySampler, SystemReader};
pub use threshold::check_threshold;

// Re-export types for convenience
pub use memwatch_types::{
    Alert, AlertKind, GcEvent, GcReport, MemoryReport, MemorySample, MonitorOptions,
    MonitoringStatus, Report, ResourceCounts, ResourceReport, TrackedResources, Trend,
};
