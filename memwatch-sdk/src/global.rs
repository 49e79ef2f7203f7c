//! Process-wide singleton surface.
//!
//! The rest of the application tracks resources from arbitrary call
//! sites, so they all need to see the same registry. The singleton is an
//! explicit slot with an explicit [`shutdown`] that clears it - instance
//! lifetime stays testable and resettable, and re-acquiring after
//! shutdown is the sanctioned way to apply new options.

use std::sync::Arc;

use memwatch_types::{MonitorOptions, Report};
use parking_lot::Mutex;

use crate::config::ConfigError;
use crate::monitor::Monitor;
use crate::registry::{ResourceHandle, ResourceKind};

static MONITOR: Mutex<Option<Arc<Monitor>>> = Mutex::new(None);

/// Get the process-wide monitor, constructing it on first access.
///
/// `options` are honored only when this call constructs the instance;
/// when one already exists they are ignored. `None` means defaults.
pub fn get_monitor(options: Option<MonitorOptions>) -> Result<Arc<Monitor>, ConfigError> {
    let mut slot = MONITOR.lock();
    if let Some(existing) = slot.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let monitor = Arc::new(Monitor::new(options.unwrap_or_default())?);
    *slot = Some(Arc::clone(&monitor));
    Ok(monitor)
}

/// Accessor plus immediate [`Monitor::start_monitoring`].
///
/// Must be called from within a tokio runtime, which the monitoring
/// loop is spawned onto.
pub fn initialize(options: Option<MonitorOptions>) -> Result<Arc<Monitor>, ConfigError> {
    let monitor = get_monitor(options)?;
    monitor.start_monitoring();
    Ok(monitor)
}

/// Stop monitoring, force-release every tracked resource, and clear the
/// singleton slot. The next accessor call builds fresh state.
pub fn shutdown() {
    let taken = MONITOR.lock().take();
    if let Some(monitor) = taken {
        monitor.stop_monitoring();
        monitor.cleanup_all_resources();
    }
}

/// The current singleton, constructed with defaults when absent.
/// Defaults always validate, so this cannot fail.
fn current() -> Arc<Monitor> {
    let mut slot = MONITOR.lock();
    if let Some(existing) = slot.as_ref() {
        return Arc::clone(existing);
    }
    let monitor = Arc::new(Monitor::with_defaults());
    *slot = Some(Arc::clone(&monitor));
    monitor
}

/// Track a resource on the process-wide registry.
pub fn track_resource(kind: ResourceKind, handle: ResourceHandle) {
    current().track_resource(kind, handle);
}

/// Untrack a resource on the process-wide registry; unknown ids are a
/// no-op.
pub fn untrack_resource(kind: ResourceKind, id: &str) {
    current().untrack_resource(kind, id);
}

/// Assemble a report from the process-wide monitor.
pub fn get_report() -> Report {
    current().report()
}
