//! GC coordination - opportunistic forced collection with measurement.

use std::sync::Arc;
use std::time::Instant;

use memwatch_types::{current_timestamp_ms, GcEvent, GcReport};
use parking_lot::Mutex;
use tracing::debug;

use crate::sampler::{MemoryReader, MemoryReading};

/// Environment-provided forced-collection capability.
///
/// Rust has no collector of its own; the hook is whatever the embedding
/// environment offers - an allocator purge, an embedded VM's collector,
/// a cache flush.
pub type GcHook = Arc<dyn Fn() + Send + Sync>;

/// Invokes the collection hook and records each pass's measured effect.
///
/// Without a hook, `optimize` is a safe no-op.
pub struct GcCoordinator {
    hook: Option<GcHook>,
    events: Mutex<Vec<GcEvent>>,
}

impl GcCoordinator {
    pub fn new(hook: Option<GcHook>) -> Self {
        Self {
            hook,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn has_hook(&self) -> bool {
        self.hook.is_some()
    }

    /// Run one collection pass, measuring heap before and after.
    ///
    /// Returns `None` (and does nothing) when no hook is configured.
    /// `memory_freed` may be negative if the process allocated during
    /// the pass; it is recorded as measured. Reader failures around the
    /// hook degrade to zeroed readings, same as the sampler.
    pub fn optimize(&self, reader: &dyn MemoryReader) -> Option<GcEvent> {
        let hook = self.hook.as_ref()?;

        let before = read_or_zero(reader);
        let timestamp_ms = current_timestamp_ms();
        let started = Instant::now();
        hook();
        let duration_us = started.elapsed().as_micros() as u64;
        let after = read_or_zero(reader);

        let event = GcEvent::new(timestamp_ms, duration_us, before.heap_used, after.heap_used);
        self.events.lock().push(event);
        debug!(
            freed = event.memory_freed,
            duration_us = event.duration_us,
            "forced collection completed"
        );
        Some(event)
    }

    /// All recorded passes, oldest first.
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.lock().clone()
    }

    /// Summary for report assembly.
    pub fn report(&self) -> GcReport {
        let events = self.events.lock();
        GcReport {
            events: events.len(),
            total_freed: events.iter().map(|e| e.memory_freed).sum(),
            last: events.last().copied(),
        }
    }
}

fn read_or_zero(reader: &dyn MemoryReader) -> MemoryReading {
    reader.read().unwrap_or_default()
}

impl std::fmt::Debug for GcCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcCoordinator")
            .field("has_hook", &self.has_hook())
            .field("events", &self.events.lock().len())
            .finish()
    }
}
