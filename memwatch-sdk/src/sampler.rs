//! Memory sampling - reading process memory figures into samples.

use std::io;
use std::sync::Arc;

use memwatch_types::MemorySample;
use parking_lot::Mutex;
use sysinfo::{Pid, System};
use tracing::warn;

use crate::registry::ResourceRegistry;

/// Raw memory figures from a [`MemoryReader`], in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryReading {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
}

/// Source of process memory figures.
///
/// The default [`SystemReader`] reads OS-level figures via `sysinfo`;
/// embedders with allocator-level statistics (jemalloc stats, a managed
/// runtime's heap) can supply their own reader for accurate heap
/// figures.
pub trait MemoryReader: Send + Sync {
    fn read(&self) -> io::Result<MemoryReading>;
}

/// OS-backed reader for the current process.
///
/// `rss` and `heap_used` are the resident set size; `heap_total` is the
/// process virtual size. These are best-effort proxies - the platform
/// exposes no portable allocator heap figures.
pub struct SystemReader {
    pid: Pid,
    system: Mutex<System>,
}

impl SystemReader {
    pub fn new() -> Self {
        Self {
            pid: Pid::from_u32(std::process::id()),
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReader for SystemReader {
    fn read(&self) -> io::Result<MemoryReading> {
        let mut system = self.system.lock();
        system.refresh_process(self.pid);
        let process = system.process(self.pid).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "own process not visible to sysinfo")
        })?;
        Ok(MemoryReading {
            rss: process.memory(),
            heap_total: process.virtual_memory(),
            heap_used: process.memory(),
        })
    }
}

/// Produces [`MemorySample`]s from a reader plus live resource counts.
pub struct MemorySampler {
    reader: Arc<dyn MemoryReader>,
}

impl MemorySampler {
    pub fn new(reader: Arc<dyn MemoryReader>) -> Self {
        Self { reader }
    }

    /// A sampler backed by the OS-level [`SystemReader`].
    pub fn system() -> Self {
        Self::new(Arc::new(SystemReader::new()))
    }

    pub(crate) fn reader(&self) -> &Arc<dyn MemoryReader> {
        &self.reader
    }

    /// Collect a sample. Never fails: a reader error degrades to a
    /// zeroed sample so the monitoring pipeline keeps flowing.
    pub fn collect(&self, registry: &ResourceRegistry) -> MemorySample {
        let counts = registry.counts();
        match self.reader.read() {
            Ok(reading) => {
                MemorySample::new(reading.rss, reading.heap_total, reading.heap_used, counts)
            }
            Err(err) => {
                warn!(%err, "memory read failed, emitting zeroed sample");
                MemorySample::zeroed(counts)
            }
        }
    }
}

impl std::fmt::Debug for MemorySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySampler").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn collect_carries_reading_and_counts() {
        let registry = ResourceRegistry::new();
        registry.track(
            crate::registry::ResourceKind::Timer,
            crate::registry::ResourceHandle::new("t1"),
        );

        let sampler = MemorySampler::new(Arc::new(ScriptedReader::constant(reading(1024))));
        let sample = sampler.collect(&registry);

        assert_eq!(sample.heap_used, 1024);
        assert_eq!(sample.heap_total, 2048);
        assert_eq!(sample.heap_utilization, 0.5);
        assert_eq!(sample.resource_counts.timers, 1);
    }

    #[test]
    fn collect_never_fails_on_reader_error() {
        let registry = ResourceRegistry::new();
        let sampler = MemorySampler::new(Arc::new(ScriptedReader::failing()));

        let sample = sampler.collect(&registry);
        assert_eq!(sample.rss, 0);
        assert_eq!(sample.heap_used, 0);
        assert_eq!(sample.heap_utilization, 0.0);
    }

    #[test]
    fn system_reader_reads_own_process() {
        let reader = SystemReader::new();
        let reading = reader.read().expect("own process should be readable");
        assert!(reading.rss > 0);
    }
}
