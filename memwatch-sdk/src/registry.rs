//! Resource registry - weak bookkeeping for externally-owned handles.
//!
//! Application code owns the actual resources (a route handler sets a
//! timer, a long poll opens a request); the registry only remembers that
//! they exist, plus an optional release action, so that on shutdown or a
//! suspected leak everything still outstanding can be force-released in
//! one call. Tracking is idempotent in both directions: double-track
//! keeps the original entry, untrack of an unknown id is a no-op.

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;

use memwatch_types::{ResourceCounts, TrackedResources};
use parking_lot::Mutex;
use tracing::warn;

/// Error returned by a handle's release action.
pub type ReleaseError = Box<dyn Error + Send + Sync>;

/// Release action invoked during `cleanup_all`.
pub type ReleaseFn = Box<dyn FnOnce() -> Result<(), ReleaseError> + Send>;

/// An opaque reference to an externally-owned ephemeral resource.
///
/// The id is whatever the owning code uses to identify the resource (a
/// timer id, a request marker). The release action, if any, is invoked
/// exactly once when the registry force-releases everything.
pub struct ResourceHandle {
    id: String,
    release: Option<ReleaseFn>,
}

impl ResourceHandle {
    /// A handle with no release action - pure bookkeeping.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            release: None,
        }
    }

    /// A handle whose resource can be force-released.
    pub fn with_release<F>(id: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() -> Result<(), ReleaseError> + Send + 'static,
    {
        Self {
            id: id.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Invoke the release action, if one exists.
    fn release(self) -> Result<(), ReleaseError> {
        match self.release {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

/// Which category a resource is tracked under.
///
/// Listeners carry their emitter and event name: one emitter may have
/// many listeners, and they are stored in registration order under the
/// emitter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Timer,
    Interval,
    Handle,
    Request,
    Listener { emitter: String, event: String },
}

struct ListenerEntry {
    event: String,
    handle: ResourceHandle,
}

#[derive(Default)]
struct Storage {
    timers: HashMap<String, ResourceHandle>,
    intervals: HashMap<String, ResourceHandle>,
    handles: HashMap<String, ResourceHandle>,
    requests: HashMap<String, ResourceHandle>,
    listeners: HashMap<String, Vec<ListenerEntry>>,
}

/// Per-category bookkeeping of tracked resource handles.
///
/// All mutations are single short critical sections; release actions run
/// outside the lock.
#[derive(Default)]
pub struct ResourceRegistry {
    storage: Mutex<Storage>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a resource. Idempotent: an already-tracked id keeps its
    /// original entry.
    pub fn track(&self, kind: ResourceKind, handle: ResourceHandle) {
        let mut storage = self.storage.lock();
        match kind {
            ResourceKind::Timer => {
                storage.timers.entry(handle.id.clone()).or_insert(handle);
            }
            ResourceKind::Interval => {
                storage.intervals.entry(handle.id.clone()).or_insert(handle);
            }
            ResourceKind::Handle => {
                storage.handles.entry(handle.id.clone()).or_insert(handle);
            }
            ResourceKind::Request => {
                storage.requests.entry(handle.id.clone()).or_insert(handle);
            }
            ResourceKind::Listener { emitter, event } => {
                let entries = storage.listeners.entry(emitter).or_default();
                if !entries.iter().any(|e| e.event == event && e.handle.id == handle.id) {
                    entries.push(ListenerEntry { event, handle });
                }
            }
        }
    }

    /// Untrack a resource. A never-tracked or already-removed id is a
    /// no-op, not an error. The handle is dropped without invoking its
    /// release action - untracking means the owner took care of it.
    pub fn untrack(&self, kind: ResourceKind, id: &str) {
        let mut storage = self.storage.lock();
        match kind {
            ResourceKind::Timer => {
                storage.timers.remove(id);
            }
            ResourceKind::Interval => {
                storage.intervals.remove(id);
            }
            ResourceKind::Handle => {
                storage.handles.remove(id);
            }
            ResourceKind::Request => {
                storage.requests.remove(id);
            }
            ResourceKind::Listener { emitter, event } => {
                if let Some(entries) = storage.listeners.get_mut(&emitter) {
                    entries.retain(|e| !(e.event == event && e.handle.id == id));
                    if entries.is_empty() {
                        storage.listeners.remove(&emitter);
                    }
                }
            }
        }
    }

    /// Live counts per category. `event_listeners` is the total number
    /// of listener entries across all emitters.
    pub fn counts(&self) -> ResourceCounts {
        let storage = self.storage.lock();
        ResourceCounts {
            timers: storage.timers.len(),
            intervals: storage.intervals.len(),
            event_listeners: storage.listeners.values().map(Vec::len).sum(),
            handles: storage.handles.len(),
            requests: storage.requests.len(),
        }
    }

    /// Tracked ids per category, sorted for stable report output.
    pub fn tracked(&self) -> TrackedResources {
        let storage = self.storage.lock();
        let sorted_ids = |map: &HashMap<String, ResourceHandle>| {
            let mut ids: Vec<String> = map.keys().cloned().collect();
            ids.sort();
            ids
        };
        let event_listeners: BTreeMap<String, Vec<(String, String)>> = storage
            .listeners
            .iter()
            .map(|(emitter, entries)| {
                let pairs = entries
                    .iter()
                    .map(|e| (e.event.clone(), e.handle.id.clone()))
                    .collect();
                (emitter.clone(), pairs)
            })
            .collect();
        TrackedResources {
            timers: sorted_ids(&storage.timers),
            intervals: sorted_ids(&storage.intervals),
            event_listeners,
            handles: sorted_ids(&storage.handles),
            requests: sorted_ids(&storage.requests),
        }
    }

    /// Force-release everything still tracked and clear all categories.
    ///
    /// Each release is attempted independently: a failing handle is
    /// logged and skipped, never aborting the rest. Returns the number
    /// of handles released without error.
    pub fn cleanup_all(&self) -> usize {
        let drained = {
            let mut storage = self.storage.lock();
            std::mem::take(&mut *storage)
        };

        let mut released = 0;
        let mut release_one = |category: &str, handle: ResourceHandle| {
            let id = handle.id.clone();
            match handle.release() {
                Ok(()) => released += 1,
                Err(err) => warn!(category, id = %id, %err, "resource release failed, skipping"),
            }
        };

        for handle in drained.timers.into_values() {
            release_one("timers", handle);
        }
        for handle in drained.intervals.into_values() {
            release_one("intervals", handle);
        }
        for handle in drained.handles.into_values() {
            release_one("handles", handle);
        }
        for handle in drained.requests.into_values() {
            release_one("requests", handle);
        }
        for (_, entries) in drained.listeners {
            for entry in entries {
                release_one("event_listeners", entry.handle);
            }
        }
        released
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("counts", &self.counts())
            .finish()
    }
}
