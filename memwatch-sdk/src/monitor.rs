//! The monitor - composition root and lifecycle state machine.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use memwatch_types::{
    current_timestamp_ms, Alert, GcEvent, MemoryReport, MemorySample, MonitorOptions,
    MonitoringStatus, Report, ResourceReport,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::bus::{AlertBus, MonitorEvent};
use crate::config::{self, ConfigError};
use crate::gc::{GcCoordinator, GcHook};
use crate::history::SampleHistory;
use crate::leak::{self, LeakDetector};
use crate::registry::{ResourceHandle, ResourceKind, ResourceRegistry};
use crate::sampler::{MemoryReader, MemorySampler, SystemReader};
use crate::threshold::check_threshold;

#[derive(Default)]
struct MonitorState {
    is_active: bool,
    started_at: Option<Instant>,
    stop_tx: Option<watch::Sender<bool>>,
    last_gc: Option<Instant>,
    // Edge-trigger latches: an alert publishes on the transition into
    // excursion and re-arms once a tick observes the condition clear.
    threshold_excursion: bool,
    leak_excursion: bool,
}

/// Samples memory on a timer, tracks resources, detects leaks, raises
/// alerts, and coordinates opportunistic GC.
///
/// Usually accessed through the process-wide singleton
/// ([`crate::get_monitor`]); constructing one directly is useful for
/// tests and embedded setups.
///
/// # Example
///
/// ```rust,no_run
/// use memwatch_sdk::{Monitor, MonitorEvent};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let monitor = Arc::new(Monitor::builder().build().unwrap());
///     let mut events = monitor.subscribe();
///
///     monitor.start_monitoring();
///
///     while let Ok(event) = events.recv().await {
///         if let MonitorEvent::Alert(alert) = event {
///             eprintln!("memory alert: {alert:?}");
///         }
///     }
/// }
/// ```
pub struct Monitor {
    options: MonitorOptions,
    sampler: MemorySampler,
    history: Mutex<SampleHistory>,
    registry: ResourceRegistry,
    detector: LeakDetector,
    gc: GcCoordinator,
    bus: AlertBus,
    state: Mutex<MonitorState>,
}

impl Monitor {
    /// Construct with the given options, failing fast on invalid ones.
    pub fn new(options: MonitorOptions) -> Result<Self, ConfigError> {
        Self::builder().options(options).build()
    }

    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// A monitor with default options. Defaults always validate, so this
    /// cannot fail.
    pub(crate) fn with_defaults() -> Self {
        Self::from_parts(MonitorOptions::default(), Arc::new(SystemReader::new()), None)
    }

    fn from_parts(
        options: MonitorOptions,
        reader: Arc<dyn MemoryReader>,
        gc_hook: Option<GcHook>,
    ) -> Self {
        Self {
            options,
            sampler: MemorySampler::new(reader),
            history: Mutex::new(SampleHistory::new()),
            registry: ResourceRegistry::new(),
            detector: LeakDetector::default(),
            gc: GcCoordinator::new(gc_hook),
            bus: AlertBus::new(),
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_active
    }

    /// Subscribe to lifecycle events, collected samples, alerts, and GC
    /// completions.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.bus.subscribe()
    }

    /// Track an externally-owned resource.
    pub fn track_resource(&self, kind: ResourceKind, handle: ResourceHandle) {
        self.registry.track(kind, handle);
    }

    /// Untrack a resource; unknown ids are a no-op.
    pub fn untrack_resource(&self, kind: ResourceKind, id: &str) {
        self.registry.untrack(kind, id);
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Force-release everything still tracked. Returns how many handles
    /// released cleanly.
    pub fn cleanup_all_resources(&self) -> usize {
        self.registry.cleanup_all()
    }

    /// Take one memory sample, append it to history, and publish it.
    /// Never fails; a reader error degrades to a zeroed sample.
    pub fn collect_metrics(&self) -> MemorySample {
        let sample = self.sampler.collect(&self.registry);
        self.history.lock().push(sample.clone());
        self.bus.publish(MonitorEvent::MetricsCollected(sample.clone()));
        sample
    }

    /// Check the latest sample against the configured ceiling.
    /// Stateless per call; the loop applies edge-triggering on top.
    pub fn check_thresholds(&self) -> Option<Alert> {
        let latest = self.history.lock().latest().cloned()?;
        check_threshold(&latest, &self.options)
    }

    /// Evaluate the trailing window for sustained heap growth.
    pub fn detect_leaks(&self) -> Option<Alert> {
        let history = self.history.lock();
        self.detector.detect(&history)
    }

    /// Run one forced-collection pass, if a hook is configured, and
    /// publish the measured event.
    pub fn optimize(&self) -> Option<GcEvent> {
        let event = self.gc.optimize(self.sampler.reader().as_ref())?;
        self.bus.publish(MonitorEvent::GcCompleted(event));
        Some(event)
    }

    /// Start the monitoring loop. A no-op when already running - no
    /// state change, no duplicate `MonitoringStarted`.
    pub fn start_monitoring(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.is_active {
                return;
            }
            let (stop_tx, stop_rx) = watch::channel(false);
            state.is_active = true;
            state.started_at = Some(Instant::now());
            state.stop_tx = Some(stop_tx);

            let monitor = Arc::clone(self);
            let interval = Duration::from_millis(self.options.monitoring_interval_ms);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                let mut stop_rx = stop_rx;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            monitor.tick();
                        }
                        _ = stop_rx.changed() => {
                            if *stop_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("monitoring loop exited");
            });
        }
        debug!(interval_ms = self.options.monitoring_interval_ms, "monitoring started");
        self.bus.publish(MonitorEvent::MonitoringStarted {
            timestamp_ms: current_timestamp_ms(),
        });
    }

    /// Stop the monitoring loop. A no-op when already stopped. An
    /// in-flight tick completes but is not rescheduled.
    pub fn stop_monitoring(&self) {
        let stop_tx = {
            let mut state = self.state.lock();
            if !state.is_active {
                return;
            }
            state.is_active = false;
            state.stop_tx.take()
        };
        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        debug!("monitoring stopped");
        self.bus.publish(MonitorEvent::MonitoringStopped {
            timestamp_ms: current_timestamp_ms(),
        });
    }

    /// One pass of the monitoring pipeline: sample, threshold check,
    /// leak detection, opportunistic GC. Alerts are edge-triggered.
    fn tick(&self) {
        self.collect_metrics();
        let threshold_alert = self.check_thresholds();
        let leak_alert = self.detect_leaks();

        let (publish_threshold, publish_leak, run_gc) = {
            let mut state = self.state.lock();
            let publish_threshold = threshold_alert.is_some() && !state.threshold_excursion;
            state.threshold_excursion = threshold_alert.is_some();
            let publish_leak = leak_alert.is_some() && !state.leak_excursion;
            state.leak_excursion = leak_alert.is_some();

            let gc_due = self.gc.has_hook()
                && state
                    .last_gc
                    .map_or(true, |at| {
                        at.elapsed() >= Duration::from_millis(self.options.gc_interval_ms)
                    });
            if gc_due {
                state.last_gc = Some(Instant::now());
            }
            (publish_threshold, publish_leak, gc_due)
        };

        if publish_threshold {
            if let Some(alert) = threshold_alert {
                self.bus.publish(MonitorEvent::Alert(alert));
            }
        }
        if publish_leak {
            if let Some(alert) = leak_alert {
                self.bus.publish(MonitorEvent::Alert(alert));
            }
        }
        if run_gc {
            self.optimize();
        }
    }

    /// Assemble a synchronous aggregate view across all components.
    pub fn report(&self) -> Report {
        let (current, samples, trend) = {
            let history = self.history.lock();
            let trend = if history.len() >= self.detector.min_samples {
                Some(leak::trend(&history.window(self.detector.window)))
            } else {
                None
            };
            (history.latest().cloned(), history.len(), trend)
        };

        let monitoring = {
            let state = self.state.lock();
            MonitoringStatus {
                is_active: state.is_active,
                uptime_ms: state
                    .started_at
                    .map_or(0, |at| at.elapsed().as_millis() as u64),
                options: self.options,
            }
        };

        Report {
            timestamp_ms: current_timestamp_ms(),
            memory: MemoryReport {
                current,
                samples,
                trend,
            },
            resources: ResourceReport {
                counts: self.registry.counts(),
                tracked: self.registry.tracked(),
            },
            gc: self.gc.report(),
            monitoring,
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("options", &self.options)
            .field("is_active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`Monitor`].
pub struct MonitorBuilder {
    options: MonitorOptions,
    reader: Option<Arc<dyn MemoryReader>>,
    gc_hook: Option<GcHook>,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self {
            options: MonitorOptions::default(),
            reader: None,
            gc_hook: None,
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    /// Absolute heap usage ceiling, in bytes.
    pub fn memory_threshold(mut self, bytes: u64) -> Self {
        self.options.memory_threshold = bytes;
        self
    }

    /// Interval between monitoring ticks.
    pub fn monitoring_interval(mut self, interval: Duration) -> Self {
        self.options.monitoring_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Minimum time between opportunistic GC passes.
    pub fn gc_interval(mut self, interval: Duration) -> Self {
        self.options.gc_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Fraction of the memory threshold at which alerts fire.
    pub fn alert_threshold(mut self, ratio: f64) -> Self {
        self.options.alert_threshold = ratio;
        self
    }

    /// Substitute the memory figure source (allocator stats, test fake).
    pub fn reader(mut self, reader: Arc<dyn MemoryReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Provide the environment's forced-collection capability. Without
    /// one, `optimize` is a no-op.
    pub fn gc_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.gc_hook = Some(Arc::new(hook));
        self
    }

    /// Validate the options and build the monitor.
    pub fn build(self) -> Result<Monitor, ConfigError> {
        config::validate(&self.options)?;
        let reader = self
            .reader
            .unwrap_or_else(|| Arc::new(SystemReader::new()));
        Ok(Monitor::from_parts(self.options, reader, self.gc_hook))
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::testing::{reading, ScriptedReader};
    use memwatch_types::AlertKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast::error::TryRecvError;

    const MIB: u64 = 1024 * 1024;

    fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn count_leak_alerts(events: &[MonitorEvent]) -> usize {
        events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    MonitorEvent::Alert(Alert {
                        kind: AlertKind::MemoryLeakDetected { .. },
                        ..
                    })
                )
            })
            .count()
    }

    fn count_threshold_alerts(events: &[MonitorEvent]) -> usize {
        events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    MonitorEvent::Alert(Alert {
                        kind: AlertKind::MemoryThreshold { .. },
                        ..
                    })
                )
            })
            .count()
    }

    #[test]
    fn builder_rejects_invalid_options() {
        let result = Monitor::builder()
            .monitoring_interval(Duration::from_millis(0))
            .build();
        assert!(matches!(result, Err(ConfigError::ZeroMonitoringInterval)));

        let result = Monitor::builder().alert_threshold(2.0).build();
        assert!(matches!(result, Err(ConfigError::AlertThresholdOutOfRange(_))));
    }

    #[test]
    fn collect_metrics_appends_one_sample_per_call() {
        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::constant(reading(10 * MIB))))
            .build()
            .unwrap();

        for _ in 0..7 {
            monitor.collect_metrics();
        }
        let report = monitor.report();
        assert_eq!(report.memory.samples, 7);
        assert_eq!(report.memory.current.unwrap().heap_used, 10 * MIB);
    }

    #[test]
    fn report_is_complete_before_monitoring_ever_starts() {
        let monitor = Monitor::builder().build().unwrap();
        let report = monitor.report();

        assert!(report.memory.current.is_none());
        assert_eq!(report.memory.samples, 0);
        assert!(report.memory.trend.is_none());
        assert_eq!(report.resources.counts.total(), 0);
        assert_eq!(report.gc.events, 0);
        assert!(!report.monitoring.is_active);
        assert_eq!(report.monitoring.uptime_ms, 0);
        assert_eq!(report.monitoring.options, MonitorOptions::default());
    }

    #[test]
    fn report_serializes_expected_shape() {
        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::constant(reading(MIB))))
            .build()
            .unwrap();
        monitor.collect_metrics();
        monitor.track_resource(ResourceKind::Timer, ResourceHandle::new("t1"));

        let json = serde_json::to_value(monitor.report()).unwrap();
        assert!(json["timestamp_ms"].as_u64().is_some());
        assert!(json["memory"]["current"].is_object());
        assert_eq!(json["resources"]["counts"]["timers"], 1);
        assert!(json["resources"]["tracked"]["timers"].is_array());
        assert!(json["gc"].is_object());
        assert_eq!(json["monitoring"]["is_active"], false);
    }

    #[test]
    fn report_includes_trend_once_enough_samples_exist() {
        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::sequence(
                (0..12u64).map(|i| reading(100 * MIB + i * 2 * MIB)),
            )))
            .build()
            .unwrap();

        for _ in 0..12 {
            monitor.collect_metrics();
        }
        let trend = monitor.report().memory.trend.expect("trend expected");
        assert!(trend.slope > 0.0);
        assert!(trend.correlation > 0.9);
    }

    #[test]
    fn threshold_alert_is_edge_triggered_across_ticks() {
        // Over the effective threshold (850) for three ticks, under for
        // two, then over again.
        let readings = [900, 910, 920, 300, 310, 930].map(reading);
        let monitor = Monitor::builder()
            .memory_threshold(1000)
            .alert_threshold(0.85)
            .reader(Arc::new(ScriptedReader::sequence(readings)))
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        for _ in 0..6 {
            monitor.tick();
        }
        let events = drain(&mut rx);
        assert_eq!(count_threshold_alerts(&events), 2);
    }

    #[test]
    fn leak_alert_fires_once_per_sustained_excursion() {
        let growth_a = (0..15u64).map(|i| reading(100 * MIB + i * 2 * MIB));
        let flat = (0..15u64).map(|_| reading(128 * MIB));
        let growth_b = (0..15u64).map(|i| reading(128 * MIB + i * 2 * MIB));
        let script: Vec<_> = growth_a.chain(flat).chain(growth_b).collect();
        let ticks = script.len();

        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::sequence(script)))
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        for _ in 0..ticks {
            monitor.tick();
        }
        let events = drain(&mut rx);
        assert_eq!(count_leak_alerts(&events), 2);
    }

    #[test]
    fn oscillating_usage_never_raises_a_leak_alert() {
        let script: Vec<_> = (0..20u64)
            .map(|i| reading(if i % 2 == 0 { 100 * MIB } else { 104 * MIB }))
            .collect();
        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::sequence(script)))
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        for _ in 0..20 {
            monitor.tick();
        }
        assert_eq!(count_leak_alerts(&drain(&mut rx)), 0);
    }

    #[test]
    fn tick_runs_gc_at_most_once_per_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = calls.clone();
        let monitor = Monitor::builder()
            .gc_interval(Duration::from_secs(60))
            .reader(Arc::new(ScriptedReader::constant(reading(MIB))))
            .gc_hook(move || {
                hook_calls.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        monitor.tick();
        monitor.tick();
        monitor.tick();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.report().gc.events, 1);
    }

    #[test]
    fn optimize_publishes_gc_completed() {
        let monitor = Monitor::builder()
            .reader(Arc::new(ScriptedReader::sequence([
                reading(10 * MIB),
                reading(4 * MIB),
            ])))
            .gc_hook(|| {})
            .build()
            .unwrap();
        let mut rx = monitor.subscribe();

        let event = monitor.optimize().expect("hook configured");
        assert_eq!(event.memory_freed, 6 * MIB as i64);
        assert!(matches!(rx.try_recv().unwrap(), MonitorEvent::GcCompleted(_)));
    }

    #[test]
    fn cleanup_all_resources_zeroes_counts() {
        let monitor = Monitor::builder().build().unwrap();
        for i in 0..4 {
            monitor.track_resource(ResourceKind::Timer, ResourceHandle::new(format!("t{i}")));
        }
        for i in 0..3 {
            monitor.track_resource(ResourceKind::Interval, ResourceHandle::new(format!("i{i}")));
        }
        // One structurally invalid entry must not abort the rest.
        monitor.track_resource(
            ResourceKind::Timer,
            ResourceHandle::with_release("broken", || Err("double free".into())),
        );

        monitor.cleanup_all_resources();
        let counts = monitor.report().resources.counts;
        assert_eq!(counts.timers, 0);
        assert_eq!(counts.intervals, 0);
    }

    #[tokio::test]
    async fn start_twice_publishes_started_once() {
        let monitor = Arc::new(Monitor::builder().build().unwrap());
        let mut rx = monitor.subscribe();

        monitor.start_monitoring();
        monitor.start_monitoring();
        assert!(monitor.is_active());

        assert!(matches!(
            rx.try_recv().unwrap(),
            MonitorEvent::MonitoringStarted { .. }
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        monitor.stop_monitoring();
    }

    #[tokio::test]
    async fn stop_twice_publishes_stopped_once() {
        let monitor = Arc::new(Monitor::builder().build().unwrap());
        monitor.start_monitoring();

        let mut rx = monitor.subscribe();
        monitor.stop_monitoring();
        monitor.stop_monitoring();
        assert!(!monitor.is_active());

        assert!(matches!(
            rx.try_recv().unwrap(),
            MonitorEvent::MonitoringStopped { .. }
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let monitor = Arc::new(Monitor::builder().build().unwrap());
        let mut rx = monitor.subscribe();
        monitor.stop_monitoring();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_collects_samples_until_stopped() {
        let monitor = Arc::new(
            Monitor::builder()
                .monitoring_interval(Duration::from_millis(10))
                .reader(Arc::new(ScriptedReader::constant(reading(MIB))))
                .build()
                .unwrap(),
        );
        let mut rx = monitor.subscribe();

        monitor.start_monitoring();
        assert!(matches!(
            rx.recv().await.unwrap(),
            MonitorEvent::MonitoringStarted { .. }
        ));
        // Paused time auto-advances while we await, driving the ticker.
        assert!(matches!(
            rx.recv().await.unwrap(),
            MonitorEvent::MetricsCollected(_)
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            MonitorEvent::MetricsCollected(_)
        ));

        monitor.stop_monitoring();
        loop {
            match rx.recv().await.unwrap() {
                MonitorEvent::MonitoringStopped { .. } => break,
                MonitorEvent::MetricsCollected(_) => continue,
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(!monitor.is_active());
        assert!(monitor.report().memory.samples >= 2);
    }

    #[tokio::test]
    async fn uptime_is_reported_after_start() {
        let monitor = Arc::new(Monitor::builder().build().unwrap());
        assert_eq!(monitor.report().monitoring.uptime_ms, 0);

        monitor.start_monitoring();
        let report = monitor.report();
        assert!(report.monitoring.is_active);

        monitor.stop_monitoring();
    }
}
