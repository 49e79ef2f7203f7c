//! Typed publish/subscribe channel for monitor events.

use memwatch_types::{Alert, GcEvent, MemorySample};
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const BUS_CAPACITY: usize = 64;

/// Everything the monitor publishes, as a tagged union.
///
/// Alerts carry their own kind inside [`Alert`]; the lifecycle and
/// metrics events are top-level variants.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    MonitoringStarted { timestamp_ms: u64 },
    MonitoringStopped { timestamp_ms: u64 },
    MetricsCollected(MemorySample),
    Alert(Alert),
    GcCompleted(GcEvent),
}

/// Broadcast channel the rest of the application subscribes to.
///
/// Publishing with no subscribers is fine - events are transient and
/// simply dropped.
#[derive(Debug)]
pub struct AlertBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl AlertBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memwatch_types::{MemorySample, ResourceCounts};

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = AlertBus::new();
        bus.publish(MonitorEvent::MonitoringStarted { timestamp_ms: 0 });
    }

    #[test]
    fn subscribers_each_receive_published_events() {
        let bus = AlertBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let sample = MemorySample::new(1, 2, 1, ResourceCounts::default());
        bus.publish(MonitorEvent::MetricsCollected(sample));

        assert!(matches!(rx1.try_recv().unwrap(), MonitorEvent::MetricsCollected(_)));
        assert!(matches!(rx2.try_recv().unwrap(), MonitorEvent::MetricsCollected(_)));
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let bus = AlertBus::new();
        bus.publish(MonitorEvent::MonitoringStarted { timestamp_ms: 1 });

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
