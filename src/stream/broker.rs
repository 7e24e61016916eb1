use std::sync::Arc;

use parking_lot::RwLock;

use crate::stream::preview::PreviewFrame;
use crate::stream::telemetry::Telemetry;

/// Preview subscriber callback.
pub type PreviewHandler = Arc<dyn Fn(&PreviewFrame) + Send + Sync>;
/// Telemetry subscriber callback.
pub type TelemetryHandler = Arc<dyn Fn(&Telemetry) + Send + Sync>;

/// Fan-out of preview frames and telemetry snapshots.
///
/// Subscriptions live for the broker's lifetime; there is no unsubscribe.
/// Emission is synchronous on the frame-processing path: each emit takes a
/// snapshot of the subscriber list, releases the lock, and invokes every
/// handler in turn. Handlers must not block significantly.
pub struct Broker {
    preview_handlers: RwLock<Vec<PreviewHandler>>,
    telemetry_handlers: RwLock<Vec<TelemetryHandler>>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            preview_handlers: RwLock::new(Vec::new()),
            telemetry_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Append a preview subscriber.
    pub fn subscribe_preview<F>(&self, handler: F)
    where
        F: Fn(&PreviewFrame) + Send + Sync + 'static,
    {
        self.preview_handlers.write().push(Arc::new(handler));
    }

    /// Append a telemetry subscriber.
    pub fn subscribe_telemetry<F>(&self, handler: F)
    where
        F: Fn(&Telemetry) + Send + Sync + 'static,
    {
        self.telemetry_handlers.write().push(Arc::new(handler));
    }

    /// Deliver a preview frame to every subscriber.
    pub fn emit_preview(&self, frame: &PreviewFrame) {
        let handlers: Vec<PreviewHandler> = self.preview_handlers.read().clone();
        for handler in handlers {
            handler(frame);
        }
    }

    /// Deliver a telemetry snapshot to every subscriber.
    pub fn emit_telemetry(&self, telemetry: &Telemetry) {
        let handlers: Vec<TelemetryHandler> = self.telemetry_handlers.read().clone();
        for handler in handlers {
            handler(telemetry);
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn telemetry() -> Telemetry {
        Telemetry {
            fps: 30.0,
            score: 0.9,
            lost: false,
            tracking: true,
            pos_x: 10,
            pos_y: 20,
        }
    }

    fn preview() -> PreviewFrame {
        PreviewFrame {
            data: "AA==".to_string(),
            width: 2,
            height: 2,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let broker = Broker::new();
        broker.emit_telemetry(&telemetry());
        broker.emit_preview(&preview());
    }

    #[test]
    fn every_telemetry_subscriber_receives_each_emission() {
        let broker = Broker::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            broker.subscribe_telemetry(move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            });
        }

        broker.emit_telemetry(&telemetry());
        broker.emit_telemetry(&telemetry());
        assert_eq!(count.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn preview_subscribers_receive_the_payload() {
        let broker = Broker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        broker.subscribe_preview(move |frame| sink.lock().push(frame.data.clone()));

        broker.emit_preview(&preview());
        assert_eq!(seen.lock().as_slice(), ["AA==".to_string()]);
    }

    #[test]
    fn preview_and_telemetry_lists_are_independent() {
        let broker = Broker::new();
        let telemetry_count = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&telemetry_count);
        broker.subscribe_telemetry(move |_| {
            count.fetch_add(1, Ordering::Relaxed);
        });

        broker.emit_preview(&preview());
        assert_eq!(telemetry_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn handlers_may_subscribe_during_emission() {
        // Emission snapshots the list outside the lock, so a handler that
        // subscribes re-entrantly must not deadlock.
        let broker = Arc::new(Broker::new());
        let inner = Arc::clone(&broker);
        broker.subscribe_telemetry(move |_| {
            inner.subscribe_telemetry(|_| {});
        });

        broker.emit_telemetry(&telemetry());
        assert_eq!(broker.telemetry_handlers.read().len(), 2);
    }
}
