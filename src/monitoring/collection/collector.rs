/*!
 * Unified Collector
 * Central fan-out point for pool and stream lifecycle events
 *
 * Emission is fire-and-forget: a panicking sink is contained and counted,
 * never propagated back into pool or stream logic.
 */

use crate::monitoring::events::Event;
use crate::monitoring::streaming::{EventStream, StreamStats, Subscriber};
use log::error;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of lifecycle notifications
///
/// Implementations must be cheap; they run inline on the thread that
/// acquired or released the buffer.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    #[inline]
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Unified observability collector
pub struct Collector {
    /// Event ring for pull-style consumers
    stream: EventStream,

    /// Push-style callbacks
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,

    /// Sink invocations that panicked
    sink_failures: AtomicU64,
}

impl Collector {
    /// Create a new collector
    pub fn new() -> Self {
        Self::with_stream(EventStream::new())
    }

    /// Create a collector publishing into an existing stream
    pub fn with_stream(stream: EventStream) -> Self {
        Self {
            stream,
            sinks: RwLock::new(Vec::new()),
            sink_failures: AtomicU64::new(0),
        }
    }

    /// Register a push-style sink
    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Emit an event (primary API)
    #[inline]
    pub fn emit(&self, event: Event) {
        // Sinks run outside the lock so they may register further sinks
        let sinks: Vec<Arc<dyn EventSink>> = self.sinks.read().clone();
        for sink in &sinks {
            if catch_unwind(AssertUnwindSafe(|| sink.on_event(&event))).is_err() {
                self.sink_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Event sink panicked while handling {}; event dropped for that sink",
                    event.payload.name()
                );
            }
        }

        let _ = self.stream.publish(event);
    }

    /// Subscribe to event stream
    pub fn subscribe(&self) -> Subscriber {
        self.stream.subscribe()
    }

    /// Get stream statistics
    pub fn stream_stats(&self) -> StreamStats {
        self.stream.stats()
    }

    /// Number of sink invocations that panicked
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
