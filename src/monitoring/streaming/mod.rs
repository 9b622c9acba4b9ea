/*!
 * Event Streaming
 * Lock-free event distribution using a bounded ring buffer
 *
 * Design: many producers (every pool and stream operation), few consumers
 * (tests, exporters). Memory is bounded: when the ring is full the oldest
 * event is displaced so the most recent history is always available.
 */

use crate::core::limits::EVENT_RING_SIZE as RING_SIZE;
use crate::monitoring::events::{Event, EventFilter};
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Event statistics for monitoring the observer
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub events_produced: u64,
    pub events_consumed: u64,
    pub events_dropped: u64,
    pub active_subscribers: usize,
}

/// Event stream - lock-free MPMC ring buffer
pub struct EventStream {
    queue: Arc<ArrayQueue<Event>>,

    produced: Arc<AtomicU64>,
    consumed: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,

    subscribers: Arc<AtomicUsize>,
}

impl EventStream {
    /// Create a new event stream
    pub fn new() -> Self {
        Self::with_capacity(RING_SIZE)
    }

    /// Create a stream with a custom ring size (useful for testing)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            produced: Arc::new(AtomicU64::new(0)),
            consumed: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event; returns false if an older event had to be displaced
    #[inline]
    pub fn publish(&self, event: Event) -> bool {
        self.produced.fetch_add(1, Ordering::Relaxed);
        match self.queue.force_push(event) {
            None => true,
            Some(_displaced) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Try to consume one event (lock-free)
    #[inline]
    pub fn try_consume(&self) -> Option<Event> {
        self.queue.pop().map(|event| {
            self.consumed.fetch_add(1, Ordering::Relaxed);
            event
        })
    }

    /// Subscribe to event stream (returns a consumer handle)
    pub fn subscribe(&self) -> Subscriber {
        self.subscribers.fetch_add(1, Ordering::Relaxed);
        Subscriber {
            stream: self.clone(),
            local_consumed: 0,
        }
    }

    /// Get stream statistics
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            events_produced: self.produced.load(Ordering::Relaxed),
            events_consumed: self.consumed.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
            active_subscribers: self.subscribers.load(Ordering::Relaxed),
        }
    }

    /// Number of events waiting to be consumed
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Clone for EventStream {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            produced: Arc::clone(&self.produced),
            consumed: Arc::clone(&self.consumed),
            dropped: Arc::clone(&self.dropped),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Event stream subscriber handle
pub struct Subscriber {
    stream: EventStream,
    local_consumed: u64,
}

impl Subscriber {
    /// Consume next event
    #[inline]
    pub fn next(&mut self) -> Option<Event> {
        self.stream.try_consume().map(|event| {
            self.local_consumed += 1;
            event
        })
    }

    /// Drain every pending event
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.next() {
            events.push(event);
        }
        events
    }

    /// Drain pending events, keeping those matching a filter
    pub fn filter(&mut self, filter: &EventFilter) -> Vec<Event> {
        self.drain()
            .into_iter()
            .filter(|event| filter.matches(event))
            .collect()
    }

    /// Get local consumption count
    #[inline]
    pub fn consumed(&self) -> u64 {
        self.local_consumed
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.stream.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}
