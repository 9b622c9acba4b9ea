/*!
 * Event System
 * Strongly-typed lifecycle events for pools and streams
 */

use crate::core::types::{StreamId, Tag};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

/// Event severity for filtering and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// Event category for organization and querying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Category {
    Stream,
    SmallPool,
    LargePool,
    Usage,
}

/// Why a returned buffer was dropped instead of pooled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Buffer is larger than the largest pooled size class
    TooLarge,
    /// Pool already holds its configured maximum of free bytes
    EnoughFree,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiscardReason::TooLarge => write!(f, "too large"),
            DiscardReason::EnoughFree => write!(f, "enough free"),
        }
    }
}

/// Unified event type - all lifecycle notifications flow through this
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic timestamp (nanoseconds since the first event of the process)
    pub timestamp_ns: u64,
    /// Event severity
    pub severity: Severity,
    /// Event category
    pub category: Category,
    /// Stream the event relates to, if any
    pub stream_id: Option<StreamId>,
    /// Stream tag, if any
    pub tag: Option<Tag>,
    /// Event payload
    pub payload: Payload,
}

/// Event payload - strongly typed variants for each notification point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    // Stream lifecycle
    StreamCreated {
        requested_size: usize,
        actual_size: usize,
    },
    StreamDisposed {
        length: usize,
        lifetime_ms: u64,
    },
    StreamDoubleDisposed,
    StreamOverCapacity {
        requested: u64,
        maximum: usize,
    },
    StreamConvertedToArray {
        length: usize,
    },

    // Small pool
    BlockCreated {
        block_size: usize,
    },
    BlockDiscarded {
        block_size: usize,
        reason: DiscardReason,
    },

    // Large pool
    LargeBufferCreated {
        size: usize,
        pooled: bool,
    },
    LargeBufferDiscarded {
        size: usize,
        reason: DiscardReason,
    },

    // Usage snapshot after every release
    UsageReport {
        small_pool_in_use_bytes: usize,
        small_pool_free_bytes: usize,
        large_pool_in_use_bytes: usize,
        large_pool_free_bytes: usize,
    },
}

impl Payload {
    /// Stable name for filtering and metrics keys
    pub fn name(&self) -> &'static str {
        match self {
            Payload::StreamCreated { .. } => "stream_created",
            Payload::StreamDisposed { .. } => "stream_disposed",
            Payload::StreamDoubleDisposed => "stream_double_disposed",
            Payload::StreamOverCapacity { .. } => "stream_over_capacity",
            Payload::StreamConvertedToArray { .. } => "stream_converted_to_array",
            Payload::BlockCreated { .. } => "block_created",
            Payload::BlockDiscarded { .. } => "block_discarded",
            Payload::LargeBufferCreated { .. } => "large_buffer_created",
            Payload::LargeBufferDiscarded { .. } => "large_buffer_discarded",
            Payload::UsageReport { .. } => "usage_report",
        }
    }
}

impl Event {
    /// Create a new event stamped with the current monotonic time
    #[inline]
    pub fn new(severity: Severity, category: Category, payload: Payload) -> Self {
        Self {
            timestamp_ns: monotonic_ns(),
            severity,
            category,
            stream_id: None,
            tag: None,
            payload,
        }
    }

    /// Attach the originating stream's identity
    #[inline]
    pub fn with_stream(mut self, id: StreamId, tag: Option<&Tag>) -> Self {
        self.stream_id = Some(id);
        self.tag = tag.cloned();
        self
    }
}

/// Event filter for subscriptions and queries
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub min_severity: Option<Severity>,
    pub category: Option<Category>,
    pub stream_id: Option<StreamId>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn stream(mut self, id: StreamId) -> Self {
        self.stream_id = Some(id);
        self
    }

    /// Check if event matches filter
    #[inline]
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(min) = self.min_severity {
            if event.severity < min {
                return false;
            }
        }
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(id) = self.stream_id {
            if event.stream_id != Some(id) {
                return false;
            }
        }
        true
    }
}

/// Nanoseconds elapsed on a process-wide monotonic clock
#[inline]
pub fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}
