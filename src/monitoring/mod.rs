/*!
 * Lifecycle Notifications
 *
 * Simple notification callbacks fired at well-defined points of the pool and
 * stream lifecycle:
 * - **Events**: strongly-typed payloads (creation, disposal, discards, usage)
 * - **Streaming**: bounded lock-free ring for pull-style consumers
 * - **Collection**: fan-out to push-style sinks with panic containment
 *
 * A manager without a collector emits nothing and pays nothing.
 */

pub mod collection;
pub mod events;
pub mod streaming;

pub use collection::{Collector, EventSink};
pub use events::{Category, DiscardReason, Event, EventFilter, Payload, Severity};
pub use streaming::{EventStream, StreamStats, Subscriber};
