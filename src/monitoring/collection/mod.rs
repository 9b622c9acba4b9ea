/*!
 * Collection
 * Central fan-out for lifecycle notifications
 */

mod collector;

pub use collector::{Collector, EventSink};
