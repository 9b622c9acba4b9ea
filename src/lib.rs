/*!
 * Recyclable Memory Streams
 *
 * Pooled, growable in-memory byte streams. A `BufferPoolManager` owns two
 * pools (fixed-size blocks and size-classed contiguous buffers) and hands
 * out `RecyclableStream`s that borrow storage from them and give it back
 * when dropped.
 */

pub mod core;
pub mod monitoring;
pub mod pool;
pub mod stream;

// Re-exports
pub use crate::core::config::PoolOptions;
pub use crate::core::errors::{PoolError, PoolResult, StreamError, StreamResult};
pub use crate::core::types::{Block, LargeBuffer, Size, StreamId, Tag};
pub use monitoring::{Collector, Event, EventSink, Payload};
pub use pool::{BufferPoolManager, PoolStats, SizeClass};
pub use stream::{BufferWriter, ReadOnlySequence, RecyclableStream};
