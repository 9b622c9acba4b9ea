/*!
 * Buffer Pools
 *
 * Two independent pools behind one manager:
 * - **Small pool**: fixed-size blocks, used while streams are small or growing
 * - **Large pool**: contiguous buffers bucketed by size class, used when a
 *   stream needs a single flat view
 *
 * Free lists are lock-free queues; byte accounting uses atomics only.
 * Reuse order among equally sized buffers is not significant.
 */

mod block_pool;
mod large_pool;
mod manager;
mod stats;

pub use block_pool::BlockPool;
pub use large_pool::{LargeAcquire, LargeBufferPool, SizeClass};
pub use manager::BufferPoolManager;
pub(crate) use manager::Origin;
pub use stats::PoolStats;

use crate::core::types::Size;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Take `bytes` off an in-use counter, stopping at zero
///
/// Buffers of a valid shape that this pool never handed out are accepted on
/// release, so the counter must not wrap.
#[inline]
pub(crate) fn retire_bytes(counter: &AtomicUsize, bytes: Size) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |in_use| {
        Some(in_use.saturating_sub(bytes))
    });
}
