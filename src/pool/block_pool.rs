/*!
 * Block Pool
 * Lock-free free list of fixed-size blocks
 */

use super::retire_bytes;
use crate::core::types::{zeroed, Block, Size};
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Small pool: every block is exactly `block_size` bytes
///
/// # Performance
/// - Push/pop are lock-free; byte counters are plain atomics
/// - The free-byte ceiling is reserved with a CAS loop before the push, so
///   concurrent returns can never overshoot it
pub struct BlockPool {
    block_size: Size,
    free: SegQueue<Block>,
    free_bytes: AtomicUsize,
    in_use_bytes: AtomicUsize,
}

impl BlockPool {
    pub fn new(block_size: Size) -> Self {
        Self {
            block_size,
            free: SegQueue::new(),
            free_bytes: AtomicUsize::new(0),
            in_use_bytes: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn block_size(&self) -> Size {
        self.block_size
    }

    /// Take a free block or allocate a zeroed one
    ///
    /// Returns the block and whether it was freshly allocated.
    pub fn acquire(&self) -> (Block, bool) {
        self.in_use_bytes.fetch_add(self.block_size, Ordering::Relaxed);
        match self.free.pop() {
            Some(block) => {
                self.free_bytes.fetch_sub(self.block_size, Ordering::Relaxed);
                (block, false)
            }
            None => (zeroed(self.block_size), true),
        }
    }

    /// Mark `count` blocks as no longer in use
    #[inline]
    pub(crate) fn retire(&self, count: usize) {
        retire_bytes(&self.in_use_bytes, count.saturating_mul(self.block_size));
    }

    /// Reserve room for one more free block under `ceiling` (0 = unbounded)
    pub(crate) fn reserve_free(&self, ceiling: Size) -> bool {
        let block_size = self.block_size;
        self.free_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |free| {
                let next = free.checked_add(block_size)?;
                (ceiling == 0 || next <= ceiling).then_some(next)
            })
            .is_ok()
    }

    /// Push a block whose free bytes were already reserved
    #[inline]
    pub(crate) fn push_reserved(&self, block: Block) {
        debug_assert_eq!(block.len(), self.block_size);
        self.free.push(block);
    }

    #[inline]
    pub fn free_bytes(&self) -> Size {
        self.free_bytes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn in_use_bytes(&self) -> Size {
        self.in_use_bytes.load(Ordering::Relaxed)
    }

    /// Number of blocks currently sitting in the free list
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
