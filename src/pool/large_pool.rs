/*!
 * Large Buffer Pool
 * Size-class bucketed free lists for contiguous buffers
 *
 * ## Size classes
 *
 * - **Multiple**: `multiple * n` for n >= 1, one bucket per step
 *   up to the maximum buffer size
 * - **Exponential**: `multiple * 2^n` for n >= 0, one bucket per power of two
 *
 * `pool_index` is the exact inverse of `round_up`, so a buffer of a given
 * length always lands in the same bucket and any length that is not a size
 * class is recognised as foreign.
 */

use super::retire_bytes;
use crate::core::errors::{PoolError, PoolResult};
use crate::core::limits::MAX_ARRAY_LENGTH;
use crate::core::types::{zeroed, LargeBuffer, Size};
use crate::monitoring::DiscardReason;
use crossbeam_queue::SegQueue;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Size-class strategy for large buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    Multiple,
    Exponential,
}

impl SizeClass {
    /// Smallest size class that holds `required` bytes, `None` on overflow
    #[inline]
    pub fn round_up(self, multiple: Size, required: Size) -> Option<Size> {
        let units = required.max(1).div_ceil(multiple);
        match self {
            SizeClass::Multiple => units.checked_mul(multiple),
            SizeClass::Exponential => units.checked_next_power_of_two()?.checked_mul(multiple),
        }
    }

    /// Whether `size` is one of this strategy's size classes
    #[inline]
    pub fn is_valid_size(self, multiple: Size, size: Size) -> bool {
        if size == 0 || size % multiple != 0 {
            return false;
        }
        match self {
            SizeClass::Multiple => true,
            SizeClass::Exponential => (size / multiple).is_power_of_two(),
        }
    }

    /// Bucket index of a valid size class
    #[inline]
    pub fn pool_index(self, multiple: Size, size: Size) -> usize {
        debug_assert!(self.is_valid_size(multiple, size));
        match self {
            SizeClass::Multiple => size / multiple - 1,
            SizeClass::Exponential => (size / multiple).trailing_zeros() as usize,
        }
    }

    /// Size class stored in bucket `index`
    #[inline]
    pub fn size_for_index(self, multiple: Size, index: usize) -> Size {
        match self {
            SizeClass::Multiple => (index + 1) * multiple,
            SizeClass::Exponential => multiple << index,
        }
    }
}

/// One size class worth of free buffers
struct Bucket {
    free: SegQueue<LargeBuffer>,
    free_bytes: AtomicUsize,
    in_use_bytes: AtomicUsize,
}

impl Bucket {
    fn new() -> Self {
        Self {
            free: SegQueue::new(),
            free_bytes: AtomicUsize::new(0),
            in_use_bytes: AtomicUsize::new(0),
        }
    }
}

/// Outcome of handing a buffer out
#[derive(Debug)]
pub struct LargeAcquire {
    pub buffer: LargeBuffer,
    /// Freshly allocated rather than reused
    pub created: bool,
    /// Within the pooled range (will be kept on release)
    pub pooled: bool,
}

/// Large pool: one lock-free bucket per size class up to the maximum buffer size
pub struct LargeBufferPool {
    strategy: SizeClass,
    multiple: Size,
    maximum_buffer_size: Size,
    buckets: Box<[Bucket]>,
    /// In-use bytes of buffers larger than the maximum (never pooled)
    overflow_in_use: AtomicUsize,
}

impl LargeBufferPool {
    /// Create the pool; `maximum_buffer_size` must be a valid size class
    pub fn new(strategy: SizeClass, multiple: Size, maximum_buffer_size: Size) -> Self {
        let bucket_count = strategy.pool_index(multiple, maximum_buffer_size) + 1;
        Self {
            strategy,
            multiple,
            maximum_buffer_size,
            buckets: (0..bucket_count).map(|_| Bucket::new()).collect(),
            overflow_in_use: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn strategy(&self) -> SizeClass {
        self.strategy
    }

    #[inline]
    pub fn multiple(&self) -> Size {
        self.multiple
    }

    #[inline]
    pub fn maximum_buffer_size(&self) -> Size {
        self.maximum_buffer_size
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Round a request up to its size class, failing past the platform bound
    pub fn round_up(&self, required: Size) -> PoolResult<Size> {
        let exceeded = PoolError::CapacityExceeded {
            requested: required,
            maximum: MAX_ARRAY_LENGTH,
        };
        if required > MAX_ARRAY_LENGTH {
            return Err(exceeded);
        }
        match self.strategy.round_up(self.multiple, required) {
            Some(size) if size <= MAX_ARRAY_LENGTH => Ok(size),
            _ => Err(exceeded),
        }
    }

    #[inline]
    pub fn is_valid_size(&self, size: Size) -> bool {
        self.strategy.is_valid_size(self.multiple, size)
    }

    /// Hand out a buffer of at least `required` bytes
    pub fn acquire(&self, required: Size) -> PoolResult<LargeAcquire> {
        let size = self.round_up(required)?;
        let index = self.strategy.pool_index(self.multiple, size);

        let acquired = match self.buckets.get(index) {
            Some(bucket) => {
                bucket.in_use_bytes.fetch_add(size, Ordering::Relaxed);
                match bucket.free.pop() {
                    Some(buffer) => {
                        bucket.free_bytes.fetch_sub(size, Ordering::Relaxed);
                        LargeAcquire {
                            buffer,
                            created: false,
                            pooled: true,
                        }
                    }
                    None => LargeAcquire {
                        buffer: zeroed(size),
                        created: true,
                        pooled: true,
                    },
                }
            }
            None => {
                self.overflow_in_use.fetch_add(size, Ordering::Relaxed);
                LargeAcquire {
                    buffer: zeroed(size),
                    created: true,
                    pooled: false,
                }
            }
        };

        Ok(acquired)
    }

    /// Take a buffer back
    ///
    /// Returns `None` when pooled, or the reason it was dropped instead.
    /// `ceiling` bounds the free bytes of the buffer's bucket (0 = unbounded).
    pub fn release(
        &self,
        mut buffer: LargeBuffer,
        ceiling: Size,
        zero_out: bool,
    ) -> PoolResult<Option<DiscardReason>> {
        let size = buffer.len();
        if !self.is_valid_size(size) {
            return Err(PoolError::InvalidLargeBufferSize { length: size });
        }

        let index = self.strategy.pool_index(self.multiple, size);
        let Some(bucket) = self.buckets.get(index) else {
            retire_bytes(&self.overflow_in_use, size);
            return Ok(Some(DiscardReason::TooLarge));
        };

        retire_bytes(&bucket.in_use_bytes, size);
        let reserved = bucket
            .free_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |free| {
                let next = free.checked_add(size)?;
                (ceiling == 0 || next <= ceiling).then_some(next)
            })
            .is_ok();

        if !reserved {
            return Ok(Some(DiscardReason::EnoughFree));
        }

        if zero_out {
            buffer.fill(0);
        }
        bucket.free.push(buffer);
        Ok(None)
    }

    /// Free bytes across all buckets
    pub fn free_bytes(&self) -> Size {
        self.buckets
            .iter()
            .map(|b| b.free_bytes.load(Ordering::Relaxed))
            .sum()
    }

    /// In-use bytes across all buckets, including unpooled oversize buffers
    pub fn in_use_bytes(&self) -> Size {
        self.buckets
            .iter()
            .map(|b| b.in_use_bytes.load(Ordering::Relaxed))
            .fold(self.overflow_in_use.load(Ordering::Relaxed), Size::saturating_add)
    }

    /// Number of free buffers across all buckets
    pub fn free_count(&self) -> usize {
        self.buckets.iter().map(|b| b.free.len()).sum()
    }

    /// Free bytes held by the bucket for `size`, if `size` is a pooled class
    pub fn bucket_free_bytes(&self, size: Size) -> Option<Size> {
        if !self.is_valid_size(size) {
            return None;
        }
        self.buckets
            .get(self.strategy.pool_index(self.multiple, size))
            .map(|b| b.free_bytes.load(Ordering::Relaxed))
    }
}
