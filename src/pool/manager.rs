/*!
 * Buffer Pool Manager
 *
 * Central authority for handing out and reclaiming blocks and large buffers.
 *
 * ## Ceilings
 *
 * - **Small pool free bytes** (soft): returned blocks beyond it are dropped
 * - **Large pool free bytes** (soft, per size class): returned buffers beyond it are dropped
 * - **Stream capacity** (hard): enforced by streams when they grow
 *
 * The manager is a cheap `Arc` handle; clone it into every thread and stream
 * that needs it. Independently configured managers never share buffers.
 */

use super::block_pool::BlockPool;
use super::large_pool::LargeBufferPool;
use super::stats::PoolStats;
use crate::core::config::PoolOptions;
use crate::core::errors::{PoolError, PoolResult, StreamResult};
use crate::core::types::{Block, LargeBuffer, Size, StreamId, Tag};
use crate::monitoring::{Category, Collector, DiscardReason, Event, Payload, Severity};
use crate::stream::RecyclableStream;
use arc_swap::ArcSwapOption;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of the stream on whose behalf a buffer moves, for diagnostics
#[derive(Debug, Clone, Copy)]
pub(crate) struct Origin<'a> {
    pub id: StreamId,
    pub tag: Option<&'a Tag>,
}

struct ManagerInner {
    options: PoolOptions,
    small: BlockPool,
    large: LargeBufferPool,
    collector: ArcSwapOption<Collector>,
}

/// Buffer pool manager
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<ManagerInner>,
}

impl BufferPoolManager {
    /// Create a manager, validating the options first
    pub fn new(options: PoolOptions) -> PoolResult<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: PoolOptions) -> Self {
        let large = LargeBufferPool::new(
            options.size_class(),
            options.large_buffer_multiple,
            options.maximum_buffer_size,
        );
        info!(
            "Buffer pool manager initialized: block size {} bytes, {:?} large buffers of {} bytes up to {} bytes ({} size classes)",
            options.block_size,
            options.size_class(),
            options.large_buffer_multiple,
            options.maximum_buffer_size,
            large.bucket_count()
        );
        Self {
            inner: Arc::new(ManagerInner {
                small: BlockPool::new(options.block_size),
                large,
                options,
                collector: ArcSwapOption::empty(),
            }),
        }
    }

    /// Add observability collector
    pub fn with_collector(self, collector: Arc<Collector>) -> Self {
        self.set_collector(collector);
        self
    }

    /// Set or replace the collector; visible to every clone of this manager
    pub fn set_collector(&self, collector: Arc<Collector>) {
        self.inner.collector.store(Some(collector));
    }

    /// Get collector reference
    pub fn collector(&self) -> Option<Arc<Collector>> {
        self.inner.collector.load_full()
    }

    #[inline]
    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    #[inline]
    pub fn block_size(&self) -> Size {
        self.inner.options.block_size
    }

    #[inline]
    pub fn large_buffer_multiple(&self) -> Size {
        self.inner.options.large_buffer_multiple
    }

    #[inline]
    pub fn maximum_buffer_size(&self) -> Size {
        self.inner.options.maximum_buffer_size
    }

    #[inline]
    pub fn maximum_stream_capacity(&self) -> Size {
        self.inner.options.maximum_stream_capacity
    }

    #[inline]
    pub fn aggressive_buffer_return(&self) -> bool {
        self.inner.options.aggressive_buffer_return
    }

    /// Emit an event if a collector is attached; the event is only built then
    #[inline]
    pub(crate) fn emit(&self, build: impl FnOnce() -> Event) {
        let guard = self.inner.collector.load();
        if let Some(collector) = &*guard {
            collector.emit(build());
        }
    }

    fn emit_for(&self, origin: Option<Origin<'_>>, severity: Severity, category: Category, payload: Payload) {
        self.emit(|| {
            let event = Event::new(severity, category, payload);
            match origin {
                Some(origin) => event.with_stream(origin.id, origin.tag),
                None => event,
            }
        });
    }

    fn report_usage(&self) {
        self.emit(|| {
            Event::new(
                Severity::Trace,
                Category::Usage,
                Payload::UsageReport {
                    small_pool_in_use_bytes: self.small_pool_in_use_size(),
                    small_pool_free_bytes: self.small_pool_free_size(),
                    large_pool_in_use_bytes: self.large_pool_in_use_size(),
                    large_pool_free_bytes: self.large_pool_free_size(),
                },
            )
        });
    }

    // =========================================================================
    // Small pool
    // =========================================================================

    /// Take a block from the small pool, allocating one if the pool is empty
    pub fn acquire_block(&self) -> Block {
        self.acquire_block_for(None)
    }

    pub(crate) fn acquire_block_for(&self, origin: Option<Origin<'_>>) -> Block {
        let (block, created) = self.inner.small.acquire();
        if created {
            debug!("Allocated new block of {} bytes", block.len());
            self.emit_for(
                origin,
                Severity::Debug,
                Category::SmallPool,
                Payload::BlockCreated {
                    block_size: block.len(),
                },
            );
        }
        block
    }

    /// Return a single block
    pub fn release_block(&self, block: Block) -> PoolResult<()> {
        self.release_blocks_for(vec![block], None)
    }

    /// Return a batch of blocks
    ///
    /// Every block is validated before any is pooled. Blocks are pushed back
    /// while the free-byte ceiling allows; the remainder is dropped.
    pub fn release_blocks(&self, blocks: Vec<Block>) -> PoolResult<()> {
        self.release_blocks_for(blocks, None)
    }

    pub(crate) fn release_blocks_for(
        &self,
        blocks: Vec<Block>,
        origin: Option<Origin<'_>>,
    ) -> PoolResult<()> {
        let block_size = self.block_size();
        if let Some(bad) = blocks.iter().find(|b| b.len() != block_size) {
            return Err(PoolError::InvalidBlockSize {
                expected: block_size,
                actual: bad.len(),
            });
        }
        if blocks.is_empty() {
            return Ok(());
        }

        let small = &self.inner.small;
        let ceiling = self.inner.options.maximum_small_pool_free_bytes;
        small.retire(blocks.len());

        for mut block in blocks {
            if !small.reserve_free(ceiling) {
                warn!(
                    "Small pool holds {} free bytes (ceiling {}); discarding returned blocks",
                    small.free_bytes(),
                    ceiling
                );
                self.emit_for(
                    origin,
                    Severity::Debug,
                    Category::SmallPool,
                    Payload::BlockDiscarded {
                        block_size,
                        reason: DiscardReason::EnoughFree,
                    },
                );
                break;
            }
            if self.inner.options.zero_out_buffer {
                block.fill(0);
            }
            small.push_reserved(block);
        }

        self.report_usage();
        Ok(())
    }

    // =========================================================================
    // Large pool
    // =========================================================================

    /// Take a buffer of at least `required_size` bytes, rounded up to its size class
    ///
    /// Buffers larger than the maximum buffer size are always freshly
    /// allocated and will not be pooled when returned.
    pub fn acquire_large_buffer(&self, required_size: Size) -> PoolResult<LargeBuffer> {
        self.acquire_large_buffer_for(required_size, None)
    }

    pub(crate) fn acquire_large_buffer_for(
        &self,
        required_size: Size,
        origin: Option<Origin<'_>>,
    ) -> PoolResult<LargeBuffer> {
        let acquired = self.inner.large.acquire(required_size)?;
        if acquired.created {
            debug!(
                "Allocated new large buffer of {} bytes (requested {}, pooled: {})",
                acquired.buffer.len(),
                required_size,
                acquired.pooled
            );
            self.emit_for(
                origin,
                Severity::Debug,
                Category::LargePool,
                Payload::LargeBufferCreated {
                    size: acquired.buffer.len(),
                    pooled: acquired.pooled,
                },
            );
        }
        Ok(acquired.buffer)
    }

    /// Return a large buffer
    ///
    /// Fails if the buffer's length is not a size class of this manager.
    pub fn release_large_buffer(&self, buffer: LargeBuffer) -> PoolResult<()> {
        self.release_large_buffer_for(buffer, None)
    }

    pub(crate) fn release_large_buffer_for(
        &self,
        buffer: LargeBuffer,
        origin: Option<Origin<'_>>,
    ) -> PoolResult<()> {
        let size = buffer.len();
        let options = &self.inner.options;
        let outcome = self.inner.large.release(
            buffer,
            options.maximum_large_pool_free_bytes,
            options.zero_out_buffer,
        )?;

        if let Some(reason) = outcome {
            warn!("Discarding returned large buffer of {} bytes: {}", size, reason);
            self.emit_for(
                origin,
                Severity::Debug,
                Category::LargePool,
                Payload::LargeBufferDiscarded { size, reason },
            );
        }

        self.report_usage();
        Ok(())
    }

    /// Round a request to the size class the large pool would hand out
    pub fn round_to_large_buffer_size(&self, required_size: Size) -> PoolResult<Size> {
        self.inner.large.round_up(required_size)
    }

    /// Whether `size` is a large-buffer size class of this manager
    pub fn is_large_buffer_size(&self, size: Size) -> bool {
        self.inner.large.is_valid_size(size)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub fn small_pool_free_size(&self) -> Size {
        self.inner.small.free_bytes()
    }

    pub fn small_pool_in_use_size(&self) -> Size {
        self.inner.small.in_use_bytes()
    }

    pub fn small_blocks_free(&self) -> usize {
        self.inner.small.free_count()
    }

    pub fn large_pool_free_size(&self) -> Size {
        self.inner.large.free_bytes()
    }

    pub fn large_pool_in_use_size(&self) -> Size {
        self.inner.large.in_use_bytes()
    }

    pub fn large_buffers_free(&self) -> usize {
        self.inner.large.free_count()
    }

    /// Snapshot of every counter
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            small_pool_free_bytes: self.small_pool_free_size(),
            small_pool_in_use_bytes: self.small_pool_in_use_size(),
            small_blocks_free: self.small_blocks_free(),
            large_pool_free_bytes: self.large_pool_free_size(),
            large_pool_in_use_bytes: self.large_pool_in_use_size(),
            large_buffers_free: self.large_buffers_free(),
        }
    }

    // =========================================================================
    // Stream factories
    // =========================================================================

    /// Stream with a fresh id and no tag
    pub fn get_stream(&self) -> StreamResult<RecyclableStream> {
        RecyclableStream::create(self.clone(), Uuid::new_v4(), None, 0, false)
    }

    /// Stream with a fresh id and a diagnostic tag
    pub fn get_stream_with_tag(&self, tag: &str) -> StreamResult<RecyclableStream> {
        RecyclableStream::create(self.clone(), Uuid::new_v4(), Some(tag.into()), 0, false)
    }

    /// Stream with a caller-chosen id
    pub fn get_stream_with_id(
        &self,
        id: StreamId,
        tag: Option<&str>,
    ) -> StreamResult<RecyclableStream> {
        RecyclableStream::create(self.clone(), id, tag.map(Tag::from), 0, false)
    }

    /// Stream pre-sized (in blocks) to hold at least `required_size` bytes
    pub fn get_stream_with_capacity(
        &self,
        tag: Option<&str>,
        required_size: Size,
    ) -> StreamResult<RecyclableStream> {
        RecyclableStream::create(
            self.clone(),
            Uuid::new_v4(),
            tag.map(Tag::from),
            required_size,
            false,
        )
    }

    /// Stream backed by one contiguous large buffer from the start
    ///
    /// Requests that fit in a single block stay in block mode.
    pub fn get_stream_contiguous(
        &self,
        tag: Option<&str>,
        required_size: Size,
    ) -> StreamResult<RecyclableStream> {
        RecyclableStream::create(
            self.clone(),
            Uuid::new_v4(),
            tag.map(Tag::from),
            required_size,
            true,
        )
    }

    /// Stream seeded with a copy of `bytes`, positioned at the start
    pub fn get_stream_from_slice(
        &self,
        tag: Option<&str>,
        bytes: &[u8],
    ) -> StreamResult<RecyclableStream> {
        let mut stream = self.get_stream_with_capacity(tag, bytes.len())?;
        stream.write_bytes(bytes)?;
        stream.set_position(0)?;
        Ok(stream)
    }
}

impl Default for BufferPoolManager {
    fn default() -> Self {
        Self::build(PoolOptions::default())
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("options", &self.inner.options)
            .field("stats", &self.stats())
            .finish()
    }
}
