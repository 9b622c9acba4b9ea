/*!
 * Recyclable Stream
 *
 * Seekable byte stream whose storage is borrowed from a `BufferPoolManager`.
 *
 * ## Buffer modes
 *
 * - **Block mode**: content spans an ordered list of fixed-size blocks;
 *   capacity is `blocks * block_size`
 * - **Large-buffer mode**: content lives in one contiguous pooled buffer;
 *   capacity is that buffer's length
 *
 * A stream moves from block mode to large-buffer mode when a caller asks for
 * a single contiguous view (`get_buffer`) and never moves back. Superseded
 * blocks and buffers are returned to the pool immediately when the manager
 * uses aggressive return, otherwise they are parked until disposal.
 *
 * A stream is single-owner: `&mut self` on every mutating call serializes access.
 * Disposal happens on `Drop`; `dispose()` does the same thing eagerly.
 */

use super::sequence::Segments;
use crate::core::errors::{PoolError, StreamError, StreamResult};
use crate::core::limits::MAX_ARRAY_LENGTH;
use crate::core::types::{Block, LargeBuffer, Size, StreamId, Tag};
use crate::monitoring::{Category, Event, Payload, Severity};
use crate::pool::{BufferPoolManager, Origin};
use std::io::SeekFrom;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Pooled, growable, seekable in-memory byte stream
pub struct RecyclableStream {
    pub(super) manager: BufferPoolManager,
    pub(super) id: StreamId,
    pub(super) tag: Option<Tag>,

    /// Live blocks (block mode only; empty once a large buffer is adopted)
    pub(super) blocks: Vec<Block>,
    /// Live contiguous buffer (large-buffer mode only)
    pub(super) large_buffer: Option<LargeBuffer>,
    /// Superseded large buffers awaiting return at disposal
    dirty_buffers: Vec<LargeBuffer>,
    /// Superseded blocks awaiting return at disposal
    dirty_blocks: Vec<Block>,
    /// Borrowed region handed out by `get_memory` that has not been advanced yet
    pub(super) writer_temp: Option<Box<[u8]>>,
    /// Length of the region `get_memory` mapped onto stream storage
    pub(super) writer_region: Option<Size>,

    pub(super) length: Size,
    pub(super) position: Size,
    disposed: bool,
    created_at: Instant,
}

impl RecyclableStream {
    /// Create a stream with at least one block (or one contiguous buffer) of capacity
    pub(crate) fn create(
        manager: BufferPoolManager,
        id: StreamId,
        tag: Option<Tag>,
        requested_size: Size,
        contiguous: bool,
    ) -> StreamResult<Self> {
        let mut stream = Self {
            manager,
            id,
            tag,
            blocks: Vec::new(),
            large_buffer: None,
            dirty_buffers: Vec::new(),
            dirty_blocks: Vec::new(),
            writer_temp: None,
            writer_region: None,
            length: 0,
            position: 0,
            disposed: false,
            created_at: Instant::now(),
        };

        if let Err(err) = stream.reserve_initial(requested_size, contiguous) {
            stream.release_buffers();
            stream.disposed = true;
            return Err(err);
        }

        let capacity = stream.capacity();
        debug!(
            stream_id = %stream.id,
            tag = stream.tag(),
            requested_size,
            capacity,
            "stream created"
        );
        stream.manager.emit(|| {
            Event::new(
                Severity::Debug,
                Category::Stream,
                Payload::StreamCreated {
                    requested_size,
                    actual_size: capacity,
                },
            )
            .with_stream(stream.id, stream.tag.as_ref())
        });

        Ok(stream)
    }

    fn reserve_initial(&mut self, requested_size: Size, contiguous: bool) -> StreamResult<()> {
        let block_size = self.manager.block_size();
        if contiguous && requested_size > block_size {
            self.check_ceiling(requested_size as u64)?;
            let buffer = self.acquire_contiguous(requested_size)?;
            self.large_buffer = Some(buffer);
            Ok(())
        } else {
            self.ensure_capacity(requested_size.max(block_size))
        }
    }

    // =========================================================================
    // Identity and state
    // =========================================================================

    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[inline]
    pub fn manager(&self) -> &BufferPoolManager {
        &self.manager
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Bytes logically written (high-water mark of writes)
    #[inline]
    pub fn length(&self) -> Size {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn position(&self) -> Size {
        self.position
    }

    /// Bytes the stream can hold without acquiring more storage
    pub fn capacity(&self) -> Size {
        match &self.large_buffer {
            Some(buffer) => buffer.len(),
            None => self.blocks.len() * self.manager.block_size(),
        }
    }

    /// Whether the stream is backed by a single contiguous buffer
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.large_buffer.is_some()
    }

    /// Number of live blocks (always zero in large-buffer mode)
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub(super) fn origin(&self) -> Origin<'_> {
        Origin {
            id: self.id,
            tag: self.tag.as_ref(),
        }
    }

    #[inline]
    pub(super) fn check_disposed(&self) -> StreamResult<()> {
        if self.disposed {
            return Err(StreamError::Disposed {
                id: self.id.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Report and build an over-capacity error
    pub(super) fn over_capacity(&self, requested: u64, maximum: Size) -> StreamError {
        warn!(
            stream_id = %self.id,
            tag = self.tag(),
            requested,
            maximum,
            "stream capacity request exceeds maximum"
        );
        self.manager.emit(|| {
            Event::new(
                Severity::Warn,
                Category::Stream,
                Payload::StreamOverCapacity { requested, maximum },
            )
            .with_stream(self.id, self.tag.as_ref())
        });
        StreamError::OutOfMemory { requested, maximum }
    }

    fn check_ceiling(&self, new_capacity: u64) -> StreamResult<()> {
        let maximum = self.manager.maximum_stream_capacity();
        if maximum > 0 && new_capacity > maximum as u64 {
            return Err(self.over_capacity(new_capacity, maximum));
        }
        Ok(())
    }

    /// `position + count`, failing as over-capacity on overflow
    pub(super) fn end_of(&self, count: Size) -> StreamResult<Size> {
        self.position
            .checked_add(count)
            .ok_or_else(|| self.over_capacity(u64::MAX, MAX_ARRAY_LENGTH))
    }

    /// Take a contiguous buffer, mapping the platform bound to out-of-memory
    pub(super) fn acquire_contiguous(&self, size: Size) -> StreamResult<LargeBuffer> {
        match self.manager.acquire_large_buffer_for(size, Some(self.origin())) {
            Ok(buffer) => Ok(buffer),
            Err(PoolError::CapacityExceeded { requested, maximum }) => {
                Err(self.over_capacity(requested as u64, maximum))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Grow until at least `new_capacity` bytes fit
    ///
    /// Block mode appends whole blocks; large-buffer mode swaps in a bigger
    /// buffer and copies the content across.
    pub(super) fn ensure_capacity(&mut self, new_capacity: Size) -> StreamResult<()> {
        self.check_ceiling(new_capacity as u64)?;
        self.writer_region = None;

        if let Some(current_len) = self.large_buffer.as_ref().map(|b| b.len()) {
            if current_len < new_capacity {
                let mut grown = self.acquire_contiguous(new_capacity)?;
                let length = self.length;
                if let Some(current) = &self.large_buffer {
                    grown[..length].copy_from_slice(&current[..length]);
                }
                if let Some(old) = self.large_buffer.replace(grown) {
                    self.release_superseded(old);
                }
            }
            return Ok(());
        }

        let needed = new_capacity.div_ceil(self.manager.block_size());
        let origin = Some(Origin {
            id: self.id,
            tag: self.tag.as_ref(),
        });
        while self.blocks.len() < needed {
            let block = self.manager.acquire_block_for(origin);
            self.blocks.push(block);
        }
        Ok(())
    }

    /// Grow capacity; never shrinks
    pub fn set_capacity(&mut self, capacity: Size) -> StreamResult<()> {
        self.check_disposed()?;
        self.ensure_capacity(capacity)
    }

    fn release_superseded(&mut self, buffer: LargeBuffer) {
        if self.manager.aggressive_buffer_return() {
            if let Err(err) = self
                .manager
                .release_large_buffer_for(buffer, Some(self.origin()))
            {
                error!(stream_id = %self.id, %err, "failed to return superseded buffer");
            }
        } else {
            self.dirty_buffers.push(buffer);
        }
    }

    // =========================================================================
    // Segment access
    // =========================================================================

    /// Immutable chunks covering `[from, from + count)`; range must be within capacity
    pub(super) fn segments(&self, from: Size, count: Size) -> Segments<'_> {
        match &self.large_buffer {
            Some(buffer) => Segments::contiguous(buffer, from, count),
            None => Segments::blocks(&self.blocks, self.manager.block_size(), from, count),
        }
    }

    /// Visit mutable chunks covering `[from, from + count)` with their offset into the range
    fn for_each_segment_mut(&mut self, from: Size, count: Size, mut f: impl FnMut(&mut [u8], Size)) {
        if let Some(buffer) = &mut self.large_buffer {
            f(&mut buffer[from..from + count], 0);
            return;
        }

        let block_size = self.manager.block_size();
        let mut done = 0;
        let mut index = from / block_size;
        let mut offset = from % block_size;
        while done < count {
            let n = (block_size - offset).min(count - done);
            f(&mut self.blocks[index][offset..offset + n], done);
            done += n;
            index += 1;
            offset = 0;
        }
    }

    /// Copy out up to `dest.len()` bytes starting at `from`; returns bytes copied
    pub(super) fn internal_read(&self, dest: &mut [u8], from: Size) -> Size {
        if from >= self.length {
            return 0;
        }
        let count = dest.len().min(self.length - from);
        let mut done = 0;
        for chunk in self.segments(from, count) {
            dest[done..done + chunk.len()].copy_from_slice(chunk);
            done += chunk.len();
        }
        count
    }

    fn zero_range(&mut self, from: Size, to: Size) {
        if to > from {
            self.for_each_segment_mut(from, to - from, |chunk, _| chunk.fill(0));
        }
    }

    /// Zero stale pool content between the end of data and a cursor placed past it
    pub(super) fn fill_gap(&mut self) {
        if self.position > self.length {
            self.zero_range(self.length, self.position);
        }
    }

    // =========================================================================
    // Reading and writing
    // =========================================================================

    /// Write all of `buffer` at the cursor, growing as needed
    pub fn write_bytes(&mut self, buffer: &[u8]) -> StreamResult<()> {
        self.check_disposed()?;
        if buffer.is_empty() {
            return Ok(());
        }

        let end = self.end_of(buffer.len())?;
        self.ensure_capacity(end)?;
        self.fill_gap();

        let position = self.position;
        self.for_each_segment_mut(position, buffer.len(), |chunk, done| {
            chunk.copy_from_slice(&buffer[done..done + chunk.len()]);
        });

        self.position = end;
        self.length = self.length.max(end);
        Ok(())
    }

    /// Write `count` bytes of `buffer` starting at `offset`
    pub fn write_range(&mut self, buffer: &[u8], offset: Size, count: Size) -> StreamResult<()> {
        self.check_disposed()?;
        let end = check_range(buffer.len(), offset, count)?;
        self.write_bytes(&buffer[offset..end])
    }

    pub fn write_byte(&mut self, value: u8) -> StreamResult<()> {
        self.write_bytes(&[value])
    }

    /// Read into `buffer` from the cursor; returns fewer bytes near the end, 0 at EOF
    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> StreamResult<Size> {
        self.check_disposed()?;
        let read = self.internal_read(buffer, self.position);
        self.position += read;
        self.writer_region = None;
        Ok(read)
    }

    /// Read at most `count` bytes into `buffer[offset..]`
    pub fn read_range(&mut self, buffer: &mut [u8], offset: Size, count: Size) -> StreamResult<Size> {
        self.check_disposed()?;
        let end = check_range(buffer.len(), offset, count)?;
        self.read_bytes(&mut buffer[offset..end])
    }

    /// Read from an explicit cursor without moving the stream's own position
    ///
    /// `position` is advanced by the number of bytes read.
    pub fn read_at(&self, buffer: &mut [u8], position: &mut Size) -> StreamResult<Size> {
        self.check_disposed()?;
        let read = self.internal_read(buffer, *position);
        *position += read;
        Ok(read)
    }

    /// Next byte, or `None` at end of stream
    pub fn read_byte(&mut self) -> StreamResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_bytes(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    // =========================================================================
    // Length and cursor
    // =========================================================================

    /// Set the logical length, growing capacity if needed
    ///
    /// Shrinking only moves the end marker (and the cursor, if it was past it);
    /// capacity and content are kept. Growing exposes zeroed bytes.
    pub fn set_length(&mut self, value: Size) -> StreamResult<()> {
        self.check_disposed()?;
        self.ensure_capacity(value)?;

        if value > self.length {
            self.zero_range(self.length, value);
        }
        self.length = value;
        if self.position > value {
            self.position = value;
        }
        Ok(())
    }

    /// Move the cursor; positions past the end are allowed
    ///
    /// Fails with `ArgumentOutOfRange` beyond the maximum stream capacity.
    pub fn set_position(&mut self, position: Size) -> StreamResult<()> {
        self.check_disposed()?;
        let maximum = self.manager.maximum_stream_capacity();
        if maximum > 0 && position > maximum {
            return Err(StreamError::out_of_range(
                "position",
                format!("{} exceeds the maximum stream capacity {}", position, maximum),
            ));
        }
        self.move_cursor(position);
        Ok(())
    }

    fn move_cursor(&mut self, position: Size) {
        self.position = position;
        self.writer_region = None;
    }

    /// Reposition relative to the start, the cursor or the end
    ///
    /// Only a negative target is rejected; the next write enforces the
    /// capacity ceiling.
    pub fn seek_from(&mut self, pos: SeekFrom) -> StreamResult<u64> {
        self.check_disposed()?;
        let target: i128 = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
            SeekFrom::End(offset) => self.length as i128 + offset as i128,
        };

        if target < 0 {
            return Err(StreamError::SeekBeforeBegin {
                position: target.max(i64::MIN as i128) as i64,
            });
        }
        let target = Size::try_from(target).map_err(|_| {
            StreamError::out_of_range("offset", "seek target is not addressable")
        })?;

        self.move_cursor(target);
        Ok(target as u64)
    }

    // =========================================================================
    // Contiguous view
    // =========================================================================

    /// Single contiguous backing buffer covering at least `[0, length)`
    ///
    /// A one-block stream hands out its block directly. Otherwise the content
    /// is migrated into a large buffer sized to the current capacity and the
    /// stream stays in large-buffer mode from then on. The returned slice may
    /// be longer than `length`; bytes past `length` are unspecified.
    #[instrument(level = "trace", skip(self), fields(stream_id = %self.id))]
    pub fn get_buffer(&mut self) -> StreamResult<&[u8]> {
        self.check_disposed()?;
        self.writer_region = None;

        if self.large_buffer.is_none() && self.blocks.len() != 1 {
            let capacity = self.capacity();
            if capacity > MAX_ARRAY_LENGTH {
                return Err(self.over_capacity(capacity as u64, MAX_ARRAY_LENGTH));
            }

            let mut buffer = self.acquire_contiguous(capacity)?;
            let length = self.length;
            self.internal_read(&mut buffer[..length], 0);
            self.large_buffer = Some(buffer);

            let blocks = std::mem::take(&mut self.blocks);
            if self.manager.aggressive_buffer_return() {
                if let Err(err) = self
                    .manager
                    .release_blocks_for(blocks, Some(self.origin()))
                {
                    error!(stream_id = %self.id, %err, "failed to return migrated blocks");
                }
            } else {
                self.dirty_blocks.extend(blocks);
            }
            debug!(stream_id = %self.id, capacity, "stream migrated to a contiguous buffer");
        }

        match (&self.large_buffer, self.blocks.first()) {
            (Some(buffer), _) => Ok(&buffer[..]),
            (None, Some(block)) => Ok(&block[..]),
            (None, None) => Err(StreamError::Unsupported(
                "stream has no backing storage".into(),
            )),
        }
    }

    /// Contiguous view of exactly `[0, length)`, or `None` if unavailable
    pub fn try_get_buffer(&mut self) -> Option<&[u8]> {
        if self.disposed || self.length > MAX_ARRAY_LENGTH {
            return None;
        }
        let length = self.length;
        self.get_buffer().ok().map(|buffer| &buffer[..length])
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Return every buffer to the pool and mark the stream unusable
    ///
    /// Calling this again is reported as a double dispose and otherwise ignored.
    #[instrument(level = "debug", skip(self), fields(stream_id = %self.id))]
    pub fn dispose(&mut self) {
        if self.disposed {
            warn!(stream_id = %self.id, tag = self.tag(), "stream disposed twice");
            self.manager.emit(|| {
                Event::new(Severity::Warn, Category::Stream, Payload::StreamDoubleDisposed)
                    .with_stream(self.id, self.tag.as_ref())
            });
            return;
        }
        self.dispose_inner();
    }

    fn dispose_inner(&mut self) {
        let lifetime_ms = self.created_at.elapsed().as_millis() as u64;
        let length = self.length;
        debug!(stream_id = %self.id, length, lifetime_ms, "stream disposed");
        self.manager.emit(|| {
            Event::new(
                Severity::Debug,
                Category::Stream,
                Payload::StreamDisposed {
                    length,
                    lifetime_ms,
                },
            )
            .with_stream(self.id, self.tag.as_ref())
        });

        self.release_buffers();
        self.disposed = true;
    }

    /// Hand everything back to the manager; failures are logged, never raised
    fn release_buffers(&mut self) {
        let manager = &self.manager;
        let origin = Some(Origin {
            id: self.id,
            tag: self.tag.as_ref(),
        });

        let large = self.large_buffer.take().into_iter();
        for buffer in large.chain(self.dirty_buffers.drain(..)) {
            if let Err(err) = manager.release_large_buffer_for(buffer, origin) {
                error!(stream_id = %self.id, %err, "failed to return large buffer");
            }
        }

        if let Some(temp) = self.writer_temp.take() {
            return_temp(manager, temp, origin);
        }

        let mut blocks = std::mem::take(&mut self.blocks);
        blocks.append(&mut self.dirty_blocks);
        if let Err(err) = manager.release_blocks_for(blocks, origin) {
            error!(stream_id = %self.id, %err, "failed to return blocks");
        }
    }
}

impl Drop for RecyclableStream {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose_inner();
        }
    }
}

impl std::fmt::Debug for RecyclableStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecyclableStream")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("length", &self.length)
            .field("position", &self.position)
            .field("capacity", &self.capacity())
            .field("contiguous", &self.is_contiguous())
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Give a buffer-writer scratch buffer back to whichever pool it came from
pub(super) fn return_temp(manager: &BufferPoolManager, temp: Box<[u8]>, origin: Option<Origin<'_>>) {
    let result = if temp.len() == manager.block_size() {
        manager.release_blocks_for(vec![temp], origin)
    } else {
        manager.release_large_buffer_for(temp, origin)
    };
    if let Err(err) = result {
        error!(%err, "failed to return buffer-writer scratch buffer");
    }
}

/// Validate `offset`/`count` against a buffer of `len` bytes; returns `offset + count`
pub(super) fn check_range(len: Size, offset: Size, count: Size) -> StreamResult<Size> {
    if offset > len {
        return Err(StreamError::out_of_range(
            "offset",
            format!("{} is past the end of a {}-byte buffer", offset, len),
        ));
    }
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(end),
        _ => Err(StreamError::out_of_range(
            "count",
            format!("offset {} + count {} exceeds buffer length {}", offset, count, len),
        )),
    }
}
