/*!
 * Stream Egress
 *
 * Moving content out of a stream without materializing it: chunk-wise
 * copies into writers (sync and async), into caller slices, and the
 * borrowed multi-segment view. `to_vec` is the one operation that does
 * allocate an unpooled copy, and managers may forbid it.
 */

use super::recyclable::{check_range, RecyclableStream};
use super::sequence::ReadOnlySequence;
use crate::core::errors::{StreamError, StreamResult};
use crate::core::types::Size;
use crate::monitoring::{Category, Event, Payload, Severity};
use std::io::Write;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{instrument, warn};

impl RecyclableStream {
    /// Write the whole content to `dest`; the cursor is unchanged
    pub fn write_to<W: Write + ?Sized>(&self, dest: &mut W) -> StreamResult<()> {
        self.write_to_range(dest, 0, self.length)
    }

    /// Write `[offset, offset + count)` to `dest`; the cursor is unchanged
    pub fn write_to_range<W: Write + ?Sized>(
        &self,
        dest: &mut W,
        offset: Size,
        count: Size,
    ) -> StreamResult<()> {
        self.check_disposed()?;
        check_range(self.length, offset, count)?;
        for chunk in self.segments(offset, count) {
            dest.write_all(chunk)?;
        }
        Ok(())
    }

    /// Copy `[offset, offset + count)` into `dest[target_offset..]`
    pub fn write_to_slice(
        &self,
        dest: &mut [u8],
        offset: Size,
        count: Size,
        target_offset: Size,
    ) -> StreamResult<()> {
        self.check_disposed()?;
        check_range(self.length, offset, count)?;
        let end = check_range(dest.len(), target_offset, count)?;
        self.internal_read(&mut dest[target_offset..end], offset);
        Ok(())
    }

    /// Copy everything from the cursor to the end into `dest` and move the cursor to the end
    ///
    /// Returns the number of bytes copied.
    pub fn copy_to<W: Write + ?Sized>(&mut self, dest: &mut W) -> StreamResult<u64> {
        self.check_disposed()?;
        if self.position >= self.length {
            return Ok(0);
        }
        let count = self.length - self.position;
        for chunk in self.segments(self.position, count) {
            dest.write_all(chunk)?;
        }
        self.position = self.length;
        Ok(count as u64)
    }

    /// Async `copy_to`: chunks are written with `write_all` in order
    ///
    /// If the writer fails part way, the cursor stays where it was.
    pub async fn copy_to_async<W: AsyncWrite + Unpin + ?Sized>(
        &mut self,
        dest: &mut W,
    ) -> StreamResult<u64> {
        self.check_disposed()?;
        if self.position >= self.length {
            return Ok(0);
        }
        let count = self.length - self.position;
        for chunk in self.segments(self.position, count) {
            dest.write_all(chunk).await?;
        }
        self.position = self.length;
        Ok(count as u64)
    }

    /// Borrowed view of the whole content as ordered chunks
    pub fn get_read_only_sequence(&self) -> StreamResult<ReadOnlySequence<'_>> {
        self.check_disposed()?;
        Ok(ReadOnlySequence::new(self.segments(0, self.length).collect()))
    }

    /// Copy the content into a fresh, unpooled vector
    ///
    /// Fails with `Unsupported` when the manager sets `throw_on_to_array`.
    #[instrument(level = "trace", skip(self), fields(stream_id = %self.id))]
    pub fn to_vec(&self) -> StreamResult<Vec<u8>> {
        self.check_disposed()?;
        if self.manager.options().throw_on_to_array {
            warn!(stream_id = %self.id, tag = self.tag(), "to_vec refused by manager options");
            return Err(StreamError::Unsupported(
                "to_vec is disabled by this manager's throw_on_to_array option".into(),
            ));
        }

        let length = self.length;
        self.manager.emit(|| {
            Event::new(
                Severity::Debug,
                Category::Stream,
                Payload::StreamConvertedToArray { length },
            )
            .with_stream(self.id, self.tag.as_ref())
        });

        let mut out = vec![0u8; length];
        self.internal_read(&mut out, 0);
        Ok(out)
    }
}
