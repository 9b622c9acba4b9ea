/*!
 * Buffer Writer
 *
 * Hands out regions that map directly onto stream storage when the request
 * fits in the current block (or the large buffer). A request that would
 * straddle blocks gets a pooled scratch buffer instead, which `advance`
 * copies in through the ordinary write path and returns to the pool.
 */

use super::recyclable::{return_temp, RecyclableStream};
use super::traits::BufferWriter;
use crate::core::errors::{StreamError, StreamResult};
use crate::core::types::Size;
use crate::pool::Origin;

impl BufferWriter for RecyclableStream {
    fn get_memory(&mut self, size_hint: Size) -> StreamResult<&mut [u8]> {
        self.check_disposed()?;
        let minimum = size_hint.max(1);
        let end = self.end_of(minimum)?;
        self.ensure_capacity(end)?;
        self.fill_gap();

        let origin = Some(Origin {
            id: self.id,
            tag: self.tag.as_ref(),
        });
        if let Some(previous) = self.writer_temp.take() {
            return_temp(&self.manager, previous, origin);
        }

        let position = self.position;
        if let Some(buffer) = &mut self.large_buffer {
            let region = &mut buffer[position..];
            self.writer_region = Some(region.len());
            return Ok(region);
        }

        let block_size = self.manager.block_size();
        let offset = position % block_size;
        if block_size - offset >= minimum {
            self.writer_region = Some(block_size - offset);
            return Ok(&mut self.blocks[position / block_size][offset..]);
        }

        let scratch = if minimum <= block_size {
            self.manager.acquire_block_for(origin)
        } else {
            self.manager.acquire_large_buffer_for(minimum, origin)?
        };
        Ok(&mut self.writer_temp.insert(scratch)[..])
    }

    fn advance(&mut self, count: Size) -> StreamResult<()> {
        self.check_disposed()?;

        if let Some(scratch) = self.writer_temp.take() {
            if count > scratch.len() {
                let available = scratch.len();
                self.writer_temp = Some(scratch);
                return Err(StreamError::InvalidAdvance { count, available });
            }
            let result = self.write_bytes(&scratch[..count]);
            return_temp(&self.manager, scratch, Some(self.origin()));
            return result;
        }

        if count == 0 {
            return Ok(());
        }
        let available = self.writer_region.take().unwrap_or(0);
        if count > available {
            if available > 0 {
                self.writer_region = Some(available);
            }
            return Err(StreamError::InvalidAdvance { count, available });
        }

        self.fill_gap();
        self.position += count;
        self.length = self.length.max(self.position);
        Ok(())
    }
}
