/*!
 * Read-Only Sequence
 * Zero-copy, multi-segment view over a stream's content
 */

use crate::core::types::{Block, Size};
use bytes::Buf;

/// Iterator over the backing chunks that cover a byte range
pub(crate) struct Segments<'a> {
    source: Source<'a>,
    block_size: Size,
    pos: Size,
    end: Size,
}

enum Source<'a> {
    Contiguous(&'a [u8]),
    Blocks(&'a [Block]),
}

impl<'a> Segments<'a> {
    pub(crate) fn contiguous(buffer: &'a [u8], from: Size, count: Size) -> Self {
        Self {
            source: Source::Contiguous(buffer),
            block_size: buffer.len(),
            pos: from,
            end: from + count,
        }
    }

    pub(crate) fn blocks(blocks: &'a [Block], block_size: Size, from: Size, count: Size) -> Self {
        Self {
            source: Source::Blocks(blocks),
            block_size,
            pos: from,
            end: from + count,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let chunk = match self.source {
            Source::Contiguous(buffer) => &buffer[self.pos..self.end],
            Source::Blocks(blocks) => {
                let offset = self.pos % self.block_size;
                let n = (self.block_size - offset).min(self.end - self.pos);
                &blocks[self.pos / self.block_size][offset..offset + n]
            }
        };
        self.pos += chunk.len();
        Some(chunk)
    }
}

/// Borrowed view of `[0, length)` as a chain of chunks
///
/// Blocks appear in order, the last one trimmed to the stream's length. A
/// large-buffer stream yields a single chunk. The view borrows the stream, so
/// it cannot outlive it or observe later writes.
#[derive(Debug, Clone)]
pub struct ReadOnlySequence<'a> {
    segments: Vec<&'a [u8]>,
    front: usize,
    offset: Size,
    remaining: Size,
}

impl<'a> ReadOnlySequence<'a> {
    pub(crate) fn new(segments: Vec<&'a [u8]>) -> Self {
        let remaining = segments.iter().map(|s| s.len()).sum();
        Self {
            segments,
            front: 0,
            offset: 0,
            remaining,
        }
    }

    /// Bytes not yet consumed through `Buf`
    #[inline]
    pub fn len(&self) -> Size {
        self.remaining
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Number of chunks in the whole view
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// All chunks in order, regardless of how much has been consumed
    pub fn segments(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.segments.iter().copied()
    }

    /// Copy the unconsumed bytes into one vector
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.remaining);
        if let Some(first) = self.segments.get(self.front) {
            out.extend_from_slice(&first[self.offset..]);
            for segment in &self.segments[self.front + 1..] {
                out.extend_from_slice(segment);
            }
        }
        out
    }
}

impl Buf for ReadOnlySequence<'_> {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn chunk(&self) -> &[u8] {
        match self.segments.get(self.front) {
            Some(segment) => &segment[self.offset..],
            None => &[],
        }
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining,
            "cannot advance past the end of the sequence: {} > {}",
            cnt,
            self.remaining
        );
        self.remaining -= cnt;
        while cnt > 0 {
            let left = self.segments[self.front].len() - self.offset;
            if cnt < left {
                self.offset += cnt;
                return;
            }
            cnt -= left;
            self.front += 1;
            self.offset = 0;
        }
    }
}
