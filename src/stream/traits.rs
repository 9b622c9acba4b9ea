/*!
 * Stream Traits
 */

use crate::core::errors::StreamResult;
use crate::core::types::Size;

/// Two-phase writer: borrow a writable region, fill it, then commit
///
/// Serializers write straight into stream storage without an intermediate
/// buffer. Each `get_memory` supersedes the region handed out before it.
pub trait BufferWriter {
    /// Writable region of at least `max(size_hint, 1)` bytes at the cursor
    ///
    /// Nothing becomes part of the content until `advance` is called.
    fn get_memory(&mut self, size_hint: Size) -> StreamResult<&mut [u8]>;

    /// Same region as `get_memory`
    fn get_span(&mut self, size_hint: Size) -> StreamResult<&mut [u8]> {
        self.get_memory(size_hint)
    }

    /// Commit the first `count` bytes of the last region handed out
    fn advance(&mut self, count: Size) -> StreamResult<()>;

    /// Copy `data` through a borrowed region and commit it
    fn write_via_memory(&mut self, data: &[u8]) -> StreamResult<()> {
        let region = self.get_memory(data.len())?;
        region[..data.len()].copy_from_slice(data);
        self.advance(data.len())
    }
}
