/*!
 * Core Types
 * Common types used across pools and streams
 */

use smartstring::alias::String as InlineString;
use uuid::Uuid;

/// Size type for buffer operations
pub type Size = usize;

/// Fixed-length pooled byte block (always exactly `block_size` long)
pub type Block = Box<[u8]>;

/// Contiguous pooled byte buffer (length is always a valid size class)
pub type LargeBuffer = Box<[u8]>;

/// Opaque stream identity, used for diagnostics only
pub type StreamId = Uuid;

/// Free-form diagnostic tag attached to a stream
pub type Tag = InlineString;

/// Allocate a zeroed buffer of exactly `len` bytes
#[inline]
pub fn zeroed(len: Size) -> Box<[u8]> {
    vec![0u8; len].into_boxed_slice()
}
