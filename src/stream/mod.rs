/*!
 * Recyclable Streams
 *
 * In-memory byte streams built on pooled storage:
 * - **recyclable**: the stream itself (growth, cursor, contiguous view, disposal)
 * - **io**: `std::io::{Read, Write, Seek}`
 * - **egress**: copies into writers, slices and async sinks
 * - **buffer_writer**: two-phase write API for serializers
 * - **sequence**: borrowed multi-segment view implementing `bytes::Buf`
 */

mod buffer_writer;
mod egress;
mod io;
mod recyclable;
mod sequence;
mod traits;

pub use recyclable::RecyclableStream;
pub use sequence::ReadOnlySequence;
pub use traits::BufferWriter;
