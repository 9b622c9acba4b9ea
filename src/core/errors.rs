/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Pool operation result
pub type PoolResult<T> = Result<T, PoolError>;

/// Stream operation result
pub type StreamResult<T> = Result<T, StreamError>;

/// Buffer pool errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PoolError {
    #[error("Block has length {actual}, expected block size {expected}")]
    #[diagnostic(
        code(pool::invalid_block_size),
        help("Only blocks acquired from this manager can be returned to it.")
    )]
    InvalidBlockSize { expected: usize, actual: usize },

    #[error("Buffer of length {length} did not originate from this pool (not a valid size class)")]
    #[diagnostic(
        code(pool::invalid_large_buffer_size),
        help("Large buffers must be returned to the manager that handed them out.")
    )]
    InvalidLargeBufferSize { length: usize },

    #[error("Requested {requested} bytes exceeds the maximum of {maximum} bytes")]
    #[diagnostic(
        code(pool::capacity_exceeded),
        help("The request is larger than the largest contiguous buffer the platform can allocate.")
    )]
    CapacityExceeded { requested: usize, maximum: usize },

    #[error("Invalid pool configuration: {0}")]
    #[diagnostic(
        code(pool::invalid_configuration),
        help("Check block size, large buffer multiple and maximum buffer size.")
    )]
    InvalidConfiguration(String),
}

/// Stream errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StreamError {
    #[error("Stream {id} has been disposed")]
    #[diagnostic(
        code(stream::disposed),
        help("The stream returned its buffers to the pool and can no longer be used.")
    )]
    Disposed { id: String },

    #[error("Argument '{name}' out of range: {reason}")]
    #[diagnostic(code(stream::argument_out_of_range))]
    ArgumentOutOfRange { name: String, reason: String },

    #[error("Attempted to seek to {position}, before the beginning of the stream")]
    #[diagnostic(code(stream::seek_before_begin))]
    SeekBeforeBegin { position: i64 },

    #[error("Requested capacity {requested} exceeds the maximum of {maximum} bytes")]
    #[diagnostic(
        code(stream::out_of_memory),
        help("Raise the manager's maximum stream capacity or keep the stream in block mode.")
    )]
    OutOfMemory { requested: u64, maximum: usize },

    #[error("Unsupported operation: {0}")]
    #[diagnostic(code(stream::unsupported))]
    Unsupported(String),

    #[error("Cannot advance {count} bytes past a writable region of {available} bytes")]
    #[diagnostic(
        code(stream::invalid_advance),
        help("Advance by at most the length of the region returned by get_memory/get_span.")
    )]
    InvalidAdvance { count: usize, available: usize },

    #[error("I/O error: {0}")]
    #[diagnostic(code(stream::io))]
    Io(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pool(#[from] PoolError),
}

impl StreamError {
    pub(crate) fn out_of_range(name: &str, reason: impl Into<String>) -> Self {
        StreamError::ArgumentOutOfRange {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Io(err.to_string())
    }
}

// Allow StreamError to surface through the std::io traits
impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::ArgumentOutOfRange { .. }
            | StreamError::SeekBeforeBegin { .. }
            | StreamError::InvalidAdvance { .. } => io::ErrorKind::InvalidInput,
            StreamError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            StreamError::Unsupported(_) => io::ErrorKind::Unsupported,
            StreamError::Pool(PoolError::CapacityExceeded { .. }) => io::ErrorKind::OutOfMemory,
            StreamError::Pool(_) => io::ErrorKind::InvalidData,
            StreamError::Disposed { .. } | StreamError::Io(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
