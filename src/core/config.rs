/*!
 * Pool Configuration
 * Options fixed at manager construction
 */

use super::errors::{PoolError, PoolResult};
use super::limits::{
    DEFAULT_BLOCK_SIZE, DEFAULT_LARGE_BUFFER_MULTIPLE, DEFAULT_MAXIMUM_BUFFER_SIZE, UNBOUNDED,
};
use crate::pool::SizeClass;
use serde::{Deserialize, Serialize};

/// Buffer pool manager configuration
///
/// All ceilings use `0` for "unbounded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Size of every small-pool block
    pub block_size: usize,
    /// Size-class unit for large buffers
    pub large_buffer_multiple: usize,
    /// Largest buffer that will be pooled; must itself be a valid size class
    pub maximum_buffer_size: usize,
    /// Size classes are `multiple * 2^n` instead of `multiple * n`
    pub use_exponential_large_buffer: bool,
    /// Free bytes retained by the small pool before returned blocks are dropped
    pub maximum_small_pool_free_bytes: usize,
    /// Free bytes retained per large-pool bucket before returned buffers are dropped
    pub maximum_large_pool_free_bytes: usize,
    /// Hard ceiling on the capacity of any single stream
    pub maximum_stream_capacity: usize,
    /// Return superseded blocks/buffers immediately instead of at disposal
    ///
    /// Only safe when no caller keeps a buffer obtained from `get_buffer`
    /// across a later write that may grow the stream.
    pub aggressive_buffer_return: bool,
    /// Make `to_vec` fail instead of materializing an unpooled copy
    pub throw_on_to_array: bool,
    /// Zero blocks and buffers before they go back into the pool
    pub zero_out_buffer: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            large_buffer_multiple: DEFAULT_LARGE_BUFFER_MULTIPLE,
            maximum_buffer_size: DEFAULT_MAXIMUM_BUFFER_SIZE,
            use_exponential_large_buffer: false,
            maximum_small_pool_free_bytes: UNBOUNDED,
            maximum_large_pool_free_bytes: UNBOUNDED,
            maximum_stream_capacity: UNBOUNDED,
            aggressive_buffer_return: false,
            throw_on_to_array: false,
            zero_out_buffer: false,
        }
    }
}

impl PoolOptions {
    /// Options with explicit size parameters and everything else defaulted
    pub const fn new(
        block_size: usize,
        large_buffer_multiple: usize,
        maximum_buffer_size: usize,
        use_exponential_large_buffer: bool,
    ) -> Self {
        Self {
            block_size,
            large_buffer_multiple,
            maximum_buffer_size,
            use_exponential_large_buffer,
            maximum_small_pool_free_bytes: UNBOUNDED,
            maximum_large_pool_free_bytes: UNBOUNDED,
            maximum_stream_capacity: UNBOUNDED,
            aggressive_buffer_return: false,
            throw_on_to_array: false,
            zero_out_buffer: false,
        }
    }

    /// Load options from a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> PoolResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::InvalidConfiguration(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_free_limits(mut self, small_pool_bytes: usize, large_pool_bytes: usize) -> Self {
        self.maximum_small_pool_free_bytes = small_pool_bytes;
        self.maximum_large_pool_free_bytes = large_pool_bytes;
        self
    }

    pub fn with_maximum_stream_capacity(mut self, capacity: usize) -> Self {
        self.maximum_stream_capacity = capacity;
        self
    }

    pub fn with_aggressive_buffer_return(mut self, enabled: bool) -> Self {
        self.aggressive_buffer_return = enabled;
        self
    }

    pub fn with_throw_on_to_array(mut self, enabled: bool) -> Self {
        self.throw_on_to_array = enabled;
        self
    }

    pub fn with_zero_out_buffer(mut self, enabled: bool) -> Self {
        self.zero_out_buffer = enabled;
        self
    }

    /// Size-class strategy selected by these options
    #[inline]
    pub fn size_class(&self) -> SizeClass {
        if self.use_exponential_large_buffer {
            SizeClass::Exponential
        } else {
            SizeClass::Multiple
        }
    }

    /// Check the invariants between the size parameters
    pub fn validate(&self) -> PoolResult<()> {
        if self.block_size == 0 {
            return Err(PoolError::InvalidConfiguration(
                "block_size must be a positive number".into(),
            ));
        }

        if self.large_buffer_multiple == 0 {
            return Err(PoolError::InvalidConfiguration(
                "large_buffer_multiple must be a positive number".into(),
            ));
        }

        if self.maximum_buffer_size < self.block_size {
            return Err(PoolError::InvalidConfiguration(format!(
                "maximum_buffer_size ({}) must be at least block_size ({})",
                self.maximum_buffer_size, self.block_size
            )));
        }

        let strategy = self.size_class();
        if !strategy.is_valid_size(self.large_buffer_multiple, self.maximum_buffer_size) {
            return Err(PoolError::InvalidConfiguration(match strategy {
                SizeClass::Multiple => format!(
                    "maximum_buffer_size ({}) must be a multiple of large_buffer_multiple ({})",
                    self.maximum_buffer_size, self.large_buffer_multiple
                ),
                SizeClass::Exponential => format!(
                    "maximum_buffer_size ({}) must be large_buffer_multiple ({}) times a power of two",
                    self.maximum_buffer_size, self.large_buffer_multiple
                ),
            }));
        }

        Ok(())
    }
}
