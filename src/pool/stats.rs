/*!
 * Pool Statistics
 */

use crate::core::types::Size;
use serde::{Deserialize, Serialize};

/// Point-in-time byte accounting for both pools
///
/// Counters are read individually, so a snapshot taken while other threads
/// acquire or release may be momentarily inconsistent across fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub small_pool_free_bytes: Size,
    pub small_pool_in_use_bytes: Size,
    pub small_blocks_free: usize,
    pub large_pool_free_bytes: Size,
    pub large_pool_in_use_bytes: Size,
    pub large_buffers_free: usize,
}

impl PoolStats {
    pub fn total_free_bytes(&self) -> Size {
        self.small_pool_free_bytes + self.large_pool_free_bytes
    }

    pub fn total_in_use_bytes(&self) -> Size {
        self.small_pool_in_use_bytes + self.large_pool_in_use_bytes
    }
}
