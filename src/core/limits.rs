/*!
 * Pool Limits and Constants
 *
 * Centralized location for pool defaults, platform bounds and ring sizes.
 *
 * ## Conventions
 * - Values are grouped by domain (blocks, large buffers, streams, observability)
 * - Performance-critical constants are marked with [PERF]
 * - A ceiling of `0` always means "unbounded"
 */

// =============================================================================
// SMALL POOL (BLOCKS)
// =============================================================================

/// Default size of a pooled block (128KB)
/// [PERF] Large enough that most streams fit in a handful of blocks,
/// small enough to stay out of the allocator's huge-page path
pub const DEFAULT_BLOCK_SIZE: usize = 128 * 1024;

// =============================================================================
// LARGE POOL (CONTIGUOUS BUFFERS)
// =============================================================================

/// Default size-class unit for large buffers (1MB)
pub const DEFAULT_LARGE_BUFFER_MULTIPLE: usize = 1024 * 1024;

/// Default largest pooled buffer (128MB)
/// Larger buffers are still handed out but never pooled
pub const DEFAULT_MAXIMUM_BUFFER_SIZE: usize = 128 * 1024 * 1024;

/// Largest contiguous allocation the platform can represent
/// Any single-buffer view of a stream is bounded by this
pub const MAX_ARRAY_LENGTH: usize = isize::MAX as usize;

/// Ceiling value meaning "no ceiling"
pub const UNBOUNDED: usize = 0;

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Event ring capacity (power of 2)
/// Oldest-first consumers see at most this many undrained events
pub const EVENT_RING_SIZE: usize = 4096;
