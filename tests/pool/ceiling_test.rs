/*!
 * Free-Byte Ceiling Tests
 */

use recyclable_stream::{BufferPoolManager, Collector, PoolError, PoolOptions};
use recyclable_stream::monitoring::{DiscardReason, Payload};
use std::sync::Arc;

#[test]
fn test_small_pool_ceiling_drops_excess_blocks() {
    let options = PoolOptions::new(1024, 4096, 16384, false).with_free_limits(2048, 0);
    let manager = BufferPoolManager::new(options).expect("Failed to create manager");
    let collector = Arc::new(Collector::new());
    manager.set_collector(Arc::clone(&collector));
    let mut events = collector.subscribe();

    let blocks: Vec<_> = (0..4).map(|_| manager.acquire_block()).collect();
    assert_eq!(manager.small_pool_in_use_size(), 4096);

    manager.release_blocks(blocks).expect("Failed to release blocks");
    assert_eq!(manager.small_pool_in_use_size(), 0);
    assert_eq!(manager.small_pool_free_size(), 2048);
    assert_eq!(manager.small_blocks_free(), 2);

    let discarded = events
        .drain()
        .into_iter()
        .filter(|e| {
            matches!(
                e.payload,
                Payload::BlockDiscarded {
                    reason: DiscardReason::EnoughFree,
                    ..
                }
            )
        })
        .count();
    assert_eq!(discarded, 1, "One discard notification per release batch");
}

#[test]
fn test_large_pool_ceiling_is_per_size_class() {
    let options = PoolOptions::new(1024, 4096, 16384, false).with_free_limits(0, 8192);
    let manager = BufferPoolManager::new(options).expect("Failed to create manager");

    let small: Vec<_> = (0..3)
        .map(|_| manager.acquire_large_buffer(4096).expect("Failed to acquire"))
        .collect();
    let big = manager.acquire_large_buffer(8192).expect("Failed to acquire");

    for buffer in small {
        manager.release_large_buffer(buffer).expect("Failed to release");
    }
    manager.release_large_buffer(big).expect("Failed to release");

    // Two 4 KiB buffers fit under the 4 KiB class ceiling, the third is dropped;
    // the 8 KiB class has its own allowance
    assert_eq!(manager.large_buffers_free(), 3);
    assert_eq!(manager.large_pool_free_size(), 4096 * 2 + 8192);
    assert_eq!(manager.large_pool_in_use_size(), 0);
}

#[test]
fn test_zero_out_on_return() {
    let options = PoolOptions::new(64, 256, 1024, false).with_zero_out_buffer(true);
    let manager = BufferPoolManager::new(options).expect("Failed to create manager");

    let mut block = manager.acquire_block();
    block.fill(0xAB);
    manager.release_block(block).expect("Failed to release block");
    let reused = manager.acquire_block();
    assert!(reused.iter().all(|&b| b == 0));

    let mut buffer = manager.acquire_large_buffer(256).expect("Failed to acquire");
    buffer.fill(0xCD);
    manager.release_large_buffer(buffer).expect("Failed to release");
    let reused = manager.acquire_large_buffer(256).expect("Failed to acquire");
    assert!(reused.iter().all(|&b| b == 0));
}

#[test]
fn test_mis_sized_block_rejected() {
    let manager = BufferPoolManager::new(PoolOptions::new(1024, 4096, 16384, false))
        .expect("Failed to create manager");
    let err = manager
        .release_block(vec![0u8; 1000].into_boxed_slice())
        .unwrap_err();
    assert_eq!(
        err,
        PoolError::InvalidBlockSize {
            expected: 1024,
            actual: 1000
        }
    );
    assert_eq!(manager.small_blocks_free(), 0);
}

#[test]
fn test_options_from_json() {
    let options = PoolOptions::from_json_str(
        r#"{
            "block_size": 4096,
            "large_buffer_multiple": 65536,
            "maximum_buffer_size": 1048576,
            "use_exponential_large_buffer": true,
            "maximum_small_pool_free_bytes": 1048576,
            "aggressive_buffer_return": true
        }"#,
    )
    .expect("Failed to parse options");
    let manager = BufferPoolManager::new(options).expect("Failed to create manager");
    assert_eq!(manager.block_size(), 4096);
    assert_eq!(manager.round_to_large_buffer_size(100_000).unwrap(), 131_072);
    assert!(manager.aggressive_buffer_return());
}
