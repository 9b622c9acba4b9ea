/*!
 * Size Class Tests
 * Large-buffer rounding under both strategies
 */

use proptest::prelude::*;
use recyclable_stream::{BufferPoolManager, PoolError, PoolOptions};

const MB: usize = 1_048_576;

fn default_manager(exponential: bool) -> BufferPoolManager {
    BufferPoolManager::new(PoolOptions {
        use_exponential_large_buffer: exponential,
        ..Default::default()
    })
    .expect("Default options should be valid")
}

#[test]
fn test_multiple_strategy_rounds_to_next_multiple() {
    let manager = default_manager(false);
    let buffer = manager
        .acquire_large_buffer(1_500_000)
        .expect("Failed to acquire large buffer");
    assert_eq!(buffer.len(), 2_097_152);
    manager
        .release_large_buffer(buffer)
        .expect("Failed to release large buffer");
}

#[test]
fn test_exponential_strategy_rounds_to_next_power() {
    let manager = default_manager(true);
    let buffer = manager
        .acquire_large_buffer(1_500_000)
        .expect("Failed to acquire large buffer");
    assert_eq!(buffer.len(), 2_097_152);
    manager
        .release_large_buffer(buffer)
        .expect("Failed to release large buffer");
}

#[test]
fn test_strategies_diverge_between_powers() {
    let multiple = default_manager(false);
    let exponential = default_manager(true);

    assert_eq!(multiple.round_to_large_buffer_size(1_048_577).unwrap(), 2 * MB);
    assert_eq!(exponential.round_to_large_buffer_size(1_048_577).unwrap(), 2 * MB);

    assert_eq!(multiple.round_to_large_buffer_size(3_145_729).unwrap(), 4 * MB);
    assert_eq!(exponential.round_to_large_buffer_size(3_145_729).unwrap(), 4 * MB);

    assert_eq!(multiple.round_to_large_buffer_size(3_000_000).unwrap(), 3_145_728);
    assert_eq!(exponential.round_to_large_buffer_size(3_000_000).unwrap(), 4_194_304);
}

#[test]
fn test_oversize_request_is_served_but_not_pooled() {
    let manager = BufferPoolManager::new(PoolOptions::new(1024, 4096, 16384, false))
        .expect("Failed to create manager");
    let buffer = manager
        .acquire_large_buffer(20_000)
        .expect("Oversize requests are still served");
    assert_eq!(buffer.len(), 20_480);
    assert_eq!(manager.large_pool_in_use_size(), 20_480);

    manager
        .release_large_buffer(buffer)
        .expect("Oversize buffers are accepted back");
    assert_eq!(manager.large_pool_in_use_size(), 0);
    assert_eq!(manager.large_pool_free_size(), 0);
    assert_eq!(manager.large_buffers_free(), 0);
}

#[test]
fn test_unrepresentable_request_fails() {
    let manager = default_manager(false);
    let err = manager.acquire_large_buffer(usize::MAX).unwrap_err();
    assert!(matches!(err, PoolError::CapacityExceeded { .. }));
}

#[test]
fn test_foreign_length_rejected() {
    let manager = default_manager(true);
    let foreign = vec![0u8; 3 * MB].into_boxed_slice();
    let err = manager.release_large_buffer(foreign).unwrap_err();
    assert_eq!(err, PoolError::InvalidLargeBufferSize { length: 3 * MB });
    assert!(!manager.is_large_buffer_size(3 * MB));
    assert!(manager.is_large_buffer_size(4 * MB));
}

fn is_smallest_class(exponential: bool, multiple: usize, required: usize, size: usize) -> bool {
    let smaller = if exponential { size / 2 } else { size - multiple };
    size == multiple || smaller < required
}

proptest! {
    #[test]
    fn prop_acquired_length_is_smallest_class(required in 1usize..=65_536, exponential in any::<bool>()) {
        let maximum = 65_536;
        let multiple = 1024;
        let manager = BufferPoolManager::new(PoolOptions::new(512, multiple, maximum, exponential))
            .expect("Failed to create manager");

        let buffer = manager.acquire_large_buffer(required).expect("Failed to acquire");
        let size = buffer.len();

        prop_assert!(size >= required);
        prop_assert!(manager.is_large_buffer_size(size));
        prop_assert!(is_smallest_class(exponential, multiple, required, size));

        manager.release_large_buffer(buffer).expect("Failed to release");
        prop_assert_eq!(manager.large_pool_in_use_size(), 0);
    }
}
