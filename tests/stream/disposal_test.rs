/*!
 * Disposal Tests
 * Double dispose, use after dispose and buffer return on drop
 */

use recyclable_stream::{
    BufferPoolManager, BufferWriter, Collector, Event, Payload, PoolOptions, StreamError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn manager() -> BufferPoolManager {
    BufferPoolManager::new(PoolOptions::new(1024, 4096, 16384, false))
        .expect("Failed to create manager")
}

#[test]
fn test_double_dispose_is_reported_not_raised() {
    let manager = manager();
    let collector = Arc::new(Collector::new());
    let disposed = Arc::new(AtomicUsize::new(0));
    let doubled = Arc::new(AtomicUsize::new(0));
    {
        let disposed = Arc::clone(&disposed);
        let doubled = Arc::clone(&doubled);
        collector.add_sink(Arc::new(move |event: &Event| match event.payload {
            Payload::StreamDisposed { .. } => {
                disposed.fetch_add(1, Ordering::Relaxed);
            }
            Payload::StreamDoubleDisposed => {
                doubled.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }));
    }
    manager.set_collector(collector);

    let mut stream = manager.get_stream().expect("Failed to create stream");
    stream.write_bytes(&[1u8; 3000]).expect("Failed to write");

    stream.dispose();
    let after_first = manager.stats();
    assert_eq!(after_first.small_pool_in_use_bytes, 0);
    assert_eq!(after_first.small_blocks_free, 3);

    stream.dispose();
    drop(stream);

    // No buffer went back twice
    assert_eq!(manager.stats(), after_first);
    assert_eq!(disposed.load(Ordering::Relaxed), 1);
    assert_eq!(doubled.load(Ordering::Relaxed), 1);
}

#[test]
fn test_operations_after_dispose_fail() {
    let manager = manager();
    let mut stream = manager.get_stream_from_slice(None, b"gone").unwrap();
    stream.dispose();
    assert!(stream.is_disposed());

    let mut buf = [0u8; 4];
    assert!(matches!(stream.write_bytes(b"x"), Err(StreamError::Disposed { .. })));
    assert!(matches!(stream.read_bytes(&mut buf), Err(StreamError::Disposed { .. })));
    assert!(matches!(stream.get_buffer(), Err(StreamError::Disposed { .. })));
    assert!(matches!(stream.to_vec(), Err(StreamError::Disposed { .. })));
    assert!(matches!(stream.set_length(1), Err(StreamError::Disposed { .. })));
    assert!(matches!(stream.get_memory(1), Err(StreamError::Disposed { .. })));
    assert!(stream.get_read_only_sequence().is_err());

    let io_err = std::io::Write::flush(&mut stream).unwrap_err();
    assert_eq!(io_err.kind(), std::io::ErrorKind::Other);
}

#[test]
fn test_drop_returns_every_buffer() {
    let manager = manager();
    {
        let mut stream = manager.get_stream().unwrap();
        stream.write_bytes(&[0u8; 2500]).unwrap();
        stream.get_buffer().unwrap();
        stream.write_bytes(&[0u8; 9000]).unwrap();

        // Leave a borrowed region uncommitted
        let region = stream.get_memory(3000).unwrap();
        region[0] = 1;

        let stats = manager.stats();
        assert!(stats.total_in_use_bytes() > 0);
    }

    let stats = manager.stats();
    println!("After drop: {:?}", stats);
    assert_eq!(stats.total_in_use_bytes(), 0);
    assert_eq!(stats.small_pool_free_bytes, 3 * 1024);
}
