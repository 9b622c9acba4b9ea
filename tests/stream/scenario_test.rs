/*!
 * Stream Scenario Tests
 * End-to-end write, grow and view
 */

use recyclable_stream::{BufferPoolManager, PoolOptions};
use std::io::Write;

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("recyclable_stream=trace"))
        .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
        .try_init();
}

#[test]
fn test_three_writes_span_three_blocks() {
    init_tracing();
    let manager = BufferPoolManager::new(PoolOptions::new(1024, 4096, 16384, false))
        .expect("Failed to create manager");
    let mut stream = manager.get_stream().expect("Failed to create stream");

    let content: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
    stream.write_all(&content[..1000]).expect("Failed to write chunk 1");
    stream.write_all(&content[1000..2000]).expect("Failed to write chunk 2");
    stream.write_all(&content[2000..]).expect("Failed to write chunk 3");

    assert_eq!(stream.length(), 2500);
    assert_eq!(stream.position(), 2500);
    assert_eq!(stream.capacity(), 3072);
    assert_eq!(stream.block_count(), 3);

    let buffer = stream.get_buffer().expect("Failed to get buffer");
    assert!(buffer.len() >= 2500);
    assert_eq!(&buffer[..2500], &content[..]);
    println!("Contiguous view: {} bytes for 2500 bytes of content", buffer.len());
}

#[test]
fn test_seeded_stream_reads_back() {
    let manager = BufferPoolManager::default();
    let mut stream = manager
        .get_stream_from_slice(Some("seed"), b"copied in, not wrapped")
        .expect("Failed to create stream");

    assert_eq!(stream.position(), 0);
    assert_eq!(stream.tag(), Some("seed"));

    let mut out = vec![0u8; 64];
    let read = stream.read_bytes(&mut out).expect("Failed to read");
    assert_eq!(&out[..read], b"copied in, not wrapped");
}

#[test]
fn test_explicit_id_is_kept() {
    let manager = BufferPoolManager::default();
    let id = uuid::Uuid::new_v4();
    let stream = manager
        .get_stream_with_id(id, Some("explicit"))
        .expect("Failed to create stream");
    assert_eq!(stream.id(), id);
    assert_eq!(stream.tag(), Some("explicit"));
}

#[test]
fn test_capacity_hint_preallocates_blocks() {
    let manager = BufferPoolManager::new(PoolOptions::new(1024, 4096, 16384, false))
        .expect("Failed to create manager");
    let stream = manager
        .get_stream_with_capacity(None, 5000)
        .expect("Failed to create stream");
    assert_eq!(stream.block_count(), 5);
    assert_eq!(stream.capacity(), 5120);
    assert_eq!(stream.length(), 0);
}
