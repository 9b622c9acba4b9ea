/*!
 * Read/Write/Seek Tests
 */

use pretty_assertions::assert_eq;
use recyclable_stream::{BufferPoolManager, PoolOptions, StreamError};
use std::io::{Read, Seek, SeekFrom, Write};

fn manager() -> BufferPoolManager {
    BufferPoolManager::new(PoolOptions::new(16, 64, 256, false)).expect("Failed to create manager")
}

#[test]
fn test_read_clamps_to_remaining() {
    let manager = manager();
    let mut stream = manager
        .get_stream_from_slice(None, b"0123456789")
        .expect("Failed to create stream");
    stream.set_position(4).expect("Failed to seek");

    let mut buf = [0u8; 100];
    assert_eq!(stream.read_bytes(&mut buf).expect("Failed to read"), 6);
    assert_eq!(&buf[..6], b"456789");
    assert_eq!(stream.read_bytes(&mut buf).expect("Failed to read"), 0);

    stream.set_position(50).expect("Seeking past the end is allowed");
    assert_eq!(stream.read_bytes(&mut buf).expect("Failed to read"), 0);
    assert_eq!(stream.read_byte().expect("Failed to read"), None);
}

#[test]
fn test_read_range_and_write_range_validate() {
    let manager = manager();
    let mut stream = manager.get_stream().expect("Failed to create stream");

    let source = b"abcdefgh";
    stream.write_range(source, 2, 4).expect("Failed to write range");
    assert_eq!(stream.to_vec().unwrap(), b"cdef");

    let err = stream.write_range(source, 6, 4).unwrap_err();
    assert!(matches!(err, StreamError::ArgumentOutOfRange { .. }));
    let err = stream.write_range(source, 9, 0).unwrap_err();
    assert!(matches!(err, StreamError::ArgumentOutOfRange { .. }));

    stream.set_position(0).unwrap();
    let mut dest = [b'.'; 6];
    assert_eq!(stream.read_range(&mut dest, 1, 5).unwrap(), 4);
    assert_eq!(&dest, b".cdef.");
    assert!(stream.read_range(&mut dest, 4, 3).is_err());
}

#[test]
fn test_read_at_leaves_cursor_alone() {
    let manager = manager();
    let stream = manager
        .get_stream_from_slice(None, b"shared reader")
        .expect("Failed to create stream");

    let mut cursor = 7;
    let mut buf = [0u8; 3];
    assert_eq!(stream.read_at(&mut buf, &mut cursor).unwrap(), 3);
    assert_eq!(&buf, b"rea");
    assert_eq!(cursor, 10);
    assert_eq!(stream.read_at(&mut buf, &mut cursor).unwrap(), 3);
    assert_eq!(stream.read_at(&mut buf, &mut cursor).unwrap(), 0);
    assert_eq!(stream.position(), 0);
}

#[test]
fn test_writes_across_block_boundaries() {
    let manager = manager();
    let mut stream = manager.get_stream().expect("Failed to create stream");
    let data: Vec<u8> = (0..100).collect();

    for chunk in data.chunks(7) {
        stream.write_all(chunk).unwrap();
    }
    assert_eq!(stream.length(), 100);
    assert_eq!(stream.block_count(), 7);

    stream.seek(SeekFrom::Start(0)).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_overwrite_in_the_middle() {
    let manager = manager();
    let mut stream = manager
        .get_stream_from_slice(None, &[1u8; 40])
        .expect("Failed to create stream");
    stream.seek(SeekFrom::Start(14)).unwrap();
    stream.write_all(&[9u8; 4]).unwrap();

    assert_eq!(stream.length(), 40);
    let out = stream.to_vec().unwrap();
    assert_eq!(&out[12..20], &[1, 1, 9, 9, 9, 9, 1, 1]);
}

#[test]
fn test_write_past_end_zero_fills_gap() {
    let manager = manager();

    // Leave dirty content in the pool
    {
        let mut dirty = manager.get_stream().unwrap();
        dirty.write_all(&[0xEE; 32]).unwrap();
    }
    assert_eq!(manager.small_blocks_free(), 2);

    let mut stream = manager.get_stream().unwrap();
    stream.write_all(b"ab").unwrap();
    stream.seek(SeekFrom::Start(20)).unwrap();
    stream.write_all(b"z").unwrap();

    assert_eq!(stream.length(), 21);
    let out = stream.to_vec().unwrap();
    assert_eq!(&out[..2], b"ab");
    assert!(out[2..20].iter().all(|&b| b == 0));
    assert_eq!(out[20], b'z');
}

#[test]
fn test_set_length_truncates_and_extends() {
    let manager = manager();
    {
        let mut dirty = manager.get_stream().unwrap();
        dirty.write_all(&[0xEE; 16]).unwrap();
    }

    let mut stream = manager.get_stream_from_slice(None, b"0123456789").unwrap();
    stream.seek(SeekFrom::End(0)).unwrap();

    stream.set_length(4).unwrap();
    assert_eq!(stream.length(), 4);
    assert_eq!(stream.position(), 4);
    assert_eq!(stream.to_vec().unwrap(), b"0123");

    stream.set_length(8).unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"0123\0\0\0\0");

    stream.set_length(40).unwrap();
    assert_eq!(stream.length(), 40);
    assert_eq!(stream.capacity(), 48);
}

#[test]
fn test_seek_origins() {
    let manager = manager();
    let mut stream = manager.get_stream_from_slice(None, &[0u8; 30]).unwrap();

    assert_eq!(stream.seek(SeekFrom::End(-10)).unwrap(), 20);
    assert_eq!(stream.seek(SeekFrom::Current(5)).unwrap(), 25);
    assert_eq!(stream.seek(SeekFrom::Current(-25)).unwrap(), 0);
    assert_eq!(stream.seek(SeekFrom::End(10)).unwrap(), 40);
    // Seeking alone never grows the stream
    assert_eq!(stream.length(), 30);

    let err = stream.seek_from(SeekFrom::Current(-41)).unwrap_err();
    assert_eq!(err, StreamError::SeekBeforeBegin { position: -1 });
    assert_eq!(stream.position(), 40);
}

#[test]
fn test_position_bounded_by_stream_ceiling() {
    let options = PoolOptions::new(16, 64, 256, false).with_maximum_stream_capacity(128);
    let manager = BufferPoolManager::new(options).unwrap();
    let mut stream = manager.get_stream().unwrap();

    stream.set_position(128).unwrap();
    let err = stream.set_position(129).unwrap_err();
    assert!(matches!(err, StreamError::ArgumentOutOfRange { .. }));
}

#[test]
fn test_seek_past_stream_ceiling_defers_to_write() {
    let options = PoolOptions::new(16, 64, 256, false).with_maximum_stream_capacity(128);
    let manager = BufferPoolManager::new(options).unwrap();
    let mut stream = manager.get_stream().unwrap();

    assert_eq!(stream.seek_from(SeekFrom::Start(500)).expect("Seek is not bounded"), 500);
    assert_eq!(stream.position(), 500);

    let err = stream.write_byte(1).unwrap_err();
    assert!(matches!(err, StreamError::OutOfMemory { .. }));
    assert_eq!(stream.length(), 0);
}

#[test]
fn test_empty_write_is_a_no_op() {
    let manager = manager();
    let mut stream = manager.get_stream().unwrap();
    stream.set_position(10).unwrap();
    stream.write_bytes(&[]).unwrap();
    assert_eq!(stream.length(), 0);
    assert_eq!(stream.position(), 10);
}
