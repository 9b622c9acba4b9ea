/*!
 * std::io integration
 */

use super::recyclable::RecyclableStream;
use std::io::{self, Read, Seek, SeekFrom, Write};

impl Read for RecyclableStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl Write for RecyclableStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.check_disposed()?)
    }
}

impl Seek for RecyclableStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_from(pos)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        self.check_disposed()?;
        Ok(self.position as u64)
    }
}
