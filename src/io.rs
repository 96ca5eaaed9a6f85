//! Byte source / sink adapters.
//!
//! The core passes never touch `std::io` directly; they go through
//! [`CountingReader`], which is the "byte source" of the external
//! interface: sequential one-octet reads, plus the ability to rewind to
//! the beginning between the measurement and emission passes.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{ConvertError, ConvertResult};

/// Wraps any `Read` and tracks the absolute byte offset consumed so far.
///
/// The offset is threaded state, not a global — each recursive call in
/// the measurement/emission passes shares the same `&mut CountingReader`
/// rather than reading an ambient position variable.
pub struct CountingReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads exactly one octet, reporting truncation at the offset where
    /// the read was attempted.
    pub fn read_u8(&mut self) -> ConvertResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads exactly `buf.len()` octets, e.g. to skip or copy primitive
    /// content.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> ConvertResult<()> {
        let start = self.offset;
        self.inner
            .read_exact(buf)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => ConvertError::Truncation { offset: start },
                _ => ConvertError::Io(e),
            })?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Copies exactly `len` octets from the source to `sink`, advancing
    /// the offset. Used for primitive content, which is carried over
    /// byte-for-byte.
    pub fn copy_to(&mut self, sink: &mut impl Write, len: u64) -> ConvertResult<()> {
        let mut remaining = len;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.read_exact(&mut buf[..chunk])?;
            sink.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// Discards exactly `len` octets from the source without writing
    /// them anywhere (used by the measurement pass, which never writes).
    pub fn skip(&mut self, len: u64) -> ConvertResult<()> {
        let mut remaining = len;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.read_exact(&mut buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

impl<R: Read + Seek> CountingReader<R> {
    /// Resets the source to offset 0, ready for the emission pass to
    /// re-read everything the measurement pass already scanned.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.offset = 0;
        Ok(())
    }

    /// Total length of the underlying source, used by the driver to
    /// size whole-file mode.
    pub fn len(&mut self) -> io::Result<u64> {
        let current = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}
