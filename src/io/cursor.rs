//! Little-endian cursor over an in-memory record buffer.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

/// Bounds-checked reader for fixed-size little-endian fields.
///
/// Wraps [`std::io::Cursor`] so record parsers can read integers, borrow
/// raw byte runs, and seek both absolutely and relatively. Seeking past the
/// end is an [`io::ErrorKind::UnexpectedEof`] error rather than a silent
/// clamp, so truncated records surface at the point they are read.
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// Move to an absolute position within the buffer.
    pub fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.len() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.inner.set_position(pos);
        Ok(())
    }

    /// Move forward by `n` bytes.
    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        let pos = self
            .position()
            .checked_add(n)
            .ok_or(io::ErrorKind::UnexpectedEof)?;
        self.seek_to(pos)
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.inner.read_u16::<LittleEndian>()
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.inner.read_u32::<LittleEndian>()
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        self.inner.read_u64::<LittleEndian>()
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        let data: &'a [u8] = *self.inner.get_ref();
        let start = usize::try_from(self.position()).map_err(|_| io::ErrorKind::UnexpectedEof)?;
        let end = start.checked_add(n).ok_or(io::ErrorKind::UnexpectedEof)?;
        let bytes = data.get(start..end).ok_or(io::ErrorKind::UnexpectedEof)?;
        self.inner.set_position(end as u64);
        Ok(bytes)
    }

    /// Read a 4-byte record signature.
    pub fn read_signature(&mut self) -> io::Result<[u8; 4]> {
        let mut sig = [0u8; 4];
        sig.copy_from_slice(self.read_bytes(4)?);
        Ok(sig)
    }
}
