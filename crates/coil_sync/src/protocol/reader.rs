//! # Byte Reader
//!
//! Bounds-checked big-endian reads over a borrowed frame.
//!
//! ## Design
//!
//! - Never allocates, never copies the frame
//! - Every short read is a hard `SyncError::Length`, never a silent default

use crate::error::{SyncError, SyncResult};

/// Cursor over a borrowed byte buffer.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Creates a reader positioned at `offset`.
    ///
    /// An offset past the end of the buffer is a length error. An offset equal
    /// to the length is allowed; the first read will fail instead.
    pub fn at(buffer: &'a [u8], offset: usize) -> SyncResult<Self> {
        if offset > buffer.len() {
            return Err(SyncError::Length {
                offset,
                needed: 1,
                available: 0,
            });
        }
        Ok(Self {
            buffer,
            position: offset,
        })
    }

    /// Current byte offset into the buffer.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Fails unless `needed` more bytes are available.
    #[inline]
    pub fn require(&self, needed: usize) -> SyncResult<()> {
        if self.remaining() < needed {
            return Err(SyncError::Length {
                offset: self.position,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrows the next `len` bytes and advances past them.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> SyncResult<&'a [u8]> {
        self.require(len)?;
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> SyncResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> SyncResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> SyncResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a u16 in big-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> SyncResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a u32 in big-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> SyncResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads an f32 in big-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> SyncResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }
}
