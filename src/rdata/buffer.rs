//! Cursor over an XDR (big-endian) serialization stream.

use super::error::{RDataError, Result};

pub struct XdrBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XdrBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Read a sub-slice of `n` bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.read_bytes(8)?;
        Ok(f64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Vector length; `-1` escapes to a 64-bit length split over two words.
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        if len >= 0 {
            return Ok(len as usize);
        }
        if len != -1 {
            return Err(RDataError::BadLength(len as i64));
        }
        let upper = self.read_u32()? as u64;
        let lower = self.read_u32()? as u64;
        let long = (upper << 32) | lower;
        usize::try_from(long).map_err(|_| RDataError::BadLength(long as i64))
    }

    /// Vector length for elements that take at least `min_elem_size` bytes each.
    /// Fails before any allocation when the stream is too short to hold them.
    pub fn read_count(&mut self, min_elem_size: usize) -> Result<usize> {
        let len = self.read_length()?;
        let need = len.checked_mul(min_elem_size).unwrap_or(usize::MAX);
        self.ensure(need)?;
        Ok(len)
    }

    /// Check that `n` bytes remain before reading them.
    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(RDataError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}
