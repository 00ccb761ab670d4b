//! Bounds-checked big-endian cursors over byte buffers
//!
//! [`ByteCursor`] reads and [`ByteWriter`] writes fixed-width integers and
//! floats, advancing themselves after every access. Running past the end of
//! the buffer is reported as [`Error::BufferExhausted`] rather than a panic.
//!
//! ```
//! # use swathio::cursor::{ByteCursor, ByteWriter};
//! # fn main() -> swathio::Result<()> {
//! let mut buf = [0u8; 6];
//! let mut w = ByteWriter::new(&mut buf);
//! w.put_i16(-2)?;
//! w.put_f32(1.5)?;
//!
//! let mut c = ByteCursor::new(&buf);
//! assert_eq!(c.get_i16()?, -2);
//! assert_eq!(c.get_f32()?, 1.5);
//! assert!(c.get_u8().is_err());
//! # Ok(()) }
//! ```
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// A reading cursor over a borrowed buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `buf`
    pub fn new(buf: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { buf, pos: 0 }
    }

    /// Create a cursor positioned at `offset`
    pub fn at(buf: &'a [u8], offset: usize) -> Result<ByteCursor<'a>> {
        if offset > buf.len() {
            return Err(Error::BufferExhausted {
                offset,
                needed: 0,
                len: buf.len(),
            });
        }
        Ok(ByteCursor { buf, pos: offset })
    }

    /// The current offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the buffer
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::BufferExhausted {
                offset: self.pos,
                needed: n,
                len: self.buf.len(),
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read `n` raw bytes
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read an unsigned byte
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a signed 16-bit integer
    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Read an unsigned 16-bit integer
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a signed 32-bit integer
    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Read an unsigned 32-bit integer
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Read a 32-bit float
    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Read a 64-bit float
    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }
}

/// A writing cursor over a borrowed, fixed-size buffer
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Create a writer positioned at the start of `buf`
    pub fn new(buf: &'a mut [u8]) -> ByteWriter<'a> {
        ByteWriter { buf, pos: 0 }
    }

    /// The current offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the buffer
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn slot(&mut self, n: usize) -> Result<&mut [u8]> {
        if self.remaining() < n {
            return Err(Error::BufferExhausted {
                offset: self.pos,
                needed: n,
                len: self.buf.len(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&mut self.buf[start..start + n])
    }

    /// Write raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.slot(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Write `n` zero bytes
    pub fn put_zeros(&mut self, n: usize) -> Result<()> {
        self.slot(n)?.fill(0);
        Ok(())
    }

    /// Write an unsigned byte
    pub fn put_u8(&mut self, v: u8) -> Result<()> {
        self.slot(1)?[0] = v;
        Ok(())
    }

    /// Write a signed 16-bit integer
    pub fn put_i16(&mut self, v: i16) -> Result<()> {
        BigEndian::write_i16(self.slot(2)?, v);
        Ok(())
    }

    /// Write an unsigned 16-bit integer
    pub fn put_u16(&mut self, v: u16) -> Result<()> {
        BigEndian::write_u16(self.slot(2)?, v);
        Ok(())
    }

    /// Write a signed 32-bit integer
    pub fn put_i32(&mut self, v: i32) -> Result<()> {
        BigEndian::write_i32(self.slot(4)?, v);
        Ok(())
    }

    /// Write an unsigned 32-bit integer
    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        BigEndian::write_u32(self.slot(4)?, v);
        Ok(())
    }

    /// Write a 32-bit float
    pub fn put_f32(&mut self, v: f32) -> Result<()> {
        BigEndian::write_f32(self.slot(4)?, v);
        Ok(())
    }

    /// Write a 64-bit float
    pub fn put_f64(&mut self, v: f64) -> Result<()> {
        BigEndian::write_f64(self.slot(8)?, v);
        Ok(())
    }
}
