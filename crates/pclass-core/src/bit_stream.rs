//! Bit-addressable stream used by the binary serializer.
//!
//! Values are packed least-significant bit first with no implicit
//! alignment: a 24-bit integer followed by a 1-bit boolean occupies exactly
//! 25 bits. The cursor can be moved with [`BitStream::seek`] so that headers
//! written early (such as object sizes) can be patched once the payload is
//! known, and so that readers can skip over data they cannot interpret.

use crate::StreamError;

/// Largest width accepted by a single read or write.
pub const MAX_BITS: u32 = 64;

/// A growable in-memory bit stream with a single read/write cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    /// Cursor, in bits.
    pos: usize,
    /// Number of meaningful bits in `data`.
    len: usize,
}

fn check_width(bits: u32) -> Result<(), StreamError> {
    if bits == 0 || bits > MAX_BITS {
        return Err(StreamError::InvalidWidth(bits));
    }
    Ok(())
}

impl BitStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream over existing bytes, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let data = bytes.into();
        let len = data.len() * 8;
        Self { data, pos: 0, len }
    }

    /// The underlying bytes. The final byte may be partially used.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the stream and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Total number of bits written to (or loaded into) the stream.
    pub fn len_bits(&self) -> usize {
        self.len
    }

    /// Check if the stream holds no data.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits left between the cursor and the end of the data.
    pub fn remaining_bits(&self) -> usize {
        self.len.saturating_sub(self.pos)
    }

    /// Current cursor position, in bits.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute bit position.
    pub fn seek(&mut self, pos: usize) -> Result<(), StreamError> {
        if pos > self.len {
            return Err(StreamError::SeekOutOfRange {
                target: pos,
                len: self.len,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, bits: usize) -> Result<(), StreamError> {
        self.seek(self.pos + bits)
    }

    /// Move the cursor to the next byte boundary, padding with zeros when
    /// writing past the current end.
    pub fn realign(&mut self) {
        let aligned = self.pos.div_ceil(8) * 8;
        if aligned > self.len {
            self.data.resize(aligned / 8, 0);
            self.len = aligned;
        }
        self.pos = aligned;
    }

    /// Write the low `bits` bits of `value` at the cursor.
    ///
    /// Writing before the end of the stream overwrites existing bits.
    pub fn write_bits(&mut self, value: u64, bits: u32) -> Result<(), StreamError> {
        check_width(bits)?;

        let end = self.pos + bits as usize;
        let needed = end.div_ceil(8);
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }

        let mut written = 0u32;
        while written < bits {
            let byte = self.pos / 8;
            let offset = (self.pos % 8) as u32;
            let chunk = (8 - offset).min(bits - written);
            let mask = ((1u16 << chunk) - 1) as u8;
            let part = ((value >> written) as u8) & mask;
            self.data[byte] = (self.data[byte] & !(mask << offset)) | (part << offset);
            self.pos += chunk as usize;
            written += chunk;
        }

        self.len = self.len.max(self.pos);
        Ok(())
    }

    /// Read `bits` bits at the cursor.
    pub fn read_bits(&mut self, bits: u32) -> Result<u64, StreamError> {
        check_width(bits)?;

        let remaining = self.remaining_bits();
        if bits as usize > remaining {
            return Err(StreamError::UnexpectedEof {
                needed: bits as usize,
                remaining,
            });
        }

        let mut value = 0u64;
        let mut read = 0u32;
        while read < bits {
            let byte = self.pos / 8;
            let offset = (self.pos % 8) as u32;
            let chunk = (8 - offset).min(bits - read);
            let mask = ((1u16 << chunk) - 1) as u8;
            let part = (self.data[byte] >> offset) & mask;
            value |= u64::from(part) << read;
            self.pos += chunk as usize;
            read += chunk;
        }
        Ok(value)
    }

    // === Fixed-width helpers ===

    /// Write a single bit.
    pub fn write_bool(&mut self, value: bool) -> Result<(), StreamError> {
        self.write_bits(u64::from(value), 1)
    }

    /// Read a single bit.
    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Write 8 bits.
    pub fn write_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.write_bits(u64::from(value), 8)
    }

    /// Read 8 bits.
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Write 16 bits.
    pub fn write_u16(&mut self, value: u16) -> Result<(), StreamError> {
        self.write_bits(u64::from(value), 16)
    }

    /// Read 16 bits.
    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        Ok(self.read_bits(16)? as u16)
    }

    /// Write 32 bits.
    pub fn write_u32(&mut self, value: u32) -> Result<(), StreamError> {
        self.write_bits(u64::from(value), 32)
    }

    /// Read 32 bits.
    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(self.read_bits(32)? as u32)
    }

    /// Write 64 bits.
    pub fn write_u64(&mut self, value: u64) -> Result<(), StreamError> {
        self.write_bits(value, 64)
    }

    /// Read 64 bits.
    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        self.read_bits(64)
    }

    /// Write raw bytes, 8 bits each, at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        bytes.iter().try_for_each(|b| self.write_u8(*b))
    }

    /// Read `count` raw bytes at the cursor.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, StreamError> {
        let remaining = self.remaining_bits();
        if count * 8 > remaining {
            return Err(StreamError::UnexpectedEof {
                needed: count * 8,
                remaining,
            });
        }
        (0..count).map(|_| self.read_u8()).collect()
    }
}
