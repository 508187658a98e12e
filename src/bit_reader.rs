//! Bit-level reading utilities for parsing SCTE-35 binary data.
//!
//! SCTE-35 packs most of its fields at arbitrary bit widths (33-bit PTS
//! values, 12-bit lengths, single-bit flags). [`BitReader`] walks a borrowed
//! byte buffer MSB-first and never modifies it.

use crate::error::DecodeError;

/// A cursor that extracts big-endian values at bit granularity.
pub(crate) struct BitReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    /// Bit position the furthest failed read would have reached.
    overrun: Option<usize>,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at bit 0 of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        BitReader {
            buffer,
            offset: 0,
            overrun: None,
        }
    }

    /// Reads the next `num_bits` (1..=32) as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedEof`] when fewer than `num_bits`
    /// remain. The cursor is left untouched in that case.
    pub fn read_bits(&mut self, num_bits: usize) -> Result<u32, DecodeError> {
        debug_assert!((1..=32).contains(&num_bits));
        Ok(self.read_wide(num_bits)? as u32)
    }

    /// Reads up to 64 bits, for the 33-bit PTS and 40/48-bit fields.
    pub fn read_wide(&mut self, num_bits: usize) -> Result<u64, DecodeError> {
        debug_assert!(num_bits <= 64);
        self.ensure(num_bits)?;

        let mut value: u64 = 0;
        let mut bits_read = 0;

        while bits_read < num_bits {
            let byte = self.buffer[self.offset / 8];
            let bit_offset = self.offset % 8;
            let bits_to_read = std::cmp::min(num_bits - bits_read, 8 - bit_offset);
            let mask = if bits_to_read >= 8 {
                0xFF
            } else {
                (1u8 << bits_to_read) - 1
            };
            let bits_value = (byte >> (8 - bit_offset - bits_to_read)) & mask;

            value = (value << bits_to_read) | (bits_value as u64);
            self.offset += bits_to_read;
            bits_read += bits_to_read;
        }

        Ok(value)
    }

    pub fn read_flag(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_bits(1)? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.read_bits(32)
    }

    /// Copies `len` whole bytes out of the buffer. The cursor must be
    /// byte aligned.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        debug_assert_eq!(self.offset % 8, 0);
        self.ensure(len.saturating_mul(8))?;
        let start = self.byte_position();
        let end = start + len;
        self.offset = end * 8;
        Ok(self.buffer[start..end].to_vec())
    }

    /// Advances past reserved bits.
    pub fn skip_bits(&mut self, num_bits: usize) -> Result<(), DecodeError> {
        self.ensure(num_bits)?;
        self.offset += num_bits;
        Ok(())
    }

    /// Floor of the bit cursor divided by 8.
    pub fn byte_position(&self) -> usize {
        self.offset / 8
    }

    pub fn bits_remaining(&self) -> usize {
        self.buffer.len() * 8 - self.offset
    }

    /// Whole bytes the reads so far asked for, counting a read that failed.
    pub fn bytes_required(&self) -> usize {
        self.overrun.unwrap_or(self.offset).div_ceil(8)
    }

    fn ensure(&mut self, num_bits: usize) -> Result<(), DecodeError> {
        if num_bits <= self.bits_remaining() {
            return Ok(());
        }
        let end = self.offset.saturating_add(num_bits);
        self.overrun = Some(self.overrun.map_or(end, |furthest| furthest.max(end)));
        Err(DecodeError::UnexpectedEof)
    }
}
