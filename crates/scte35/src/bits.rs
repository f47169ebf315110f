//! MSB-first bit-level reader over a byte slice.

use crate::{Result, error::Scte35Error};

/// Cursor-based bit reader over an immutable byte buffer.
///
/// Multi-bit reads are defined as the big-endian concatenation of successive
/// single-bit reads. SCTE-35 fields are bit-packed, so this ordering is part
/// of the contract, not an implementation detail.
///
/// The reader is one-shot: there is no seeking or lookahead, only a single
/// forward cursor per buffer.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Absolute bit position of the cursor.
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// Total number of bits in the underlying buffer.
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8
    }

    /// Read a single bit, MSB first.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(Scte35Error::OutOfData {
                bit: self.position(),
                total: self.bit_len(),
            });
        }
        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1 == 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit)
    }

    /// Advance the cursor by `n` bits without producing a value.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Read `n <= 32` bits as a big-endian unsigned value.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(Scte35Error::BitWidth(n));
        }
        Ok(self.read_bits_long(n)? as u32)
    }

    /// Read `n <= 64` bits as a big-endian unsigned value.
    pub fn read_bits_long(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(Scte35Error::BitWidth(n));
        }
        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bits_msb_first() {
        let mut reader = BitReader::new(&[0b1010_0011]);
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(4).unwrap(), 0b0011);
    }

    #[test]
    fn multi_bit_reads_cross_byte_boundaries() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(4).unwrap(), 0xD);
        assert_eq!(reader.read_bits(12).unwrap(), 0xEAD);
        assert_eq!(reader.read_bits(16).unwrap(), 0xBEEF);
        assert_eq!(reader.position(), 32);
    }

    #[test]
    fn arbitrary_width_sequence_reconstructs_value() {
        // 0x1FFFFFFFF spread across a 33-bit read, as pts fields are.
        let data = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x80];
        let mut reader = BitReader::new(&data);
        reader.skip_bits(7).unwrap();
        assert_eq!(reader.read_bits_long(33).unwrap(), 0x1_FFFF_FFFF);
        assert!(reader.read_bit().unwrap());
    }

    #[test]
    fn reading_past_end_fails_with_out_of_data() {
        let mut reader = BitReader::new(&[0xFF]);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(
            reader.read_bit(),
            Err(Scte35Error::OutOfData { bit: 8, total: 8 })
        ));
        // A wide read that straddles the end also fails.
        let mut reader = BitReader::new(&[0xFF]);
        reader.skip_bits(4).unwrap();
        assert!(matches!(
            reader.read_bits(8),
            Err(Scte35Error::OutOfData { .. })
        ));
    }

    #[test]
    fn rejects_oversized_widths() {
        let mut reader = BitReader::new(&[0; 16]);
        assert_eq!(reader.read_bits(33), Err(Scte35Error::BitWidth(33)));
        assert_eq!(reader.read_bits_long(65), Err(Scte35Error::BitWidth(65)));
        // Failed width checks must not move the cursor.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn empty_buffer_has_no_bits() {
        let mut reader = BitReader::new(&[]);
        assert!(matches!(
            reader.read_bit(),
            Err(Scte35Error::OutOfData { bit: 0, total: 0 })
        ));
    }
}
