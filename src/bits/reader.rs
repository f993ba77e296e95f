//! Sequential bit consumer.

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

use super::BitString;
use crate::error::Error;

/// Cursor-based sequential consumer over a [`BitString`].
///
/// Every `load_*` method consumes bits and advances the cursor,
/// failing with [`Error::OutOfRange`] when the requested width exceeds
/// the remaining bits. The `preload_*` counterparts read the same data
/// from a disposable copy of the cursor, leaving this one untouched.
#[derive(Clone)]
pub struct BitReader {
    bits: BitString,
    offset: usize,
}

impl BitReader {
    /// Constructs a new reader positioned at the start of the view.
    pub fn new(bits: BitString) -> Self {
        Self { bits, offset: 0 }
    }

    /// Returns the number of bits left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.offset
    }

    /// Advances the cursor without reading.
    pub fn skip(&mut self, bits: usize) -> Result<(), Error> {
        if bits > self.remaining() {
            return Err(Error::OutOfRange);
        }
        self.offset += bits;
        Ok(())
    }

    /// Reads a single bit.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        match self.bits.get(self.offset) {
            Some(bit) => {
                self.offset += 1;
                Ok(bit)
            }
            None => Err(Error::OutOfRange),
        }
    }

    /// Reads a single bit without advancing the cursor.
    pub fn preload_bit(&self) -> Result<bool, Error> {
        self.clone().load_bit()
    }

    /// Reads `bits` bits as a new view sharing the buffer.
    pub fn load_bits(&mut self, bits: usize) -> Result<BitString, Error> {
        let result = ok!(self.bits.substring(self.offset, bits));
        self.offset += bits;
        Ok(result)
    }

    /// Reads `bits` bits without advancing the cursor.
    pub fn preload_bits(&self, bits: usize) -> Result<BitString, Error> {
        self.clone().load_bits(bits)
    }

    /// Reads a `bits`-wide big-endian unsigned integer, `bits <= 64`.
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        if bits > 64 {
            return Err(Error::InvalidData);
        }
        if bits as usize > self.remaining() {
            return Err(Error::OutOfRange);
        }

        let mut result = 0u64;
        let mut loaded = 0usize;
        while loaded < bits as usize {
            let take = std::cmp::min(8, bits as usize - loaded) as u8;
            // Offsets were checked above
            let chunk = self
                .bits
                .get_bits_u8(self.offset + loaded, take)
                .ok_or(Error::OutOfRange)?;
            result = (result << take) | chunk as u64;
            loaded += take as usize;
        }
        self.offset += bits as usize;
        Ok(result)
    }

    /// Reads a `bits`-wide unsigned integer without advancing the cursor.
    pub fn preload_uint(&self, bits: u16) -> Result<u64, Error> {
        self.clone().load_uint(bits)
    }

    /// Reads a `bits`-wide two's complement signed integer, `1 <= bits <= 64`.
    pub fn load_int(&mut self, bits: u16) -> Result<i64, Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::InvalidData);
        }
        let value = ok!(self.load_uint(bits));
        if bits == 64 {
            return Ok(value as i64);
        }
        // Sign-extend from the loaded width
        let shift = 64 - bits;
        Ok(((value << shift) as i64) >> shift)
    }

    /// Reads a `bits`-wide signed integer without advancing the cursor.
    pub fn preload_int(&self, bits: u16) -> Result<i64, Error> {
        self.clone().load_int(bits)
    }

    /// Reads a `bits`-wide big-endian unsigned integer of arbitrary width.
    pub fn load_uint_big(&mut self, bits: u16) -> Result<BigUint, Error> {
        if bits as usize > self.remaining() {
            return Err(Error::OutOfRange);
        }

        let mut result = BigUint::zero();
        let mut loaded = 0usize;
        while loaded < bits as usize {
            let take = std::cmp::min(8, bits as usize - loaded) as u8;
            let chunk = self
                .bits
                .get_bits_u8(self.offset + loaded, take)
                .ok_or(Error::OutOfRange)?;
            result = (result << take) | BigUint::from(chunk);
            loaded += take as usize;
        }
        self.offset += bits as usize;
        Ok(result)
    }

    /// Reads an arbitrary-width unsigned integer without advancing the cursor.
    pub fn preload_uint_big(&self, bits: u16) -> Result<BigUint, Error> {
        self.clone().load_uint_big(bits)
    }

    /// Reads a `bits`-wide two's complement signed integer of arbitrary width.
    pub fn load_int_big(&mut self, bits: u16) -> Result<BigInt, Error> {
        if bits == 0 {
            return Err(Error::InvalidData);
        }
        let unsigned = ok!(self.load_uint_big(bits));
        let negative = unsigned.bit(bits as u64 - 1);
        let mut result = BigInt::from(unsigned);
        if negative {
            result -= BigInt::from(1u8) << bits;
        }
        Ok(result)
    }

    /// Reads an arbitrary-width signed integer without advancing the cursor.
    pub fn preload_int_big(&self, bits: u16) -> Result<BigInt, Error> {
        self.clone().load_int_big(bits)
    }

    /// Reads `bytes` bytes, not necessarily byte-aligned in the source.
    pub fn load_buffer(&mut self, bytes: usize) -> Result<Vec<u8>, Error> {
        if bytes * 8 > self.remaining() {
            return Err(Error::OutOfRange);
        }
        let mut result = Vec::with_capacity(bytes);
        for i in 0..bytes {
            let byte = self
                .bits
                .get_bits_u8(self.offset + i * 8, 8)
                .ok_or(Error::OutOfRange)?;
            result.push(byte);
        }
        self.offset += bytes * 8;
        Ok(result)
    }

    /// Reads `bytes` bytes without advancing the cursor.
    pub fn preload_buffer(&self, bytes: usize) -> Result<Vec<u8>, Error> {
        self.clone().load_buffer(bytes)
    }

    /// Reads all remaining bits.
    pub fn load_remaining(&mut self) -> Result<BitString, Error> {
        self.load_bits(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_integer_reads() -> anyhow::Result<()> {
        let bits = BitString::from_bytes(vec![0b1011_0101, 0b1100_0011, 0b0101_0000]);
        let mut reader = BitReader::new(bits);

        assert!(reader.load_bit()?);
        assert_eq!(reader.load_uint(3)?, 0b011);
        assert_eq!(reader.load_uint(12)?, 0b0101_1100_0011);
        assert_eq!(reader.remaining(), 8);
        assert!(matches!(reader.load_uint(9), Err(Error::OutOfRange)));
        assert_eq!(reader.remaining(), 8);
        Ok(())
    }

    #[test]
    fn signed_reads_sign_extend() -> anyhow::Result<()> {
        let bits = BitString::from_bytes(vec![0b1110_0101]);
        let mut reader = BitReader::new(bits);
        assert_eq!(reader.load_int(3)?, -1);
        assert_eq!(reader.load_int(5)?, 0b00101);

        let bits = BitString::from_bytes(vec![0xff, 0xfe]);
        assert_eq!(BitReader::new(bits).load_int(16)?, -2);
        Ok(())
    }

    #[test]
    fn big_integer_reads() -> anyhow::Result<()> {
        let mut data = vec![0u8; 13];
        data[0] = 0x80;
        data[12] = 0x10;
        // 100 bits: a 1, 98 zeros, a 1
        let mut reader = BitReader::new(BitString::from_bytes(data));
        let value = reader.load_uint_big(100)?;
        assert_eq!(value, (BigUint::from(1u8) << 99u32) | BigUint::from(1u8));
        assert_eq!(reader.remaining(), 4);

        let mut reader = BitReader::new(BitString::from_bytes(vec![0xff; 10]));
        assert_eq!(reader.load_int_big(80)?, BigInt::from(-1));
        Ok(())
    }

    #[test]
    fn preload_leaves_cursor_unchanged() -> anyhow::Result<()> {
        let bits = BitString::from_bytes(vec![0xa5, 0x3c]);
        let mut reader = BitReader::new(bits);
        reader.skip(4)?;

        let before = reader.remaining();
        assert_eq!(reader.preload_uint(8)?, 0x53);
        assert!(!reader.preload_bit()?);
        assert_eq!(reader.preload_buffer(1)?, vec![0x53]);
        assert_eq!(reader.remaining(), before);

        assert_eq!(reader.load_uint(8)?, 0x53);
        assert_eq!(reader.remaining(), before - 8);
        Ok(())
    }
}
