//! Sequential bit producer.

use num_bigint::{BigInt, BigUint};
use num_traits::Signed;

use super::BitString;
use crate::error::Error;

/// Bounded sequential producer of bits.
///
/// Every `write_*` method fails with [`Error::CapacityExceeded`] before
/// mutating any state when the requested width would cross the bound,
/// and with [`Error::TypeMismatch`] when a value does not fit its
/// declared width.
#[derive(Clone)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_len: usize,
    capacity: usize,
}

impl BitWriter {
    /// Constructs a new writer bounded by `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            capacity,
        }
    }

    /// Returns the number of bits written so far.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bits that can still be written.
    #[inline]
    pub fn spare_capacity(&self) -> usize {
        self.capacity - self.bit_len
    }

    #[inline]
    fn ensure(&self, bits: usize) -> Result<(), Error> {
        if bits > self.spare_capacity() {
            Err(Error::CapacityExceeded)
        } else {
            Ok(())
        }
    }

    fn push_bit(&mut self, bit: bool) {
        let q = self.bit_len / 8;
        let r = self.bit_len % 8;
        if r == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[q] |= 1 << (7 - r);
        }
        self.bit_len += 1;
    }

    /// Appends `bits` (0..=8) low bits of the `value`.
    fn push_small(&mut self, value: u8, bits: u8) {
        debug_assert!(bits <= 8);
        if bits == 0 {
            return;
        }
        let value = value << (8 - bits);

        let q = self.bit_len / 8;
        let r = self.bit_len % 8;
        if r == 0 {
            self.data.push(value);
        } else {
            self.data[q] |= value >> r;
            if bits as usize > 8 - r {
                self.data.push(value << (8 - r));
            }
        }
        self.bit_len += bits as usize;
        self.data.truncate(self.bit_len.div_ceil(8));
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<(), Error> {
        ok!(self.ensure(1));
        self.push_bit(bit);
        Ok(())
    }

    /// Appends `bits` zero bits.
    pub fn write_zeros(&mut self, bits: usize) -> Result<(), Error> {
        ok!(self.ensure(bits));
        self.bit_len += bits;
        self.data.resize(self.bit_len.div_ceil(8), 0);
        Ok(())
    }

    /// Appends all bits of the view.
    pub fn write_bits(&mut self, bits: &BitString) -> Result<(), Error> {
        ok!(self.ensure(bits.len()));
        let mut offset = 0;
        while offset < bits.len() {
            let take = std::cmp::min(8, bits.len() - offset) as u8;
            // The chunk is in range since `offset + take <= bits.len()`
            let chunk = bits.get_bits_u8(offset, take).unwrap_or_default();
            self.push_small(chunk, take);
            offset += take as usize;
        }
        Ok(())
    }

    /// Appends a `bits`-wide big-endian unsigned integer, `bits <= 64`.
    pub fn write_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        if bits > 64 {
            return Err(Error::InvalidData);
        }
        if bits < 64 && value >> bits != 0 {
            return Err(Error::TypeMismatch);
        }
        ok!(self.ensure(bits as usize));

        let mut remaining = bits;
        while remaining > 0 {
            let take = std::cmp::min(8, remaining);
            let chunk = (value >> (remaining - take)) as u8 & (0xffu16 >> (8 - take)) as u8;
            self.push_small(chunk, take as u8);
            remaining -= take;
        }
        Ok(())
    }

    /// Appends a `bits`-wide two's complement signed integer, `1 <= bits <= 64`.
    pub fn write_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::InvalidData);
        }
        if bits < 64 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(Error::TypeMismatch);
            }
        }
        ok!(self.ensure(bits as usize));

        let unsigned = if bits < 64 {
            value as u64 & ((1u64 << bits) - 1)
        } else {
            value as u64
        };
        let mut remaining = bits;
        while remaining > 0 {
            let take = std::cmp::min(8, remaining);
            let chunk = (unsigned >> (remaining - take)) as u8 & (0xffu16 >> (8 - take)) as u8;
            self.push_small(chunk, take as u8);
            remaining -= take;
        }
        Ok(())
    }

    /// Appends a `bits`-wide big-endian unsigned integer of arbitrary width.
    pub fn write_uint_big(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        if value.bits() > bits as u64 {
            return Err(Error::TypeMismatch);
        }
        ok!(self.ensure(bits as usize));
        for i in (0..bits as u64).rev() {
            self.push_bit(value.bit(i));
        }
        Ok(())
    }

    /// Appends a `bits`-wide two's complement signed integer of arbitrary width.
    pub fn write_int_big(&mut self, value: &BigInt, bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return Err(Error::InvalidData);
        }
        let bound = BigInt::from(1u8) << (bits - 1);
        if *value < -bound.clone() || *value >= bound {
            return Err(Error::TypeMismatch);
        }

        let unsigned = if value.is_negative() {
            (value + (BigInt::from(1u8) << bits))
                .to_biguint()
                .unwrap_or_default()
        } else {
            value.to_biguint().unwrap_or_default()
        };
        ok!(self.ensure(bits as usize));
        for i in (0..bits as u64).rev() {
            self.push_bit(unsigned.bit(i));
        }
        Ok(())
    }

    /// Appends whole bytes.
    pub fn write_buffer(&mut self, data: &[u8]) -> Result<(), Error> {
        ok!(self.ensure(data.len() * 8));
        if self.bit_len % 8 == 0 {
            self.data.extend_from_slice(data);
            self.bit_len += data.len() * 8;
        } else {
            for byte in data {
                self.push_small(*byte, 8);
            }
        }
        Ok(())
    }

    /// Snapshots the written bits into an immutable view.
    pub fn finish(self) -> BitString {
        let (data, bit_len) = self.into_parts();
        BitString::new(data.into(), 0, bit_len).unwrap_or_default()
    }

    /// Splits the writer into the zero-padded byte buffer and the bit length.
    pub(crate) fn into_parts(self) -> (Vec<u8>, usize) {
        debug_assert_eq!(self.data.len(), self.bit_len.div_ceil(8));
        (self.data, self.bit_len)
    }
}

impl std::fmt::Debug for BitWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitWriter")
            .field("bit_len", &self.bit_len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;

    #[test]
    fn writes_round_trip_through_reader() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(1023);
        writer.write_bit(true)?;
        writer.write_uint(0b1011, 4)?;
        writer.write_int(-3, 7)?;
        writer.write_buffer(&[0xde, 0xad])?;
        writer.write_uint_big(&BigUint::from(123456789u32), 100)?;

        let mut reader = BitReader::new(writer.finish());
        assert!(reader.load_bit()?);
        assert_eq!(reader.load_uint(4)?, 0b1011);
        assert_eq!(reader.load_int(7)?, -3);
        assert_eq!(reader.load_buffer(2)?, vec![0xde, 0xad]);
        assert_eq!(reader.load_uint_big(100)?, BigUint::from(123456789u32));
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    #[test]
    fn capacity_is_enforced_atomically() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(10);
        writer.write_uint(0xff, 8)?;
        assert!(matches!(
            writer.write_uint(0, 3),
            Err(Error::CapacityExceeded)
        ));
        assert_eq!(writer.bit_len(), 8);
        writer.write_uint(0b10, 2)?;
        assert!(matches!(writer.write_bit(true), Err(Error::CapacityExceeded)));
        Ok(())
    }

    #[test]
    fn width_checks() {
        let mut writer = BitWriter::new(1023);
        assert!(matches!(writer.write_uint(4, 2), Err(Error::TypeMismatch)));
        assert!(matches!(writer.write_int(2, 2), Err(Error::TypeMismatch)));
        assert!(matches!(writer.write_int(-3, 2), Err(Error::TypeMismatch)));
        assert!(writer.write_int(-2, 2).is_ok());
        assert!(matches!(
            writer.write_uint_big(&BigUint::from(16u8), 4),
            Err(Error::TypeMismatch)
        ));
        assert!(matches!(
            writer.write_int_big(&BigInt::from(-5), 3),
            Err(Error::TypeMismatch)
        ));
        assert_eq!(writer.bit_len(), 2);
    }

    #[test]
    fn negative_big_ints_use_twos_complement() -> anyhow::Result<()> {
        let mut writer = BitWriter::new(1023);
        writer.write_int_big(&BigInt::from(-1), 16)?;
        writer.write_int_big(&BigInt::from(-32768), 16)?;

        let mut reader = BitReader::new(writer.finish());
        assert_eq!(reader.load_uint(16)?, 0xffff);
        assert_eq!(reader.load_int_big(16)?, BigInt::from(-32768));
        Ok(())
    }
}
