//! Key coders for typed dictionaries.

use num_bigint::{BigInt, BigUint};

use super::DictionaryKey;
use crate::address::StdAddr;
use crate::bits::{BitReader, BitString, BitWriter};
use crate::cell::HashBytes;
use crate::error::Error;

fn check_width(bits: &BitString, width: u16) -> Result<BitReader, Error> {
    if bits.len() != width as usize {
        return Err(Error::BitstringLengthMismatch);
    }
    Ok(BitReader::new(bits.clone()))
}

/// Unsigned integer key of a declared width, `1..=64` bits.
#[derive(Debug, Clone, Copy)]
pub struct UintKey {
    bits: u16,
}

impl UintKey {
    /// Constructs a coder for `bits`-wide keys.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryKey for UintKey {
    type Key = u64;

    #[inline]
    fn bit_width(&self) -> u16 {
        self.bits
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        let mut writer = BitWriter::new(self.bits as usize);
        ok!(writer.write_uint(*key, self.bits));
        Ok(writer.finish())
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        ok!(check_width(bits, self.bits)).load_uint(self.bits)
    }
}

/// Signed integer key of a declared width, `1..=64` bits.
#[derive(Debug, Clone, Copy)]
pub struct IntKey {
    bits: u16,
}

impl IntKey {
    /// Constructs a coder for `bits`-wide keys.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryKey for IntKey {
    type Key = i64;

    #[inline]
    fn bit_width(&self) -> u16 {
        self.bits
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        let mut writer = BitWriter::new(self.bits as usize);
        ok!(writer.write_int(*key, self.bits));
        Ok(writer.finish())
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        ok!(check_width(bits, self.bits)).load_int(self.bits)
    }
}

/// Unsigned integer key of an arbitrary declared width.
#[derive(Debug, Clone, Copy)]
pub struct BigUintKey {
    bits: u16,
}

impl BigUintKey {
    /// Constructs a coder for `bits`-wide keys.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryKey for BigUintKey {
    type Key = BigUint;

    #[inline]
    fn bit_width(&self) -> u16 {
        self.bits
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        let mut writer = BitWriter::new(self.bits as usize);
        ok!(writer.write_uint_big(key, self.bits));
        Ok(writer.finish())
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        ok!(check_width(bits, self.bits)).load_uint_big(self.bits)
    }
}

/// Signed integer key of an arbitrary declared width.
#[derive(Debug, Clone, Copy)]
pub struct BigIntKey {
    bits: u16,
}

impl BigIntKey {
    /// Constructs a coder for `bits`-wide keys.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryKey for BigIntKey {
    type Key = BigInt;

    #[inline]
    fn bit_width(&self) -> u16 {
        self.bits
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        let mut writer = BitWriter::new(self.bits as usize);
        ok!(writer.write_int_big(key, self.bits));
        Ok(writer.finish())
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        ok!(check_width(bits, self.bits)).load_int_big(self.bits)
    }
}

/// Internal address key, always 267 bits wide.
#[derive(Debug, Clone, Copy)]
pub struct AddressKey;

impl DictionaryKey for AddressKey {
    type Key = StdAddr;

    #[inline]
    fn bit_width(&self) -> u16 {
        StdAddr::BITS
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        let mut writer = BitWriter::new(StdAddr::BITS as usize);
        ok!(writer.write_uint(0b100, 3));
        ok!(writer.write_uint(key.workchain as u8 as u64, 8));
        ok!(writer.write_buffer(key.address.as_slice()));
        Ok(writer.finish())
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        let mut reader = ok!(check_width(bits, StdAddr::BITS));
        if ok!(reader.load_uint(3)) != 0b100 {
            return Err(Error::InvalidData);
        }
        let workchain = ok!(reader.load_uint(8)) as u8 as i8;
        let address = ok!(reader.load_buffer(32));
        Ok(StdAddr::new(
            workchain,
            HashBytes(address.try_into().unwrap_or_default()),
        ))
    }
}

/// Fixed-size byte buffer key.
#[derive(Debug, Clone, Copy)]
pub struct BufferKey {
    bytes: usize,
}

impl BufferKey {
    /// Constructs a coder for `bytes`-long keys.
    pub const fn new(bytes: usize) -> Self {
        Self { bytes }
    }
}

impl DictionaryKey for BufferKey {
    type Key = Vec<u8>;

    #[inline]
    fn bit_width(&self) -> u16 {
        (self.bytes * 8) as u16
    }

    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error> {
        if key.len() != self.bytes {
            return Err(Error::InvalidBufferSize);
        }
        Ok(BitString::from_bytes(key.clone()))
    }

    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error> {
        ok!(check_width(bits, self.bit_width())).load_buffer(self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_respect_their_width() -> anyhow::Result<()> {
        let coder = UintKey::new(8);
        assert!(matches!(coder.serialize(&256), Err(Error::TypeMismatch)));
        assert_eq!(coder.parse(&coder.serialize(&255)?)?, 255);

        let coder = IntKey::new(8);
        assert_eq!(coder.parse(&coder.serialize(&-128)?)?, -128);
        assert!(matches!(coder.serialize(&128), Err(Error::TypeMismatch)));

        assert!(matches!(
            UintKey::new(16).parse(&BitString::uniform(false, 8)),
            Err(Error::BitstringLengthMismatch)
        ));
        Ok(())
    }

    #[test]
    fn big_integer_keys() -> anyhow::Result<()> {
        let coder = BigUintKey::new(100);
        let key = BigUint::from(1u8) << 99u32;
        assert_eq!(coder.parse(&coder.serialize(&key)?)?, key);
        assert!(matches!(
            coder.serialize(&(BigUint::from(1u8) << 100u32)),
            Err(Error::TypeMismatch)
        ));

        let coder = BigIntKey::new(100);
        let key = BigInt::from(-1);
        let bits = coder.serialize(&key)?;
        assert_eq!(bits.test_uniform(), Some(true));
        assert_eq!(coder.parse(&bits)?, key);
        Ok(())
    }

    #[test]
    fn address_keys() -> anyhow::Result<()> {
        let coder = AddressKey;
        let addr = StdAddr::new(0, HashBytes([0xab; 32]));
        let bits = coder.serialize(&addr)?;
        assert_eq!(bits.len(), 267);
        assert_eq!(coder.parse(&bits)?, addr);
        Ok(())
    }

    #[test]
    fn buffer_keys_check_their_size() -> anyhow::Result<()> {
        let coder = BufferKey::new(4);
        assert!(matches!(
            coder.serialize(&vec![1, 2, 3]),
            Err(Error::InvalidBufferSize)
        ));
        let bits = coder.serialize(&vec![1, 2, 3, 4])?;
        assert_eq!(coder.parse(&bits)?, vec![1, 2, 3, 4]);
        Ok(())
    }
}
