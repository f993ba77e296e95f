//! Read cursor over cell contents.

use num_bigint::{BigInt, BigUint};
use smallvec::SmallVec;

use super::{Cell, CellBuilder, Load};
use crate::address::StdAddr;
use crate::bits::{BitReader, BitString};
use crate::error::Error;

/// Sequential read cursor over the bits and references of a single cell.
///
/// A slice does not descend into children by itself: [`load_reference`]
/// returns the child cell, and parsing it requires an explicit
/// [`Cell::begin_parse`] on that child.
///
/// [`load_reference`]: CellSlice::load_reference
#[derive(Clone)]
pub struct CellSlice {
    reader: BitReader,
    references: SmallVec<[Cell; 4]>,
    refs_offset: usize,
}

impl CellSlice {
    /// Constructs a slice positioned at the start of the cell.
    pub fn new(cell: &Cell) -> Self {
        Self {
            reader: BitReader::new(cell.bits()),
            references: SmallVec::from(cell.references()),
            refs_offset: 0,
        }
    }

    /// Returns the number of bits left to read.
    #[inline]
    pub fn remaining_bits(&self) -> u16 {
        self.reader.remaining() as u16
    }

    /// Returns the number of references left to read.
    #[inline]
    pub fn remaining_refs(&self) -> u8 {
        (self.references.len() - self.refs_offset) as u8
    }

    /// Returns whether the slice has no bits and no references left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    /// Advances the bit cursor without reading.
    #[inline]
    pub fn skip(&mut self, bits: usize) -> Result<(), Error> {
        self.reader.skip(bits)
    }

    /// Reads a single bit.
    #[inline]
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        self.reader.load_bit()
    }

    /// Reads a single bit without advancing the cursor.
    #[inline]
    pub fn preload_bit(&self) -> Result<bool, Error> {
        self.reader.preload_bit()
    }

    /// Reads `bits` bits as a view sharing the underlying buffer.
    #[inline]
    pub fn load_bits(&mut self, bits: usize) -> Result<BitString, Error> {
        self.reader.load_bits(bits)
    }

    /// Reads `bits` bits without advancing the cursor.
    #[inline]
    pub fn preload_bits(&self, bits: usize) -> Result<BitString, Error> {
        self.reader.preload_bits(bits)
    }

    /// Reads a `bits`-wide big-endian unsigned integer, `bits <= 64`.
    #[inline]
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        self.reader.load_uint(bits)
    }

    /// Reads a `bits`-wide unsigned integer without advancing the cursor.
    #[inline]
    pub fn preload_uint(&self, bits: u16) -> Result<u64, Error> {
        self.reader.preload_uint(bits)
    }

    /// Reads a `bits`-wide two's complement signed integer, `1 <= bits <= 64`.
    #[inline]
    pub fn load_int(&mut self, bits: u16) -> Result<i64, Error> {
        self.reader.load_int(bits)
    }

    /// Reads a `bits`-wide signed integer without advancing the cursor.
    #[inline]
    pub fn preload_int(&self, bits: u16) -> Result<i64, Error> {
        self.reader.preload_int(bits)
    }

    /// Reads a `bits`-wide unsigned integer of arbitrary width.
    #[inline]
    pub fn load_uint_big(&mut self, bits: u16) -> Result<BigUint, Error> {
        self.reader.load_uint_big(bits)
    }

    /// Reads an arbitrary-width unsigned integer without advancing the cursor.
    #[inline]
    pub fn preload_uint_big(&self, bits: u16) -> Result<BigUint, Error> {
        self.reader.preload_uint_big(bits)
    }

    /// Reads a `bits`-wide signed integer of arbitrary width.
    #[inline]
    pub fn load_int_big(&mut self, bits: u16) -> Result<BigInt, Error> {
        self.reader.load_int_big(bits)
    }

    /// Reads an arbitrary-width signed integer without advancing the cursor.
    #[inline]
    pub fn preload_int_big(&self, bits: u16) -> Result<BigInt, Error> {
        self.reader.preload_int_big(bits)
    }

    /// Reads `bytes` bytes, not necessarily byte-aligned in the source.
    #[inline]
    pub fn load_buffer(&mut self, bytes: usize) -> Result<Vec<u8>, Error> {
        self.reader.load_buffer(bytes)
    }

    /// Reads `bytes` bytes without advancing the cursor.
    #[inline]
    pub fn preload_buffer(&self, bytes: usize) -> Result<Vec<u8>, Error> {
        self.reader.preload_buffer(bytes)
    }

    /// Reads all remaining bits.
    #[inline]
    pub fn load_remaining(&mut self) -> Result<BitString, Error> {
        self.reader.load_remaining()
    }

    /// Reads the remaining bits, following a single-reference
    /// continuation chain, as a UTF-8 string.
    pub fn load_string_tail(&mut self) -> Result<String, Error> {
        let mut bytes = Vec::new();
        ok!(self.load_tail_bytes(&mut bytes));
        match String::from_utf8(bytes) {
            Ok(string) => Ok(string),
            Err(_) => Err(Error::InvalidData),
        }
    }

    fn load_tail_bytes(&mut self, target: &mut Vec<u8>) -> Result<(), Error> {
        if self.remaining_bits() % 8 != 0 {
            return Err(Error::InvalidData);
        }
        target.extend(ok!(self.load_buffer(self.remaining_bits() as usize / 8)));
        if self.remaining_refs() == 1 {
            let next = ok!(self.load_reference());
            ok!(next.begin_parse().load_tail_bytes(target));
        }
        Ok(())
    }

    /// Reads a maybe-wrapped bit: `None` when the flag bit is zero.
    pub fn load_maybe_bit(&mut self) -> Result<Option<bool>, Error> {
        Ok(if ok!(self.load_bit()) {
            Some(ok!(self.load_bit()))
        } else {
            None
        })
    }

    /// Reads a maybe-wrapped `bits`-wide unsigned integer.
    pub fn load_maybe_uint(&mut self, bits: u16) -> Result<Option<u64>, Error> {
        Ok(if ok!(self.load_bit()) {
            Some(ok!(self.load_uint(bits)))
        } else {
            None
        })
    }

    /// Reads the next child cell reference.
    pub fn load_reference(&mut self) -> Result<Cell, Error> {
        match self.references.get(self.refs_offset) {
            Some(cell) => {
                self.refs_offset += 1;
                Ok(cell.clone())
            }
            None => Err(Error::NoMoreReferences),
        }
    }

    /// Returns the next child cell without advancing the reference cursor.
    pub fn preload_reference(&self) -> Result<Cell, Error> {
        match self.references.get(self.refs_offset) {
            Some(cell) => Ok(cell.clone()),
            None => Err(Error::NoMoreReferences),
        }
    }

    /// Reads a maybe-wrapped reference: `None` when the flag bit is zero.
    pub fn load_maybe_reference(&mut self) -> Result<Option<Cell>, Error> {
        Ok(if ok!(self.load_bit()) {
            Some(ok!(self.load_reference()))
        } else {
            None
        })
    }

    /// Reads an internal address.
    #[inline]
    pub fn load_address(&mut self) -> Result<StdAddr, Error> {
        StdAddr::load_from(self)
    }

    /// Reads an internal address without advancing the cursor.
    pub fn preload_address(&self) -> Result<StdAddr, Error> {
        self.clone().load_address()
    }

    /// Reads an internal address, mapping the `addr_none` tag to `None`.
    pub fn load_maybe_address(&mut self) -> Result<Option<StdAddr>, Error> {
        match ok!(self.preload_uint(2)) {
            0b00 => {
                ok!(self.skip(2));
                Ok(None)
            }
            0b10 => Ok(Some(ok!(StdAddr::load_from(self)))),
            _ => Err(Error::InvalidData),
        }
    }

    /// Reads a value using its [`Load`] implementation.
    #[inline]
    pub fn parse<T: Load>(&mut self) -> Result<T, Error> {
        T::load_from(self)
    }

    /// Requires the slice to be fully consumed.
    pub fn end_parse(&self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::NotFullyConsumed)
        }
    }

    /// Copies the unconsumed remainder into a new builder.
    pub fn as_builder(&self) -> Result<CellBuilder, Error> {
        let mut builder = CellBuilder::new();
        ok!(builder.store_slice(self));
        Ok(builder)
    }

    /// Copies the unconsumed remainder into a new cell.
    pub fn as_cell(&self) -> Result<Cell, Error> {
        ok!(self.as_builder()).build()
    }
}

impl std::fmt::Debug for CellSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellSlice")
            .field("remaining_bits", &self.remaining_bits())
            .field("remaining_refs", &self.remaining_refs())
            .finish()
    }
}
