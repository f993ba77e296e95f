//! Cell construction.

use num_bigint::{BigInt, BigUint};
use smallvec::SmallVec;

use super::{Cell, CellSlice, CellType, Store, MAX_BIT_LEN, MAX_DEPTH, MAX_REF_COUNT};
use crate::address::StdAddr;
use crate::bits::{BitString, BitWriter};
use crate::error::Error;

/// Mutable accumulator which composes bits and child cells into a new [`Cell`].
///
/// Every store operation is atomic: it fails fast with
/// [`Error::CapacityExceeded`] and leaves the builder unchanged when it
/// would cross the 1023-bit or 4-reference ceiling. `build` consumes the
/// builder, so a spent builder cannot be reused.
pub struct CellBuilder {
    writer: BitWriter,
    references: SmallVec<[Cell; 4]>,
    cell_type: CellType,
}

impl Default for CellBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl CellBuilder {
    /// Constructs an empty cell builder.
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(MAX_BIT_LEN as usize),
            references: SmallVec::new(),
            cell_type: CellType::Ordinary,
        }
    }

    /// Returns the data size of this builder in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.writer.bit_len() as u16
    }

    /// Returns the number of bits that can still be stored.
    #[inline]
    pub fn spare_bits_capacity(&self) -> u16 {
        self.writer.spare_capacity() as u16
    }

    /// Returns the number of references that can still be stored.
    #[inline]
    pub fn spare_refs_capacity(&self) -> u8 {
        (MAX_REF_COUNT - self.references.len()) as u8
    }

    /// Returns the child cells stored so far.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.references
    }

    /// Marks the result as an exotic cell.
    #[inline]
    pub fn set_exotic(&mut self, is_exotic: bool) {
        self.cell_type = if is_exotic {
            CellType::Exotic
        } else {
            CellType::Ordinary
        };
    }

    /// Stores a single bit.
    #[inline]
    pub fn store_bit(&mut self, bit: bool) -> Result<(), Error> {
        self.writer.write_bit(bit)
    }

    /// Stores a single zero bit.
    #[inline]
    pub fn store_bit_zero(&mut self) -> Result<(), Error> {
        self.writer.write_bit(false)
    }

    /// Stores a single one bit.
    #[inline]
    pub fn store_bit_one(&mut self) -> Result<(), Error> {
        self.writer.write_bit(true)
    }

    /// Stores `bits` zero bits.
    #[inline]
    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        self.writer.write_zeros(bits as usize)
    }

    /// Stores a `bits`-wide big-endian unsigned integer, `bits <= 64`.
    #[inline]
    pub fn store_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        self.writer.write_uint(value, bits)
    }

    /// Stores a `bits`-wide two's complement signed integer, `bits <= 64`.
    #[inline]
    pub fn store_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        self.writer.write_int(value, bits)
    }

    /// Stores a `bits`-wide unsigned integer of arbitrary width.
    #[inline]
    pub fn store_uint_big(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        self.writer.write_uint_big(value, bits)
    }

    /// Stores a `bits`-wide signed integer of arbitrary width.
    #[inline]
    pub fn store_int_big(&mut self, value: &BigInt, bits: u16) -> Result<(), Error> {
        self.writer.write_int_big(value, bits)
    }

    /// Stores whole bytes.
    #[inline]
    pub fn store_buffer(&mut self, data: &[u8]) -> Result<(), Error> {
        self.writer.write_buffer(data)
    }

    /// Stores all bits of the view.
    #[inline]
    pub fn store_bits(&mut self, bits: &BitString) -> Result<(), Error> {
        self.writer.write_bits(bits)
    }

    /// Stores `bit_len` bits of raw data, ignoring any completion tag.
    pub fn store_raw(&mut self, data: &[u8], bit_len: u16) -> Result<(), Error> {
        let bits = ok!(BitString::new(
            bytes::Bytes::copy_from_slice(data),
            0,
            bit_len as usize
        ));
        self.writer.write_bits(&bits)
    }

    /// Stores a child cell reference.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(cell);
            Ok(())
        } else {
            Err(Error::CapacityExceeded)
        }
    }

    /// Stores `Some` as a one bit and a reference, `None` as a zero bit.
    pub fn store_maybe_reference(&mut self, cell: Option<Cell>) -> Result<(), Error> {
        match cell {
            Some(cell) => {
                if self.writer.spare_capacity() < 1 || self.references.len() >= MAX_REF_COUNT {
                    return Err(Error::CapacityExceeded);
                }
                ok!(self.writer.write_bit(true));
                self.store_reference(cell)
            }
            None => self.writer.write_bit(false),
        }
    }

    /// Stores the unconsumed remainder of the slice: its bits and references.
    pub fn store_slice(&mut self, slice: &CellSlice) -> Result<(), Error> {
        if self.writer.spare_capacity() < slice.remaining_bits() as usize
            || self.spare_refs_capacity() < slice.remaining_refs()
        {
            return Err(Error::CapacityExceeded);
        }

        let mut slice = slice.clone();
        let bits = ok!(slice.load_bits(slice.remaining_bits() as usize));
        ok!(self.writer.write_bits(&bits));
        while slice.remaining_refs() > 0 {
            ok!(self.store_reference(ok!(slice.load_reference())));
        }
        Ok(())
    }

    /// Stores all bits and references of another builder.
    pub fn store_builder(&mut self, other: &CellBuilder) -> Result<(), Error> {
        if self.writer.spare_capacity() < other.writer.bit_len()
            || self.spare_refs_capacity() < other.references.len() as u8
        {
            return Err(Error::CapacityExceeded);
        }

        let bits = other.writer.clone().finish();
        ok!(self.writer.write_bits(&bits));
        for cell in &other.references {
            ok!(self.store_reference(cell.clone()));
        }
        Ok(())
    }

    /// Stores an internal address, `None` as the two-bit `addr_none` tag.
    pub fn store_address(&mut self, address: Option<&StdAddr>) -> Result<(), Error> {
        match address {
            Some(address) => {
                if self.writer.spare_capacity() < StdAddr::BITS as usize {
                    return Err(Error::CapacityExceeded);
                }
                address.store_into(self)
            }
            None => self.writer.write_uint(0, 2),
        }
    }

    /// Stores a value using its [`Store`] implementation.
    #[inline]
    pub fn store<T: Store>(&mut self, value: &T) -> Result<(), Error> {
        value.store_into(self)
    }

    /// Snapshots the accumulated bits and references into an immutable cell.
    pub fn build(self) -> Result<Cell, Error> {
        let mut depth = 0u16;
        for child in &self.references {
            depth = std::cmp::max(depth, child.depth());
        }
        if !self.references.is_empty() && depth >= MAX_DEPTH {
            return Err(Error::DepthExceeded);
        }

        let (mut data, bit_len) = self.writer.into_parts();

        let rem = bit_len % 8;
        if rem > 0 {
            let last_byte = &mut data[bit_len / 8];

            // x0000000 - rem=1, tag_mask=01000000, data_mask=11000000
            // xxxxxxx0 - rem=7, tag_mask=00000001, data_mask=11111111
            let tag_mask: u8 = 1 << (7 - rem);
            let data_mask = !(tag_mask - 1);
            *last_byte = (*last_byte & data_mask) | tag_mask;
        }

        Ok(Cell::new_unchecked(
            self.cell_type,
            data.into(),
            bit_len as u16,
            self.references,
        ))
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBuilder")
            .field("bit_len", &self.bit_len())
            .field("references", &self.references.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_budget_is_enforced() -> anyhow::Result<()> {
        let mut builder = CellBuilder::new();
        builder.store_zeros(1020)?;
        assert!(matches!(
            builder.store_uint(0, 4),
            Err(Error::CapacityExceeded)
        ));
        assert_eq!(builder.bit_len(), 1020);
        builder.store_uint(0b101, 3)?;
        assert!(matches!(builder.store_bit_one(), Err(Error::CapacityExceeded)));
        assert!(builder.build().is_ok());
        Ok(())
    }

    #[test]
    fn ref_budget_is_enforced() -> anyhow::Result<()> {
        let mut builder = CellBuilder::new();
        for _ in 0..4 {
            builder.store_reference(Cell::empty())?;
        }
        assert!(matches!(
            builder.store_reference(Cell::empty()),
            Err(Error::CapacityExceeded)
        ));

        let cell = builder.build()?;
        assert_eq!(cell.reference_count(), 4);
        assert_eq!(cell.depth(), 1);
        Ok(())
    }

    #[test]
    fn store_slice_is_atomic() -> anyhow::Result<()> {
        let source = {
            let mut builder = CellBuilder::new();
            builder.store_uint(0xabcd, 16)?;
            builder.store_reference(Cell::empty())?;
            builder.build()?
        };
        let slice = source.begin_parse();

        let mut builder = CellBuilder::new();
        builder.store_zeros(1010)?;
        assert!(matches!(
            builder.store_slice(&slice),
            Err(Error::CapacityExceeded)
        ));
        assert_eq!(builder.bit_len(), 1010);
        assert_eq!(builder.references().len(), 0);

        let mut builder = CellBuilder::new();
        builder.store_slice(&slice)?;
        let rebuilt = builder.build()?;
        assert_eq!(rebuilt.bit_len(), 16);
        assert_eq!(rebuilt.reference_count(), 1);
        Ok(())
    }

    #[test]
    fn depth_ceiling() -> anyhow::Result<()> {
        let mut cell = Cell::empty();
        for _ in 0..MAX_DEPTH {
            let mut builder = CellBuilder::new();
            builder.store_reference(cell)?;
            cell = builder.build()?;
        }
        assert_eq!(cell.depth(), MAX_DEPTH);

        let mut builder = CellBuilder::new();
        builder.store_reference(cell)?;
        assert!(matches!(builder.build(), Err(Error::DepthExceeded)));
        Ok(())
    }

    #[test]
    fn completion_tag_padding() -> anyhow::Result<()> {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b00110, 5)?;
        let cell = builder.build()?;
        assert_eq!(cell.data(), &[0x34]);
        assert_eq!(cell.bit_len(), 5);

        let mut builder = CellBuilder::new();
        builder.store_uint(0x12, 8)?;
        let cell = builder.build()?;
        assert_eq!(cell.data(), &[0x12]);
        Ok(())
    }
}
