//! Cell tree primitives.

pub use self::builder::CellBuilder;
pub use self::slice::CellSlice;

mod builder;
mod slice;

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use smallvec::SmallVec;

use crate::bits::BitString;
use crate::error::Error;

/// Maximum number of bits in a cell.
pub const MAX_BIT_LEN: u16 = 1023;
/// Maximum number of child references in a cell.
pub const MAX_REF_COUNT: usize = 4;
/// Maximum depth of a cell tree.
pub const MAX_DEPTH: u16 = 1024;

/// A 32-byte representation hash.
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HashBytes(pub [u8; 32]);

impl HashBytes {
    /// Returns the underlying bytes.
    #[inline]
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying array.
    #[inline]
    pub const fn as_array(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for HashBytes {
    #[inline]
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for HashBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for HashBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = [0u8; 64];
        hex::encode_to_slice(self.0, &mut output).ok();
        // SAFETY: output is guaranteed to contain only [0-9a-f]
        f.write_str(unsafe { std::str::from_utf8_unchecked(&output) })
    }
}

impl std::fmt::Debug for HashBytes {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Cell kind.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CellType {
    /// Cell of this type just stores data and references.
    #[default]
    Ordinary,
    /// Cell marked with the special flag in its descriptor.
    Exotic,
}

/// Tightly packed info about a cell.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CellDescriptor {
    /// First descriptor byte with a reference count and the exotic flag.
    pub d1: u8,
    /// Second descriptor byte with a rounded-up and rounded-down byte length.
    pub d2: u8,
}

impl CellDescriptor {
    const EXOTIC_MASK: u8 = 0b0000_1000;

    /// Constructs a descriptor from the cell parts.
    pub const fn compute(cell_type: CellType, bit_len: u16, ref_count: u8) -> Self {
        let mut d1 = ref_count;
        if matches!(cell_type, CellType::Exotic) {
            d1 |= Self::EXOTIC_MASK;
        }
        let d2 = (((bit_len + 7) / 8) + (bit_len / 8)) as u8;
        Self { d1, d2 }
    }

    /// Constructs a descriptor from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self {
            d1: bytes[0],
            d2: bytes[1],
        }
    }

    /// Computes the number of child references from the first byte.
    #[inline]
    pub const fn reference_count(&self) -> usize {
        (self.d1 & 0b111) as usize
    }

    /// Returns whether the special flag is set in the first byte.
    #[inline]
    pub const fn is_exotic(&self) -> bool {
        self.d1 & Self::EXOTIC_MASK != 0
    }

    /// Returns whether this cell's data is byte-aligned.
    #[inline]
    pub const fn is_aligned(&self) -> bool {
        self.d2 & 1 == 0
    }

    /// Computes the data length in bytes from the second byte.
    #[inline]
    pub const fn byte_len(&self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }
}

/// Computes the exact bit length of cell data, stripping the completion
/// tag from the last byte when the data is not aligned.
pub(crate) fn compute_bit_len(data: &[u8], aligned: bool) -> u16 {
    let mut length = data.len() as u16 * 8;
    if aligned {
        return length;
    }

    for x in data.iter().rev() {
        if *x == 0 {
            length -= 8;
        } else {
            length -= 1 + x.trailing_zeros() as u16;
            break;
        }
    }
    length
}

struct CellInner {
    cell_type: CellType,
    bit_len: u16,
    // Data padded to a byte boundary with a completion tag
    data: Bytes,
    references: SmallVec<[Cell; 4]>,
    meta: OnceLock<CellMeta>,
}

#[derive(Clone, Copy)]
struct CellMeta {
    repr_hash: HashBytes,
    depth: u16,
}

/// Immutable node of up to 1023 bits of data and up to 4 child references.
///
/// Cells form a directed acyclic graph with shared ownership: the same
/// child may be referenced by multiple parents. A cell is immutable after
/// construction, so its representation hash and depth are computed once,
/// lazily, and cached.
#[derive(Clone)]
pub struct Cell {
    inner: Arc<CellInner>,
}

impl Cell {
    /// Constructs an empty ordinary cell.
    pub fn empty() -> Self {
        Self::new_unchecked(CellType::Ordinary, Bytes::new(), 0, SmallVec::new())
    }

    /// Constructs a cell from already validated parts.
    ///
    /// `data` must be padded to a byte boundary with a completion tag
    /// when `bit_len` is not a multiple of 8.
    pub(crate) fn new_unchecked(
        cell_type: CellType,
        data: Bytes,
        bit_len: u16,
        references: SmallVec<[Cell; 4]>,
    ) -> Self {
        debug_assert!(bit_len <= MAX_BIT_LEN);
        debug_assert!(references.len() <= MAX_REF_COUNT);
        debug_assert_eq!(data.len(), (bit_len as usize).div_ceil(8));

        Self {
            inner: Arc::new(CellInner {
                cell_type,
                bit_len,
                data,
                references,
                meta: OnceLock::new(),
            }),
        }
    }

    /// Returns the cell kind.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.inner.cell_type
    }

    /// Returns whether the cell is marked as exotic.
    #[inline]
    pub fn is_exotic(&self) -> bool {
        matches!(self.inner.cell_type, CellType::Exotic)
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.inner.bit_len
    }

    /// Returns the cell data, tag-padded to a byte boundary.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Returns a view over the exact bits of the cell data.
    pub fn bits(&self) -> BitString {
        // The data length was validated on construction
        BitString::new(self.inner.data.clone(), 0, self.inner.bit_len as usize)
            .unwrap_or_default()
    }

    /// Returns the number of child references.
    #[inline]
    pub fn reference_count(&self) -> usize {
        self.inner.references.len()
    }

    /// Returns a reference to the Nth child cell.
    pub fn reference(&self, index: usize) -> Option<&Cell> {
        self.inner.references.get(index)
    }

    /// Returns the ordered child cells.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.inner.references
    }

    /// Computes the descriptor bytes of this cell.
    pub fn descriptor(&self) -> CellDescriptor {
        CellDescriptor::compute(
            self.inner.cell_type,
            self.inner.bit_len,
            self.inner.references.len() as u8,
        )
    }

    /// Returns the representation hash of the cell.
    pub fn repr_hash(&self) -> &HashBytes {
        &self.meta().repr_hash
    }

    /// Returns the depth of the cell tree: 0 for a cell without references,
    /// otherwise one more than the maximum child depth.
    pub fn depth(&self) -> u16 {
        self.meta().depth
    }

    /// Constructs a read cursor over this cell's bits and references.
    pub fn begin_parse(&self) -> CellSlice {
        CellSlice::new(self)
    }

    fn meta(&self) -> &CellMeta {
        self.inner.meta.get_or_init(|| {
            let descriptor = self.descriptor();

            let mut depth = 0u16;
            let mut hasher = Sha256::new();
            hasher.update([descriptor.d1, descriptor.d2]);
            hasher.update(&self.inner.data);
            for child in &self.inner.references {
                let child_depth = child.depth();
                // The builder rejects children at the depth ceiling
                depth = std::cmp::max(depth, child_depth.saturating_add(1));
                hasher.update(child_depth.to_be_bytes());
            }
            for child in &self.inner.references {
                hasher.update(child.repr_hash().as_slice());
            }

            CellMeta {
                repr_hash: HashBytes(hasher.finalize().into()),
                depth,
            }
        })
    }
}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner.as_ref(), other.inner.as_ref())
            || self.repr_hash() == other.repr_hash()
    }
}

impl Eq for Cell {}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("bit_len", &self.inner.bit_len)
            .field("references", &self.inner.references.len())
            .field("repr_hash", self.repr_hash())
            .finish()
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            hex::encode(&self.inner.data),
            self.inner.bit_len
        )
    }
}

/// A type which can be stored into a cell builder.
pub trait Store {
    /// Appends this value to the end of the builder data.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error>;
}

/// A type which can be loaded from a cell slice.
pub trait Load: Sized {
    /// Reads this value from the slice, advancing the cursor.
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error>;
}

impl Store for bool {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_bit(*self)
    }
}

impl Load for bool {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        slice.load_bit()
    }
}

macro_rules! impl_primitive_store_load {
    ($($ty:ty => $bits:literal),*$(,)?) => {
        $(impl Store for $ty {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.store_uint(*self as u64, $bits)
            }
        }

        impl Load for $ty {
            fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
                Ok(ok!(slice.load_uint($bits)) as $ty)
            }
        })*
    };
}

impl_primitive_store_load! {
    u8 => 8,
    u16 => 16,
    u32 => 32,
    u64 => 64,
}

impl Store for HashBytes {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_buffer(self.as_slice())
    }
}

impl Load for HashBytes {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let bytes = ok!(slice.load_buffer(32));
        // load_buffer returned exactly 32 bytes
        Ok(Self(bytes.try_into().unwrap_or_default()))
    }
}

impl<T: Store> Store for Option<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Some(value) => {
                ok!(builder.store_bit(true));
                value.store_into(builder)
            }
            None => builder.store_bit(false),
        }
    }
}

impl<T: Load> Load for Option<T> {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        Ok(if ok!(slice.load_bit()) {
            Some(ok!(T::load_from(slice)))
        } else {
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_hash() {
        // Known vector: sha256 of two zero descriptor bytes
        assert_eq!(
            Cell::empty().repr_hash().to_string(),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(Cell::empty().depth(), 0);
    }

    #[test]
    fn static_cell_hashes() -> anyhow::Result<()> {
        let mut builder = CellBuilder::new();
        builder.store_zeros(1023)?;
        let all_zeros = builder.build()?;
        assert_eq!(
            all_zeros.repr_hash().to_string(),
            "ba038d924da0b42c447662e6b8a53f15889ebdf9d3b2f01dbf942c29bc489871"
        );

        let mut builder = CellBuilder::new();
        builder.store_raw(&[0xff; 128], 1023)?;
        let all_ones = builder.build()?;
        assert_eq!(
            all_ones.repr_hash().to_string(),
            "82970d4664b7683c3d14d49b1f9ff34966128170301a7becc27af1adbe6a31c9"
        );
        Ok(())
    }

    #[test]
    fn hash_depends_on_all_parts() -> anyhow::Result<()> {
        let child = {
            let mut builder = CellBuilder::new();
            builder.store_uint(7, 8)?;
            builder.build()?
        };

        let build = |bits: u64, refs: &[Cell]| -> anyhow::Result<Cell> {
            let mut builder = CellBuilder::new();
            builder.store_uint(bits, 8)?;
            for cell in refs {
                builder.store_reference(cell.clone())?;
            }
            Ok(builder.build()?)
        };

        let a = build(1, &[child.clone()])?;
        let b = build(1, &[child.clone()])?;
        assert_eq!(a.repr_hash(), b.repr_hash());
        assert_eq!(a.depth(), 1);

        let c = build(2, &[child.clone()])?;
        assert_ne!(a.repr_hash(), c.repr_hash());

        let d = build(1, &[])?;
        assert_ne!(a.repr_hash(), d.repr_hash());
        assert_eq!(d.depth(), 0);
        Ok(())
    }

    #[test]
    fn descriptor_bytes() {
        let d = CellDescriptor::compute(CellType::Ordinary, 5, 2);
        assert_eq!(d.d1, 2);
        assert_eq!(d.d2, 1);
        assert!(!d.is_exotic());
        assert!(!d.is_aligned());
        assert_eq!(d.byte_len(), 1);

        let d = CellDescriptor::compute(CellType::Exotic, 16, 0);
        assert_eq!(d.d1, 0b1000);
        assert_eq!(d.d2, 4);
        assert!(d.is_exotic());
        assert!(d.is_aligned());
        assert_eq!(d.byte_len(), 2);

        assert_eq!(compute_bit_len(&[0x34], false), 5);
        assert_eq!(compute_bit_len(&[0x34], true), 8);
        assert_eq!(compute_bit_len(&[0x00, 0x80], false), 8);
    }
}
