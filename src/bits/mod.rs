//! Bit-level primitives: an immutable bit view and sequential cursors over it.

pub use self::reader::BitReader;
pub use self::writer::BitWriter;

mod reader;
mod writer;

use std::cmp::Ordering;

use bytes::Bytes;

use crate::error::Error;

/// Immutable view over a window of bits in a shared byte buffer.
///
/// Slicing produces a new view over the same buffer without copying.
/// Equality, ordering and hashing are bitwise over the addressed window,
/// so the lexicographic order of equal-width bitstrings is the
/// key-bit-pattern order used by the dictionary codec.
#[derive(Clone)]
pub struct BitString {
    data: Bytes,
    offset: usize,
    len: usize,
}

impl BitString {
    /// Constructs a new view over the `len` bits starting at the `offset`.
    pub fn new(data: Bytes, offset: usize, len: usize) -> Result<Self, Error> {
        if offset + len > data.len() * 8 {
            return Err(Error::OutOfRange);
        }
        Ok(Self { data, offset, len })
    }

    /// Constructs a view over all bits of the buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() * 8;
        Self {
            data,
            offset: 0,
            len,
        }
    }

    /// Constructs an empty view.
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            offset: 0,
            len: 0,
        }
    }

    /// Constructs a view of `len` equal bits.
    pub fn uniform(bit: bool, len: usize) -> Self {
        let byte = if bit { 0xff } else { 0x00 };
        Self {
            data: Bytes::from(vec![byte; len.div_ceil(8)]),
            offset: 0,
            len,
        }
    }

    /// Returns the length of the view in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the view contains no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at the specified index within the window.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index < self.len {
            let index = self.offset + index;
            let byte = *self.data.get(index / 8)?;
            Some((byte >> (7 - index % 8)) & 1 != 0)
        } else {
            None
        }
    }

    /// Returns a small subset of `bits` (0..=8) starting from the `offset`,
    /// right-aligned in the result.
    pub fn get_bits_u8(&self, offset: usize, bits: u8) -> Option<u8> {
        debug_assert!(bits <= 8);

        let bits = bits as usize;
        if offset + bits > self.len {
            return None;
        }
        if bits == 0 {
            return Some(0);
        }

        let index = self.offset + offset;
        let r = index % 8;
        let q = index / 8;
        let byte = *self.data.get(q)?;

        if r == 0 {
            // xxx_____ -> _____xxx
            Some(byte >> (8 - bits))
        } else if bits <= 8 - r {
            // __xxx___ -> _____xxx
            Some((byte >> (8 - r - bits)) & ((1 << bits) - 1))
        } else {
            // ______xx|y_______ -> _____xxy
            let mut res = (byte as u16) << 8;
            res |= *self.data.get(q + 1)? as u16;
            Some((res >> (8 - r)) as u8 >> (8 - bits))
        }
    }

    /// Returns a new view over a subrange of this one, sharing the buffer.
    pub fn substring(&self, offset: usize, len: usize) -> Result<Self, Error> {
        if offset + len > self.len {
            return Err(Error::OutOfRange);
        }
        Ok(Self {
            data: self.data.clone(),
            offset: self.offset + offset,
            len,
        })
    }

    /// Returns the length of the longest common prefix of two views.
    pub fn common_prefix_len(&self, other: &Self) -> usize {
        let max = std::cmp::min(self.len, other.len);
        let mut offset = 0;
        while offset < max {
            let take = std::cmp::min(8, max - offset) as u8;
            let a = self.get_bits_u8(offset, take).unwrap_or_default();
            let b = other.get_bits_u8(offset, take).unwrap_or_default();
            if a != b {
                let diff = (a ^ b) << (8 - take);
                return offset + diff.leading_zeros() as usize;
            }
            offset += take as usize;
        }
        max
    }

    /// Checks whether all bits are the same and returns that bit,
    /// or `None` if the view is empty or contains different bits.
    pub fn test_uniform(&self) -> Option<bool> {
        let first = self.get(0)?;
        let expected = if first { 0xff } else { 0x00 };

        let mut offset = 0;
        while offset < self.len {
            let take = std::cmp::min(8, self.len - offset) as u8;
            let chunk = self.get_bits_u8(offset, take)?;
            if chunk != expected >> (8 - take) {
                return None;
            }
            offset += take as usize;
        }
        Some(first)
    }
}

impl Default for BitString {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut offset = 0;
        while offset < self.len {
            let take = std::cmp::min(8, self.len - offset) as u8;
            if self.get_bits_u8(offset, take) != other.get_bits_u8(offset, take) {
                return false;
            }
            offset += take as usize;
        }
        true
    }
}

impl Eq for BitString {}

impl Ord for BitString {
    fn cmp(&self, other: &Self) -> Ordering {
        let max = std::cmp::min(self.len, other.len);
        let mut offset = 0;
        while offset < max {
            let take = std::cmp::min(8, max - offset) as u8;
            let a = self.get_bits_u8(offset, take).unwrap_or_default();
            let b = other.get_bits_u8(offset, take).unwrap_or_default();
            match a.cmp(&b) {
                Ordering::Equal => offset += take as usize,
                ord => return ord,
            }
        }
        self.len.cmp(&other.len)
    }
}

impl PartialOrd for BitString {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for BitString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        let mut offset = 0;
        while offset < self.len {
            let take = std::cmp::min(8, self.len - offset) as u8;
            state.write_u8(self.get_bits_u8(offset, take).unwrap_or_default());
            offset += take as usize;
        }
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.len {
            let bit = if self.get(i).unwrap_or_default() {
                '1'
            } else {
                '0'
            };
            ok!(std::fmt::Write::write_char(f, bit));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitString({self})")
    }
}
