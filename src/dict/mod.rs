//! Dictionary implementation.
//!
//! A dictionary is an ordered mapping from fixed-width bit keys to
//! arbitrary values, stored as a compressed binary trie of cells. Every
//! edge carries a label (a shared key prefix) and either terminates in a
//! leaf value or forks into exactly two children. The encoding is
//! canonical: one mapping has exactly one serialization, independent of
//! insertion order.

pub mod keys;
pub mod values;

use std::collections::BTreeMap;

use crate::bits::{BitString, BitWriter};
use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::error::Error;

/// Maps a typed key to and from its fixed-width bit pattern.
pub trait DictionaryKey {
    /// Decoded key type.
    type Key;

    /// Returns the key width in bits.
    fn bit_width(&self) -> u16;

    /// Encodes the key into exactly [`bit_width`] bits.
    ///
    /// [`bit_width`]: DictionaryKey::bit_width
    fn serialize(&self, key: &Self::Key) -> Result<BitString, Error>;

    /// Decodes a key from exactly [`bit_width`] bits.
    ///
    /// [`bit_width`]: DictionaryKey::bit_width
    fn parse(&self, bits: &BitString) -> Result<Self::Key, Error>;
}

/// Maps a typed value to and from a cell fragment of unconstrained width.
pub trait DictionaryValue {
    /// Decoded value type.
    type Value;

    /// Encodes the value into the builder.
    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error>;

    /// Decodes a value from the slice.
    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error>;
}

/// Typed dictionary with a fixed-width key.
///
/// Entries are kept sorted by key bit pattern, which is the canonical
/// traversal order of the serialized trie.
pub struct Dictionary<K: DictionaryKey, V: DictionaryValue> {
    key: K,
    value: V,
    entries: BTreeMap<BitString, (K::Key, V::Value)>,
}

impl<K: DictionaryKey, V: DictionaryValue> Dictionary<K, V> {
    /// Constructs an empty dictionary with the given coder pair.
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the dictionary contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the value associated with the key, returning the previous one.
    pub fn set(&mut self, key: K::Key, value: V::Value) -> Result<Option<V::Value>, Error> {
        let bits = ok!(self.serialize_key(&key));
        Ok(self
            .entries
            .insert(bits, (key, value))
            .map(|(_, value)| value))
    }

    /// Returns the value associated with the key.
    pub fn get(&self, key: &K::Key) -> Result<Option<&V::Value>, Error> {
        let bits = ok!(self.serialize_key(key));
        Ok(self.entries.get(&bits).map(|(_, value)| value))
    }

    /// Returns whether the key is present.
    pub fn contains_key(&self, key: &K::Key) -> Result<bool, Error> {
        let bits = ok!(self.serialize_key(key));
        Ok(self.entries.contains_key(&bits))
    }

    /// Removes the value associated with the key, returning it.
    pub fn remove(&mut self, key: &K::Key) -> Result<Option<V::Value>, Error> {
        let bits = ok!(self.serialize_key(key));
        Ok(self.entries.remove(&bits).map(|(_, value)| value))
    }

    /// Iterates over entries in ascending key-bit-pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&K::Key, &V::Value)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    /// Builds the root edge cell, or `None` for an empty dictionary.
    pub fn build_root(&self) -> Result<Option<Cell>, Error> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let mut builder = CellBuilder::new();
        ok!(self.store_direct(&mut builder));
        Ok(Some(ok!(builder.build())))
    }

    /// Stores the dictionary in the outer optional form: a flag bit,
    /// then a reference to the root edge when non-empty.
    pub fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_maybe_reference(ok!(self.build_root()))
    }

    /// Stores the root edge in place. Fails for an empty dictionary,
    /// which has no root edge representation.
    pub fn store_direct(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if self.entries.is_empty() {
            return Err(Error::InvalidData);
        }
        let entries = self
            .entries
            .iter()
            .map(|(bits, (_, value))| (bits, value))
            .collect::<Vec<_>>();
        self.write_edge(&entries, 0, self.key.bit_width(), builder)
    }

    /// Loads a dictionary in the outer optional form.
    pub fn load_from(key: K, value: V, slice: &mut CellSlice) -> Result<Self, Error> {
        match ok!(slice.load_maybe_reference()) {
            Some(root) => Self::load_direct(key, value, &mut root.begin_parse()),
            None => Ok(Self::new(key, value)),
        }
    }

    /// Loads a dictionary from a root edge in place.
    pub fn load_direct(key: K, value: V, slice: &mut CellSlice) -> Result<Self, Error> {
        let mut result = Self::new(key, value);
        let bit_width = result.key.bit_width();
        let prefix = BitWriter::new(bit_width as usize);
        ok!(result.read_edge(slice, prefix, bit_width));
        Ok(result)
    }

    fn serialize_key(&self, key: &K::Key) -> Result<BitString, Error> {
        let bits = ok!(self.key.serialize(key));
        if bits.len() != self.key.bit_width() as usize {
            return Err(Error::BitstringLengthMismatch);
        }
        Ok(bits)
    }

    fn write_edge(
        &self,
        entries: &[(&BitString, &V::Value)],
        offset: usize,
        key_bit_len: u16,
        builder: &mut CellBuilder,
    ) -> Result<(), Error> {
        debug_assert!(!entries.is_empty());

        // Entries are sorted, so the prefix shared by all of them is the
        // prefix shared by the first and the last
        let first = entries[0].0;
        let last = entries[entries.len() - 1].0;
        let label = ok!(first.substring(offset, first.common_prefix_len(last) - offset));
        ok!(write_label(&label, key_bit_len, builder));

        if entries.len() == 1 {
            return self.value.store(entries[0].1, builder);
        }

        // Fork on the first bit after the label. Both branches are
        // non-empty since the label is the longest shared prefix.
        let fork_offset = offset + label.len();
        let split = entries.partition_point(|(bits, _)| !bits.get(fork_offset).unwrap_or(true));
        debug_assert!(split > 0 && split < entries.len());

        let branch_bit_len = key_bit_len - label.len() as u16 - 1;
        for branch in [&entries[..split], &entries[split..]] {
            let mut child = CellBuilder::new();
            ok!(self.write_edge(branch, fork_offset + 1, branch_bit_len, &mut child));
            ok!(builder.store_reference(ok!(child.build())));
        }
        Ok(())
    }

    fn read_edge(
        &mut self,
        slice: &mut CellSlice,
        mut prefix: BitWriter,
        key_bit_len: u16,
    ) -> Result<(), Error> {
        let label = ok!(read_label(slice, key_bit_len));
        ok!(prefix.write_bits(&label));

        let rest = key_bit_len - label.len() as u16;
        if rest == 0 {
            let bits = prefix.finish();
            let key = ok!(self.key.parse(&bits));
            let value = ok!(self.value.load(slice));
            self.entries.insert(bits, (key, value));
            return Ok(());
        }

        if slice.remaining_refs() < 2 {
            return Err(Error::MissingBranch);
        }
        for bit in [false, true] {
            let child = ok!(slice.load_reference());
            let mut branch_prefix = prefix.clone();
            ok!(branch_prefix.write_bit(bit));
            ok!(self.read_edge(&mut child.begin_parse(), branch_prefix, rest - 1));
        }
        Ok(())
    }
}

impl<K: DictionaryKey, V: DictionaryValue> PartialEq for Dictionary<K, V>
where
    V::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((a, (_, x)), (b, (_, y)))| a == b && x == y)
    }
}

impl<K: DictionaryKey, V: DictionaryValue> std::fmt::Debug for Dictionary<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("bit_width", &self.key.bit_width())
            .field("len", &self.entries.len())
            .finish()
    }
}

fn write_label(label: &BitString, key_bit_len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
    let bits_for_len = (16 - key_bit_len.leading_zeros()) as u16;
    let len = label.len() as u16;

    let hml_short_len = 2 + 2 * len;
    let hml_long_len = 2 + bits_for_len + len;
    let hml_same_len = 3 + bits_for_len;

    if len > 0 && hml_same_len <= hml_short_len && hml_same_len <= hml_long_len {
        if let Some(bit) = label.test_uniform() {
            return write_hml_same(bit, len, bits_for_len, builder);
        }
    }

    if hml_short_len <= hml_long_len {
        ok!(write_hml_short_tag(len, builder));
    } else {
        ok!(write_hml_long_tag(len, bits_for_len, builder));
    }
    builder.store_bits(label)
}

fn write_hml_short_tag(len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
    ok!(builder.store_bit_zero());

    for _ in 0..len / 32 {
        ok!(builder.store_uint(u32::MAX as u64, 32));
    }
    let rem = len % 32;
    if rem != 0 {
        ok!(builder.store_uint(u64::MAX >> (64 - rem), rem));
    }
    builder.store_bit_zero()
}

fn write_hml_long_tag(len: u16, bits_for_len: u16, builder: &mut CellBuilder) -> Result<(), Error> {
    ok!(builder.store_bit_one());
    ok!(builder.store_bit_zero());
    builder.store_uint(len as u64, bits_for_len)
}

fn write_hml_same(
    bit: bool,
    len: u16,
    bits_for_len: u16,
    builder: &mut CellBuilder,
) -> Result<(), Error> {
    ok!(builder.store_uint(0b110 | bit as u64, 3));
    builder.store_uint(len as u64, bits_for_len)
}

fn read_label(slice: &mut CellSlice, key_bit_len: u16) -> Result<BitString, Error> {
    let bits_for_len = (16 - key_bit_len.leading_zeros()) as u16;

    if bits_for_len == 0 && slice.remaining_bits() == 0 {
        Ok(BitString::empty())
    } else if !ok!(slice.load_bit()) {
        read_hml_short(slice, key_bit_len)
    } else if !ok!(slice.load_bit()) {
        read_hml_long(slice, key_bit_len, bits_for_len)
    } else {
        read_hml_same(slice, key_bit_len, bits_for_len)
    }
}

fn read_hml_short(slice: &mut CellSlice, key_bit_len: u16) -> Result<BitString, Error> {
    let mut len = 0u16;
    while ok!(slice.load_bit()) {
        len += 1;
        if len > key_bit_len {
            return Err(Error::InvalidData);
        }
    }
    slice.load_bits(len as usize)
}

fn read_hml_long(
    slice: &mut CellSlice,
    key_bit_len: u16,
    bits_for_len: u16,
) -> Result<BitString, Error> {
    let len = ok!(slice.load_uint(bits_for_len)) as u16;
    if len > key_bit_len {
        return Err(Error::InvalidData);
    }
    slice.load_bits(len as usize)
}

fn read_hml_same(
    slice: &mut CellSlice,
    key_bit_len: u16,
    bits_for_len: u16,
) -> Result<BitString, Error> {
    let bit = ok!(slice.load_bit());
    let len = ok!(slice.load_uint(bits_for_len)) as u16;
    if len > key_bit_len {
        return Err(Error::InvalidData);
    }
    Ok(BitString::uniform(bit, len as usize))
}

#[cfg(test)]
mod tests {
    use super::keys::UintKey;
    use super::values::{CellValue, UintValue};
    use super::*;

    fn make_dict(entries: &[(u64, u64)]) -> anyhow::Result<Dictionary<UintKey, UintValue>> {
        let mut dict = Dictionary::new(UintKey::new(16), UintValue::new(16));
        for (key, value) in entries {
            dict.set(*key, *value)?;
        }
        Ok(dict)
    }

    #[test]
    fn basic_map_operations() -> anyhow::Result<()> {
        let mut dict = make_dict(&[(1, 10), (2, 20)])?;
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&1)?, Some(&10));
        assert_eq!(dict.get(&3)?, None);
        assert!(dict.contains_key(&2)?);

        assert_eq!(dict.set(1, 11)?, Some(10));
        assert_eq!(dict.get(&1)?, Some(&11));

        assert_eq!(dict.remove(&2)?, Some(20));
        assert_eq!(dict.remove(&2)?, None);
        assert_eq!(dict.len(), 1);
        Ok(())
    }

    #[test]
    fn iteration_follows_key_bit_order() -> anyhow::Result<()> {
        let dict = make_dict(&[(500, 3), (13, 1), (42, 2)])?;
        let keys = dict.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        assert_eq!(keys, [13, 42, 500]);
        Ok(())
    }

    #[test]
    fn encoding_is_canonical() -> anyhow::Result<()> {
        let a = make_dict(&[(13, 1), (42, 2), (500, 3)])?;
        let b = make_dict(&[(500, 3), (13, 1), (42, 2)])?;
        let c = make_dict(&[(42, 2), (500, 3), (13, 1)])?;

        let root_a = a.build_root()?.unwrap();
        let root_b = b.build_root()?.unwrap();
        let root_c = c.build_root()?.unwrap();
        assert_eq!(root_a.repr_hash(), root_b.repr_hash());
        assert_eq!(root_a.repr_hash(), root_c.repr_hash());
        Ok(())
    }

    #[test]
    fn round_trip_through_cells() -> anyhow::Result<()> {
        let dict = make_dict(&[(0, 100), (1, 200), (0xffff, 300), (0x8000, 400)])?;

        let mut builder = CellBuilder::new();
        dict.store_into(&mut builder)?;
        let cell = builder.build()?;

        let mut slice = cell.begin_parse();
        let parsed = Dictionary::load_from(UintKey::new(16), UintValue::new(16), &mut slice)?;
        slice.end_parse()?;

        assert_eq!(parsed, dict);
        assert_eq!(
            parsed.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            [(0, 100), (1, 200), (0x8000, 400), (0xffff, 300)]
        );
        Ok(())
    }

    #[test]
    fn empty_dictionary_is_a_single_flag_bit() -> anyhow::Result<()> {
        let dict = make_dict(&[])?;
        assert!(dict.build_root()?.is_none());
        assert!(matches!(
            dict.store_direct(&mut CellBuilder::new()),
            Err(Error::InvalidData)
        ));

        let mut builder = CellBuilder::new();
        dict.store_into(&mut builder)?;
        let cell = builder.build()?;
        assert_eq!(cell.bit_len(), 1);
        assert_eq!(cell.reference_count(), 0);

        let mut slice = cell.begin_parse();
        let parsed = Dictionary::load_from(UintKey::new(16), UintValue::new(16), &mut slice)?;
        assert!(parsed.is_empty());
        Ok(())
    }

    #[test]
    fn uniform_label_uses_the_same_encoding() -> anyhow::Result<()> {
        // A single 8-bit key of all ones: hml_same (3 + 4 bits) beats
        // hml_short (18) and hml_long (14)
        let mut dict = Dictionary::new(UintKey::new(8), UintValue::new(8));
        dict.set(0xff, 7)?;
        let root = dict.build_root()?.unwrap();

        let mut slice = root.begin_parse();
        assert_eq!(slice.load_uint(3)?, 0b111);
        assert_eq!(slice.load_uint(4)?, 8);
        assert_eq!(slice.load_uint(8)?, 7);
        slice.end_parse()?;
        Ok(())
    }

    #[test]
    fn short_label_bits() -> anyhow::Result<()> {
        // Keys 0b00 and 0b01 in a 2-bit space: empty root label, then a
        // fork with single-bit leaf labels
        let mut dict = Dictionary::new(UintKey::new(2), UintValue::new(8));
        dict.set(0b00, 1)?;
        dict.set(0b01, 2)?;
        let root = dict.build_root()?.unwrap();

        let mut slice = root.begin_parse();
        // hml_short, unary length 1, literal bit 0
        assert_eq!(slice.load_uint(4)?, 0b0100);
        assert_eq!(slice.remaining_refs(), 2);

        let mut left = slice.load_reference()?.begin_parse();
        assert_eq!(left.load_uint(2)?, 0b00);
        assert_eq!(left.load_uint(8)?, 1);
        left.end_parse()?;

        let mut right = slice.load_reference()?.begin_parse();
        assert_eq!(right.load_uint(2)?, 0b00);
        assert_eq!(right.load_uint(8)?, 2);
        right.end_parse()?;
        Ok(())
    }

    #[test]
    fn three_two_bit_keys() -> anyhow::Result<()> {
        for order in [[0b00u64, 0b01, 0b10], [0b10, 0b00, 0b01], [0b01, 0b10, 0b00]] {
            let mut dict = Dictionary::new(UintKey::new(2), UintValue::new(8));
            for (i, key) in order.into_iter().enumerate() {
                dict.set(key, i as u64)?;
            }

            let mut builder = CellBuilder::new();
            dict.store_into(&mut builder)?;
            let cell = builder.build()?;

            let mut slice = cell.begin_parse();
            let parsed = Dictionary::load_from(UintKey::new(2), UintValue::new(8), &mut slice)?;
            assert_eq!(parsed.len(), 3);
            assert_eq!(
                parsed.iter().map(|(key, _)| *key).collect::<Vec<_>>(),
                [0b00, 0b01, 0b10]
            );
        }
        Ok(())
    }

    #[test]
    fn missing_branch_is_rejected() -> anyhow::Result<()> {
        // An empty label over a non-zero key width requires two children
        let cell = {
            let mut builder = CellBuilder::new();
            builder.store_uint(0b00, 2)?;
            builder.build()?
        };

        let mut slice = cell.begin_parse();
        let result =
            Dictionary::load_direct(UintKey::new(8), UintValue::new(8), &mut slice);
        assert!(matches!(result, Err(Error::MissingBranch)));
        Ok(())
    }

    #[test]
    fn nested_cell_values() -> anyhow::Result<()> {
        let payload = {
            let mut builder = CellBuilder::new();
            builder.store_uint(0xdead_beef, 32)?;
            builder.build()?
        };

        let mut dict = Dictionary::new(UintKey::new(8), CellValue);
        dict.set(5, payload.clone())?;
        dict.set(6, Cell::empty())?;

        let mut builder = CellBuilder::new();
        dict.store_into(&mut builder)?;
        let cell = builder.build()?;

        let mut slice = cell.begin_parse();
        let parsed = Dictionary::load_from(UintKey::new(8), CellValue, &mut slice)?;
        assert_eq!(parsed.get(&5)?, Some(&payload));
        assert_eq!(parsed.get(&6)?, Some(&Cell::empty()));
        Ok(())
    }
}
