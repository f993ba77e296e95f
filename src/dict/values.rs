//! Value coders for typed dictionaries.

use num_bigint::BigUint;

use super::DictionaryValue;
use crate::address::StdAddr;
use crate::cell::{Cell, CellBuilder, CellSlice, Load, Store};
use crate::error::Error;

/// Unsigned integer value of a declared width, `1..=64` bits.
#[derive(Debug, Clone, Copy)]
pub struct UintValue {
    bits: u16,
}

impl UintValue {
    /// Constructs a coder for `bits`-wide values.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryValue for UintValue {
    type Value = u64;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_uint(*value, self.bits)
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        slice.load_uint(self.bits)
    }
}

/// Signed integer value of a declared width, `1..=64` bits.
#[derive(Debug, Clone, Copy)]
pub struct IntValue {
    bits: u16,
}

impl IntValue {
    /// Constructs a coder for `bits`-wide values.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryValue for IntValue {
    type Value = i64;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_int(*value, self.bits)
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        slice.load_int(self.bits)
    }
}

/// Unsigned integer value of an arbitrary declared width.
#[derive(Debug, Clone, Copy)]
pub struct BigUintValue {
    bits: u16,
}

impl BigUintValue {
    /// Constructs a coder for `bits`-wide values.
    pub const fn new(bits: u16) -> Self {
        Self { bits }
    }
}

impl DictionaryValue for BigUintValue {
    type Value = BigUint;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_uint_big(value, self.bits)
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        slice.load_uint_big(self.bits)
    }
}

/// Fixed-size byte buffer value.
#[derive(Debug, Clone, Copy)]
pub struct BufferValue {
    bytes: usize,
}

impl BufferValue {
    /// Constructs a coder for `bytes`-long values.
    pub const fn new(bytes: usize) -> Self {
        Self { bytes }
    }
}

impl DictionaryValue for BufferValue {
    type Value = Vec<u8>;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        if value.len() != self.bytes {
            return Err(Error::InvalidBufferSize);
        }
        builder.store_buffer(value)
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        slice.load_buffer(self.bytes)
    }
}

/// Value stored as a whole cell in a child reference.
#[derive(Debug, Clone, Copy)]
pub struct CellValue;

impl DictionaryValue for CellValue {
    type Value = Cell;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(value.clone())
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        slice.load_reference()
    }
}

/// Internal address value, 267 bits.
#[derive(Debug, Clone, Copy)]
pub struct AddressValue;

impl DictionaryValue for AddressValue {
    type Value = StdAddr;

    fn store(&self, value: &Self::Value, builder: &mut CellBuilder) -> Result<(), Error> {
        value.store_into(builder)
    }

    fn load(&self, slice: &mut CellSlice) -> Result<Self::Value, Error> {
        StdAddr::load_from(slice)
    }
}
