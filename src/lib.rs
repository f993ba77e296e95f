//! A set of primitive types for the TON cell data format.
//!
//! Cells are immutable nodes of up to 1023 bits of data and up to 4 child
//! references, identified by a SHA-256 representation hash. Trees of cells
//! are built bottom-up with [`CellBuilder`], consumed top-down with
//! [`CellSlice`], stored as ordered maps with [`Dictionary`] and serialized
//! to byte streams with [`Boc`].
//!
//! [`CellBuilder`]: cell::CellBuilder
//! [`CellSlice`]: cell::CellSlice
//! [`Dictionary`]: dict::Dictionary
//! [`Boc`]: boc::Boc

macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub use self::error::Error;

pub mod address;
pub mod bits;
pub mod boc;
pub mod cell;
pub mod dict;
pub mod error;
pub mod state_init;

/// Commonly used types.
pub mod prelude {
    pub use crate::address::StdAddr;
    pub use crate::bits::{BitReader, BitString, BitWriter};
    pub use crate::boc::Boc;
    pub use crate::cell::{Cell, CellBuilder, CellSlice, CellType, HashBytes, Load, Store};
    pub use crate::dict::Dictionary;
    pub use crate::error::Error;
    pub use crate::state_init::StateInit;
}
