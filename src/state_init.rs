//! Deployed contract state.

use crate::address::StdAddr;
use crate::cell::{Cell, CellBuilder, CellSlice, Load, Store};
use crate::error::Error;

/// Tick-tock flags for special system contracts.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct TickTock {
    /// Accept messages on every block start.
    pub tick: bool,
    /// Accept messages on every block end.
    pub tock: bool,
}

impl Store for TickTock {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_bit(self.tick));
        builder.store_bit(self.tock)
    }
}

impl Load for TickTock {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        Ok(Self {
            tick: ok!(slice.load_bit()),
            tock: ok!(slice.load_bit()),
        })
    }
}

/// Initial state of a deployed contract: five optional fields, each
/// preceded by a flag bit.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct StateInit {
    /// Sharding depth, a 5-bit integer.
    pub split_depth: Option<u8>,
    /// Tick-tock flags of a special contract.
    pub special: Option<TickTock>,
    /// Contract code.
    pub code: Option<Cell>,
    /// Contract data.
    pub data: Option<Cell>,
    /// Shared libraries.
    pub libraries: Option<Cell>,
}

impl Store for StateInit {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self.split_depth {
            Some(depth) => {
                ok!(builder.store_bit_one());
                ok!(builder.store_uint(depth as u64, 5));
            }
            None => ok!(builder.store_bit_zero()),
        }
        ok!(self.special.store_into(builder));
        ok!(builder.store_maybe_reference(self.code.clone()));
        ok!(builder.store_maybe_reference(self.data.clone()));
        builder.store_maybe_reference(self.libraries.clone())
    }
}

impl Load for StateInit {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        Ok(Self {
            split_depth: match ok!(slice.load_maybe_uint(5)) {
                Some(depth) => Some(depth as u8),
                None => None,
            },
            special: ok!(Option::<TickTock>::load_from(slice)),
            code: ok!(slice.load_maybe_reference()),
            data: ok!(slice.load_maybe_reference()),
            libraries: ok!(slice.load_maybe_reference()),
        })
    }
}

/// Computes the address of a contract deployed to the given workchain:
/// the representation hash of its serialized initial state.
pub fn contract_address(workchain: i8, state_init: &StateInit) -> Result<StdAddr, Error> {
    let mut builder = CellBuilder::new();
    ok!(state_init.store_into(&mut builder));
    let cell = ok!(builder.build());
    Ok(StdAddr::new(workchain, *cell.repr_hash()))
}
