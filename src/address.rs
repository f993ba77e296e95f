//! Internal account address.

use crate::cell::{CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::Error;

/// Standard internal address of an account: a workchain id and
/// a 256-bit account id.
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StdAddr {
    /// Workchain id.
    pub workchain: i8,
    /// Account id.
    pub address: HashBytes,
}

impl StdAddr {
    /// The number of data bits that this struct occupies:
    /// a two-bit tag, an anycast flag, a workchain and an account id.
    pub const BITS: u16 = 2 + 1 + 8 + 256;

    /// Constructs a new address from its parts.
    #[inline]
    pub const fn new(workchain: i8, address: HashBytes) -> Self {
        Self { workchain, address }
    }
}

impl Store for StdAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        // addr_std$10 with no anycast
        ok!(builder.store_uint(0b100, 3));
        ok!(builder.store_uint(self.workchain as u8 as u64, 8));
        builder.store_buffer(self.address.as_slice())
    }
}

impl Load for StdAddr {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        if ok!(slice.load_uint(2)) != 0b10 {
            return Err(Error::InvalidData);
        }
        if ok!(slice.load_bit()) {
            // Anycast addresses are not supported
            return Err(Error::InvalidData);
        }
        let workchain = ok!(slice.load_uint(8)) as u8 as i8;
        let address = ok!(HashBytes::load_from(slice));
        Ok(Self { workchain, address })
    }
}

impl std::fmt::Display for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.workchain, self.address)
    }
}

impl std::fmt::Debug for StdAddr {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_addr() -> StdAddr {
        let mut account = [0u8; 32];
        for (i, byte) in account.iter_mut().enumerate() {
            *byte = i as u8;
        }
        StdAddr::new(-1, HashBytes(account))
    }

    #[test]
    fn store_load_round_trip() -> anyhow::Result<()> {
        let addr = sample_addr();

        let mut builder = CellBuilder::new();
        builder.store(&addr)?;
        let cell = builder.build()?;
        assert_eq!(cell.bit_len(), StdAddr::BITS);

        let mut slice = cell.begin_parse();
        assert_eq!(slice.load_address()?, addr);
        slice.end_parse()?;
        Ok(())
    }

    #[test]
    fn maybe_address() -> anyhow::Result<()> {
        let addr = sample_addr();

        let mut builder = CellBuilder::new();
        builder.store_address(None)?;
        builder.store_address(Some(&addr))?;
        let cell = builder.build()?;
        assert_eq!(cell.bit_len(), 2 + StdAddr::BITS);

        let mut slice = cell.begin_parse();
        assert_eq!(slice.load_maybe_address()?, None);
        assert_eq!(slice.load_maybe_address()?, Some(addr));
        slice.end_parse()?;
        Ok(())
    }

    #[test]
    fn rejects_unknown_tags() -> anyhow::Result<()> {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b01, 2)?;
        builder.store_zeros(270)?;
        let cell = builder.build()?;

        let mut slice = cell.begin_parse();
        assert!(matches!(slice.load_address(), Err(Error::InvalidData)));

        let mut slice = cell.begin_parse();
        assert!(matches!(
            slice.load_maybe_address(),
            Err(Error::InvalidData)
        ));
        Ok(())
    }
}
