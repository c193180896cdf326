//! Canonical 24-bit bus address.
//!
//! Every component passes addresses as this one type. The bank is bits 16-23 and
//! the offset bits 0-15; arithmetic is always reduced modulo 0x1000000.

use crate::error::{EmuError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(u32);

impl Address {
    #[inline]
    pub const fn new(bank: u8, offset: u16) -> Self {
        Address(((bank as u32) << 16) | offset as u32)
    }

    /// Builds an address from a raw value, reducing it into the 24-bit space.
    #[inline]
    pub const fn wrapping_from(raw: u32) -> Self {
        Address(raw & ADDRESS_MASK)
    }

    #[inline]
    pub const fn bank(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn offset(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Linear 24-bit increment: carries from the offset into the bank.
    #[inline]
    pub const fn wrapping_add(self, delta: u32) -> Self {
        Address(self.0.wrapping_add(delta) & ADDRESS_MASK)
    }

    /// Increment that stays inside the current bank (offset wraps at 0xFFFF).
    #[inline]
    pub const fn wrapping_add_in_bank(self, delta: u16) -> Self {
        Address::new(self.bank(), self.offset().wrapping_add(delta))
    }

    #[inline]
    pub const fn with_offset(self, offset: u16) -> Self {
        Address::new(self.bank(), offset)
    }
}

impl TryFrom<u32> for Address {
    type Error = EmuError;

    fn try_from(raw: u32) -> Result<Self> {
        if raw > ADDRESS_MASK {
            return Err(EmuError::AddressOutOfRange(raw));
        }
        Ok(Address(raw))
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:04X}", self.bank(), self.offset())
    }
}
