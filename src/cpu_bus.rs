//! Trait representing the minimal bus interface required by the 65816 core.

use crate::address::Address;
use crate::cpu::interrupt::InterruptVectorTable;
use crate::error::Result;

pub trait CpuBus {
    fn read_u8(&mut self, addr: Address) -> Result<u8>;
    fn write_u8(&mut self, addr: Address, value: u8) -> Result<()>;

    /// Vector table of the inserted cartridge.
    fn vectors(&self) -> InterruptVectorTable;

    /// Little-endian word, high byte at the next linear address.
    fn read_u16(&mut self, addr: Address) -> Result<u16> {
        let lo = self.read_u8(addr)? as u16;
        let hi = self.read_u8(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    fn write_u16(&mut self, addr: Address, value: u16) -> Result<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr.wrapping_add(1), (value >> 8) as u8)
    }
}
