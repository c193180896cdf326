//! Hardware stack in bank 0, addressed by SP.
//!
//! A push writes at SP and then decrements; a pull increments and then reads. In
//! emulation mode the decrement/increment stays inside page 1 because the register
//! file pins SP's high byte. Words are pushed high byte first so the low byte ends
//! up at the lower address, which is what stack-relative addressing expects.

use super::registers::RegisterFile;
use crate::address::Address;
use crate::cpu_bus::CpuBus;
use crate::error::Result;

#[inline]
fn stack_address(regs: &RegisterFile) -> Address {
    Address::new(0x00, regs.sp())
}

pub fn push_u8(regs: &mut RegisterFile, bus: &mut dyn CpuBus, value: u8) -> Result<()> {
    bus.write_u8(stack_address(regs), value)?;
    regs.set_sp(regs.sp().wrapping_sub(1));
    Ok(())
}

pub fn push_u16(regs: &mut RegisterFile, bus: &mut dyn CpuBus, value: u16) -> Result<()> {
    push_u8(regs, bus, (value >> 8) as u8)?;
    push_u8(regs, bus, (value & 0xFF) as u8)
}

pub fn pop_u8(regs: &mut RegisterFile, bus: &mut dyn CpuBus) -> Result<u8> {
    regs.set_sp(regs.sp().wrapping_add(1));
    bus.read_u8(stack_address(regs))
}

pub fn pop_u16(regs: &mut RegisterFile, bus: &mut dyn CpuBus) -> Result<u16> {
    let lo = pop_u8(regs, bus)? as u16;
    let hi = pop_u8(regs, bus)? as u16;
    Ok((hi << 8) | lo)
}
