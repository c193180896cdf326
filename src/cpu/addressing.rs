//! Addressing-mode resolver.
//!
//! Each mode turns the operand bytes following an opcode into an
//! [`EffectiveAddress`]. The effective address carries its own wrap rule, so a
//! multi-byte operand read follows the same bank/page behavior as the hardware:
//! direct page and stack accesses stay in bank 0, absolute and long accesses carry
//! linearly into the next bank, and the emulation-mode direct page wraps inside a
//! single page when D's low byte is zero.

use super::registers::Width;
use super::ExecContext;
use crate::address::Address;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    /// Immediate sized by M (accumulator-class instructions).
    ImmediateM,
    /// Immediate sized by X (index-class instructions).
    ImmediateX,
    /// Always one byte (REP, SEP, COP/BRK signature, WDM).
    Immediate8,
    Direct,
    DirectX,
    DirectY,
    /// (dp)
    DirectIndirect,
    /// (dp,X)
    DirectIndexedIndirect,
    /// (dp),Y
    DirectIndirectIndexed,
    /// [dp]
    DirectIndirectLong,
    /// [dp],Y
    DirectIndirectLongIndexed,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    /// (abs), JMP only
    AbsoluteIndirect,
    /// (abs,X), JMP/JSR only
    AbsoluteIndexedIndirect,
    /// [abs], JML only
    AbsoluteIndirectLong,
    /// sr,S
    StackRelative,
    /// (sr,S),Y
    StackRelativeIndirectIndexed,
    Relative8,
    Relative16,
    /// MVN/MVP: destination bank, then source bank.
    BlockMove,
}

impl AddressingMode {
    /// Operand bytes following the opcode under the current register widths.
    pub fn operand_bytes(self, accumulator_8bit: bool, index_8bit: bool) -> u16 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            ImmediateM => {
                if accumulator_8bit {
                    1
                } else {
                    2
                }
            }
            ImmediateX => {
                if index_8bit {
                    1
                } else {
                    2
                }
            }
            Immediate8 | Direct | DirectX | DirectY | DirectIndirect | DirectIndexedIndirect
            | DirectIndirectIndexed | DirectIndirectLong | DirectIndirectLongIndexed
            | StackRelative | StackRelativeIndirectIndexed | Relative8 => 1,
            Absolute | AbsoluteX | AbsoluteY | AbsoluteIndirect | AbsoluteIndexedIndirect
            | AbsoluteIndirectLong | Relative16 | BlockMove => 2,
            AbsoluteLong | AbsoluteLongX => 3,
        }
    }

    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            AddressingMode::ImmediateM | AddressingMode::ImmediateX | AddressingMode::Immediate8
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// Successive bytes carry into the next bank.
    Linear,
    /// Successive bytes wrap at the end of the bank.
    Bank,
    /// Successive bytes wrap at the end of the 256-byte page.
    Page,
}

/// Resolved operand location. `byte(n)` gives the address of the n-th operand
/// byte, so the low/high pair of a word operand is `byte(0)`/`byte(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveAddress {
    pub base: Address,
    pub wrap: Wrap,
}

impl EffectiveAddress {
    pub const fn linear(base: Address) -> Self {
        Self {
            base,
            wrap: Wrap::Linear,
        }
    }

    pub const fn in_bank(base: Address) -> Self {
        Self {
            base,
            wrap: Wrap::Bank,
        }
    }

    pub const fn in_page(base: Address) -> Self {
        Self {
            base,
            wrap: Wrap::Page,
        }
    }

    pub fn byte(self, n: u16) -> Address {
        match self.wrap {
            Wrap::Linear => self.base.wrapping_add(n as u32),
            Wrap::Bank => self.base.wrapping_add_in_bank(n),
            Wrap::Page => {
                let offset = self.base.offset();
                let low = (offset as u8).wrapping_add(n as u8);
                self.base.with_offset((offset & 0xFF00) | low as u16)
            }
        }
    }

    #[inline]
    pub fn lo(self) -> Address {
        self.byte(0)
    }

    #[inline]
    pub fn hi(self) -> Address {
        self.byte(1)
    }
}

#[inline]
fn crosses_page(base: u32, indexed: u32) -> bool {
    (base & 0xFFFF00) != (indexed & 0xFFFF00)
}

impl ExecContext<'_> {
    /// Current program address (K:PC).
    #[inline]
    pub fn program_address(&self) -> Address {
        Address::new(self.regs.k, self.regs.pc)
    }

    /// Fetches the next instruction byte. PC wraps inside its bank; K never
    /// changes from a fetch.
    pub fn fetch_u8(&mut self) -> Result<u8> {
        let value = self.bus.read_u8(self.program_address())?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(value)
    }

    pub fn fetch_u16(&mut self) -> Result<u16> {
        let lo = self.fetch_u8()? as u16;
        let hi = self.fetch_u8()? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn fetch_u24(&mut self) -> Result<Address> {
        let lo = self.fetch_u8()? as u32;
        let mid = self.fetch_u8()? as u32;
        let hi = self.fetch_u8()? as u32;
        Ok(Address::wrapping_from((hi << 16) | (mid << 8) | lo))
    }

    /// Direct-page location of `operand + index`.
    pub fn direct_address(&self, operand: u8, index: u16) -> EffectiveAddress {
        let d = self.regs.d;
        if self.regs.emulation() && d & 0x00FF == 0 {
            let low = (operand as u16).wrapping_add(index) & 0x00FF;
            EffectiveAddress::in_page(Address::new(0x00, d | low))
        } else {
            let offset = d.wrapping_add(operand as u16).wrapping_add(index);
            EffectiveAddress::in_bank(Address::new(0x00, offset))
        }
    }

    pub fn read(&mut self, ea: EffectiveAddress, width: Width) -> Result<u16> {
        let lo = self.bus.read_u8(ea.lo())? as u16;
        if width == Width::Byte {
            return Ok(lo);
        }
        let hi = self.bus.read_u8(ea.hi())? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn write(&mut self, ea: EffectiveAddress, width: Width, value: u16) -> Result<()> {
        self.bus.write_u8(ea.lo(), (value & 0xFF) as u8)?;
        if width == Width::Word {
            self.bus.write_u8(ea.hi(), (value >> 8) as u8)?;
        }
        Ok(())
    }

    fn read_pointer_u16(&mut self, ptr: EffectiveAddress) -> Result<u16> {
        self.read(ptr, Width::Word)
    }

    fn read_pointer_u24(&mut self, ptr: EffectiveAddress) -> Result<Address> {
        let lo = self.bus.read_u8(ptr.byte(0))? as u32;
        let mid = self.bus.read_u8(ptr.byte(1))? as u32;
        let hi = self.bus.read_u8(ptr.byte(2))? as u32;
        Ok(Address::wrapping_from((hi << 16) | (mid << 8) | lo))
    }

    #[inline]
    fn data_bank_address(&self, offset: u16) -> Address {
        Address::new(self.regs.dbr, offset)
    }

    fn indexed(&mut self, base: Address, index: u16) -> EffectiveAddress {
        let target = base.wrapping_add(index as u32);
        if crosses_page(base.raw(), target.raw()) {
            self.page_crossed = true;
        }
        EffectiveAddress::linear(target)
    }

    /// Consumes the operand bytes of `mode` and returns the effective address.
    pub fn resolve(&mut self, mode: AddressingMode) -> Result<EffectiveAddress> {
        use AddressingMode::*;
        let x = self.regs.x();
        let y = self.regs.y();
        let ea = match mode {
            Implied | Accumulator | BlockMove => EffectiveAddress::in_bank(self.program_address()),
            ImmediateM | ImmediateX | Immediate8 => {
                let ea = EffectiveAddress::in_bank(self.program_address());
                let len = mode.operand_bytes(
                    self.regs.accumulator_is_8bit(),
                    self.regs.index_is_8bit(),
                );
                self.regs.pc = self.regs.pc.wrapping_add(len);
                ea
            }
            Direct => {
                let op = self.fetch_u8()?;
                self.direct_address(op, 0)
            }
            DirectX => {
                let op = self.fetch_u8()?;
                self.direct_address(op, x)
            }
            DirectY => {
                let op = self.fetch_u8()?;
                self.direct_address(op, y)
            }
            DirectIndirect => {
                let op = self.fetch_u8()?;
                let ptr = self.direct_address(op, 0);
                let target = self.read_pointer_u16(ptr)?;
                EffectiveAddress::linear(self.data_bank_address(target))
            }
            DirectIndexedIndirect => {
                let op = self.fetch_u8()?;
                let ptr = self.direct_address(op, x);
                let target = self.read_pointer_u16(ptr)?;
                EffectiveAddress::linear(self.data_bank_address(target))
            }
            DirectIndirectIndexed => {
                let op = self.fetch_u8()?;
                let ptr = self.direct_address(op, 0);
                let target = self.read_pointer_u16(ptr)?;
                let base = self.data_bank_address(target);
                self.indexed(base, y)
            }
            DirectIndirectLong => {
                let op = self.fetch_u8()?;
                let ptr = self.direct_address(op, 0);
                EffectiveAddress::linear(self.read_pointer_u24(ptr)?)
            }
            DirectIndirectLongIndexed => {
                let op = self.fetch_u8()?;
                let ptr = self.direct_address(op, 0);
                let base = self.read_pointer_u24(ptr)?;
                EffectiveAddress::linear(base.wrapping_add(y as u32))
            }
            Absolute => {
                let op = self.fetch_u16()?;
                EffectiveAddress::linear(self.data_bank_address(op))
            }
            AbsoluteX => {
                let op = self.fetch_u16()?;
                let base = self.data_bank_address(op);
                self.indexed(base, x)
            }
            AbsoluteY => {
                let op = self.fetch_u16()?;
                let base = self.data_bank_address(op);
                self.indexed(base, y)
            }
            AbsoluteLong => EffectiveAddress::linear(self.fetch_u24()?),
            AbsoluteLongX => {
                let base = self.fetch_u24()?;
                EffectiveAddress::linear(base.wrapping_add(x as u32))
            }
            AbsoluteIndirect | AbsoluteIndexedIndirect | AbsoluteIndirectLong => {
                EffectiveAddress::in_bank(self.jump_target(mode)?)
            }
            StackRelative => {
                let op = self.fetch_u8()?;
                let offset = self.regs.sp().wrapping_add(op as u16);
                EffectiveAddress::in_bank(Address::new(0x00, offset))
            }
            StackRelativeIndirectIndexed => {
                let op = self.fetch_u8()?;
                let offset = self.regs.sp().wrapping_add(op as u16);
                let ptr = EffectiveAddress::in_bank(Address::new(0x00, offset));
                let target = self.read_pointer_u16(ptr)?;
                EffectiveAddress::linear(self.data_bank_address(target).wrapping_add(y as u32))
            }
            Relative8 | Relative16 => {
                let target = self.branch_target(mode)?;
                EffectiveAddress::in_bank(Address::new(self.regs.k, target))
            }
        };
        Ok(ea)
    }

    /// Operand value: the accumulator for `Accumulator`, otherwise the bytes at
    /// the effective address. Immediate operands are sized by their own class.
    pub fn value(&mut self, mode: AddressingMode, width: Width) -> Result<u16> {
        let width = match mode {
            AddressingMode::Accumulator => return Ok(self.regs.a()),
            AddressingMode::ImmediateM => self.regs.m_width(),
            AddressingMode::ImmediateX => self.regs.x_width(),
            AddressingMode::Immediate8 => Width::Byte,
            _ => width,
        };
        let ea = self.resolve(mode)?;
        self.read(ea, width)
    }

    /// Branch destination offset inside bank K, relative to the PC after the
    /// displacement bytes.
    pub fn branch_target(&mut self, mode: AddressingMode) -> Result<u16> {
        let displacement = match mode {
            AddressingMode::Relative16 => self.fetch_u16()?,
            _ => self.fetch_u8()? as i8 as i16 as u16,
        };
        Ok(self.regs.pc.wrapping_add(displacement))
    }

    /// Control-transfer destination for JMP/JML/JSR/JSL forms.
    pub fn jump_target(&mut self, mode: AddressingMode) -> Result<Address> {
        match mode {
            AddressingMode::AbsoluteLong => self.fetch_u24(),
            AddressingMode::AbsoluteIndirect => {
                let op = self.fetch_u16()?;
                let ptr = EffectiveAddress::in_bank(Address::new(0x00, op));
                let target = self.read_pointer_u16(ptr)?;
                Ok(Address::new(self.regs.k, target))
            }
            AddressingMode::AbsoluteIndexedIndirect => {
                let op = self.fetch_u16()?;
                let offset = op.wrapping_add(self.regs.x());
                let ptr = EffectiveAddress::in_bank(Address::new(self.regs.k, offset));
                let target = self.read_pointer_u16(ptr)?;
                Ok(Address::new(self.regs.k, target))
            }
            AddressingMode::AbsoluteIndirectLong => {
                let op = self.fetch_u16()?;
                let ptr = EffectiveAddress::in_bank(Address::new(0x00, op));
                self.read_pointer_u24(ptr)
            }
            _ => {
                let op = self.fetch_u16()?;
                Ok(Address::new(self.regs.k, op))
            }
        }
    }
}
