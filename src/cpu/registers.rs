//! 65816 register file.
//!
//! Each register is a single 16-bit storage cell. Whether an access sees 8 or 16
//! bits is decided on every call from the M/X status bits and the emulation flag,
//! so a `REP`/`SEP`/`PLP`/`XCE` between two instructions takes effect immediately.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CARRY = 0x01;
        const ZERO = 0x02;
        const IRQ_DISABLE = 0x04;
        const DECIMAL = 0x08;
        const INDEX_8BIT = 0x10;
        const MEMORY_8BIT = 0x20;
        const OVERFLOW = 0x40;
        const NEGATIVE = 0x80;
    }
}

/// Bit 4 of P as pushed in emulation mode: set by BRK/PHP, clear for hardware
/// interrupts. It shares its position with the native-mode X flag.
pub const BREAK_BIT: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    #[inline]
    pub const fn mask(self) -> u16 {
        match self {
            Width::Byte => 0x00FF,
            Width::Word => 0xFFFF,
        }
    }

    #[inline]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Width::Byte => 0x0080,
            Width::Word => 0x8000,
        }
    }

    #[inline]
    pub const fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    X,
    Y,
    Sp,
    D,
    Pc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    c: u16,
    x: u16,
    y: u16,
    sp: u16,
    pub d: u16,
    pub dbr: u8,
    pub k: u8,
    pub pc: u16,
    p: StatusFlags,
    emulation: bool,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            c: 0,
            x: 0,
            y: 0,
            sp: 0x01FF,
            d: 0,
            dbr: 0,
            k: 0,
            pc: 0,
            p: StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT | StatusFlags::IRQ_DISABLE,
            emulation: true,
        }
    }

    /// Back to power-on defaults in place. PC is left for the caller to load
    /// from the reset vector.
    pub fn reset(&mut self) {
        let pc = self.pc;
        *self = Self::new();
        self.pc = pc;
    }

    // --- status register ---

    #[inline]
    pub fn flags(&self) -> StatusFlags {
        self.p
    }

    #[inline]
    pub fn p(&self) -> u8 {
        self.p.bits()
    }

    pub fn set_p(&mut self, value: u8) {
        self.p = StatusFlags::from_bits_truncate(value);
        self.enforce_width_invariants();
    }

    #[inline]
    pub fn flag(&self, flag: StatusFlags) -> bool {
        self.p.contains(flag)
    }

    pub fn set_flag(&mut self, flag: StatusFlags, on: bool) {
        self.p.set(flag, on);
        if flag.intersects(StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT) {
            self.enforce_width_invariants();
        }
    }

    #[inline]
    pub fn emulation(&self) -> bool {
        self.emulation
    }

    pub fn set_emulation(&mut self, on: bool) {
        self.emulation = on;
        self.enforce_width_invariants();
    }

    fn enforce_width_invariants(&mut self) {
        if self.emulation {
            self.p.insert(StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT);
            self.sp = 0x0100 | (self.sp & 0x00FF);
        }
        if self.p.contains(StatusFlags::INDEX_8BIT) {
            self.x &= 0x00FF;
            self.y &= 0x00FF;
        }
    }

    #[inline]
    pub fn accumulator_is_8bit(&self) -> bool {
        self.emulation || self.p.contains(StatusFlags::MEMORY_8BIT)
    }

    #[inline]
    pub fn index_is_8bit(&self) -> bool {
        self.emulation || self.p.contains(StatusFlags::INDEX_8BIT)
    }

    #[inline]
    pub fn m_width(&self) -> Width {
        if self.accumulator_is_8bit() {
            Width::Byte
        } else {
            Width::Word
        }
    }

    #[inline]
    pub fn x_width(&self) -> Width {
        if self.index_is_8bit() {
            Width::Byte
        } else {
            Width::Word
        }
    }

    /// Width of a register as selected right now.
    pub fn width_of(&self, reg: Register) -> Width {
        match reg {
            Register::A => self.m_width(),
            Register::X | Register::Y => self.x_width(),
            Register::Sp | Register::D | Register::Pc => Width::Word,
        }
    }

    // --- width-aware access ---

    pub fn get(&self, reg: Register) -> u16 {
        let raw = self.raw(reg);
        raw & self.width_of(reg).mask()
    }

    pub fn set(&mut self, reg: Register, value: u16) {
        match reg {
            Register::A => {
                if self.accumulator_is_8bit() {
                    self.c = (self.c & 0xFF00) | (value & 0x00FF);
                } else {
                    self.c = value;
                }
            }
            Register::X => self.x = value & self.x_width().mask(),
            Register::Y => self.y = value & self.x_width().mask(),
            Register::Sp => {
                self.sp = if self.emulation {
                    0x0100 | (value & 0x00FF)
                } else {
                    value
                };
            }
            Register::D => self.d = value,
            Register::Pc => self.pc = value,
        }
    }

    /// Low byte regardless of the selected width.
    pub fn lower(&self, reg: Register) -> u8 {
        (self.raw(reg) & 0xFF) as u8
    }

    /// High byte regardless of the selected width (B for the accumulator).
    pub fn upper(&self, reg: Register) -> u8 {
        (self.raw(reg) >> 8) as u8
    }

    pub fn set_lower(&mut self, reg: Register, value: u8) {
        let raw = (self.raw(reg) & 0xFF00) | value as u16;
        self.store_raw(reg, raw);
    }

    pub fn set_upper(&mut self, reg: Register, value: u8) {
        let raw = (self.raw(reg) & 0x00FF) | ((value as u16) << 8);
        self.store_raw(reg, raw);
    }

    fn raw(&self, reg: Register) -> u16 {
        match reg {
            Register::A => self.c,
            Register::X => self.x,
            Register::Y => self.y,
            Register::Sp => self.sp,
            Register::D => self.d,
            Register::Pc => self.pc,
        }
    }

    fn store_raw(&mut self, reg: Register, raw: u16) {
        match reg {
            Register::A => self.c = raw,
            Register::X | Register::Y => {
                let value = if self.index_is_8bit() { raw & 0x00FF } else { raw };
                if reg == Register::X {
                    self.x = value;
                } else {
                    self.y = value;
                }
            }
            Register::Sp => self.set(Register::Sp, raw),
            Register::D => self.d = raw,
            Register::Pc => self.pc = raw,
        }
    }

    // --- shorthands used by the executor ---

    #[inline]
    pub fn a(&self) -> u16 {
        self.get(Register::A)
    }

    #[inline]
    pub fn set_a(&mut self, value: u16) {
        self.set(Register::A, value)
    }

    /// Full 16-bit accumulator (B:A) regardless of M.
    #[inline]
    pub fn c(&self) -> u16 {
        self.c
    }

    #[inline]
    pub fn set_c(&mut self, value: u16) {
        self.c = value;
    }

    #[inline]
    pub fn x(&self) -> u16 {
        self.get(Register::X)
    }

    #[inline]
    pub fn set_x(&mut self, value: u16) {
        self.set(Register::X, value)
    }

    #[inline]
    pub fn y(&self) -> u16 {
        self.get(Register::Y)
    }

    #[inline]
    pub fn set_y(&mut self, value: u16) {
        self.set(Register::Y, value)
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.sp
    }

    #[inline]
    pub fn set_sp(&mut self, value: u16) {
        self.set(Register::Sp, value)
    }

    pub fn set_nz(&mut self, value: u16, width: Width) {
        let value = value & width.mask();
        self.p.set(StatusFlags::ZERO, value == 0);
        self.p.set(StatusFlags::NEGATIVE, value & width.sign_bit() != 0);
    }
}
