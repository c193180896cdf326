//! Flat 256-entry opcode table.
//!
//! Each entry pairs static metadata (mnemonic, addressing mode, base cycle count
//! and the width/page penalties that apply) with the handler that executes it.
//! Base counts are the 8-bit, page-aligned figures; [`Penalty`] adds the rest.

use super::addressing::AddressingMode;
use super::instructions as ins;
use super::registers::RegisterFile;
use super::ExecContext;
use crate::error::Result;
use bitflags::bitflags;
use std::fmt;
use std::sync::OnceLock;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Penalty: u8 {
        /// +1 when the accumulator is 16-bit.
        const M16 = 0x01;
        /// +2 when the accumulator is 16-bit (read-modify-write).
        const M16_RMW = 0x02;
        /// +1 when the index registers are 16-bit.
        const X16 = 0x04;
        /// +1 when D's low byte is non-zero.
        const DIRECT_LOW = 0x08;
        /// +1 when indexing crossed a page or the index registers are 16-bit.
        const INDEX_CROSS = 0x10;
        /// +1 in native mode (extra bank byte on the stack).
        const NATIVE = 0x20;
    }
}

impl Penalty {
    /// Penalties decided by register state before the instruction runs.
    pub fn static_cycles(self, regs: &RegisterFile) -> u8 {
        let mut cycles = 0;
        if !regs.accumulator_is_8bit() {
            if self.contains(Penalty::M16) {
                cycles += 1;
            }
            if self.contains(Penalty::M16_RMW) {
                cycles += 2;
            }
        }
        if self.contains(Penalty::X16) && !regs.index_is_8bit() {
            cycles += 1;
        }
        if self.contains(Penalty::DIRECT_LOW) && regs.d & 0x00FF != 0 {
            cycles += 1;
        }
        if self.contains(Penalty::NATIVE) && !regs.emulation() {
            cycles += 1;
        }
        cycles
    }
}

pub type Handler = fn(&mut ExecContext<'_>, AddressingMode) -> Result<u8>;

#[derive(Clone, Copy)]
pub struct Operation {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub base_cycles: u8,
    pub penalties: Penalty,
    pub handler: Handler,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("opcode", &format_args!("{:02X}", self.opcode))
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("base_cycles", &self.base_cycles)
            .field("penalties", &self.penalties)
            .finish()
    }
}

impl Operation {
    /// Encoded length including the opcode byte.
    pub fn size(&self, regs: &RegisterFile) -> u16 {
        1 + self
            .mode
            .operand_bytes(regs.accumulator_is_8bit(), regs.index_is_8bit())
    }

    /// Runs the handler and returns the total cycle count.
    pub fn execute(&self, ctx: &mut ExecContext<'_>) -> Result<u8> {
        let mut cycles = self.base_cycles + self.penalties.static_cycles(ctx.regs);
        let index_16 = !ctx.regs.index_is_8bit();
        ctx.page_crossed = false;

        cycles += (self.handler)(ctx, self.mode)?;

        if self.penalties.contains(Penalty::INDEX_CROSS) && (ctx.page_crossed || index_16) {
            cycles += 1;
        }
        Ok(cycles)
    }
}

pub struct OpcodeTable {
    entries: [Option<Operation>; 256],
}

impl OpcodeTable {
    pub fn get(&self, opcode: u8) -> Option<&Operation> {
        self.entries[opcode as usize].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().flatten()
    }

    fn insert(
        &mut self,
        opcode: u8,
        mnemonic: &'static str,
        handler: Handler,
        mode: AddressingMode,
        base_cycles: u8,
        penalties: Penalty,
    ) {
        self.entries[opcode as usize] = Some(Operation {
            opcode,
            mnemonic,
            mode,
            base_cycles,
            penalties,
            handler,
        });
    }

    /// The fifteen addressing forms shared by ORA/AND/EOR/ADC/STA/LDA/CMP/SBC,
    /// laid out at fixed offsets from the group's base opcode.
    fn accumulator_group(&mut self, base: u8, mnemonic: &'static str, handler: Handler, store: bool) {
        use AddressingMode::*;
        let m = Penalty::M16;
        let dl = Penalty::M16 | Penalty::DIRECT_LOW;
        let cross = if store {
            Penalty::M16
        } else {
            Penalty::M16 | Penalty::INDEX_CROSS
        };
        let indexed_cycles = if store { 5 } else { 4 };

        let forms: [(u8, AddressingMode, u8, Penalty); 15] = [
            (0x01, DirectIndexedIndirect, 6, dl),
            (0x03, StackRelative, 4, m),
            (0x05, Direct, 3, dl),
            (0x07, DirectIndirectLong, 6, dl),
            (0x09, ImmediateM, 2, m),
            (0x0D, Absolute, 4, m),
            (0x0F, AbsoluteLong, 5, m),
            (
                0x11,
                DirectIndirectIndexed,
                if store { 6 } else { 5 },
                if store { dl } else { dl | Penalty::INDEX_CROSS },
            ),
            (0x12, DirectIndirect, 5, dl),
            (0x13, StackRelativeIndirectIndexed, 7, m),
            (0x15, DirectX, 4, dl),
            (0x17, DirectIndirectLongIndexed, 6, dl),
            (0x19, AbsoluteY, indexed_cycles, cross),
            (0x1D, AbsoluteX, indexed_cycles, cross),
            (0x1F, AbsoluteLongX, 5, m),
        ];

        for (offset, mode, cycles, penalties) in forms {
            if store && mode == ImmediateM {
                continue;
            }
            self.insert(base + offset, mnemonic, handler, mode, cycles, penalties);
        }
    }

    /// ASL/ROL/LSR/ROR share one layout.
    fn shift_group(&mut self, base: u8, mnemonic: &'static str, handler: Handler) {
        use AddressingMode::*;
        let rmw = Penalty::M16_RMW;
        self.insert(base + 0x06, mnemonic, handler, Direct, 5, rmw | Penalty::DIRECT_LOW);
        self.insert(base + 0x0A, mnemonic, handler, Accumulator, 2, Penalty::empty());
        self.insert(base + 0x0E, mnemonic, handler, Absolute, 6, rmw);
        self.insert(base + 0x16, mnemonic, handler, DirectX, 6, rmw | Penalty::DIRECT_LOW);
        self.insert(base + 0x1E, mnemonic, handler, AbsoluteX, 7, rmw);
    }

    fn build() -> Self {
        use AddressingMode::*;
        let mut t = OpcodeTable {
            entries: [None; 256],
        };
        let none = Penalty::empty();
        let m = Penalty::M16;
        let x = Penalty::X16;
        let dl = Penalty::DIRECT_LOW;
        let rmw = Penalty::M16_RMW;

        t.accumulator_group(0x00, "ORA", ins::ora, false);
        t.accumulator_group(0x20, "AND", ins::and, false);
        t.accumulator_group(0x40, "EOR", ins::eor, false);
        t.accumulator_group(0x60, "ADC", ins::adc, false);
        t.accumulator_group(0x80, "STA", ins::sta, true);
        t.accumulator_group(0xA0, "LDA", ins::lda, false);
        t.accumulator_group(0xC0, "CMP", ins::cmp, false);
        t.accumulator_group(0xE0, "SBC", ins::sbc, false);

        t.shift_group(0x00, "ASL", ins::asl);
        t.shift_group(0x20, "ROL", ins::rol);
        t.shift_group(0x40, "LSR", ins::lsr);
        t.shift_group(0x60, "ROR", ins::ror);

        // INC/DEC
        t.insert(0x1A, "INC", ins::inc, Accumulator, 2, none);
        t.insert(0xE6, "INC", ins::inc, Direct, 5, rmw | dl);
        t.insert(0xEE, "INC", ins::inc, Absolute, 6, rmw);
        t.insert(0xF6, "INC", ins::inc, DirectX, 6, rmw | dl);
        t.insert(0xFE, "INC", ins::inc, AbsoluteX, 7, rmw);
        t.insert(0x3A, "DEC", ins::dec, Accumulator, 2, none);
        t.insert(0xC6, "DEC", ins::dec, Direct, 5, rmw | dl);
        t.insert(0xCE, "DEC", ins::dec, Absolute, 6, rmw);
        t.insert(0xD6, "DEC", ins::dec, DirectX, 6, rmw | dl);
        t.insert(0xDE, "DEC", ins::dec, AbsoluteX, 7, rmw);

        // TSB/TRB
        t.insert(0x04, "TSB", ins::tsb, Direct, 5, rmw | dl);
        t.insert(0x0C, "TSB", ins::tsb, Absolute, 6, rmw);
        t.insert(0x14, "TRB", ins::trb, Direct, 5, rmw | dl);
        t.insert(0x1C, "TRB", ins::trb, Absolute, 6, rmw);

        // BIT
        t.insert(0x24, "BIT", ins::bit, Direct, 3, m | dl);
        t.insert(0x2C, "BIT", ins::bit, Absolute, 4, m);
        t.insert(0x34, "BIT", ins::bit, DirectX, 4, m | dl);
        t.insert(0x3C, "BIT", ins::bit, AbsoluteX, 4, m | Penalty::INDEX_CROSS);
        t.insert(0x89, "BIT", ins::bit, ImmediateM, 2, m);

        // STZ
        t.insert(0x64, "STZ", ins::stz, Direct, 3, m | dl);
        t.insert(0x74, "STZ", ins::stz, DirectX, 4, m | dl);
        t.insert(0x9C, "STZ", ins::stz, Absolute, 4, m);
        t.insert(0x9E, "STZ", ins::stz, AbsoluteX, 5, m);

        // Index loads, stores and compares
        t.insert(0x86, "STX", ins::stx, Direct, 3, x | dl);
        t.insert(0x8E, "STX", ins::stx, Absolute, 4, x);
        t.insert(0x96, "STX", ins::stx, DirectY, 4, x | dl);
        t.insert(0x84, "STY", ins::sty, Direct, 3, x | dl);
        t.insert(0x8C, "STY", ins::sty, Absolute, 4, x);
        t.insert(0x94, "STY", ins::sty, DirectX, 4, x | dl);
        t.insert(0xA2, "LDX", ins::ldx, ImmediateX, 2, x);
        t.insert(0xA6, "LDX", ins::ldx, Direct, 3, x | dl);
        t.insert(0xAE, "LDX", ins::ldx, Absolute, 4, x);
        t.insert(0xB6, "LDX", ins::ldx, DirectY, 4, x | dl);
        t.insert(0xBE, "LDX", ins::ldx, AbsoluteY, 4, x | Penalty::INDEX_CROSS);
        t.insert(0xA0, "LDY", ins::ldy, ImmediateX, 2, x);
        t.insert(0xA4, "LDY", ins::ldy, Direct, 3, x | dl);
        t.insert(0xAC, "LDY", ins::ldy, Absolute, 4, x);
        t.insert(0xB4, "LDY", ins::ldy, DirectX, 4, x | dl);
        t.insert(0xBC, "LDY", ins::ldy, AbsoluteX, 4, x | Penalty::INDEX_CROSS);
        t.insert(0xE0, "CPX", ins::cpx, ImmediateX, 2, x);
        t.insert(0xE4, "CPX", ins::cpx, Direct, 3, x | dl);
        t.insert(0xEC, "CPX", ins::cpx, Absolute, 4, x);
        t.insert(0xC0, "CPY", ins::cpy, ImmediateX, 2, x);
        t.insert(0xC4, "CPY", ins::cpy, Direct, 3, x | dl);
        t.insert(0xCC, "CPY", ins::cpy, Absolute, 4, x);

        // Branches
        t.insert(0x10, "BPL", ins::bpl, Relative8, 2, none);
        t.insert(0x30, "BMI", ins::bmi, Relative8, 2, none);
        t.insert(0x50, "BVC", ins::bvc, Relative8, 2, none);
        t.insert(0x70, "BVS", ins::bvs, Relative8, 2, none);
        t.insert(0x90, "BCC", ins::bcc, Relative8, 2, none);
        t.insert(0xB0, "BCS", ins::bcs, Relative8, 2, none);
        t.insert(0xD0, "BNE", ins::bne, Relative8, 2, none);
        t.insert(0xF0, "BEQ", ins::beq, Relative8, 2, none);
        t.insert(0x80, "BRA", ins::bra, Relative8, 2, none);
        t.insert(0x82, "BRL", ins::brl, Relative16, 4, none);

        // Jumps, calls, returns
        t.insert(0x4C, "JMP", ins::jmp, Absolute, 3, none);
        t.insert(0x6C, "JMP", ins::jmp, AbsoluteIndirect, 5, none);
        t.insert(0x7C, "JMP", ins::jmp, AbsoluteIndexedIndirect, 6, none);
        t.insert(0x5C, "JML", ins::jml, AbsoluteLong, 4, none);
        t.insert(0xDC, "JML", ins::jml, AbsoluteIndirectLong, 6, none);
        t.insert(0x20, "JSR", ins::jsr, Absolute, 6, none);
        t.insert(0xFC, "JSR", ins::jsr, AbsoluteIndexedIndirect, 8, none);
        t.insert(0x22, "JSL", ins::jsl, AbsoluteLong, 8, none);
        t.insert(0x60, "RTS", ins::rts, Implied, 6, none);
        t.insert(0x6B, "RTL", ins::rtl, Implied, 6, none);
        t.insert(0x40, "RTI", ins::rti, Implied, 6, Penalty::NATIVE);

        // Stack
        t.insert(0x48, "PHA", ins::pha, Implied, 3, m);
        t.insert(0xDA, "PHX", ins::phx, Implied, 3, x);
        t.insert(0x5A, "PHY", ins::phy, Implied, 3, x);
        t.insert(0x08, "PHP", ins::php, Implied, 3, none);
        t.insert(0x8B, "PHB", ins::phb, Implied, 3, none);
        t.insert(0x0B, "PHD", ins::phd, Implied, 4, none);
        t.insert(0x4B, "PHK", ins::phk, Implied, 3, none);
        t.insert(0x68, "PLA", ins::pla, Implied, 4, m);
        t.insert(0xFA, "PLX", ins::plx, Implied, 4, x);
        t.insert(0x7A, "PLY", ins::ply, Implied, 4, x);
        t.insert(0x28, "PLP", ins::plp, Implied, 4, none);
        t.insert(0xAB, "PLB", ins::plb, Implied, 4, none);
        t.insert(0x2B, "PLD", ins::pld, Implied, 5, none);
        t.insert(0xF4, "PEA", ins::pea, Absolute, 5, none);
        t.insert(0xD4, "PEI", ins::pei, Direct, 6, dl);
        t.insert(0x62, "PER", ins::per, Relative16, 6, none);

        // Transfers
        t.insert(0xAA, "TAX", ins::tax, Implied, 2, none);
        t.insert(0xA8, "TAY", ins::tay, Implied, 2, none);
        t.insert(0x8A, "TXA", ins::txa, Implied, 2, none);
        t.insert(0x98, "TYA", ins::tya, Implied, 2, none);
        t.insert(0xBA, "TSX", ins::tsx, Implied, 2, none);
        t.insert(0x9A, "TXS", ins::txs, Implied, 2, none);
        t.insert(0x9B, "TXY", ins::txy, Implied, 2, none);
        t.insert(0xBB, "TYX", ins::tyx, Implied, 2, none);
        t.insert(0x5B, "TCD", ins::tcd, Implied, 2, none);
        t.insert(0x7B, "TDC", ins::tdc, Implied, 2, none);
        t.insert(0x1B, "TCS", ins::tcs, Implied, 2, none);
        t.insert(0x3B, "TSC", ins::tsc, Implied, 2, none);
        t.insert(0xEB, "XBA", ins::xba, Implied, 3, none);
        t.insert(0xFB, "XCE", ins::xce, Implied, 2, none);

        // Status register
        t.insert(0x18, "CLC", ins::clc, Implied, 2, none);
        t.insert(0x38, "SEC", ins::sec, Implied, 2, none);
        t.insert(0x58, "CLI", ins::cli, Implied, 2, none);
        t.insert(0x78, "SEI", ins::sei, Implied, 2, none);
        t.insert(0xD8, "CLD", ins::cld, Implied, 2, none);
        t.insert(0xF8, "SED", ins::sed, Implied, 2, none);
        t.insert(0xB8, "CLV", ins::clv, Implied, 2, none);
        t.insert(0xC2, "REP", ins::rep, Immediate8, 3, none);
        t.insert(0xE2, "SEP", ins::sep, Immediate8, 3, none);

        // Index increment/decrement
        t.insert(0xE8, "INX", ins::inx, Implied, 2, none);
        t.insert(0xC8, "INY", ins::iny, Implied, 2, none);
        t.insert(0xCA, "DEX", ins::dex, Implied, 2, none);
        t.insert(0x88, "DEY", ins::dey, Implied, 2, none);

        // Control
        t.insert(0xEA, "NOP", ins::nop, Implied, 2, none);
        t.insert(0x42, "WDM", ins::wdm, Immediate8, 2, none);
        t.insert(0x00, "BRK", ins::brk, Immediate8, 7, Penalty::NATIVE);
        t.insert(0x02, "COP", ins::cop, Immediate8, 7, Penalty::NATIVE);
        t.insert(0xCB, "WAI", ins::wai, Implied, 3, none);
        t.insert(0xDB, "STP", ins::stp, Implied, 3, none);
        t.insert(0x54, "MVN", ins::mvn, BlockMove, 7, none);
        t.insert(0x44, "MVP", ins::mvp, BlockMove, 7, none);

        t
    }
}

static TABLE: OnceLock<OpcodeTable> = OnceLock::new();

/// Shared table, built on first use.
pub fn table() -> &'static OpcodeTable {
    TABLE.get_or_init(OpcodeTable::build)
}
