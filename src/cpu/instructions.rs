//! Instruction handlers.
//!
//! Every handler has the same shape: it receives the execution context and the
//! addressing mode from the opcode table, consumes its operand bytes, applies its
//! effect and returns the cycles it adds on top of the table's base count (taken
//! branches are the only dynamic case).

use super::addressing::AddressingMode;
use super::interrupt::{self, InterruptKind};
use super::registers::{RegisterFile, StatusFlags, Width};
use super::stack;
use super::ExecContext;
use crate::address::Address;
use crate::error::{EmuError, Result};

type Outcome = Result<u8>;

// --- helpers ---

fn push_sized(ctx: &mut ExecContext<'_>, value: u16, width: Width) -> Result<()> {
    match width {
        Width::Byte => stack::push_u8(ctx.regs, ctx.bus, value as u8),
        Width::Word => stack::push_u16(ctx.regs, ctx.bus, value),
    }
}

fn pop_sized(ctx: &mut ExecContext<'_>, width: Width) -> Result<u16> {
    match width {
        Width::Byte => stack::pop_u8(ctx.regs, ctx.bus).map(u16::from),
        Width::Word => stack::pop_u16(ctx.regs, ctx.bus),
    }
}

fn reject_decimal(ctx: &ExecContext<'_>, mnemonic: &'static str) -> Result<()> {
    if ctx.regs.flag(StatusFlags::DECIMAL) {
        return Err(EmuError::DecimalMode {
            mnemonic,
            pc: ctx.opcode_address,
        });
    }
    Ok(())
}

/// Binary add of `operand` and carry into A at the accumulator width. SBC reuses
/// this with the operand complemented.
fn add_with_carry(regs: &mut RegisterFile, operand: u16) {
    let width = regs.m_width();
    let mask = width.mask() as u32;
    let sign = width.sign_bit() as u32;
    let a = regs.a() as u32;
    let b = operand as u32 & mask;
    let carry_in = regs.flag(StatusFlags::CARRY) as u32;
    let sum = a + b + carry_in;

    regs.set_flag(StatusFlags::CARRY, sum > mask);
    regs.set_flag(StatusFlags::OVERFLOW, (!(a ^ b) & (a ^ sum) & sign) != 0);
    let result = (sum & mask) as u16;
    regs.set_a(result);
    regs.set_nz(result, width);
}

fn compare(regs: &mut RegisterFile, register: u16, operand: u16, width: Width) {
    let lhs = register & width.mask();
    let rhs = operand & width.mask();
    regs.set_flag(StatusFlags::CARRY, lhs >= rhs);
    regs.set_nz(lhs.wrapping_sub(rhs), width);
}

/// Read-modify-write on A or memory at the accumulator width.
fn modify<F>(ctx: &mut ExecContext<'_>, mode: AddressingMode, op: F) -> Outcome
where
    F: FnOnce(&mut RegisterFile, u16, Width) -> u16,
{
    let width = ctx.regs.m_width();
    if mode == AddressingMode::Accumulator {
        let value = ctx.regs.a();
        let result = op(ctx.regs, value, width);
        ctx.regs.set_a(result);
        return Ok(0);
    }
    let ea = ctx.resolve(mode)?;
    let value = ctx.read(ea, width)?;
    let result = op(ctx.regs, value, width);
    // RMW stores the high byte first.
    if width == Width::Word {
        ctx.bus.write_u8(ea.hi(), (result >> 8) as u8)?;
    }
    ctx.bus.write_u8(ea.lo(), (result & 0xFF) as u8)?;
    Ok(0)
}

fn branch(ctx: &mut ExecContext<'_>, mode: AddressingMode, condition: bool) -> Outcome {
    let target = ctx.branch_target(mode)?;
    if !condition {
        return Ok(0);
    }
    let mut extra = 1;
    if ctx.regs.emulation() && (target & 0xFF00) != (ctx.regs.pc & 0xFF00) {
        extra += 1;
    }
    ctx.regs.pc = target;
    Ok(extra)
}

fn set_flag_handler(ctx: &mut ExecContext<'_>, flag: StatusFlags, on: bool) -> Outcome {
    ctx.regs.set_flag(flag, on);
    Ok(0)
}

// --- loads and stores ---

pub fn lda(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let value = ctx.value(mode, width)?;
    ctx.regs.set_a(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn ldx(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let value = ctx.value(mode, width)?;
    ctx.regs.set_x(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn ldy(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let value = ctx.value(mode, width)?;
    ctx.regs.set_y(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn sta(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let ea = ctx.resolve(mode)?;
    let (value, width) = (ctx.regs.a(), ctx.regs.m_width());
    ctx.write(ea, width, value)?;
    Ok(0)
}

pub fn stx(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let ea = ctx.resolve(mode)?;
    let (value, width) = (ctx.regs.x(), ctx.regs.x_width());
    ctx.write(ea, width, value)?;
    Ok(0)
}

pub fn sty(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let ea = ctx.resolve(mode)?;
    let (value, width) = (ctx.regs.y(), ctx.regs.x_width());
    ctx.write(ea, width, value)?;
    Ok(0)
}

pub fn stz(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let ea = ctx.resolve(mode)?;
    let width = ctx.regs.m_width();
    ctx.write(ea, width, 0)?;
    Ok(0)
}

// --- arithmetic and logic ---

pub fn adc(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    reject_decimal(ctx, "ADC")?;
    let width = ctx.regs.m_width();
    let operand = ctx.value(mode, width)?;
    add_with_carry(ctx.regs, operand);
    Ok(0)
}

pub fn sbc(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    reject_decimal(ctx, "SBC")?;
    let width = ctx.regs.m_width();
    let operand = ctx.value(mode, width)?;
    add_with_carry(ctx.regs, !operand);
    Ok(0)
}

pub fn and(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let result = ctx.regs.a() & ctx.value(mode, width)?;
    ctx.regs.set_a(result);
    ctx.regs.set_nz(result, width);
    Ok(0)
}

pub fn ora(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let result = ctx.regs.a() | ctx.value(mode, width)?;
    ctx.regs.set_a(result);
    ctx.regs.set_nz(result, width);
    Ok(0)
}

pub fn eor(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let result = ctx.regs.a() ^ ctx.value(mode, width)?;
    ctx.regs.set_a(result);
    ctx.regs.set_nz(result, width);
    Ok(0)
}

pub fn cmp(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let operand = ctx.value(mode, width)?;
    let a = ctx.regs.a();
    compare(ctx.regs, a, operand, width);
    Ok(0)
}

pub fn cpx(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let operand = ctx.value(mode, width)?;
    let x = ctx.regs.x();
    compare(ctx.regs, x, operand, width);
    Ok(0)
}

pub fn cpy(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let operand = ctx.value(mode, width)?;
    let y = ctx.regs.y();
    compare(ctx.regs, y, operand, width);
    Ok(0)
}

/// Immediate BIT only touches Z; the memory forms also copy N and V from the
/// operand's top two bits.
pub fn bit(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let operand = ctx.value(mode, width)?;
    let a = ctx.regs.a();
    ctx.regs
        .set_flag(StatusFlags::ZERO, a & operand & width.mask() == 0);
    if !mode.is_immediate() {
        let sign = width.sign_bit();
        ctx.regs.set_flag(StatusFlags::NEGATIVE, operand & sign != 0);
        ctx.regs
            .set_flag(StatusFlags::OVERFLOW, operand & (sign >> 1) != 0);
    }
    Ok(0)
}

// --- read-modify-write ---

pub fn asl(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        regs.set_flag(StatusFlags::CARRY, value & width.sign_bit() != 0);
        let result = (value << 1) & width.mask();
        regs.set_nz(result, width);
        result
    })
}

pub fn lsr(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        regs.set_flag(StatusFlags::CARRY, value & 1 != 0);
        let result = (value & width.mask()) >> 1;
        regs.set_nz(result, width);
        result
    })
}

pub fn rol(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let carry_in = regs.flag(StatusFlags::CARRY) as u16;
        regs.set_flag(StatusFlags::CARRY, value & width.sign_bit() != 0);
        let result = ((value << 1) | carry_in) & width.mask();
        regs.set_nz(result, width);
        result
    })
}

pub fn ror(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let carry_in = if regs.flag(StatusFlags::CARRY) {
            width.sign_bit()
        } else {
            0
        };
        regs.set_flag(StatusFlags::CARRY, value & 1 != 0);
        let result = ((value & width.mask()) >> 1) | carry_in;
        regs.set_nz(result, width);
        result
    })
}

pub fn inc(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let result = value.wrapping_add(1) & width.mask();
        regs.set_nz(result, width);
        result
    })
}

pub fn dec(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let result = value.wrapping_sub(1) & width.mask();
        regs.set_nz(result, width);
        result
    })
}

pub fn tsb(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let a = regs.a();
        regs.set_flag(StatusFlags::ZERO, a & value & width.mask() == 0);
        value | a
    })
}

pub fn trb(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    modify(ctx, mode, |regs, value, width| {
        let a = regs.a();
        regs.set_flag(StatusFlags::ZERO, a & value & width.mask() == 0);
        value & !a
    })
}

pub fn inx(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let value = ctx.regs.x().wrapping_add(1);
    ctx.regs.set_x(value);
    ctx.regs.set_nz(value, ctx.regs.x_width());
    Ok(0)
}

pub fn iny(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let value = ctx.regs.y().wrapping_add(1);
    ctx.regs.set_y(value);
    ctx.regs.set_nz(value, ctx.regs.x_width());
    Ok(0)
}

pub fn dex(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let value = ctx.regs.x().wrapping_sub(1);
    ctx.regs.set_x(value);
    ctx.regs.set_nz(value, ctx.regs.x_width());
    Ok(0)
}

pub fn dey(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let value = ctx.regs.y().wrapping_sub(1);
    ctx.regs.set_y(value);
    ctx.regs.set_nz(value, ctx.regs.x_width());
    Ok(0)
}

// --- branches ---

pub fn bpl(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = !ctx.regs.flag(StatusFlags::NEGATIVE);
    branch(ctx, mode, condition)
}

pub fn bmi(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = ctx.regs.flag(StatusFlags::NEGATIVE);
    branch(ctx, mode, condition)
}

pub fn bvc(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = !ctx.regs.flag(StatusFlags::OVERFLOW);
    branch(ctx, mode, condition)
}

pub fn bvs(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = ctx.regs.flag(StatusFlags::OVERFLOW);
    branch(ctx, mode, condition)
}

pub fn bcc(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = !ctx.regs.flag(StatusFlags::CARRY);
    branch(ctx, mode, condition)
}

pub fn bcs(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = ctx.regs.flag(StatusFlags::CARRY);
    branch(ctx, mode, condition)
}

pub fn bne(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = !ctx.regs.flag(StatusFlags::ZERO);
    branch(ctx, mode, condition)
}

pub fn beq(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let condition = ctx.regs.flag(StatusFlags::ZERO);
    branch(ctx, mode, condition)
}

pub fn bra(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    branch(ctx, mode, true)
}

pub fn brl(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    ctx.regs.pc = ctx.branch_target(mode)?;
    Ok(0)
}

// --- jumps, calls and returns ---

pub fn jmp(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let target = ctx.jump_target(mode)?;
    ctx.regs.k = target.bank();
    ctx.regs.pc = target.offset();
    Ok(0)
}

pub fn jml(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    jmp(ctx, mode)
}

/// Pushes the address of the last operand byte, so RTS lands one past it.
pub fn jsr(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let target = ctx.jump_target(mode)?;
    let ret = ctx.regs.pc.wrapping_sub(1);
    stack::push_u16(ctx.regs, ctx.bus, ret)?;
    ctx.regs.pc = target.offset();
    Ok(0)
}

pub fn jsl(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let target = ctx.jump_target(mode)?;
    let (ret, k) = (ctx.regs.pc.wrapping_sub(1), ctx.regs.k);
    stack::push_u8(ctx.regs, ctx.bus, k)?;
    stack::push_u16(ctx.regs, ctx.bus, ret)?;
    ctx.regs.k = target.bank();
    ctx.regs.pc = target.offset();
    Ok(0)
}

pub fn rts(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let ret = stack::pop_u16(ctx.regs, ctx.bus)?;
    ctx.regs.pc = ret.wrapping_add(1);
    Ok(0)
}

pub fn rtl(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let ret = stack::pop_u16(ctx.regs, ctx.bus)?;
    ctx.regs.k = stack::pop_u8(ctx.regs, ctx.bus)?;
    ctx.regs.pc = ret.wrapping_add(1);
    Ok(0)
}

pub fn rti(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let p = stack::pop_u8(ctx.regs, ctx.bus)?;
    ctx.regs.set_p(p);
    ctx.regs.pc = stack::pop_u16(ctx.regs, ctx.bus)?;
    if !ctx.regs.emulation() {
        ctx.regs.k = stack::pop_u8(ctx.regs, ctx.bus)?;
    }
    Ok(0)
}

// --- stack ---

pub fn pha(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let (value, width) = (ctx.regs.a(), ctx.regs.m_width());
    push_sized(ctx, value, width)?;
    Ok(0)
}

pub fn phx(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let (value, width) = (ctx.regs.x(), ctx.regs.x_width());
    push_sized(ctx, value, width)?;
    Ok(0)
}

pub fn phy(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let (value, width) = (ctx.regs.y(), ctx.regs.x_width());
    push_sized(ctx, value, width)?;
    Ok(0)
}

pub fn php(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let p = ctx.regs.p();
    stack::push_u8(ctx.regs, ctx.bus, p)?;
    Ok(0)
}

pub fn phb(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let dbr = ctx.regs.dbr;
    stack::push_u8(ctx.regs, ctx.bus, dbr)?;
    Ok(0)
}

pub fn phd(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let d = ctx.regs.d;
    stack::push_u16(ctx.regs, ctx.bus, d)?;
    Ok(0)
}

pub fn phk(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let k = ctx.regs.k;
    stack::push_u8(ctx.regs, ctx.bus, k)?;
    Ok(0)
}

pub fn pla(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let width = ctx.regs.m_width();
    let value = pop_sized(ctx, width)?;
    ctx.regs.set_a(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn plx(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let value = pop_sized(ctx, width)?;
    ctx.regs.set_x(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn ply(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let width = ctx.regs.x_width();
    let value = pop_sized(ctx, width)?;
    ctx.regs.set_y(value);
    ctx.regs.set_nz(value, width);
    Ok(0)
}

pub fn plp(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let p = stack::pop_u8(ctx.regs, ctx.bus)?;
    ctx.regs.set_p(p);
    Ok(0)
}

pub fn plb(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let dbr = stack::pop_u8(ctx.regs, ctx.bus)?;
    ctx.regs.dbr = dbr;
    ctx.regs.set_nz(dbr as u16, Width::Byte);
    Ok(0)
}

pub fn pld(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let d = stack::pop_u16(ctx.regs, ctx.bus)?;
    ctx.regs.d = d;
    ctx.regs.set_nz(d, Width::Word);
    Ok(0)
}

pub fn pea(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let value = ctx.fetch_u16()?;
    stack::push_u16(ctx.regs, ctx.bus, value)?;
    Ok(0)
}

pub fn pei(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let operand = ctx.fetch_u8()?;
    let ptr = ctx.direct_address(operand, 0);
    let value = ctx.read(ptr, Width::Word)?;
    stack::push_u16(ctx.regs, ctx.bus, value)?;
    Ok(0)
}

pub fn per(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let value = ctx.branch_target(mode)?;
    stack::push_u16(ctx.regs, ctx.bus, value)?;
    Ok(0)
}

// --- transfers ---

pub fn tax(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_x(ctx.regs.c());
    ctx.regs.set_nz(ctx.regs.x(), ctx.regs.x_width());
    Ok(0)
}

pub fn tay(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_y(ctx.regs.c());
    ctx.regs.set_nz(ctx.regs.y(), ctx.regs.x_width());
    Ok(0)
}

pub fn txa(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_a(ctx.regs.x());
    ctx.regs.set_nz(ctx.regs.a(), ctx.regs.m_width());
    Ok(0)
}

pub fn tya(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_a(ctx.regs.y());
    ctx.regs.set_nz(ctx.regs.a(), ctx.regs.m_width());
    Ok(0)
}

pub fn tsx(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_x(ctx.regs.sp());
    ctx.regs.set_nz(ctx.regs.x(), ctx.regs.x_width());
    Ok(0)
}

pub fn txs(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_sp(ctx.regs.x());
    Ok(0)
}

pub fn txy(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_y(ctx.regs.x());
    ctx.regs.set_nz(ctx.regs.y(), ctx.regs.x_width());
    Ok(0)
}

pub fn tyx(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_x(ctx.regs.y());
    ctx.regs.set_nz(ctx.regs.x(), ctx.regs.x_width());
    Ok(0)
}

pub fn tcd(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.d = ctx.regs.c();
    ctx.regs.set_nz(ctx.regs.d, Width::Word);
    Ok(0)
}

pub fn tdc(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_c(ctx.regs.d);
    ctx.regs.set_nz(ctx.regs.c(), Width::Word);
    Ok(0)
}

pub fn tcs(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_sp(ctx.regs.c());
    Ok(0)
}

pub fn tsc(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.regs.set_c(ctx.regs.sp());
    ctx.regs.set_nz(ctx.regs.c(), Width::Word);
    Ok(0)
}

pub fn xba(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let swapped = ctx.regs.c().swap_bytes();
    ctx.regs.set_c(swapped);
    ctx.regs.set_nz(swapped, Width::Byte);
    Ok(0)
}

pub fn xce(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    let carry = ctx.regs.flag(StatusFlags::CARRY);
    let emulation = ctx.regs.emulation();
    ctx.regs.set_flag(StatusFlags::CARRY, emulation);
    ctx.regs.set_emulation(carry);
    Ok(0)
}

// --- status register ---

pub fn clc(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::CARRY, false)
}

pub fn sec(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::CARRY, true)
}

pub fn cli(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::IRQ_DISABLE, false)
}

pub fn sei(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::IRQ_DISABLE, true)
}

pub fn cld(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::DECIMAL, false)
}

pub fn sed(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::DECIMAL, true)
}

pub fn clv(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    set_flag_handler(ctx, StatusFlags::OVERFLOW, false)
}

pub fn rep(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let mask = ctx.value(mode, Width::Byte)? as u8;
    let p = ctx.regs.p() & !mask;
    ctx.regs.set_p(p);
    Ok(0)
}

pub fn sep(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    let mask = ctx.value(mode, Width::Byte)? as u8;
    let p = ctx.regs.p() | mask;
    ctx.regs.set_p(p);
    Ok(0)
}

// --- control ---

pub fn nop(_ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    Ok(0)
}

/// Reserved two-byte NOP.
pub fn wdm(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    ctx.resolve(mode)?;
    Ok(0)
}

pub fn brk(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    ctx.resolve(mode)?;
    interrupt::enter(ctx.regs, ctx.bus, InterruptKind::Brk)?;
    Ok(0)
}

pub fn cop(ctx: &mut ExecContext<'_>, mode: AddressingMode) -> Outcome {
    ctx.resolve(mode)?;
    interrupt::enter(ctx.regs, ctx.bus, InterruptKind::Cop)?;
    Ok(0)
}

pub fn wai(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.run.waiting = true;
    Ok(0)
}

pub fn stp(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    ctx.run.stopped = true;
    Ok(0)
}

/// One byte of a block move per execution. While C has not wrapped to 0xFFFF the
/// PC is rewound so the same instruction runs again on the next step.
fn block_move(ctx: &mut ExecContext<'_>, step: u16) -> Outcome {
    let dest_bank = ctx.fetch_u8()?;
    let src_bank = ctx.fetch_u8()?;
    let (x, y) = (ctx.regs.x(), ctx.regs.y());

    let value = ctx.bus.read_u8(Address::new(src_bank, x))?;
    ctx.bus.write_u8(Address::new(dest_bank, y), value)?;

    ctx.regs.dbr = dest_bank;
    ctx.regs.set_x(x.wrapping_add(step));
    ctx.regs.set_y(y.wrapping_add(step));
    let remaining = ctx.regs.c().wrapping_sub(1);
    ctx.regs.set_c(remaining);
    if remaining != 0xFFFF {
        ctx.regs.pc = ctx.regs.pc.wrapping_sub(3);
    }
    Ok(0)
}

pub fn mvn(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    block_move(ctx, 1)
}

pub fn mvp(ctx: &mut ExecContext<'_>, _mode: AddressingMode) -> Outcome {
    block_move(ctx, 0xFFFF)
}
