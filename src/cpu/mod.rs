//! 65816 core: register file, addressing resolver, opcode table and executor.

pub mod addressing;
pub mod instructions;
pub mod interrupt;
pub mod opcodes;
pub mod registers;
pub mod stack;

#[cfg(test)]
pub(crate) mod test_bus;
#[cfg(test)]
mod tests;

use crate::address::Address;
use crate::cpu_bus::CpuBus;
use crate::debug_flags;
use crate::error::{EmuError, Result};
use interrupt::{InterruptController, InterruptKind};
use registers::RegisterFile;
use serde::{Deserialize, Serialize};

/// WAI/STP latches. Both survive between steps and are cleared only by an
/// interrupt (WAI) or a reset (STP).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub waiting: bool,
    pub stopped: bool,
}

/// Everything an instruction handler may touch while it executes.
pub struct ExecContext<'a> {
    pub regs: &'a mut RegisterFile,
    pub bus: &'a mut dyn CpuBus,
    pub run: &'a mut RunState,
    /// Set by indexed address resolution when the index crossed a page.
    pub page_crossed: bool,
    /// Address of the opcode byte being executed.
    pub opcode_address: Address,
}

impl<'a> ExecContext<'a> {
    pub fn new(regs: &'a mut RegisterFile, bus: &'a mut dyn CpuBus, run: &'a mut RunState) -> Self {
        let opcode_address = Address::new(regs.k, regs.pc);
        Self {
            regs,
            bus,
            run,
            page_crossed: false,
            opcode_address,
        }
    }
}

pub struct Cpu {
    regs: RegisterFile,
    interrupts: InterruptController,
    run: RunState,
    cycles: u64,
    instructions: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            interrupts: InterruptController::new(),
            run: RunState::default(),
            cycles: 0,
            instructions: 0,
        }
    }

    /// Power-on reset: registers to defaults and PC from the reset vector.
    pub fn reset(&mut self, bus: &mut dyn CpuBus) -> Result<u8> {
        self.interrupts.set(InterruptKind::Reset);
        let cycles = self
            .interrupts
            .tick(&mut self.regs, bus, &mut self.run)?
            .unwrap_or(0);
        self.cycles = self.cycles.wrapping_add(cycles as u64);
        Ok(cycles)
    }

    /// Runs one unit of work: a pending interrupt dispatch, one idle cycle while
    /// waiting or stopped, or one instruction. Returns CPU cycles consumed.
    pub fn step(&mut self, bus: &mut dyn CpuBus) -> Result<u8> {
        if let Some(cycles) = self.interrupts.tick(&mut self.regs, bus, &mut self.run)? {
            self.cycles = self.cycles.wrapping_add(cycles as u64);
            return Ok(cycles);
        }

        if self.run.stopped || self.run.waiting {
            self.cycles = self.cycles.wrapping_add(1);
            return Ok(1);
        }

        let mut ctx = ExecContext::new(&mut self.regs, bus, &mut self.run);
        let pc = ctx.opcode_address;
        let opcode = ctx.fetch_u8()?;
        let op = opcodes::table()
            .get(opcode)
            .ok_or(EmuError::UnimplementedOpcode { opcode, pc })?;

        if debug_flags::trace() {
            log::trace!(
                "{} {:02X} {:<4} {:?} A={:04X} X={:04X} Y={:04X} S={:04X} D={:04X} DB={:02X} P={:02X} E={}",
                pc,
                opcode,
                op.mnemonic,
                op.mode,
                ctx.regs.c(),
                ctx.regs.x(),
                ctx.regs.y(),
                ctx.regs.sp(),
                ctx.regs.d,
                ctx.regs.dbr,
                ctx.regs.p(),
                ctx.regs.emulation() as u8
            );
        }

        let cycles = op.execute(&mut ctx)?;
        self.instructions = self.instructions.wrapping_add(1);
        self.cycles = self.cycles.wrapping_add(cycles as u64);
        Ok(cycles)
    }

    pub fn request_interrupt(&mut self, kind: InterruptKind) {
        self.interrupts.set(kind);
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn set_run_state(&mut self, run: RunState) {
        self.run = run;
    }

    pub fn is_waiting(&self) -> bool {
        self.run.waiting
    }

    pub fn is_stopped(&self) -> bool {
        self.run.stopped
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn set_counters(&mut self, cycles: u64, instructions: u64) {
        self.cycles = cycles;
        self.instructions = instructions;
    }
}
