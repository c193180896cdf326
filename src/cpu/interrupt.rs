//! Interrupt controller: one pending slot, dispatched at the top of each step.

use super::registers::{RegisterFile, StatusFlags, BREAK_BIT};
use super::stack;
use super::RunState;
use crate::cpu_bus::CpuBus;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptKind {
    Cop,
    Brk,
    Abort,
    Nmi,
    Reset,
    Irq,
}

impl InterruptKind {
    pub const ALL: [InterruptKind; 6] = [
        InterruptKind::Cop,
        InterruptKind::Brk,
        InterruptKind::Abort,
        InterruptKind::Nmi,
        InterruptKind::Reset,
        InterruptKind::Irq,
    ];

    /// Bank 0 location of the native-mode vector. The native table has no RESET
    /// entry; reset always uses the emulation vector.
    pub const fn native_vector_offset(self) -> u16 {
        match self {
            InterruptKind::Cop => 0xFFE4,
            InterruptKind::Brk => 0xFFE6,
            InterruptKind::Abort => 0xFFE8,
            InterruptKind::Nmi => 0xFFEA,
            InterruptKind::Reset => 0xFFFC,
            InterruptKind::Irq => 0xFFEE,
        }
    }

    /// Bank 0 location of the emulation-mode vector (BRK shares IRQ's).
    pub const fn emulation_vector_offset(self) -> u16 {
        match self {
            InterruptKind::Cop => 0xFFF4,
            InterruptKind::Brk => 0xFFFE,
            InterruptKind::Abort => 0xFFF8,
            InterruptKind::Nmi => 0xFFFA,
            InterruptKind::Reset => 0xFFFC,
            InterruptKind::Irq => 0xFFFE,
        }
    }

    const fn index(self) -> usize {
        match self {
            InterruptKind::Cop => 0,
            InterruptKind::Brk => 1,
            InterruptKind::Abort => 2,
            InterruptKind::Nmi => 3,
            InterruptKind::Reset => 4,
            InterruptKind::Irq => 5,
        }
    }
}

/// Native and emulation vectors per interrupt kind, read once from the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterruptVectorTable {
    native: [u16; 6],
    emulation: [u16; 6],
}

impl InterruptVectorTable {
    /// Reads both tables through `read_word`, which is given a bank 0 offset.
    pub fn read_with<F>(mut read_word: F) -> Self
    where
        F: FnMut(u16) -> u16,
    {
        let mut table = Self::default();
        for kind in InterruptKind::ALL {
            table.native[kind.index()] = read_word(kind.native_vector_offset());
            table.emulation[kind.index()] = read_word(kind.emulation_vector_offset());
        }
        table
    }

    pub fn native(&self, kind: InterruptKind) -> u16 {
        self.native[kind.index()]
    }

    pub fn emulation(&self, kind: InterruptKind) -> u16 {
        self.emulation[kind.index()]
    }

    pub fn set_native(&mut self, kind: InterruptKind, vector: u16) {
        self.native[kind.index()] = vector;
    }

    pub fn set_emulation(&mut self, kind: InterruptKind, vector: u16) {
        self.emulation[kind.index()] = vector;
    }

    pub fn lookup(&self, kind: InterruptKind, emulation: bool) -> u16 {
        if emulation || kind == InterruptKind::Reset {
            self.emulation(kind)
        } else {
            self.native(kind)
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InterruptController {
    pending: Option<InterruptKind>,
}

impl InterruptController {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Requests an interrupt. A later request replaces an earlier one.
    pub fn set(&mut self, kind: InterruptKind) {
        self.pending = Some(kind);
    }

    pub fn pending(&self) -> Option<InterruptKind> {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Dispatches the pending request, if any. Returns the cycles spent, or `None`
    /// when nothing was dispatched.
    pub fn tick(
        &mut self,
        regs: &mut RegisterFile,
        bus: &mut dyn CpuBus,
        run: &mut RunState,
    ) -> Result<Option<u8>> {
        let Some(kind) = self.pending else {
            return Ok(None);
        };

        // After STP only a reset gets through.
        if run.stopped && kind != InterruptKind::Reset {
            return Ok(None);
        }

        if kind == InterruptKind::Irq && regs.flag(StatusFlags::IRQ_DISABLE) {
            // Masked: the line stays asserted, but a WAI still resumes.
            run.waiting = false;
            return Ok(None);
        }

        self.pending = None;
        run.waiting = false;
        let cycles = enter(regs, bus, kind)?;
        if kind == InterruptKind::Reset {
            run.stopped = false;
        }
        log::debug!("interrupt {:?} -> {:02X}:{:04X}", kind, regs.k, regs.pc);
        Ok(Some(cycles))
    }
}

/// Vectors the CPU to `kind`. Used both by the controller and by BRK/COP, which
/// enter their handlers synchronously. PC must already point past the
/// instruction (or at the interrupted instruction for hardware sources).
pub fn enter(regs: &mut RegisterFile, bus: &mut dyn CpuBus, kind: InterruptKind) -> Result<u8> {
    let vectors = bus.vectors();

    if kind == InterruptKind::Reset {
        regs.reset();
        regs.pc = vectors.lookup(InterruptKind::Reset, true);
        return Ok(7);
    }

    let emulation = regs.emulation();
    let (k, pc) = (regs.k, regs.pc);
    if !emulation {
        stack::push_u8(regs, bus, k)?;
    }
    stack::push_u16(regs, bus, pc)?;

    let mut pushed = regs.p();
    if emulation {
        pushed |= 0x20;
        if kind == InterruptKind::Brk {
            pushed |= BREAK_BIT;
        } else {
            pushed &= !BREAK_BIT;
        }
    }
    stack::push_u8(regs, bus, pushed)?;

    regs.set_flag(StatusFlags::IRQ_DISABLE, true);
    regs.set_flag(StatusFlags::DECIMAL, false);
    regs.k = 0;
    regs.pc = vectors.lookup(kind, emulation);

    Ok(if emulation { 7 } else { 8 })
}
