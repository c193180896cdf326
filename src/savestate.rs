use crate::bus::{Bus, WRAM_SIZE};
use crate::cpu::interrupt::InterruptKind;
use crate::cpu::{Cpu, RunState};
use crate::dma::DmaController;
use crate::error::{EmuError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub cpu_state: CpuSaveState,
    pub memory_state: MemoryState,
    pub dma: DmaController,
    pub mdr: u8,
    pub wram_port: u32,
    pub registers: Vec<u8>,
    pub rom_checksum: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSaveState {
    pub c: u16,
    pub x: u16,
    pub y: u16,
    pub sp: u16,
    pub dp: u16,
    pub db: u8,
    pub pb: u8,
    pub pc: u16,
    pub p: u8,
    pub emulation_mode: bool,
    pub run: RunState,
    pub pending_interrupt: Option<InterruptKind>,
    pub cycles: u64,
    pub instructions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryState {
    pub wram: Vec<u8>,
    pub sram: Vec<u8>,
}

fn invalid(msg: String) -> EmuError {
    EmuError::SaveState(Box::new(bincode::ErrorKind::Custom(msg)))
}

impl SaveState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn capture(cpu: &Cpu, bus: &Bus) -> Self {
        let regs = cpu.regs();
        Self {
            version: Self::CURRENT_VERSION,
            cpu_state: CpuSaveState {
                c: regs.c(),
                x: regs.x(),
                y: regs.y(),
                sp: regs.sp(),
                dp: regs.d,
                db: regs.dbr,
                pb: regs.k,
                pc: regs.pc,
                p: regs.p(),
                emulation_mode: regs.emulation(),
                run: cpu.run_state(),
                pending_interrupt: cpu.interrupts().pending(),
                cycles: cpu.cycles(),
                instructions: cpu.instructions(),
            },
            memory_state: MemoryState {
                wram: bus.wram().to_vec(),
                sram: bus.cartridge().sram().to_vec(),
            },
            dma: bus.dma().clone(),
            mdr: bus.mdr(),
            wram_port: bus.wram_port(),
            registers: bus.registers().values(),
            rom_checksum: bus.cartridge().header().checksum,
        }
    }

    /// Writes the state back. Everything is validated before the first field
    /// is touched, so a rejected state leaves `cpu` and `bus` unchanged.
    pub fn restore(&self, cpu: &mut Cpu, bus: &mut Bus) -> Result<()> {
        if self.version > Self::CURRENT_VERSION {
            return Err(invalid(format!(
                "save state version {} is not supported (current: {})",
                self.version,
                Self::CURRENT_VERSION
            )));
        }
        if self.memory_state.wram.len() != WRAM_SIZE {
            return Err(invalid(format!(
                "WRAM is {} bytes, expected {}",
                self.memory_state.wram.len(),
                WRAM_SIZE
            )));
        }
        if self.memory_state.sram.len() != bus.cartridge().sram().len() {
            return Err(invalid(format!(
                "SRAM is {} bytes, cartridge has {}",
                self.memory_state.sram.len(),
                bus.cartridge().sram().len()
            )));
        }
        if self.registers.len() != bus.registers().len() {
            return Err(invalid(format!(
                "register table has {} cells, state has {}",
                bus.registers().len(),
                self.registers.len()
            )));
        }
        if self.rom_checksum != bus.cartridge().header().checksum {
            log::warn!(
                "save state was taken with ROM checksum {:04X}, loaded ROM has {:04X}",
                self.rom_checksum,
                bus.cartridge().header().checksum
            );
        }

        let state = &self.cpu_state;
        let regs = cpu.regs_mut();
        regs.set_emulation(state.emulation_mode);
        regs.set_p(state.p);
        regs.set_c(state.c);
        regs.set_x(state.x);
        regs.set_y(state.y);
        regs.set_sp(state.sp);
        regs.d = state.dp;
        regs.dbr = state.db;
        regs.k = state.pb;
        regs.pc = state.pc;
        cpu.set_run_state(state.run);
        cpu.interrupts_mut().clear();
        if let Some(kind) = state.pending_interrupt {
            cpu.interrupts_mut().set(kind);
        }
        cpu.set_counters(state.cycles, state.instructions);

        bus.wram_mut().copy_from_slice(&self.memory_state.wram);
        bus.cartridge_mut()
            .sram_mut()
            .copy_from_slice(&self.memory_state.sram);
        *bus.dma_mut() = self.dma.clone();
        bus.set_mdr(self.mdr);
        bus.set_wram_port(self.wram_port);
        bus.registers_mut().restore_values(&self.registers)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }
}
