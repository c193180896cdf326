//! System bus: decodes 24-bit CPU addresses to WRAM, the register surfaces and
//! the cartridge, and keeps the open-bus latch (MDR).

pub mod registers;

use crate::address::Address;
use crate::cartridge::Cartridge;
use crate::cpu::interrupt::InterruptVectorTable;
use crate::cpu_bus::CpuBus;
use crate::debug_flags;
use crate::dma::{DmaBus, DmaChannel, DmaController};
use crate::error::{EmuError, Result};
use registers::{Effect, RegisterTable};

pub const WRAM_SIZE: usize = 0x20000;
const WRAM_PORT_MASK: u32 = 0x1FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Wram(usize),
    Register(u16),
    Cartridge,
    Open,
}

fn decode(addr: Address) -> Region {
    let (bank, offset) = (addr.bank(), addr.offset());
    match bank {
        0x00..=0x3F | 0x80..=0xBF => match offset {
            0x0000..=0x1FFF => Region::Wram(offset as usize),
            0x2100..=0x21FF | 0x4000..=0x43FF => Region::Register(offset),
            // $6000-$7FFF is cartridge SRAM on some mappings; the mapper
            // reports it undriven otherwise.
            0x6000..=0xFFFF => Region::Cartridge,
            _ => Region::Open,
        },
        0x7E | 0x7F => Region::Wram((((bank - 0x7E) as usize) << 16) | offset as usize),
        0x40..=0x7D | 0xC0..=0xFF => Region::Cartridge,
    }
}

fn is_register_surface(addr: Address) -> bool {
    matches!(decode(addr), Region::Register(_))
}

pub struct Bus {
    wram: Vec<u8>,
    cartridge: Cartridge,
    registers: RegisterTable,
    dma: DmaController,
    mdr: u8,
    wram_port: u32,
    dma_cycles: u64,
}

impl Bus {
    pub fn new(cartridge: Cartridge) -> Self {
        Bus {
            wram: vec![0; WRAM_SIZE],
            cartridge,
            registers: RegisterTable::new(),
            dma: DmaController::new(),
            mdr: 0,
            wram_port: 0,
            dma_cycles: 0,
        }
    }

    /// Returns register and DMA state to power-on values. WRAM and SRAM keep
    /// their contents.
    pub fn reset(&mut self) {
        self.registers = RegisterTable::new();
        self.dma.reset();
        self.mdr = 0;
        self.wram_port = 0;
        self.dma_cycles = 0;
    }

    pub fn read_byte(&mut self, addr: Address) -> Result<u8> {
        let value = match decode(addr) {
            Region::Wram(index) => Some(self.wram[index]),
            Region::Register(offset) => self.read_register(offset),
            Region::Cartridge => self.cartridge.read(addr),
            Region::Open => None,
        };
        if let Some(value) = value {
            self.mdr = value;
        }
        Ok(self.mdr)
    }

    pub fn write_byte(&mut self, addr: Address, value: u8) -> Result<()> {
        self.mdr = value;
        match decode(addr) {
            Region::Wram(index) => self.wram[index] = value,
            Region::Register(offset) => self.write_register(offset, value)?,
            Region::Cartridge => {
                self.cartridge.write(addr, value);
            }
            Region::Open => {}
        }
        Ok(())
    }

    fn read_register(&mut self, offset: u16) -> Option<u8> {
        let index = self.registers.lookup(offset)?;
        let cell = *self.registers.cell(index);
        if !cell.access.readable() {
            return None;
        }
        match cell.effect {
            Effect::WramData => {
                let value = self.wram[self.wram_port as usize];
                self.advance_wram_port();
                Some(value)
            }
            Effect::ClearOnRead => {
                self.registers.cell_mut(index).value = cell.value & 0x7F;
                Some(cell.value)
            }
            Effect::DmaChannel => self.dma.read(offset),
            _ => Some(cell.value),
        }
    }

    fn write_register(&mut self, offset: u16, value: u8) -> Result<()> {
        let Some(index) = self.registers.lookup(offset) else {
            if !debug_flags::quiet() {
                log::warn!("write to unmapped register ${:04X} <- {:02X}", offset, value);
            }
            return Ok(());
        };
        let cell = *self.registers.cell(index);
        if !cell.access.writable() {
            return Ok(());
        }
        self.registers.cell_mut(index).value = value;

        match cell.effect {
            Effect::Plain | Effect::ClearOnRead => {}
            Effect::WramData => {
                self.wram[self.wram_port as usize] = value;
                self.advance_wram_port();
            }
            Effect::WramAddress(shift) => {
                let mask = 0xFFu32 << shift;
                self.wram_port =
                    ((self.wram_port & !mask) | ((value as u32) << shift)) & WRAM_PORT_MASK;
            }
            Effect::Multiply => {
                let a = self.registers.get(registers::WRMPYA).unwrap_or(0xFF) as u16;
                self.store_word(registers::RDMPYL, a * value as u16);
            }
            Effect::Divide => {
                let dividend = u16::from_le_bytes([
                    self.registers.get(registers::WRDIVL).unwrap_or(0xFF),
                    self.registers.get(registers::WRDIVH).unwrap_or(0xFF),
                ]);
                let (quotient, remainder) = match value {
                    0 => (0xFFFF, dividend),
                    divisor => (dividend / divisor as u16, dividend % divisor as u16),
                };
                self.store_word(registers::RDDIVL, quotient);
                self.store_word(registers::RDMPYL, remainder);
            }
            Effect::DmaStart => self.run_dma(value)?,
            Effect::HdmaEnable => self.dma.hdma_enable = value,
            Effect::DmaChannel => self.dma.write(offset, value),
        }
        Ok(())
    }

    fn store_word(&mut self, low: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.registers.set(low, lo);
        self.registers.set(low + 1, hi);
    }

    fn advance_wram_port(&mut self) {
        self.wram_port = (self.wram_port + 1) & WRAM_PORT_MASK;
    }

    /// Takes a channel out of the controller while it drives the bus.
    fn with_channel<T>(
        &mut self,
        channel: usize,
        f: impl FnOnce(&mut DmaChannel, &mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut state = std::mem::take(&mut self.dma.channels[channel]);
        let result = f(&mut state, self);
        self.dma.channels[channel] = state;
        result
    }

    fn run_dma(&mut self, mask: u8) -> Result<()> {
        for channel in DmaController::enabled(mask) {
            if debug_flags::dma() && !debug_flags::quiet() {
                let ch = &self.dma.channels[channel];
                log::debug!(
                    "DMA ch{} ctrl={:02X} A={} B=$21{:02X} size={}",
                    channel,
                    ch.control,
                    Address::new(ch.a_bank, ch.a_address),
                    ch.b_address,
                    ch.transfer_len()
                );
            }
            let cycles = self.with_channel(channel, |ch, bus| ch.execute(bus))?;
            self.dma_cycles += cycles as u64;
        }
        Ok(())
    }

    /// Frame start: reload the table of every channel enabled in HDMAEN.
    pub fn hdma_init(&mut self) -> Result<()> {
        for channel in DmaController::enabled(self.dma.hdma_enable) {
            let cycles = self.with_channel(channel, |ch, bus| ch.hdma_init(bus))?;
            self.dma_cycles += cycles as u64;
        }
        Ok(())
    }

    /// One H-blank of HDMA for every enabled channel.
    pub fn hdma_scanline(&mut self) -> Result<()> {
        for channel in DmaController::enabled(self.dma.hdma_enable) {
            let cycles = self.with_channel(channel, |ch, bus| ch.hdma_line(bus))?;
            self.dma_cycles += cycles as u64;
        }
        Ok(())
    }

    /// Master cycles spent in DMA/HDMA since the last call.
    pub fn take_dma_cycles(&mut self) -> u64 {
        std::mem::take(&mut self.dma_cycles)
    }

    /// Register value as stored, without read effects or an MDR update.
    pub fn peek_register(&self, offset: u16) -> Result<u8> {
        let index = self
            .registers
            .lookup(offset)
            .ok_or(EmuError::UndecodedAddress(Address::new(0x00, offset)))?;
        let cell = self.registers.cell(index);
        match cell.effect {
            Effect::DmaChannel => self
                .dma
                .read(offset)
                .ok_or(EmuError::UndecodedAddress(Address::new(0x00, offset))),
            _ => Ok(cell.value),
        }
    }

    /// Stores a register value for the CPU to read, without write effects.
    /// Used by collaborators that own read-only status registers.
    pub fn poke_register(&mut self, offset: u16, value: u8) -> Result<()> {
        let index = self
            .registers
            .lookup(offset)
            .ok_or(EmuError::UndecodedAddress(Address::new(0x00, offset)))?;
        match self.registers.cell(index).effect {
            Effect::DmaChannel => self.dma.write(offset, value),
            _ => self.registers.cell_mut(index).value = value,
        }
        Ok(())
    }

    pub fn mdr(&self) -> u8 {
        self.mdr
    }

    pub fn set_mdr(&mut self, value: u8) {
        self.mdr = value;
    }

    pub fn wram(&self) -> &[u8] {
        &self.wram
    }

    pub fn wram_mut(&mut self) -> &mut [u8] {
        &mut self.wram
    }

    pub fn wram_port(&self) -> u32 {
        self.wram_port
    }

    pub fn set_wram_port(&mut self, port: u32) {
        self.wram_port = port & WRAM_PORT_MASK;
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }

    pub fn registers(&self) -> &RegisterTable {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterTable {
        &mut self.registers
    }

    pub fn dma(&self) -> &DmaController {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut DmaController {
        &mut self.dma
    }
}

impl CpuBus for Bus {
    fn read_u8(&mut self, addr: Address) -> Result<u8> {
        self.read_byte(addr)
    }

    fn write_u8(&mut self, addr: Address, value: u8) -> Result<()> {
        self.write_byte(addr, value)
    }

    fn vectors(&self) -> InterruptVectorTable {
        self.cartridge.vectors()
    }
}

// A-bus accesses that land on the register surfaces see open bus.
impl DmaBus for Bus {
    fn read_a(&mut self, addr: Address) -> Result<u8> {
        if is_register_surface(addr) {
            return Ok(self.mdr);
        }
        self.read_byte(addr)
    }

    fn write_a(&mut self, addr: Address, value: u8) -> Result<()> {
        if is_register_surface(addr) {
            self.mdr = value;
            return Ok(());
        }
        self.write_byte(addr, value)
    }

    fn read_b(&mut self, register: u8) -> Result<u8> {
        self.read_byte(Address::new(0x00, 0x2100 | register as u16))
    }

    fn write_b(&mut self, register: u8, value: u8) -> Result<()> {
        self.write_byte(Address::new(0x00, 0x2100 | register as u16), value)
    }
}
