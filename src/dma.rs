// SNES DMA and HDMA implementation
use crate::address::Address;
use crate::debug_flags;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Master cycles charged per transferred byte and per channel run.
pub const CYCLES_PER_BYTE: u32 = 8;
pub const CYCLES_PER_CHANNEL: u32 = 8;

/// The two buses a transfer moves bytes between. A-bus is the full CPU address
/// space; B-bus is the 0x2100-0x21FF register page, addressed by its low byte.
pub trait DmaBus {
    fn read_a(&mut self, addr: Address) -> Result<u8>;
    fn write_a(&mut self, addr: Address, value: u8) -> Result<()>;
    fn read_b(&mut self, register: u8) -> Result<u8>;
    fn write_b(&mut self, register: u8, value: u8) -> Result<()>;
}

// B-bus register offsets per transfer pattern, cycled for each unit.
const PATTERN_OFFSETS: [&[u8]; 8] = [
    &[0],          // A
    &[0, 1],       // A, B
    &[0, 0],       // A, A
    &[0, 0, 1, 1], // A, A, B, B
    &[0, 1, 2, 3], // A, B, C, D
    &[0, 1, 0, 1], // mirror of 1
    &[0, 0],       // mirror of 2
    &[0, 0, 1, 1], // mirror of 3
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AToB,
    BToA,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaChannel {
    pub control: u8,       // DMAPn ($43x0)
    pub b_address: u8,     // BBADn ($43x1)
    pub a_address: u16,    // A1TnL/H ($43x2-$43x3)
    pub a_bank: u8,        // A1Bn ($43x4)
    pub size: u16,         // DASnL/H ($43x5-$43x6), indirect HDMA address
    pub indirect_bank: u8, // DASBn ($43x7)
    pub table_address: u16, // A2AnL/H ($43x8-$43x9)
    pub line_counter: u8,  // NLTRn ($43xA)
    pub unused: u8,        // $43xB and $43xF

    pub hdma_do_transfer: bool,
    pub hdma_terminated: bool,
}

impl Default for DmaChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaChannel {
    pub fn new() -> Self {
        // Power-on register contents are all ones.
        Self {
            control: 0xFF,
            b_address: 0xFF,
            a_address: 0xFFFF,
            a_bank: 0xFF,
            size: 0xFFFF,
            indirect_bank: 0xFF,
            table_address: 0xFFFF,
            line_counter: 0xFF,
            unused: 0xFF,
            hdma_do_transfer: false,
            hdma_terminated: true,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.control & 0x80 != 0 {
            Direction::BToA
        } else {
            Direction::AToB
        }
    }

    pub fn is_indirect(&self) -> bool {
        self.control & 0x40 != 0
    }

    /// A-bus step from control bits 4-3: bit 3 fixes the address, otherwise
    /// bit 4 selects decrement.
    pub fn step(&self) -> i16 {
        match (self.control >> 3) & 0x03 {
            0 => 1,
            2 => -1,
            _ => 0,
        }
    }

    pub fn pattern(&self) -> u8 {
        self.control & 0x07
    }

    pub fn unit_len(&self) -> usize {
        PATTERN_OFFSETS[self.pattern() as usize].len()
    }

    /// Byte count of a general-purpose transfer; zero encodes 65536.
    pub fn transfer_len(&self) -> u32 {
        if self.size == 0 {
            0x10000
        } else {
            self.size as u32
        }
    }

    fn b_register(&self, index: usize) -> u8 {
        let offsets = PATTERN_OFFSETS[self.pattern() as usize];
        self.b_address.wrapping_add(offsets[index % offsets.len()])
    }

    fn read_register(&self, reg: u8) -> Option<u8> {
        match reg {
            0x00 => Some(self.control),
            0x01 => Some(self.b_address),
            0x02 => Some(self.a_address as u8),
            0x03 => Some((self.a_address >> 8) as u8),
            0x04 => Some(self.a_bank),
            0x05 => Some(self.size as u8),
            0x06 => Some((self.size >> 8) as u8),
            0x07 => Some(self.indirect_bank),
            0x08 => Some(self.table_address as u8),
            0x09 => Some((self.table_address >> 8) as u8),
            0x0A => Some(self.line_counter),
            0x0B | 0x0F => Some(self.unused),
            _ => None,
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            0x00 => self.control = value,
            0x01 => self.b_address = value,
            0x02 => self.a_address = (self.a_address & 0xFF00) | value as u16,
            0x03 => self.a_address = (self.a_address & 0x00FF) | ((value as u16) << 8),
            0x04 => self.a_bank = value,
            0x05 => self.size = (self.size & 0xFF00) | value as u16,
            0x06 => self.size = (self.size & 0x00FF) | ((value as u16) << 8),
            0x07 => self.indirect_bank = value,
            0x08 => self.table_address = (self.table_address & 0xFF00) | value as u16,
            0x09 => self.table_address = (self.table_address & 0x00FF) | ((value as u16) << 8),
            0x0A => self.line_counter = value,
            0x0B | 0x0F => self.unused = value,
            // $43xC-$43xE are holes.
            _ => {}
        }
    }

    /// Runs a general-purpose transfer to completion and returns its cost in
    /// master cycles. The A-bus bank stays fixed while the offset steps.
    pub fn execute<B: DmaBus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let count = self.transfer_len();
        let step = self.step();
        let direction = self.direction();
        for index in 0..count as usize {
            let a = Address::new(self.a_bank, self.a_address);
            let b = self.b_register(index);
            match direction {
                Direction::AToB => {
                    let value = bus.read_a(a)?;
                    bus.write_b(b, value)?;
                }
                Direction::BToA => {
                    let value = bus.read_b(b)?;
                    bus.write_a(a, value)?;
                }
            }
            self.a_address = self.a_address.wrapping_add_signed(step);
            self.size = self.size.wrapping_sub(1);
        }
        self.size = 0;
        Ok(count * CYCLES_PER_BYTE + CYCLES_PER_CHANNEL)
    }

    /// Frame-start HDMA setup: rewind the table to A1T and load the first entry.
    pub fn hdma_init<B: DmaBus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.table_address = self.a_address;
        self.hdma_terminated = false;
        self.load_hdma_entry(bus)?;
        Ok(CYCLES_PER_CHANNEL)
    }

    /// One H-blank worth of HDMA for this channel.
    pub fn hdma_line<B: DmaBus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        if self.hdma_terminated {
            return Ok(0);
        }
        let mut cycles = CYCLES_PER_CHANNEL;
        if self.hdma_do_transfer {
            for index in 0..self.unit_len() {
                let source = self.next_hdma_source();
                let value = bus.read_a(source)?;
                bus.write_b(self.b_register(index), value)?;
                cycles += CYCLES_PER_BYTE;
            }
        }
        self.line_counter = self.line_counter.wrapping_sub(1);
        self.hdma_do_transfer = self.line_counter & 0x80 != 0;
        if self.line_counter & 0x7F == 0 {
            self.load_hdma_entry(bus)?;
        }
        Ok(cycles)
    }

    fn next_hdma_source(&mut self) -> Address {
        if self.is_indirect() {
            let addr = Address::new(self.indirect_bank, self.size);
            self.size = self.size.wrapping_add(1);
            addr
        } else {
            let addr = Address::new(self.a_bank, self.table_address);
            self.table_address = self.table_address.wrapping_add(1);
            addr
        }
    }

    fn read_table<B: DmaBus + ?Sized>(&mut self, bus: &mut B) -> Result<u8> {
        let value = bus.read_a(Address::new(self.a_bank, self.table_address))?;
        self.table_address = self.table_address.wrapping_add(1);
        Ok(value)
    }

    fn load_hdma_entry<B: DmaBus + ?Sized>(&mut self, bus: &mut B) -> Result<()> {
        let line = self.read_table(bus)?;
        self.line_counter = line;
        if line == 0 {
            // End of table.
            self.hdma_terminated = true;
            self.hdma_do_transfer = false;
            return Ok(());
        }
        if self.is_indirect() {
            let lo = self.read_table(bus)? as u16;
            let hi = self.read_table(bus)? as u16;
            self.size = (hi << 8) | lo;
        }
        self.hdma_do_transfer = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaController {
    pub channels: [DmaChannel; 8],
    pub hdma_enable: u8, // HDMAEN ($420C)
}

impl DmaController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Channel and register index of a `$43xR` offset.
    fn split(offset: u16) -> Option<(usize, u8)> {
        match offset {
            0x4300..=0x437F => Some((((offset >> 4) & 0x07) as usize, (offset & 0x0F) as u8)),
            _ => None,
        }
    }

    pub fn read(&self, offset: u16) -> Option<u8> {
        let (channel, reg) = Self::split(offset)?;
        self.channels[channel].read_register(reg)
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        if let Some((channel, reg)) = Self::split(offset) {
            self.channels[channel].write_register(reg, value);
            if debug_flags::dma() && !debug_flags::quiet() {
                log::debug!("DMA ch{} reg=${:X} <- {:02X}", channel, reg, value);
            }
        }
    }

    /// Channel numbers selected by a MDMAEN/HDMAEN mask, lowest first.
    pub fn enabled(mask: u8) -> impl Iterator<Item = usize> {
        (0..8).filter(move |ch| mask & (1 << ch) != 0)
    }
}
