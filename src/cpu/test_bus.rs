//! Flat 16 MiB bus used by the CPU tests.

use crate::address::Address;
use crate::cpu::interrupt::InterruptVectorTable;
use crate::cpu_bus::CpuBus;
use crate::error::Result;

pub struct TestBus {
    memory: Vec<u8>,
    /// Addresses written through `CpuBus`, in order.
    pub writes: Vec<u32>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x0100_0000],
            writes: Vec::new(),
        }
    }

    pub fn peek(&self, addr: u32) -> u8 {
        self.memory[(addr & 0x00FF_FFFF) as usize]
    }

    pub fn poke(&mut self, addr: u32, value: u8) {
        self.memory[(addr & 0x00FF_FFFF) as usize] = value;
    }

    pub fn peek_u16(&self, addr: u32) -> u16 {
        self.peek(addr) as u16 | ((self.peek(addr + 1) as u16) << 8)
    }

    pub fn poke_u16(&mut self, addr: u32, value: u16) {
        self.poke(addr, (value & 0xFF) as u8);
        self.poke(addr + 1, (value >> 8) as u8);
    }

    pub fn load_program(&mut self, addr: u32, program: &[u8]) {
        for (i, byte) in program.iter().enumerate() {
            self.poke(addr + i as u32, *byte);
        }
    }
}

impl CpuBus for TestBus {
    fn read_u8(&mut self, addr: Address) -> Result<u8> {
        Ok(self.memory[addr.raw() as usize])
    }

    fn write_u8(&mut self, addr: Address, value: u8) -> Result<()> {
        self.memory[addr.raw() as usize] = value;
        self.writes.push(addr.raw());
        Ok(())
    }

    fn vectors(&self) -> InterruptVectorTable {
        InterruptVectorTable::read_with(|offset| self.peek_u16(offset as u32))
    }
}
