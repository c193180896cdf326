//! 65816 CPU, system bus and DMA core of a 16-bit console.

pub mod address;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod cpu_bus;
pub mod debug_flags;
pub mod dma;
pub mod error;
pub mod savestate;

pub use address::Address;
pub use bus::Bus;
pub use cartridge::Cartridge;
pub use cpu::Cpu;
pub use cpu_bus::CpuBus;
pub use error::{EmuError, Result};
