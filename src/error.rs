use crate::address::Address;
use crate::cartridge::MapperType;
use thiserror::Error;

/// Fatal conditions raised by the core. None of these are recoverable inside a
/// step; the driver decides whether to stop or report.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("address 0x{0:08X} is outside the 24-bit address space")]
    AddressOutOfRange(u32),

    #[error("address {0} does not decode to any bus region")]
    UndecodedAddress(Address),

    #[error("unimplemented opcode 0x{opcode:02X} at {pc}")]
    UnimplementedOpcode { opcode: u8, pc: Address },

    #[error("decimal mode arithmetic is not supported ({mnemonic} at {pc})")]
    DecimalMode { mnemonic: &'static str, pc: Address },

    #[error("malformed cartridge map mode byte 0x{0:02X}")]
    InvalidMapMode(u8),

    #[error("unsupported cartridge mapping: {0:?}")]
    UnsupportedMapping(MapperType),

    #[error("invalid ROM image: {0}")]
    InvalidRom(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save state error: {0}")]
    SaveState(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, EmuError>;
