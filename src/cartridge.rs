use crate::address::Address;
use crate::cpu::interrupt::InterruptVectorTable;
use crate::error::{EmuError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Offset of the 0x30-byte scoring window (0x10 bytes before the header base).
const LOROM_HEADER: usize = 0x7FB0;
const HIROM_HEADER: usize = 0xFFB0;

#[derive(Debug, Clone, Default)]
pub struct CartridgeHeader {
    pub title: String,
    pub map_mode: u8,
    pub rom_type: u8,
    pub mapper_type: MapperType,
    pub rom_size: usize,
    pub ram_size: usize,
    pub country: u8,
    pub developer: u8,
    pub version: u8,
    pub checksum: u16,
    pub checksum_complement: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapperType {
    #[default]
    LoRom,
    HiRom,
    ExHiRom,
    Sdd1,
    SuperFx,
    Sa1,
}

/// Where a bus address lands inside the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapped {
    Rom(usize),
    Sram(usize),
    /// Not driven by the cartridge; the bus supplies open-bus data.
    Open,
}

pub trait Mapper {
    fn kind(&self) -> MapperType;
    fn map(&self, addr: Address) -> Mapped;
}

/// 32 KiB ROM pages at 0x8000-0xFFFF of every bank; SRAM at 0x70-0x7D/0xF0-0xFF
/// below 0x8000.
#[derive(Debug, Clone)]
pub struct LoRom {
    rom_len: usize,
    sram_len: usize,
}

impl Mapper for LoRom {
    fn kind(&self) -> MapperType {
        MapperType::LoRom
    }

    fn map(&self, addr: Address) -> Mapped {
        let bank = (addr.bank() & 0x7F) as usize;
        let offset = addr.offset() as usize;

        if offset >= 0x8000 {
            return rom_index(bank * 0x8000 + (offset - 0x8000), self.rom_len);
        }
        match bank {
            0x70..=0x7F if self.sram_len > 0 => {
                Mapped::Sram(((bank - 0x70) * 0x8000 + offset) % self.sram_len)
            }
            0x40..=0x6F => rom_index(bank * 0x8000 + offset, self.rom_len),
            _ => Mapped::Open,
        }
    }
}

/// 64 KiB ROM banks at 0x40-0x7D/0xC0-0xFF, upper halves mirrored into the
/// system banks; SRAM at 0x20-0x3F/0xA0-0xBF:6000-7FFF.
#[derive(Debug, Clone)]
pub struct HiRom {
    rom_len: usize,
    sram_len: usize,
}

impl Mapper for HiRom {
    fn kind(&self) -> MapperType {
        MapperType::HiRom
    }

    fn map(&self, addr: Address) -> Mapped {
        let bank = addr.bank();
        let offset = addr.offset() as usize;
        let system_bank = bank & 0x7F < 0x40;

        if !system_bank || offset >= 0x8000 {
            return rom_index(((bank & 0x3F) as usize) * 0x10000 + offset, self.rom_len);
        }
        if (0x6000..0x8000).contains(&offset) && bank & 0x20 != 0 && self.sram_len > 0 {
            let index = ((bank & 0x1F) as usize) * 0x2000 + (offset - 0x6000);
            return Mapped::Sram(index % self.sram_len);
        }
        Mapped::Open
    }
}

fn rom_index(index: usize, rom_len: usize) -> Mapped {
    if rom_len == 0 {
        Mapped::Open
    } else {
        Mapped::Rom(index % rom_len)
    }
}

pub struct Cartridge {
    rom: Vec<u8>,
    sram: Vec<u8>,
    header: CartridgeHeader,
    has_copier_header: bool,
    mapper: Box<dyn Mapper>,
    vectors: InterruptVectorTable,
}

impl Cartridge {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Parses a raw image: strips a 512-byte copier header, locates and validates
    /// the internal header, builds the mapper and reads the vector table.
    pub fn from_bytes(mut data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(EmuError::InvalidRom("ROM image is empty".to_string()));
        }

        let has_copier_header = data.len() % 1024 == 512;
        if has_copier_header {
            data.drain(0..512);
        }

        let header = parse_header(&data)?;
        log::debug!(
            "cartridge \"{}\" {:?} rom={}KiB sram={}KiB",
            header.title,
            header.mapper_type,
            header.rom_size / 1024,
            header.ram_size / 1024
        );

        let mut cart = Self::assemble(data, header)?;
        cart.has_copier_header = has_copier_header;
        Ok(cart)
    }

    /// Builds a cartridge with an explicit mapping, skipping header detection.
    pub fn with_mapper(rom: Vec<u8>, mapper_type: MapperType, sram_size: usize) -> Result<Self> {
        let header = CartridgeHeader {
            mapper_type,
            rom_size: rom.len(),
            ram_size: sram_size,
            ..CartridgeHeader::default()
        };
        Self::assemble(rom, header)
    }

    fn assemble(rom: Vec<u8>, header: CartridgeHeader) -> Result<Self> {
        let rom_len = rom.len();
        let sram_len = header.ram_size;
        let mapper: Box<dyn Mapper> = match header.mapper_type {
            MapperType::LoRom => Box::new(LoRom { rom_len, sram_len }),
            MapperType::HiRom => Box::new(HiRom { rom_len, sram_len }),
            other => return Err(EmuError::UnsupportedMapping(other)),
        };

        let mut cart = Cartridge {
            rom,
            sram: vec![0; sram_len],
            header,
            has_copier_header: false,
            mapper,
            vectors: InterruptVectorTable::default(),
        };
        let vectors = InterruptVectorTable::read_with(|offset| {
            let lo = cart.read(Address::new(0x00, offset)).unwrap_or(0) as u16;
            let hi = cart.read(Address::new(0x00, offset.wrapping_add(1))).unwrap_or(0) as u16;
            (hi << 8) | lo
        });
        cart.vectors = vectors;
        Ok(cart)
    }

    /// `None` when the cartridge leaves the address undriven.
    pub fn read(&self, addr: Address) -> Option<u8> {
        match self.mapper.map(addr) {
            Mapped::Rom(index) => self.rom.get(index).copied(),
            Mapped::Sram(index) => self.sram.get(index).copied(),
            Mapped::Open => None,
        }
    }

    /// Returns false when nothing on the cartridge accepted the write.
    pub fn write(&mut self, addr: Address, value: u8) -> bool {
        match self.mapper.map(addr) {
            Mapped::Sram(index) => match self.sram.get_mut(index) {
                Some(cell) => {
                    *cell = value;
                    true
                }
                None => false,
            },
            Mapped::Rom(_) | Mapped::Open => false,
        }
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn mapper_type(&self) -> MapperType {
        self.mapper.kind()
    }

    pub fn vectors(&self) -> InterruptVectorTable {
        self.vectors
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    pub fn sram_mut(&mut self) -> &mut [u8] {
        &mut self.sram
    }

    pub fn has_copier_header(&self) -> bool {
        self.has_copier_header
    }
}

fn parse_header(rom: &[u8]) -> Result<CartridgeHeader> {
    let header_offset = detect_header_location(rom)?;
    let byte = |index: usize| rom[header_offset + index];

    let title = extract_title(&rom[header_offset + 0x10..header_offset + 0x10 + 21]);
    if !is_valid_title(&title) {
        log::warn!("ROM title contains non-printable characters: {:?}", title);
    }

    let map_mode = byte(0x25);
    let rom_type = byte(0x26);
    let mapper_type = decode_map_mode(map_mode, rom_type)?;

    let located = if header_offset == HIROM_HEADER {
        MapperType::HiRom
    } else {
        MapperType::LoRom
    };
    if mapper_type != located {
        log::warn!(
            "map mode 0x{:02X} says {:?} but the header sits at the {:?} location",
            map_mode,
            mapper_type,
            located
        );
    }

    let rom_size = decode_rom_size(byte(0x27))?;
    if rom.len() + 0x200 < rom_size || rom.len() > rom_size + 0x200 {
        log::warn!(
            "ROM file size ({} bytes) doesn't match header size ({} bytes)",
            rom.len(),
            rom_size
        );
    }

    let ram_size = decode_ram_size(byte(0x28));
    let checksum_complement = ((byte(0x2D) as u16) << 8) | byte(0x2C) as u16;
    let checksum = ((byte(0x2F) as u16) << 8) | byte(0x2E) as u16;
    validate_checksums(checksum, checksum_complement)?;

    let calculated = calculate_rom_checksum(rom);
    if calculated != checksum {
        log::warn!(
            "stored checksum 0x{:04X} doesn't match calculated 0x{:04X}",
            checksum,
            calculated
        );
    }

    Ok(CartridgeHeader {
        title,
        map_mode,
        rom_type,
        mapper_type,
        rom_size,
        ram_size,
        country: byte(0x29),
        developer: byte(0x2A),
        version: byte(0x2B),
        checksum,
        checksum_complement,
    })
}

fn detect_header_location(rom: &[u8]) -> Result<usize> {
    if rom.len() < 0x8000 {
        return Err(EmuError::InvalidRom(format!(
            "image of {} bytes is too small to hold a header",
            rom.len()
        )));
    }

    let lorom_score = score_header(rom, LOROM_HEADER);
    let hirom_score = score_header(rom, HIROM_HEADER);

    if hirom_score > lorom_score && hirom_score > 4 {
        Ok(HIROM_HEADER)
    } else {
        if lorom_score <= 4 {
            log::warn!("low header scores, defaulting to LoROM");
        }
        Ok(LOROM_HEADER)
    }
}

/// Map mode byte: 0b001S_MMMM. The chipset byte overrides the layout for
/// coprocessor boards.
fn decode_map_mode(map_mode: u8, rom_type: u8) -> Result<MapperType> {
    if map_mode & 0xE0 != 0x20 {
        return Err(EmuError::InvalidMapMode(map_mode));
    }
    let layout = match map_mode & 0x0F {
        0x0 => MapperType::LoRom,
        0x1 => MapperType::HiRom,
        0x2 => MapperType::Sdd1,
        0x3 => MapperType::Sa1,
        0x5 | 0xA => MapperType::ExHiRom,
        _ => return Err(EmuError::InvalidMapMode(map_mode)),
    };
    Ok(match rom_type {
        0x13..=0x15 | 0x1A => MapperType::SuperFx,
        0x34 | 0x35 => MapperType::Sa1,
        0x43 | 0x45 => MapperType::Sdd1,
        _ => layout,
    })
}

fn extract_title(title_bytes: &[u8]) -> String {
    let mut title = String::new();
    for &byte in title_bytes {
        if byte == 0x00 {
            break;
        } else if (0x20..=0x7E).contains(&byte) {
            title.push(byte as char);
        } else if byte >= 0x80 {
            title.push('?');
        }
    }
    title.trim().to_string()
}

fn is_valid_title(title: &str) -> bool {
    !title.is_empty() && title.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

fn decode_rom_size(size_code: u8) -> Result<usize> {
    if size_code <= 0x0F {
        Ok(1024 << size_code)
    } else {
        Err(EmuError::InvalidRom(format!(
            "invalid ROM size code 0x{:02X}",
            size_code
        )))
    }
}

/// `1 << N` KiB, with 0 and 0xFF meaning no RAM.
fn decode_ram_size(size_code: u8) -> usize {
    if size_code == 0x00 || size_code == 0xFF || size_code > 0x0F {
        return 0;
    }
    1024usize << size_code
}

fn validate_checksums(checksum: u16, checksum_complement: u16) -> Result<()> {
    if crate::debug_flags::allow_bad_checksum() {
        return Ok(());
    }
    if checksum ^ checksum_complement != 0xFFFF {
        return Err(EmuError::InvalidRom(format!(
            "checksum pair 0x{:04X} ^ 0x{:04X} != 0xFFFF",
            checksum, checksum_complement
        )));
    }
    Ok(())
}

fn calculate_rom_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(byte as u32)) as u16
}

fn score_header(rom: &[u8], offset: usize) -> u32 {
    if offset + 0x2F >= rom.len() {
        return 0;
    }

    let mut score: u32 = 0;

    let checksum = ((rom[offset + 0x2F] as u16) << 8) | (rom[offset + 0x2E] as u16);
    let checksum_complement = ((rom[offset + 0x2D] as u16) << 8) | (rom[offset + 0x2C] as u16);
    if checksum ^ checksum_complement == 0xFFFF {
        score += 8;
    }

    if rom[offset + 0x25] & 0xE0 == 0x20 {
        score += 2;
    }

    if rom[offset + 0x26] <= 0x37 {
        score += 2;
    }

    let rom_size = rom[offset + 0x27];
    if (0x08..=0x0D).contains(&rom_size) {
        score += 2;
        let expected_size = 1024usize << rom_size;
        if rom.len() >= expected_size / 2 && rom.len() <= expected_size * 2 {
            score += 2;
        }
    }

    let ram_size = rom[offset + 0x28];
    if ram_size <= 0x08 || ram_size == 0xFF {
        score += 1;
    }

    let country = rom[offset + 0x29];
    if country <= 0x0D || country == 0xFF {
        score += 1;
    }

    let title_valid = rom[offset + 0x10..offset + 0x10 + 21]
        .iter()
        .all(|&b| (0x20..=0x7E).contains(&b) || b == 0x00);
    if title_valid {
        score += 2;
    }

    if rom[offset + 0x26] == 0xFF || rom[offset + 0x2A] == 0xFF {
        score = score.saturating_sub(3);
    }

    score
}

/// In-memory 64 KiB test image with a valid header, vectors and `program` at the
/// reset address 00:8000.
#[cfg(test)]
pub(crate) fn test_image(map_mode: u8, program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x10000];
    let base = if map_mode & 0x0F == 0x01 { 0xFFC0 } else { 0x7FC0 };
    // 00:8000 is file offset 0 in LoROM and 0x8000 in HiROM
    let code = if map_mode & 0x0F == 0x01 { 0x8000 } else { 0x0000 };

    rom[base..base + 9].copy_from_slice(b"TEST CART");
    for b in &mut rom[base + 9..base + 21] {
        *b = b' ';
    }
    rom[base + 0x15] = map_mode;
    rom[base + 0x16] = 0x02;
    rom[base + 0x17] = 0x06;
    rom[base + 0x18] = 0x03;
    rom[base + 0x19] = 0x01;
    rom[base + 0x1C] = 0xCB;
    rom[base + 0x1D] = 0xED;
    rom[base + 0x1E] = 0x34;
    rom[base + 0x1F] = 0x12;

    let vector = |rom: &mut Vec<u8>, at: usize, target: u16| {
        rom[base + at] = target as u8;
        rom[base + at + 1] = (target >> 8) as u8;
    };
    vector(&mut rom, 0x24, 0x8100); // native COP
    vector(&mut rom, 0x2A, 0x8200); // native NMI
    vector(&mut rom, 0x2E, 0x8300); // native IRQ
    vector(&mut rom, 0x3A, 0x8400); // emulation NMI
    vector(&mut rom, 0x3C, 0x8000); // reset
    vector(&mut rom, 0x3E, 0x8500); // emulation IRQ/BRK

    rom[code..code + program.len()].copy_from_slice(program);
    rom
}
