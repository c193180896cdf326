//! Memory-mapped register surface: $2100-$21FF (B-bus) and $4000-$43FF (CPU I/O
//! and DMA). Cells live in an arena; a 1280-slot index maps each offset to its
//! cell so dispatch is a single lookup.

use crate::error::{EmuError, Result};

const B_BUS_BASE: u16 = 0x2100;
const IO_BASE: u16 = 0x4000;
const SLOTS: usize = 0x100 + 0x400;

pub const APUIO0: u16 = 0x2140;
pub const WMDATA: u16 = 0x2180;
pub const WRMPYA: u16 = 0x4202;
pub const WRDIVL: u16 = 0x4204;
pub const WRDIVH: u16 = 0x4205;
pub const MDMAEN: u16 = 0x420B;
pub const HDMAEN: u16 = 0x420C;
pub const RDNMI: u16 = 0x4210;
pub const TIMEUP: u16 = 0x4211;
pub const RDDIVL: u16 = 0x4214;
pub const RDDIVH: u16 = 0x4215;
pub const RDMPYL: u16 = 0x4216;
pub const RDMPYH: u16 = 0x4217;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl Access {
    pub fn readable(self) -> bool {
        self != Access::WriteOnly
    }

    pub fn writable(self) -> bool {
        self != Access::ReadOnly
    }
}

/// Side effect the bus runs when a cell is accessed by the CPU or DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Plain,
    /// WMDATA: WRAM byte at the port address, which then increments.
    WramData,
    /// WMADDL/M/H: bits of the 17-bit port address starting at this shift.
    WramAddress(u8),
    Multiply,
    Divide,
    /// RDNMI/TIMEUP: bit 7 clears once read.
    ClearOnRead,
    DmaStart,
    HdmaEnable,
    DmaChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCell {
    pub name: &'static str,
    pub access: Access,
    pub effect: Effect,
    pub value: u8,
}

const PPU_WRITE: &[&str] = &[
    "INIDISP", "OBSEL", "OAMADDL", "OAMADDH", "OAMDATA", "BGMODE", "MOSAIC", "BG1SC", "BG2SC",
    "BG3SC", "BG4SC", "BG12NBA", "BG34NBA", "BG1HOFS", "BG1VOFS", "BG2HOFS", "BG2VOFS",
    "BG3HOFS", "BG3VOFS", "BG4HOFS", "BG4VOFS", "VMAIN", "VMADDL", "VMADDH", "VMDATAL",
    "VMDATAH", "M7SEL", "M7A", "M7B", "M7C", "M7D", "M7X", "M7Y", "CGADD", "CGDATA", "W12SEL",
    "W34SEL", "WOBJSEL", "WH0", "WH1", "WH2", "WH3", "WBGLOG", "WOBJLOG", "TM", "TS", "TMW",
    "TSW", "CGWSEL", "CGADSUB", "COLDATA", "SETINI",
];

const PPU_READ: &[&str] = &[
    "MPYL", "MPYM", "MPYH", "SLHV", "RDOAM", "RDVRAML", "RDVRAMH", "RDCGRAM", "OPHCT", "OPVCT",
    "STAT77", "STAT78",
];

const APU_PORTS: &[&str] = &["APUIO0", "APUIO1", "APUIO2", "APUIO3"];

const DMA_CHANNEL: &[(u8, &str)] = &[
    (0x0, "DMAP"),
    (0x1, "BBAD"),
    (0x2, "A1TL"),
    (0x3, "A1TH"),
    (0x4, "A1B"),
    (0x5, "DASL"),
    (0x6, "DASH"),
    (0x7, "DASB"),
    (0x8, "A2AL"),
    (0x9, "A2AH"),
    (0xA, "NLTR"),
    (0xB, "UNUSED"),
    (0xF, "UNUSED"),
];

use self::Access::{ReadOnly, ReadWrite, WriteOnly};

const CPU_IO: &[(u16, &str, Access, Effect)] = &[
    (0x2180, "WMDATA", ReadWrite, Effect::WramData),
    (0x2181, "WMADDL", WriteOnly, Effect::WramAddress(0)),
    (0x2182, "WMADDM", WriteOnly, Effect::WramAddress(8)),
    (0x2183, "WMADDH", WriteOnly, Effect::WramAddress(16)),
    (0x4016, "JOYSER0", ReadWrite, Effect::Plain),
    (0x4017, "JOYSER1", ReadOnly, Effect::Plain),
    (0x4200, "NMITIMEN", WriteOnly, Effect::Plain),
    (0x4201, "WRIO", WriteOnly, Effect::Plain),
    (0x4202, "WRMPYA", WriteOnly, Effect::Plain),
    (0x4203, "WRMPYB", WriteOnly, Effect::Multiply),
    (0x4204, "WRDIVL", WriteOnly, Effect::Plain),
    (0x4205, "WRDIVH", WriteOnly, Effect::Plain),
    (0x4206, "WRDIVB", WriteOnly, Effect::Divide),
    (0x4207, "HTIMEL", WriteOnly, Effect::Plain),
    (0x4208, "HTIMEH", WriteOnly, Effect::Plain),
    (0x4209, "VTIMEL", WriteOnly, Effect::Plain),
    (0x420A, "VTIMEH", WriteOnly, Effect::Plain),
    (0x420B, "MDMAEN", WriteOnly, Effect::DmaStart),
    (0x420C, "HDMAEN", WriteOnly, Effect::HdmaEnable),
    (0x420D, "MEMSEL", WriteOnly, Effect::Plain),
    (0x4210, "RDNMI", ReadOnly, Effect::ClearOnRead),
    (0x4211, "TIMEUP", ReadOnly, Effect::ClearOnRead),
    (0x4212, "HVBJOY", ReadOnly, Effect::Plain),
    (0x4213, "RDIO", ReadOnly, Effect::Plain),
    (0x4214, "RDDIVL", ReadOnly, Effect::Plain),
    (0x4215, "RDDIVH", ReadOnly, Effect::Plain),
    (0x4216, "RDMPYL", ReadOnly, Effect::Plain),
    (0x4217, "RDMPYH", ReadOnly, Effect::Plain),
    (0x4218, "JOY1L", ReadOnly, Effect::Plain),
    (0x4219, "JOY1H", ReadOnly, Effect::Plain),
    (0x421A, "JOY2L", ReadOnly, Effect::Plain),
    (0x421B, "JOY2H", ReadOnly, Effect::Plain),
    (0x421C, "JOY3L", ReadOnly, Effect::Plain),
    (0x421D, "JOY3H", ReadOnly, Effect::Plain),
    (0x421E, "JOY4L", ReadOnly, Effect::Plain),
    (0x421F, "JOY4H", ReadOnly, Effect::Plain),
];

fn slot(offset: u16) -> Option<usize> {
    match offset {
        0x2100..=0x21FF => Some((offset - B_BUS_BASE) as usize),
        0x4000..=0x43FF => Some(0x100 + (offset - IO_BASE) as usize),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct RegisterTable {
    cells: Vec<RegisterCell>,
    index: Vec<Option<u16>>,
}

impl Default for RegisterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTable {
    pub fn new() -> Self {
        let mut table = RegisterTable {
            cells: Vec::new(),
            index: vec![None; SLOTS],
        };

        for (i, name) in PPU_WRITE.iter().copied().enumerate() {
            table.insert(B_BUS_BASE + i as u16, name, WriteOnly, Effect::Plain);
        }
        for (i, name) in PPU_READ.iter().copied().enumerate() {
            table.insert(0x2134 + i as u16, name, ReadOnly, Effect::Plain);
        }
        // Four APU ports, mirrored every four bytes up to $217F.
        let ports: Vec<u16> = APU_PORTS
            .iter()
            .map(|&name| table.push(name, ReadWrite, Effect::Plain))
            .collect();
        for offset in APUIO0..=0x217F {
            table.bind(offset, ports[(offset & 0x03) as usize]);
        }
        for &(offset, name, access, effect) in CPU_IO {
            table.insert(offset, name, access, effect);
        }
        for channel in 0..8u16 {
            for &(reg, name) in DMA_CHANNEL {
                let offset = 0x4300 | (channel << 4) | reg as u16;
                table.insert(offset, name, ReadWrite, Effect::DmaChannel);
            }
        }
        table
    }

    fn push(&mut self, name: &'static str, access: Access, effect: Effect) -> u16 {
        self.cells.push(RegisterCell {
            name,
            access,
            effect,
            value: 0,
        });
        (self.cells.len() - 1) as u16
    }

    fn bind(&mut self, offset: u16, cell: u16) {
        if let Some(slot) = slot(offset) {
            self.index[slot] = Some(cell);
        }
    }

    fn insert(&mut self, offset: u16, name: &'static str, access: Access, effect: Effect) {
        let cell = self.push(name, access, effect);
        self.bind(offset, cell);
    }

    /// Arena index of the cell decoding `offset`, if any.
    #[inline]
    pub fn lookup(&self, offset: u16) -> Option<usize> {
        slot(offset).and_then(|s| self.index[s]).map(|c| c as usize)
    }

    pub fn cell(&self, index: usize) -> &RegisterCell {
        &self.cells[index]
    }

    pub fn cell_mut(&mut self, index: usize) -> &mut RegisterCell {
        &mut self.cells[index]
    }

    /// Raw stored value, ignoring access mode and effects.
    pub fn get(&self, offset: u16) -> Option<u8> {
        self.lookup(offset).map(|i| self.cells[i].value)
    }

    /// Stores a raw value, ignoring access mode and effects. Returns false for
    /// offsets with no cell.
    pub fn set(&mut self, offset: u16, value: u8) -> bool {
        match self.lookup(offset) {
            Some(i) => {
                self.cells[i].value = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell values in arena order, for save states.
    pub fn values(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.value).collect()
    }

    pub fn restore_values(&mut self, values: &[u8]) -> Result<()> {
        if values.len() != self.cells.len() {
            return Err(EmuError::SaveState(Box::new(bincode::ErrorKind::Custom(format!(
                "register table has {} cells, state has {}",
                self.cells.len(),
                values.len()
            )))));
        }
        for (cell, value) in self.cells.iter_mut().zip(values) {
            cell.value = *value;
        }
        Ok(())
    }
}
