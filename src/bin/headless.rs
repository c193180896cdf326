// Headless runner: loads a ROM, steps the CPU and optionally dumps WRAM or
// writes a save state.
//
//   cargo run --release --bin headless -- game.sfc --steps 100000 --dump-wram 0x0000 0x200
//
// HEADLESS_STEPS sets the step count when --steps is absent.

use snes_core::debug_flags;
use snes_core::savestate::SaveState;
use snes_core::{Bus, Cartridge, Cpu, Result};
use std::path::PathBuf;
use std::process;

const DEFAULT_STEPS: u64 = 100_000;
// Master cycles per CPU cycle used when folding DMA time into the total.
const MASTER_CYCLES_PER_CPU_CYCLE: u64 = 8;

struct Args {
    rom: PathBuf,
    steps: u64,
    dump: Option<(u32, u32)>,
    save_state: Option<PathBuf>,
}

fn parse_u32_hex_or_dec(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        u32::from_str_radix(stripped, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn usage() -> ! {
    eprintln!("usage: headless <rom> [--steps N] [--dump-wram START LEN] [--save-state PATH]");
    process::exit(2);
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut rom: Option<PathBuf> = None;
    let mut steps: Option<u64> = None;
    let mut dump = None;
    let mut save_state = None;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--steps" => {
                steps = args.next().as_deref().and_then(parse_u32_hex_or_dec).map(u64::from);
            }
            "--dump-wram" => {
                let start = args.next().as_deref().and_then(parse_u32_hex_or_dec);
                let len = args.next().as_deref().and_then(parse_u32_hex_or_dec);
                match (start, len) {
                    (Some(start), Some(len)) => dump = Some((start, len)),
                    _ => usage(),
                }
            }
            "--save-state" => match args.next() {
                Some(path) => save_state = Some(PathBuf::from(path)),
                None => usage(),
            },
            _ if rom.is_none() => rom = Some(PathBuf::from(&a)),
            _ => usage(),
        }
    }

    let Some(rom) = rom else { usage() };
    let steps = steps
        .or_else(|| debug_flags::env_u64("HEADLESS_STEPS"))
        .unwrap_or(DEFAULT_STEPS);
    Args {
        rom,
        steps,
        dump,
        save_state,
    }
}

fn dump_wram(wram: &[u8], start: u32, len: u32) {
    if start as usize >= wram.len() {
        eprintln!(
            "WRAM start 0x{:05X} is outside WRAM size (0x{:05X})",
            start,
            wram.len()
        );
        return;
    }
    let end = (start as usize).saturating_add(len as usize).min(wram.len());
    println!("WRAM dump: start=0x{:05X} len=0x{:04X}", start, end - start as usize);
    for (row, chunk) in wram[start as usize..end].chunks(16).enumerate() {
        print!("{:05X}:", start as usize + row * 16);
        for b in chunk {
            print!(" {:02X}", b);
        }
        println!();
    }
}

fn run(args: &Args) -> Result<()> {
    let cart = Cartridge::load_from_file(&args.rom)?;
    log::info!(
        "loaded \"{}\" ({:?}, {} KiB ROM, {} KiB SRAM)",
        cart.header().title,
        cart.mapper_type(),
        cart.rom().len() / 1024,
        cart.sram().len() / 1024
    );

    let mut bus = Bus::new(cart);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus)?;

    let mut dma_cycles = 0u64;
    for _ in 0..args.steps {
        if cpu.is_stopped() {
            log::info!("CPU stopped at {:02X}:{:04X}", cpu.regs().k, cpu.regs().pc);
            break;
        }
        cpu.step(&mut bus)?;
        dma_cycles += bus.take_dma_cycles();
    }

    let regs = cpu.regs();
    println!(
        "instructions={} cycles={} dma_master_cycles={} total_master_cycles~{}",
        cpu.instructions(),
        cpu.cycles(),
        dma_cycles,
        cpu.cycles() * MASTER_CYCLES_PER_CPU_CYCLE + dma_cycles
    );
    println!(
        "PC={:02X}:{:04X} A={:04X} X={:04X} Y={:04X} S={:04X} D={:04X} DB={:02X} P={:02X} E={}",
        regs.k,
        regs.pc,
        regs.c(),
        regs.x(),
        regs.y(),
        regs.sp(),
        regs.d,
        regs.dbr,
        regs.p(),
        regs.emulation() as u8
    );

    if let Some((start, len)) = args.dump {
        dump_wram(bus.wram(), start, len);
    }
    if let Some(path) = &args.save_state {
        SaveState::capture(&cpu, &bus).save_to_file(path)?;
        log::info!("save state written to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = parse_args();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        process::exit(1);
    }
}
