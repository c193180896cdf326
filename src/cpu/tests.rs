use super::interrupt::InterruptKind;
use super::registers::{StatusFlags, BREAK_BIT};
use super::test_bus::TestBus;
use super::*;

fn setup_cpu(program: &[u8]) -> (Cpu, TestBus) {
    let mut bus = TestBus::new();
    bus.poke_u16(0x00FFFC, 0x8000);
    bus.load_program(0x008000, program);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus).unwrap();
    (cpu, bus)
}

/// Native mode with the given P value, bypassing the instruction stream.
fn go_native(cpu: &mut Cpu, p: u8) {
    cpu.regs_mut().set_emulation(false);
    cpu.regs_mut().set_p(p);
}

fn run(cpu: &mut Cpu, bus: &mut TestBus, steps: usize) -> u32 {
    let mut cycles = 0;
    for _ in 0..steps {
        cycles += cpu.step(bus).unwrap() as u32;
    }
    cycles
}

#[test]
fn test_reset_loads_vector_in_emulation_mode() {
    let (cpu, _bus) = setup_cpu(&[]);
    assert_eq!(cpu.regs().pc, 0x8000);
    assert_eq!(cpu.regs().k, 0);
    assert!(cpu.regs().emulation());
    assert_eq!(cpu.regs().sp(), 0x01FF);
}

#[test]
fn test_lda_immediate() {
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x42]);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x42);
    assert_eq!(cpu.regs().pc, 0x8002);
    assert_eq!(cycles, 2);
    assert!(!cpu.regs().flag(StatusFlags::ZERO));
    assert!(!cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_adc_signed_overflow() {
    // LDA #$7F; CLC; ADC #$01
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x7F, 0x18, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);
    let regs = cpu.regs();
    assert_eq!(regs.a(), 0x80);
    assert!(regs.flag(StatusFlags::NEGATIVE));
    assert!(regs.flag(StatusFlags::OVERFLOW));
    assert!(!regs.flag(StatusFlags::ZERO));
    assert!(!regs.flag(StatusFlags::CARRY));
}

#[test]
fn test_adc_carry_out_and_zero() {
    // LDA #$FF; SEC; ADC #$00
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0xFF, 0x38, 0x69, 0x00]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs().a(), 0x00);
    assert!(cpu.regs().flag(StatusFlags::CARRY));
    assert!(cpu.regs().flag(StatusFlags::ZERO));
    assert!(!cpu.regs().flag(StatusFlags::OVERFLOW));
}

#[test]
fn test_adc_16bit_preserves_width() {
    let (mut cpu, mut bus) = setup_cpu(&[0x69, 0x01, 0x00]);
    go_native(&mut cpu, 0x00);
    cpu.regs_mut().set_c(0x7FFF);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x8000);
    assert!(cpu.regs().flag(StatusFlags::OVERFLOW));
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
    assert_eq!(cycles, 3);
}

#[test]
fn test_sbc_borrow() {
    // SEC; LDA #$10; SBC #$20
    let (mut cpu, mut bus) = setup_cpu(&[0x38, 0xA9, 0x10, 0xE9, 0x20]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs().a(), 0xF0);
    assert!(!cpu.regs().flag(StatusFlags::CARRY));
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
    assert!(!cpu.regs().flag(StatusFlags::OVERFLOW));
}

#[test]
fn test_sbc_signed_overflow() {
    // SEC; LDA #$80; SBC #$01 -> 0x7F with V set
    let (mut cpu, mut bus) = setup_cpu(&[0x38, 0xA9, 0x80, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs().a(), 0x7F);
    assert!(cpu.regs().flag(StatusFlags::OVERFLOW));
    assert!(cpu.regs().flag(StatusFlags::CARRY));
}

#[test]
fn test_decimal_mode_is_rejected() {
    // SED; ADC #$01
    let (mut cpu, mut bus) = setup_cpu(&[0xF8, 0x69, 0x01]);
    cpu.step(&mut bus).unwrap();
    let err = cpu.step(&mut bus).unwrap_err();
    match err {
        EmuError::DecimalMode { mnemonic, pc } => {
            assert_eq!(mnemonic, "ADC");
            assert_eq!(pc, Address::new(0x00, 0x8001));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_lda_absolute_16bit_word() {
    // CLC; XCE; REP #$20; LDA $2000
    let (mut cpu, mut bus) = setup_cpu(&[0x18, 0xFB, 0xC2, 0x20, 0xAD, 0x00, 0x20]);
    bus.poke(0x002000, 0x34);
    bus.poke(0x002001, 0x12);
    run(&mut cpu, &mut bus, 3);
    assert!(!cpu.regs().emulation());
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x1234);
    assert!(!cpu.regs().flag(StatusFlags::ZERO));
    assert!(!cpu.regs().flag(StatusFlags::NEGATIVE));
    assert_eq!(cycles, 5);
}

#[test]
fn test_immediate_width_follows_instruction_class() {
    // M=0, X=1: LDX #$12 is two bytes, LDA #$1234 is three
    let (mut cpu, mut bus) = setup_cpu(&[0xA2, 0x12, 0xA9, 0x34, 0x12, 0xEA]);
    go_native(&mut cpu, StatusFlags::INDEX_8BIT.bits());
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().x(), 0x12);
    assert_eq!(cpu.regs().pc, 0x8002);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x1234);
    assert_eq!(cpu.regs().pc, 0x8005);
    assert_eq!(cycles, 3);
}

#[test]
fn test_jsr_rts() {
    // LDA #$00; JSR $9000 (at 0x8002) ... RTS at 0x9000
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x00, 0x20, 0x00, 0x90]);
    bus.poke(0x009000, 0x60);
    cpu.step(&mut bus).unwrap();

    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 6);
    assert_eq!(cpu.regs().pc, 0x9000);
    assert_eq!(cpu.regs().sp(), 0x01FD);
    assert_eq!(bus.peek(0x0001FF), 0x80);
    assert_eq!(bus.peek(0x0001FE), 0x04);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().pc, 0x8005);
    assert_eq!(cpu.regs().sp(), 0x01FF);
}

#[test]
fn test_jsl_rtl_cross_bank() {
    let (mut cpu, mut bus) = setup_cpu(&[0x22, 0x00, 0x90, 0x01]);
    bus.poke(0x019000, 0x6B);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 8);
    assert_eq!(cpu.regs().k, 0x01);
    assert_eq!(cpu.regs().pc, 0x9000);
    assert_eq!(bus.peek(0x0001FF), 0x00);
    assert_eq!(bus.peek(0x0001FE), 0x80);
    assert_eq!(bus.peek(0x0001FD), 0x03);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().k, 0x00);
    assert_eq!(cpu.regs().pc, 0x8004);
}

#[test]
fn test_jmp_keeps_program_bank() {
    let (mut cpu, mut bus) = setup_cpu(&[]);
    cpu.regs_mut().k = 0x02;
    cpu.regs_mut().pc = 0x8000;
    bus.load_program(0x028000, &[0x4C, 0x34, 0x12]);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 3);
    assert_eq!(cpu.regs().k, 0x02);
    assert_eq!(cpu.regs().pc, 0x1234);
}

#[test]
fn test_jml_indirect_long() {
    let (mut cpu, mut bus) = setup_cpu(&[0xDC, 0x00, 0x03]);
    bus.load_program(0x000300, &[0x56, 0x34, 0x12]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().k, 0x12);
    assert_eq!(cpu.regs().pc, 0x3456);
}

#[test]
fn test_pc_wraps_without_touching_program_bank() {
    let (mut cpu, mut bus) = setup_cpu(&[]);
    cpu.regs_mut().k = 0x01;
    cpu.regs_mut().pc = 0xFFFF;
    bus.poke(0x01FFFF, 0xA9);
    bus.poke(0x010000, 0x55);
    bus.poke(0x020000, 0xEE);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x55);
    assert_eq!(cpu.regs().k, 0x01);
    assert_eq!(cpu.regs().pc, 0x0001);
}

#[test]
fn test_branch_taken_and_not_taken() {
    // LDA #$01; BNE +2; BEQ +2
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x01, 0xD0, 0x02, 0x00, 0x00, 0xF0, 0x02]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.step(&mut bus).unwrap(), 3);
    assert_eq!(cpu.regs().pc, 0x8006);
    assert_eq!(cpu.step(&mut bus).unwrap(), 2);
    assert_eq!(cpu.regs().pc, 0x8008);
}

#[test]
fn test_branch_page_cross_penalty_in_emulation() {
    let (mut cpu, mut bus) = setup_cpu(&[]);
    cpu.regs_mut().pc = 0x80FD;
    bus.load_program(0x0080FD, &[0x80, 0x10]);
    assert_eq!(cpu.step(&mut bus).unwrap(), 4);
    assert_eq!(cpu.regs().pc, 0x810F);
}

#[test]
fn test_branch_backward() {
    let (mut cpu, mut bus) = setup_cpu(&[0xEA, 0x80, 0xFD]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().pc, 0x8000);
}

#[test]
fn test_brl_uses_16bit_displacement() {
    let (mut cpu, mut bus) = setup_cpu(&[0x82, 0xFD, 0x0F]);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs().pc, 0x9000);
}

#[test]
fn test_wai_blocks_until_interrupt() {
    let (mut cpu, mut bus) = setup_cpu(&[0xCB, 0xEA]);
    bus.poke_u16(0x00FFFA, 0x9000);
    cpu.step(&mut bus).unwrap();
    assert!(cpu.is_waiting());

    assert_eq!(cpu.step(&mut bus).unwrap(), 1);
    assert_eq!(cpu.regs().pc, 0x8001);

    cpu.request_interrupt(InterruptKind::Nmi);
    assert_eq!(cpu.step(&mut bus).unwrap(), 7);
    assert!(!cpu.is_waiting());
    assert_eq!(cpu.regs().pc, 0x9000);
    // the interrupted PC points past WAI
    assert_eq!(bus.peek(0x0001FE), 0x01);
}

#[test]
fn test_masked_irq_waits_for_cli() {
    // SEI is already in effect after reset; CLI at 0x8001
    let (mut cpu, mut bus) = setup_cpu(&[0xEA, 0x58, 0xEA]);
    bus.poke_u16(0x00FFFE, 0xA000);
    cpu.request_interrupt(InterruptKind::Irq);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().pc, 0x8001);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().pc, 0x8002);
    assert_eq!(cpu.step(&mut bus).unwrap(), 7);
    assert_eq!(cpu.regs().pc, 0xA000);
    assert!(cpu.interrupts().pending().is_none());
}

#[test]
fn test_stp_halts_until_reset() {
    let (mut cpu, mut bus) = setup_cpu(&[0xDB]);
    cpu.step(&mut bus).unwrap();
    assert!(cpu.is_stopped());
    assert_eq!(cpu.step(&mut bus).unwrap(), 1);
    assert_eq!(cpu.regs().pc, 0x8001);
    cpu.reset(&mut bus).unwrap();
    assert!(!cpu.is_stopped());
    assert_eq!(cpu.regs().pc, 0x8000);
}

#[test]
fn test_stp_ignores_nmi_and_irq() {
    let (mut cpu, mut bus) = setup_cpu(&[0x58, 0xDB]);
    bus.poke_u16(0x00FFFA, 0x9000);
    bus.poke_u16(0x00FFFE, 0xA000);
    run(&mut cpu, &mut bus, 2);
    assert!(cpu.is_stopped());
    let sp = cpu.regs().sp();

    for kind in [InterruptKind::Nmi, InterruptKind::Irq, InterruptKind::Nmi] {
        cpu.request_interrupt(kind);
        assert_eq!(cpu.step(&mut bus).unwrap(), 1);
    }
    assert!(cpu.is_stopped());
    assert_eq!(cpu.regs().sp(), sp);
    assert_eq!(cpu.regs().pc, 0x8002);
    assert_eq!(bus.writes, Vec::<u32>::new());

    cpu.request_interrupt(InterruptKind::Reset);
    cpu.step(&mut bus).unwrap();
    assert!(!cpu.is_stopped());
    assert_eq!(cpu.regs().pc, 0x8000);
}

#[test]
fn test_rmw_word_writes_high_byte_first() {
    // INC $1000 with a 16-bit accumulator
    let (mut cpu, mut bus) = setup_cpu(&[0xEE, 0x00, 0x10]);
    go_native(&mut cpu, 0x00);
    bus.poke_u16(0x001000, 0x00FF);
    cpu.step(&mut bus).unwrap();
    assert_eq!(bus.peek_u16(0x001000), 0x0100);
    assert_eq!(bus.writes, vec![0x001001, 0x001000]);
}

#[test]
fn test_brk_in_emulation_sets_break_bit() {
    let (mut cpu, mut bus) = setup_cpu(&[0x00, 0x00]);
    bus.poke_u16(0x00FFFE, 0xA000);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 7);
    assert_eq!(cpu.regs().pc, 0xA000);
    assert_eq!(bus.peek(0x0001FF), 0x80);
    assert_eq!(bus.peek(0x0001FE), 0x02);
    assert_ne!(bus.peek(0x0001FD) & BREAK_BIT, 0);
    assert!(cpu.regs().flag(StatusFlags::IRQ_DISABLE));
}

#[test]
fn test_cop_and_rti_in_native_mode() {
    // CLC; XCE; COP #$00 ... RTI at the native COP vector
    let (mut cpu, mut bus) = setup_cpu(&[0x18, 0xFB, 0x02, 0x00, 0xEA]);
    bus.poke_u16(0x00FFE4, 0x9000);
    bus.poke(0x009000, 0x40);
    run(&mut cpu, &mut bus, 2);
    cpu.regs_mut().set_flag(StatusFlags::IRQ_DISABLE, false);

    assert_eq!(cpu.step(&mut bus).unwrap(), 8);
    assert_eq!(cpu.regs().pc, 0x9000);
    assert!(cpu.regs().flag(StatusFlags::IRQ_DISABLE));

    assert_eq!(cpu.step(&mut bus).unwrap(), 7);
    assert_eq!(cpu.regs().pc, 0x8004);
    assert_eq!(cpu.regs().k, 0x00);
    assert!(!cpu.regs().flag(StatusFlags::IRQ_DISABLE));
    assert!(!cpu.regs().emulation());
}

#[test]
fn test_xce_swaps_carry_and_emulation() {
    // CLC; XCE; REP #$30; LDX #$1234; SEC; XCE
    let (mut cpu, mut bus) =
        setup_cpu(&[0x18, 0xFB, 0xC2, 0x30, 0xA2, 0x34, 0x12, 0x38, 0xFB]);
    run(&mut cpu, &mut bus, 2);
    assert!(!cpu.regs().emulation());
    assert!(cpu.regs().flag(StatusFlags::CARRY));
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().x(), 0x1234);
    run(&mut cpu, &mut bus, 2);
    assert!(cpu.regs().emulation());
    assert!(!cpu.regs().flag(StatusFlags::CARRY));
    assert_eq!(cpu.regs().x(), 0x34);
    assert_eq!(cpu.regs().sp() & 0xFF00, 0x0100);
}

#[test]
fn test_sep_truncates_index_registers() {
    let (mut cpu, mut bus) = setup_cpu(&[0xE2, 0x10]);
    go_native(&mut cpu, 0x00);
    cpu.regs_mut().set_x(0xABCD);
    cpu.regs_mut().set_y(0x1234);
    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 3);
    assert_eq!(cpu.regs().x(), 0xCD);
    assert_eq!(cpu.regs().y(), 0x34);
}

#[test]
fn test_tax_uses_destination_width() {
    let (mut cpu, mut bus) = setup_cpu(&[0xAA, 0x8A]);
    go_native(&mut cpu, StatusFlags::MEMORY_8BIT.bits());
    cpu.regs_mut().set_c(0x1234);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().x(), 0x1234);

    cpu.regs_mut().set_x(0x5680);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().c(), 0x1280);
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_xba_swaps_and_flags_low_byte() {
    let (mut cpu, mut bus) = setup_cpu(&[0xEB]);
    cpu.regs_mut().set_c(0x80FF);
    assert_eq!(cpu.step(&mut bus).unwrap(), 3);
    assert_eq!(cpu.regs().c(), 0xFF80);
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
    assert!(!cpu.regs().flag(StatusFlags::ZERO));
}

#[test]
fn test_tcd_tdc_and_tcs() {
    let (mut cpu, mut bus) = setup_cpu(&[0x5B, 0x1B, 0x7B]);
    go_native(&mut cpu, 0x30);
    cpu.regs_mut().set_c(0x1F00);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().d, 0x1F00);
    assert_eq!(cpu.regs().sp(), 0x1F00);
    cpu.regs_mut().set_c(0);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().c(), 0x1F00);
}

#[test]
fn test_pha_pla_16bit() {
    // PHA; LDA #$0000; PLA
    let (mut cpu, mut bus) = setup_cpu(&[0x48, 0xA9, 0x00, 0x00, 0x68]);
    go_native(&mut cpu, 0x00);
    cpu.regs_mut().set_sp(0x1FFF);
    cpu.regs_mut().set_c(0xBEEF);
    assert_eq!(cpu.step(&mut bus).unwrap(), 4);
    assert_eq!(bus.peek(0x001FFF), 0xBE);
    assert_eq!(bus.peek(0x001FFE), 0xEF);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0);
    assert_eq!(cpu.step(&mut bus).unwrap(), 5);
    assert_eq!(cpu.regs().a(), 0xBEEF);
    assert_eq!(cpu.regs().sp(), 0x1FFF);
}

#[test]
fn test_php_plp_round_trip() {
    // SEC; PHP; CLC; PLP
    let (mut cpu, mut bus) = setup_cpu(&[0x38, 0x08, 0x18, 0x28]);
    run(&mut cpu, &mut bus, 3);
    assert!(!cpu.regs().flag(StatusFlags::CARRY));
    cpu.step(&mut bus).unwrap();
    assert!(cpu.regs().flag(StatusFlags::CARRY));
}

#[test]
fn test_pea_pei_per() {
    // PEA $1234; PEI ($10); PER +$0010
    let (mut cpu, mut bus) = setup_cpu(&[0xF4, 0x34, 0x12, 0xD4, 0x10, 0x62, 0x10, 0x00]);
    bus.poke_u16(0x000010, 0xCAFE);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(bus.peek_u16(0x0001FE), 0x1234);
    assert_eq!(bus.peek_u16(0x0001FC), 0xCAFE);
    assert_eq!(bus.peek_u16(0x0001FA), 0x8018);
    assert_eq!(cpu.regs().sp(), 0x01F9);
}

#[test]
fn test_plb_and_pld_set_flags() {
    let (mut cpu, mut bus) = setup_cpu(&[0xAB, 0x2B]);
    go_native(&mut cpu, 0x30);
    cpu.regs_mut().set_sp(0x1FFC);
    bus.load_program(0x001FFD, &[0x80, 0x00, 0x00]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().dbr, 0x80);
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().d, 0x0000);
    assert!(cpu.regs().flag(StatusFlags::ZERO));
}

#[test]
fn test_shift_and_rotate() {
    // LDA #$81; ASL A; ROL A; LSR A; ROR A
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x81, 0x0A, 0x2A, 0x4A, 0x6A]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().a(), 0x02);
    assert!(cpu.regs().flag(StatusFlags::CARRY));
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x05);
    assert!(!cpu.regs().flag(StatusFlags::CARRY));
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x02);
    assert!(cpu.regs().flag(StatusFlags::CARRY));
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x81);
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_inc_memory_16bit_cycles() {
    let (mut cpu, mut bus) = setup_cpu(&[0xEE, 0x00, 0x20]);
    go_native(&mut cpu, 0x00);
    bus.poke_u16(0x002000, 0x00FF);
    assert_eq!(cpu.step(&mut bus).unwrap(), 8);
    assert_eq!(bus.peek_u16(0x002000), 0x0100);
}

#[test]
fn test_dec_memory_wraps() {
    let (mut cpu, mut bus) = setup_cpu(&[0xC6, 0x10]);
    assert_eq!(cpu.step(&mut bus).unwrap(), 5);
    assert_eq!(bus.peek(0x000010), 0xFF);
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_tsb_trb() {
    // LDA #$0F; TSB $10; TRB $11
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0x0F, 0x04, 0x10, 0x14, 0x11]);
    bus.poke(0x000010, 0xF0);
    bus.poke(0x000011, 0xFF);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(bus.peek(0x000010), 0xFF);
    assert!(cpu.regs().flag(StatusFlags::ZERO));
    cpu.step(&mut bus).unwrap();
    assert_eq!(bus.peek(0x000011), 0xF0);
    assert!(!cpu.regs().flag(StatusFlags::ZERO));
}

#[test]
fn test_bit_immediate_only_sets_zero() {
    // CLV; LDA #$01; BIT #$C0; BIT $10
    let (mut cpu, mut bus) = setup_cpu(&[0xB8, 0xA9, 0x01, 0x89, 0xC0, 0x24, 0x10]);
    bus.poke(0x000010, 0xC1);
    run(&mut cpu, &mut bus, 3);
    assert!(cpu.regs().flag(StatusFlags::ZERO));
    assert!(!cpu.regs().flag(StatusFlags::OVERFLOW));
    cpu.step(&mut bus).unwrap();
    assert!(!cpu.regs().flag(StatusFlags::ZERO));
    assert!(cpu.regs().flag(StatusFlags::OVERFLOW));
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_compare_sets_carry() {
    // LDX #$10; CPX #$10; CPX #$11
    let (mut cpu, mut bus) = setup_cpu(&[0xA2, 0x10, 0xE0, 0x10, 0xE0, 0x11]);
    run(&mut cpu, &mut bus, 2);
    assert!(cpu.regs().flag(StatusFlags::CARRY));
    assert!(cpu.regs().flag(StatusFlags::ZERO));
    cpu.step(&mut bus).unwrap();
    assert!(!cpu.regs().flag(StatusFlags::CARRY));
    assert!(cpu.regs().flag(StatusFlags::NEGATIVE));
}

#[test]
fn test_eor_and_ora() {
    // LDA #$F0; EOR #$FF; ORA #$80
    let (mut cpu, mut bus) = setup_cpu(&[0xA9, 0xF0, 0x49, 0xFF, 0x09, 0x80]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().a(), 0x0F);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().a(), 0x8F);
}

#[test]
fn test_stz_and_store_cycles() {
    // STZ $10; STA $2000,Y
    let (mut cpu, mut bus) = setup_cpu(&[0x64, 0x10, 0x99, 0xFF, 0x20]);
    bus.poke(0x000010, 0x55);
    cpu.regs_mut().set_a(0x77);
    cpu.regs_mut().set_y(0x01);
    assert_eq!(cpu.step(&mut bus).unwrap(), 3);
    assert_eq!(bus.peek(0x000010), 0);
    // store forms pay the indexed cycle regardless of page crossing
    assert_eq!(cpu.step(&mut bus).unwrap(), 5);
    assert_eq!(bus.peek(0x002100), 0x77);
}

#[test]
fn test_lda_absolute_x_page_cross_cycles() {
    let (mut cpu, mut bus) = setup_cpu(&[0xBD, 0xFF, 0x20, 0xBD, 0x00, 0x20]);
    cpu.regs_mut().set_x(0x01);
    bus.poke(0x002100, 0x99);
    assert_eq!(cpu.step(&mut bus).unwrap(), 5);
    assert_eq!(cpu.regs().a(), 0x99);
    assert_eq!(cpu.step(&mut bus).unwrap(), 4);
}

#[test]
fn test_index_increment_wraps_at_width() {
    // LDX #$FF; INX; DEY
    let (mut cpu, mut bus) = setup_cpu(&[0xA2, 0xFF, 0xE8, 0x88]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs().x(), 0x00);
    assert!(cpu.regs().flag(StatusFlags::ZERO));
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().y(), 0xFF);
}

#[test]
fn test_mvn_moves_one_byte_per_step() {
    // native; REP #$30; LDA #$0002; LDX #$1000; LDY #$2000; MVN $02,$01
    let program = [
        0x18, 0xFB, 0xC2, 0x30, 0xA9, 0x02, 0x00, 0xA2, 0x00, 0x10, 0xA0, 0x00, 0x20, 0x54,
        0x02, 0x01,
    ];
    let (mut cpu, mut bus) = setup_cpu(&program);
    bus.load_program(0x011000, &[0x11, 0x22, 0x33]);
    run(&mut cpu, &mut bus, 6);

    assert_eq!(cpu.step(&mut bus).unwrap(), 7);
    assert_eq!(cpu.regs().pc, 0x800D);
    assert_eq!(cpu.regs().dbr, 0x02);
    run(&mut cpu, &mut bus, 2);

    assert_eq!(cpu.regs().pc, 0x8010);
    assert_eq!(cpu.regs().c(), 0xFFFF);
    assert_eq!(cpu.regs().x(), 0x1003);
    assert_eq!(cpu.regs().y(), 0x2003);
    assert_eq!(bus.peek(0x022000), 0x11);
    assert_eq!(bus.peek(0x022001), 0x22);
    assert_eq!(bus.peek(0x022002), 0x33);
}

#[test]
fn test_mvp_moves_downward() {
    let (mut cpu, mut bus) = setup_cpu(&[0x44, 0x02, 0x01]);
    go_native(&mut cpu, 0x00);
    cpu.regs_mut().set_c(0x0001);
    cpu.regs_mut().set_x(0x1001);
    cpu.regs_mut().set_y(0x2001);
    bus.load_program(0x011000, &[0xAA, 0xBB]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(bus.peek(0x022001), 0xBB);
    assert_eq!(bus.peek(0x022000), 0xAA);
    assert_eq!(cpu.regs().x(), 0x0FFF);
    assert_eq!(cpu.regs().pc, 0x8003);
}

#[test]
fn test_wdm_skips_signature_byte() {
    let (mut cpu, mut bus) = setup_cpu(&[0x42, 0xFF, 0xEA]);
    assert_eq!(cpu.step(&mut bus).unwrap(), 2);
    assert_eq!(cpu.regs().pc, 0x8002);
}

#[test]
fn test_cycle_counter_accumulates() {
    let (mut cpu, mut bus) = setup_cpu(&[0xEA, 0xEA]);
    let before = cpu.cycles();
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.cycles() - before, 4);
    assert_eq!(cpu.instructions(), 2);
}
