use pretty_assertions::assert_eq;

use crate::hardware::cpu::execute::{InstructionAddress, JumpModifier};
use crate::hardware::cpu::registers::{Reg16::*, Reg8::*};
use crate::hardware::cpu::tests::{initial_cpu, read_short, set_short};
use crate::hardware::mmu::MemoryBus;
use crate::io::interrupts::InterruptFlags;

#[test]
fn load_16bit_moves_registers_and_immediates() {
    let mut cpu = initial_cpu();

    cpu.registers.sp = 0x200;
    cpu.registers.set_hl(0x500);
    cpu.load_sp_hl();
    assert_eq!(cpu.registers.sp, 0x500);

    cpu.registers.pc = 1;
    set_short(&mut cpu, 1, 0x0105);
    cpu.load_16bit(BC, InstructionAddress::DIRECT);
    assert_eq!(cpu.registers.bc(), 0x0105);

    // LD (u16),SP through the dispatcher.
    cpu.registers.pc = 0x10;
    set_short(&mut cpu, 0x10, 0x4000);
    cpu.execute(0x08);
    assert_eq!(read_short(&mut cpu, 0x4000), 0x500);
}

#[test]
fn load_8bit_covers_registers_and_memory() {
    let mut cpu = initial_cpu();

    cpu.registers.c = 40;
    cpu.registers.set_hl(0x4000);
    cpu.mmu.write_byte(0x4000, 30);

    cpu.load_8bit(B, C);
    assert_eq!(cpu.registers.b, 40);

    cpu.load_8bit(D, InstructionAddress::HLI);
    assert_eq!(cpu.registers.d, 30);

    cpu.load_8bit(InstructionAddress::HLI, C);
    assert_eq!(cpu.mmu.read_byte(0x4000), 40);

    cpu.execute(0x7A); // LD A,D
    assert_eq!(cpu.registers.a, 30);
}

#[test]
fn post_increment_and_decrement_loads_move_hl() {
    let mut cpu = initial_cpu();
    cpu.registers.set_hl(0x4000);
    cpu.registers.a = 0x77;

    cpu.execute(0x22); // LD (HL+),A
    assert_eq!(cpu.mmu.read_byte(0x4000), 0x77);
    assert_eq!(cpu.registers.hl(), 0x4001);

    cpu.execute(0x3A); // LD A,(HL-)
    assert_eq!(cpu.registers.hl(), 0x4000);
}

#[test]
fn increment_sets_half_carry_and_zero() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 0x0F;
    cpu.increment(A);
    assert_eq!(cpu.registers.a, 0x10);
    assert!(cpu.registers.hf());
    assert!(!cpu.registers.zf());

    cpu.registers.b = 0xFF;
    cpu.increment(B);
    assert_eq!(cpu.registers.b, 0);
    assert!(cpu.registers.zf());

    // The carry flag is never touched.
    cpu.registers.set_cf(true);
    cpu.increment(C);
    assert!(cpu.registers.cf());
}

#[test]
fn decrement_sets_subtract_flag() {
    let mut cpu = initial_cpu();

    cpu.registers.d = 0x10;
    cpu.decrement(D);
    assert_eq!(cpu.registers.d, 0x0F);
    assert!(cpu.registers.n());
    assert!(cpu.registers.hf());

    cpu.registers.e = 0x01;
    cpu.decrement(E);
    assert!(cpu.registers.zf());
}

#[test]
fn add16_computes_carry_from_bit_15_and_half_from_bit_11() {
    let mut cpu = initial_cpu();

    cpu.registers.set_hl(0x0FFF);
    cpu.registers.set_bc(0x0001);
    cpu.registers.set_zf(true);
    cpu.add16(BC);

    assert_eq!(cpu.registers.hl(), 0x1000);
    assert!(cpu.registers.hf());
    assert!(!cpu.registers.cf());
    // Z must be preserved.
    assert!(cpu.registers.zf());

    cpu.registers.set_hl(0xFFFF);
    cpu.registers.set_de(0x0001);
    cpu.add16(DE);
    assert_eq!(cpu.registers.hl(), 0x0000);
    assert!(cpu.registers.cf());
}

#[test]
fn add_and_adc_chain_carries() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 0xFF;
    cpu.registers.b = 0x01;
    cpu.add(B);
    assert_eq!(cpu.registers.a, 0x00);
    assert!(cpu.registers.zf());
    assert!(cpu.registers.cf());
    assert!(cpu.registers.hf());

    cpu.registers.c = 0x0F;
    cpu.adc(C);
    // 0x00 + 0x0F + carry = 0x10, with a half carry.
    assert_eq!(cpu.registers.a, 0x10);
    assert!(cpu.registers.hf());
    assert!(!cpu.registers.cf());
}

#[test]
fn sub_sbc_and_compare_borrow() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 0x10;
    cpu.registers.b = 0x01;
    cpu.sub(B);
    assert_eq!(cpu.registers.a, 0x0F);
    assert!(cpu.registers.n());
    assert!(cpu.registers.hf());

    cpu.registers.a = 0x00;
    cpu.registers.c = 0x01;
    cpu.sbc(C);
    assert_eq!(cpu.registers.a, 0xFF);
    assert!(cpu.registers.cf());

    cpu.registers.a = 0x42;
    cpu.registers.d = 0x42;
    cpu.compare(D);
    assert!(cpu.registers.zf());
    // A is untouched by CP.
    assert_eq!(cpu.registers.a, 0x42);
}

#[test]
fn bitwise_operations_set_documented_flags() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 0b1100;
    cpu.registers.b = 0b1010;
    cpu.and(B);
    assert_eq!(cpu.registers.a, 0b1000);
    assert!(cpu.registers.hf());

    cpu.xor(A);
    assert_eq!(cpu.registers.a, 0);
    assert!(cpu.registers.zf());
    assert!(!cpu.registers.hf());

    cpu.registers.c = 0x55;
    cpu.or(C);
    assert_eq!(cpu.registers.a, 0x55);
}

#[test]
fn daa_adjusts_bcd_addition_and_subtraction() {
    let mut cpu = initial_cpu();

    // 0x15 + 0x27 = 0x3C, which DAA fixes up to BCD 42.
    cpu.registers.a = 0x15;
    cpu.registers.b = 0x27;
    cpu.add(B);
    cpu.daa();
    assert_eq!(cpu.registers.a, 0x42);
    assert!(!cpu.registers.cf());

    // 0x91 + 0x19 = 0xAA -> BCD 110, carry out.
    cpu.registers.a = 0x91;
    cpu.registers.c = 0x19;
    cpu.add(C);
    cpu.daa();
    assert_eq!(cpu.registers.a, 0x10);
    assert!(cpu.registers.cf());

    // 0x42 - 0x09 = 0x39 -> BCD 33.
    cpu.registers.set_cf(false);
    cpu.registers.a = 0x42;
    cpu.registers.d = 0x09;
    cpu.sub(D);
    cpu.daa();
    assert_eq!(cpu.registers.a, 0x33);
}

#[test]
fn rotate_pairs_invert_each_other() {
    let mut cpu = initial_cpu();

    for value in [0x01u8, 0x80, 0xA5, 0xFF, 0x00] {
        cpu.registers.b = value;
        cpu.rlc(B);
        cpu.rrc(B);
        assert_eq!(cpu.registers.b, value);
    }

    // RL/RR invert as well once the carry is threaded back through.
    cpu.registers.set_cf(false);
    cpu.registers.c = 0xB7;
    cpu.rl(C);
    cpu.rr(C);
    assert_eq!(cpu.registers.c, 0xB7);
}

#[test]
fn swap_twice_restores_the_value() {
    let mut cpu = initial_cpu();

    cpu.registers.e = 0x3C;
    cpu.swap(E);
    assert_eq!(cpu.registers.e, 0xC3);
    cpu.swap(E);
    assert_eq!(cpu.registers.e, 0x3C);
    assert!(!cpu.registers.zf());
}

#[test]
fn shifts_move_into_carry() {
    let mut cpu = initial_cpu();

    cpu.registers.a = 0x81;
    cpu.sla(A);
    assert_eq!(cpu.registers.a, 0x02);
    assert!(cpu.registers.cf());

    cpu.registers.b = 0x81;
    cpu.sra(B);
    assert_eq!(cpu.registers.b, 0xC0);
    assert!(cpu.registers.cf());

    cpu.registers.c = 0x81;
    cpu.srl(C);
    assert_eq!(cpu.registers.c, 0x40);
    assert!(cpu.registers.cf());
}

#[test]
fn bit_set_res_behave_per_bit() {
    let mut cpu = initial_cpu();

    cpu.registers.h = 0x00;
    cpu.set(3, H);
    assert_eq!(cpu.registers.h, 0x08);

    cpu.bit(3, H);
    assert!(!cpu.registers.zf());
    cpu.bit(4, H);
    assert!(cpu.registers.zf());

    cpu.res(3, H);
    assert_eq!(cpu.registers.h, 0x00);
}

#[test]
fn conditional_jumps_follow_flags() {
    let mut cpu = initial_cpu();

    // JP NZ to 0x1234, not taken when Z is set.
    cpu.registers.set_zf(true);
    cpu.registers.pc = 0x10;
    set_short(&mut cpu, 0x10, 0x1234);
    cpu.jump(JumpModifier::NotZero);
    assert_eq!(cpu.registers.pc, 0x12);

    cpu.registers.set_zf(false);
    cpu.registers.pc = 0x10;
    cpu.jump(JumpModifier::NotZero);
    assert_eq!(cpu.registers.pc, 0x1234);

    // JR backwards.
    cpu.registers.pc = 0x20;
    cpu.mmu.write_byte(0x20, 0xFE); // -2
    cpu.relative_jump(JumpModifier::Always);
    assert_eq!(cpu.registers.pc, 0x1F);

    cpu.registers.set_hl(0x8000);
    cpu.jump_hl();
    assert_eq!(cpu.registers.pc, 0x8000);
}

#[test]
fn call_and_ret_roundtrip_through_the_stack() {
    let mut cpu = initial_cpu();

    cpu.registers.sp = 0xFFFE;
    cpu.registers.pc = 0x10;
    set_short(&mut cpu, 0x10, 0x4000);
    cpu.call(JumpModifier::Always);

    assert_eq!(cpu.registers.pc, 0x4000);
    assert_eq!(cpu.registers.sp, 0xFFFC);
    assert_eq!(read_short(&mut cpu, 0xFFFC), 0x12);

    cpu.ret(JumpModifier::Always);
    assert_eq!(cpu.registers.pc, 0x12);
    assert_eq!(cpu.registers.sp, 0xFFFE);
}

#[test]
fn push_pop_preserve_pairs_and_mask_flags() {
    let mut cpu = initial_cpu();

    cpu.registers.sp = 0xD000;
    cpu.registers.set_bc(0xBEEF);
    cpu.push(BC);
    cpu.pop(DE);
    assert_eq!(cpu.registers.de(), 0xBEEF);

    // POP AF can only ever produce a clean flag nibble.
    set_short(&mut cpu, 0xCFFE, 0x12FF);
    cpu.registers.sp = 0xCFFE;
    cpu.pop(AF);
    assert_eq!(cpu.registers.af(), 0x12F0);
}

#[test]
fn add_sp_uses_low_byte_carries() {
    let mut cpu = initial_cpu();

    cpu.registers.sp = 0x00FF;
    cpu.registers.pc = 0x10;
    cpu.mmu.write_byte(0x10, 0x01);
    cpu.add_sp();
    assert_eq!(cpu.registers.sp, 0x0100);
    assert!(cpu.registers.hf());
    assert!(cpu.registers.cf());
    assert!(!cpu.registers.zf());

    // Negative offsets wrap.
    cpu.registers.sp = 0x0000;
    cpu.registers.pc = 0x10;
    cpu.mmu.write_byte(0x10, 0xFF); // -1
    cpu.add_sp();
    assert_eq!(cpu.registers.sp, 0xFFFF);
}

#[test]
fn ld_hl_sp_offset_mirrors_add_sp_flags() {
    let mut cpu = initial_cpu();

    cpu.registers.sp = 0x000F;
    cpu.registers.pc = 0x10;
    cpu.mmu.write_byte(0x10, 0x01);
    cpu.load_sp_i();
    assert_eq!(cpu.registers.hl(), 0x0010);
    assert!(cpu.registers.hf());
    assert!(!cpu.registers.cf());
    assert_eq!(cpu.registers.sp, 0x000F);
}

#[test]
fn ei_enables_after_the_following_instruction() {
    let mut cpu = initial_cpu();
    cpu.mmu.write_byte(0, 0xFB); // EI
    cpu.mmu.write_byte(1, 0x00); // NOP
    cpu.mmu.interrupts_mut().overwrite_enable(0x01);
    cpu.mmu.interrupts_mut().overwrite_flag(0x01);

    cpu.step_cycle(); // EI
    assert!(!cpu.ime);
    cpu.step_cycle(); // NOP; interrupts were still off at its boundary
    assert!(cpu.ime);
    assert_eq!(cpu.registers.pc, 2);

    cpu.step_cycle(); // now the pending interrupt is taken
    assert_eq!(cpu.registers.pc, 0x40);
    assert!(!cpu.ime);
}

#[test]
fn di_cancels_a_pending_ei() {
    let mut cpu = initial_cpu();
    cpu.mmu.write_byte(0, 0xFB); // EI
    cpu.mmu.write_byte(1, 0xF3); // DI

    cpu.step_cycle();
    cpu.step_cycle();
    cpu.step_cycle(); // NOP at 2
    assert!(!cpu.ime);
}

#[test]
fn halt_with_ime_waits_for_an_interrupt() {
    let mut cpu = initial_cpu();
    cpu.ime = true;
    cpu.mmu.write_byte(0, 0x76); // HALT
    cpu.mmu.interrupts_mut().overwrite_enable(0x04);

    cpu.step_cycle();
    assert!(cpu.halted);

    // Nothing pending: the CPU just skips forward.
    cpu.step_cycle();
    assert!(cpu.halted);

    cpu.mmu.interrupts_mut().overwrite_flag(0x04);
    cpu.step_cycle();
    assert!(!cpu.halted);
    assert_eq!(cpu.registers.pc, 0x50);
}

#[test]
fn halt_bug_freezes_pc_for_one_fetch() {
    let mut cpu = initial_cpu();
    cpu.mmu.write_byte(0, 0x76); // HALT with IME off and IF pending
    cpu.mmu.write_byte(1, 0x3C); // INC A
    cpu.mmu.interrupts_mut().overwrite_enable(0x01);
    cpu.mmu.interrupts_mut().overwrite_flag(0x01);

    cpu.step_cycle(); // HALT does not halt
    assert!(!cpu.halted);
    cpu.step_cycle();
    assert_eq!(cpu.registers.a, 1);
    assert_eq!(cpu.registers.pc, 1); // PC did not move
    cpu.step_cycle();
    assert_eq!(cpu.registers.a, 2);
    assert_eq!(cpu.registers.pc, 2);
}

#[test]
fn interrupt_dispatch_clears_flag_and_jumps() {
    let mut cpu = initial_cpu();
    cpu.ime = true;
    cpu.registers.pc = 0x1234;
    cpu.registers.sp = 0xD000;
    cpu.mmu.interrupts_mut().overwrite_enable(0x04);
    cpu.mmu.interrupts_mut().overwrite_flag(0x05); // VBlank not enabled

    assert!(cpu.handle_interrupts());
    assert_eq!(cpu.registers.pc, 0x50);
    assert!(!cpu.ime);
    // Timer acknowledged, VBlank still pending.
    assert_eq!(cpu.mmu.interrupts().read_flag(), 0xE1);
    assert_eq!(read_short(&mut cpu, 0xCFFE), 0x1234);
}

#[test]
fn interrupt_dispatch_latches_ie_between_pushes() {
    let mut cpu = initial_cpu();
    cpu.ime = true;
    cpu.registers.pc = 0x1234;
    // The high push lands on IE itself and wipes the only enable bit.
    cpu.registers.sp = 0x0000;
    cpu.mmu.interrupts_mut().overwrite_enable(0x04);
    cpu.mmu.interrupts_mut().overwrite_flag(0x04);

    assert!(cpu.handle_interrupts());
    // With no enabled source left at the latch point, dispatch falls to 0.
    assert_eq!(cpu.registers.pc, 0x0000);
    assert!(!cpu.ime);
}

#[test]
fn disallowed_opcodes_are_noops_by_default() {
    let mut cpu = initial_cpu();
    cpu.mmu.write_byte(0, 0xD3);
    cpu.mmu.write_byte(1, 0x04); // INC B

    cpu.step_cycle();
    assert!(cpu.fault.is_none());
    cpu.step_cycle();
    assert_eq!(cpu.registers.b, 1);
}

#[test]
fn interrupts_only_fire_between_instructions() {
    let mut cpu = initial_cpu();
    cpu.ime = true;
    cpu.mmu.write_byte(0, 0x04); // INC B
    cpu.mmu.interrupts_mut().overwrite_enable(0x01);

    // Raise the interrupt "mid-instruction" by setting it before the step;
    // the instruction still completes before dispatch.
    cpu.mmu.interrupts_mut().request(InterruptFlags::VBLANK);
    cpu.step_cycle();
    assert_eq!(cpu.registers.b, 0); // dispatch happened instead of INC B
    assert_eq!(cpu.registers.pc, 0x40);
}
