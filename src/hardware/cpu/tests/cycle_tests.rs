//! M-cycle accounting. Every observable timing in the machine hangs off
//! these counts, so representative opcodes of each shape are pinned down.

use pretty_assertions::assert_eq;

use crate::hardware::cpu::tests::{initial_cpu, set_short};
use crate::hardware::mmu::MemoryBus;

#[test]
fn basic_alu_and_load_timings() {
    let mut cpu = initial_cpu();

    // ADD A,B [4]
    set_short(&mut cpu, 0x0, 0x0080);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 4);

    // LD (u16),SP [20]
    cpu.mmu.write_byte(0x1, 0x08);
    set_short(&mut cpu, 0x2, 0x5555);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 24);

    // ADD HL,BC [8]
    cpu.mmu.write_byte(0x4, 0x09);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 32);

    // LD B,d8 [8]
    cpu.mmu.write_byte(0x5, 0x06);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 40);

    // LD (HL),d8 [12]
    cpu.registers.set_hl(0xC000);
    cpu.mmu.write_byte(0x7, 0x36);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 52);
}

#[test]
fn branch_timings_differ_when_taken() {
    let mut cpu = initial_cpu();

    // JR NZ taken [12] (Z clear on reset).
    cpu.mmu.write_byte(0x0, 0x20);
    cpu.mmu.write_byte(0x1, 0x10);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 12);
    assert_eq!(cpu.registers.pc, 0x12);

    // JR Z not taken [8].
    cpu.mmu.write_byte(0x12, 0x28);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 20);

    // JP a16 taken [16].
    cpu.mmu.write_byte(0x14, 0xC3);
    set_short(&mut cpu, 0x15, 0x0100);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 36);

    // JP (HL) [4].
    cpu.registers.set_hl(0x0200);
    cpu.mmu.write_byte(0x100, 0xE9);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 40);
    assert_eq!(cpu.registers.pc, 0x0200);
}

#[test]
fn call_and_return_timings() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xD000;

    // CALL a16 [24].
    cpu.mmu.write_byte(0x0, 0xCD);
    set_short(&mut cpu, 0x1, 0x3000);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 24);

    // RET [16].
    cpu.mmu.write_byte(0x3000, 0xC9);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 40);
    assert_eq!(cpu.registers.pc, 0x3);

    // RET NZ taken [20].
    cpu.mmu.write_byte(0x3, 0xC5); // PUSH BC [16] to set up a return target
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 56);
    cpu.mmu.write_byte(0x4, 0xC0);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 76);

    // RET Z not taken [8].
    cpu.registers.pc = 0x10;
    cpu.mmu.write_byte(0x10, 0xC8);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 84);
}

#[test]
fn stack_and_misc_timings() {
    let mut cpu = initial_cpu();
    cpu.registers.sp = 0xD000;

    // PUSH DE [16].
    cpu.mmu.write_byte(0x0, 0xD5);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 16);

    // POP DE [12].
    cpu.mmu.write_byte(0x1, 0xD1);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 28);

    // RST 28h [16].
    cpu.mmu.write_byte(0x2, 0xEF);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 44);
    assert_eq!(cpu.registers.pc, 0x28);

    // ADD SP,r8 [16].
    cpu.mmu.write_byte(0x28, 0xE8);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 60);

    // LD HL,SP+r8 [12].
    cpu.mmu.write_byte(0x2A, 0xF8);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 72);

    // CB-prefixed register op [8].
    cpu.mmu.write_byte(0x2C, 0xCB);
    cpu.mmu.write_byte(0x2D, 0x11); // RL C
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 80);

    // CB-prefixed (HL) op [16].
    cpu.registers.set_hl(0xC000);
    cpu.mmu.write_byte(0x2E, 0xCB);
    cpu.mmu.write_byte(0x2F, 0x16); // RL (HL)
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 96);
}

#[test]
fn interrupt_dispatch_takes_five_m_cycles() {
    let mut cpu = initial_cpu();
    cpu.ime = true;
    cpu.registers.sp = 0xD000;
    cpu.mmu.interrupts_mut().overwrite_enable(0x04);
    cpu.mmu.interrupts_mut().overwrite_flag(0x04);

    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 20);
    assert_eq!(cpu.registers.pc, 0x50);
}

#[test]
fn memory_operand_rows_cost_an_extra_access() {
    let mut cpu = initial_cpu();
    cpu.registers.set_hl(0xC000);

    // ADD A,(HL) [8] vs ADD A,B [4].
    cpu.mmu.write_byte(0x0, 0x86);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 8);

    // INC (HL) [12]: read, modify, write back.
    cpu.mmu.write_byte(0x1, 0x34);
    cpu.step_cycle();
    assert_eq!(cpu.cycles_performed, 20);
    assert_eq!(cpu.mmu.read_byte(0xC000), 1);
}
