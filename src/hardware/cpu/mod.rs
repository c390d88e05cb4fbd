//! The Sharp SM83 interpreter. Decode lives in `execute`, operand resolution
//! in `traits`, clocked bus access and interrupt dispatch in `fetch`; this
//! file holds the instruction semantics themselves.

use crate::emulator::GameBoyModel;
use crate::error::EmulatorError;
use crate::hardware::cpu::execute::JumpModifier;
use crate::hardware::cpu::registers::Reg8::A;
use crate::hardware::cpu::registers::{Reg16, Registers};
use crate::hardware::cpu::traits::{SetU16, SetU8, ToU16, ToU8};
use crate::hardware::mmu::MemoryBus;
use crate::hardware::ppu::OamCorruptionKind;
use crate::state::{StateReader, StateWriter};

#[cfg(test)]
mod tests;

mod alu;
mod execute;
mod fetch;
pub mod registers;
mod traits;

/// Raised instead of executing when the ROM runs into one of the eleven
/// hardware-undefined opcodes and the host opted into faulting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CpuFault {
    pub opcode: u8,
    /// Address the opcode was fetched from.
    pub pc: u16,
}

#[derive(Debug)]
pub struct CPU<M: MemoryBus> {
    pub mmu: M,
    pub registers: Registers,
    pub cycles_performed: u64,
    pub ime: bool,
    pub halted: bool,
    opcode: u8,
    delayed_ime: bool,
    halt_bug: bool,
    /// Set by `LD B,B` when the breakpoint option is on; consumed by the
    /// frame loop.
    pub breakpoint_hit: bool,
    breakpoint_enabled: bool,
    fault_on_disallowed: bool,
    pub fault: Option<CpuFault>,
}

impl<M: MemoryBus> CPU<M> {
    pub fn new(mmu: M, breakpoint_enabled: bool, fault_on_disallowed: bool) -> Self {
        let boot_rom_finished = mmu.boot_rom_finished();
        let model = mmu.model();

        let mut result = CPU {
            mmu,
            registers: Registers::new(),
            cycles_performed: 0,
            ime: false,
            halted: false,
            opcode: 0,
            delayed_ime: false,
            halt_bug: false,
            breakpoint_hit: false,
            breakpoint_enabled,
            fault_on_disallowed,
            fault: None,
        };

        if boot_rom_finished {
            // The register state the boot ROM would have left behind.
            result.registers.pc = 0x100;
            result.registers.sp = 0xFFFE;
            match model {
                GameBoyModel::Dmg => {
                    result.registers.set_af(0x01B0);
                    result.registers.set_bc(0x0013);
                    result.registers.set_de(0x00D8);
                    result.registers.set_hl(0x014D);
                }
                GameBoyModel::Cgb => {
                    result.registers.set_af(0x1180);
                    result.registers.set_bc(0x0000);
                    result.registers.set_de(0xFF56);
                    result.registers.set_hl(0x000D);
                }
            }
        }

        result
    }

    /// Run one instruction (or one HALT catch-up jump, or one interrupt
    /// dispatch). This is the only entry point; `Emulator::run_frame` calls
    /// it until the PPU reports a finished frame.
    pub fn step_cycle(&mut self) {
        if self.fault.is_some() {
            // A parked CPU stays parked, but time keeps passing so the host
            // can still drain frames/audio.
            self.add_cycles();
            return;
        }

        if self.halted {
            if self.mmu.interrupts().pending().is_empty() {
                self.cycles_performed += self.mmu.skip_to_next_event();
                return;
            }
            self.halted = false;
        }

        if self.handle_interrupts() {
            return;
        }

        // EI takes effect after the instruction that follows it.
        if self.delayed_ime {
            self.ime = true;
            self.delayed_ime = false;
        }

        self.opcode = self.get_instr_u8();

        if self.halt_bug {
            // The fetch after a buggy HALT happens without the PC advancing,
            // so the same opcode will be seen again.
            self.registers.pc = self.registers.pc.wrapping_sub(1);
            self.halt_bug = false;
        }

        #[cfg(feature = "cpu-logging")]
        log::trace!("Executing opcode: {:02X} - registers: {}", self.opcode, self.registers);

        self.execute(self.opcode);
    }

    /// Pass 4 ticks
    fn nop(&mut self) {}

    /// `ld   rr,nn` OR `ld   (nn),SP` OR `ld   SP,HL`
    fn load_16bit<T: Copy, U: Copy>(&mut self, destination: T, source: U)
    where
        Self: SetU16<T>,
        Self: ToU16<U>,
    {
        let source_value = self.read_u16_value(source);

        self.set_u16_value(destination, source_value);
    }

    /// `ld` never sets any flags.
    fn load_8bit<T: Copy, U: Copy>(&mut self, destination: T, source: U)
    where
        Self: SetU8<T>,
        Self: ToU8<U>,
    {
        let source_value = self.read_u8_value(source);

        self.set_u8_value(destination, source_value);
    }

    /// `LD B,B`, which doubles as the well-known debugger breakpoint.
    fn ld_b_b(&mut self) {
        if self.breakpoint_enabled {
            self.breakpoint_hit = true;
        }
    }

    /// `r=r+1` OR `(HL)=(HL)+1`
    ///
    /// Flags: `z0h-`
    fn increment<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let old_value = self.read_u8_value(target);
        let new_value = old_value.wrapping_add(1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h((old_value & 0xF) + 0x1 > 0xF);

        self.set_u8_value(target, new_value);
    }

    /// `rr = rr+1      ;rr may be BC,DE,HL,SP`
    ///
    /// Flags: `----`
    fn increment16(&mut self, target: Reg16) {
        let old_value = self.read_u16_value(target);
        self.mmu.oam_pointer_op(old_value, OamCorruptionKind::Write);
        self.set_u16_value(target, old_value.wrapping_add(1));
        // The 16-bit ALU costs a cycle without touching memory.
        self.add_cycles();
    }

    /// `rr = rr-1      ;rr may be BC,DE,HL,SP`
    ///
    /// Flags: `----`
    fn decrement16(&mut self, target: Reg16) {
        let old_value = self.read_u16_value(target);
        self.mmu.oam_pointer_op(old_value, OamCorruptionKind::Write);
        self.set_u16_value(target, old_value.wrapping_sub(1));
        self.add_cycles();
    }

    /// `HL = HL+rr     ;rr may be BC,DE,HL,SP`
    ///
    /// Flags: `-0hc` (half carry from bit 11, carry from bit 15)
    fn add16(&mut self, target: Reg16) {
        let value = self.read_u16_value(target);
        let hl = self.registers.hl();
        let (result, overflowed) = hl.overflowing_add(value);

        self.registers.set_n(false);
        self.registers.set_h((hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
        self.registers.set_cf(overflowed);

        self.registers.set_hl(result);
        self.add_cycles();
    }

    /// `rotate A left; 7th bit to Carry flag`
    ///
    /// Flags: `000C`
    fn rlca(&mut self) {
        self.rotate_left(A);
        self.registers.set_zf(false);
    }

    /// `Rotate A right. Old bit 0 to Carry flag.`
    ///
    /// Flags: `000C`
    fn rrca(&mut self) {
        self.rotate_right(A);
        self.registers.set_zf(false);
    }

    /// Rotate A left through Carry flag.
    ///
    /// Flags: `000C`
    fn rla(&mut self) {
        self.rotate_left_carry(A);
        self.registers.set_zf(false);
    }

    /// Rotate A right through Carry flag.
    ///
    /// Flags: `000C`
    fn rra(&mut self) {
        self.rotate_right_carry(A);
        self.registers.set_zf(false);
    }

    /// `r=r-1` OR `(HL)=(HL)-1`
    ///
    /// Flags: `z1h-`
    fn decrement<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let old_value = self.read_u8_value(target);
        let new_value = old_value.wrapping_sub(1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers.set_h(old_value & 0xF == 0);

        self.set_u8_value(target, new_value);
    }

    /// STOP resets DIV. On CGB with a speed switch armed through KEY1 it
    /// instead toggles the speed. The opcode swallows its second byte as
    /// long as no interrupt is pending.
    fn stop(&mut self) {
        if self.mmu.model().is_cgb() {
            self.mmu.try_speed_switch();
        }
        self.mmu.reset_divider();

        if self.mmu.interrupts().pending().is_empty() {
            let _ = self.get_instr_u8();
        }
    }

    /// `jr   PC+dd` OR `jr   f,PC+dd`
    ///
    /// Flags: `----`
    fn relative_jump(&mut self, condition: JumpModifier) {
        let offset = self.get_instr_u8() as i8;
        if self.matches_jmp_condition(condition) {
            self.registers.pc = self.registers.pc.wrapping_add(offset as u16);
            self.add_cycles();
        }
    }

    /// Decimal adjust register A, so that after a BCD addition or
    /// subtraction the correct BCD representation is restored.
    ///
    /// Flags: `Z-0C`
    fn daa(&mut self) {
        if !self.registers.n() {
            // After an addition, adjust if (half-)carry occurred or if the
            // result is out of bounds.
            if self.registers.cf() || self.registers.a > 0x99 {
                self.registers.a = self.registers.a.wrapping_add(0x60);
                self.registers.set_cf(true);
            }
            if self.registers.hf() || (self.registers.a & 0x0F) > 0x09 {
                self.registers.a = self.registers.a.wrapping_add(0x06);
            }
        } else {
            // After a subtraction, only adjust if (half-)carry occurred.
            if self.registers.cf() {
                self.registers.a = self.registers.a.wrapping_sub(0x60);
            }
            if self.registers.hf() {
                self.registers.a = self.registers.a.wrapping_sub(0x06);
            }
        }

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_h(false);
    }

    /// ComPLement accumulator (A = ~A).
    ///
    /// Flags: `-11-`
    fn cpl(&mut self) {
        self.registers.a = !self.registers.a;

        self.registers.set_n(true);
        self.registers.set_h(true);
    }

    /// Set Carry Flag.
    ///
    /// Flags: `-001`
    fn scf(&mut self) {
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(true);
    }

    /// Complement Carry Flag.
    ///
    /// Flags: `-00i` where `i = inverted`
    fn ccf(&mut self) {
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.toggle_cf();
    }

    /// `halt until interrupt occurs (low power)`
    ///
    /// With IME off and an interrupt already pending the halt falls through
    /// instead, and the PC fails to advance for the following fetch.
    fn halt(&mut self) {
        if !self.ime && !self.mmu.interrupts().pending().is_empty() {
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    /// `A=A+r` OR `A=A+n` OR `A=A+(HL)`
    ///
    /// Flags: `Z0HC`
    fn add<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let (new_value, overflowed) = self.registers.a.overflowing_add(value);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.a & 0xF) + (value & 0xF) > 0xF);
        self.registers.set_cf(overflowed);

        self.registers.a = new_value;
    }

    /// Add the value in `target` plus the carry flag to A.
    ///
    /// Flags: `Z0HC`
    fn adc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let carry = self.registers.cf() as u8;
        let new_value = self.registers.a.wrapping_add(value).wrapping_add(carry);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.a & 0xF) + (value & 0xF) + carry > 0xF);
        self.registers
            .set_cf(self.registers.a as u16 + value as u16 + carry as u16 > 0xFF);

        self.registers.a = new_value;
    }

    /// Subtract the value in `target` from A.
    ///
    /// Flags: `Z1HC`
    fn sub<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = self.registers.a.wrapping_sub(value);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers
            .set_h((self.registers.a & 0xF).wrapping_sub(value & 0xF) & 0x10 != 0);
        self.registers.set_cf(value > self.registers.a);

        self.registers.a = new_value;
    }

    /// Subtract the value in `target` and the carry flag from A.
    ///
    /// Flags: `Z1HC`
    fn sbc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let carry = self.registers.cf() as u8;
        let new_value = self.registers.a.wrapping_sub(value).wrapping_sub(carry);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers.set_h(
            (self.registers.a & 0xF).wrapping_sub(value & 0xF).wrapping_sub(carry) & 0x10 != 0,
        );
        self.registers
            .set_cf(value as u16 + carry as u16 > self.registers.a as u16);

        self.registers.a = new_value;
    }

    /// Bitwise AND between the value in `target` and A.
    ///
    /// Flags: `Z010`
    fn and<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a &= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(true);
        self.registers.set_cf(false);
    }

    /// Bitwise XOR between the value in `target` and A.
    ///
    /// Flags: `Z000`
    fn xor<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a ^= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);
    }

    /// Store into A the bitwise OR of the value in `target` and A.
    ///
    /// Flags: `Z000`
    fn or<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        self.registers.a |= self.read_u8_value(target);

        self.registers.set_zf(self.registers.a == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);
    }

    /// Subtract the value in `target` from A without storing the result.
    ///
    /// Flags: `Z1HC`
    fn compare<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = self.registers.a.wrapping_sub(value);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(true);
        self.registers
            .set_h((self.registers.a & 0xF).wrapping_sub(value & 0xF) & 0x10 != 0);
        self.registers.set_cf(value > self.registers.a);
    }

    /// Return from subroutine; a conditional return spends an extra cycle on
    /// the condition check.
    ///
    /// Flags: `----`
    fn ret(&mut self, condition: JumpModifier) {
        if !matches!(condition, JumpModifier::Always) {
            self.add_cycles();
        }
        if self.matches_jmp_condition(condition) {
            self.registers.pc = self.read_short_cycle(self.registers.sp);
            self.registers.sp = self.registers.sp.wrapping_add(2);
            self.add_cycles();
        }
    }

    /// Pop register `target` from the stack.
    ///
    /// Flags: `----` (unless `target` is AF)
    fn pop(&mut self, target: Reg16) {
        self.mmu.oam_pointer_op(self.registers.sp, OamCorruptionKind::Read);
        let value = self.read_short_cycle(self.registers.sp);
        self.set_u16_value(target, value);
        self.registers.sp = self.registers.sp.wrapping_add(2);
    }

    /// `jump to nn, PC=nn` OR `conditional jump if nz,z,nc,c`
    ///
    /// Flags: `----`
    fn jump(&mut self, condition: JumpModifier) {
        let target = self.get_instr_u16();

        if self.matches_jmp_condition(condition) {
            self.registers.pc = target;
            self.add_cycles();
        }
    }

    /// `jump to HL, PC=HL` — no operand fetch, no extra cycle.
    fn jump_hl(&mut self) {
        self.registers.pc = self.registers.hl();
    }

    fn matches_jmp_condition(&self, condition: JumpModifier) -> bool {
        match condition {
            JumpModifier::NotZero => !self.registers.zf(),
            JumpModifier::Zero => self.registers.zf(),
            JumpModifier::NotCarry => !self.registers.cf(),
            JumpModifier::Carry => self.registers.cf(),
            JumpModifier::Always => true,
        }
    }

    /// Call address n16: push the return address, then an implicit `JP n16`.
    ///
    /// Flags: `----`
    fn call(&mut self, condition: JumpModifier) {
        let address = self.get_instr_u16();
        if self.matches_jmp_condition(condition) {
            self.push_helper(self.registers.pc);
            self.registers.pc = address;
        }
    }

    /// Push register `target` onto the stack.
    ///
    /// Flags: `----`
    fn push(&mut self, target: Reg16) {
        self.mmu.oam_pointer_op(self.registers.sp, OamCorruptionKind::Write);
        let value = self.read_u16_value(target);
        self.push_helper(value);
    }

    fn push_helper(&mut self, value: u16) {
        self.add_cycles();
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, (value >> 8) as u8);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, value as u8);
    }

    /// Call address `vec`; the short form of `CALL` for the reset vectors.
    ///
    /// Flags: `----`
    fn rst(&mut self, vec: u8) {
        self.push_helper(self.registers.pc);
        self.registers.pc = vec as u16;
    }

    /// The eleven opcodes the instruction decoder leaves unwired. Real
    /// hardware locks up; we either park the CPU behind a fault or treat it
    /// as a no-op, depending on host configuration.
    fn unknown(&mut self) {
        let pc = self.registers.pc.wrapping_sub(1);
        if self.fault_on_disallowed {
            self.fault = Some(CpuFault {
                opcode: self.opcode,
                pc,
            });
        } else {
            log::warn!("Ignoring undefined opcode {:#04X} at {:#06X}", self.opcode, pc);
        }
    }

    /// Return from subroutine and enable interrupts; equivalent to `EI` then
    /// `RET` except that IME is set right away.
    ///
    /// Flags: `----`
    fn reti(&mut self) {
        self.ime = true;
        self.registers.pc = self.read_short_cycle(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);
        self.add_cycles();
    }

    /// `ADD SP,e8`
    ///
    /// Flags: `00HC` (both computed on the low byte of SP)
    fn add_sp(&mut self) {
        let value = self.get_instr_u8() as i8 as u16;

        self.registers.set_zf(false);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.sp & 0xF) + (value & 0xF) > 0xF);
        self.registers.set_cf((self.registers.sp & 0xFF) + (value & 0xFF) > 0xFF);

        self.registers.sp = self.registers.sp.wrapping_add(value);

        self.add_cycles();
        self.add_cycles();
    }

    /// `DI`
    ///
    /// Flags: `----`
    fn di(&mut self) {
        self.ime = false;
        self.delayed_ime = false;
    }

    /// `LD HL,SP+i8`
    ///
    /// Flags: `00HC` (both computed on the low byte of SP)
    fn load_sp_i(&mut self) {
        let value = self.get_instr_u8() as i8 as u16;

        self.registers.set_zf(false);
        self.registers.set_n(false);
        self.registers.set_h((self.registers.sp & 0xF) + (value & 0xF) > 0xF);
        self.registers.set_cf((self.registers.sp & 0xFF) + (value & 0xFF) > 0xFF);

        self.registers.set_hl(self.registers.sp.wrapping_add(value));

        self.add_cycles();
    }

    /// `LD SP, HL`
    ///
    /// Flags: `----`
    fn load_sp_hl(&mut self) {
        self.registers.sp = self.registers.hl();
        self.add_cycles();
    }

    /// `EI`: IME is only set after the instruction following EI.
    fn ei(&mut self) {
        if !self.ime {
            self.delayed_ime = true;
        }
    }

    /*
       Prefixed Instructions
    */

    /// `RLC r8/[HL]`: rotate left, bit 7 into carry.
    ///
    /// Flags: `Z00C`
    fn rlc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.rotate_left(target);
    }

    /// `RRC r8/[HL]`: rotate right, bit 0 into carry.
    ///
    /// Flags: `Z00C`
    fn rrc<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.rotate_right(target);
    }

    /// `RL r8/[HL]`: rotate left through carry.
    ///
    /// Flags: `Z00C`
    fn rl<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.rotate_left_carry(target);
    }

    /// `RR r8/[HL]`: rotate right through carry.
    ///
    /// Flags: `Z00C`
    fn rr<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.rotate_right_carry(target);
    }

    /// `SLA r8/[HL]`
    ///
    /// Flags: `Z00C`
    fn sla<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.shift_left(target);
    }

    /// `SRA r8/[HL]`: arithmetic shift, bit 7 sticks.
    ///
    /// Flags: `Z00C`
    fn sra<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = (value & 0x80) | (value >> 1);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(value & 0x1 != 0);

        self.set_u8_value(target, new_value);
    }

    /// `SWAP r8/[HL]`: swap the nibbles.
    ///
    /// Flags: `Z000`
    fn swap<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let value = self.read_u8_value(target);
        let new_value = (value << 4) | (value >> 4);

        self.registers.set_zf(new_value == 0);
        self.registers.set_n(false);
        self.registers.set_h(false);
        self.registers.set_cf(false);

        self.set_u8_value(target, new_value);
    }

    /// `SRL r8/[HL]`: logical shift right.
    ///
    /// Flags: `Z00C`
    fn srl<T: Copy>(&mut self, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        self.shift_right(target);
    }

    /// `BIT u3,r8/[HL]`: test bit u3, zero flag set if the bit is clear.
    ///
    /// Flags: `Z01-`
    fn bit<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T>,
    {
        let value = self.read_u8_value(target);

        self.registers.set_zf(value & (1 << bit) == 0);
        self.registers.set_n(false);
        self.registers.set_h(true);
    }

    /// `SET u3,r8/[HL]`
    ///
    /// Flags: `----`
    fn set<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let value = self.read_u8_value(target);

        self.set_u8_value(target, value | (1 << bit));
    }

    /// `RES u3,r8/[HL]`
    ///
    /// Flags: `----`
    fn res<T: Copy>(&mut self, bit: u8, target: T)
    where
        Self: ToU8<T> + SetU8<T>,
    {
        let value = self.read_u8_value(target);

        self.set_u8_value(target, value & !(1 << bit));
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.registers.save_state(writer);
        writer.write_u64(self.cycles_performed);
        writer.write_bool(self.ime);
        writer.write_bool(self.delayed_ime);
        writer.write_bool(self.halted);
        writer.write_bool(self.halt_bug);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.registers.load_state(reader)?;
        self.cycles_performed = reader.read_u64()?;
        self.ime = reader.read_bool()?;
        self.delayed_ime = reader.read_bool()?;
        self.halted = reader.read_bool()?;
        self.halt_bug = reader.read_bool()?;
        self.breakpoint_hit = false;
        self.fault = None;
        Ok(())
    }
}
