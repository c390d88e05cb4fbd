//! Operand resolution. Instruction handlers are generic over these traits so
//! that one handler serves a whole opcode row, whether the operand is a plain
//! register, an immediate, or a pointer; memory-flavoured operands pay their
//! M-cycles here.

use crate::hardware::cpu::execute::{InstructionAddress, WrapperEnum};
use crate::hardware::cpu::registers::{Reg16, Reg8};
use crate::hardware::cpu::CPU;
use crate::hardware::mmu::MemoryBus;
use crate::hardware::ppu::OamCorruptionKind;

pub trait ToU8<T: Copy> {
    /// Resolve `target` down to a value, paying memory cycles if it lives
    /// behind a pointer.
    fn read_u8_value(&mut self, target: T) -> u8;
}

pub trait SetU8<T: Copy> {
    fn set_u8_value(&mut self, target: T, value: u8);
}

pub trait ToU16<T: Copy> {
    fn read_u16_value(&mut self, target: T) -> u16;
}

pub trait SetU16<T: Copy> {
    fn set_u16_value(&mut self, target: T, value: u16);
}

impl<M: MemoryBus> ToU8<Reg8> for CPU<M> {
    fn read_u8_value(&mut self, target: Reg8) -> u8 {
        match target {
            Reg8::A => self.registers.a,
            Reg8::B => self.registers.b,
            Reg8::C => self.registers.c,
            Reg8::D => self.registers.d,
            Reg8::E => self.registers.e,
            Reg8::H => self.registers.h,
            Reg8::L => self.registers.l,
        }
    }
}

impl<M: MemoryBus> SetU8<Reg8> for CPU<M> {
    fn set_u8_value(&mut self, target: Reg8, value: u8) {
        match target {
            Reg8::A => self.registers.a = value,
            Reg8::B => self.registers.b = value,
            Reg8::C => self.registers.c = value,
            Reg8::D => self.registers.d = value,
            Reg8::E => self.registers.e = value,
            Reg8::H => self.registers.h = value,
            Reg8::L => self.registers.l = value,
        }
    }
}

impl<M: MemoryBus> ToU8<InstructionAddress> for CPU<M> {
    fn read_u8_value(&mut self, target: InstructionAddress) -> u8 {
        use InstructionAddress::*;
        match target {
            BCI => self.read_byte_cycle(self.registers.bc()),
            DEI => self.read_byte_cycle(self.registers.de()),
            HLI => self.read_byte_cycle(self.registers.hl()),
            HLIP => {
                let address = self.registers.hl();
                self.mmu.oam_pointer_op(address, OamCorruptionKind::Read);
                let result = self.read_byte_cycle(address);
                self.registers.set_hl(address.wrapping_add(1));
                result
            }
            HLIN => {
                let address = self.registers.hl();
                self.mmu.oam_pointer_op(address, OamCorruptionKind::Read);
                let result = self.read_byte_cycle(address);
                self.registers.set_hl(address.wrapping_sub(1));
                result
            }
            DIRECT => self.get_instr_u8(),
            DirectMem => {
                let address = self.get_instr_u16();
                self.read_byte_cycle(address)
            }
            IoDirect => {
                let offset = self.get_instr_u8();
                self.read_byte_cycle(0xFF00 | offset as u16)
            }
            IoC => self.read_byte_cycle(0xFF00 | self.registers.c as u16),
        }
    }
}

impl<M: MemoryBus> SetU8<InstructionAddress> for CPU<M> {
    fn set_u8_value(&mut self, target: InstructionAddress, value: u8) {
        use InstructionAddress::*;
        match target {
            BCI => self.write_byte_cycle(self.registers.bc(), value),
            DEI => self.write_byte_cycle(self.registers.de(), value),
            HLI => self.write_byte_cycle(self.registers.hl(), value),
            HLIP => {
                let address = self.registers.hl();
                self.mmu.oam_pointer_op(address, OamCorruptionKind::Write);
                self.write_byte_cycle(address, value);
                self.registers.set_hl(address.wrapping_add(1));
            }
            HLIN => {
                let address = self.registers.hl();
                self.mmu.oam_pointer_op(address, OamCorruptionKind::Write);
                self.write_byte_cycle(address, value);
                self.registers.set_hl(address.wrapping_sub(1));
            }
            DIRECT => unreachable!("Immediates are not writable"),
            DirectMem => {
                let address = self.get_instr_u16();
                self.write_byte_cycle(address, value);
            }
            IoDirect => {
                let offset = self.get_instr_u8();
                self.write_byte_cycle(0xFF00 | offset as u16, value);
            }
            IoC => self.write_byte_cycle(0xFF00 | self.registers.c as u16, value),
        }
    }
}

impl<M: MemoryBus> ToU8<WrapperEnum> for CPU<M> {
    fn read_u8_value(&mut self, target: WrapperEnum) -> u8 {
        match target {
            WrapperEnum::Reg8(result) => self.read_u8_value(result),
            WrapperEnum::InstructionAddress(result) => self.read_u8_value(result),
        }
    }
}

impl<M: MemoryBus> SetU8<WrapperEnum> for CPU<M> {
    fn set_u8_value(&mut self, target: WrapperEnum, value: u8) {
        match target {
            WrapperEnum::Reg8(result) => self.set_u8_value(result, value),
            WrapperEnum::InstructionAddress(result) => self.set_u8_value(result, value),
        }
    }
}

impl<M: MemoryBus> ToU16<Reg16> for CPU<M> {
    fn read_u16_value(&mut self, target: Reg16) -> u16 {
        match target {
            Reg16::AF => self.registers.af(),
            Reg16::BC => self.registers.bc(),
            Reg16::DE => self.registers.de(),
            Reg16::HL => self.registers.hl(),
            Reg16::SP => self.registers.sp,
        }
    }
}

impl<M: MemoryBus> SetU16<Reg16> for CPU<M> {
    fn set_u16_value(&mut self, target: Reg16, value: u16) {
        match target {
            Reg16::AF => self.registers.set_af(value),
            Reg16::BC => self.registers.set_bc(value),
            Reg16::DE => self.registers.set_de(value),
            Reg16::HL => self.registers.set_hl(value),
            Reg16::SP => self.registers.sp = value,
        }
    }
}

impl<M: MemoryBus> ToU16<InstructionAddress> for CPU<M> {
    fn read_u16_value(&mut self, target: InstructionAddress) -> u16 {
        match target {
            InstructionAddress::DIRECT => self.get_instr_u16(),
            _ => unreachable!("No 16-bit reads through {:?}", target),
        }
    }
}

impl<M: MemoryBus> SetU16<InstructionAddress> for CPU<M> {
    fn set_u16_value(&mut self, target: InstructionAddress, value: u16) {
        match target {
            InstructionAddress::DirectMem => {
                let address = self.get_instr_u16();
                self.write_short_cycle(address, value);
            }
            _ => unreachable!("No 16-bit writes through {:?}", target),
        }
    }
}
