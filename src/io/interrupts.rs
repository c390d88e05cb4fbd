use bitflags::*;

use crate::error::EmulatorError;
use crate::state::{StateReader, StateWriter};

/// The five interrupt sources, ordered by priority and carrying their
/// dispatch vector.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum Interrupt {
    Vblank = 0x40,
    LcdStat = 0x48,
    Timer = 0x50,
    Serial = 0x58,
    Joypad = 0x60,
}

impl Interrupt {
    /// The fixed dispatch vector.
    pub fn vector(self) -> u16 {
        self as u16
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        const VBLANK = 0b0000_0001;
        const STAT   = 0b0000_0010;
        const TIMER  = 0b0000_0100;
        const SERIAL = 0b0000_1000;
        const JOYPAD = 0b0001_0000;
    }
}

impl InterruptFlags {
    /// The highest-priority interrupt in this set, with its vector.
    pub fn highest_priority(self) -> Option<Interrupt> {
        if self.contains(InterruptFlags::VBLANK) {
            Some(Interrupt::Vblank)
        } else if self.contains(InterruptFlags::STAT) {
            Some(Interrupt::LcdStat)
        } else if self.contains(InterruptFlags::TIMER) {
            Some(Interrupt::Timer)
        } else if self.contains(InterruptFlags::SERIAL) {
            Some(Interrupt::Serial)
        } else if self.contains(InterruptFlags::JOYPAD) {
            Some(Interrupt::Joypad)
        } else {
            None
        }
    }
}

/// IF and IE. IE keeps all eight bits a game writes; IF's upper three bits
/// always read 1.
#[derive(Default, Debug, Clone)]
pub struct Interrupts {
    pub interrupt_flag: InterruptFlags,
    interrupt_enable: u8,
}

impl Interrupts {
    #[inline]
    pub fn request(&mut self, interrupt: InterruptFlags) {
        self.interrupt_flag.insert(interrupt);
    }

    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        let flag = match interrupt {
            Interrupt::Vblank => InterruptFlags::VBLANK,
            Interrupt::LcdStat => InterruptFlags::STAT,
            Interrupt::Timer => InterruptFlags::TIMER,
            Interrupt::Serial => InterruptFlags::SERIAL,
            Interrupt::Joypad => InterruptFlags::JOYPAD,
        };
        self.interrupt_flag.remove(flag);
    }

    /// Interrupts that are both raised and enabled.
    #[inline]
    pub fn pending(&self) -> InterruptFlags {
        self.interrupt_flag & self.enabled_flags()
    }

    #[inline]
    pub fn enabled_flags(&self) -> InterruptFlags {
        InterruptFlags::from_bits_truncate(self.interrupt_enable)
    }

    pub fn read_flag(&self) -> u8 {
        0xE0 | self.interrupt_flag.bits()
    }

    pub fn read_enable(&self) -> u8 {
        self.interrupt_enable
    }

    pub fn overwrite_flag(&mut self, value: u8) {
        self.interrupt_flag = InterruptFlags::from_bits_truncate(value);
    }

    pub fn overwrite_enable(&mut self, value: u8) {
        self.interrupt_enable = value;
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.interrupt_flag.bits());
        writer.write_u8(self.interrupt_enable);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.interrupt_flag = InterruptFlags::from_bits_truncate(reader.read_u8()?);
        self.interrupt_enable = reader.read_u8()?;
        Ok(())
    }
}
