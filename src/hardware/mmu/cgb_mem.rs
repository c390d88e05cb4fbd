//! CGB-only bus state: the KEY1 speed switch, the HDMA/GDMA register block,
//! and the undocumented FF72-FF75 scratchpads.

use crate::error::EmulatorError;
use crate::state::{StateReader, StateWriter};

/// KEY1. Bit 7 reflects the current speed, bit 0 arms a switch that the next
/// STOP instruction performs.
#[derive(Debug)]
pub struct SpeedState {
    pub double_speed: bool,
    armed: bool,
}

impl SpeedState {
    pub fn new() -> Self {
        SpeedState {
            double_speed: false,
            armed: false,
        }
    }

    /// The shift peripheral-domain event durations are scheduled with.
    pub fn shift(&self) -> u64 {
        self.double_speed as u64
    }

    pub fn read_key1(&self) -> u8 {
        0x7E | ((self.double_speed as u8) << 7) | self.armed as u8
    }

    pub fn write_key1(&mut self, value: u8) {
        self.armed = value & 0x1 != 0;
    }

    /// STOP with the switch armed: toggle the speed, disarm. Returns whether
    /// a switch actually happened.
    pub fn perform_switch(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.double_speed = !self.double_speed;
        log::info!(
            "Speed switch: CPU now runs at {} speed",
            if self.double_speed { "double" } else { "normal" }
        );
        true
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_bool(self.double_speed);
        writer.write_bool(self.armed);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.double_speed = reader.read_bool()?;
        self.armed = reader.read_bool()?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HdmaMode {
    /// Copy everything right now, CPU stalled.
    General,
    /// Copy 16 bytes at each HBlank until done or cancelled.
    HBlank,
}

/// FF51-FF55. Source/destination are latched with their alignment bits
/// dropped; FF55 both starts transfers and reports progress.
#[derive(Debug)]
pub struct HdmaState {
    pub source: u16,
    pub destination: u16,
    pub mode: HdmaMode,
    pub blocks_remaining: u8,
    pub active: bool,
    /// Distinguishes "finished/never ran" (reads 0xFF) from "cancelled"
    /// (reads remaining count with bit 7 set).
    cancelled: bool,
}

impl HdmaState {
    pub fn new() -> Self {
        HdmaState {
            source: 0,
            destination: 0x8000,
            mode: HdmaMode::General,
            blocks_remaining: 0,
            active: false,
            cancelled: false,
        }
    }

    pub fn write_source_high(&mut self, value: u8) {
        self.source = (self.source & 0x00F0) | ((value as u16) << 8);
    }

    pub fn write_source_low(&mut self, value: u8) {
        self.source = (self.source & 0xFF00) | (value & 0xF0) as u16;
    }

    pub fn write_destination_high(&mut self, value: u8) {
        self.destination = 0x8000 | (self.destination & 0x00F0) | (((value & 0x1F) as u16) << 8);
    }

    pub fn write_destination_low(&mut self, value: u8) {
        self.destination = (self.destination & 0xFF00) | (value & 0xF0) as u16;
    }

    /// FF55 write. Returns the mode to kick off, or `None` when the write
    /// cancelled a running HBlank transfer.
    pub fn write_control(&mut self, value: u8) -> Option<HdmaMode> {
        if self.active && value & 0x80 == 0 {
            self.active = false;
            self.cancelled = true;
            return None;
        }

        self.blocks_remaining = (value & 0x7F) + 1;
        self.mode = if value & 0x80 != 0 {
            HdmaMode::HBlank
        } else {
            HdmaMode::General
        };
        self.active = true;
        self.cancelled = false;
        Some(self.mode)
    }

    /// FF55 read: remaining blocks minus one, bit 7 high when inactive.
    pub fn read_control(&self) -> u8 {
        if self.active {
            self.blocks_remaining - 1
        } else if self.cancelled {
            0x80 | (self.blocks_remaining.wrapping_sub(1) & 0x7F)
        } else {
            0xFF
        }
    }

    /// Account for one copied 16-byte block.
    pub fn advance_block(&mut self) {
        self.source = self.source.wrapping_add(16);
        self.destination = self.destination.wrapping_add(16);
        self.blocks_remaining -= 1;
        if self.blocks_remaining == 0 {
            self.active = false;
            self.cancelled = false;
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u16(self.source);
        writer.write_u16(self.destination);
        writer.write_bool(self.mode == HdmaMode::HBlank);
        writer.write_u8(self.blocks_remaining);
        writer.write_bool(self.active);
        writer.write_bool(self.cancelled);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.source = reader.read_u16()?;
        self.destination = reader.read_u16()?;
        self.mode = if reader.read_bool()? {
            HdmaMode::HBlank
        } else {
            HdmaMode::General
        };
        self.blocks_remaining = reader.read_u8()?;
        self.active = reader.read_bool()?;
        self.cancelled = reader.read_bool()?;
        Ok(())
    }
}

/// FF72-FF75: plain read/write scratch bytes on CGB (FF75 only keeps bits
/// 4-6), absent on DMG. Confirmed by test ROMs; no game is known to need
/// them.
#[derive(Debug, Default)]
pub struct UndocumentedRegisters {
    ff72: u8,
    ff73: u8,
    ff74: u8,
    ff75: u8,
}

impl UndocumentedRegisters {
    pub fn read(&self, address: u16) -> u8 {
        match address {
            0xFF72 => self.ff72,
            0xFF73 => self.ff73,
            0xFF74 => self.ff74,
            _ => 0x8F | self.ff75,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0xFF72 => self.ff72 = value,
            0xFF73 => self.ff73 = value,
            0xFF74 => self.ff74 = value,
            _ => self.ff75 = value & 0x70,
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.ff72);
        writer.write_u8(self.ff73);
        writer.write_u8(self.ff74);
        writer.write_u8(self.ff75);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.ff72 = reader.read_u8()?;
        self.ff73 = reader.read_u8()?;
        self.ff74 = reader.read_u8()?;
        self.ff75 = reader.read_u8()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key1_arms_and_switches() {
        let mut speed = SpeedState::new();
        assert_eq!(speed.read_key1(), 0x7E);
        assert!(!speed.perform_switch());

        speed.write_key1(0x01);
        assert_eq!(speed.read_key1(), 0x7F);
        assert!(speed.perform_switch());
        assert_eq!(speed.read_key1(), 0xFE);
        assert_eq!(speed.shift(), 1);
    }

    #[test]
    fn hdma_latches_drop_alignment_bits() {
        let mut hdma = HdmaState::new();
        hdma.write_source_high(0xC1);
        hdma.write_source_low(0x2F);
        hdma.write_destination_high(0xFF);
        hdma.write_destination_low(0x3F);

        assert_eq!(hdma.source, 0xC120);
        assert_eq!(hdma.destination, 0x9F30);
    }

    #[test]
    fn control_reports_progress_and_cancellation() {
        let mut hdma = HdmaState::new();
        assert_eq!(hdma.read_control(), 0xFF);

        assert_eq!(hdma.write_control(0x83), Some(HdmaMode::HBlank)); // 4 blocks
        assert_eq!(hdma.read_control(), 0x03);

        hdma.advance_block();
        assert_eq!(hdma.read_control(), 0x02);

        assert_eq!(hdma.write_control(0x00), None); // cancel
        assert_eq!(hdma.read_control(), 0x82);
    }

    #[test]
    fn completing_all_blocks_deactivates() {
        let mut hdma = HdmaState::new();
        hdma.write_control(0x00); // one block, general
        hdma.advance_block();
        assert!(!hdma.active);
        assert_eq!(hdma.read_control(), 0xFF);
    }
}
