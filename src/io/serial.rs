//! Link-cable registers with nothing plugged in. Transfers clocked by the
//! internal clock complete and shift in all ones; externally clocked
//! transfers wait forever, exactly like a disconnected cable.

use crate::emulator::GameBoyModel;
use crate::error::EmulatorError;
use crate::scheduler::{EventType, Scheduler};
use crate::state::{StateReader, StateWriter};

pub const SIO_DATA: u16 = 0xFF01;
pub const SIO_CONT: u16 = 0xFF02;

/// 8 bits at 8192 Hz.
const TRANSFER_CYCLES: u64 = 4096;
/// 8 bits at 262144 Hz (CGB fast clock).
const TRANSFER_CYCLES_FAST: u64 = 128;

#[derive(Debug, Default)]
pub struct Serial {
    data: u8,
    control: u8,
    /// Every byte a game has pushed out the wire; Blargg's test ROMs report
    /// their results this way.
    output_log: Vec<u8>,
}

impl Serial {
    pub fn read_data(&self) -> u8 {
        self.data
    }

    pub fn write_data(&mut self, value: u8) {
        self.data = value;
    }

    pub fn read_control(&self, model: GameBoyModel) -> u8 {
        if model.is_cgb() {
            0x7C | (self.control & 0x83)
        } else {
            0x7E | (self.control & 0x81)
        }
    }

    pub fn write_control(&mut self, value: u8, model: GameBoyModel, scheduler: &mut Scheduler) {
        self.control = value;
        scheduler.remove_event_type(EventType::SerialTransfer);

        // Bit 7 requests a transfer, bit 0 selects the internal clock. With
        // the external clock selected nothing will ever drive the shift.
        if value & 0x81 == 0x81 {
            self.output_log.push(self.data);
            let cycles = if model.is_cgb() && value & 0x02 != 0 {
                TRANSFER_CYCLES_FAST
            } else {
                TRANSFER_CYCLES
            };
            scheduler.push_relative(EventType::SerialTransfer, cycles);
        }
    }

    /// `SerialTransfer` event: the byte has been shifted out and eight ones
    /// shifted in. The caller raises the Serial interrupt.
    pub fn finish_transfer(&mut self) {
        self.data = 0xFF;
        self.control &= !0x80;
    }

    pub fn output_log(&self) -> &[u8] {
        &self.output_log
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.data);
        writer.write_u8(self.control);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.data = reader.read_u8()?;
        self.control = reader.read_u8()?;
        Ok(())
    }
}
