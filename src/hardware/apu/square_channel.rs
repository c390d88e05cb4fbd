use crate::emulator::GameBoyModel;
use crate::error::EmulatorError;
use crate::hardware::apu::channel_features::{EnvelopeFeature, LengthFeature, SweepFeature};
use crate::hardware::apu::{no_length_tick_next_step, test_bit};
use crate::state::{StateReader, StateWriter};

/// Channels 1 and 2 share this implementation; only channel 1 has its sweep
/// ticked.
///
/// # Properties:
/// * Sweep (channel 1 only)
/// * Volume Envelope
/// * Length Counter
#[derive(Default, Debug)]
pub struct SquareWaveChannel {
    pub length: LengthFeature,
    envelope: EnvelopeFeature,
    sweep: SweepFeature,
    enabled: bool,
    frequency: u16,
    timer: u32,
    duty_select: usize,
    wave_table_index: usize,
}

impl SquareWaveChannel {
    const SQUARE_WAVE_TABLE: [[u8; 8]; 4] = [
        [0, 0, 0, 0, 0, 0, 0, 1], // 12.5% duty
        [1, 0, 0, 0, 0, 0, 0, 1], // 25%
        [1, 0, 0, 0, 0, 1, 1, 1], // 50%
        [0, 1, 1, 1, 1, 1, 1, 0], // 75%
    ];

    /// Current DAC input, `0` while the channel is dormant.
    pub fn output_volume(&self) -> u8 {
        if self.enabled && self.envelope.dac_enabled() {
            self.envelope.volume * Self::SQUARE_WAVE_TABLE[self.duty_select][self.wave_table_index]
        } else {
            0
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn period(&self) -> u32 {
        (2048 - self.frequency as u32) * 4
    }

    pub fn tick_timer(&mut self, cycles: u64) {
        let mut remaining = cycles as u32;
        while remaining > 0 {
            if self.timer == 0 {
                self.timer = self.period();
            }
            if self.timer > remaining {
                self.timer -= remaining;
                break;
            }
            remaining -= self.timer;
            self.timer = self.period();
            self.wave_table_index = (self.wave_table_index + 1) % 8;
        }
    }

    /// `address` is the low byte of the I/O address, normalised to channel
    /// 1's register block (0x10..=0x14).
    pub fn read_register(&self, address: u16) -> u8 {
        match address {
            0x10 => 0x80 | self.sweep.read_register(),
            0x11 => 0x3F | ((self.duty_select as u8) << 6),
            0x12 => self.envelope.read_register(),
            0x13 => 0xFF, // Frequency bits are write-only.
            0x14 => 0xBF | ((self.length.length_enable as u8) << 6),
            _ => unreachable!("Out of bounds square channel read: {:#X}", address),
        }
    }

    pub fn write_register(&mut self, address: u16, value: u8, next_frame_sequencer_step: u8) {
        match address {
            0x10 => self.sweep.write_register(value),
            0x11 => {
                self.duty_select = (value >> 6) as usize;
                self.length.write_register(value);
            }
            0x12 => {
                self.envelope.write_register(value);
                if !self.envelope.dac_enabled() {
                    self.enabled = false;
                }
            }
            0x13 => self.frequency = (self.frequency & 0x0700) | value as u16,
            0x14 => {
                let old_length_enable = self.length.length_enable;
                let no_length_next = no_length_tick_next_step(next_frame_sequencer_step);

                self.length.length_enable = test_bit(value, 6);
                self.frequency = (self.frequency & 0xFF) | ((value as u16 & 0x07) << 8);

                if no_length_next {
                    self.length.second_half_enable_tick(&mut self.enabled, old_length_enable);
                }
                if test_bit(value, 7) {
                    self.trigger(no_length_next);
                }
            }
            _ => unreachable!("Out of bounds square channel write: {:#X}", address),
        }
    }

    /// NRx4 trigger bit: restart the channel.
    fn trigger(&mut self, next_step_no_length: bool) {
        self.enabled = true;
        self.length.trigger(next_step_no_length, 64);
        self.envelope.trigger();
        self.timer = self.period();
        self.sweep.trigger(&mut self.enabled, self.frequency);

        if !self.envelope.dac_enabled() {
            self.enabled = false;
        }
    }

    pub fn tick_length(&mut self) {
        self.length.tick(&mut self.enabled);
    }

    pub fn tick_envelope(&mut self) {
        self.envelope.tick();
    }

    pub fn tick_sweep(&mut self) {
        self.sweep.tick(&mut self.enabled, &mut self.frequency);
    }

    /// APU power-off. On DMG the length counters survive.
    pub fn reset(&mut self, model: GameBoyModel) {
        let length = self.length;
        *self = Self::default();
        if model.is_dmg() {
            self.length = length;
            self.length.length_enable = false;
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.length.save_state(writer);
        self.envelope.save_state(writer);
        self.sweep.save_state(writer);
        writer.write_bool(self.enabled);
        writer.write_u16(self.frequency);
        writer.write_u32(self.timer);
        writer.write_u8(self.duty_select as u8);
        writer.write_u8(self.wave_table_index as u8);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.length.load_state(reader)?;
        self.envelope.load_state(reader)?;
        self.sweep.load_state(reader)?;
        self.enabled = reader.read_bool()?;
        self.frequency = reader.read_u16()? & 0x7FF;
        self.timer = reader.read_u32()?;
        self.duty_select = (reader.read_u8()? & 0x3) as usize;
        self.wave_table_index = (reader.read_u8()? & 0x7) as usize;
        Ok(())
    }
}
