//! The three clocked features the frame sequencer drives: length counters,
//! volume envelopes, and channel 1's frequency sweep.

use crate::error::EmulatorError;
use crate::state::{StateReader, StateWriter};

/// A length counter, 64 steps for the square/noise channels and 256 for the
/// wave channel.
#[derive(Default, Debug, Copy, Clone)]
pub struct LengthFeature {
    pub length_enable: bool,
    counter: u16,
}

impl LengthFeature {
    /// NRx1 write for the 64-step channels.
    pub fn write_register(&mut self, value: u8) {
        self.counter = 64 - (value & 0x3F) as u16;
    }

    /// NR31 write: the wave channel counts all eight bits.
    pub fn write_register_256(&mut self, value: u8) {
        self.counter = 256 - value as u16;
    }

    /// A 256 Hz length clock from the frame sequencer.
    pub fn tick(&mut self, channel_enable: &mut bool) {
        if self.length_enable && self.counter > 0 {
            self.counter -= 1;
            if self.counter == 0 {
                *channel_enable = false;
            }
        }
    }

    /// Enabling the length counter in the first half of a frame-sequencer
    /// period clocks it immediately; this is the extra tick.
    pub fn second_half_enable_tick(&mut self, channel_enable: &mut bool, old_enable: bool) {
        if !old_enable && self.length_enable {
            self.tick(channel_enable);
        }
    }

    /// Trigger behaviour: an expired counter reloads to the maximum, minus
    /// one when the next sequencer step would not clock length.
    pub fn trigger(&mut self, next_step_no_length: bool, maximum: u16) {
        if self.counter == 0 {
            self.counter = maximum;
            if next_step_no_length && self.length_enable {
                self.counter -= 1;
            }
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_bool(self.length_enable);
        writer.write_u16(self.counter);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.length_enable = reader.read_bool()?;
        self.counter = reader.read_u16()?;
        Ok(())
    }
}

/// A 64 Hz volume envelope. When the period is non-zero the volume walks one
/// step up or down until it leaves 0..=15, then freezes until retriggered.
#[derive(Default, Debug, Copy, Clone)]
pub struct EnvelopeFeature {
    pub volume: u8,
    volume_load: u8,
    add_mode: bool,
    period_load: u8,
    period: u8,
    enabled: bool,
}

impl EnvelopeFeature {
    pub fn tick(&mut self) {
        if !self.enabled || self.period_load == 0 {
            return;
        }
        self.period = self.period.saturating_sub(1);
        if self.period > 0 {
            return;
        }
        self.period = self.period_load;

        let new_volume = if self.add_mode {
            self.volume as i8 + 1
        } else {
            self.volume as i8 - 1
        };
        if (0..=15).contains(&new_volume) {
            self.volume = new_volume as u8;
        } else {
            self.enabled = false;
        }
    }

    pub fn trigger(&mut self) {
        self.enabled = true;
        self.period = self.period_load;
        self.volume = self.volume_load;
    }

    /// The DAC is powered by the upper five bits of NRx2; a channel with a
    /// dead DAC can never sound.
    pub fn dac_enabled(&self) -> bool {
        self.volume_load != 0 || self.add_mode
    }

    pub fn read_register(&self) -> u8 {
        (self.volume_load << 4) | ((self.add_mode as u8) << 3) | self.period_load
    }

    pub fn write_register(&mut self, value: u8) {
        self.volume_load = value >> 4;
        self.add_mode = value & 0x8 != 0;
        self.period_load = value & 0x7;
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.volume);
        writer.write_u8(self.volume_load);
        writer.write_bool(self.add_mode);
        writer.write_u8(self.period_load);
        writer.write_u8(self.period);
        writer.write_bool(self.enabled);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.volume = reader.read_u8()?;
        self.volume_load = reader.read_u8()?;
        self.add_mode = reader.read_bool()?;
        self.period_load = reader.read_u8()?;
        self.period = reader.read_u8()?;
        self.enabled = reader.read_bool()?;
        Ok(())
    }
}

/// Channel 1's 128 Hz frequency sweep.
#[derive(Default, Debug, Copy, Clone)]
pub struct SweepFeature {
    period_load: u8,
    negate: bool,
    shift: u8,
    enabled: bool,
    timer: u8,
    shadow_frequency: u16,
}

impl SweepFeature {
    pub fn tick(&mut self, channel_enable: &mut bool, frequency: &mut u16) {
        if !self.enabled {
            return;
        }
        self.timer = self.timer.saturating_sub(1);
        if self.timer > 0 {
            return;
        }
        self.reload_timer();

        if self.period_load > 0 {
            let new_frequency = self.calculate(channel_enable);
            if new_frequency < 2048 && self.shift > 0 {
                self.shadow_frequency = new_frequency;
                *frequency = new_frequency;
                // The second calculation only runs the overflow check.
                self.calculate(channel_enable);
            }
        }
    }

    pub fn trigger(&mut self, channel_enable: &mut bool, frequency: u16) {
        self.shadow_frequency = frequency;
        self.reload_timer();
        self.enabled = self.period_load > 0 || self.shift > 0;
        if self.shift > 0 {
            self.calculate(channel_enable);
        }
    }

    /// The next swept frequency; overflowing past 2047 kills the channel.
    fn calculate(&mut self, channel_enable: &mut bool) -> u16 {
        let delta = self.shadow_frequency >> self.shift;
        let new_frequency = if self.negate {
            self.shadow_frequency.wrapping_sub(delta)
        } else {
            self.shadow_frequency + delta
        };
        if new_frequency > 2047 {
            *channel_enable = false;
        }
        new_frequency
    }

    fn reload_timer(&mut self) {
        // A zero period behaves as eight.
        self.timer = if self.period_load == 0 { 8 } else { self.period_load };
    }

    pub fn read_register(&self) -> u8 {
        (self.period_load << 4) | ((self.negate as u8) << 3) | self.shift
    }

    pub fn write_register(&mut self, value: u8) {
        self.period_load = (value >> 4) & 0x7;
        self.negate = value & 0x8 != 0;
        self.shift = value & 0x7;
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.read_register());
        writer.write_bool(self.enabled);
        writer.write_u8(self.timer);
        writer.write_u16(self.shadow_frequency);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        let register = reader.read_u8()?;
        self.write_register(register);
        self.enabled = reader.read_bool()?;
        self.timer = reader.read_u8()?;
        self.shadow_frequency = reader.read_u16()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counter_disables_channel_at_zero() {
        let mut length = LengthFeature::default();
        let mut enabled = true;
        length.write_register(0x3E); // counter = 2
        length.length_enable = true;

        length.tick(&mut enabled);
        assert!(enabled);
        length.tick(&mut enabled);
        assert!(!enabled);
    }

    #[test]
    fn envelope_walks_and_freezes() {
        let mut envelope = EnvelopeFeature::default();
        envelope.write_register(0xE1); // volume 14, subtract... add bit clear, period 1
        envelope.trigger();

        for _ in 0..20 {
            envelope.tick();
        }
        // Walked down from 14 to 0 and froze there.
        assert_eq!(envelope.volume, 0);
    }

    #[test]
    fn sweep_overflow_disables_channel() {
        let mut sweep = SweepFeature::default();
        let mut enabled = true;
        sweep.write_register(0x11); // period 1, add mode, shift 1
        sweep.trigger(&mut enabled, 0x700);

        // 0x700 + 0x380 > 2047 on the very first calculation.
        assert!(!enabled);
    }

    #[test]
    fn dac_power_follows_upper_bits() {
        let mut envelope = EnvelopeFeature::default();
        envelope.write_register(0x00);
        assert!(!envelope.dac_enabled());
        envelope.write_register(0x08);
        assert!(envelope.dac_enabled());
        envelope.write_register(0xF0);
        assert!(envelope.dac_enabled());
    }
}
