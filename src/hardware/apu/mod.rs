//! The APU is lazily evaluated: channels only advance to the scheduler's
//! current cycle when a register is touched or one of the two APU events
//! (frame sequencer, sample production) fires. As long as every access
//! synchronises first, nothing can observe the difference.

use crate::emulator::GameBoyModel;
use crate::error::EmulatorError;
use crate::hardware::apu::noise_channel::NoiseChannel;
use crate::hardware::apu::square_channel::SquareWaveChannel;
use crate::hardware::apu::wave_channel::WaveformChannel;
use crate::state::{StateReader, StateWriter};

pub mod channel_features;
pub mod noise_channel;
pub mod square_channel;
pub mod wave_channel;

pub const APU_MEM_START: u16 = 0xFF10;
pub const APU_MEM_END: u16 = 0xFF2F;
pub const WAVE_SAMPLE_START: u16 = 0xFF30;
pub const WAVE_SAMPLE_END: u16 = 0xFF3F;

/// The frame sequencer clocks at 512 Hz: 4194304 / 512 = 8192 cycles.
pub const FRAME_SEQUENCE_CYCLES: u64 = 8192;

/// Keep at most a second of queued stereo audio before dropping the oldest
/// samples and flagging the host.
const OVERFLOW_SECONDS: usize = 1;

#[derive(Debug)]
pub struct Apu {
    model: GameBoyModel,
    voice1: SquareWaveChannel,
    voice2: SquareWaveChannel,
    voice3: WaveformChannel,
    voice4: NoiseChannel,

    // The vin bits are unused by almost every game, but they read back.
    vin_l_enable: bool,
    vin_r_enable: bool,
    left_volume: u8,
    right_volume: u8,
    // Index 0-3 represents voice 1-4 respectively.
    left_channel_enable: [bool; 4],
    right_channel_enable: [bool; 4],
    power: bool,

    frame_sequencer_step: u8,
    last_synchronise_time: u64,
    last_frame_sequence_tick: u64,

    cycles_per_sample: u64,
    sample_progress: u64,
    sample_rate: u32,
    output_buffer: Vec<i16>,
    overflowed: bool,

    pcm12: u8,
    pcm34: u8,
}

impl Apu {
    pub fn new(model: GameBoyModel, sample_rate: u32) -> Self {
        let cycles_per_sample = crate::emulator::DMG_CLOCK_SPEED / sample_rate.max(1) as u64;
        Apu {
            model,
            voice1: SquareWaveChannel::default(),
            voice2: SquareWaveChannel::default(),
            voice3: WaveformChannel::new(),
            voice4: NoiseChannel::default(),
            vin_l_enable: false,
            vin_r_enable: false,
            left_volume: 7,
            right_volume: 7,
            left_channel_enable: [true; 4],
            right_channel_enable: [true, true, false, false],
            power: true,
            frame_sequencer_step: 0,
            last_synchronise_time: 0,
            last_frame_sequence_tick: 0,
            cycles_per_sample,
            sample_progress: 0,
            sample_rate,
            output_buffer: Vec::with_capacity(sample_rate as usize / 15),
            overflowed: false,
            pcm12: 0,
            pcm34: 0,
        }
    }

    /// Bring every channel up to `now`, producing samples on the way. Must
    /// run before any register access and on both APU scheduler events.
    pub fn synchronise(&mut self, now: u64, speed_shift: u64) {
        self.tick_frame_sequencer(now, speed_shift);

        let delta = now.saturating_sub(self.last_synchronise_time) >> speed_shift;
        self.last_synchronise_time = now;

        // A powered-off APU still produces samples (all DACs silent) so the
        // host's audio cadence never starves.
        let mut remaining = delta;
        while remaining > 0 {
            let chunk = remaining.min(self.cycles_per_sample - self.sample_progress);
            self.voice1.tick_timer(chunk);
            self.voice2.tick_timer(chunk);
            self.voice3.tick_timer(chunk);
            self.voice4.tick_timer(chunk);

            self.sample_progress += chunk;
            remaining -= chunk;

            if self.sample_progress == self.cycles_per_sample {
                self.sample_progress = 0;
                self.generate_sample();
            }
        }
    }

    /// Ticks, if due, the 512 Hz sequencer driving length/sweep/envelope.
    /// Always runs before the channel timers so a step that disables a
    /// channel mutes the samples that follow it.
    fn tick_frame_sequencer(&mut self, now: u64, speed_shift: u64) {
        let mut delta = now.saturating_sub(self.last_frame_sequence_tick) >> speed_shift;
        while delta >= FRAME_SEQUENCE_CYCLES {
            if self.power {
                match self.frame_sequencer_step {
                    0 | 4 => self.tick_lengths(),
                    2 | 6 => {
                        self.tick_lengths();
                        self.voice1.tick_sweep();
                    }
                    7 => {
                        self.voice1.tick_envelope();
                        self.voice2.tick_envelope();
                        self.voice4.tick_envelope();
                    }
                    _ => {}
                }
                self.frame_sequencer_step = (self.frame_sequencer_step + 1) % 8;
            }
            delta -= FRAME_SEQUENCE_CYCLES;
            self.last_frame_sequence_tick += FRAME_SEQUENCE_CYCLES << speed_shift;
        }
    }

    fn tick_lengths(&mut self) {
        self.voice1.tick_length();
        self.voice2.tick_length();
        self.voice3.tick_length();
        self.voice4.tick_length();
    }

    fn generate_sample(&mut self) {
        let outputs = [
            self.voice1.output_volume(),
            self.voice2.output_volume(),
            self.voice3.output_volume(),
            self.voice4.output_volume(),
        ];
        self.pcm12 = outputs[0] | (outputs[1] << 4);
        self.pcm34 = outputs[2] | (outputs[3] << 4);

        let mut left = 0i32;
        let mut right = 0i32;
        for (index, &dac) in outputs.iter().enumerate() {
            let centered = dac as i32 - 8;
            if self.left_channel_enable[index] {
                left += centered;
            }
            if self.right_channel_enable[index] {
                right += centered;
            }
        }

        left *= (self.left_volume as i32 + 1) * 128;
        right *= (self.right_volume as i32 + 1) * 128;

        self.output_buffer.push(left as i16);
        self.output_buffer.push(right as i16);

        let high_water = self.sample_rate as usize * 2 * OVERFLOW_SECONDS;
        if self.output_buffer.len() > high_water {
            // The host stopped draining; shed the oldest half.
            self.output_buffer.drain(..high_water / 2);
            self.overflowed = true;
            log::warn!("Audio sink overflow, dropped {} samples", high_water / 2);
        }
    }

    /// Hand the queued interleaved stereo samples to the host.
    pub fn drain_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.output_buffer)
    }

    /// Latched overflow warning; reading clears it.
    pub fn take_overflow(&mut self) -> bool {
        std::mem::replace(&mut self.overflowed, false)
    }

    pub fn read_pcm12(&self) -> u8 {
        self.pcm12
    }

    pub fn read_pcm34(&self) -> u8 {
        self.pcm34
    }

    /// Register reads; the caller has already synchronised. `address` is the
    /// raw I/O address in FF10..=FF2F.
    pub fn read_register(&self, address: u16) -> u8 {
        let address = address & 0xFF;
        match address {
            0x10..=0x14 => self.voice1.read_register(address),
            // Channel 2 reuses channel 1's register layout one slot up.
            0x15 => 0xFF,
            0x16..=0x19 => self.voice2.read_register(address - 0x05),
            0x1A..=0x1E => self.voice3.read_register(address),
            0x1F..=0x23 => self.voice4.read_register(address),
            0x24 => {
                ((self.vin_l_enable as u8) << 7)
                    | (self.left_volume << 4)
                    | ((self.vin_r_enable as u8) << 3)
                    | self.right_volume
            }
            0x25 => {
                let mut output = 0;
                for index in 0..4 {
                    output |= (self.right_channel_enable[index] as u8) << index;
                    output |= (self.left_channel_enable[index] as u8) << (index + 4);
                }
                output
            }
            0x26 => {
                0x70 | ((self.power as u8) << 7)
                    | ((self.voice4.enabled() as u8) << 3)
                    | ((self.voice3.enabled() as u8) << 2)
                    | ((self.voice2.enabled() as u8) << 1)
                    | self.voice1.enabled() as u8
            }
            0x27..=0x2F => 0xFF,
            _ => unreachable!("Out of bounds APU register read: {:#X}", address),
        }
    }

    /// Register writes; the caller has already synchronised.
    pub fn write_register(&mut self, address: u16, value: u8, now: u64) {
        let address = address & 0xFF;

        // A powered-off APU only listens to NR52; DMG additionally lets
        // length loads through.
        if !self.power && address != 0x26 {
            let length_register = matches!(address, 0x11 | 0x16 | 0x1B | 0x20);
            if !(self.model.is_dmg() && length_register) {
                log::trace!("Dropped APU write to {:#04X} while powered off", address);
                return;
            }
        }

        match address {
            0x10..=0x14 => self.voice1.write_register(address, value, self.next_sequencer_step()),
            0x15 => {}
            0x16..=0x19 => {
                self.voice2
                    .write_register(address - 0x05, value, self.next_sequencer_step())
            }
            0x1A..=0x1E => self.voice3.write_register(address, value, self.next_sequencer_step()),
            0x1F..=0x23 => self.voice4.write_register(address, value, self.next_sequencer_step()),
            0x24 => {
                self.vin_l_enable = test_bit(value, 7);
                self.vin_r_enable = test_bit(value, 3);
                self.left_volume = (value >> 4) & 0x7;
                self.right_volume = value & 0x7;
            }
            0x25 => {
                for index in 0..4 {
                    self.right_channel_enable[index] = test_bit(value, index as u8);
                    self.left_channel_enable[index] = test_bit(value, index as u8 + 4);
                }
            }
            0x26 => {
                let was_on = self.power;
                self.power = test_bit(value, 7);
                if was_on && !self.power {
                    self.power_off();
                } else if !was_on && self.power {
                    // The sequencer restarts from step 0, a full period out.
                    self.frame_sequencer_step = 0;
                    self.last_frame_sequence_tick = now;
                    self.last_synchronise_time = now;
                }
            }
            0x27..=0x2F => {}
            _ => unreachable!("Out of bounds APU register write: {:#X}", address),
        }
    }

    pub fn read_wave_ram(&self, address: u16) -> u8 {
        self.voice3.read_wave_ram(address)
    }

    pub fn write_wave_ram(&mut self, address: u16, value: u8) {
        self.voice3.write_wave_ram(address, value);
    }

    /// NR52 power-off: every register is cleared and write-protected; wave
    /// RAM and (on DMG) the length counters survive.
    fn power_off(&mut self) {
        self.voice1.reset(self.model);
        self.voice2.reset(self.model);
        self.voice3.reset(self.model);
        self.voice4.reset(self.model);
        self.vin_l_enable = false;
        self.vin_r_enable = false;
        self.left_volume = 0;
        self.right_volume = 0;
        self.left_channel_enable = [false; 4];
        self.right_channel_enable = [false; 4];
        self.frame_sequencer_step = 0;
        self.pcm12 = 0;
        self.pcm34 = 0;
    }

    /// The step the sequencer will execute next; the length/trigger edge
    /// cases depend on its parity.
    fn next_sequencer_step(&self) -> u8 {
        self.frame_sequencer_step
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.voice1.save_state(writer);
        self.voice2.save_state(writer);
        self.voice3.save_state(writer);
        self.voice4.save_state(writer);
        writer.write_bool(self.vin_l_enable);
        writer.write_bool(self.vin_r_enable);
        writer.write_u8(self.left_volume);
        writer.write_u8(self.right_volume);
        for index in 0..4 {
            writer.write_bool(self.left_channel_enable[index]);
            writer.write_bool(self.right_channel_enable[index]);
        }
        writer.write_bool(self.power);
        writer.write_u8(self.frame_sequencer_step);
        writer.write_u64(self.last_synchronise_time);
        writer.write_u64(self.last_frame_sequence_tick);
        writer.write_u64(self.sample_progress);
        writer.write_u8(self.pcm12);
        writer.write_u8(self.pcm34);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.voice1.load_state(reader)?;
        self.voice2.load_state(reader)?;
        self.voice3.load_state(reader)?;
        self.voice4.load_state(reader)?;
        self.vin_l_enable = reader.read_bool()?;
        self.vin_r_enable = reader.read_bool()?;
        self.left_volume = reader.read_u8()? & 0x7;
        self.right_volume = reader.read_u8()? & 0x7;
        for index in 0..4 {
            self.left_channel_enable[index] = reader.read_bool()?;
            self.right_channel_enable[index] = reader.read_bool()?;
        }
        self.power = reader.read_bool()?;
        self.frame_sequencer_step = reader.read_u8()? & 0x7;
        self.last_synchronise_time = reader.read_u64()?;
        self.last_frame_sequence_tick = reader.read_u64()?;
        self.sample_progress = reader.read_u64()?;
        self.pcm12 = reader.read_u8()?;
        self.pcm34 = reader.read_u8()?;
        self.output_buffer.clear();
        Ok(())
    }
}

pub(crate) fn no_length_tick_next_step(next_frame_sequence_step: u8) -> bool {
    next_frame_sequence_step % 2 == 1
}

pub(crate) fn test_bit(value: u8, bit: u8) -> bool {
    value & (1 << bit) != 0
}
