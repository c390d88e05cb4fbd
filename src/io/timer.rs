use crate::error::EmulatorError;
use crate::scheduler::{EventType, Scheduler};
use crate::state::{StateReader, StateWriter};

/// This register is incremented at a rate of 16384Hz; the visible byte is
/// the high byte of the internal 16-bit counter. Writing any value resets
/// the whole counter to 0.
pub const DIVIDER_REGISTER: u16 = 0xFF04;
/// Incremented at the frequency selected in TAC. On overflow it is reloaded
/// from TMA one M-cycle later and a Timer interrupt is requested.
pub const TIMER_COUNTER: u16 = 0xFF05;
/// The value loaded into TIMA on overflow.
pub const TIMER_MODULO: u16 = 0xFF06;
/// Enable bit and input-clock select for TIMA.
pub const TIMER_CONTROL: u16 = 0xFF07;

#[derive(Debug, Copy, Clone, PartialEq)]
enum InputClock {
    C16 = 0x1,
    C64 = 0x2,
    C256 = 0x3,
    C1024 = 0x0,
}

impl InputClock {
    /// The internal-counter bit whose falling edge clocks TIMA.
    fn multiplexer_bit(self) -> u16 {
        match self {
            InputClock::C16 => 0x0008,
            InputClock::C64 => 0x0020,
            InputClock::C256 => 0x0080,
            InputClock::C1024 => 0x0200,
        }
    }
}

impl From<u8> for InputClock {
    fn from(value: u8) -> Self {
        match value & 0x3 {
            0x0 => InputClock::C1024,
            0x1 => InputClock::C16,
            0x2 => InputClock::C64,
            _ => InputClock::C256,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TimerControl {
    enabled: bool,
    input_select: InputClock,
}

impl TimerControl {
    pub fn to_bits(self) -> u8 {
        0xF8 | if self.enabled { 0x4 } else { 0 } | self.input_select as u8
    }
}

impl Default for TimerControl {
    fn default() -> Self {
        TimerControl {
            enabled: false,
            input_select: InputClock::C1024,
        }
    }
}

impl From<u8> for TimerControl {
    fn from(value: u8) -> Self {
        TimerControl {
            enabled: value & 0x4 != 0,
            input_select: InputClock::from(value),
        }
    }
}

/// DIV and TIMA share the internal 16-bit counter; every TIMA quirk in here
/// falls out of the falling-edge detector on the multiplexed counter bit.
#[derive(Debug, Default)]
pub struct Timers {
    pub system_clock: u16,
    timer_counter: u8,
    timer_modulo: u8,
    timer_control: TimerControl,
    /// Overflow happened; the reload fires one M-cycle later.
    reload_pending: bool,
    /// The reload M-cycle itself, during which TIMA writes are ignored and
    /// TMA writes propagate.
    just_reloaded: bool,
}

impl Timers {
    pub fn divider_register(&self) -> u8 {
        (self.system_clock >> 8) as u8
    }

    pub fn read_tima(&self) -> u8 {
        // Between overflow and reload TIMA sits at 0, which it already does.
        self.timer_counter
    }

    pub fn read_tma(&self) -> u8 {
        self.timer_modulo
    }

    pub fn read_control(&self) -> u8 {
        self.timer_control.to_bits()
    }

    /// Advance the internal counter by one M-cycle.
    pub fn tick(&mut self, scheduler: &mut Scheduler) {
        let old_clock = self.system_clock;
        self.system_clock = self.system_clock.wrapping_add(4);

        if self.timer_control.enabled && self.fell(old_clock, self.system_clock) {
            self.increment_tima(scheduler);
        }
    }

    /// TIMA ← TMA, one M-cycle after the overflow. Driven by the
    /// `TimerReload` scheduler event; the caller raises the Timer interrupt.
    pub fn reload(&mut self, scheduler: &mut Scheduler) {
        self.timer_counter = self.timer_modulo;
        self.reload_pending = false;
        self.just_reloaded = true;
        scheduler.push_relative(EventType::TimerPostReload, 4);
    }

    /// Closes the reload M-cycle (`TimerPostReload` event).
    pub fn finish_reload(&mut self) {
        self.just_reloaded = false;
    }

    /// Write to the `TIMA` register.
    ///
    /// A write in the cycle before the reload cancels the reload and the
    /// interrupt; a write during the reload cycle itself loses to TMA.
    pub fn set_timer_counter(&mut self, value: u8, scheduler: &mut Scheduler) {
        if self.just_reloaded {
            return;
        }
        if self.reload_pending {
            self.reload_pending = false;
            scheduler.remove_event_type(EventType::TimerReload);
        }
        self.timer_counter = value;
    }

    /// Write to the `TMA` register. During the reload cycle the new value is
    /// forwarded straight into TIMA.
    pub fn set_tma(&mut self, value: u8) {
        self.timer_modulo = value;
        if self.just_reloaded {
            self.timer_counter = value;
        }
    }

    /// Any write to DIV zeroes the counter. If the multiplexed bit was high,
    /// the falling-edge detector sees the reset and TIMA increments.
    pub fn set_divider(&mut self, scheduler: &mut Scheduler) {
        let old_clock = self.system_clock;
        self.system_clock = 0;

        if self.timer_control.enabled && self.fell(old_clock, 0) {
            self.increment_tima(scheduler);
        }
    }

    pub fn set_timer_control(&mut self, value: u8, scheduler: &mut Scheduler) {
        let old_control = self.timer_control;
        self.timer_control = TimerControl::from(value);

        let old_bit = self.system_clock & old_control.input_select.multiplexer_bit() != 0;
        let new_bit = self.system_clock & self.timer_control.input_select.multiplexer_bit() != 0;

        // The multiplexer output is gated by the enable bit, so disabling the
        // timer while the selected bit is high is also a falling edge, as is
        // switching to a clock whose bit is currently low.
        let old_output = old_control.enabled && old_bit;
        let new_output = self.timer_control.enabled && new_bit;
        if old_output && !new_output {
            self.increment_tima(scheduler);
        }
    }

    /// How many cycles may elapse before TIMA overflows, if it is counting.
    /// Used to bound HALT fast-forwarding so the overflow still lands on its
    /// exact cycle.
    pub fn cycles_until_overflow(&self) -> Option<u64> {
        if !self.timer_control.enabled {
            return None;
        }
        let period = self.timer_control.input_select.multiplexer_bit() as u64 * 2;
        let phase = self.system_clock as u64 % period;
        let first_edge = period - phase;
        let increments_needed = 0x100 - self.timer_counter as u64;
        Some(first_edge + (increments_needed - 1) * period)
    }

    /// Advance the counter by `cycles` in one go. The caller guarantees the
    /// span contains no TIMA overflow (see `cycles_until_overflow`).
    pub fn skip(&mut self, cycles: u64) {
        if self.timer_control.enabled {
            let period = self.timer_control.input_select.multiplexer_bit() as u64 * 2;
            let edges = (self.system_clock as u64 + cycles) / period - self.system_clock as u64 / period;
            self.timer_counter = (self.timer_counter as u64 + edges).min(0xFF) as u8;
        }
        self.system_clock = self.system_clock.wrapping_add(cycles as u16);
    }

    fn fell(&self, old_clock: u16, new_clock: u16) -> bool {
        let bit = self.timer_control.input_select.multiplexer_bit();
        (old_clock & bit) != 0 && (new_clock & bit) == 0
    }

    fn increment_tima(&mut self, scheduler: &mut Scheduler) {
        let (new_value, overflowed) = self.timer_counter.overflowing_add(1);
        self.timer_counter = new_value;

        if overflowed {
            self.reload_pending = true;
            scheduler.remove_event_type(EventType::TimerReload);
            scheduler.push_relative(EventType::TimerReload, 4);
        }
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u16(self.system_clock);
        writer.write_u8(self.timer_counter);
        writer.write_u8(self.timer_modulo);
        writer.write_u8(self.timer_control.to_bits());
        writer.write_bool(self.reload_pending);
        writer.write_bool(self.just_reloaded);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.system_clock = reader.read_u16()?;
        self.timer_counter = reader.read_u8()?;
        self.timer_modulo = reader.read_u8()?;
        self.timer_control = TimerControl::from(reader.read_u8()?);
        self.reload_pending = reader.read_bool()?;
        self.just_reloaded = reader.read_bool()?;
        Ok(())
    }
}
