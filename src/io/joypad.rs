//! Joypad matrix. Games write the two select bits of P1 and read back the
//! four input lines of whichever half they selected; everything is active
//! low on the wire, so internally we keep "pressed" sets and invert on read.

use bitflags::*;

use crate::error::EmulatorError;
use crate::state::{StateReader, StateWriter};

pub const JOYPAD_REGISTER: u16 = 0xFF00;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum InputKey {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
}

bitflags! {
    #[derive(Default)]
    struct JoypadLines: u8 {
        /// Right or A
        const RIGHT_A    = 0b0000_0001;
        /// Left or B
        const LEFT_B     = 0b0000_0010;
        /// Up or Select
        const UP_SELECT  = 0b0000_0100;
        /// Down or Start
        const DOWN_START = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoyPad {
    pressed_buttons: JoypadLines,
    pressed_directions: JoypadLines,
    select_buttons: bool,
    select_directions: bool,
}

impl JoyPad {
    pub fn new() -> Self {
        JoyPad::default()
    }

    /// The P1 view: select bits as written, input lines low when pressed.
    pub fn read_register(&self) -> u8 {
        let mut result = 0xC0
            | if self.select_buttons { 0 } else { 0x20 }
            | if self.select_directions { 0 } else { 0x10 };
        result |= !self.selected_lines().bits() & 0x0F;
        result
    }

    /// Games can only influence the two select bits; the low nibble is
    /// discarded.
    pub fn write_register(&mut self, value: u8) {
        self.select_buttons = value & 0x20 == 0;
        self.select_directions = value & 0x10 == 0;
    }

    /// Register a key as pressed down.
    ///
    /// Returns `true` when this pulls a currently-selected line low, which
    /// is the condition for the Joypad interrupt.
    pub fn press_key(&mut self, input: InputKey) -> bool {
        let before = self.selected_lines();
        let line = input.line();
        if input.is_direction() {
            self.pressed_directions.insert(line);
        } else {
            self.pressed_buttons.insert(line);
        }
        let after = self.selected_lines();
        !(after - before).is_empty()
    }

    /// Release a key that was pressed down before.
    pub fn release_key(&mut self, input: InputKey) {
        let line = input.line();
        if input.is_direction() {
            self.pressed_directions.remove(line);
        } else {
            self.pressed_buttons.remove(line);
        }
    }

    fn selected_lines(&self) -> JoypadLines {
        let mut lines = JoypadLines::empty();
        if self.select_buttons {
            lines.insert(self.pressed_buttons);
        }
        if self.select_directions {
            lines.insert(self.pressed_directions);
        }
        lines
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.pressed_buttons.bits());
        writer.write_u8(self.pressed_directions.bits());
        writer.write_bool(self.select_buttons);
        writer.write_bool(self.select_directions);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.pressed_buttons = JoypadLines::from_bits_truncate(reader.read_u8()?);
        self.pressed_directions = JoypadLines::from_bits_truncate(reader.read_u8()?);
        self.select_buttons = reader.read_bool()?;
        self.select_directions = reader.read_bool()?;
        Ok(())
    }
}

impl InputKey {
    fn line(self) -> JoypadLines {
        match self {
            InputKey::A | InputKey::Right => JoypadLines::RIGHT_A,
            InputKey::B | InputKey::Left => JoypadLines::LEFT_B,
            InputKey::Select | InputKey::Up => JoypadLines::UP_SELECT,
            InputKey::Start | InputKey::Down => JoypadLines::DOWN_START,
        }
    }

    fn is_direction(self) -> bool {
        matches!(self, InputKey::Right | InputKey::Left | InputKey::Up | InputKey::Down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unselected_register_reads_high() {
        let joypad = JoyPad::new();
        assert_eq!(joypad.read_register(), 0xFF);
    }

    #[test]
    fn selected_keys_read_low() {
        let mut joypad = JoyPad::new();
        joypad.write_register(0x20); // select directions
        joypad.press_key(InputKey::Left);
        joypad.press_key(InputKey::B); // buttons not selected, invisible

        assert_eq!(joypad.read_register(), 0xED);

        joypad.release_key(InputKey::Left);
        assert_eq!(joypad.read_register(), 0xEF);
    }

    #[test]
    fn press_reports_interrupt_edge_only_when_selected() {
        let mut joypad = JoyPad::new();
        joypad.write_register(0x10); // select buttons
        assert!(joypad.press_key(InputKey::Start));
        assert!(!joypad.press_key(InputKey::Down)); // direction half not selected
    }

    #[test]
    fn low_nibble_writes_are_discarded() {
        let mut joypad = JoyPad::new();
        joypad.write_register(0x0F);
        assert_eq!(joypad.read_register() & 0x0F, 0x0F);
    }
}
