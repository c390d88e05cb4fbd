//! Mode 3 length estimation. The pipeline itself decides which pixel every
//! write lands on; this estimate only places the HBlank event, and with it
//! the mode 0/2 boundaries games poll through STAT.

use crate::hardware::ppu::register_flags::LcdControl;
use crate::hardware::ppu::{Ppu, BASE_LCD_TRANSFER_DURATION};

impl Ppu {
    /// Expected duration of this line's pixel transfer, in dots.
    ///
    /// The base 172 dots are stretched by the fine scroll discard, a fetcher
    /// reset when the window activates, and a per-sprite fetch stall of
    /// `11 - min(5, (x + SCX) mod 8)` dots.
    pub(super) fn lcd_transfer_duration(&self) -> u64 {
        let mut dots = BASE_LCD_TRANSFER_DURATION;

        dots += (self.scroll_x % 8) as u64;

        let window_active = self.wy_triggered
            && self.window_x < 167
            && self.lcd_control.contains(LcdControl::WINDOW_DISPLAY);
        if window_active {
            dots += 6;
        }

        dots += self
            .sprite_buffer
            .iter()
            .map(|sprite| {
                let shift = if window_active && self.window_x <= sprite.x {
                    255 - self.window_x
                } else {
                    self.scroll_x
                };
                (11 - (sprite.x.wrapping_add(shift) % 8).min(5)) as u64
            })
            .sum::<u64>();

        dots.min(289)
    }
}
