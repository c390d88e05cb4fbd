use bitflags::*;

use crate::hardware::ppu::tiledata::{TILE_BLOCK_0_START, TILE_BLOCK_1_START};
use crate::hardware::ppu::Mode;

bitflags! {
    /// FF40. Each bit controls a lot of behaviour and can be modified at any
    /// time during the frame; unlike VRAM, the PPU never locks it.
    #[derive(Default)]
    pub struct LcdControl: u8 {
        /// On DMG: BG/Window display at all. On CGB: master priority; when
        /// cleared, sprites always win over background and window.
        const BG_WINDOW_PRIORITY = 0b0000_0001;
        /// Whether sprites are displayed; freely toggled mid-frame.
        const SPRITE_DISPLAY_ENABLE = 0b0000_0010;
        /// Sprite size: one tile, or two stacked vertically (8x16).
        const SPRITE_SIZE = 0b0000_0100;
        /// BG tilemap: 0=$9800, 1=$9C00.
        const BG_TILE_MAP_SELECT = 0b0000_1000;
        /// Tile addressing for BG and Window: 0=8800 method, 1=8000 method.
        /// Sprites always use the 8000 method.
        const BG_WINDOW_TILE_SELECT = 0b0001_0000;
        /// Whether the window is displayed.
        const WINDOW_DISPLAY = 0b0010_0000;
        /// Window tilemap: 0=$9800, 1=$9C00.
        const WINDOW_MAP_SELECT = 0b0100_0000;
        /// LCD power. Writing 0 blanks the screen and freezes the PPU.
        const LCD_DISPLAY = 0b1000_0000;
    }
}

bitflags! {
    /// FF41. The lower three bits are read-only reflections of PPU state;
    /// bits 3-6 arm the four STAT interrupt sources; bit 7 is wired high.
    #[derive(Default)]
    pub struct LcdStatus: u8 {
        /// Mode flag bit 0 (read only).
        const MODE_FLAG_0 = 0b0000_0001;
        /// Mode flag bit 1 (read only).
        const MODE_FLAG_1 = 0b0000_0010;
        /// 0: LYC != LY, 1: LYC == LY (read only).
        const COINCIDENCE_FLAG = 0b0000_0100;
        /// Mode 0 H-Blank interrupt enable.
        const MODE_0_H_INTERRUPT = 0b0000_1000;
        /// Mode 1 V-Blank interrupt enable.
        const MODE_1_V_INTERRUPT = 0b0001_0000;
        /// Mode 2 OAM interrupt enable.
        const MODE_2_OAM_INTERRUPT = 0b0010_0000;
        /// LYC=LY coincidence interrupt enable.
        const COINCIDENCE_INTERRUPT = 0b0100_0000;

        const UNUSED = 0b1000_0000;
    }
}

impl LcdControl {
    /// The base address the BG/Window tile index is relative to.
    pub fn bg_window_tile_address(&self) -> u16 {
        if self.contains(LcdControl::BG_WINDOW_TILE_SELECT) {
            TILE_BLOCK_0_START
        } else {
            TILE_BLOCK_1_START
        }
    }

    pub fn sprite_height(&self) -> u8 {
        if self.contains(LcdControl::SPRITE_SIZE) {
            16
        } else {
            8
        }
    }
}

impl LcdStatus {
    pub fn mode_flag(&self) -> Mode {
        match self.bits() & 0x3 {
            0 => Mode::Hblank,
            1 => Mode::Vblank,
            2 => Mode::OamSearch,
            _ => Mode::LcdTransfer,
        }
    }

    pub fn set_mode_flag(&mut self, value: Mode) {
        let bits = (self.bits() & 0xFC)
            | match value {
                Mode::Hblank => 0,
                Mode::Vblank => 1,
                Mode::OamSearch => 2,
                Mode::LcdTransfer => 3,
            };
        *self = LcdStatus::from_bits_truncate(bits);
    }
}
