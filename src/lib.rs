pub mod emulator;
pub mod error;
pub mod hardware;
pub mod io;
mod scheduler;
mod state;

pub use crate::emulator::{Emulator, FrameOutcome, GameBoyModel};
pub use crate::error::EmulatorError;
pub use crate::hardware::ppu::palette::{DisplayColour, Rgb};
pub use crate::io::joypad::InputKey;

/// Which hardware revision the emulator should present to the ROM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModelPreference {
    /// Pick based on the cartridge header's CGB flag.
    Auto,
    Dmg,
    Cgb,
}

/// Struct for wrapping all the various options for the `Emulator`.
#[derive(Debug, Clone)]
pub struct EmulatorOptions {
    pub boot_rom: Option<Vec<u8>>,
    pub saved_ram: Option<Vec<u8>>,
    /// A state previously produced by `Emulator::save_state` to resume from.
    pub save_state: Option<Vec<u8>>,
    pub model: ModelPreference,
    /// Samples per second the APU should produce for the host sink.
    pub audio_sample_rate: u32,
    /// The four shades the DMG palettes are mapped onto.
    pub display_colour: DisplayColour,
    /// When set, `LD B,B` additionally flags a breakpoint that ends `run_frame`.
    pub ld_b_b_breakpoint: bool,
    /// When set, a hardware-undefined opcode parks the CPU with a fault
    /// instead of executing as a no-op.
    pub fault_on_disallowed_opcode: bool,
}

#[derive(Debug)]
pub struct EmulatorOptionsBuilder {
    options: EmulatorOptions,
}

impl EmulatorOptionsBuilder {
    pub fn new() -> Self {
        EmulatorOptionsBuilder {
            options: EmulatorOptions::default(),
        }
    }

    pub fn boot_rom(mut self, boot_rom: Option<Vec<u8>>) -> Self {
        self.options.boot_rom = boot_rom;
        self
    }

    pub fn saved_ram(mut self, saved_ram: Option<Vec<u8>>) -> Self {
        self.options.saved_ram = saved_ram;
        self
    }

    pub fn save_state(mut self, save_state: Option<Vec<u8>>) -> Self {
        self.options.save_state = save_state;
        self
    }

    pub fn with_model(mut self, model: ModelPreference) -> Self {
        self.options.model = model;
        self
    }

    pub fn audio_sample_rate(mut self, rate: u32) -> Self {
        self.options.audio_sample_rate = rate;
        self
    }

    pub fn display_colour(mut self, colours: DisplayColour) -> Self {
        self.options.display_colour = colours;
        self
    }

    pub fn ld_b_b_breakpoint(mut self, enabled: bool) -> Self {
        self.options.ld_b_b_breakpoint = enabled;
        self
    }

    pub fn fault_on_disallowed_opcode(mut self, enabled: bool) -> Self {
        self.options.fault_on_disallowed_opcode = enabled;
        self
    }

    pub fn build(self) -> EmulatorOptions {
        self.options
    }
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        EmulatorOptions {
            boot_rom: None,
            saved_ram: None,
            save_state: None,
            model: ModelPreference::Auto,
            audio_sample_rate: 44_100,
            display_colour: DisplayColour::default(),
            ld_b_b_breakpoint: false,
            fault_on_disallowed_opcode: false,
        }
    }
}

impl From<EmulatorOptions> for EmulatorOptionsBuilder {
    fn from(from: EmulatorOptions) -> Self {
        EmulatorOptionsBuilder { options: from }
    }
}
