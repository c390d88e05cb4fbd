use std::fmt;

/// Every failure the core can surface to the host.
///
/// Peripherals themselves never error; anything that goes wrong during
/// emulation proper is either defined behaviour (wrapping arithmetic,
/// ignored writes) or an opt-in CPU fault reported through [`FrameOutcome`].
///
/// [`FrameOutcome`]: crate::emulator::FrameOutcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    /// The ROM image is malformed: too small, bad header checksum, or an
    /// unsupported cartridge type.
    InvalidRom(String),
    /// A CGB-only cartridge was forced into DMG mode.
    IncompatibleModel { cartridge_type: u8 },
    /// A save state was produced by a different core version or for a
    /// different ROM.
    SaveStateMismatch(String),
    /// A save state ended prematurely or contained out-of-range values.
    StateCorrupt(String),
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::InvalidRom(reason) => write!(f, "invalid ROM: {}", reason),
            EmulatorError::IncompatibleModel { cartridge_type } => write!(
                f,
                "cartridge (type {:#04X}) is CGB-only and cannot run in DMG mode",
                cartridge_type
            ),
            EmulatorError::SaveStateMismatch(reason) => write!(f, "save state mismatch: {}", reason),
            EmulatorError::StateCorrupt(reason) => write!(f, "save state corrupt: {}", reason),
        }
    }
}

impl std::error::Error for EmulatorError {}
