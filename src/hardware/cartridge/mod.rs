use crate::error::EmulatorError;
use crate::hardware::cartridge::header::CartridgeHeader;
use crate::hardware::cartridge::mbc::{Mbc, Mbc0, Mbc1, Mbc2, Mbc5};
use crate::hardware::cartridge::mbc3::Mbc3;
use crate::state::{StateReader, StateWriter};

pub mod header;
pub mod mbc;
pub mod mbc3;

/// A parsed ROM image behind its memory bank controller.
pub struct Cartridge {
    header: CartridgeHeader,
    mbc: Box<dyn Mbc>,
}

impl Cartridge {
    pub fn new(rom: &[u8], saved_ram: Option<Vec<u8>>) -> Result<Self, EmulatorError> {
        let header = CartridgeHeader::parse(rom)?;
        let mbc = select_mbc(&header, rom.to_vec())?;

        let mut result = Cartridge { header, mbc };
        if let Some(ram) = saved_ram {
            result.mbc.load_battery_ram(&ram);
        }

        log::info!(
            "Loaded \"{}\" (type {:#04X}, {} ROM banks, {} bytes of external RAM)",
            result.header.title,
            result.header.cartridge_type,
            result.header.rom_size.banks(),
            result.header.ram_size.bytes(),
        );
        Ok(result)
    }

    pub fn cartridge_header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn read_0000_3fff(&self, address: u16) -> u8 {
        self.mbc.read_rom0(address)
    }

    pub fn read_4000_7fff(&self, address: u16) -> u8 {
        self.mbc.read_romx(address)
    }

    pub fn read_external_ram(&self, address: u16) -> u8 {
        self.mbc.read_ram(address)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        self.mbc.write(address, value);
    }

    /// The external RAM contents if this cartridge has a battery; what hosts
    /// persist as the `.sav`.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.mbc.battery_ram()
    }

    pub fn tick_rtc(&mut self, cycles: u64) {
        self.mbc.tick_rtc(cycles);
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.mbc.save_state(writer);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.mbc.load_state(reader)
    }
}

fn select_mbc(header: &CartridgeHeader, rom: Vec<u8>) -> Result<Box<dyn Mbc>, EmulatorError> {
    let ram_size = header.ram_size.bytes();
    let mbc: Box<dyn Mbc> = match header.cartridge_type {
        0x00 => Box::new(Mbc0::new(rom, ram_size, false)),
        0x08 => Box::new(Mbc0::new(rom, ram_size, false)),
        0x09 => Box::new(Mbc0::new(rom, ram_size, true)),
        0x01 | 0x02 => Box::new(Mbc1::new(rom, ram_size, false)),
        0x03 => Box::new(Mbc1::new(rom, ram_size, true)),
        0x05 => Box::new(Mbc2::new(rom, false)),
        0x06 => Box::new(Mbc2::new(rom, true)),
        0x0F => Box::new(Mbc3::new(rom, ram_size, true, true)),
        0x10 => Box::new(Mbc3::new(rom, ram_size, true, true)),
        0x11 | 0x12 => Box::new(Mbc3::new(rom, ram_size, false, false)),
        0x13 => Box::new(Mbc3::new(rom, ram_size, true, false)),
        0x19 | 0x1A => Box::new(Mbc5::new(rom, ram_size, false, false)),
        0x1B => Box::new(Mbc5::new(rom, ram_size, true, false)),
        0x1C | 0x1D => Box::new(Mbc5::new(rom, ram_size, false, true)),
        0x1E => Box::new(Mbc5::new(rom, ram_size, true, true)),
        other => {
            return Err(EmulatorError::InvalidRom(format!(
                "unsupported cartridge type {:#04X}",
                other
            )))
        }
    };
    Ok(mbc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cartridge::header::compute_header_checksum;

    fn rom_of_type(cartridge_type: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = cartridge_type;
        rom[0x149] = 0x02; // 8 KB RAM
        rom[0x14D] = compute_header_checksum(&rom);
        rom
    }

    #[test]
    fn battery_carts_expose_their_ram() {
        let cartridge = Cartridge::new(&rom_of_type(0x03), None).unwrap();
        assert!(cartridge.battery_ram().is_some());

        let plain = Cartridge::new(&rom_of_type(0x01), None).unwrap();
        assert!(plain.battery_ram().is_none());
    }

    #[test]
    fn saved_ram_is_restored() {
        let save = vec![0x5A; 0x2000];
        let mut cartridge = Cartridge::new(&rom_of_type(0x03), Some(save)).unwrap();
        cartridge.write_byte(0x0000, 0x0A);
        assert_eq!(cartridge.read_external_ram(0xA123), 0x5A);
    }

    #[test]
    fn unsupported_mapper_is_an_invalid_rom() {
        assert!(matches!(
            Cartridge::new(&rom_of_type(0xFC), None),
            Err(EmulatorError::InvalidRom(_))
        ));
    }
}
