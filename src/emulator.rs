use crate::error::EmulatorError;
use crate::hardware::cartridge::header::{CartridgeHeader, CgbFlag};
use crate::hardware::cpu::{CpuFault, CPU};
use crate::hardware::mmu::{Memory, MemoryBus};
use crate::hardware::ppu::FRAMEBUFFER_SIZE;
use crate::io::joypad::InputKey;
use crate::state::{StateReader, StateWriter};
use crate::{EmulatorOptions, ModelPreference};

/// T-states per second at normal speed.
pub const DMG_CLOCK_SPEED: u64 = 4_194_304;
/// 154 lines of 456 dots; one full frame at ~59.73 Hz.
pub const CYCLES_PER_FRAME: u64 = 70_224;

const SAVE_STATE_MAGIC: &[u8; 4] = b"FBOY";
const SAVE_STATE_VERSION: u16 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameBoyModel {
    Dmg,
    Cgb,
}

impl GameBoyModel {
    #[inline]
    pub fn is_dmg(self) -> bool {
        self == GameBoyModel::Dmg
    }

    #[inline]
    pub fn is_cgb(self) -> bool {
        self == GameBoyModel::Cgb
    }
}

/// Why `run_frame` returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A full frame is ready in the framebuffer.
    FrameComplete,
    /// `LD B,B` hit with the breakpoint option enabled.
    Breakpoint,
    /// A hardware-undefined opcode parked the CPU (opt-in).
    Fault(CpuFault),
}

pub struct Emulator {
    cpu: CPU<Memory>,
    frame_bytes: Vec<u8>,
}

impl Emulator {
    /// Construct an emulator around a ROM image. Fails on malformed ROMs and
    /// on CGB-only carts forced into DMG mode.
    pub fn new(rom: &[u8], mut options: EmulatorOptions) -> Result<Self, EmulatorError> {
        let header = CartridgeHeader::parse(rom)?;
        let model = resolve_model(&header, options.model)?;
        let resume_state = options.save_state.take();

        let memory = Memory::new(rom, model, &options)?;
        let mut cpu = CPU::new(
            memory,
            options.ld_b_b_breakpoint,
            options.fault_on_disallowed_opcode,
        );
        // The DMG boot ROM leaves H and C clear when the header checksum is
        // zero; the skip-boot register image should agree.
        if cpu.mmu.boot_rom_finished() && model.is_dmg() && header.header_checksum == 0 {
            cpu.registers.set_af(0x0180);
        }

        let mut emulator = Emulator {
            cpu,
            frame_bytes: vec![0; FRAMEBUFFER_SIZE * 3],
        };
        if let Some(state) = resume_state {
            emulator.load_state(&state)?;
        }
        Ok(emulator)
    }

    /// Run until the next VBlank completes a frame, a breakpoint fires, or
    /// the CPU faults. Always executes a whole number of instructions.
    ///
    /// With the LCD switched off there are no VBlanks; a frame's worth of
    /// cycles of blank screen counts as a frame so hosts keep their cadence.
    pub fn run_frame(&mut self) -> FrameOutcome {
        self.cpu.breakpoint_hit = false;
        let frame_start = self.cpu.mmu.scheduler.current_time;
        loop {
            self.cpu.step_cycle();

            if let Some(fault) = self.cpu.fault {
                return FrameOutcome::Fault(fault);
            }
            if self.cpu.breakpoint_hit {
                return FrameOutcome::Breakpoint;
            }
            if self.cpu.mmu.take_frame_completed() {
                self.copy_frame();
                return FrameOutcome::FrameComplete;
            }
            if !self.cpu.mmu.ppu.lcd_enabled()
                && self.cpu.mmu.scheduler.current_time - frame_start >= CYCLES_PER_FRAME
            {
                self.copy_frame();
                return FrameOutcome::FrameComplete;
            }
        }
    }

    /// The last completed frame, 160x144 RGB888 row-major.
    pub fn framebuffer(&self) -> &[u8] {
        &self.frame_bytes
    }

    /// Consume the queued interleaved stereo samples.
    pub fn audio_drain(&mut self) -> Vec<i16> {
        self.cpu.mmu.apu.drain_samples()
    }

    /// Whether the audio queue overflowed (and dropped samples) since the
    /// last call. A warning, never fatal.
    pub fn audio_overflowed(&mut self) -> bool {
        self.cpu.mmu.apu.take_overflow()
    }

    pub fn press(&mut self, button: InputKey) {
        self.cpu.mmu.press_key(button);
    }

    pub fn release(&mut self, button: InputKey) {
        self.cpu.mmu.release_key(button);
    }

    /// Every byte the ROM has pushed out the serial port; how Blargg's test
    /// ROMs report results.
    pub fn serial_output(&self) -> &[u8] {
        self.cpu.mmu.serial.output_log()
    }

    /// The external RAM contents if the cartridge is battery-backed.
    pub fn cartridge_battery(&self) -> Option<&[u8]> {
        self.cpu.mmu.cartridge.battery_ram()
    }

    /// Serialise the complete machine state. Only meaningful between frames.
    pub fn save_state(&self) -> Vec<u8> {
        let mut writer = StateWriter::new();
        writer.write_bytes(SAVE_STATE_MAGIC);
        writer.write_u16(SAVE_STATE_VERSION);
        writer.write_u16(self.cpu.mmu.cartridge.cartridge_header().global_checksum);
        writer.write_u8(self.cpu.mmu.model().is_cgb() as u8);
        self.cpu.save_state(&mut writer);
        self.cpu.mmu.save_state(&mut writer);
        writer.into_bytes()
    }

    /// Restore a state produced by [`save_state`] on the same core version
    /// and ROM.
    ///
    /// [`save_state`]: Emulator::save_state
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), EmulatorError> {
        let mut reader = StateReader::new(bytes);

        let mut magic = [0u8; 4];
        reader.read_bytes(&mut magic)?;
        if &magic != SAVE_STATE_MAGIC {
            return Err(EmulatorError::SaveStateMismatch("bad magic".into()));
        }
        let version = reader.read_u16()?;
        if version != SAVE_STATE_VERSION {
            return Err(EmulatorError::SaveStateMismatch(format!(
                "state version {} but this core writes {}",
                version, SAVE_STATE_VERSION
            )));
        }
        let checksum = reader.read_u16()?;
        if checksum != self.cpu.mmu.cartridge.cartridge_header().global_checksum {
            return Err(EmulatorError::SaveStateMismatch(
                "state belongs to a different ROM".into(),
            ));
        }
        let cgb = reader.read_u8()? != 0;
        if cgb != self.cpu.mmu.model().is_cgb() {
            return Err(EmulatorError::SaveStateMismatch(
                "state was taken on a different hardware model".into(),
            ));
        }

        self.cpu.load_state(&mut reader)?;
        self.cpu.mmu.load_state(&mut reader)?;
        Ok(())
    }

    fn copy_frame(&mut self) {
        for (index, pixel) in self.cpu.mmu.ppu.frame_buffer().iter().enumerate() {
            self.frame_bytes[index * 3] = pixel.0;
            self.frame_bytes[index * 3 + 1] = pixel.1;
            self.frame_bytes[index * 3 + 2] = pixel.2;
        }
    }

    /// Test and debugger access to the machine underneath.
    #[doc(hidden)]
    pub fn hardware(&mut self) -> &mut CPU<Memory> {
        &mut self.cpu
    }
}

fn resolve_model(
    header: &CartridgeHeader,
    preference: ModelPreference,
) -> Result<GameBoyModel, EmulatorError> {
    match preference {
        ModelPreference::Auto => Ok(if header.cgb_flag == CgbFlag::None {
            GameBoyModel::Dmg
        } else {
            GameBoyModel::Cgb
        }),
        ModelPreference::Dmg => {
            if header.cgb_flag == CgbFlag::Only {
                Err(EmulatorError::IncompatibleModel {
                    cartridge_type: header.cartridge_type,
                })
            } else {
                Ok(GameBoyModel::Dmg)
            }
        }
        ModelPreference::Cgb => Ok(GameBoyModel::Cgb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cartridge::header::compute_header_checksum;
    use crate::hardware::ppu::{RESOLUTION_HEIGHT, RESOLUTION_WIDTH};
    use crate::EmulatorOptionsBuilder;
    use pretty_assertions::assert_eq;

    pub fn test_rom(code: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x100..0x100 + code.len()].copy_from_slice(code);
        rom[0x14D] = compute_header_checksum(&rom);
        rom
    }

    fn emulator_with(code: &[u8]) -> Emulator {
        Emulator::new(&test_rom(code), EmulatorOptions::default()).unwrap()
    }

    #[test]
    fn frames_arrive_on_the_vblank_cadence() {
        // JR -2: spin in place.
        let mut emulator = emulator_with(&[0x18, 0xFE]);

        assert_eq!(emulator.run_frame(), FrameOutcome::FrameComplete);
        let first_frame_time = emulator.cpu.mmu.scheduler.current_time;
        assert_eq!(emulator.run_frame(), FrameOutcome::FrameComplete);
        let second_frame_time = emulator.cpu.mmu.scheduler.current_time;

        let frame_delta = second_frame_time - first_frame_time;
        // One frame of 154 lines, give or take the instruction finishing up.
        assert!(
            (CYCLES_PER_FRAME - 16..=CYCLES_PER_FRAME + 16).contains(&frame_delta),
            "frame took {} cycles",
            frame_delta
        );
        assert_eq!(emulator.framebuffer().len(), RESOLUTION_WIDTH * RESOLUTION_HEIGHT * 3);
    }

    #[test]
    fn halt_bug_runs_the_next_opcode_twice() {
        // DI; HALT; INC A; then spin.
        let mut emulator = emulator_with(&[0xF3, 0x76, 0x3C, 0x18, 0xFE]);
        let cpu = emulator.hardware();
        cpu.mmu.interrupts_mut().overwrite_enable(0x01);
        cpu.mmu.interrupts_mut().overwrite_flag(0x01);
        cpu.registers.a = 0x00;

        cpu.step_cycle(); // DI
        cpu.step_cycle(); // HALT falls through, arming the bug
        assert_eq!(cpu.registers.pc, 0x102);
        cpu.step_cycle(); // INC A, PC stuck
        assert_eq!(cpu.registers.a, 0x01);
        assert_eq!(cpu.registers.pc, 0x102);
        cpu.step_cycle(); // INC A again
        assert_eq!(cpu.registers.a, 0x02);
        assert_eq!(cpu.registers.pc, 0x103);
    }

    #[test]
    fn oam_dma_copies_and_returns_conflict_bytes() {
        let mut emulator = emulator_with(&[0x18, 0xFE]);
        let cpu = emulator.hardware();

        // LCD off so the OAM checks below only see the DMA lock.
        cpu.mmu.write_byte(0xFF40, 0x11);
        cpu.mmu.write_byte(0xC000, 0x11);
        cpu.mmu.write_byte(0xC001, 0x22);
        cpu.mmu.write_byte(0xFF46, 0xC0);

        // One M-cycle of setup delay, then the transfer begins.
        cpu.mmu.tick_m_cycle();
        assert_eq!(cpu.mmu.read_byte(0xFE00), 0xFF, "OAM locked during transfer");
        // Mid-transfer, a WRAM read sees the byte on the DMA bus.
        assert_eq!(cpu.mmu.read_byte(0xC123), 0x11);
        cpu.mmu.tick_m_cycle();
        assert_eq!(cpu.mmu.read_byte(0xC123), 0x22);

        for _ in 0..160 {
            cpu.mmu.tick_m_cycle();
        }
        assert_eq!(cpu.mmu.read_byte(0xFE00), 0x11);
        assert_eq!(cpu.mmu.read_byte(0xFE01), 0x22);
    }

    #[test]
    fn double_speed_switch_through_stop() {
        let mut rom = test_rom(&[0x10, 0x00, 0x18, 0xFE]);
        rom[0x143] = 0x80; // CGB cart
        rom[0x14D] = compute_header_checksum(&rom);
        let options = EmulatorOptionsBuilder::new().with_model(crate::ModelPreference::Cgb).build();
        let mut emulator = Emulator::new(&rom, options).unwrap();
        let cpu = emulator.hardware();

        cpu.mmu.write_byte(0xFF4D, 0x01);
        assert_eq!(cpu.mmu.read_byte(0xFF4D), 0x7F);

        cpu.step_cycle(); // STOP performs the switch
        assert_eq!(cpu.mmu.read_byte(0xFF4D), 0xFE);
        assert!(cpu.mmu.speed.double_speed);
    }

    #[test]
    fn incompatible_model_is_rejected() {
        let mut rom = test_rom(&[0x00]);
        rom[0x143] = 0xC0;
        rom[0x14D] = compute_header_checksum(&rom);

        let options = EmulatorOptionsBuilder::new().with_model(crate::ModelPreference::Dmg).build();
        assert!(matches!(
            Emulator::new(&rom, options),
            Err(EmulatorError::IncompatibleModel { .. })
        ));
    }

    #[test]
    fn save_state_roundtrips_bit_for_bit() {
        let mut emulator = emulator_with(&[0x18, 0xFE]);
        emulator.run_frame();
        let first = emulator.save_state();

        let mut other = emulator_with(&[0x18, 0xFE]);
        other.load_state(&first).unwrap();
        let second = other.save_state();

        assert_eq!(first, second);
    }

    #[test]
    fn save_state_rejects_foreign_blobs() {
        let mut emulator = emulator_with(&[0x18, 0xFE]);
        assert!(matches!(
            emulator.load_state(b"not a state"),
            Err(EmulatorError::SaveStateMismatch(_))
        ));

        // A tampered version number must fail cleanly as well.
        let mut state = emulator.save_state();
        state[4] = 0xFF;
        assert!(matches!(
            emulator.load_state(&state),
            Err(EmulatorError::SaveStateMismatch(_))
        ));
    }

    #[test]
    fn breakpoint_opcode_stops_the_frame_loop() {
        let rom = test_rom(&[0x40, 0x18, 0xFE]);
        let options = EmulatorOptionsBuilder::new().ld_b_b_breakpoint(true).build();
        let mut emulator = Emulator::new(&rom, options).unwrap();

        assert_eq!(emulator.run_frame(), FrameOutcome::Breakpoint);
    }

    #[test]
    fn disallowed_opcode_faults_when_opted_in() {
        let rom = test_rom(&[0xD3]);
        let options = EmulatorOptionsBuilder::new().fault_on_disallowed_opcode(true).build();
        let mut emulator = Emulator::new(&rom, options).unwrap();

        match emulator.run_frame() {
            FrameOutcome::Fault(fault) => {
                assert_eq!(fault.opcode, 0xD3);
                assert_eq!(fault.pc, 0x100);
            }
            other => panic!("expected a fault, got {:?}", other),
        }

        // By default the same ROM just keeps running.
        let mut lenient = emulator_with(&[0xD3, 0x18, 0xFE]);
        assert_eq!(lenient.run_frame(), FrameOutcome::FrameComplete);
    }

    #[test]
    fn serial_writes_are_captured() {
        // LD A,'P'; LD (FF01),A ; LD A,0x81; LD (FF02),A; spin.
        let code = [0x3E, b'P', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, 0x18, 0xFE];
        let mut emulator = emulator_with(&code);
        emulator.run_frame();

        assert_eq!(emulator.serial_output(), b"P");
    }

    #[test]
    fn ly_lyc_interrupt_dispatches_to_0x48() {
        // Spin; the handler at 0x48 will never be reached unless the STAT
        // interrupt fires on line 0x90.
        let mut emulator = emulator_with(&[0x18, 0xFE]);
        let cpu = emulator.hardware();

        cpu.mmu.write_byte(0xFF45, 0x90);
        cpu.mmu.write_byte(0xFF41, 0x40);
        // The DMG STAT-write quirk can leave a stale request; start clean.
        cpu.mmu.interrupts_mut().overwrite_flag(0x00);
        cpu.mmu.interrupts_mut().overwrite_enable(0x02);
        cpu.ime = true;

        loop {
            cpu.step_cycle();
            if cpu.registers.pc < 0x100 {
                break;
            }
            assert!(cpu.mmu.scheduler.current_time < CYCLES_PER_FRAME * 2, "STAT never fired");
        }
        assert_eq!(cpu.registers.pc, 0x48);
        // The PPU was on line 144 when the coincidence hit.
        assert_eq!(cpu.mmu.read_byte(0xFF44), 0x90);
    }
}
