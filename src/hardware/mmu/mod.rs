//! The memory bus. Owns the scheduler, every peripheral, and the three DMA
//! engines; dispatches all 16-bit addresses and drives the event loop that
//! each M-cycle pumps.

use log::*;

use crate::emulator::{GameBoyModel, CYCLES_PER_FRAME, DMG_CLOCK_SPEED};
use crate::error::EmulatorError;
use crate::hardware::apu::{Apu, FRAME_SEQUENCE_CYCLES, APU_MEM_END, APU_MEM_START, WAVE_SAMPLE_END, WAVE_SAMPLE_START};
use crate::hardware::cartridge::Cartridge;
use crate::hardware::mmu::cgb_mem::{HdmaMode, HdmaState, SpeedState, UndocumentedRegisters};
use crate::hardware::mmu::dma::{OamDmaUnit, OAM_DMA_CYCLES, OAM_DMA_SETUP_CYCLES};
use crate::hardware::mmu::hram::Hram;
use crate::hardware::mmu::wram::Wram;
use crate::hardware::ppu::memory_binds::*;
use crate::hardware::ppu::{OamCorruptionKind, Ppu};
use crate::io::bootrom::BootRom;
use crate::io::interrupts::{InterruptFlags, Interrupts};
use crate::io::joypad::{InputKey, JoyPad, JOYPAD_REGISTER};
use crate::io::serial::{Serial, SIO_CONT, SIO_DATA};
use crate::io::timer::{Timers, DIVIDER_REGISTER, TIMER_CONTROL, TIMER_COUNTER, TIMER_MODULO};
use crate::scheduler::{EventType, Scheduler};
use crate::state::{StateReader, StateWriter};
use crate::EmulatorOptions;

pub mod cgb_mem;
pub mod dma;
pub mod hram;
pub mod wram;

/// 16 KB ROM bank 00. From cartridge, fixed.
pub const ROM_BANK_00_START: u16 = 0x0000;
pub const ROM_BANK_00_END: u16 = 0x3FFF;
/// 16 KB ROM bank 01..NN. From cartridge, switchable.
pub const ROM_BANK_NN_START: u16 = 0x4000;
pub const ROM_BANK_NN_END: u16 = 0x7FFF;
/// 8 KB of VRAM; two banks on CGB.
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
/// 8 KB of external RAM, bank-switched by the MBC.
pub const EXTERNAL_RAM_START: u16 = 0xA000;
pub const EXTERNAL_RAM_END: u16 = 0xBFFF;
pub const WRAM_BANK_00_START: u16 = 0xC000;
pub const WRAM_BANK_00_END: u16 = 0xCFFF;
/// Switchable on CGB (1-7), fixed bank 1 on DMG.
pub const WRAM_BANK_NN_START: u16 = 0xD000;
pub const WRAM_BANK_NN_END: u16 = 0xDFFF;
/// Mirror of 0xC000-0xDDFF.
pub const ECHO_RAM_START: u16 = 0xE000;
pub const ECHO_RAM_END: u16 = 0xFDFF;
/// Sprite attribute table.
pub const OAM_ATTRIBUTE_START: u16 = 0xFE00;
pub const OAM_ATTRIBUTE_END: u16 = 0xFE9F;
pub const NOT_USABLE_START: u16 = 0xFEA0;
pub const NOT_USABLE_END: u16 = 0xFEFF;
pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;
pub const INTERRUPTS_FLAG: u16 = 0xFF0F;
pub const INTERRUPTS_ENABLE: u16 = 0xFFFF;

pub const DMA_TRANSFER: u16 = 0xFF46;
pub const CGB_PREPARE_SWITCH: u16 = 0xFF4D;
pub const BOOT_ROM_DISABLE: u16 = 0xFF50;
pub const CGB_HDMA_1: u16 = 0xFF51;
pub const CGB_HDMA_2: u16 = 0xFF52;
pub const CGB_HDMA_3: u16 = 0xFF53;
pub const CGB_HDMA_4: u16 = 0xFF54;
pub const CGB_HDMA_5: u16 = 0xFF55;
pub const CGB_INFRARED: u16 = 0xFF56;
pub const CGB_WRAM_BANK: u16 = 0xFF70;
pub const CGB_PCM12: u16 = 0xFF76;
pub const CGB_PCM34: u16 = 0xFF77;

/// The value an open bus read returns.
pub const INVALID_READ: u8 = 0xFF;

/// What the CPU needs from whatever it is plugged into. Production code uses
/// [`Memory`]; tests substitute flat buffers.
pub trait MemoryBus {
    fn read_byte(&mut self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    /// Advance time by one M-cycle (4 T-states), running due events.
    fn tick_m_cycle(&mut self);
    /// HALT fast-forward: jump to the next point where anything can happen.
    /// Returns the cycles skipped.
    fn skip_to_next_event(&mut self) -> u64;
    fn interrupts(&self) -> &Interrupts;
    fn interrupts_mut(&mut self) -> &mut Interrupts;
    fn boot_rom_finished(&self) -> bool;
    fn model(&self) -> GameBoyModel;
    /// STOP on CGB: perform an armed speed switch. Returns whether the speed
    /// changed.
    fn try_speed_switch(&mut self) -> bool;
    /// STOP always resets DIV.
    fn reset_divider(&mut self);
    /// A 16-bit pointer operation landed on `address`; feeds the DMG OAM
    /// corruption glitch.
    fn oam_pointer_op(&mut self, address: u16, kind: OamCorruptionKind);
}

pub struct Memory {
    boot_rom: BootRom,
    pub cartridge: Cartridge,
    pub scheduler: Scheduler,
    model: GameBoyModel,
    pub speed: SpeedState,
    hdma: HdmaState,
    undocumented: UndocumentedRegisters,
    oam_dma: OamDmaUnit,

    pub ppu: Ppu,
    pub apu: Apu,
    pub hram: Hram,
    pub wram: Wram,

    pub joypad: JoyPad,
    pub timers: Timers,
    pub serial: Serial,
    pub interrupts: Interrupts,
    /// RP (FF56). Nothing is ever on the other end of the IR port, but the
    /// register bits themselves are readable.
    infrared_register: u8,

    /// Cycles between audio samples, for rescheduling the sample event.
    sample_period: u64,
    frame_completed: bool,
}

impl Memory {
    pub fn new(rom: &[u8], model: GameBoyModel, options: &EmulatorOptions) -> Result<Self, EmulatorError> {
        let cartridge = Cartridge::new(rom, options.saved_ram.clone())?;
        let sample_period = DMG_CLOCK_SPEED / options.audio_sample_rate.max(1) as u64;

        let mut result = Memory {
            boot_rom: BootRom::new(options.boot_rom.clone()),
            cartridge,
            scheduler: Scheduler::new(),
            model,
            speed: SpeedState::new(),
            hdma: HdmaState::new(),
            undocumented: UndocumentedRegisters::default(),
            oam_dma: OamDmaUnit::new(),
            ppu: Ppu::new(model, options.display_colour),
            apu: Apu::new(model, options.audio_sample_rate),
            hram: Hram::new(),
            wram: Wram::new(),
            joypad: JoyPad::new(),
            timers: Timers::default(),
            serial: Serial::default(),
            interrupts: Interrupts::default(),
            infrared_register: 0x3E,
            sample_period,
            frame_completed: false,
        };

        result.scheduler.push_event(EventType::ApuFrameSequencer, FRAME_SEQUENCE_CYCLES);
        result.scheduler.push_event(EventType::ApuSample, sample_period);

        if result.boot_rom.is_finished {
            result.apply_post_boot_state();
        }

        Ok(result)
    }

    /// The hardware state a completed boot ROM leaves behind, for hosts that
    /// do not supply one.
    fn apply_post_boot_state(&mut self) {
        const POST_BOOT_IO: &[(u16, u8)] = &[
            (0xFF00, 0xCF),
            (0xFF10, 0x80),
            (0xFF11, 0xBF),
            (0xFF12, 0xF3),
            (0xFF24, 0x77),
            (0xFF25, 0xF3),
            (0xFF26, 0x80),
            (0xFF47, 0xFC),
            (0xFF48, 0xFF),
            (0xFF49, 0xFF),
            (0xFF40, 0x91),
            (0xFF0F, 0xE1),
        ];

        self.timers.system_clock = 0xABCC;
        for &(address, value) in POST_BOOT_IO {
            self.write_io_byte(address, value);
        }
    }

    /// One M-cycle for the whole machine: the clock moves 4 T-states, due
    /// events run, the timer sees its edge.
    fn tick_m_cycle_internal(&mut self) {
        self.scheduler.add_cycles(4);
        self.handle_events();
        self.timers.tick(&mut self.scheduler);
    }

    fn handle_events(&mut self) {
        while let Some(event) = self.scheduler.pop_closest() {
            match event.event_type {
                EventType::OamSearch => self.ppu.oam_search(&mut self.scheduler, &mut self.interrupts),
                EventType::LcdTransfer => self.ppu.lcd_transfer(&mut self.scheduler, &mut self.interrupts),
                EventType::Hblank => {
                    self.ppu.hblank(&mut self.scheduler, &mut self.interrupts);
                    self.hdma_hblank_step();
                }
                EventType::Vblank => {
                    if self.ppu.vblank(&mut self.scheduler, &mut self.interrupts) {
                        self.frame_completed = true;
                    }
                    // Frame granularity is plenty for a seconds-based clock.
                    self.cartridge.tick_rtc(CYCLES_PER_FRAME);
                }
                EventType::VblankWait => self.ppu.vblank_wait(&mut self.scheduler, &mut self.interrupts),
                EventType::ApuFrameSequencer => {
                    self.apu
                        .synchronise(self.scheduler.current_time, self.speed.shift());
                    self.scheduler.push_full_event(
                        event.update_self(EventType::ApuFrameSequencer, FRAME_SEQUENCE_CYCLES << self.speed.shift()),
                    );
                }
                EventType::ApuSample => {
                    self.apu
                        .synchronise(self.scheduler.current_time, self.speed.shift());
                    self.scheduler.push_full_event(
                        event.update_self(EventType::ApuSample, self.sample_period << self.speed.shift()),
                    );
                }
                EventType::TimerReload => {
                    self.timers.reload(&mut self.scheduler);
                    self.interrupts.request(InterruptFlags::TIMER);
                }
                EventType::TimerPostReload => self.timers.finish_reload(),
                EventType::OamDmaStart => self.start_oam_dma(),
                EventType::OamDmaComplete => {
                    self.oam_dma.complete();
                    self.ppu.oam_dma_active = false;
                }
                EventType::SerialTransfer => {
                    self.serial.finish_transfer();
                    self.interrupts.request(InterruptFlags::SERIAL);
                }
            }
        }
    }

    /// Unclocked read; peripherals and debuggers use this directly. Lazily
    /// evaluated peripherals (the APU) may be slightly stale through here.
    pub fn get(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x00FF if self.boot_rom.covers(address) => self.boot_rom.read_byte(address),
            0x0200..=0x08FF if self.model.is_cgb() && self.boot_rom.covers(address) => {
                self.boot_rom.read_byte(address)
            }
            ROM_BANK_00_START..=ROM_BANK_00_END => self.cartridge.read_0000_3fff(address),
            ROM_BANK_NN_START..=ROM_BANK_NN_END => self.cartridge.read_4000_7fff(address),
            VRAM_START..=VRAM_END => self.ppu.read_vram(address),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read_external_ram(address),
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.read_bank_0(address),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.read_bank_n(address),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.read_echo_ram(address),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => self.ppu.read_oam_byte(address),
            NOT_USABLE_START..=NOT_USABLE_END => self.non_usable_call(address),
            IO_START..=IO_END => self.read_io_byte(address),
            HRAM_START..=HRAM_END => self.hram.read_byte(address),
            INTERRUPTS_ENABLE => self.interrupts.read_enable(),
        }
    }

    /// Unclocked write.
    pub fn set(&mut self, address: u16, value: u8) {
        match address {
            ROM_BANK_00_START..=ROM_BANK_NN_END => self.cartridge.write_byte(address, value),
            VRAM_START..=VRAM_END => self.ppu.write_vram(address, value),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write_byte(address, value),
            WRAM_BANK_00_START..=WRAM_BANK_00_END => self.wram.write_bank_0(address, value),
            WRAM_BANK_NN_START..=WRAM_BANK_NN_END => self.wram.write_bank_n(address, value),
            ECHO_RAM_START..=ECHO_RAM_END => self.wram.write_echo_ram(address, value),
            OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => self.ppu.write_oam_byte(address, value),
            NOT_USABLE_START..=NOT_USABLE_END => {
                trace!("ROM writing to non-usable memory: {:04X}", address)
            }
            IO_START..=IO_END => self.write_io_byte(address, value),
            HRAM_START..=HRAM_END => self.hram.set_byte(address, value),
            INTERRUPTS_ENABLE => self.interrupts.overwrite_enable(value),
        }
    }

    fn read_io_byte(&self, address: u16) -> u8 {
        match address {
            JOYPAD_REGISTER => self.joypad.read_register(),
            SIO_DATA => self.serial.read_data(),
            SIO_CONT => self.serial.read_control(self.model),
            DIVIDER_REGISTER => self.timers.divider_register(),
            TIMER_COUNTER => self.timers.read_tima(),
            TIMER_MODULO => self.timers.read_tma(),
            TIMER_CONTROL => self.timers.read_control(),
            INTERRUPTS_FLAG => self.interrupts.read_flag(),
            APU_MEM_START..=APU_MEM_END => self.apu.read_register(address),
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => self.apu.read_wave_ram(address),
            DMA_TRANSFER => self.oam_dma.read_register(),
            LCD_CONTROL_REGISTER..=LYC_REGISTER | BG_PALETTE..=WX_REGISTER | CGB_VRAM_BANK => {
                self.ppu.read_register(address, self.scheduler.current_time)
            }
            CGB_BG_PALETTE_INDEX..=CGB_OBJECT_PRIORITY => {
                self.ppu.read_register(address, self.scheduler.current_time)
            }
            CGB_PREPARE_SWITCH if self.model.is_cgb() => self.speed.read_key1(),
            CGB_HDMA_5 if self.model.is_cgb() => self.hdma.read_control(),
            CGB_INFRARED if self.model.is_cgb() => self.infrared_register,
            CGB_WRAM_BANK if self.model.is_cgb() => self.wram.read_bank_select(),
            0xFF72..=0xFF75 if self.model.is_cgb() => self.undocumented.read(address),
            CGB_PCM12 if self.model.is_cgb() => self.apu.read_pcm12(),
            CGB_PCM34 if self.model.is_cgb() => self.apu.read_pcm34(),
            // Everything else has no hardware behind it and floats high.
            _ => INVALID_READ,
        }
    }

    fn write_io_byte(&mut self, address: u16, value: u8) {
        match address {
            JOYPAD_REGISTER => self.joypad.write_register(value),
            SIO_DATA => self.serial.write_data(value),
            SIO_CONT => self.serial.write_control(value, self.model, &mut self.scheduler),
            DIVIDER_REGISTER => self.timers.set_divider(&mut self.scheduler),
            TIMER_COUNTER => self.timers.set_timer_counter(value, &mut self.scheduler),
            TIMER_MODULO => self.timers.set_tma(value),
            TIMER_CONTROL => self.timers.set_timer_control(value, &mut self.scheduler),
            INTERRUPTS_FLAG => self.interrupts.overwrite_flag(value),
            APU_MEM_START..=APU_MEM_END => {
                let now = self.scheduler.current_time;
                self.apu.synchronise(now, self.speed.shift());
                self.apu.write_register(address, value, now);
            }
            WAVE_SAMPLE_START..=WAVE_SAMPLE_END => {
                self.apu.synchronise(self.scheduler.current_time, self.speed.shift());
                self.apu.write_wave_ram(address, value);
            }
            DMA_TRANSFER => self.request_oam_dma(value),
            LCD_CONTROL_REGISTER..=LYC_REGISTER | BG_PALETTE..=WX_REGISTER | CGB_VRAM_BANK => {
                self.ppu
                    .write_register(address, value, &mut self.scheduler, &mut self.interrupts)
            }
            CGB_BG_PALETTE_INDEX..=CGB_OBJECT_PRIORITY => {
                self.ppu
                    .write_register(address, value, &mut self.scheduler, &mut self.interrupts)
            }
            CGB_PREPARE_SWITCH if self.model.is_cgb() => self.speed.write_key1(value),
            BOOT_ROM_DISABLE if !self.boot_rom.is_finished => {
                self.boot_rom.is_finished = true;
                info!("Finished executing boot ROM");
            }
            CGB_HDMA_1 if self.model.is_cgb() => self.hdma.write_source_high(value),
            CGB_HDMA_2 if self.model.is_cgb() => self.hdma.write_source_low(value),
            CGB_HDMA_3 if self.model.is_cgb() => self.hdma.write_destination_high(value),
            CGB_HDMA_4 if self.model.is_cgb() => self.hdma.write_destination_low(value),
            CGB_HDMA_5 if self.model.is_cgb() => self.write_hdma_control(value),
            CGB_INFRARED if self.model.is_cgb() => {
                // Only the emitter bit and the read-enable bits take writes.
                self.infrared_register = 0x3C | (value & 0xC1);
            }
            CGB_WRAM_BANK if self.model.is_cgb() => self.wram.write_bank_select(value),
            0xFF72..=0xFF75 if self.model.is_cgb() => self.undocumented.write(address, value),
            _ => trace!("Discarded write of {:#04X} to unhandled I/O register {:#06X}", value, address),
        }
    }

    /// FF46 write: the transfer starts after a short setup delay. A restart
    /// cancels any transfer already in flight.
    fn request_oam_dma(&mut self, value: u8) {
        self.oam_dma.set_register(value);
        self.scheduler.remove_event_type(EventType::OamDmaStart);
        self.scheduler.remove_event_type(EventType::OamDmaComplete);
        self.scheduler.push_relative(EventType::OamDmaStart, OAM_DMA_SETUP_CYCLES);
    }

    fn start_oam_dma(&mut self) {
        let base = self.oam_dma.source_base();
        let mut buffer = [0u8; 160];
        for (offset, byte) in buffer.iter_mut().enumerate() {
            // Sources above 0xDFFF wrap into work RAM, like the real bus.
            let mut source = base.wrapping_add(offset as u16);
            if source >= ECHO_RAM_START {
                source -= 0x2000;
            }
            *byte = self.get(source);
        }

        for (offset, byte) in buffer.iter().enumerate() {
            self.ppu.oam_dma_write(offset as u8, *byte);
        }
        self.oam_dma.begin(buffer, self.scheduler.current_time);
        self.ppu.oam_dma_active = true;
        self.scheduler.push_relative(EventType::OamDmaComplete, OAM_DMA_CYCLES);
    }

    fn write_hdma_control(&mut self, value: u8) {
        match self.hdma.write_control(value) {
            Some(HdmaMode::General) => self.run_gdma(),
            Some(HdmaMode::HBlank) => {
                // Starting an HBlank transfer while already in HBlank (or
                // with the LCD off) copies the first block right away.
                if !self.ppu.lcd_enabled()
                    || self.ppu.current_mode() == crate::hardware::ppu::Mode::Hblank
                {
                    self.hdma_copy_block();
                    self.stall_cpu_for_hdma_block();
                }
            }
            None => {}
        }
    }

    /// General-purpose DMA: everything copies now, with the CPU stalled for
    /// 8 M-cycles per 16-byte block (16 in double speed).
    fn run_gdma(&mut self) {
        let blocks = self.hdma.blocks_remaining as u64;
        while self.hdma.active {
            self.hdma_copy_block();
        }
        for _ in 0..blocks {
            self.stall_cpu_for_hdma_block();
        }
    }

    fn hdma_hblank_step(&mut self) {
        if self.hdma.active && self.hdma.mode == HdmaMode::HBlank && self.ppu.lcd_enabled() {
            self.hdma_copy_block();
            self.stall_cpu_for_hdma_block();
        }
    }

    fn hdma_copy_block(&mut self) {
        for offset in 0..16u16 {
            let byte = self.get(self.hdma.source.wrapping_add(offset));
            let destination = 0x8000 | (self.hdma.destination.wrapping_add(offset) & 0x1FFF);
            self.ppu.write_vram_unchecked(destination, byte);
        }
        self.hdma.advance_block();
    }

    fn stall_cpu_for_hdma_block(&mut self) {
        for _ in 0..(8u64 << self.speed.shift()) {
            self.tick_m_cycle_internal();
        }
    }

    /// Simply returns 0xFF while logging the access.
    fn non_usable_call(&self, address: u16) -> u8 {
        warn!("ROM accessed non-usable memory: {:04X}", address);
        INVALID_READ
    }

    /// True once per completed frame; consuming resets it.
    pub fn take_frame_completed(&mut self) -> bool {
        std::mem::replace(&mut self.frame_completed, false)
    }

    pub fn press_key(&mut self, key: InputKey) {
        if self.joypad.press_key(key) {
            self.interrupts.request(InterruptFlags::JOYPAD);
        }
    }

    pub fn release_key(&mut self, key: InputKey) {
        self.joypad.release_key(key);
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        self.scheduler.save_state(writer);
        writer.write_bool(self.boot_rom.is_finished);
        self.speed.save_state(writer);
        self.hdma.save_state(writer);
        self.undocumented.save_state(writer);
        self.oam_dma.save_state(writer);
        writer.write_u8(self.infrared_register);
        self.interrupts.save_state(writer);
        self.timers.save_state(writer);
        self.serial.save_state(writer);
        self.joypad.save_state(writer);
        self.wram.save_state(writer);
        self.hram.save_state(writer);
        self.ppu.save_state(writer);
        self.apu.save_state(writer);
        self.cartridge.save_state(writer);
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.scheduler.load_state(reader)?;
        self.boot_rom.is_finished = reader.read_bool()?;
        self.speed.load_state(reader)?;
        self.hdma.load_state(reader)?;
        self.undocumented.load_state(reader)?;
        self.oam_dma.load_state(reader)?;
        self.infrared_register = reader.read_u8()?;
        self.interrupts.load_state(reader)?;
        self.timers.load_state(reader)?;
        self.serial.load_state(reader)?;
        self.joypad.load_state(reader)?;
        self.wram.load_state(reader)?;
        self.hram.load_state(reader)?;
        self.ppu.load_state(reader)?;
        self.apu.load_state(reader)?;
        self.cartridge.load_state(reader)?;
        self.ppu.set_speed_shift(self.speed.shift());
        self.frame_completed = false;
        Ok(())
    }
}

impl MemoryBus for Memory {
    fn read_byte(&mut self, address: u16) -> u8 {
        if self.oam_dma.is_active() {
            // Only HRAM and the top-page registers stay reachable; anything
            // on the contested busses sees the byte DMA is moving.
            match address {
                0x0000..=0xFDFF => return self.oam_dma.conflict_byte(self.scheduler.current_time),
                OAM_ATTRIBUTE_START..=OAM_ATTRIBUTE_END => return INVALID_READ,
                _ => {}
            }
        }

        // The APU evaluates lazily; catch it up before it is observed.
        if matches!(address, APU_MEM_START..=WAVE_SAMPLE_END | CGB_PCM12 | CGB_PCM34) {
            self.apu.synchronise(self.scheduler.current_time, self.speed.shift());
        }

        self.get(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.set(address, value)
    }

    fn tick_m_cycle(&mut self) {
        self.tick_m_cycle_internal();
    }

    fn skip_to_next_event(&mut self) -> u64 {
        let now = self.scheduler.current_time;
        let mut target = self.scheduler.next_deadline().unwrap_or(now + 4);
        if let Some(cycles) = self.timers.cycles_until_overflow() {
            // Stop short of the overflow edge so it fires on its exact cycle.
            target = target.min(now + cycles.saturating_sub(4));
        }

        let mut delta = target.saturating_sub(now);
        delta -= delta % 4;
        if delta == 0 {
            self.tick_m_cycle_internal();
            return 4;
        }

        self.scheduler.add_cycles(delta);
        self.timers.skip(delta);
        self.handle_events();
        delta
    }

    fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    fn interrupts_mut(&mut self) -> &mut Interrupts {
        &mut self.interrupts
    }

    fn boot_rom_finished(&self) -> bool {
        self.boot_rom.is_finished
    }

    fn model(&self) -> GameBoyModel {
        self.model
    }

    fn try_speed_switch(&mut self) -> bool {
        if self.speed.perform_switch() {
            self.ppu.set_speed_shift(self.speed.shift());
            true
        } else {
            false
        }
    }

    fn reset_divider(&mut self) {
        self.timers.set_divider(&mut self.scheduler);
    }

    fn oam_pointer_op(&mut self, address: u16, kind: OamCorruptionKind) {
        if self.model.is_dmg() && (OAM_ATTRIBUTE_START..=NOT_USABLE_END).contains(&address) {
            self.ppu.corrupt_oam(kind, self.scheduler.current_time);
        }
    }
}
