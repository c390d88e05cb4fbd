//! Clocked memory access and the interrupt-service sequence; kept separate so
//! the main mod.rs holds nothing but instruction semantics.

use crate::hardware::cpu::CPU;
use crate::hardware::mmu::MemoryBus;

impl<M: MemoryBus> CPU<M> {
    /// One internal M-cycle: 4 T-states pass, peripherals and events run.
    pub fn add_cycles(&mut self) {
        self.cycles_performed += 4;
        self.mmu.tick_m_cycle();
    }

    /// Read the next opcode, advance the PC, and call the execute function
    /// for a prefix opcode.
    pub fn cb_prefix_call(&mut self) {
        self.opcode = self.get_instr_u8();
        self.execute_prefix(self.opcode);
    }

    /// Services the highest-priority pending interrupt, if IME allows it.
    ///
    /// Returns `true` if a dispatch happened. The vector is chosen from the
    /// value IE holds *between* the two PC pushes: the high push can land on
    /// IE and redirect (or cancel) the dispatch, in which case PC ends up at
    /// 0x0000.
    pub fn handle_interrupts(&mut self) -> bool {
        if !self.ime || self.mmu.interrupts().pending().is_empty() {
            return false;
        }

        self.ime = false;
        self.delayed_ime = false;

        // Two wait cycles before anything touches the bus.
        self.add_cycles();
        self.add_cycles();

        let pc = self.registers.pc;
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, (pc >> 8) as u8);

        // IE is sampled here, after the high push.
        let enabled = self.mmu.interrupts().enabled_flags();

        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.write_byte_cycle(self.registers.sp, pc as u8);

        let pending = enabled & self.mmu.interrupts().interrupt_flag;
        match pending.highest_priority() {
            Some(interrupt) => {
                log::trace!("Dispatching {:?} interrupt", interrupt);
                self.mmu.interrupts_mut().acknowledge(interrupt);
                self.registers.pc = interrupt.vector();
            }
            // The push wiped the only pending enable bit.
            None => self.registers.pc = 0x0000,
        }

        self.add_cycles();
        true
    }

    /// Based on the current `PC` will interpret the value at that location
    /// in memory as a `u8` value.
    ///
    /// Advances the `PC` by 1.
    pub fn get_instr_u8(&mut self) -> u8 {
        let result = self.read_byte_cycle(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);

        result
    }

    /// Based on the current `PC` will interpret the `current` and
    /// `current + 1` bytes at those locations in memory as a `u16` value
    /// resolved as little endian (least significant byte first).
    ///
    /// Advances the `PC` by 2.
    pub fn get_instr_u16(&mut self) -> u16 {
        let least_s_byte = self.get_instr_u8() as u16;
        let most_s_byte = self.get_instr_u8() as u16;

        (most_s_byte << 8) | least_s_byte
    }

    /// Read a byte from the bus, advancing time by one M-cycle first.
    pub fn read_byte_cycle(&mut self, address: u16) -> u8 {
        self.add_cycles();
        self.mmu.read_byte(address)
    }

    /// Set a byte on the bus, advancing time by one M-cycle first.
    pub fn write_byte_cycle(&mut self, address: u16, value: u8) {
        self.add_cycles();
        self.mmu.write_byte(address, value);
    }

    /// Read a `short` from the bus; costs two M-cycles.
    pub fn read_short_cycle(&mut self, address: u16) -> u16 {
        let least_s_byte = self.read_byte_cycle(address) as u16;
        let most_s_byte = self.read_byte_cycle(address.wrapping_add(1)) as u16;

        (most_s_byte << 8) | least_s_byte
    }

    /// Set a `short` on the bus; costs two M-cycles.
    pub fn write_short_cycle(&mut self, address: u16, value: u16) {
        self.write_byte_cycle(address, (value & 0xFF) as u8); // Least significant byte first.
        self.write_byte_cycle(address.wrapping_add(1), (value >> 8) as u8);
    }
}
