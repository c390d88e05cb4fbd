use std::cmp::Ordering;

use binary_heap_plus::{BinaryHeap, MinComparator};

use crate::error::EmulatorError;
use crate::state::{StateReader, StateWriter};

/// Everything that can be waited on. At most one event of each kind is ever
/// outstanding, and no two events of the same kind may share a deadline.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    OamSearch = 0,
    LcdTransfer = 1,
    Hblank = 2,
    Vblank = 3,
    VblankWait = 4,
    ApuFrameSequencer = 5,
    ApuSample = 6,
    TimerReload = 7,
    TimerPostReload = 8,
    OamDmaStart = 9,
    OamDmaComplete = 10,
    SerialTransfer = 11,
}

impl EventType {
    fn from_u8(value: u8) -> Option<EventType> {
        use EventType::*;
        Some(match value {
            0 => OamSearch,
            1 => LcdTransfer,
            2 => Hblank,
            3 => Vblank,
            4 => VblankWait,
            5 => ApuFrameSequencer,
            6 => ApuSample,
            7 => TimerReload,
            8 => TimerPostReload,
            9 => OamDmaStart,
            10 => OamDmaComplete,
            11 => SerialTransfer,
            _ => return None,
        })
    }
}

#[derive(Debug, Copy, Clone, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub event_type: EventType,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

impl Event {
    /// Reuse this event with a new kind, `delta_timestamp` cycles after the
    /// deadline it just fired at. Saves an allocation in the dispatch loop.
    pub fn update_self(mut self, new_event_type: EventType, delta_timestamp: u64) -> Self {
        self.timestamp += delta_timestamp;
        self.event_type = new_event_type;
        self
    }
}

/// The sole time source of the core.
///
/// `current_time` counts T-states at the 4.194304 MHz base rate since reset
/// and never decreases. Peripherals that run in real time (PPU, APU) have
/// their deadlines stretched by the bus when the CPU enters double speed;
/// CPU-domain deadlines (timer reload, OAM DMA, serial) are scheduled in
/// CPU cycles and left untouched.
#[derive(Debug)]
pub struct Scheduler {
    // Want the smallest deadline first, so MinComparator.
    event_queue: BinaryHeap<Event, MinComparator>,
    pub current_time: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            event_queue: BinaryHeap::with_capacity_min(64),
            current_time: 0,
        }
    }

    /// Returns a `Some(Event)` if there is an event available which has a
    /// deadline at or below the `current_time` of the `Scheduler`.
    pub fn pop_closest(&mut self) -> Option<Event> {
        if let Some(event) = self.event_queue.peek() {
            if event.timestamp <= self.current_time {
                return self.event_queue.pop();
            }
        }
        None
    }

    /// The deadline of the earliest outstanding event, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.event_queue.peek().map(|e| e.timestamp)
    }

    /// Jump `current_time` forward to the next deadline. Used to fast-forward
    /// through HALT, where nothing can happen between events.
    ///
    /// Returns the amount of cycles skipped.
    pub fn skip_to_next(&mut self) -> u64 {
        match self.next_deadline() {
            Some(deadline) if deadline > self.current_time => {
                let skipped = deadline - self.current_time;
                self.current_time = deadline;
                skipped
            }
            _ => 0,
        }
    }

    /// Add a new event to the `Scheduler` with an absolute deadline.
    pub fn push_event(&mut self, event_type: EventType, timestamp: u64) {
        self.event_queue.push(Event { timestamp, event_type });
    }

    pub fn push_relative(&mut self, event_type: EventType, relative_timestamp: u64) {
        self.push_event(event_type, self.current_time + relative_timestamp);
    }

    /// Re-add an event popped by `pop_closest`, avoiding an allocation.
    pub fn push_full_event(&mut self, event: Event) {
        self.event_queue.push(event);
    }

    pub fn remove_event_type(&mut self, event_type: EventType) {
        // Inefficient, but removal is rare (LCD off, DMA restart, TIMA write).
        self.event_queue = BinaryHeap::from_vec(
            self.event_queue
                .clone()
                .into_iter()
                .filter(|e| e.event_type != event_type)
                .collect(),
        );
    }

    #[inline]
    pub fn add_cycles(&mut self, delta_cycles: u64) {
        self.current_time += delta_cycles;
    }

    pub fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u64(self.current_time);
        let events: Vec<Event> = self.event_queue.clone().into_vec();
        writer.write_u32(events.len() as u32);
        for event in events {
            writer.write_u8(event.event_type as u8);
            writer.write_u64(event.timestamp);
        }
    }

    pub fn load_state(&mut self, reader: &mut StateReader) -> Result<(), EmulatorError> {
        self.current_time = reader.read_u64()?;
        let count = reader.read_u32()?;
        let mut events = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let kind = reader.read_u8()?;
            let timestamp = reader.read_u64()?;
            let event_type = EventType::from_u8(kind)
                .ok_or_else(|| EmulatorError::StateCorrupt(format!("unknown event kind {}", kind)))?;
            events.push(Event { timestamp, event_type });
        }
        self.event_queue = BinaryHeap::from_vec(events);
        Ok(())
    }
}
