//! Serial port, keyboard latch and SKSTAT.
//!
//! Nothing is actually shifted bit by bit. A SEROUT write hands the byte to
//! the host right away and schedules the two status events a CPU driver
//! waits on: "ready for the next byte" and "transmission complete". Serial
//! input works the same way in reverse: the host announces a byte will be
//! ready after some ticks and SERIN pulls it from the host when read.

use super::registers::{irq, skstat};
use serde::{Deserialize, Serialize};

/// Output shift register accepts the next byte after this long.
pub const SEROUT_READY_MICROS: u64 = 200;
/// Full byte time on the wire.
pub const SEROUT_COMPLETE_MICROS: u64 = 2000;

/// KBCODE at power-on
pub const KBCODE_RESET: u8 = 0x09;

/// Chip-clock ticks covering `micros` microseconds.
pub fn micros_to_ticks(clock_hz: u32, micros: u64) -> u64 {
    clock_hz as u64 * micros / 1_000_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent {
    OutputReady,
    OutputComplete,
    InputReady,
}

impl SerialEvent {
    pub fn irq(self) -> u8 {
        match self {
            SerialEvent::OutputReady => irq::SEROUT_READY,
            SerialEvent::OutputComplete => irq::SEROUT_COMPLETE,
            SerialEvent::InputReady => irq::SERIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialUnit {
    pub serout: u8,
    pub serin: u8,
    pub kbcode: u8,
    /// SKSTAT, active-high
    pub status: u8,
    pub ready_at: Option<u64>,
    pub complete_at: Option<u64>,
    pub serin_at: Option<u64>,
}

impl Default for SerialUnit {
    fn default() -> Self {
        Self {
            serout: 0,
            serin: 0,
            kbcode: KBCODE_RESET,
            status: 0,
            ready_at: None,
            complete_at: None,
            serin_at: None,
        }
    }
}

impl SerialUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch an outgoing byte and (re)start both output events.
    pub fn write_serout(&mut self, byte: u8, now: u64, clock_hz: u32) {
        self.serout = byte;
        self.status |= skstat::SEROUT_ACTIVE;
        self.ready_at = Some(now + micros_to_ticks(clock_hz, SEROUT_READY_MICROS));
        self.complete_at = Some(now + micros_to_ticks(clock_hz, SEROUT_COMPLETE_MICROS));
    }

    pub fn schedule_serin(&mut self, now: u64, after_ticks: u64) {
        self.serin_at = Some(now + after_ticks);
    }

    /// Next due event at `now`, in ready, complete, input order.
    pub fn pop_due(&mut self, now: u64) -> Option<SerialEvent> {
        let due = |at: Option<u64>| at.is_some_and(|t| t <= now);

        if due(self.ready_at) {
            self.ready_at = None;
            Some(SerialEvent::OutputReady)
        } else if due(self.complete_at) {
            self.complete_at = None;
            self.status &= !skstat::SEROUT_ACTIVE;
            Some(SerialEvent::OutputComplete)
        } else if due(self.serin_at) {
            self.serin_at = None;
            Some(SerialEvent::InputReady)
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        [self.ready_at, self.complete_at, self.serin_at]
            .into_iter()
            .flatten()
            .min()
    }

    /// SKREST
    pub fn reset_status(&mut self) {
        self.status &= !skstat::ERRORS;
    }

    /// Keyboard scan result. `overrun` is set when the previous key was
    /// never acknowledged.
    pub fn key_event(&mut self, code: u8, pressed: bool, overrun: bool) {
        if !pressed {
            self.status &= !skstat::KEY_DOWN;
            return;
        }
        self.kbcode = code;
        self.status |= skstat::KEY_DOWN;
        self.set_shift(code & 0x40 != 0);
        if overrun {
            self.status |= skstat::KB_OVERRUN;
        }
    }

    pub fn set_shift(&mut self, shift: bool) {
        if shift {
            self.status |= skstat::SHIFT;
        } else {
            self.status &= !skstat::SHIFT;
        }
    }

    /// SKSTAT as the CPU reads it: active-low.
    pub fn skstat(&self) -> u8 {
        self.status ^ 0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NTSC: u32 = 1_789_790;

    #[test]
    fn delays_in_ticks() {
        assert_eq!(micros_to_ticks(NTSC, SEROUT_READY_MICROS), 357);
        assert_eq!(micros_to_ticks(NTSC, SEROUT_COMPLETE_MICROS), 3579);
    }

    #[test]
    fn serout_events_fire_in_order() {
        let mut s = SerialUnit::new();
        s.write_serout(0x55, 100, NTSC);
        assert_eq!(s.serout, 0x55);
        assert_ne!(s.status & skstat::SEROUT_ACTIVE, 0);
        assert_eq!(s.next_deadline(), Some(457));

        assert_eq!(s.pop_due(456), None);
        assert_eq!(s.pop_due(457), Some(SerialEvent::OutputReady));
        assert_eq!(s.pop_due(457), None);
        assert_eq!(s.next_deadline(), Some(3679));

        assert_eq!(s.pop_due(10_000), Some(SerialEvent::OutputComplete));
        assert_eq!(s.status & skstat::SEROUT_ACTIVE, 0);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn both_due_pop_ready_first() {
        let mut s = SerialUnit::new();
        s.write_serout(1, 0, NTSC);
        assert_eq!(s.pop_due(u64::MAX), Some(SerialEvent::OutputReady));
        assert_eq!(s.pop_due(u64::MAX), Some(SerialEvent::OutputComplete));
        assert_eq!(s.pop_due(u64::MAX), None);
    }

    #[test]
    fn key_press_and_release() {
        let mut s = SerialUnit::new();
        assert_eq!(s.kbcode, KBCODE_RESET);

        s.key_event(0x40 | 0x12, true, false);
        assert_eq!(s.kbcode, 0x52);
        assert_ne!(s.status & skstat::KEY_DOWN, 0);
        assert_ne!(s.status & skstat::SHIFT, 0);

        s.key_event(0, false, false);
        assert_eq!(s.status & skstat::KEY_DOWN, 0);
        assert_eq!(s.kbcode, 0x52);
    }

    #[test]
    fn overrun_is_sticky_until_reset() {
        let mut s = SerialUnit::new();
        s.key_event(0x01, true, true);
        s.key_event(0x02, true, false);
        assert_ne!(s.status & skstat::KB_OVERRUN, 0);
        assert_eq!(s.skstat() & skstat::KB_OVERRUN, 0);

        s.reset_status();
        assert_eq!(s.status & skstat::KB_OVERRUN, 0);
        assert_ne!(s.status & skstat::KEY_DOWN, 0);
    }
}
