//! Paddle (potentiometer) conversion.
//!
//! On the real chip POTGO discharges eight capacitors and a counter runs until
//! each one recharges past a threshold; the count is the paddle position.
//! Here POTGO asks the host for each target value and records when the count
//! would reach it. Reads in between report how far the count has got.

use super::registers::skctl;
use serde::{Deserialize, Serialize};

/// Highest count a pot can reach.
pub const POT_MAX: u8 = 228;
/// Ticks per count in normal scan mode (one 15 kHz line).
pub const POT_TICKS_SLOW: u32 = 114;
/// Ticks per count in fast scan mode.
pub const POT_TICKS_FAST: u32 = 16;

pub fn ticks_per_count(skctl_value: u8) -> u32 {
    if skctl_value & skctl::FAST_POTS != 0 {
        POT_TICKS_FAST
    } else {
        POT_TICKS_SLOW
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotInput {
    /// Latched count, final once the conversion finished
    pub value: u8,
    pub target: u8,
    pub start: u64,
    pub per_count: u32,
    /// Completion tick of a running conversion
    pub deadline: Option<u64>,
}

impl PotInput {
    fn reading(&self, now: u64) -> u8 {
        match self.deadline {
            Some(_) if self.per_count > 0 => {
                let counted = now.saturating_sub(self.start) / self.per_count as u64;
                counted.min(self.target as u64) as u8
            }
            _ => self.value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotUnit {
    pub pots: [PotInput; 8],
    /// ALLPOT, bit n set while pot n is converting
    pub allpot: u8,
}

impl PotUnit {
    /// POTGO: start a scan of all eight inputs. `target(n)` is the host's
    /// value for pot n, `None` when nothing is connected; an unconnected pot
    /// never finishes converting.
    pub fn potgo<F>(&mut self, now: u64, skctl_value: u8, mut target: F)
    where
        F: FnMut(usize) -> Option<u8>,
    {
        let per_count = ticks_per_count(skctl_value);
        self.allpot = 0xFF;
        for (n, pot) in self.pots.iter_mut().enumerate() {
            if pot.deadline.take().is_some() {
                // Interrupted conversion reads as fully charged
                pot.value = POT_MAX;
            }
            if let Some(value) = target(n) {
                let value = value.min(POT_MAX);
                pot.value = value;
                pot.target = value;
                pot.start = now;
                pot.per_count = per_count;
                pot.deadline = Some(now + value as u64 * per_count as u64);
            }
        }
    }

    /// Finish every conversion whose deadline has passed.
    pub fn resolve(&mut self, now: u64) {
        for (n, pot) in self.pots.iter_mut().enumerate() {
            if pot.deadline.is_some_and(|d| d <= now) {
                pot.deadline = None;
                pot.value = pot.target;
                self.allpot &= !(1 << n);
            }
        }
    }

    pub fn read(&mut self, n: usize, now: u64) -> u8 {
        debug_assert!(n < 8, "pot index {n} out of range");
        self.resolve(now);
        self.pots[n].reading(now)
    }

    pub fn allpot(&mut self, now: u64) -> u8 {
        self.resolve(now);
        self.allpot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_scan_is_about_seven_times_faster() {
        assert_eq!(ticks_per_count(0), 114);
        assert_eq!(ticks_per_count(skctl::FAST_POTS), 16);
        assert_eq!(POT_TICKS_SLOW / POT_TICKS_FAST, 7);
    }

    #[test]
    fn read_interpolates_then_latches() {
        let mut unit = PotUnit::default();
        unit.potgo(1000, 0, |n| if n == 2 { Some(100) } else { None });
        assert_eq!(unit.allpot, 0xFF);

        assert_eq!(unit.read(2, 1000), 0);
        assert_eq!(unit.read(2, 1000 + 114 * 10 + 5), 10);
        assert_eq!(unit.allpot(1000 + 114 * 99), 0xFF);

        assert_eq!(unit.read(2, 1000 + 114 * 100), 100);
        assert_eq!(unit.allpot(1000 + 114 * 100), 0xFF & !0x04);
        assert_eq!(unit.read(2, 1_000_000), 100);
    }

    #[test]
    fn targets_clamp_to_max() {
        let mut unit = PotUnit::default();
        unit.potgo(0, skctl::FAST_POTS, |_| Some(255));
        assert_eq!(unit.pots[0].target, POT_MAX);
        assert_eq!(unit.pots[0].deadline, Some(228 * 16));
        assert_eq!(unit.read(0, 10_000), POT_MAX);
        assert_eq!(unit.allpot(10_000), 0);
    }

    #[test]
    fn unconnected_pots_keep_converting() {
        let mut unit = PotUnit::default();
        unit.potgo(0, 0, |n| if n == 0 { Some(0) } else { None });
        assert_eq!(unit.allpot(0), 0xFE);
        assert_eq!(unit.allpot(u64::MAX / 2), 0xFE);
    }

    #[test]
    fn potgo_restarts_a_running_scan() {
        let mut unit = PotUnit::default();
        unit.potgo(0, 0, |_| Some(50));
        unit.potgo(114 * 10, 0, |n| if n == 0 { Some(20) } else { None });
        assert_eq!(unit.read(0, 114 * 10 + 114 * 5), 5);
        assert_eq!(unit.read(0, 114 * 30), 20);

        // Pot 1 was cut off mid-scan and is now unconnected
        assert_eq!(unit.read(1, 114 * 30), POT_MAX);
        assert_eq!(unit.allpot(114 * 30) & 0x02, 0x02);
    }
}
