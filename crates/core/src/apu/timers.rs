//! Interval timers and the interrupt status/enable pair.
//!
//! POKEY derives three timers from its channel dividers: timer 1 from channel
//! 1, timer 2 from channel 2 and timer 4 from channel 4. A timer is only a
//! periodic deadline on the chip's tick clock; it runs whether or not its
//! IRQEN bit is set, and IRQEN only decides whether an expiry is latched.
//!
//! STIMER restarts all of them at a full period. Divider changes after that
//! retune a running timer so it keeps expiring with its channel's underflow;
//! a timer that STIMER left unarmed stays unarmed until the next STIMER.

use super::channel::NEVER;
use super::registers::{audctl, irq};
use serde::{Deserialize, Serialize};

/// A divisor must exceed this for its timer to run.
pub const TIMER_MIN_DIVISOR: u32 = 4;

/// IRQ bit of each timer, indexed by timer id.
pub const TIMER_IRQ: [u8; 3] = [irq::TIMER1, irq::TIMER2, irq::TIMER4];

/// Channel feeding each timer, indexed by timer id.
pub const TIMER_CHANNEL: [usize; 3] = [0, 1, 3];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub period: u32,
    /// Absolute tick of the next expiry, `None` while stopped
    pub deadline: Option<u64>,
}

/// Timer period for `id` given the current divisors, if it can run at all.
///
/// Timer 1 has no divider of its own while channels 1 and 2 are joined.
pub fn timer_period(id: usize, divisors: &[u32; 4], audctl_value: u8) -> Option<u32> {
    if id == 0 && audctl_value & audctl::CH12_JOINED != 0 {
        return None;
    }
    let divisor = divisors[TIMER_CHANNEL[id]];
    (divisor > TIMER_MIN_DIVISOR).then_some(divisor)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerUnit {
    pub timers: [Timer; 3],
}

impl TimerUnit {
    /// STIMER: start every eligible timer one full period from `now`.
    pub fn rearm_all(&mut self, divisors: &[u32; 4], audctl_value: u8, now: u64) {
        for (id, timer) in self.timers.iter_mut().enumerate() {
            match timer_period(id, divisors, audctl_value) {
                Some(period) => {
                    timer.period = period;
                    timer.deadline = Some(now + period as u64);
                }
                None => *timer = Timer::default(),
            }
        }
    }

    /// Follow a divider change. A running timer whose period changed expires
    /// next when its channel's counter runs out, then every new period; one
    /// that lost its divider stops.
    pub fn retune(
        &mut self,
        divisors: &[u32; 4],
        counters: &[u32; 4],
        audctl_value: u8,
        now: u64,
    ) {
        for (id, timer) in self.timers.iter_mut().enumerate() {
            if timer.deadline.is_none() {
                continue;
            }
            match timer_period(id, divisors, audctl_value) {
                Some(period) if period != timer.period => {
                    let remaining = match counters[TIMER_CHANNEL[id]] {
                        // Reloads with the new period this tick
                        0 | NEVER => period,
                        counter => counter,
                    };
                    timer.period = period;
                    timer.deadline = Some(now + remaining as u64);
                }
                Some(_) => {}
                None => *timer = Timer::default(),
            }
        }
    }

    /// If timer `id` is due at `now`, schedule its next period and return true.
    pub fn take_due(&mut self, id: usize, now: u64) -> bool {
        let timer = &mut self.timers[id];
        match timer.deadline {
            Some(deadline) if deadline <= now => {
                timer.deadline = Some(deadline + timer.period as u64);
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().filter_map(|t| t.deadline).min()
    }
}

/// IRQST/IRQEN pair, both held active-high.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrqState {
    pub enable: u8,
    pub pending: u8,
}

impl IrqState {
    /// New IRQEN value. Pending bits are left alone.
    pub fn set_enable(&mut self, mask: u8) {
        self.enable = mask;
    }

    /// Clear the pending bits in `mask`.
    pub fn acknowledge(&mut self, mask: u8) {
        self.pending &= !mask;
    }

    /// Latch `bits` that are enabled. Returns the enabled pending set to
    /// report, or `None` if none of `bits` was enabled.
    pub fn raise(&mut self, bits: u8) -> Option<u8> {
        let latched = bits & self.enable;
        if latched == 0 {
            return None;
        }
        self.pending |= latched;
        Some(self.pending & self.enable)
    }

    /// IRQST as the CPU reads it: active-low.
    pub fn status(&self) -> u8 {
        self.pending ^ 0xFF
    }
}
