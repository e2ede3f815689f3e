//! Next-event search for the render loop.
//!
//! Each step of the render loop jumps straight to the nearest of five
//! instants: the four channel underflows and the next output sample boundary.
//! When several fall on the same tick they are handled one per step in the
//! fixed order channel 1, 2, 3, 4, sample. The order decides the exact output
//! bits (the filter link and the mixed sum depend on it), so it is spelled out
//! here instead of coming from a generic min over a collection.

use serde::{Deserialize, Serialize};

/// What happens at the next scheduled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Channel(usize),
    Sample,
}

/// Pick the next event and the ticks until it. Earlier candidates win ties.
pub fn next_event(counters: &[u32; 4], sample_countdown: u32) -> (Event, u32) {
    let mut event = Event::Channel(0);
    let mut delta = counters[0];

    if counters[1] < delta {
        event = Event::Channel(1);
        delta = counters[1];
    }
    if counters[2] < delta {
        event = Event::Channel(2);
        delta = counters[2];
    }
    if counters[3] < delta {
        event = Event::Channel(3);
        delta = counters[3];
    }
    if sample_countdown < delta {
        event = Event::Sample;
        delta = sample_countdown;
    }

    (event, delta)
}

/// Output sample clock, kept as a 24.8 fixed-point step so that long runs do
/// not drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleClock {
    /// Chip ticks per sample in 24.8 format
    pub step_24_8: u32,
    /// Fractional ticks carried to the next sample
    pub fract: u32,
    /// Whole ticks until the next sample boundary
    pub countdown: u32,
}

impl SampleClock {
    pub fn new(clock_hz: u32, sample_rate: u32) -> Self {
        let step_24_8 = if sample_rate == 0 {
            1 << 8
        } else {
            ((clock_hz as u64) << 8) / sample_rate as u64
        } as u32;
        let mut clock = Self {
            step_24_8,
            fract: 0,
            countdown: 0,
        };
        clock.schedule_next();
        clock
    }

    /// Whole ticks per sample, rounded down.
    pub fn ticks_per_sample(&self) -> u32 {
        self.step_24_8 >> 8
    }

    pub fn elapse(&mut self, ticks: u32) {
        debug_assert!(ticks <= self.countdown);
        self.countdown -= ticks;
    }

    /// Called at a sample boundary: add one sample period.
    pub fn schedule_next(&mut self) {
        self.fract += self.step_24_8;
        self.countdown += self.fract >> 8;
        self.fract &= 0xFF;
    }
}
