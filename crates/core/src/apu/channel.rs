//! POKEY audio channel: divider, waveform gating and volume.
//!
//! A channel is a down-counter reloaded from its divisor. Every underflow is a
//! "channel event": the output may toggle depending on the AUDC gating mode and
//! the current polynomial bits. Between events nothing about the channel
//! changes, so the scheduler only has to visit it when its counter runs out.
//!
//! Divisors by clock domain:
//! - 64 kHz or 15 kHz base clock: `(AUDF + 1) * M` with M = 28 or 114
//! - chip clock, 8-bit: `AUDF + 4`
//! - chip clock, joined 16-bit: `AUDF_hi * 256 + AUDF_lo + 7`

use super::polynomial::{PolyCounters, PolyTables};
use super::registers::{audc, audctl};
use serde::{Deserialize, Serialize};

/// Counter value of a channel that never fires.
pub const NEVER: u32 = u32::MAX;

/// Chip clock to 63.9 kHz
pub const DIV_64: u32 = 28;
/// Chip clock to 15.7 kHz
pub const DIV_15: u32 = 114;

pub const DIVADD_LOCLK: u32 = 1;
pub const DIVADD_HICLK: u32 = 4;
pub const DIVADD_HICLK_JOINED: u32 = 7;

/// Base clock multiplier selected by AUDCTL.
pub fn clock_multiplier(audctl_value: u8) -> u32 {
    if audctl_value & audctl::CLK_15KHZ != 0 {
        DIV_15
    } else {
        DIV_64
    }
}

/// Reload value of channel `ch` (0..=3) for the given AUDF registers and AUDCTL.
///
/// Channels 2 and 4 take their partner's fast clock only when joined.
pub fn compute_divisor(ch: usize, audf: &[u8; 4], audctl_value: u8) -> u32 {
    debug_assert!(ch < 4, "channel index {ch} out of range");
    let mult = clock_multiplier(audctl_value);
    let f = |i: usize| audf[i] as u32;

    let (hiclk, joined) = if ch < 2 {
        (audctl::CH1_HICLK, audctl::CH12_JOINED)
    } else {
        (audctl::CH3_HICLK, audctl::CH34_JOINED)
    };
    let fast = audctl_value & hiclk != 0;

    let divisor = if ch % 2 == 0 {
        if fast {
            f(ch) + DIVADD_HICLK
        } else {
            (f(ch) + DIVADD_LOCLK) * mult
        }
    } else if audctl_value & joined != 0 {
        let wide = f(ch) * 256 + f(ch - 1);
        if fast {
            wide + DIVADD_HICLK_JOINED
        } else {
            (wide + DIVADD_LOCLK) * mult
        }
    } else {
        (f(ch) + DIVADD_LOCLK) * mult
    };

    divisor.max(1)
}

/// Inputs to a channel recompute that come from the chip as a whole.
#[derive(Debug, Clone, Copy)]
pub struct ChannelParams {
    /// Amplitude per volume step
    pub gain: u32,
    /// Whole chip-clock ticks per output sample
    pub ticks_per_sample: u32,
    /// Mark pure tones faster than the sample rate inaudible
    pub suppress_inaudible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub audf: u8,
    pub audc: u8,
    /// Reload value in chip-clock ticks, always >= 1
    pub divisor: u32,
    /// Ticks until the next channel event, or `NEVER`
    pub counter: u32,
    pub output: bool,
    /// Whether the channel is heard as an oscillator. A silent or volume-only
    /// channel still counts and toggles; this only describes the mix.
    pub audible: bool,
    /// Parked by the inaudible-tone option: counter held at `NEVER`
    #[serde(default)]
    pub parked: bool,
    pub volume: u32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            audf: 0,
            audc: 0,
            divisor: DIVADD_HICLK,
            counter: 0,
            output: false,
            audible: false,
            parked: false,
            volume: 0,
        }
    }
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a freshly computed divisor and re-derive volume and audibility.
    ///
    /// A shorter divisor cuts the current period short; a longer one lets the
    /// running count finish first. Only the inaudible-tone option takes a
    /// channel off the scheduler.
    pub fn recompute(&mut self, divisor: u32, params: &ChannelParams) {
        self.volume = (self.audc & audc::VOLUME_MASK) as u32 * params.gain;
        self.divisor = divisor.max(1);
        if self.divisor < self.counter {
            self.counter = self.divisor;
        }

        let volume_only = self.audc & audc::VOLUME_ONLY != 0;
        let silent = self.audc & audc::VOLUME_MASK == 0;
        let suppressed = params.suppress_inaudible
            && self.audc & audc::PURE != 0
            && self.divisor < params.ticks_per_sample;

        self.audible = !(volume_only || silent || suppressed);
        self.parked = suppressed && !volume_only && !silent;
        if self.parked {
            // A tone above the sample rate averages out to half amplitude
            self.output = true;
            self.counter = NEVER;
            self.volume >>= 1;
        }
    }

    /// Contribution to the mixed sum. Volume-only mode drives the DAC
    /// directly, whatever the divider output is doing.
    pub fn level(&self) -> u32 {
        if self.output || self.audc & audc::VOLUME_ONLY != 0 {
            self.volume
        } else {
            0
        }
    }

    /// Counter value after an event.
    pub fn reload_value(&self) -> u32 {
        if !self.parked {
            self.divisor
        } else {
            NEVER
        }
    }

    /// Count down by `ticks`. `NEVER` stays `NEVER`.
    pub fn elapse(&mut self, ticks: u32) {
        if self.counter != NEVER {
            debug_assert!(ticks <= self.counter);
            self.counter -= ticks;
        }
    }

    /// Run one channel event: reload the counter and apply the gating rules.
    /// Returns whether the output toggled.
    pub fn fire(&mut self, audctl_value: u8, poly: &PolyCounters, tables: &PolyTables) -> bool {
        self.counter = self.reload_value();
        if self.parked {
            return false;
        }

        let gate_open = self.audc & audc::NOT_POLY5 != 0 || tables.poly5.bit(poly.p5);
        let toggle = gate_open
            && if self.audc & audc::PURE != 0 {
                true
            } else if self.audc & audc::POLY4 != 0 {
                self.output != tables.poly4.bit(poly.p4)
            } else if audctl_value & audctl::POLY9 != 0 {
                self.output != tables.poly9.bit(poly.p9)
            } else {
                self.output != tables.poly17.bit(poly.p17)
            };

        if toggle {
            self.output = !self.output;
        }
        toggle
    }
}

/// Channel 3 or 4 index whose output high-pass filters channel `ch`, if the
/// AUDCTL filter bit for it is set.
pub fn filter_partner(ch: usize, audctl_value: u8) -> Option<usize> {
    match ch {
        0 if audctl_value & audctl::CH1_FILTER != 0 => Some(2),
        1 if audctl_value & audctl::CH2_FILTER != 0 => Some(3),
        _ => None,
    }
}

/// The four channels of one chip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSet {
    pub ch: [Channel; 4],
}

impl ChannelSet {
    pub fn audf(&self) -> [u8; 4] {
        [self.ch[0].audf, self.ch[1].audf, self.ch[2].audf, self.ch[3].audf]
    }

    pub fn counters(&self) -> [u32; 4] {
        [
            self.ch[0].counter,
            self.ch[1].counter,
            self.ch[2].counter,
            self.ch[3].counter,
        ]
    }

    pub fn divisors(&self) -> [u32; 4] {
        [
            self.ch[0].divisor,
            self.ch[1].divisor,
            self.ch[2].divisor,
            self.ch[3].divisor,
        ]
    }

    /// Recompute every channel selected in `mask` (bit n = channel n).
    pub fn recompute(&mut self, mask: u8, audctl_value: u8, params: &ChannelParams) {
        let audf = self.audf();
        for ch in 0..4 {
            if mask & (1 << ch) != 0 {
                let divisor = compute_divisor(ch, &audf, audctl_value);
                self.ch[ch].recompute(divisor, params);
            }
        }
    }

    pub fn elapse(&mut self, ticks: u32) {
        for c in &mut self.ch {
            c.elapse(ticks);
        }
    }

    /// Sum of every channel's current level.
    pub fn mix(&self) -> u32 {
        self.ch.iter().map(Channel::level).sum()
    }

    /// Channel event for `ch`, followed by the high-pass filter link: a
    /// filtered channel is held low while its partner's output is high.
    pub fn fire(&mut self, ch: usize, audctl_value: u8, poly: &mut PolyCounters, tables: &PolyTables) {
        debug_assert!(ch < 4, "channel index {ch} out of range");
        poly.catch_up();
        self.ch[ch].fire(audctl_value, poly, tables);

        match ch {
            0 | 1 => {
                if let Some(partner) = filter_partner(ch, audctl_value) {
                    if self.ch[partner].output {
                        self.ch[ch].output = false;
                    }
                }
            }
            _ => {
                let filtered = ch - 2;
                if filter_partner(filtered, audctl_value) == Some(ch) && self.ch[ch].output {
                    self.ch[filtered].output = false;
                }
            }
        }
    }

    /// Every counter back to zero (STIMER side effect).
    pub fn reset_counters(&mut self) {
        for c in &mut self.ch {
            c.counter = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ChannelParams {
        ChannelParams {
            gain: 744,
            ticks_per_sample: 40,
            suppress_inaudible: false,
        }
    }

    #[test]
    fn slow_clock_divisors() {
        let audf = [0, 9, 255, 1];
        assert_eq!(compute_divisor(0, &audf, 0), 28);
        assert_eq!(compute_divisor(1, &audf, 0), 280);
        assert_eq!(compute_divisor(2, &audf, 0), 256 * 28);
        assert_eq!(compute_divisor(0, &audf, audctl::CLK_15KHZ), 114);
        assert_eq!(compute_divisor(3, &audf, audctl::CLK_15KHZ), 2 * 114);
    }

    #[test]
    fn fast_clock_divisors() {
        let audf = [10, 20, 30, 40];
        assert_eq!(compute_divisor(0, &audf, audctl::CH1_HICLK), 14);
        assert_eq!(compute_divisor(2, &audf, audctl::CH3_HICLK), 34);
        // Unjoined channel 2 ignores the channel 1 fast clock
        assert_eq!(compute_divisor(1, &audf, audctl::CH1_HICLK), 21 * 28);
    }

    #[test]
    fn joined_divisors() {
        let audf = [0x34, 0x12, 0x78, 0x56];
        let fast12 = audctl::CH12_JOINED | audctl::CH1_HICLK;
        assert_eq!(compute_divisor(1, &audf, fast12), 0x1234 + 7);
        assert_eq!(compute_divisor(1, &audf, audctl::CH12_JOINED), (0x1234 + 1) * 28);

        let fast34 = audctl::CH34_JOINED | audctl::CH3_HICLK;
        assert_eq!(compute_divisor(3, &audf, fast34), 0x5678 + 7);
    }

    #[test]
    fn zero_volume_keeps_counting() {
        let mut c = Channel::new();
        c.audc = audc::PURE | audc::NOT_POLY5;
        c.counter = 500;
        c.recompute(100, &params());
        assert!(!c.audible);
        assert_eq!(c.counter, 100);
        assert_eq!(c.level(), 0);

        let tables = PolyTables::get();
        assert!(c.fire(0, &PolyCounters::default(), tables));
        assert!(c.output);
        assert_eq!(c.counter, 100);
        assert_eq!(c.level(), 0);
    }

    #[test]
    fn volume_only_level_ignores_the_divider() {
        let tables = PolyTables::get();
        let poly = PolyCounters::default();
        let mut c = Channel::new();
        c.audc = audc::VOLUME_ONLY | audc::PURE | audc::NOT_POLY5 | 8;
        c.recompute(100, &params());
        assert!(!c.audible);
        assert_eq!(c.level(), 8 * 744);

        c.fire(0, &poly, tables);
        c.fire(0, &poly, tables);
        assert!(!c.output);
        assert_eq!(c.level(), 8 * 744);
        assert_eq!(c.counter, 100);
    }

    #[test]
    fn shorter_divisor_clamps_counter() {
        let mut c = Channel::new();
        c.audc = audc::PURE | audc::NOT_POLY5 | 15;
        c.counter = 500;
        c.recompute(100, &params());
        assert_eq!(c.counter, 100);

        // A longer divisor leaves the running count alone
        c.counter = 50;
        c.recompute(1000, &params());
        assert_eq!(c.counter, 50);
    }

    #[test]
    fn inaudible_suppression_is_opt_in() {
        let mut c = Channel::new();
        c.audc = audc::PURE | audc::NOT_POLY5 | 15;
        c.recompute(10, &params());
        assert!(c.audible);
        assert!(!c.parked);

        let opt = ChannelParams {
            suppress_inaudible: true,
            ..params()
        };
        c.recompute(10, &opt);
        assert!(!c.audible);
        assert!(c.parked);
        assert_eq!(c.counter, NEVER);
        assert_eq!(c.level(), 15 * 744 / 2);

        // A parked channel woken by STIMER parks again without toggling
        c.counter = 0;
        assert!(!c.fire(0, &PolyCounters::default(), PolyTables::get()));
        assert_eq!(c.counter, NEVER);
        assert!(c.output);

        // Slowing below the sample rate starts a normal period
        c.recompute(400, &opt);
        assert!(c.audible);
        assert!(!c.parked);
        assert_eq!(c.counter, 400);
    }

    #[test]
    fn pure_tone_toggles_every_event() {
        let tables = PolyTables::get();
        let poly = PolyCounters::default();
        let mut c = Channel::new();
        c.audc = audc::PURE | audc::NOT_POLY5 | 15;
        c.recompute(28, &params());

        assert!(c.fire(0, &poly, tables));
        assert!(c.output);
        assert_eq!(c.counter, 28);
        assert!(c.fire(0, &poly, tables));
        assert!(!c.output);
    }

    #[test]
    fn poly_mode_follows_the_table_bit() {
        let tables = PolyTables::get();
        let mut c = Channel::new();
        c.audc = audc::POLY4 | audc::NOT_POLY5 | 15;
        c.recompute(28, &params());

        for p4 in 0..15 {
            let poly = PolyCounters {
                p4,
                ..Default::default()
            };
            c.fire(0, &poly, tables);
            assert_eq!(c.output, tables.poly4.bit(p4));
        }
    }

    #[test]
    fn poly5_gate_blocks_toggles() {
        let tables = PolyTables::get();
        // p5 = 0 is state 0, bit 0 clear: gate closed
        let poly = PolyCounters::default();
        let mut c = Channel::new();
        c.audc = audc::PURE | 15;
        c.recompute(28, &params());
        assert!(!c.fire(0, &poly, tables));
        assert!(!c.output);
    }

    #[test]
    fn filter_holds_channel_low_while_partner_high() {
        let tables = PolyTables::get();
        let mut poly = PolyCounters::default();
        let mut set = ChannelSet::default();
        for c in &mut set.ch {
            c.audc = audc::PURE | audc::NOT_POLY5 | 15;
        }
        let ctl = audctl::CH1_FILTER;
        set.recompute(0x0F, ctl, &params());

        // Channel 3 goes high, channel 1 is then held low
        set.fire(2, ctl, &mut poly, tables);
        assert!(set.ch[2].output);
        set.fire(0, ctl, &mut poly, tables);
        assert!(!set.ch[0].output);

        // Channel 3 low again: channel 1 toggles freely
        set.fire(2, ctl, &mut poly, tables);
        set.fire(0, ctl, &mut poly, tables);
        assert!(set.ch[0].output);

        // Channel 3 rising forces channel 1 low
        set.fire(2, ctl, &mut poly, tables);
        assert!(!set.ch[0].output);
    }

    #[test]
    fn silent_partner_still_filters() {
        let tables = PolyTables::get();
        let mut poly = PolyCounters::default();
        let mut set = ChannelSet::default();
        set.ch[0].audc = audc::PURE | audc::NOT_POLY5 | 15;
        set.ch[2].audc = audc::PURE | audc::NOT_POLY5;
        let ctl = audctl::CH1_FILTER;
        set.recompute(0x0F, ctl, &params());
        assert!(!set.ch[2].output);

        set.fire(0, ctl, &mut poly, tables);
        assert!(set.ch[0].output);
        assert_eq!(set.mix(), 15 * 744);

        set.fire(2, ctl, &mut poly, tables);
        assert!(set.ch[2].output);
        assert_eq!(set.mix(), 0);
    }

    #[test]
    fn mix_sums_high_outputs() {
        let mut set = ChannelSet::default();
        set.ch[0].volume = 100;
        set.ch[0].output = true;
        set.ch[1].volume = 50;
        set.ch[1].output = false;
        set.ch[3].volume = 7;
        set.ch[3].output = true;
        assert_eq!(set.mix(), 107);
    }
}
