//! POKEY chip instance: register interface, render loop and save-states.
//!
//! The chip keeps an absolute tick count and never runs on its own; time only
//! moves inside [`Pokey::render`] and [`Pokey::advance`]. Both drive the same
//! event loop. Each step jumps to whichever comes first:
//!
//! - a channel underflow or output sample boundary (see `scheduler`)
//! - a timer, serial or serial-input deadline
//! - the end of the requested window
//!
//! Deadlines due at a tick fire after every channel and sample event at that
//! tick.

use super::audio_chip::AudioChip;
use super::channel::{Channel, ChannelParams, ChannelSet};
use super::config::PokeyConfig;
use super::error::PokeyError;
use super::host::{
    AllPotOverride, InterruptSink, PokeyIo, PotProvider, SerialInProvider, SerialOutSink,
};
use super::polynomial::{advance_index, PolyCounters, PolyTables, POLY17, POLY9};
use super::pots::PotUnit;
use super::registers::{self, audctl, irq, skctl};
use super::scheduler::{next_event, Event, SampleClock};
use super::serial::SerialUnit;
use super::timers::{IrqState, TimerUnit, TIMER_IRQ};
use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

pub const SAVE_STATE_VERSION: u64 = 1;
const CHIP_TAG: &str = "pokey";

/// Highest value the mixed output reaches.
pub const OUTPUT_MAX: u32 = 32767;

#[derive(Serialize, Deserialize)]
pub struct Pokey {
    config: PokeyConfig,
    channels: ChannelSet,
    poly: PolyCounters,
    sample_clock: SampleClock,
    timers: TimerUnit,
    irq: IrqState,
    serial: SerialUnit,
    pots: PotUnit,
    audctl: u8,
    skctl: u8,
    /// RANDOM table positions
    r9: u32,
    r17: u32,
    last_random_read: u64,
    /// Chip-clock ticks since power-on
    ticks: u64,
    #[serde(skip, default = "PolyTables::get")]
    tables: &'static PolyTables,
    #[serde(skip)]
    io: PokeyIo,
}

impl Default for Pokey {
    fn default() -> Self {
        Self::build(PokeyConfig::default())
    }
}

impl fmt::Debug for Pokey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pokey")
            .field("config", &self.config)
            .field("ticks", &self.ticks)
            .field("audctl", &self.audctl)
            .field("skctl", &self.skctl)
            .field("channels", &self.channels)
            .field("irq", &self.irq)
            .field("io", &self.io)
            .finish_non_exhaustive()
    }
}

impl Pokey {
    pub fn new(config: PokeyConfig) -> Result<Self, PokeyError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PokeyConfig) -> Self {
        let sample_clock = SampleClock::new(config.clock_hz, config.sample_rate);
        let mut chip = Self {
            config,
            channels: ChannelSet::default(),
            poly: PolyCounters::default(),
            sample_clock,
            timers: TimerUnit::default(),
            irq: IrqState::default(),
            serial: SerialUnit::new(),
            pots: PotUnit::default(),
            audctl: 0,
            skctl: skctl::RESET,
            r9: 0,
            r17: 0,
            last_random_read: 0,
            ticks: 0,
            tables: PolyTables::get(),
            io: PokeyIo::default(),
        };
        chip.recompute_channels(0x0F);
        chip
    }

    /// Back to power-on state. Installed hooks stay.
    pub fn reset(&mut self) {
        let io = std::mem::take(&mut self.io);
        *self = Self::build(self.config.clone());
        self.io = io;
    }

    pub fn config(&self) -> &PokeyConfig {
        &self.config
    }

    pub fn io_mut(&mut self) -> &mut PokeyIo {
        &mut self.io
    }

    /// Absolute virtual time in chip-clock ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn channel(&self, n: usize) -> &Channel {
        &self.channels.ch[n]
    }

    /// IRQST, active-high
    pub fn irq_pending(&self) -> u8 {
        self.irq.pending
    }

    pub fn irq_enable(&self) -> u8 {
        self.irq.enable
    }

    fn params(&self) -> ChannelParams {
        ChannelParams {
            gain: self.config.gain,
            ticks_per_sample: self.sample_clock.ticks_per_sample(),
            suppress_inaudible: self.config.suppress_inaudible,
        }
    }

    fn recompute_channels(&mut self, mask: u8) {
        let params = self.params();
        self.channels.recompute(mask, self.audctl, &params);
        let divisors = self.channels.divisors();
        let counters = self.channels.counters();
        self.timers.retune(&divisors, &counters, self.audctl, self.ticks);
        log(LogCategory::Channels, LogLevel::Trace, || {
            format!("recompute {mask:#03x}: divisors {divisors:?}")
        });
    }

    // ---- register interface ----

    /// CPU write. Only the low four address bits are decoded.
    pub fn write(&mut self, offset: u8, data: u8) {
        let offset = offset & 0x0F;
        log(LogCategory::Registers, LogLevel::Trace, || {
            format!(
                "{} <- {data:#04x} at tick {}",
                registers::write_name(offset),
                self.ticks
            )
        });

        match offset {
            registers::AUDF1 | registers::AUDF2 | registers::AUDF3 | registers::AUDF4 => {
                self.write_audf((offset >> 1) as usize, data)
            }
            registers::AUDC1 | registers::AUDC2 | registers::AUDC3 | registers::AUDC4 => {
                self.write_audc((offset >> 1) as usize, data)
            }
            registers::AUDCTL => {
                if data != self.audctl {
                    self.audctl = data;
                    self.recompute_channels(0x0F);
                }
            }
            registers::STIMER => self.rearm_timers(),
            registers::SKREST => self.serial.reset_status(),
            registers::POTGO => self.potgo(),
            registers::SEROUT => self.write_serout(data),
            registers::IRQEN => self.write_irqen(data),
            registers::SKCTL => self.write_skctl(data),
            _ => {}
        }
    }

    /// Program one channel in a single call: AUDCTL first, then AUDF and
    /// AUDC, the order a driver would write them.
    pub fn configure(&mut self, ch: usize, audf: u8, audc: u8, audctl_value: u8) {
        debug_assert!(ch < 4, "channel index {ch} out of range");
        let base = (ch as u8) << 1;
        self.write(registers::AUDCTL, audctl_value);
        self.write(base, audf);
        self.write(base + 1, audc);
    }

    fn write_audf(&mut self, ch: usize, data: u8) {
        if self.channels.ch[ch].audf == data {
            return;
        }
        self.channels.ch[ch].audf = data;

        // The low byte of a joined pair also feeds the high channel
        let joined = if ch < 2 {
            audctl::CH12_JOINED
        } else {
            audctl::CH34_JOINED
        };
        let mut mask = 1 << ch;
        if ch % 2 == 0 && self.audctl & joined != 0 {
            mask |= 1 << (ch + 1);
        }
        self.recompute_channels(mask);
    }

    fn write_audc(&mut self, ch: usize, data: u8) {
        if self.channels.ch[ch].audc == data {
            return;
        }
        self.channels.ch[ch].audc = data;
        self.recompute_channels(1 << ch);
    }

    fn rearm_timers(&mut self) {
        self.poly.clear_pending();
        self.channels.reset_counters();
        let divisors = self.channels.divisors();
        self.timers.rearm_all(&divisors, self.audctl, self.ticks);
        log(LogCategory::Timers, LogLevel::Debug, || {
            let deadlines = self.timers.timers.iter().map(|t| t.deadline);
            format!(
                "STIMER at tick {}: deadlines {:?}",
                self.ticks,
                deadlines.collect::<Vec<_>>()
            )
        });
    }

    fn potgo(&mut self) {
        let provider = &mut self.io.pots;
        self.pots.potgo(self.ticks, self.skctl, |n| {
            provider.as_mut().and_then(|p| p.read(n))
        });
        log(LogCategory::Pots, LogLevel::Debug, || {
            let targets: Vec<_> = self
                .pots
                .pots
                .iter()
                .map(|p| p.deadline.map(|_| p.target))
                .collect();
            format!("POTGO at tick {}: targets {targets:?}", self.ticks)
        });
    }

    fn write_serout(&mut self, data: u8) {
        self.serial
            .write_serout(data, self.ticks, self.config.clock_hz);
        log(LogCategory::Serial, LogLevel::Debug, || {
            format!("SEROUT {data:#04x} at tick {}", self.ticks)
        });
        if let Some(sink) = self.io.serial_out.as_mut() {
            sink.write(data);
        }
    }

    fn write_irqen(&mut self, data: u8) {
        // Disabling a source also acknowledges it
        self.irq.acknowledge(!data);
        self.irq.set_enable(data);
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("IRQEN {data:#04x}, pending {:#04x}", self.irq.pending)
        });
    }

    fn write_skctl(&mut self, data: u8) {
        if data == self.skctl {
            return;
        }
        self.skctl = data;
        if data & skctl::RESET == 0 {
            log(LogCategory::Serial, LogLevel::Debug, || {
                "SKCTL reset: IRQEN cleared, status reset".to_string()
            });
            self.write(registers::IRQEN, 0);
            self.write(registers::SKREST, 0);
        }
    }

    /// CPU read. Some reads have side effects: RANDOM moves its table position
    /// and SERIN pulls from the serial-input provider.
    pub fn read(&mut self, offset: u8) -> u8 {
        let offset = offset & 0x0F;
        let data = match offset {
            registers::POT0..=registers::POT7 => self.pots.read(offset as usize, self.ticks),
            registers::ALLPOT => match self.io.allpot.as_mut().and_then(|o| o.read()) {
                Some(value) => value,
                None => self.pots.allpot(self.ticks),
            },
            registers::KBCODE => self.serial.kbcode,
            registers::RANDOM => self.read_random(),
            registers::SERIN => self.read_serin(),
            registers::IRQST => self.irq.status(),
            registers::SKSTAT => self.serial.skstat(),
            _ => 0,
        };
        log(LogCategory::Registers, LogLevel::Trace, || {
            format!("read {offset:#03x} -> {data:#04x} at tick {}", self.ticks)
        });
        data
    }

    /// SERIN: the next byte from the serial-input provider, or the last one
    /// received when no provider is installed.
    pub fn read_serin(&mut self) -> u8 {
        if let Some(provider) = self.io.serial_in.as_mut() {
            self.serial.serin = provider.read();
        }
        self.serial.serin
    }

    fn read_random(&mut self) -> u8 {
        let elapsed = self.ticks - self.last_random_read;
        self.last_random_read = self.ticks;

        if self.skctl & skctl::RESET != 0 {
            self.r9 = advance_index(self.r9, elapsed, &POLY9);
            self.r17 = advance_index(self.r17, elapsed, &POLY17);
        } else {
            // Held in reset
            self.r9 = 0;
            self.r17 = 0;
        }

        let value = if self.audctl & audctl::POLY9 != 0 {
            self.tables.rand9.get(self.r9)
        } else {
            self.tables.rand17.get(self.r17)
        };
        value ^ 0xFF
    }

    // ---- host-side events ----

    /// Keyboard scan result from the host.
    pub fn key_event(&mut self, code: u8, pressed: bool) {
        let overrun = pressed
            && self.irq.enable & irq::KEYBOARD != 0
            && self.irq.pending & irq::KEYBOARD != 0;
        self.serial.key_event(code, pressed, overrun);
        log(LogCategory::Serial, LogLevel::Debug, || {
            format!("key {code:#04x} pressed={pressed} overrun={overrun}")
        });
        if pressed {
            self.raise_irq(irq::KEYBOARD);
        }
    }

    pub fn break_event(&mut self, shift: bool) {
        self.serial.set_shift(shift);
        self.raise_irq(irq::BREAK);
    }

    /// Announce a serial input byte `after_ticks` from now.
    pub fn serin_ready(&mut self, after_ticks: u64) {
        self.serial.schedule_serin(self.ticks, after_ticks);
    }

    /// Clear pending IRQ bits without touching IRQEN.
    pub fn acknowledge_irq(&mut self, mask: u8) {
        self.irq.acknowledge(mask);
    }

    fn raise_irq(&mut self, bits: u8) {
        if let Some(report) = self.irq.raise(bits) {
            log(LogCategory::Interrupts, LogLevel::Debug, || {
                format!(
                    "irq {bits:#04x} latched at tick {}, reporting {report:#04x}",
                    self.ticks
                )
            });
            if let Some(sink) = self.io.interrupt.as_mut() {
                sink.raise(report);
            }
        }
    }

    // ---- time ----

    fn next_deadline(&self) -> Option<u64> {
        [self.timers.next_deadline(), self.serial.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    fn next_event(&self) -> (Event, u32) {
        next_event(&self.channels.counters(), self.sample_clock.countdown)
    }

    /// Ticks until the next channel or sample event.
    fn next_delta(&self) -> u32 {
        self.next_event().1
    }

    fn elapse(&mut self, ticks: u32) {
        self.channels.elapse(ticks);
        self.sample_clock.elapse(ticks);
        self.poly.elapse(ticks as u64);
        self.ticks += ticks as u64;
    }

    fn fire_due_deadlines(&mut self) {
        let now = self.ticks;
        for id in 0..TIMER_IRQ.len() {
            if self.timers.take_due(id, now) {
                self.tick_expired(id);
            }
        }
        while let Some(event) = self.serial.pop_due(now) {
            log(LogCategory::Serial, LogLevel::Debug, || {
                format!("{event:?} at tick {now}")
            });
            self.raise_irq(event.irq());
        }
    }

    fn tick_expired(&mut self, id: usize) {
        log(LogCategory::Timers, LogLevel::Debug, || {
            format!("timer {id} expired at tick {}", self.ticks)
        });
        self.raise_irq(TIMER_IRQ[id]);
    }

    fn mixed_sample(&self) -> i16 {
        self.channels.mix().min(OUTPUT_MAX) as i16
    }

    /// One loop step, never passing tick `limit`. Returns the sample emitted,
    /// if this step reached a sample boundary.
    fn step(&mut self, limit: u64) -> Option<i16> {
        let (event, delta) = self.next_event();
        let mut horizon = limit - self.ticks;
        if let Some(deadline) = self.next_deadline() {
            horizon = horizon.min(deadline.saturating_sub(self.ticks));
        }

        let mut sample = None;
        if delta as u64 <= horizon {
            self.elapse(delta);
            match event {
                Event::Channel(ch) => {
                    self.channels
                        .fire(ch, self.audctl, &mut self.poly, self.tables);
                }
                Event::Sample => {
                    sample = Some(self.mixed_sample());
                    self.sample_clock.schedule_next();
                }
            }
        } else {
            // horizon < delta, so it fits
            self.elapse(horizon as u32);
        }
        if self.next_delta() > 0 {
            self.fire_due_deadlines();
        }
        sample
    }

    /// Fill `buffer` with samples, running as many ticks as that takes.
    pub fn render(&mut self, buffer: &mut [i16]) {
        let mut filled = 0;
        while filled < buffer.len() {
            if let Some(sample) = self.step(u64::MAX) {
                buffer[filled] = sample;
                filled += 1;
            }
        }
    }

    /// Run exactly `ticks` chip-clock ticks, appending the samples that fall
    /// inside the window. Everything due at the final tick is handled before
    /// returning, so splitting a run into smaller calls changes nothing.
    pub fn advance(&mut self, ticks: u64, out: &mut Vec<i16>) {
        let end = self.ticks + ticks;
        loop {
            if self.ticks >= end && self.next_delta() > 0 {
                self.fire_due_deadlines();
                break;
            }
            if let Some(sample) = self.step(end) {
                out.push(sample);
            }
        }
    }

    // ---- save-states ----

    pub fn save_state(&self) -> Value {
        json!({
            "version": SAVE_STATE_VERSION,
            "chip": CHIP_TAG,
            "state": self,
        })
    }

    /// Restore a blob from [`Pokey::save_state`]. Installed hooks stay.
    pub fn load_state(&mut self, v: &Value) -> Result<(), PokeyError> {
        let version = v["version"].as_u64().unwrap_or(0);
        if version != SAVE_STATE_VERSION {
            return Err(PokeyError::IncompatibleState(format!(
                "unsupported version {version}"
            )));
        }
        let chip = v["chip"].as_str().unwrap_or("");
        if chip != CHIP_TAG {
            return Err(PokeyError::IncompatibleState(format!(
                "state is for chip {chip:?}"
            )));
        }

        let mut loaded = Pokey::deserialize(&v["state"])?;
        loaded.config.validate()?;
        loaded.io = std::mem::take(&mut self.io);
        *self = loaded;
        Ok(())
    }
}

impl AudioChip for Pokey {
    fn write_register(&mut self, addr: u16, val: u8) {
        self.write(addr as u8, val);
    }

    fn read_register(&mut self, addr: u16) -> u8 {
        self.read(addr as u8)
    }

    fn render(&mut self, buffer: &mut [i16]) {
        Pokey::render(self, buffer);
    }

    fn reset(&mut self) {
        Pokey::reset(self);
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}
