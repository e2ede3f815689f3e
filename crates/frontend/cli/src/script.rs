//! Register scripts: timed register writes and paddle values, played into a
//! chip to produce a sample stream.
//!
//! ```json
//! {
//!   "duration_ms": 1000,
//!   "pots": [120, null, 64],
//!   "writes": [
//!     { "at_ms": 0,   "reg": 8, "value": 1 },
//!     { "at_ms": 0,   "reg": 1, "value": 175 },
//!     { "at_ms": 500, "reg": 1, "value": 0 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use pokey_core::Pokey;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWrite {
    pub at_ms: u64,
    pub reg: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub duration_ms: u64,
    #[serde(default)]
    pub writes: Vec<TimedWrite>,
    /// Paddle targets by input; missing or null means unconnected
    #[serde(default)]
    pub pots: Vec<Option<u8>>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let script = serde_json::from_str(&text)
            .with_context(|| format!("parsing script {}", path.display()))?;
        Ok(script)
    }

    /// Writes in time order; writes at the same time keep script order.
    pub fn sorted_writes(&self) -> Vec<TimedWrite> {
        let mut writes = self.writes.clone();
        writes.sort_by_key(|w| w.at_ms);
        writes
    }
}

pub fn ms_to_ticks(clock_hz: u32, ms: u64) -> u64 {
    clock_hz as u64 * ms / 1000
}

/// Play `script` into `chip` from its current time and return the samples.
pub fn play(chip: &mut Pokey, script: &Script) -> Vec<i16> {
    let clock = chip.config().clock_hz;
    let start = chip.ticks();
    let pots = script.pots.clone();
    chip.io_mut()
        .set_pot_provider(move |n: usize| pots.get(n).copied().flatten());

    let mut samples = Vec::new();
    for write in script.sorted_writes() {
        let at = start + ms_to_ticks(clock, write.at_ms);
        if at > chip.ticks() {
            chip.advance(at - chip.ticks(), &mut samples);
        }
        log::debug!(
            "t={}ms reg {:#03x} <- {:#04x}",
            write.at_ms,
            write.reg,
            write.value
        );
        chip.write(write.reg, write.value);
    }

    let end = start + ms_to_ticks(clock, script.duration_ms);
    if end > chip.ticks() {
        chip.advance(end - chip.ticks(), &mut samples);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokey_core::apu::registers::{audc, audctl, ALLPOT, AUDC1, AUDCTL, POTGO};

    fn script(writes: Vec<TimedWrite>, duration_ms: u64) -> Script {
        Script {
            duration_ms,
            writes,
            pots: Vec::new(),
        }
    }

    #[test]
    fn parses_with_defaults() {
        let s: Script = serde_json::from_str(r#"{"duration_ms": 250}"#).unwrap();
        assert_eq!(s.duration_ms, 250);
        assert!(s.writes.is_empty());
        assert!(s.pots.is_empty());
    }

    #[test]
    fn writes_are_stable_sorted() {
        let s = script(
            vec![
                TimedWrite { at_ms: 10, reg: 1, value: 1 },
                TimedWrite { at_ms: 0, reg: 2, value: 2 },
                TimedWrite { at_ms: 10, reg: 3, value: 3 },
            ],
            20,
        );
        let regs: Vec<u8> = s.sorted_writes().iter().map(|w| w.reg).collect();
        assert_eq!(regs, vec![2, 1, 3]);
    }

    #[test]
    fn plays_for_the_full_duration() {
        let mut chip = Pokey::default();
        let s = script(
            vec![
                TimedWrite { at_ms: 0, reg: AUDC1, value: audc::VOLUME_ONLY | 4 },
                TimedWrite { at_ms: 50, reg: AUDC1, value: 0 },
            ],
            100,
        );
        let samples = play(&mut chip, &s);
        assert_eq!(chip.ticks(), ms_to_ticks(1_789_790, 100));
        assert!((4405..=4415).contains(&samples.len()), "{} samples", samples.len());
        assert_eq!(samples[0], 4 * 744);
        assert_eq!(*samples.last().unwrap(), 0);
    }

    #[test]
    fn pots_come_from_the_script() {
        let mut chip = Pokey::default();
        let s = Script {
            duration_ms: 50,
            writes: vec![
                TimedWrite { at_ms: 0, reg: AUDCTL, value: audctl::CLK_15KHZ },
                TimedWrite { at_ms: 0, reg: POTGO, value: 0 },
            ],
            pots: vec![Some(10), None],
        };
        play(&mut chip, &s);
        // Pot 0 finished, pot 1 unconnected, pots 2..7 absent
        assert_eq!(chip.read(ALLPOT), 0xFE);
    }
}
