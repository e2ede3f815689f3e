//! Several POKEYs sharing one address window.
//!
//! Boards with more than one chip either give each chip its own 16-byte
//! block (linear decode) or pack four chips into 64 bytes, with address
//! bit 5 selecting the upper half of every chip's registers (quad decode).

use super::audio_chip::AudioChip;
use super::config::PokeyConfig;
use super::error::PokeyError;
use super::pokey::{Pokey, OUTPUT_MAX};
use serde_json::{json, Value};

pub const MAX_CHIPS: usize = 4;

/// `(chip, register)` for a linearly decoded address.
pub fn decode_linear(addr: u16) -> (usize, u8) {
    ((addr >> 4) as usize, (addr & 0x0F) as u8)
}

/// `(chip, register)` for a quad-decoded address.
pub fn decode_quad(addr: u16) -> (usize, u8) {
    let chip = ((addr >> 3) & !4) as usize;
    let reg = (addr & 0x07) | ((addr & 0x20) >> 2);
    (chip, reg as u8)
}

/// Address layout of a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decode {
    #[default]
    Linear,
    Quad,
}

impl Decode {
    pub fn decode(self, addr: u16) -> (usize, u8) {
        match self {
            Decode::Linear => decode_linear(addr),
            Decode::Quad => decode_quad(addr),
        }
    }
}

#[derive(Debug)]
pub struct PokeyBank {
    chips: Vec<Pokey>,
    decode: Decode,
    scratch: Vec<i16>,
    sums: Vec<i32>,
}

impl PokeyBank {
    pub fn new(count: usize, config: &PokeyConfig, decode: Decode) -> Result<Self, PokeyError> {
        if count == 0 || count > MAX_CHIPS {
            return Err(PokeyError::InvalidConfig(format!(
                "bank holds 1 to {MAX_CHIPS} chips, not {count}"
            )));
        }
        let chips = (0..count)
            .map(|_| Pokey::new(config.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            chips,
            decode,
            scratch: Vec::new(),
            sums: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn chip(&self, n: usize) -> Option<&Pokey> {
        self.chips.get(n)
    }

    pub fn chip_mut(&mut self, n: usize) -> Option<&mut Pokey> {
        self.chips.get_mut(n)
    }

    /// Bus write; addresses past the last chip are ignored.
    pub fn write(&mut self, addr: u16, data: u8) {
        let (chip, reg) = self.decode.decode(addr);
        if let Some(chip) = self.chips.get_mut(chip) {
            chip.write(reg, data);
        }
    }

    /// Bus read; addresses past the last chip read 0.
    pub fn read(&mut self, addr: u16) -> u8 {
        let (chip, reg) = self.decode.decode(addr);
        self.chips.get_mut(chip).map_or(0, |chip| chip.read(reg))
    }

    /// Render every chip and sum the streams, clamped to the output range.
    pub fn render_mixed(&mut self, buffer: &mut [i16]) {
        self.scratch.resize(buffer.len(), 0);
        self.sums.clear();
        self.sums.resize(buffer.len(), 0);
        for chip in &mut self.chips {
            chip.render(&mut self.scratch);
            for (sum, &s) in self.sums.iter_mut().zip(&self.scratch) {
                *sum += s as i32;
            }
        }
        for (out, &sum) in buffer.iter_mut().zip(&self.sums) {
            *out = sum.min(OUTPUT_MAX as i32) as i16;
        }
    }

    pub fn save_state(&self) -> Value {
        let chips: Vec<Value> = self.chips.iter().map(Pokey::save_state).collect();
        json!({ "chips": chips })
    }

    /// Restore a blob from [`PokeyBank::save_state`]; it must hold the same
    /// number of chips.
    pub fn load_state(&mut self, v: &Value) -> Result<(), PokeyError> {
        let states = v["chips"]
            .as_array()
            .ok_or_else(|| PokeyError::IncompatibleState("missing chip list".into()))?;
        if states.len() != self.chips.len() {
            return Err(PokeyError::IncompatibleState(format!(
                "state has {} chips, bank has {}",
                states.len(),
                self.chips.len()
            )));
        }
        for (chip, state) in self.chips.iter_mut().zip(states) {
            chip.load_state(state)?;
        }
        Ok(())
    }
}

impl AudioChip for PokeyBank {
    fn write_register(&mut self, addr: u16, val: u8) {
        self.write(addr, val);
    }

    fn read_register(&mut self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn render(&mut self, buffer: &mut [i16]) {
        self.render_mixed(buffer);
    }

    fn reset(&mut self) {
        for chip in &mut self.chips {
            chip.reset();
        }
    }

    fn sample_rate(&self) -> u32 {
        self.chips
            .first()
            .map_or(0, |chip| chip.config().sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apu::registers::{audc, AUDC1, AUDF3, KBCODE};

    #[test]
    fn linear_decode() {
        assert_eq!(decode_linear(0x00), (0, 0));
        assert_eq!(decode_linear(0x1F), (1, 0x0F));
        assert_eq!(decode_linear(0x38), (3, 0x08));
    }

    #[test]
    fn quad_decode() {
        assert_eq!(decode_quad(0x00), (0, 0));
        assert_eq!(decode_quad(0x0A), (1, 2));
        assert_eq!(decode_quad(0x17), (2, 7));
        assert_eq!(decode_quad(0x18), (3, 0));
        // Bit 5 selects registers 8..15 of the same chip
        assert_eq!(decode_quad(0x20), (0, 8));
        assert_eq!(decode_quad(0x2F), (1, 0x0F));
        assert_eq!(decode_quad(0x3E), (3, 0x0E));
    }

    #[test]
    fn rejects_bad_sizes() {
        let config = PokeyConfig::default();
        assert!(PokeyBank::new(0, &config, Decode::Linear).is_err());
        assert!(PokeyBank::new(5, &config, Decode::Linear).is_err());
        assert_eq!(PokeyBank::new(4, &config, Decode::Quad).unwrap().len(), 4);
    }

    #[test]
    fn writes_reach_the_decoded_chip() {
        let mut bank = PokeyBank::new(2, &PokeyConfig::default(), Decode::Linear).unwrap();
        bank.write(0x10 | AUDF3 as u16, 0x42);
        assert_eq!(bank.chip(1).unwrap().channel(2).audf, 0x42);
        assert_eq!(bank.chip(0).unwrap().channel(2).audf, 0);

        // Chip 3 does not exist
        bank.write(0x30, 0x42);
        assert_eq!(bank.read(0x30 | KBCODE as u16), 0);
        assert_eq!(bank.read(0x10 | KBCODE as u16), 0x09);
    }

    #[test]
    fn mixed_output_sums_and_clamps() {
        let mut bank = PokeyBank::new(2, &PokeyConfig::default(), Decode::Linear).unwrap();
        bank.write(AUDC1 as u16, audc::VOLUME_ONLY | 4);
        bank.write(0x10 | AUDC1 as u16, audc::VOLUME_ONLY | 2);
        let mut buf = [0i16; 8];
        bank.render_mixed(&mut buf);
        assert!(buf.iter().all(|&s| s == 6 * 744));

        let mut bank = PokeyBank::new(4, &PokeyConfig::default(), Decode::Quad).unwrap();
        for chip in 0..4u16 {
            for reg in [0x01u16, 0x03, 0x05, 0x07] {
                bank.write(chip * 8 + reg, audc::VOLUME_ONLY | 15);
            }
        }
        bank.render_mixed(&mut buf);
        assert!(buf.iter().all(|&s| s == 32767));
    }

    #[test]
    fn mixed_render_across_buffer_sizes() {
        let mut bank = PokeyBank::new(2, &PokeyConfig::default(), Decode::Linear).unwrap();
        bank.write(AUDC1 as u16, audc::VOLUME_ONLY | 3);
        bank.write(0x10 | AUDC1 as u16, audc::VOLUME_ONLY | 5);

        let mut long = [0i16; 64];
        bank.render_mixed(&mut long);
        let mut short = [0i16; 5];
        bank.render_mixed(&mut short);
        assert!(short.iter().all(|&s| s == 8 * 744));
        bank.render_mixed(&mut long);
        assert!(long.iter().all(|&s| s == 8 * 744));
    }

    #[test]
    fn bank_state_round_trip() {
        let mut bank = PokeyBank::new(2, &PokeyConfig::default(), Decode::Linear).unwrap();
        bank.write(0x10 | AUDF3 as u16, 7);
        let saved = bank.save_state();
        bank.write(0x10 | AUDF3 as u16, 9);
        bank.load_state(&saved).unwrap();
        assert_eq!(bank.chip(1).unwrap().channel(2).audf, 7);

        let mut small = PokeyBank::new(1, &PokeyConfig::default(), Decode::Linear).unwrap();
        assert!(small.load_state(&saved).is_err());
    }
}
