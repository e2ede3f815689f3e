//! Chip construction parameters.

use super::error::PokeyError;
use super::timing::TimingMode;
use serde::{Deserialize, Serialize};

/// Amplitude of one volume step: four channels at volume 15 plus headroom
/// stay within 16 bits.
pub const DEFAULT_GAIN: u32 = 32767 / 11 / 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokeyConfig {
    /// Chip clock in Hz
    pub clock_hz: u32,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Treat pure tones above the sample rate as a constant half-level
    pub suppress_inaudible: bool,
    /// Amplitude per volume step
    pub gain: u32,
}

impl Default for PokeyConfig {
    fn default() -> Self {
        Self {
            clock_hz: TimingMode::Ntsc.clock_hz(),
            sample_rate: 44_100,
            suppress_inaudible: false,
            gain: DEFAULT_GAIN,
        }
    }
}

impl PokeyConfig {
    pub fn for_timing(timing: TimingMode, sample_rate: u32) -> Self {
        Self {
            clock_hz: timing.clock_hz(),
            sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PokeyError> {
        if self.clock_hz == 0 {
            return Err(PokeyError::InvalidConfig("clock_hz must be non-zero".into()));
        }
        if self.sample_rate == 0 {
            return Err(PokeyError::InvalidConfig(
                "sample_rate must be non-zero".into(),
            ));
        }
        if self.sample_rate > self.clock_hz {
            return Err(PokeyError::InvalidConfig(format!(
                "sample_rate {} exceeds clock_hz {}",
                self.sample_rate, self.clock_hz
            )));
        }
        Ok(())
    }
}
