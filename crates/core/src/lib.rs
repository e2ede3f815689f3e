//! POKEY sound chip emulation: tone/noise channels, IRQ timers, serial and
//! paddle timing behind a register interface.

pub mod apu;
pub mod logging;

pub mod types {
    pub type AudioSample = i16;
}

pub use apu::{AudioChip, Decode, Pokey, PokeyBank, PokeyConfig, PokeyError, TimingMode};
