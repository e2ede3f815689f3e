//! POKEY sound, timer and I/O chip.
//!
//! ## Components
//!
//! - **Channels**: four divider-driven square/noise generators
//! - **Polynomials**: precomputed LFSR tables for noise gating and RANDOM
//! - **Scheduler**: next-event search with a fixed tie-break order
//! - **Timers**: the three IRQ timers derived from channels 1, 2 and 4
//! - **Serial**: SEROUT/SERIN timing, keyboard latch and SKSTAT
//! - **Pots**: paddle conversion timing and ALLPOT
//!
//! ## Chips
//!
//! - **Pokey**: one chip with its register interface and render loop
//! - **PokeyBank**: up to four chips behind linear or quad address decoding
//! - **AudioChip trait**: common interface both implement
//!
//! ## Timing Support
//!
//! The chip clock is a configuration value; `TimingMode` provides the NTSC
//! and PAL presets.

pub mod audio_chip;
pub mod bank;
pub mod channel;
pub mod config;
pub mod error;
pub mod host;
pub mod pokey;
pub mod polynomial;
pub mod pots;
pub mod registers;
pub mod scheduler;
pub mod serial;
pub mod timers;
pub mod timing;

pub use audio_chip::AudioChip;
pub use bank::{Decode, PokeyBank};
pub use channel::{Channel, ChannelSet};
pub use config::PokeyConfig;
pub use error::PokeyError;
pub use host::{
    AllPotOverride, InterruptSink, PokeyIo, PotProvider, SerialInProvider, SerialOutSink,
};
pub use pokey::Pokey;
pub use polynomial::{PolyCounters, PolyTables};
pub use timing::TimingMode;
