//! Audio chip trait for pluggable audio implementations.
//!
//! Drivers that only need "write registers, pull samples" program against
//! this trait, so a single chip and a multi-chip bank can be swapped freely.

/// A sample-producing sound chip on a CPU bus.
pub trait AudioChip {
    /// Write to a register on the audio chip
    fn write_register(&mut self, addr: u16, val: u8);

    /// Read a register. Reads can have side effects (RANDOM, SERIN), hence
    /// `&mut self`.
    fn read_register(&mut self, addr: u16) -> u8 {
        let _ = addr;
        0
    }

    /// Fill `buffer` with output samples
    fn render(&mut self, buffer: &mut [i16]);

    /// Generate `count` samples into a fresh buffer
    fn generate_samples(&mut self, count: usize) -> Vec<i16> {
        let mut samples = vec![0; count];
        self.render(&mut samples);
        samples
    }

    /// Reset the chip to power-on state
    fn reset(&mut self);

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;
}
