//! POKEY register map and bit assignments.
//!
//! Only the low four address bits are decoded; the same offset means
//! different things on the read and write side.

// Write side
pub const AUDF1: u8 = 0x00;
pub const AUDC1: u8 = 0x01;
pub const AUDF2: u8 = 0x02;
pub const AUDC2: u8 = 0x03;
pub const AUDF3: u8 = 0x04;
pub const AUDC3: u8 = 0x05;
pub const AUDF4: u8 = 0x06;
pub const AUDC4: u8 = 0x07;
pub const AUDCTL: u8 = 0x08;
pub const STIMER: u8 = 0x09;
pub const SKREST: u8 = 0x0A;
pub const POTGO: u8 = 0x0B;
pub const SEROUT: u8 = 0x0D;
pub const IRQEN: u8 = 0x0E;
pub const SKCTL: u8 = 0x0F;

// Read side
pub const POT0: u8 = 0x00;
pub const POT7: u8 = 0x07;
pub const ALLPOT: u8 = 0x08;
pub const KBCODE: u8 = 0x09;
pub const RANDOM: u8 = 0x0A;
pub const SERIN: u8 = 0x0D;
pub const IRQST: u8 = 0x0E;
pub const SKSTAT: u8 = 0x0F;

/// AUDCx bits
pub mod audc {
    /// Bypass the 5-bit polynomial gate
    pub const NOT_POLY5: u8 = 0x80;
    /// Gate with the 4-bit polynomial instead of the 9/17-bit one
    pub const POLY4: u8 = 0x40;
    /// Pure tone: toggle on every divider underflow
    pub const PURE: u8 = 0x20;
    /// Force the output high, volume acts as a DAC level
    pub const VOLUME_ONLY: u8 = 0x10;
    pub const VOLUME_MASK: u8 = 0x0F;
}

/// AUDCTL bits
pub mod audctl {
    /// 9-bit polynomial replaces the 17-bit one
    pub const POLY9: u8 = 0x80;
    pub const CH1_HICLK: u8 = 0x40;
    pub const CH3_HICLK: u8 = 0x20;
    pub const CH12_JOINED: u8 = 0x10;
    pub const CH34_JOINED: u8 = 0x08;
    /// Channel 1 high-pass filtered by channel 3
    pub const CH1_FILTER: u8 = 0x04;
    /// Channel 2 high-pass filtered by channel 4
    pub const CH2_FILTER: u8 = 0x02;
    pub const CLK_15KHZ: u8 = 0x01;
}

/// IRQEN / IRQST bits
pub mod irq {
    pub const BREAK: u8 = 0x80;
    pub const KEYBOARD: u8 = 0x40;
    pub const SERIN: u8 = 0x20;
    pub const SEROUT_READY: u8 = 0x10;
    pub const SEROUT_COMPLETE: u8 = 0x08;
    pub const TIMER4: u8 = 0x04;
    pub const TIMER2: u8 = 0x02;
    pub const TIMER1: u8 = 0x01;
}

/// SKSTAT bits (active-high internally, inverted on read)
pub mod skstat {
    pub const FRAME: u8 = 0x80;
    pub const OVERRUN: u8 = 0x40;
    pub const KB_OVERRUN: u8 = 0x20;
    pub const SERIN_HIGH: u8 = 0x10;
    pub const SHIFT: u8 = 0x08;
    pub const KEY_DOWN: u8 = 0x04;
    pub const SEROUT_ACTIVE: u8 = 0x02;

    /// Sticky error bits, cleared only by SKREST
    pub const ERRORS: u8 = FRAME | OVERRUN | KB_OVERRUN;
}

/// SKCTL bits
pub mod skctl {
    pub const BREAK: u8 = 0x80;
    pub const BAUD_MASK: u8 = 0x70;
    pub const FM: u8 = 0x08;
    pub const FAST_POTS: u8 = 0x04;
    /// Both bits clear hold the serial/keyboard/random logic in reset
    pub const RESET: u8 = 0x03;
}

/// Human-readable name of a write register, for logging.
pub fn write_name(offset: u8) -> &'static str {
    match offset & 0x0F {
        AUDF1 => "AUDF1",
        AUDC1 => "AUDC1",
        AUDF2 => "AUDF2",
        AUDC2 => "AUDC2",
        AUDF3 => "AUDF3",
        AUDC3 => "AUDC3",
        AUDF4 => "AUDF4",
        AUDC4 => "AUDC4",
        AUDCTL => "AUDCTL",
        STIMER => "STIMER",
        SKREST => "SKREST",
        POTGO => "POTGO",
        SEROUT => "SEROUT",
        IRQEN => "IRQEN",
        SKCTL => "SKCTL",
        _ => "unused",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_names_cover_the_map() {
        assert_eq!(write_name(AUDF1), "AUDF1");
        assert_eq!(write_name(0x18), "AUDCTL"); // mirrored
        assert_eq!(write_name(0x0C), "unused");
    }
}
