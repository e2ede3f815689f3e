//! Host-side hooks: everything the chip needs from the machine around it.
//!
//! Each hook is optional. A chip without an interrupt sink still latches
//! IRQST, one without a pot provider leaves every paddle unconnected, and so
//! on. Closures implement the traits directly, so a driver can wire a chip up
//! with `io.set_interrupt_sink(move |mask| ...)`.

use std::fmt;

/// Receives the enabled pending IRQ set each time a new bit is latched.
pub trait InterruptSink {
    fn raise(&mut self, mask: u8);
}

/// Paddle position for input `pot`, `None` when nothing is connected.
pub trait PotProvider {
    fn read(&mut self, pot: usize) -> Option<u8>;
}

/// Replaces the ALLPOT register when it returns a value.
pub trait AllPotOverride {
    fn read(&mut self) -> Option<u8>;
}

/// Supplies the byte seen by a SERIN read.
pub trait SerialInProvider {
    fn read(&mut self) -> u8;
}

/// Takes each byte written to SEROUT.
pub trait SerialOutSink {
    fn write(&mut self, byte: u8);
}

impl<F: FnMut(u8)> InterruptSink for F {
    fn raise(&mut self, mask: u8) {
        self(mask)
    }
}

impl<F: FnMut(usize) -> Option<u8>> PotProvider for F {
    fn read(&mut self, pot: usize) -> Option<u8> {
        self(pot)
    }
}

impl<F: FnMut() -> Option<u8>> AllPotOverride for F {
    fn read(&mut self) -> Option<u8> {
        self()
    }
}

impl<F: FnMut() -> u8> SerialInProvider for F {
    fn read(&mut self) -> u8 {
        self()
    }
}

impl<F: FnMut(u8)> SerialOutSink for F {
    fn write(&mut self, byte: u8) {
        self(byte)
    }
}

/// The set of installed hooks. Never part of a save-state.
#[derive(Default)]
pub struct PokeyIo {
    pub interrupt: Option<Box<dyn InterruptSink>>,
    pub pots: Option<Box<dyn PotProvider>>,
    pub allpot: Option<Box<dyn AllPotOverride>>,
    pub serial_in: Option<Box<dyn SerialInProvider>>,
    pub serial_out: Option<Box<dyn SerialOutSink>>,
}

impl PokeyIo {
    pub fn set_interrupt_sink(&mut self, sink: impl InterruptSink + 'static) {
        self.interrupt = Some(Box::new(sink));
    }

    pub fn set_pot_provider(&mut self, provider: impl PotProvider + 'static) {
        self.pots = Some(Box::new(provider));
    }

    pub fn set_allpot_override(&mut self, provider: impl AllPotOverride + 'static) {
        self.allpot = Some(Box::new(provider));
    }

    pub fn set_serial_in(&mut self, provider: impl SerialInProvider + 'static) {
        self.serial_in = Some(Box::new(provider));
    }

    pub fn set_serial_out(&mut self, sink: impl SerialOutSink + 'static) {
        self.serial_out = Some(Box::new(sink));
    }
}

impl fmt::Debug for PokeyIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PokeyIo")
            .field("interrupt", &self.interrupt.is_some())
            .field("pots", &self.pots.is_some())
            .field("allpot", &self.allpot.is_some())
            .field("serial_in", &self.serial_in.is_some())
            .field("serial_out", &self.serial_out.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn closures_install_as_hooks() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut io = PokeyIo::default();

        let log = Rc::clone(&seen);
        io.set_interrupt_sink(move |mask: u8| log.borrow_mut().push(mask));
        let log = Rc::clone(&seen);
        io.set_serial_out(move |byte: u8| log.borrow_mut().push(byte));
        io.set_pot_provider(|pot: usize| (pot < 4).then_some(pot as u8 * 10));

        if let Some(sink) = io.interrupt.as_mut() {
            sink.raise(0x04);
        }
        if let Some(sink) = io.serial_out.as_mut() {
            sink.write(0xA5);
        }
        assert_eq!(*seen.borrow(), vec![0x04, 0xA5]);

        let pots = io.pots.as_mut().map(|p| (p.read(3), p.read(5)));
        assert_eq!(pots, Some((Some(30), None)));
    }

    #[test]
    fn debug_lists_installed_hooks() {
        let mut io = PokeyIo::default();
        io.set_serial_in(|| 0x42u8);
        let text = format!("{io:?}");
        assert!(text.contains("serial_in: true"));
        assert!(text.contains("interrupt: false"));
    }
}
