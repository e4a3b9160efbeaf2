//! The serial link the session talks through.

use core::fmt::Debug;

use embedded_hal::serial;

/// CN105 always runs 8 data bits, even parity, one stop bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl SerialConfig {
    pub const CN105: SerialConfig = SerialConfig {
        baud_rate: 2400,
        data_bits: 8,
        parity: Parity::Even,
        stop_bits: 1,
    };
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig::CN105
    }
}

/// A byte-oriented serial channel exclusively owned by one session.
///
/// Reads and writes follow the `nb` convention: `WouldBlock` means "nothing
/// right now", any other error is a real failure.
pub trait Link {
    type Error: Debug;

    /// Prepares the channel with the given framing. Called on every connect
    /// attempt, so it must tolerate an already-open channel.
    fn open(&mut self, config: &SerialConfig) -> Result<(), Self::Error>;

    fn read(&mut self) -> nb::Result<u8, Self::Error>;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}

/// Adapts an `embedded-hal` serial peripheral that the host has already
/// configured for 2400 8E1.
pub struct HalSerial<S> {
    serial: S,
}

impl<S> HalSerial<S> {
    pub fn new(serial: S) -> Self {
        HalSerial { serial }
    }

    pub fn release(self) -> S {
        self.serial
    }
}

impl<S, E> Link for HalSerial<S>
where
    S: serial::Read<u8, Error = E> + serial::Write<u8, Error = E>,
    E: Debug,
{
    type Error = E;

    fn open(&mut self, _config: &SerialConfig) -> Result<(), E> {
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, E> {
        serial::Read::read(&mut self.serial)
    }

    fn write(&mut self, byte: u8) -> nb::Result<(), E> {
        serial::Write::write(&mut self.serial, byte)
    }

    fn flush(&mut self) -> nb::Result<(), E> {
        serial::Write::flush(&mut self.serial)
    }
}
