use core::time::Duration;

use thiserror::Error;

use crate::climate::{ClimateMode, FanMode, SwingMode};
use crate::protocol::types::TenthDegreesC;
pub use crate::protocol::{EncodingError, FrameError};

/// The serial channel could not be used.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("serial channel could not be opened")]
    Open,
    #[error("serial write failed")]
    Write,
}

/// The unit did not answer a request in time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no response within {timeout:?} ({consecutive} in a row)")]
pub struct TimeoutError {
    pub timeout: Duration,
    pub consecutive: u8,
}

/// A requested value is outside what this unit was configured to accept.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedValue {
    #[error("climate mode {0:?} is not supported")]
    Mode(ClimateMode),
    #[error("fan mode {0:?} is not supported")]
    Fan(FanMode),
    #[error("swing mode {0:?} is not supported")]
    Swing(SwingMode),
    #[error("target temperature {0:?} is outside the unit's setpoint range")]
    TargetTemperature(TenthDegreesC),
    #[error("no vertical vane select is registered")]
    VerticalVane,
    #[error("no horizontal vane select is registered")]
    HorizontalVane,
    #[error("unknown vane option")]
    VaneOption,
    #[error("empty request")]
    Empty,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedValue),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
