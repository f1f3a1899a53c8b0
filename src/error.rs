//! Unified error types for the advertising multiplexer.
//!
//! A single `Error` enum that every fallible public operation funnels
//! into, keeping caller error handling uniform. All variants are `Copy`
//! so they can be passed around without allocation.

use core::fmt;

use crate::app::ports::DriverError;

/// Every fallible multiplexer operation resolves to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// All client slots are allocated; no handle can be issued.
    CapacityExceeded,
    /// The radio driver rejected a configure/start/stop call.
    Driver(DriverError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "client table full"),
            Self::Driver(e) => write!(f, "radio driver: {e}"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl core::error::Error for Error {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
