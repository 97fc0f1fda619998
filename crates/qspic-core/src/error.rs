//! Error types for qspic-core
//!
//! Detection and verification failures are the only recoverable errors
//! in this driver; they resolve to "controller absent" at the driver
//! level. Everything else (invalid addresses, operations on absent
//! controllers) is a caller bug and enforced with assertions.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No device answered the JEDEC identification command
    NoJedecResponse,
    /// A device answered but its JEDEC id matches no registry entry
    UnknownJedecId,
    /// The JEDEC id read back does not match the statically configured device
    JedecIdMismatch,
    /// The targeted controller has no bound device
    ControllerAbsent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJedecResponse => write!(f, "no JEDEC id response from device"),
            Self::UnknownJedecId => write!(f, "JEDEC id matches no known device"),
            Self::JedecIdMismatch => write!(f, "JEDEC id mismatch against static configuration"),
            Self::ControllerAbsent => write!(f, "controller has no bound device"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
