use core::fmt;

use thiserror_no_std::Error;

use crate::driver::EspCode;
use crate::pin::AdcUnit;

/// Which configuration key carried an unrecognised symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Width,
    Attenuation,
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Width => f.write_str("bit width"),
            Self::Attenuation => f.write_str("attenuation"),
        }
    }
}

/// Error types for ADC resource operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    /// The pin is not wired to an enabled converter unit
    #[error("Pin {pin} is not a valid ADC pin")]
    UnsupportedPin {
        /// The rejected GPIO number
        pin: i32,
    },

    /// Unrecognised width or attenuation symbol
    #[error("Invalid {key} symbol")]
    InvalidConfig {
        /// Key holding the bad symbol
        key: ConfigKey,
    },

    /// Unit bring-up, channel configuration or teardown failed
    #[error("ADC driver error: {code}")]
    DriverError {
        /// Native error code
        code: EspCode,
    },

    /// Raw to millivolt conversion failed
    #[error("ADC calibration error: {code}")]
    CalibrationError {
        /// Native error code
        code: EspCode,
    },

    /// A sample could not be read
    #[error("{unit} read error: {code}")]
    ReadError {
        /// Unit the failed read was issued on
        unit: AdcUnit,
        /// Native error code
        code: EspCode,
    },

    /// Argument outside its contract (bad type, non-positive sample count, stale handle)
    #[error("Invalid argument: {what}")]
    InvalidArgument {
        /// Which argument was rejected
        what: &'static str,
    },

    /// No room left for another resource
    #[error("Out of memory")]
    OutOfMemory,
}

/// Result type for ADC resource operations
pub type AdcResult<T> = Result<T, AdcError>;
