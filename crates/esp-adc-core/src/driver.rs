//! Vendor ADC capability contract
//!
//! The core never talks to the oneshot driver or the calibration library
//! directly. Everything goes through the two traits in this module so the
//! same resource logic runs against the ESP-IDF bindings on target and
//! against simulated drivers on a desktop host.

use core::fmt;

use crate::config::{Attenuation, BitWidth};
use crate::pin::{AdcUnit, Channel};

/// Native `esp_err_t` code returned by a failed vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EspCode(pub i32);

impl EspCode {
    pub const FAIL: Self = Self(-1);
    pub const NO_MEM: Self = Self(0x101);
    pub const INVALID_ARG: Self = Self(0x102);
    pub const INVALID_STATE: Self = Self(0x103);
    pub const NOT_FOUND: Self = Self(0x105);
    pub const NOT_SUPPORTED: Self = Self(0x106);
    /// ADC2 is held by the Wi-Fi driver.
    pub const TIMEOUT: Self = Self(0x107);

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_timeout(self) -> bool {
        self.0 == Self::TIMEOUT.0
    }

    const fn name(self) -> Option<&'static str> {
        match self.0 {
            -1 => Some("ESP_FAIL"),
            0x101 => Some("ESP_ERR_NO_MEM"),
            0x102 => Some("ESP_ERR_INVALID_ARG"),
            0x103 => Some("ESP_ERR_INVALID_STATE"),
            0x105 => Some("ESP_ERR_NOT_FOUND"),
            0x106 => Some("ESP_ERR_NOT_SUPPORTED"),
            0x107 => Some("ESP_ERR_TIMEOUT"),
            _ => None,
        }
    }
}

impl fmt::Display for EspCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#x})", name, self.0),
            None => write!(f, "esp_err_t {:#x}", self.0),
        }
    }
}

/// Raw-code to millivolt conversion schemes offered by the vendor library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationKind {
    /// Polynomial error correction on top of a linear fit
    CurveFitting,
    /// Two-point or eFuse Vref linear fit
    LineFitting,
}

impl CalibrationKind {
    /// Order in which schemes are attempted when a unit is opened.
    pub const PREFERENCE: [CalibrationKind; 2] =
        [CalibrationKind::CurveFitting, CalibrationKind::LineFitting];

    pub const fn label(self) -> &'static str {
        match self {
            Self::CurveFitting => "curve fitting",
            Self::LineFitting => "line fitting",
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a calibration scheme could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeError {
    /// The chip lacks the factory trim data the scheme needs
    Unsupported,
    /// The vendor call itself failed
    Failed(EspCode),
}

/// Oneshot conversion driver.
///
/// A session is one converter unit brought up by `new_unit`; it stays valid
/// until it is moved back into `del_unit`.
pub trait OneshotDriver {
    type Session;

    fn new_unit(&self, unit: AdcUnit) -> Result<Self::Session, EspCode>;

    fn config_channel(
        &self,
        session: &mut Self::Session,
        channel: Channel,
        width: BitWidth,
        attenuation: Attenuation,
    ) -> Result<(), EspCode>;

    /// Take one raw sample. Blocks for the conversion time only.
    fn read(&self, session: &mut Self::Session, channel: Channel) -> Result<i32, EspCode>;

    fn del_unit(&self, session: Self::Session) -> Result<(), EspCode>;
}

/// Calibration library.
pub trait CalibrationDriver {
    type Scheme;

    /// Whether the platform advertises `kind` at all.
    fn scheme_supported(&self, kind: CalibrationKind) -> bool;

    fn create_scheme(
        &self,
        kind: CalibrationKind,
        unit: AdcUnit,
        channel: Channel,
        attenuation: Attenuation,
        width: BitWidth,
    ) -> Result<Self::Scheme, SchemeError>;

    fn raw_to_voltage(&self, scheme: &Self::Scheme, raw: i32) -> Result<i32, EspCode>;

    /// Must be called with the same `kind` the scheme was created with.
    fn delete_scheme(&self, kind: CalibrationKind, scheme: Self::Scheme) -> Result<(), EspCode>;
}

/// Arbitration of ADC2 with the Wi-Fi driver.
///
/// While Wi-Fi holds ADC2, reads on it time out. Taking the lock keeps Wi-Fi
/// off the converter until it is released again.
pub trait Adc2WifiLock {
    fn acquire_adc2(&self) -> Result<(), EspCode>;

    fn release_adc2(&self) -> Result<(), EspCode>;
}

/// Full vendor capability needed to open and read an ADC resource.
pub trait AdcDriver: OneshotDriver + CalibrationDriver + Adc2WifiLock {}

impl<T: OneshotDriver + CalibrationDriver + Adc2WifiLock> AdcDriver for T {}
