//! GPIO to converter unit/channel resolution

use core::fmt;

use log::debug;

use crate::error::{AdcError, AdcResult};
use crate::target::Platform;

/// One of the chip's independent ADC peripherals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdcUnit {
    Unit1,
    Unit2,
}

impl AdcUnit {
    pub const ALL: [AdcUnit; 2] = [AdcUnit::Unit1, AdcUnit::Unit2];

    pub const fn index(self) -> usize {
        match self {
            Self::Unit1 => 0,
            Self::Unit2 => 1,
        }
    }
}

impl fmt::Display for AdcUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit1 => f.write_str("ADC1"),
            Self::Unit2 => f.write_str("ADC2"),
        }
    }
}

/// Input line index within a converter unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(pub u8);

impl Channel {
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Look up the unit and channel a pin is wired to.
///
/// Returns `None` for pins outside every enabled unit's table.
pub fn resolve(platform: &Platform, pin: i32) -> Option<(AdcUnit, Channel)> {
    platform.units().find_map(|unit| {
        platform
            .target()
            .pins(unit)
            .iter()
            .find(|mapping| mapping.pin == pin)
            .map(|mapping| (unit, Channel(mapping.channel)))
    })
}

/// Like [`resolve`], but unsupported pins are an error.
pub fn resolve_pin(platform: &Platform, pin: i32) -> AdcResult<(AdcUnit, Channel)> {
    let resolved = resolve(platform, pin).ok_or(AdcError::UnsupportedPin { pin })?;
    debug!("Pin {} resolved to {} {}", pin, resolved.0, resolved.1);
    Ok(resolved)
}

pub fn pin_is_adc2(platform: &Platform, pin: i32) -> bool {
    matches!(resolve(platform, pin), Some((AdcUnit::Unit2, _)))
}
