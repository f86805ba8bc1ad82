//! Width and attenuation symbol resolution
//!
//! Symbols are matched exactly against the active target's table. An
//! unrecognised symbol is an error; the table default is only used when the
//! caller did not supply the key at all.

use log::debug;

use crate::error::{AdcError, AdcResult, ConfigKey};
use crate::target::TargetProfile;

/// Resolution of one raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitWidth {
    Bit9,
    Bit10,
    Bit11,
    Bit12,
    Bit13,
}

impl BitWidth {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bit9 => 9,
            Self::Bit10 => 10,
            Self::Bit11 => 11,
            Self::Bit12 => 12,
            Self::Bit13 => 13,
        }
    }

    /// Largest raw code a sample at this width can hold.
    pub const fn max_code(self) -> i32 {
        (1 << self.bits()) - 1
    }
}

/// Input attenuation. Decides the usable voltage range of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attenuation {
    /// 0dB attenuation
    Db0,
    /// 2.5dB attenuation
    Db2p5,
    /// 6dB attenuation
    Db6,
    /// 11dB attenuation (12dB in newer SDK naming)
    Db11,
}

/// Symbol to value table with a designated default.
#[derive(Debug)]
pub struct SymbolTable<T: 'static> {
    pub entries: &'static [(&'static str, T)],
    pub default: T,
}

impl<T: Copy> SymbolTable<T> {
    pub fn lookup(&self, symbol: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, value)| *value)
    }

    fn resolve(&self, symbol: Option<&str>, key: ConfigKey) -> AdcResult<T> {
        match symbol {
            None => Ok(self.default),
            Some(symbol) => self.lookup(symbol).ok_or_else(|| {
                debug!("Unrecognised {} symbol '{}'", key, symbol);
                AdcError::InvalidConfig { key }
            }),
        }
    }
}

pub fn resolve_width(target: &TargetProfile, symbol: Option<&str>) -> AdcResult<BitWidth> {
    target.widths.resolve(symbol, ConfigKey::Width)
}

pub fn resolve_attenuation(
    target: &TargetProfile,
    symbol: Option<&str>,
) -> AdcResult<Attenuation> {
    target.attenuations.resolve(symbol, ConfigKey::Attenuation)
}
