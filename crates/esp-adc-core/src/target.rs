//! Per-target hardware tables
//!
//! Each supported chip is described by one [`TargetProfile`]: which GPIOs
//! are wired to which converter unit and channel, and which width and
//! attenuation symbols the chip accepts. A [`Platform`] pairs a profile with
//! the ADC2 enable flag and is handed to the binding surface at init time.

use crate::config::{Attenuation, BitWidth, SymbolTable};
use crate::pin::{AdcUnit, Channel};

/// One GPIO wired to an ADC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMapping {
    pub pin: i32,
    pub channel: u8,
}

const fn map(pin: i32, channel: u8) -> PinMapping {
    PinMapping { pin, channel }
}

/// Static description of one chip's ADC wiring and symbol tables
#[derive(Debug)]
pub struct TargetProfile {
    pub name: &'static str,
    pub unit1_pins: &'static [PinMapping],
    pub unit2_pins: &'static [PinMapping],
    pub widths: SymbolTable<BitWidth>,
    pub attenuations: SymbolTable<Attenuation>,
}

impl TargetProfile {
    pub fn pins(&self, unit: AdcUnit) -> &'static [PinMapping] {
        match unit {
            AdcUnit::Unit1 => self.unit1_pins,
            AdcUnit::Unit2 => self.unit2_pins,
        }
    }

    /// Whether `unit` has an input line with this channel index.
    pub fn has_channel(&self, unit: AdcUnit, channel: Channel) -> bool {
        self.pins(unit)
            .iter()
            .any(|mapping| mapping.channel == channel.index())
    }
}

const ATTENUATIONS: SymbolTable<Attenuation> = SymbolTable {
    entries: &[
        ("db_0", Attenuation::Db0),
        ("db_2_5", Attenuation::Db2p5),
        ("db_6", Attenuation::Db6),
        ("db_11", Attenuation::Db11),
        ("db_12", Attenuation::Db11),
    ],
    default: Attenuation::Db11,
};

const WIDTH_12_ONLY: SymbolTable<BitWidth> = SymbolTable {
    entries: &[("bit_12", BitWidth::Bit12), ("bit_max", BitWidth::Bit12)],
    default: BitWidth::Bit12,
};

pub static ESP32: TargetProfile = TargetProfile {
    name: "esp32",
    unit1_pins: &[
        map(36, 0),
        map(37, 1),
        map(38, 2),
        map(39, 3),
        map(32, 4),
        map(33, 5),
        map(34, 6),
        map(35, 7),
    ],
    unit2_pins: &[
        map(4, 0),
        map(0, 1),
        map(2, 2),
        map(15, 3),
        map(13, 4),
        map(12, 5),
        map(14, 6),
        map(27, 7),
        map(25, 8),
        map(26, 9),
    ],
    widths: SymbolTable {
        entries: &[
            ("bit_9", BitWidth::Bit9),
            ("bit_10", BitWidth::Bit10),
            ("bit_11", BitWidth::Bit11),
            ("bit_12", BitWidth::Bit12),
            ("bit_max", BitWidth::Bit12),
        ],
        default: BitWidth::Bit12,
    },
    attenuations: ATTENUATIONS,
};

// GPIO1..=10 on ADC1, GPIO11..=20 on ADC2 for both S-series chips
const S_SERIES_UNIT1: &[PinMapping] = &[
    map(1, 0),
    map(2, 1),
    map(3, 2),
    map(4, 3),
    map(5, 4),
    map(6, 5),
    map(7, 6),
    map(8, 7),
    map(9, 8),
    map(10, 9),
];

const S_SERIES_UNIT2: &[PinMapping] = &[
    map(11, 0),
    map(12, 1),
    map(13, 2),
    map(14, 3),
    map(15, 4),
    map(16, 5),
    map(17, 6),
    map(18, 7),
    map(19, 8),
    map(20, 9),
];

pub static ESP32S2: TargetProfile = TargetProfile {
    name: "esp32s2",
    unit1_pins: S_SERIES_UNIT1,
    unit2_pins: S_SERIES_UNIT2,
    widths: SymbolTable {
        entries: &[("bit_13", BitWidth::Bit13), ("bit_max", BitWidth::Bit13)],
        default: BitWidth::Bit13,
    },
    attenuations: ATTENUATIONS,
};

pub static ESP32S3: TargetProfile = TargetProfile {
    name: "esp32s3",
    unit1_pins: S_SERIES_UNIT1,
    unit2_pins: S_SERIES_UNIT2,
    widths: WIDTH_12_ONLY,
    attenuations: ATTENUATIONS,
};

pub static ESP32C3: TargetProfile = TargetProfile {
    name: "esp32c3",
    unit1_pins: &[map(0, 0), map(1, 1), map(2, 2), map(3, 3), map(4, 4)],
    unit2_pins: &[map(5, 0)],
    widths: WIDTH_12_ONLY,
    attenuations: ATTENUATIONS,
};

/// Every known target, searchable by name
pub static TARGETS: [&TargetProfile; 4] = [&ESP32, &ESP32S2, &ESP32S3, &ESP32C3];

pub fn target_by_name(name: &str) -> Option<&'static TargetProfile> {
    TARGETS.iter().copied().find(|target| target.name == name)
}

/// Target profile plus the converter units enabled for this build.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    target: &'static TargetProfile,
    adc2_enabled: bool,
}

impl Platform {
    pub const fn new(target: &'static TargetProfile, adc2_enabled: bool) -> Self {
        Self {
            target,
            adc2_enabled,
        }
    }

    /// Platform selected by the crate's cargo features.
    ///
    /// `esp32` is the fallback so that enabling a more specific target on top
    /// of the default feature set selects that target.
    pub fn from_features() -> Self {
        let target = if cfg!(feature = "esp32s2") {
            &ESP32S2
        } else if cfg!(feature = "esp32s3") {
            &ESP32S3
        } else if cfg!(feature = "esp32c3") {
            &ESP32C3
        } else {
            &ESP32
        };
        Self::new(target, cfg!(feature = "adc2"))
    }

    pub const fn target(&self) -> &'static TargetProfile {
        self.target
    }

    pub const fn adc2_enabled(&self) -> bool {
        self.adc2_enabled
    }

    pub fn is_enabled(&self, unit: AdcUnit) -> bool {
        match unit {
            AdcUnit::Unit1 => true,
            AdcUnit::Unit2 => self.adc2_enabled,
        }
    }

    /// Enabled units in read order.
    pub fn units(&self) -> impl Iterator<Item = AdcUnit> + '_ {
        AdcUnit::ALL.into_iter().filter(|unit| self.is_enabled(*unit))
    }
}
