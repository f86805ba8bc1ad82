//! ADC resource: converter unit sessions plus their calibration state
//!
//! An [`AdcResource`] owns one session per enabled converter unit. Each
//! session lives in a [`UnitSession`] guard whose `Drop` releases the driver
//! session and then, if one was created, the calibration scheme. Because the
//! guards are built one at a time, a failure half way through `open` drops
//! whatever was already acquired and nothing leaks.

use core::mem::ManuallyDrop;

use log::{debug, error, info, warn};

use crate::calibration::{self, Calibration};
use crate::config::{self, Attenuation, BitWidth};
use crate::driver::AdcDriver;
use crate::error::{AdcError, AdcResult};
use crate::pin::{self, AdcUnit, Channel};
use crate::target::Platform;

/// Arguments to [`AdcResource::open`]. Omitted symbols take the target default.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions<'a> {
    pub pin: i32,
    pub bitwidth: Option<&'a str>,
    pub attenuation: Option<&'a str>,
}

impl<'a> OpenOptions<'a> {
    pub const fn new(pin: i32) -> Self {
        Self {
            pin,
            bitwidth: None,
            attenuation: None,
        }
    }

    pub const fn with_bitwidth(mut self, symbol: &'a str) -> Self {
        self.bitwidth = Some(symbol);
        self
    }

    pub const fn with_attenuation(mut self, symbol: &'a str) -> Self {
        self.attenuation = Some(symbol);
        self
    }
}

/// One converter unit brought up on the resource's channel.
pub struct UnitSession<'d, D: AdcDriver> {
    driver: &'d D,
    unit: AdcUnit,
    session: ManuallyDrop<D::Session>,
    calibration: Option<Calibration<D::Scheme>>,
}

impl<'d, D: AdcDriver> UnitSession<'d, D> {
    fn open(
        driver: &'d D,
        unit: AdcUnit,
        channel: Channel,
        width: BitWidth,
        attenuation: Attenuation,
    ) -> AdcResult<Self> {
        let session = driver.new_unit(unit).map_err(|code| {
            warn!("{}: unit init failed: {}", unit, code);
            AdcError::DriverError { code }
        })?;

        // From here on the guard owns the session; an early return releases it.
        let mut guard = Self {
            driver,
            unit,
            session: ManuallyDrop::new(session),
            calibration: None,
        };

        driver
            .config_channel(&mut *guard.session, channel, width, attenuation)
            .map_err(|code| {
                warn!("{} {}: channel config failed: {}", unit, channel, code);
                AdcError::DriverError { code }
            })?;

        guard.calibration = calibration::negotiate(driver, unit, channel, width, attenuation);
        Ok(guard)
    }

    pub fn unit(&self) -> AdcUnit {
        self.unit
    }

    pub fn calibration(&self) -> Option<&Calibration<D::Scheme>> {
        self.calibration.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    pub(crate) fn read_raw(&mut self, channel: Channel) -> AdcResult<i32> {
        self.driver
            .read(&mut *self.session, channel)
            .map_err(|code| AdcError::ReadError {
                unit: self.unit,
                code,
            })
    }

    /// Convert a raw code, or `None` when this unit is uncalibrated.
    pub(crate) fn to_millivolts(&self, raw: i32) -> Option<AdcResult<i32>> {
        self.calibration.as_ref().map(|cal| {
            self.driver
                .raw_to_voltage(cal.scheme(), raw)
                .map_err(|code| AdcError::CalibrationError { code })
        })
    }
}

impl<D: AdcDriver> Drop for UnitSession<'_, D> {
    fn drop(&mut self) {
        // SAFETY: the session is taken exactly once, here, and `self` is
        // never used again after drop.
        let session = unsafe { ManuallyDrop::take(&mut self.session) };
        if let Err(code) = self.driver.del_unit(session) {
            error!("{}: releasing unit session failed: {}", self.unit, code);
        }

        if let Some(cal) = self.calibration.take() {
            let (kind, scheme) = cal.into_parts();
            if let Err(code) = self.driver.delete_scheme(kind, scheme) {
                error!("{}: releasing {} scheme failed: {}", self.unit, kind, code);
            }
        }
        debug!("{}: released", self.unit);
    }
}

/// Native resource behind an ADC handle.
///
/// Fields drop in declaration order, so unit 1 is torn down before unit 2.
/// At least one of the two sessions is always present.
pub struct AdcResource<'d, D: AdcDriver> {
    pub(crate) unit1: Option<UnitSession<'d, D>>,
    pub(crate) unit2: Option<UnitSession<'d, D>>,
    pub(crate) channel: Channel,
    pin: i32,
}

impl<'d, D: AdcDriver> AdcResource<'d, D> {
    /// Resolve the configuration and bring up every enabled unit.
    ///
    /// Each enabled unit that has the resolved channel is opened on it, and
    /// readings later sum all of them. A unit without that channel is left
    /// out: ESP32 pins 25 and 26 sit on ADC2 channels 8 and 9, which ADC1
    /// lacks, so they open on ADC2 alone. Either every session is acquired
    /// or none is held when this returns.
    pub fn open(driver: &'d D, platform: &Platform, options: &OpenOptions<'_>) -> AdcResult<Self> {
        let (resolved, channel) = pin::resolve_pin(platform, options.pin)?;
        let width = config::resolve_width(platform.target(), options.bitwidth)?;
        let attenuation = config::resolve_attenuation(platform.target(), options.attenuation)?;

        let mut sessions = [None, None];
        for unit in platform.units() {
            if unit != resolved && !platform.target().has_channel(unit, channel) {
                debug!("{} has no {}, not opened for pin {}", unit, channel, options.pin);
                continue;
            }
            sessions[unit.index()] = Some(UnitSession::open(
                driver,
                unit,
                channel,
                width,
                attenuation,
            )?);
        }
        let [unit1, unit2] = sessions;

        info!(
            "Opened ADC on pin {} ({}, {} bit, {:?})",
            options.pin,
            channel,
            width.bits(),
            attenuation
        );

        Ok(Self {
            unit1,
            unit2,
            channel,
            pin: options.pin,
        })
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Open sessions in read order: unit 1, then unit 2.
    pub fn sessions(&self) -> impl Iterator<Item = &UnitSession<'d, D>> {
        self.unit1.iter().chain(self.unit2.as_ref())
    }

    pub(crate) fn sessions_mut(&mut self) -> impl Iterator<Item = &mut UnitSession<'d, D>> {
        self.unit1.iter_mut().chain(self.unit2.as_mut())
    }

    pub fn is_open(&self, unit: AdcUnit) -> bool {
        self.sessions().any(|session| session.unit() == unit)
    }

    pub fn is_calibrated(&self, unit: AdcUnit) -> bool {
        self.sessions()
            .any(|session| session.unit() == unit && session.is_calibrated())
    }
}

impl<D: AdcDriver> Drop for AdcResource<'_, D> {
    fn drop(&mut self) {
        info!("Closing ADC on pin {}", self.pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CalibrationKind, EspCode, SchemeError};
    use crate::error::ConfigKey;
    use crate::mock::{Counts, MockDriver};
    use crate::target::ESP32;

    fn single() -> Platform {
        Platform::new(&ESP32, false)
    }

    fn dual() -> Platform {
        Platform::new(&ESP32, true)
    }

    #[test]
    fn test_open_and_drop_releases_each_unit_once() {
        let driver = MockDriver::new().with_schemes(true, true);
        let resource = AdcResource::open(&driver, &dual(), &OpenOptions::new(34)).expect("open");
        assert_eq!(resource.channel(), Channel(6));
        assert!(resource.is_calibrated(AdcUnit::Unit1));
        assert!(resource.is_calibrated(AdcUnit::Unit2));

        let counts = driver.counts();
        assert_eq!(counts.new_unit, [1, 1]);
        assert_eq!(counts.del_unit, [0, 0]);

        drop(resource);
        let counts = driver.counts();
        assert_eq!(counts.del_unit, [1, 1]);
        assert_eq!(counts.delete_scheme, [1, 1]);
    }

    #[test]
    fn test_unit_without_channel_is_not_opened() {
        let driver = MockDriver::new().with_schemes(true, true);
        let resource = AdcResource::open(&driver, &dual(), &OpenOptions::new(25)).expect("open");
        assert_eq!(resource.channel(), Channel(8));
        assert!(!resource.is_open(AdcUnit::Unit1));
        assert!(resource.is_open(AdcUnit::Unit2));
        assert_eq!(driver.counts().new_unit, [0, 1]);

        drop(resource);
        assert!(driver.counts().balanced());
    }

    #[test]
    fn test_unit2_pin_opens_both_units_on_shared_channel() {
        let driver = MockDriver::new();
        // GPIO14 is ADC2 channel 6, which ADC1 also has.
        let resource = AdcResource::open(&driver, &dual(), &OpenOptions::new(14)).expect("open");
        assert!(resource.is_open(AdcUnit::Unit1));
        assert!(resource.is_open(AdcUnit::Unit2));
        assert_eq!(driver.counts().new_unit, [1, 1]);
    }

    #[test]
    fn test_uncalibrated_unit_releases_no_scheme() {
        let driver = MockDriver::new();
        let resource = AdcResource::open(&driver, &single(), &OpenOptions::new(36)).expect("open");
        assert!(!resource.is_calibrated(AdcUnit::Unit1));
        drop(resource);

        let counts = driver.counts();
        assert_eq!(counts.new_unit, [1, 0]);
        assert_eq!(counts.del_unit, [1, 0]);
        assert_eq!(counts.delete_scheme, [0, 0]);
    }

    #[test]
    fn test_scheme_released_with_matching_kind() {
        let driver = MockDriver::new()
            .with_schemes(true, true)
            .fail_scheme(CalibrationKind::CurveFitting, SchemeError::Unsupported);
        let resource = AdcResource::open(&driver, &single(), &OpenOptions::new(36)).expect("open");
        let kind = resource
            .unit1
            .as_ref()
            .and_then(|session| session.calibration())
            .map(|cal| cal.kind());
        assert_eq!(kind, Some(CalibrationKind::LineFitting));
        // The mock asserts the deleter kind matches the created kind.
        drop(resource);
        assert!(driver.counts().balanced());
    }

    #[test]
    fn test_unsupported_pin_touches_no_driver() {
        let driver = MockDriver::new();
        let result = AdcResource::open(&driver, &single(), &OpenOptions::new(25));
        assert!(matches!(result, Err(AdcError::UnsupportedPin { pin: 25 })));
        assert_eq!(driver.counts(), Counts::default());
    }

    #[test]
    fn test_invalid_symbols_touch_no_driver() {
        let driver = MockDriver::new();
        let options = OpenOptions::new(34).with_bitwidth("bit_16");
        let result = AdcResource::open(&driver, &single(), &options);
        assert!(matches!(
            result,
            Err(AdcError::InvalidConfig {
                key: ConfigKey::Width
            })
        ));

        let options = OpenOptions::new(34).with_attenuation("db_99");
        let result = AdcResource::open(&driver, &single(), &options);
        assert!(matches!(
            result,
            Err(AdcError::InvalidConfig {
                key: ConfigKey::Attenuation
            })
        ));
        assert_eq!(driver.counts(), Counts::default());
    }

    #[test]
    fn test_unit1_init_failure_reports_driver_code() {
        let driver = MockDriver::new().fail_new_unit(AdcUnit::Unit1, EspCode::NO_MEM);
        let result = AdcResource::open(&driver, &dual(), &OpenOptions::new(34));
        assert!(matches!(
            result,
            Err(AdcError::DriverError {
                code: EspCode::NO_MEM
            })
        ));
        assert_eq!(driver.counts().new_unit, [0, 0]);
    }

    #[test]
    fn test_channel_config_failure_releases_session() {
        let driver = MockDriver::new()
            .with_schemes(true, false)
            .fail_config_channel(AdcUnit::Unit1, EspCode::INVALID_ARG);
        let result = AdcResource::open(&driver, &single(), &OpenOptions::new(34));
        assert!(matches!(result, Err(AdcError::DriverError { .. })));

        let counts = driver.counts();
        assert_eq!(counts.new_unit, [1, 0]);
        assert_eq!(counts.del_unit, [1, 0]);
        assert_eq!(counts.create_scheme, [0, 0]);
    }

    #[test]
    fn test_unit2_failure_rolls_back_unit1() {
        let driver = MockDriver::new()
            .with_schemes(true, true)
            .fail_new_unit(AdcUnit::Unit2, EspCode::INVALID_STATE);
        let result = AdcResource::open(&driver, &dual(), &OpenOptions::new(34));
        assert!(matches!(
            result,
            Err(AdcError::DriverError {
                code: EspCode::INVALID_STATE
            })
        ));

        let counts = driver.counts();
        assert_eq!(counts.new_unit, [1, 0]);
        assert_eq!(counts.del_unit, [1, 0]);
        assert_eq!(counts.create_scheme, [1, 0]);
        assert_eq!(counts.delete_scheme, [1, 0]);
        assert!(counts.balanced());
    }
}
