//! Scripted vendor driver used by the unit tests.
//!
//! Raw samples are queued per unit; once a queue runs dry the driver keeps
//! returning `default_raw`. Every call is counted so tests can check that
//! each acquired handle was released exactly once.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

use crate::config::{Attenuation, BitWidth};
use crate::driver::{
    Adc2WifiLock, CalibrationDriver, CalibrationKind, EspCode, OneshotDriver, SchemeError,
};
use crate::pin::{AdcUnit, Channel};

/// Per-unit call counts, indexed by [`AdcUnit::index`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counts {
    pub new_unit: [u32; 2],
    pub config_channel: [u32; 2],
    pub del_unit: [u32; 2],
    /// Successfully created schemes
    pub create_scheme: [u32; 2],
    pub delete_scheme: [u32; 2],
    pub reads: u32,
    pub conversions: u32,
    pub wifi_acquire: u32,
    pub wifi_release: u32,
}

impl Counts {
    /// No session or scheme is still outstanding.
    pub fn balanced(&self) -> bool {
        self.new_unit == self.del_unit && self.create_scheme == self.delete_scheme
    }
}

#[derive(Debug)]
pub struct MockSession {
    unit: AdcUnit,
    channel: Option<Channel>,
}

#[derive(Debug)]
pub struct MockScheme {
    unit: AdcUnit,
    kind: CalibrationKind,
}

pub struct MockDriver {
    samples: [RefCell<VecDeque<i32>>; 2],
    default_raw: i32,
    curve: bool,
    line: bool,
    scheme_failures: Vec<(CalibrationKind, SchemeError)>,
    unit_failure: Option<(AdcUnit, EspCode)>,
    config_failure: Option<(AdcUnit, EspCode)>,
    read_failure_at: Option<(u32, EspCode)>,
    unit_read_failure: Option<(AdcUnit, EspCode)>,
    conversion_failure_at: Option<(u32, EspCode)>,
    wifi_acquire_failure: Option<EspCode>,
    wifi_release_failure: Option<EspCode>,
    counts: RefCell<Counts>,
    read_index: Cell<u32>,
    conversion_index: Cell<u32>,
}

impl MockDriver {
    /// Driver with both schemes unsupported and a constant raw code of 100.
    pub fn new() -> Self {
        Self {
            samples: [RefCell::new(VecDeque::new()), RefCell::new(VecDeque::new())],
            default_raw: 100,
            curve: false,
            line: false,
            scheme_failures: Vec::new(),
            unit_failure: None,
            config_failure: None,
            read_failure_at: None,
            unit_read_failure: None,
            conversion_failure_at: None,
            wifi_acquire_failure: None,
            wifi_release_failure: None,
            counts: RefCell::new(Counts::default()),
            read_index: Cell::new(0),
            conversion_index: Cell::new(0),
        }
    }

    pub fn with_samples(self, unit: AdcUnit, samples: &[i32]) -> Self {
        self.samples[unit.index()]
            .borrow_mut()
            .extend(samples.iter().copied());
        self
    }

    pub fn with_default_raw(mut self, raw: i32) -> Self {
        self.default_raw = raw;
        self
    }

    pub fn with_schemes(mut self, curve: bool, line: bool) -> Self {
        self.curve = curve;
        self.line = line;
        self
    }

    pub fn fail_scheme(mut self, kind: CalibrationKind, error: SchemeError) -> Self {
        self.scheme_failures.push((kind, error));
        self
    }

    pub fn fail_new_unit(mut self, unit: AdcUnit, code: EspCode) -> Self {
        self.unit_failure = Some((unit, code));
        self
    }

    pub fn fail_config_channel(mut self, unit: AdcUnit, code: EspCode) -> Self {
        self.config_failure = Some((unit, code));
        self
    }

    /// Fail the read with this zero-based index, counted across all units.
    pub fn fail_read_at(mut self, index: u32, code: EspCode) -> Self {
        self.read_failure_at = Some((index, code));
        self
    }

    /// Fail every read on `unit`.
    pub fn fail_reads_on(mut self, unit: AdcUnit, code: EspCode) -> Self {
        self.unit_read_failure = Some((unit, code));
        self
    }

    /// Fail the conversion with this zero-based index.
    pub fn fail_conversion_at(mut self, index: u32, code: EspCode) -> Self {
        self.conversion_failure_at = Some((index, code));
        self
    }

    pub fn fail_wifi_acquire(mut self, code: EspCode) -> Self {
        self.wifi_acquire_failure = Some(code);
        self
    }

    pub fn fail_wifi_release(mut self, code: EspCode) -> Self {
        self.wifi_release_failure = Some(code);
        self
    }

    pub fn counts(&self) -> Counts {
        self.counts.borrow().clone()
    }
}

impl OneshotDriver for MockDriver {
    type Session = MockSession;

    fn new_unit(&self, unit: AdcUnit) -> Result<MockSession, EspCode> {
        if let Some((failing, code)) = self.unit_failure {
            if failing == unit {
                return Err(code);
            }
        }
        self.counts.borrow_mut().new_unit[unit.index()] += 1;
        Ok(MockSession {
            unit,
            channel: None,
        })
    }

    fn config_channel(
        &self,
        session: &mut MockSession,
        channel: Channel,
        _width: BitWidth,
        _attenuation: Attenuation,
    ) -> Result<(), EspCode> {
        self.counts.borrow_mut().config_channel[session.unit.index()] += 1;
        if let Some((failing, code)) = self.config_failure {
            if failing == session.unit {
                return Err(code);
            }
        }
        session.channel = Some(channel);
        Ok(())
    }

    fn read(&self, session: &mut MockSession, channel: Channel) -> Result<i32, EspCode> {
        assert_eq!(session.channel, Some(channel), "read on unconfigured channel");

        let index = self.read_index.get();
        self.read_index.set(index + 1);
        self.counts.borrow_mut().reads += 1;

        if let Some((failing, code)) = self.read_failure_at {
            if failing == index {
                return Err(code);
            }
        }
        if let Some((failing, code)) = self.unit_read_failure {
            if failing == session.unit {
                return Err(code);
            }
        }

        let queued = self.samples[session.unit.index()].borrow_mut().pop_front();
        Ok(queued.unwrap_or(self.default_raw))
    }

    fn del_unit(&self, session: MockSession) -> Result<(), EspCode> {
        self.counts.borrow_mut().del_unit[session.unit.index()] += 1;
        Ok(())
    }
}

impl CalibrationDriver for MockDriver {
    type Scheme = MockScheme;

    fn scheme_supported(&self, kind: CalibrationKind) -> bool {
        match kind {
            CalibrationKind::CurveFitting => self.curve,
            CalibrationKind::LineFitting => self.line,
        }
    }

    fn create_scheme(
        &self,
        kind: CalibrationKind,
        unit: AdcUnit,
        _channel: Channel,
        _attenuation: Attenuation,
        _width: BitWidth,
    ) -> Result<MockScheme, SchemeError> {
        if let Some((_, error)) = self.scheme_failures.iter().find(|(k, _)| *k == kind) {
            return Err(*error);
        }
        self.counts.borrow_mut().create_scheme[unit.index()] += 1;
        Ok(MockScheme { unit, kind })
    }

    /// Converts at a fixed 2 mV per code.
    fn raw_to_voltage(&self, _scheme: &MockScheme, raw: i32) -> Result<i32, EspCode> {
        let index = self.conversion_index.get();
        self.conversion_index.set(index + 1);
        self.counts.borrow_mut().conversions += 1;

        if let Some((failing, code)) = self.conversion_failure_at {
            if failing == index {
                return Err(code);
            }
        }
        Ok(raw * 2)
    }

    fn delete_scheme(&self, kind: CalibrationKind, scheme: MockScheme) -> Result<(), EspCode> {
        assert_eq!(kind, scheme.kind, "scheme released through the wrong deleter");
        self.counts.borrow_mut().delete_scheme[scheme.unit.index()] += 1;
        Ok(())
    }
}

impl Adc2WifiLock for MockDriver {
    fn acquire_adc2(&self) -> Result<(), EspCode> {
        self.counts.borrow_mut().wifi_acquire += 1;
        self.wifi_acquire_failure.map_or(Ok(()), Err)
    }

    fn release_adc2(&self) -> Result<(), EspCode> {
        self.counts.borrow_mut().wifi_release += 1;
        self.wifi_release_failure.map_or(Ok(()), Err)
    }
}
