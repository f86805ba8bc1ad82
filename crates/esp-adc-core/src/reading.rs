//! Sample aggregation
//!
//! A reading takes `samples` rounds; each round reads every enabled unit in
//! order and, when asked for voltage, converts each raw code through that
//! unit's calibration scheme. Sums are averaged with truncating integer
//! division. Any failed read or conversion aborts the whole reading.

use log::{trace, warn};

use crate::driver::AdcDriver;
use crate::error::{AdcError, AdcResult};
use crate::pin::AdcUnit;
use crate::resource::AdcResource;

/// Samples taken when the caller does not say otherwise
pub const DEFAULT_SAMPLES: i32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingOptions {
    pub samples: i32,
    pub raw: bool,
    pub voltage: bool,
}

impl Default for ReadingOptions {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            raw: false,
            voltage: false,
        }
    }
}

impl ReadingOptions {
    pub const fn raw(samples: i32) -> Self {
        Self {
            samples,
            raw: true,
            voltage: false,
        }
    }

    pub const fn with_voltage(mut self) -> Self {
        self.voltage = true;
        self
    }
}

/// Averaged result. `None` means the value was not requested or, for
/// voltage, that no unit is calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    pub raw: Option<i32>,
    pub voltage: Option<i32>,
}

#[derive(Default)]
struct Accumulator {
    raw_sum: i64,
    voltage_sum: i64,
}

impl Accumulator {
    /// Truncating average, saturated to the `i32` range.
    fn average(sum: i64, samples: i32) -> i32 {
        let average = sum / i64::from(samples);
        average.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

impl<D: AdcDriver> AdcResource<'_, D> {
    /// Take `options.samples` rounds of samples and average them.
    pub fn take_reading(&mut self, options: &ReadingOptions) -> AdcResult<Reading> {
        if options.samples < 1 {
            return Err(AdcError::InvalidArgument { what: "samples" });
        }

        let convert = options.voltage && self.sessions().any(|s| s.is_calibrated());
        let channel = self.channel;
        let mut acc = Accumulator::default();

        for index in 0..options.samples {
            for session in self.sessions_mut() {
                let raw = session.read_raw(channel).map_err(|err| {
                    if let AdcError::ReadError {
                        unit: AdcUnit::Unit2,
                        code,
                    } = err
                    {
                        if code.is_timeout() {
                            warn!("ADC2 in use by Wi-Fi, call adc:wifi_lock/0 before reading it");
                        }
                    }
                    trace!("{}: sample {} failed: {}", session.unit(), index, err);
                    err
                })?;
                acc.raw_sum = acc.raw_sum.saturating_add(i64::from(raw));

                if convert {
                    if let Some(millivolts) = session.to_millivolts(raw) {
                        acc.voltage_sum = acc.voltage_sum.saturating_add(i64::from(millivolts?));
                    }
                }
            }
        }

        let reading = Reading {
            raw: options
                .raw
                .then(|| Accumulator::average(acc.raw_sum, options.samples)),
            voltage: convert.then(|| Accumulator::average(acc.voltage_sum, options.samples)),
        };
        trace!("Pin {} reading: {:?}", self.pin(), reading);
        Ok(reading)
    }
}
