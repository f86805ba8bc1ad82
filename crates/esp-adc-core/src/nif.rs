//! Binding surface
//!
//! Translates the VM's call convention (terms, proplists, resource handles)
//! into calls on [`AdcResource`] and back. Native functions are looked up
//! by their `module:function/arity` name through [`resolve_nif`].
//!
//! | Name                   | Arguments        | Returns                                     |
//! |------------------------|------------------|---------------------------------------------|
//! | `adc:open/1`           | options proplist | `{ok, Handle}` or `{error, Reason}`         |
//! | `adc:take_reading/2`   | handle, options  | `{Raw, Voltage}` or `{error, Reason}`       |
//! | `adc:pin_is_adc2/1`    | pin              | `true` or `false`                           |
//! | `adc:wifi_lock/0`      |                  | `ok` or `{error, Reason}`                   |
//! | `adc:wifi_free/0`      |                  | `ok` or `{error, Reason}`                   |

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use log::{debug, error, info, warn};

use crate::calibration;
use crate::driver::AdcDriver;
use crate::error::{AdcError, AdcResult, ConfigKey};
use crate::handle::{AdcHandle, ResourceTable, ResourceType};
use crate::pin::{self, AdcUnit};
use crate::reading::{DEFAULT_SAMPLES, Reading, ReadingOptions};
use crate::resource::{AdcResource, OpenOptions};
use crate::target::Platform;
use crate::term::{PropValue, Term};

/// Native function entry point
pub type Nif<'d, D> = fn(&mut AdcNifs<'d, D>, &[Term]) -> Term;

/// Atom or integer reported to the caller for an error
pub fn error_reason(error: &AdcError) -> Term {
    match error {
        AdcError::UnsupportedPin { .. } => Term::atom("invalid_pin"),
        AdcError::InvalidConfig {
            key: ConfigKey::Width,
        } => Term::atom("invalid_width"),
        AdcError::InvalidConfig {
            key: ConfigKey::Attenuation,
        } => Term::atom("invalid_db"),
        AdcError::DriverError { code } => Term::int(code.code()),
        AdcError::CalibrationError { .. } => Term::atom("calibration_error"),
        AdcError::ReadError {
            unit: AdcUnit::Unit2,
            code,
        } if code.is_timeout() => Term::atom("timeout"),
        AdcError::ReadError { .. } => Term::atom("read_error"),
        AdcError::InvalidArgument { .. } => Term::atom("badarg"),
        AdcError::OutOfMemory => Term::atom("out_of_memory"),
    }
}

fn badarg(what: &'static str) -> AdcError {
    AdcError::InvalidArgument { what }
}

fn optional_atom<'a>(options: &'a Term, key: &'static str) -> AdcResult<Option<&'a str>> {
    match options.proplist_get(key) {
        None => Ok(None),
        Some(value) => value.as_atom().map(Some).ok_or(badarg(key)),
    }
}

fn optional_bool(options: &Term, key: &'static str) -> AdcResult<bool> {
    match options.proplist_get(key) {
        None => Ok(false),
        Some(value) => value.as_bool().ok_or(badarg(key)),
    }
}

fn to_i32(value: Option<i64>, what: &'static str) -> AdcResult<i32> {
    value
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(badarg(what))
}

/// Decode `[{pin, P}, {bitwidth, W}, {attenuation, A}]`.
pub fn parse_open_options(options: &Term) -> AdcResult<OpenOptions<'_>> {
    if !matches!(options, Term::List(_)) {
        return Err(badarg("options"));
    }
    let pin = to_i32(options.proplist_get("pin").and_then(|v| v.as_int()), "pin")?;
    Ok(OpenOptions {
        pin,
        bitwidth: optional_atom(options, "bitwidth")?,
        attenuation: optional_atom(options, "attenuation")?,
    })
}

/// Decode `[{samples, N}, raw | {raw, B}, voltage | {voltage, B}]`.
pub fn parse_reading_options(options: &Term) -> AdcResult<ReadingOptions> {
    if !matches!(options, Term::List(_)) {
        return Err(badarg("options"));
    }
    let samples = match options.proplist_get("samples") {
        None => DEFAULT_SAMPLES,
        Some(value) => to_i32(value.as_int(), "samples")?,
    };
    Ok(ReadingOptions {
        samples,
        raw: optional_bool(options, "raw")?,
        voltage: optional_bool(options, "voltage")?,
    })
}

/// `{Raw | undefined, Voltage | undefined}`
pub fn reading_term(reading: &Reading) -> Term {
    let value = |v: Option<i32>| v.map(Term::int).unwrap_or_else(Term::undefined);
    Term::tuple([value(reading.raw), value(reading.voltage)])
}

/// ADC native functions bound to one driver and platform.
pub struct AdcNifs<'d, D: AdcDriver> {
    driver: &'d D,
    platform: Platform,
    table: ResourceTable<'d, D>,
}

impl<'d, D: AdcDriver> AdcNifs<'d, D> {
    /// Bind the native functions. Logs the calibration schemes the chip offers.
    pub fn new(driver: &'d D, platform: Platform, resource_type: &ResourceType) -> Self {
        info!(
            "ADC binding on {} (ADC2 {})",
            platform.target().name,
            if platform.adc2_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        );
        calibration::log_calibration_support(driver);
        Self {
            driver,
            platform,
            table: ResourceTable::new(resource_type),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn resources(&self) -> &ResourceTable<'d, D> {
        &self.table
    }

    pub fn open(&mut self, options: &Term) -> AdcResult<AdcHandle> {
        let options = parse_open_options(options)?;
        let resource = AdcResource::open(self.driver, &self.platform, &options)?;
        let handle = self.table.insert(resource)?;
        debug!("Pin {} opened as {:?}", options.pin, handle);
        Ok(handle)
    }

    pub fn take_reading(&mut self, handle: &Term, options: &Term) -> AdcResult<Reading> {
        let Term::Resource(handle) = handle else {
            return Err(badarg("handle"));
        };
        let resource = self.table.get_mut(handle).ok_or(badarg("handle"))?;
        let options = parse_reading_options(options)?;
        resource.take_reading(&options)
    }

    pub fn pin_is_adc2(&self, pin: &Term) -> AdcResult<bool> {
        let pin = to_i32(pin.as_int(), "pin")?;
        Ok(pin::pin_is_adc2(&self.platform, pin))
    }

    /// Keep Wi-Fi off ADC2 until [`wifi_free`](Self::wifi_free).
    ///
    /// With ADC2 disabled there is nothing to lock and this succeeds.
    pub fn wifi_lock(&self) -> AdcResult<()> {
        if !self.platform.adc2_enabled() {
            warn!("Ignoring wifi_lock, ADC2 is disabled and ADC1 does not need it");
            return Ok(());
        }
        self.driver.acquire_adc2().map_err(|code| {
            error!("Acquiring the Wi-Fi lock on ADC2 failed: {}", code);
            AdcError::DriverError { code }
        })?;
        debug!("Wi-Fi lock acquired on ADC2");
        Ok(())
    }

    pub fn wifi_free(&self) -> AdcResult<()> {
        if !self.platform.adc2_enabled() {
            warn!("Ignoring wifi_free, ADC2 is disabled");
            return Ok(());
        }
        self.driver.release_adc2().map_err(|code| {
            error!("Freeing the Wi-Fi lock on ADC2 failed: {}", code);
            AdcError::DriverError { code }
        })?;
        debug!("Wi-Fi lock released on ADC2");
        Ok(())
    }

    /// Runtime side: another reference to `handle` was taken.
    pub fn retain(&mut self, handle: &AdcHandle) -> bool {
        self.table.retain(handle)
    }

    /// Runtime side: a reference to `handle` went away.
    pub fn release(&mut self, handle: &AdcHandle) -> bool {
        self.table.release(handle)
    }

    fn nif_open(&mut self, args: &[Term]) -> Term {
        let [options] = args else {
            return Term::error_tuple(Term::atom("badarg"));
        };
        match self.open(options) {
            Ok(handle) => Term::ok_tuple(Term::Resource(handle)),
            Err(err) => Term::error_tuple(error_reason(&err)),
        }
    }

    fn nif_take_reading(&mut self, args: &[Term]) -> Term {
        let [handle, options] = args else {
            return Term::error_tuple(Term::atom("badarg"));
        };
        match self.take_reading(handle, options) {
            Ok(reading) => reading_term(&reading),
            Err(err) => Term::error_tuple(error_reason(&err)),
        }
    }

    fn nif_pin_is_adc2(&mut self, args: &[Term]) -> Term {
        let [pin] = args else {
            return Term::error_tuple(Term::atom("badarg"));
        };
        match self.pin_is_adc2(pin) {
            Ok(is_adc2) => Term::boolean(is_adc2),
            Err(err) => Term::error_tuple(error_reason(&err)),
        }
    }

    fn nif_wifi_lock(&mut self, args: &[Term]) -> Term {
        if !args.is_empty() {
            return Term::error_tuple(Term::atom("badarg"));
        }
        match self.wifi_lock() {
            Ok(()) => Term::ok(),
            Err(AdcError::DriverError { code }) if code.is_timeout() => {
                Term::error_tuple(Term::atom("timeout"))
            }
            Err(err) => Term::error_tuple(error_reason(&err)),
        }
    }

    fn nif_wifi_free(&mut self, args: &[Term]) -> Term {
        if !args.is_empty() {
            return Term::error_tuple(Term::atom("badarg"));
        }
        match self.wifi_free() {
            Ok(()) => Term::ok(),
            Err(err) => Term::error_tuple(error_reason(&err)),
        }
    }
}

/// Look a native function up by `module:function/arity`.
pub fn resolve_nif<'d, D: AdcDriver>(name: &str) -> Option<Nif<'d, D>> {
    let nif: Nif<'d, D> = match name {
        "adc:open/1" => AdcNifs::nif_open,
        "adc:take_reading/2" => AdcNifs::nif_take_reading,
        "adc:pin_is_adc2/1" => AdcNifs::nif_pin_is_adc2,
        "adc:wifi_lock/0" => AdcNifs::nif_wifi_lock,
        "adc:wifi_free/0" => AdcNifs::nif_wifi_free,
        _ => return None,
    };
    debug!("Resolved nif {}", name);
    Some(nif)
}

/// [`AdcNifs`] behind an async mutex, for callers on several tasks.
///
/// A reading takes `samples` driver reads on every open unit and can run for
/// milliseconds, far too long to hold interrupts off. The critical-section
/// raw mutex only guards the lock state; the native itself runs with
/// interrupts enabled while other callers wait on the lock. Calls are still
/// serialised, so two readings on the same resource never interleave.
pub struct SharedAdcNifs<'d, D: AdcDriver> {
    inner: Mutex<CriticalSectionRawMutex, AdcNifs<'d, D>>,
}

impl<'d, D: AdcDriver> SharedAdcNifs<'d, D> {
    pub const fn new(nifs: AdcNifs<'d, D>) -> Self {
        Self {
            inner: Mutex::new(nifs),
        }
    }

    pub async fn call(&self, nif: Nif<'d, D>, args: &[Term]) -> Term {
        let mut nifs = self.inner.lock().await;
        nif(&mut *nifs, args)
    }

    /// Run `nif` now, or return `None` while another call holds the binding.
    pub fn try_call(&self, nif: Nif<'d, D>, args: &[Term]) -> Option<Term> {
        let mut nifs = self.inner.try_lock().ok()?;
        Some(nif(&mut *nifs, args))
    }

    pub async fn release(&self, handle: &AdcHandle) -> bool {
        self.inner.lock().await.release(handle)
    }
}
