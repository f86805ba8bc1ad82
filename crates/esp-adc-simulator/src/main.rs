//! Desktop simulator for the esp-adc binding.
//!
//! Runs the native functions against a simulated converter so the binding
//! can be exercised without hardware. Raw codes follow a slow sine wave per
//! unit; the calibration schemes convert them linearly over the
//! attenuation's input range.
//!
//! # Usage
//!
//! ```text
//! esp-adc-simulator [pin] [samples]
//! ```
//!
//! `pin` defaults to 34 and `samples` to the binding's default. Set
//! `RUST_LOG=debug` to follow every driver call.

use std::cell::Cell;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use log::{error, info, warn};

use esp_adc_core::config::{Attenuation, BitWidth};
use esp_adc_core::driver::{
    Adc2WifiLock, CalibrationDriver, CalibrationKind, EspCode, OneshotDriver, SchemeError,
};
use esp_adc_core::pin::{AdcUnit, Channel};
use esp_adc_core::reading::DEFAULT_SAMPLES;
use esp_adc_core::{AdcNifs, Platform, ResourceType, SharedAdcNifs, Term, resolve_nif};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

const DEFAULT_PIN: i64 = 34;

/// Number of readings taken before the handle is released.
const READINGS: usize = 5;

/// Pause between readings.
const READING_INTERVAL: Duration = Duration::from_millis(250);

/// Period of the simulated input signal.
const SIGNAL_PERIOD_SECS: f64 = 4.0;

// ---------------------------------------------------------------------------
// Simulated vendor driver
// ---------------------------------------------------------------------------

struct SimSession {
    unit: AdcUnit,
    width: BitWidth,
}

struct SimScheme {
    full_scale_mv: i32,
    max_code: i32,
}

/// Converter whose inputs are a sine wave, offset per unit.
struct SimulatedAdc {
    started: Instant,
    curve_fitting: bool,
    line_fitting: bool,
    open_sessions: Cell<u32>,
    adc2_locked: Cell<bool>,
}

impl SimulatedAdc {
    fn new(platform: &Platform) -> Self {
        // The plain ESP32 only carries line-fitting trim data.
        let is_esp32 = platform.target().name == "esp32";
        Self {
            started: Instant::now(),
            curve_fitting: !is_esp32,
            line_fitting: is_esp32,
            open_sessions: Cell::new(0),
            adc2_locked: Cell::new(false),
        }
    }

    /// Input level in `0.0..=1.0` of full scale.
    fn level(&self, unit: AdcUnit) -> f64 {
        let t = self.started.elapsed().as_secs_f64();
        let phase = match unit {
            AdcUnit::Unit1 => 0.0,
            AdcUnit::Unit2 => std::f64::consts::FRAC_PI_2,
        };
        let wave = (t / SIGNAL_PERIOD_SECS * std::f64::consts::TAU + phase).sin();
        0.5 + 0.4 * wave
    }
}

fn full_scale_mv(attenuation: Attenuation) -> i32 {
    match attenuation {
        Attenuation::Db0 => 950,
        Attenuation::Db2p5 => 1250,
        Attenuation::Db6 => 1750,
        Attenuation::Db11 => 2450,
    }
}

impl OneshotDriver for SimulatedAdc {
    type Session = SimSession;

    fn new_unit(&self, unit: AdcUnit) -> Result<SimSession, EspCode> {
        self.open_sessions.set(self.open_sessions.get() + 1);
        Ok(SimSession {
            unit,
            width: BitWidth::Bit12,
        })
    }

    fn config_channel(
        &self,
        session: &mut SimSession,
        _channel: Channel,
        width: BitWidth,
        _attenuation: Attenuation,
    ) -> Result<(), EspCode> {
        session.width = width;
        Ok(())
    }

    fn read(&self, session: &mut SimSession, _channel: Channel) -> Result<i32, EspCode> {
        let max_code = session.width.max_code();
        Ok((self.level(session.unit) * f64::from(max_code)) as i32)
    }

    fn del_unit(&self, _session: SimSession) -> Result<(), EspCode> {
        self.open_sessions.set(self.open_sessions.get() - 1);
        Ok(())
    }
}

impl CalibrationDriver for SimulatedAdc {
    type Scheme = SimScheme;

    fn scheme_supported(&self, kind: CalibrationKind) -> bool {
        match kind {
            CalibrationKind::CurveFitting => self.curve_fitting,
            CalibrationKind::LineFitting => self.line_fitting,
        }
    }

    fn create_scheme(
        &self,
        kind: CalibrationKind,
        _unit: AdcUnit,
        _channel: Channel,
        attenuation: Attenuation,
        width: BitWidth,
    ) -> Result<SimScheme, SchemeError> {
        if !self.scheme_supported(kind) {
            return Err(SchemeError::Unsupported);
        }
        Ok(SimScheme {
            full_scale_mv: full_scale_mv(attenuation),
            max_code: width.max_code(),
        })
    }

    fn raw_to_voltage(&self, scheme: &SimScheme, raw: i32) -> Result<i32, EspCode> {
        let mv = i64::from(raw) * i64::from(scheme.full_scale_mv) / i64::from(scheme.max_code);
        i32::try_from(mv).map_err(|_| EspCode::INVALID_ARG)
    }

    fn delete_scheme(&self, _kind: CalibrationKind, _scheme: SimScheme) -> Result<(), EspCode> {
        Ok(())
    }
}

impl Adc2WifiLock for SimulatedAdc {
    fn acquire_adc2(&self) -> Result<(), EspCode> {
        self.adc2_locked.set(true);
        Ok(())
    }

    fn release_adc2(&self) -> Result<(), EspCode> {
        if !self.adc2_locked.replace(false) {
            return Err(EspCode::INVALID_STATE);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn parse_arg(args: &[String], index: usize, name: &str, default: i64) -> Option<i64> {
    match args.get(index) {
        None => Some(default),
        Some(text) => match text.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                error!("{} must be an integer, got '{}'", name, text);
                None
            }
        },
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let (Some(pin), Some(samples)) = (
        parse_arg(&args, 1, "pin", DEFAULT_PIN),
        parse_arg(&args, 2, "samples", i64::from(DEFAULT_SAMPLES)),
    ) else {
        return ExitCode::from(2);
    };

    let platform = Platform::from_features();
    let driver = SimulatedAdc::new(&platform);
    let resource_type = ResourceType::register("adc");
    info!(
        "Starting esp-adc simulator ({}, resource type '{}')",
        platform.target().name,
        resource_type.name()
    );

    let nifs = SharedAdcNifs::new(AdcNifs::new(&driver, platform, &resource_type));

    let (Some(open), Some(take_reading), Some(pin_is_adc2), Some(wifi_lock), Some(wifi_free)) = (
        resolve_nif("adc:open/1"),
        resolve_nif("adc:take_reading/2"),
        resolve_nif("adc:pin_is_adc2/1"),
        resolve_nif("adc:wifi_lock/0"),
        resolve_nif("adc:wifi_free/0"),
    ) else {
        error!("ADC natives are not registered");
        return ExitCode::FAILURE;
    };

    let on_adc2 = block_on(nifs.call(pin_is_adc2, &[Term::int(pin)]));
    info!("adc:pin_is_adc2({}) -> {:?}", pin, on_adc2);
    let on_adc2 = on_adc2.as_bool() == Some(true);
    if on_adc2 {
        info!("adc:wifi_lock() -> {:?}", block_on(nifs.call(wifi_lock, &[])));
    }

    let options = Term::list([
        Term::property("pin", Term::int(pin)),
        Term::property("bitwidth", Term::atom("bit_max")),
        Term::property("attenuation", Term::atom("db_11")),
    ]);
    let handle = match block_on(nifs.call(open, &[options])) {
        Term::Tuple(items) if items.len() == 2 && items[0].is_atom("ok") => items[1].clone(),
        reply => {
            error!("adc:open/1 -> {:?}", reply);
            return ExitCode::FAILURE;
        }
    };

    let reading_options = Term::list([
        Term::property("samples", Term::int(samples)),
        Term::atom("raw"),
        Term::atom("voltage"),
    ]);
    for _ in 0..READINGS {
        let reply = block_on(nifs.call(
            take_reading,
            &[handle.clone(), reading_options.clone()],
        ));
        match &reply {
            Term::Tuple(items) if items.len() == 2 && !items[0].is_atom("error") => {
                info!("raw {:?}, voltage {:?} mV", items[0], items[1]);
            }
            _ => warn!("adc:take_reading/2 -> {:?}", reply),
        }
        thread::sleep(READING_INTERVAL);
    }

    if let Term::Resource(handle) = handle {
        block_on(nifs.release(&handle));
    }
    if on_adc2 {
        info!("adc:wifi_free() -> {:?}", block_on(nifs.call(wifi_free, &[])));
    }
    if driver.open_sessions.get() != 0 {
        error!("{} unit sessions still open", driver.open_sessions.get());
        return ExitCode::FAILURE;
    }
    info!("All ADC sessions released");
    ExitCode::SUCCESS
}
