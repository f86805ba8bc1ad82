//! Calibration scheme negotiation
//!
//! Schemes are tried in [`CalibrationKind::PREFERENCE`] order. A unit whose
//! chip carries no usable trim data simply stays uncalibrated; that is a
//! valid state and readings from it are returned as raw codes only.

use log::{debug, info, warn};

use crate::config::{Attenuation, BitWidth};
use crate::driver::{CalibrationDriver, CalibrationKind, SchemeError};
use crate::pin::{AdcUnit, Channel};

/// A live calibration scheme together with the kind it was created as.
///
/// The kind decides which deleter releases the scheme.
#[derive(Debug)]
pub struct Calibration<S> {
    kind: CalibrationKind,
    scheme: S,
}

impl<S> Calibration<S> {
    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    pub(crate) fn scheme(&self) -> &S {
        &self.scheme
    }

    pub(crate) fn into_parts(self) -> (CalibrationKind, S) {
        (self.kind, self.scheme)
    }
}

/// Try each advertised scheme in preference order.
///
/// Returns `None` when no scheme is advertised or every attempt failed.
pub fn negotiate<D: CalibrationDriver>(
    driver: &D,
    unit: AdcUnit,
    channel: Channel,
    width: BitWidth,
    attenuation: Attenuation,
) -> Option<Calibration<D::Scheme>> {
    for kind in CalibrationKind::PREFERENCE {
        if !driver.scheme_supported(kind) {
            debug!("{}: {} not advertised", unit, kind);
            continue;
        }

        match driver.create_scheme(kind, unit, channel, attenuation, width) {
            Ok(scheme) => {
                info!("{} {}: calibrated using {}", unit, channel, kind);
                return Some(Calibration { kind, scheme });
            }
            Err(SchemeError::Unsupported) => {
                debug!("{}: {} unsupported by eFuse data", unit, kind);
            }
            Err(SchemeError::Failed(code)) => {
                warn!("{}: creating {} scheme failed: {}", unit, kind, code);
            }
        }
    }

    warn!(
        "{} {}: no calibration scheme available, readings will be raw only",
        unit, channel
    );
    None
}

/// Log which calibration schemes this chip advertises.
pub fn log_calibration_support<D: CalibrationDriver>(driver: &D) {
    for kind in CalibrationKind::PREFERENCE {
        if driver.scheme_supported(kind) {
            info!("Calibration {}: Supported", kind);
        } else {
            info!("Calibration {}: NOT supported", kind);
        }
    }
}
