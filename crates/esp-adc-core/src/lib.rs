//! Hardware-independent core of the esp-adc binding
//!
//! Exposes the chip's analog-to-digital converters to a bytecode VM as
//! native functions: open a pin as an ADC resource, take averaged raw and
//! calibrated millivolt readings from it, and release the converter when the
//! last reference to the handle goes away.
//!
//! The vendor's oneshot and calibration APIs sit behind the traits in
//! [`driver`], so everything here builds and tests on a desktop host. It is
//! `no_std` with `extern crate alloc` for the term model.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod calibration;
pub mod config;
pub mod driver;
pub mod error;
pub mod handle;
pub mod nif;
pub mod pin;
pub mod reading;
pub mod resource;
pub mod target;
pub mod term;

#[cfg(test)]
mod mock;

pub use driver::{AdcDriver, CalibrationDriver, CalibrationKind, EspCode, OneshotDriver};
pub use error::{AdcError, AdcResult};
pub use handle::{AdcHandle, ResourceType};
pub use nif::{AdcNifs, SharedAdcNifs, resolve_nif};
pub use reading::{Reading, ReadingOptions};
pub use resource::{AdcResource, OpenOptions};
pub use target::Platform;
pub use term::Term;
