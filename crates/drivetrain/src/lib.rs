//! Virtual drivetrain and shift-control engine for the OpenRover RC car.
//!
//! The car has a single ESC for drive and a single servo for steering; this
//! crate turns raw pedal/gear-selector input into plausible automatic
//! transmission behavior: idle creep, 8-speed shifting with torque shaping,
//! engine braking, and a redline cut. One call to [`Drivetrain::step`] per
//! fixed tick (100 Hz nominal) advances the whole pipeline and the result is
//! read back out of [`VehicleState`] or as a [`TelemetrySnapshot`].
//!
//! The core is a pure step function: no I/O, no clocks, no allocation on the
//! tick path. Actuator mapping (servo pulses, ESC pulses, lamps) lives in
//! `openrover-actuation`; the cadence loop and command mailbox live in
//! `openrover-runtime`.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod input;
pub mod model;
pub mod state;

mod engine;
mod gate;
mod physics;
mod rpm;
mod scheduler;
mod shift;
mod torque;

pub use config::{DriveConfig, GearboxConfig, ShiftTimingConfig, ThresholdConfig};
pub use input::TickInput;
pub use model::Drivetrain;
pub use state::{DriveEvents, Gear, ShiftState, TelemetrySnapshot, VehicleState};

use thiserror::Error;

/// Errors raised while constructing a drivetrain from configuration.
///
/// The tick path itself is total: malformed runtime inputs are clamped, and
/// interlock violations surface as [`DriveEvents`] flags, never as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrivetrainError {
    #[error("invalid gearbox config: {0}")]
    InvalidGearbox(String),

    #[error("invalid shift timing config: {0}")]
    InvalidShiftTiming(String),

    #[error("invalid threshold config: {0}")]
    InvalidThresholds(String),
}

pub type DrivetrainResult<T> = Result<T, DrivetrainError>;

/// Lowest selectable forward gear.
pub const MIN_VIRTUAL_GEAR: u8 = 1;

/// Highest selectable forward gear.
pub const MAX_VIRTUAL_GEAR: u8 = 8;

/// Pedal axis range accepted from the transport layer.
pub const AXIS_MAX: f64 = 50.0;

/// Nominal tick interval for the 100 Hz control loop.
pub const DEFAULT_TICK_INTERVAL_S: f64 = 0.01;
