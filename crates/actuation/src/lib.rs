//! Actuator command mapping for the OpenRover RC car.
//!
//! Translates the drivetrain's abstract state into concrete hardware
//! commands: ESC pulse widths, steering servo pulses, lamp brightness, and
//! the timed ESC arming sequence. Everything here is pure command
//! computation; pushing pulses onto wires is the hardware bridge's job.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod arming;
pub mod esc;
pub mod lamps;
pub mod mapper;
pub mod steering;

pub use arming::{ArmingConfig, ArmingPhase, ArmingSequencer};
pub use esc::EscConfig;
pub use lamps::LampConfig;
pub use mapper::{ActuatorFrame, HardwareBridge, OutputMapper, OutputMapperConfig};
pub use steering::SteeringConfig;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActuationError {
    #[error("invalid pulse configuration: {0}")]
    InvalidPulseRange(String),

    #[error("invalid rate configuration: {0}")]
    InvalidRate(String),

    #[error("invalid brightness configuration: {0}")]
    InvalidBrightness(String),

    /// Raised by [`HardwareBridge`] implementations when a write fails.
    /// The control loop logs these and keeps ticking; retries belong to
    /// the bridge itself.
    #[error("hardware bridge: {0}")]
    Bridge(String),
}

pub type ActuationResult<T> = Result<T, ActuationError>;

/// Round a pulse width to the integer microseconds the PWM hardware takes.
pub(crate) fn round_pulse_us(pulse: f64) -> u16 {
    let bounded = pulse.round().clamp(0.0, f64::from(u16::MAX));
    u16::try_from(bounded as i64).unwrap_or(u16::MAX)
}
