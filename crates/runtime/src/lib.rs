//! Control-loop runtime for the OpenRover RC car.
//!
//! Wires the pure drivetrain step and the actuator mapping into a living
//! system: a dedicated control thread ticking at a fixed cadence, a
//! single-writer command mailbox sampled once per tick, the ESC arming
//! handover, and a telemetry watch channel for broadcast. The transport
//! layer writes commands into the [`Mailbox`]; everything else happens on
//! the control thread.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod cadence;
pub mod mailbox;
pub mod session;

pub use cadence::{CadenceMetrics, TickCadence};
pub use mailbox::Mailbox;
pub use session::{Session, SessionConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("invalid cadence: {0}")]
    InvalidCadence(String),

    #[error(transparent)]
    Drivetrain(#[from] openrover_drivetrain::DrivetrainError),

    #[error(transparent)]
    Actuation(#[from] openrover_actuation::ActuationError),

    #[error("control thread failed to start: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("control thread panicked")]
    LoopPanicked,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
