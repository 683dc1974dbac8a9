//! Maps drivetrain state to one actuator frame per tick and fans frames
//! out to the hardware bridge.

use openrover_drivetrain::{Gear, VehicleState};
use serde::{Deserialize, Serialize};

use crate::esc::EscConfig;
use crate::lamps::LampConfig;
use crate::steering::{self, SteeringConfig};
use crate::{round_pulse_us, ActuationResult};

/// Hardware command sink, implemented by the actual PWM/servo driver (or a
/// dry-run stand-in). The control loop holds one injected instance; nothing
/// in the actuation path touches global state.
///
/// Failures are returned, logged by the caller, and do not stop the loop.
/// Retries and reconnection belong to the implementation.
pub trait HardwareBridge {
    fn set_steering_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()>;

    /// Normalized drive command in [-1,1]; the bridge applies the ESC pulse
    /// calibration itself.
    fn set_esc_normalized(&mut self, value: f64) -> ActuationResult<()>;

    /// Raw ESC pulse, used by the arming sequencer while it owns the line.
    fn set_esc_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()>;

    fn set_headlight(&mut self, brightness: f64) -> ActuationResult<()>;

    fn set_taillight(&mut self, brightness: f64) -> ActuationResult<()>;
}

/// Everything the hardware should be doing right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorFrame {
    /// Steering servo pulse, microseconds.
    pub steering_pulse_us: u16,
    /// Drive command in [-1,1]: positive forward, negative reverse.
    pub esc_normalized: f64,
    /// Headlight brightness in [0,1].
    pub headlight: f64,
    /// Taillight brightness in [0,1].
    pub taillight: f64,
}

/// Combined configuration for the per-tick output path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputMapperConfig {
    pub esc: EscConfig,
    pub steering: SteeringConfig,
    pub lamps: LampConfig,
}

impl OutputMapperConfig {
    fn validate(&self) -> ActuationResult<()> {
        self.esc.validate()?;
        self.steering.validate()?;
        self.lamps.validate()?;
        Ok(())
    }
}

/// Stateless translator from [`VehicleState`] to [`ActuatorFrame`].
///
/// The only state it advances lives in `VehicleState` itself (the steering
/// servo position), so the mapper can be shared freely by value.
#[derive(Debug, Clone)]
pub struct OutputMapper {
    cfg: OutputMapperConfig,
}

impl OutputMapper {
    pub fn new(cfg: OutputMapperConfig) -> ActuationResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    #[must_use]
    pub fn config(&self) -> &OutputMapperConfig {
        &self.cfg
    }

    /// Advance the steering servo and compute this tick's frame.
    pub fn tick(
        &self,
        state: &mut VehicleState,
        steer_direction: i8,
        dt_s: f64,
    ) -> ActuatorFrame {
        steering::update(&self.cfg.steering, state, steer_direction, dt_s);
        ActuatorFrame {
            steering_pulse_us: round_pulse_us(state.steering_current_us),
            esc_normalized: esc_normalized(state),
            headlight: self.cfg.lamps.headlight(state),
            taillight: self.cfg.lamps.taillight(state),
        }
    }

    /// Shutdown frame: steering centered, ESC neutral, lamps dark. Applied
    /// directly, without slewing, as the last write before hardware teardown.
    #[must_use]
    pub fn safe_frame(&self) -> ActuatorFrame {
        ActuatorFrame {
            steering_pulse_us: round_pulse_us(self.cfg.steering.center_pulse_us),
            esc_normalized: 0.0,
            headlight: 0.0,
            taillight: 0.0,
        }
    }

    /// Physical pulse for a normalized drive command, per the ESC
    /// calibration. Handy for bridges and logs that work in microseconds.
    #[must_use]
    pub fn esc_pulse_for(&self, normalized: f64) -> f64 {
        self.cfg.esc.pulse_for(normalized)
    }

    /// Push one frame to the bridge. While the arming sequencer owns the
    /// ESC line, its raw calibration pulse is passed as the override and
    /// replaces the frame's normalized drive command.
    pub fn apply<B: HardwareBridge>(
        &self,
        frame: &ActuatorFrame,
        esc_pulse_override: Option<u16>,
        bridge: &mut B,
    ) -> ActuationResult<()> {
        bridge.set_steering_pulse_us(frame.steering_pulse_us)?;
        match esc_pulse_override {
            Some(pulse_us) => bridge.set_esc_pulse_us(pulse_us)?,
            None => bridge.set_esc_normalized(frame.esc_normalized)?,
        }
        bridge.set_headlight(frame.headlight)?;
        bridge.set_taillight(frame.taillight)?;
        Ok(())
    }
}

/// Signed drive command for the ESC. Speed is stored as a magnitude; the
/// selector supplies the sign, and the command is forced to zero unless the
/// engine runs and the ESC is armed.
fn esc_normalized(state: &VehicleState) -> f64 {
    if !state.engine_running || !state.esc_armed {
        return 0.0;
    }
    match state.gear {
        Gear::Drive => state.speed.clamp(0.0, 1.0),
        Gear::Reverse => -state.speed.clamp(0.0, 1.0),
        Gear::Park | Gear::Neutral => 0.0,
    }
}
