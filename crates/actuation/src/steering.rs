//! Steering servo targeting and slew limiting.

use serde::{Deserialize, Serialize};

use openrover_drivetrain::{Gear, VehicleState};

use crate::{ActuationError, ActuationResult};

/// Servo throw endpoints and the rate limit for moving between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringConfig {
    /// Full-left pulse, microseconds.
    pub left_pulse_us: f64,
    /// Full-right pulse, microseconds.
    pub right_pulse_us: f64,
    /// Straight-ahead pulse, microseconds.
    pub center_pulse_us: f64,
    /// Servo travel rate, microseconds of pulse per second.
    pub slew_us_per_s: f64,
    /// Honor steering input whenever the engine runs, even in Park.
    pub steer_when_engine_on: bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            left_pulse_us: 600.0,
            right_pulse_us: 2400.0,
            center_pulse_us: 1800.0,
            slew_us_per_s: 1000.0,
            steer_when_engine_on: true,
        }
    }
}

impl SteeringConfig {
    /// Target pulse for a steering direction: negative is left, positive is
    /// right, zero recenters.
    #[must_use]
    pub fn target_for(&self, direction: i8) -> f64 {
        match direction {
            i8::MIN..=-1 => self.left_pulse_us,
            0 => self.center_pulse_us,
            1..=i8::MAX => self.right_pulse_us,
        }
    }

    /// Whether steering input is honored right now. Steering is live
    /// whenever the selector is out of Park; with `steer_when_engine_on`
    /// set it is also live any time the engine runs, so the driver can
    /// preposition the wheels before pulling away.
    #[must_use]
    pub fn permits(&self, engine_running: bool, gear: Gear) -> bool {
        (self.steer_when_engine_on && engine_running) || gear != Gear::Park
    }

    pub(crate) fn validate(&self) -> ActuationResult<()> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;
        if ![self.left_pulse_us, self.right_pulse_us, self.center_pulse_us]
            .iter()
            .all(|p| finite_positive(*p))
        {
            return Err(ActuationError::InvalidPulseRange(
                "steering pulses must be finite and positive".to_string(),
            ));
        }
        let low = self.left_pulse_us.min(self.right_pulse_us);
        let high = self.left_pulse_us.max(self.right_pulse_us);
        if self.center_pulse_us < low || self.center_pulse_us > high {
            return Err(ActuationError::InvalidPulseRange(
                "steering center must lie between the endpoints".to_string(),
            ));
        }
        if !finite_positive(self.slew_us_per_s) {
            return Err(ActuationError::InvalidRate(
                "steering slew rate must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Advance the servo one tick. Disallowed input recenters rather than
/// freezing, so the wheels come back straight when permission is revoked.
pub(crate) fn update(cfg: &SteeringConfig, state: &mut VehicleState, direction: i8, dt_s: f64) {
    let direction = if cfg.permits(state.engine_running, state.gear) {
        direction
    } else {
        0
    };
    state.steering_target_us = cfg.target_for(direction);

    let max_step = cfg.slew_us_per_s * dt_s.max(0.0);
    let delta = state.steering_target_us - state.steering_current_us;
    state.steering_current_us += delta.clamp(-max_step, max_step);
}
