//! Headlight and taillight brightness rules.

use serde::{Deserialize, Serialize};

use openrover_drivetrain::VehicleState;

use crate::{ActuationError, ActuationResult};

/// Brightness levels for the two lamp channels, each in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LampConfig {
    /// Headlight level while toggled on.
    pub head_on_brightness: f64,
    /// Taillight level while braking in a motive gear.
    pub tail_brake_brightness: f64,
    /// Taillight running-light level while the headlights are on.
    pub tail_running_brightness: f64,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            head_on_brightness: 1.0,
            tail_brake_brightness: 1.0,
            tail_running_brightness: 0.5,
        }
    }
}

impl LampConfig {
    /// Headlight output: full configured level or dark.
    #[must_use]
    pub fn headlight(&self, state: &VehicleState) -> f64 {
        if state.headlight_on {
            self.head_on_brightness
        } else {
            0.0
        }
    }

    /// Taillight output. Brake lights win over running lights: braking in R
    /// or D lights the lamp fully, otherwise it tracks the headlights at
    /// the dimmer running level.
    #[must_use]
    pub fn taillight(&self, state: &VehicleState) -> f64 {
        let braking = state.brake_intent > 0.0;
        if braking && state.gear.is_motive() {
            self.tail_brake_brightness
        } else if state.headlight_on {
            self.tail_running_brightness
        } else {
            0.0
        }
    }

    pub(crate) fn validate(&self) -> ActuationResult<()> {
        let levels = [
            self.head_on_brightness,
            self.tail_brake_brightness,
            self.tail_running_brightness,
        ];
        if !levels.iter().all(|level| (0.0..=1.0).contains(level)) {
            return Err(ActuationError::InvalidBrightness(
                "lamp levels must be in [0,1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrover_drivetrain::Gear;

    #[test]
    fn headlight_follows_the_toggle() {
        let cfg = LampConfig::default();
        let mut state = VehicleState::new();
        assert!(cfg.headlight(&state) < f64::EPSILON);

        state.headlight_on = true;
        assert!((cfg.headlight(&state) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn braking_in_drive_lights_the_brake_lamp_fully() {
        let cfg = LampConfig::default();
        let mut state = VehicleState::new();
        state.gear = Gear::Drive;
        state.brake_intent = 0.4;
        assert!((cfg.taillight(&state) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn brake_lamp_beats_the_running_light() {
        let cfg = LampConfig::default();
        let mut state = VehicleState::new();
        state.gear = Gear::Reverse;
        state.headlight_on = true;
        state.brake_intent = 1.0;
        assert!((cfg.taillight(&state) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn headlights_on_give_a_dim_running_light() {
        let cfg = LampConfig::default();
        let mut state = VehicleState::new();
        state.headlight_on = true;
        assert!((cfg.taillight(&state) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn braking_in_park_does_not_light_the_brake_lamp() {
        let cfg = LampConfig::default();
        let mut state = VehicleState::new();
        state.brake_intent = 1.0;
        assert!(cfg.taillight(&state) < f64::EPSILON);

        state.headlight_on = true;
        assert!((cfg.taillight(&state) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn everything_off_means_dark() {
        let cfg = LampConfig::default();
        let state = VehicleState::new();
        assert!(cfg.headlight(&state) < f64::EPSILON);
        assert!(cfg.taillight(&state) < f64::EPSILON);
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        let cfg = LampConfig {
            tail_brake_brightness: 1.5,
            ..LampConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ActuationError::InvalidBrightness(_))
        ));
    }
}
