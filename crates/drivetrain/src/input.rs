//! Pedal-axis conditioning: clamp, slew limit, and intent classification.

use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::state::{Gear, VehicleState};
use crate::AXIS_MAX;

/// One tick's worth of commands sampled from the transport layer.
///
/// `axis` is the combined pedal: positive throttle, negative brake. Gear
/// requests and toggles are one-shot; axis and steering direction are level
/// signals that persist between updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Raw pedal axis, nominally in [-50,50]; out-of-range values are clamped.
    pub axis: f64,
    /// Steering direction: -1 left, 0 center, +1 right.
    pub steer_dir: i8,
    /// Selector request, if one arrived since the last tick.
    pub gear_request: Option<Gear>,
    pub head_toggle: bool,
    pub sport_mode_toggle: bool,
    pub engine_toggle: bool,
}

impl TickInput {
    /// Input with a pedal axis and everything else at rest.
    #[must_use]
    pub fn with_axis(axis: f64) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }
}

/// Condition the raw axis into the state's throttle/brake intents.
///
/// Total function: any float in produces intents in [0,1]. Non-finite input
/// is treated as a released pedal.
pub(crate) fn condition(state: &mut VehicleState, raw_axis: f64, cfg: &ThresholdConfig) {
    let clamped = if raw_axis.is_finite() {
        raw_axis.clamp(-AXIS_MAX, AXIS_MAX)
    } else {
        0.0
    };

    let delta = (clamped - state.axis).clamp(-cfg.input_slew_limit, cfg.input_slew_limit);
    state.axis += delta;

    if state.axis.abs() < cfg.input_deadzone {
        state.throttle_intent = 0.0;
        state.brake_intent = 0.0;
    } else {
        state.throttle_intent = state.axis.max(0.0) / AXIS_MAX;
        state.brake_intent = (-state.axis).max(0.0) / AXIS_MAX;
    }
}
