//! Shift scheduler.
//!
//! Reads last tick's virtual RPM and decides whether the gearbox should
//! change ratio. Hysteresis lives in the threshold gap between
//! `up_threshold_rpm` and `down_threshold_rpm`; dwell comes for free from the
//! shift machine refusing new requests until it returns to READY.

use crate::config::{GearboxConfig, ThresholdConfig};
use crate::state::{Gear, ShiftState, VehicleState};
use crate::{MAX_VIRTUAL_GEAR, MIN_VIRTUAL_GEAR};

/// Throttle intent above which an upshift is held back until the engine revs
/// well past the threshold. Stops short-shifting out of a hard launch.
const KICKDOWN_THROTTLE_INTENT: f64 = 0.7;

/// Brake intent above which a downshift is forced for engine braking.
const BRAKE_DOWNSHIFT_INTENT: f64 = 0.5;

/// Evaluate the schedule for one tick and begin a shift when one is due.
pub(crate) fn tick(state: &mut VehicleState, gearbox: &GearboxConfig, thresholds: &ThresholdConfig) {
    if state.gear != Gear::Drive || state.shift_state != ShiftState::Ready {
        return;
    }
    if state.vrpm < thresholds.idle_rpm {
        return;
    }
    if let Some(direction) = decide(state, gearbox, thresholds) {
        begin_shift(state, direction);
    }
}

/// Pure scheduling decision: `Some(+1)` for an upshift, `Some(-1)` for a
/// downshift, `None` to hold the current gear. Upshift wins when both fire.
fn decide(
    state: &VehicleState,
    gearbox: &GearboxConfig,
    thresholds: &ThresholdConfig,
) -> Option<i8> {
    let up_rpm = if state.sport_mode_on {
        thresholds.up_threshold_rpm + thresholds.sport_upshift_offset_rpm
    } else {
        thresholds.up_threshold_rpm
    };

    if state.virtual_gear < MAX_VIRTUAL_GEAR && state.vrpm >= up_rpm {
        let held_for_throttle = state.throttle_intent > KICKDOWN_THROTTLE_INTENT
            && state.vrpm < up_rpm + thresholds.throttle_delay_rpm;
        if !held_for_throttle {
            return Some(1);
        }
    }

    if state.virtual_gear > MIN_VIRTUAL_GEAR
        && (state.vrpm <= thresholds.down_threshold_rpm
            || state.brake_intent > BRAKE_DOWNSHIFT_INTENT)
    {
        let target = state.virtual_gear.saturating_sub(1);
        let expected_rpm =
            state.vrpm * gearbox.ratio_for(target) / gearbox.ratio_for(state.virtual_gear);
        if expected_rpm <= thresholds.redline_rpm {
            return Some(-1);
        }
    }

    None
}

/// Arm the shift machine for a one-gear change.
///
/// Rejected while a shift is already in flight. The torque command at request
/// time is snapshotted so PRECUT can ramp down from it.
pub(crate) fn begin_shift(state: &mut VehicleState, direction: i8) -> bool {
    if state.shift_state != ShiftState::Ready {
        return false;
    }
    let target = (i16::from(state.virtual_gear) + i16::from(direction))
        .clamp(i16::from(MIN_VIRTUAL_GEAR), i16::from(MAX_VIRTUAL_GEAR));
    state.shift_target_gear = u8::try_from(target).unwrap_or(state.virtual_gear);
    state.shift_direction = direction;
    state.shift_torque_prev = state.torque_cmd;
    state.shift_state = ShiftState::Precut;
    state.shift_timer_ms = 0.0;
    true
}
