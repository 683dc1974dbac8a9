//! Torque blending.
//!
//! Strict priority per tick: rev-limiter cut, then braking, then the shift
//! machine's shaped torque, then the normal blend of engine curve, creep and
//! engine braking. The command is a percentage; it only goes negative for
//! brake retardation, which the integrator consumes directly.

use crate::config::{DriveConfig, ThresholdConfig};
use crate::shift;
use crate::state::{Gear, VehicleState};

/// Recompute `torque_cmd` for this tick.
pub(crate) fn tick(state: &mut VehicleState, cfg: &DriveConfig) {
    state.torque_cmd = command(state, cfg);
}

fn command(state: &VehicleState, cfg: &DriveConfig) -> f64 {
    let thresholds = &cfg.thresholds;

    // Rev limiter beats everything, including an in-flight shift.
    if state.vrpm >= thresholds.redline_rpm {
        return 0.0;
    }

    if state.brake_intent > 0.0 && state.gear.is_motive() {
        if state.speed > 0.0 {
            return -state.brake_intent * thresholds.max_brake_torque;
        }
        // Brake held at standstill pins the car; no creep either.
        return 0.0;
    }

    match state.gear {
        Gear::Park | Gear::Neutral => 0.0,
        Gear::Drive => {
            let base = base_torque(state, cfg);
            if state.shift_state.is_shifting() {
                shift::shift_torque(state, &cfg.shift, base).clamp(0.0, 100.0)
            } else {
                blend(state, cfg, base)
            }
        }
        Gear::Reverse => {
            let base = base_torque(state, cfg);
            blend(state, cfg, base)
        }
    }
}

fn blend(state: &VehicleState, cfg: &DriveConfig, base: f64) -> f64 {
    let creep = creep_torque(state, &cfg.thresholds);
    let drag = drag_torque(state, cfg);
    (base + creep + drag).clamp(0.0, 100.0)
}

/// Engine-curve drive torque: a triangular peak centered on
/// `torque_peak_rpm`, scaled per gear in D and boosted in sport mode.
fn base_torque(state: &VehicleState, cfg: &DriveConfig) -> f64 {
    let thresholds = &cfg.thresholds;
    let peak = thresholds.torque_peak_rpm;
    let factor = if state.vrpm < peak {
        state.vrpm / peak
    } else {
        peak / state.vrpm
    };
    let gear_scale = match state.gear {
        Gear::Drive => cfg.gearbox.torque_scale_for(state.virtual_gear),
        _ => 1.0,
    };
    let boost = if state.sport_mode_on {
        thresholds.sport_torque_boost
    } else {
        1.0
    };
    (state.throttle_intent * 100.0 * factor * gear_scale * boost).min(100.0)
}

/// Idle crawl toward `creep_release_speed`, active only with both pedals
/// released and the engine running.
fn creep_torque(state: &VehicleState, thresholds: &ThresholdConfig) -> f64 {
    if state.coasting() && state.engine_running && state.speed < thresholds.creep_release_speed {
        thresholds.creep_torque
    } else {
        0.0
    }
}

/// Engine-braking drag while coasting in motion. Negative contribution,
/// halved in reverse, absent in park and neutral.
fn drag_torque(state: &VehicleState, cfg: &DriveConfig) -> f64 {
    if !state.coasting() || state.speed <= 0.0 {
        return 0.0;
    }
    let scale = match state.gear {
        Gear::Drive => cfg.gearbox.drag_scale_for(state.virtual_gear),
        Gear::Reverse => 0.5,
        Gear::Park | Gear::Neutral => 0.0,
    };
    -cfg.thresholds.max_drag_torque * scale
}
