//! Virtual engine RPM.
//!
//! Closed loop: RPM derives from the integrated speed through the active
//! gear ratio, so the scheduler next tick reacts to what the wheels are
//! actually doing. Park and neutral idle; a stopped engine reads zero; the
//! starter shows a low flutter while cranking.

use std::f64::consts::TAU;

use crate::config::DriveConfig;
use crate::state::{Gear, VehicleState};

const CRANK_BASE_RPM: f64 = 280.0;
const CRANK_SWING_RPM: f64 = 140.0;
const CRANK_PERIOD_S: f64 = 0.2;

/// Recompute `vrpm` and `vrpm_norm` from the fresh speed.
pub(crate) fn update(state: &mut VehicleState, cfg: &DriveConfig) {
    state.vrpm = virtual_rpm(state, cfg);
    state.vrpm_norm = (state.vrpm / cfg.thresholds.scale_max_rpm).clamp(0.0, 1.0);
}

fn virtual_rpm(state: &VehicleState, cfg: &DriveConfig) -> f64 {
    if state.engine_cranking_timer_s > 0.0 {
        let elapsed =
            (cfg.thresholds.cranking_duration_s - state.engine_cranking_timer_s).max(0.0);
        return cranking_rpm(elapsed);
    }
    if !state.engine_running {
        return 0.0;
    }

    let gearbox = &cfg.gearbox;
    let wheel_rad_s = state.speed * gearbox.speed_scale_mps / gearbox.wheel_radius_m;
    let wheel_rpm = wheel_rad_s * 60.0 / TAU;
    let geared = match state.gear {
        Gear::Drive => wheel_rpm * gearbox.ratio_for(state.virtual_gear) * gearbox.final_drive,
        Gear::Reverse => wheel_rpm * gearbox.reverse_ratio * gearbox.final_drive,
        Gear::Park | Gear::Neutral => cfg.thresholds.idle_rpm,
    };
    // Fuel-cut ceiling: the tachometer rails at the redline and the torque
    // cut takes it from there, so an excursion never outlives the tick.
    geared.clamp(cfg.thresholds.idle_rpm, cfg.thresholds.redline_rpm)
}

/// Deterministic starter flutter: a triangle wave well below idle.
fn cranking_rpm(elapsed_s: f64) -> f64 {
    let phase = (elapsed_s / CRANK_PERIOD_S).fract();
    let triangle = 1.0 - (2.0 * phase - 1.0).abs();
    CRANK_BASE_RPM + CRANK_SWING_RPM * triangle
}
