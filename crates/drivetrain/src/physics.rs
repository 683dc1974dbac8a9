//! Longitudinal physics.
//!
//! One-dimensional point mass: the torque command fights a static, linear
//! and quadratic rolling drag, and the result integrates into the normalized
//! speed. Speed is a magnitude; park and neutral pin it to zero outright.

use crate::config::{DriveConfig, ThresholdConfig};
use crate::state::{Gear, VehicleState};

/// Integrate one tick of `dt_s` seconds.
pub(crate) fn integrate(state: &mut VehicleState, cfg: &DriveConfig, dt_s: f64) {
    if !state.gear.is_motive() {
        state.speed = 0.0;
        return;
    }

    let drag = rolling_drag(&cfg.thresholds, state.speed);
    let accel = (state.torque_cmd / 100.0 - drag) * cfg.thresholds.mass_factor;
    state.speed = (state.speed + accel * dt_s).clamp(0.0, 1.0);
}

/// Static plus linear plus quadratic resistance, zero at standstill so a
/// parked car does not jitter backwards.
fn rolling_drag(thresholds: &ThresholdConfig, speed: f64) -> f64 {
    if speed <= 0.0 {
        return 0.0;
    }
    thresholds.drag_static
        + thresholds.drag_linear * speed
        + thresholds.drag_quadratic * speed * speed
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.01;

    fn moving(gear: Gear, speed: f64, torque_cmd: f64) -> VehicleState {
        let mut state = VehicleState::new();
        state.gear = gear;
        state.engine_running = true;
        state.speed = speed;
        state.torque_cmd = torque_cmd;
        state
    }

    #[test]
    fn park_and_neutral_pin_speed_to_zero() {
        let cfg = DriveConfig::default();
        for gear in [Gear::Park, Gear::Neutral] {
            let mut state = moving(gear, 0.6, 80.0);
            integrate(&mut state, &cfg, DT);
            assert!(state.speed.abs() < f64::EPSILON, "gear {gear}");
        }
    }

    #[test]
    fn full_torque_accelerates_from_rest() {
        let cfg = DriveConfig::default();
        let mut state = moving(Gear::Drive, 0.0, 100.0);
        integrate(&mut state, &cfg, DT);
        let one_tick = cfg.thresholds.mass_factor * DT;
        assert!((state.speed - one_tick).abs() < 1e-9);
    }

    #[test]
    fn speed_saturates_at_full_scale() {
        let cfg = DriveConfig::default();
        let mut state = moving(Gear::Drive, 1.0, 100.0);
        integrate(&mut state, &cfg, DT);
        assert!(state.speed <= 1.0);
    }

    #[test]
    fn zero_torque_at_standstill_stays_put() {
        let cfg = DriveConfig::default();
        let mut state = moving(Gear::Drive, 0.0, 0.0);
        for _ in 0..100 {
            integrate(&mut state, &cfg, DT);
        }
        assert!(state.speed.abs() < f64::EPSILON);
    }

    #[test]
    fn coasting_decays_monotonically() {
        let cfg = DriveConfig::default();
        let mut state = moving(Gear::Drive, 0.5, 0.0);
        let mut last = state.speed;
        for _ in 0..2000 {
            integrate(&mut state, &cfg, DT);
            assert!(state.speed <= last);
            last = state.speed;
        }
        assert!(state.speed < 0.05, "still rolling at {}", state.speed);
    }

    #[test]
    fn braking_torque_stops_the_car_and_clamps_at_zero() {
        let cfg = DriveConfig::default();
        let mut state = moving(Gear::Drive, 0.5, -cfg.thresholds.max_brake_torque);
        let mut ticks = 0u32;
        while state.speed > 0.0 && ticks < 2000 {
            integrate(&mut state, &cfg, DT);
            ticks += 1;
        }
        // Without drag the stop takes 0.5 / (0.6 * mass) seconds; drag only
        // shortens it.
        let bound_s = 0.5 / (cfg.thresholds.max_brake_torque / 100.0 * cfg.thresholds.mass_factor);
        assert!(f64::from(ticks) * DT <= bound_s + DT);
        assert!(state.speed >= 0.0);
    }

    #[test]
    fn drag_grows_with_speed() {
        let cfg = DriveConfig::default();
        let slow = rolling_drag(&cfg.thresholds, 0.2);
        let fast = rolling_drag(&cfg.thresholds, 0.8);
        assert!(fast > slow);
        assert!(rolling_drag(&cfg.thresholds, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reverse_integrates_like_drive() {
        let cfg = DriveConfig::default();
        let mut forward = moving(Gear::Drive, 0.2, 40.0);
        let mut backward = moving(Gear::Reverse, 0.2, 40.0);
        integrate(&mut forward, &cfg, DT);
        integrate(&mut backward, &cfg, DT);
        assert!((forward.speed - backward.speed).abs() < 1e-12);
    }
}
