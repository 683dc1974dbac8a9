//! Timed shift sequence.
//!
//! Six states shape torque through a gear change: READY, PRECUT, CUT_HOLD,
//! REENGAGE, JERK, STABILIZE. The state timer accumulates wall time per tick
//! and each state hands over once its configured duration elapses. The gear
//! ratio swaps exactly on the CUT_HOLD to REENGAGE handover, never at request
//! time, so the RPM model sees the old ratio for the whole torque cut.

use crate::config::ShiftTimingConfig;
use crate::state::{ShiftState, VehicleState};

/// Advance the machine by one tick of `dt_s` seconds.
///
/// No-op in READY. Transitions reset the timer so a freshly entered state
/// always starts at zero elapsed time.
pub(crate) fn advance(state: &mut VehicleState, timing: &ShiftTimingConfig, dt_s: f64) {
    if state.shift_state == ShiftState::Ready {
        return;
    }

    state.shift_timer_ms += dt_s * 1000.0;

    let elapsed = state.shift_timer_ms;
    match state.shift_state {
        ShiftState::Ready => {}
        ShiftState::Precut => {
            if elapsed >= timing.precut_ms {
                enter(state, ShiftState::CutHold);
            }
        }
        ShiftState::CutHold => {
            if elapsed >= timing.cut_hold_ms {
                // Ratio swap happens on this handover and nowhere else.
                state.virtual_gear = state.shift_target_gear;
                enter(state, ShiftState::Reengage);
            }
        }
        ShiftState::Reengage => {
            if elapsed >= timing.reengage_ms {
                enter(state, ShiftState::Jerk);
            }
        }
        ShiftState::Jerk => {
            if elapsed >= timing.jerk_ms {
                enter(state, ShiftState::Stabilize);
            }
        }
        ShiftState::Stabilize => {
            if elapsed >= timing.stabilize_ms {
                state.shift_direction = 0;
                enter(state, ShiftState::Ready);
            }
        }
    }
}

fn enter(state: &mut VehicleState, next: ShiftState) {
    state.shift_state = next;
    state.shift_timer_ms = 0.0;
}

/// Torque produced by the active (non-READY) shift state.
///
/// `base_torque` is the freshly blended drive torque for the current gear,
/// used by the tail states once the new ratio is engaged.
pub(crate) fn shift_torque(
    state: &VehicleState,
    timing: &ShiftTimingConfig,
    base_torque: f64,
) -> f64 {
    match state.shift_state {
        ShiftState::Ready => base_torque,
        ShiftState::Precut => {
            let t = fraction(state.shift_timer_ms, timing.precut_ms);
            let floor = state.shift_torque_prev * timing.precut_alpha;
            state.shift_torque_prev + (floor - state.shift_torque_prev) * t
        }
        ShiftState::CutHold => timing.cut_torque,
        ShiftState::Reengage => {
            let s = smoothstep(fraction(state.shift_timer_ms, timing.reengage_ms));
            timing.cut_torque + (base_torque - timing.cut_torque) * s
        }
        ShiftState::Jerk => base_torque + timing.jerk_delta,
        ShiftState::Stabilize => base_torque,
    }
}

/// Smoothstep `3t^2 - 2t^3` on a clamped unit interval.
fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn fraction(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;
    use crate::scheduler;
    use crate::state::Gear;

    const DT: f64 = 0.01;

    fn armed_upshift() -> (VehicleState, DriveConfig) {
        let cfg = DriveConfig::default();
        let mut state = VehicleState::new();
        state.gear = Gear::Drive;
        state.engine_running = true;
        state.virtual_gear = 3;
        state.shift_target_gear = 3;
        state.torque_cmd = 40.0;
        assert!(scheduler::begin_shift(&mut state, 1));
        (state, cfg)
    }

    #[test]
    fn sequence_walks_all_states_in_order() {
        let (mut state, cfg) = armed_upshift();
        let mut seen = vec![state.shift_state];
        for _ in 0..200 {
            advance(&mut state, &cfg.shift, DT);
            if seen.last() != Some(&state.shift_state) {
                seen.push(state.shift_state);
            }
            if state.shift_state == ShiftState::Ready {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                ShiftState::Precut,
                ShiftState::CutHold,
                ShiftState::Reengage,
                ShiftState::Jerk,
                ShiftState::Stabilize,
                ShiftState::Ready,
            ]
        );
    }

    #[test]
    fn total_duration_matches_configured_sum() {
        let (mut state, cfg) = armed_upshift();
        let mut ticks = 0u32;
        while state.shift_state != ShiftState::Ready {
            advance(&mut state, &cfg.shift, DT);
            ticks += 1;
            assert!(ticks < 1000, "shift never completed");
        }
        let elapsed_ms = f64::from(ticks) * DT * 1000.0;
        let tolerance_ms = DT * 1000.0 + 1e-9;
        assert!(
            (elapsed_ms - cfg.shift.total_ms()).abs() <= tolerance_ms,
            "shift took {elapsed_ms} ms, configured {} ms",
            cfg.shift.total_ms()
        );
    }

    #[test]
    fn gear_swaps_exactly_on_cut_hold_exit() {
        let (mut state, cfg) = armed_upshift();
        loop {
            let before = state.shift_state;
            advance(&mut state, &cfg.shift, DT);
            if before == ShiftState::CutHold && state.shift_state == ShiftState::Reengage {
                assert_eq!(state.virtual_gear, 4);
                return;
            }
            // Until that handover the old ratio stays in force.
            assert_eq!(state.virtual_gear, 3);
            assert!(state.shift_state != ShiftState::Ready, "missed the handover");
        }
    }

    #[test]
    fn direction_clears_when_machine_returns_to_ready() {
        let (mut state, cfg) = armed_upshift();
        for _ in 0..200 {
            advance(&mut state, &cfg.shift, DT);
        }
        assert_eq!(state.shift_state, ShiftState::Ready);
        assert_eq!(state.shift_direction, 0);
        assert_eq!(state.virtual_gear, state.shift_target_gear);
    }

    #[test]
    fn precut_ramps_torque_down_toward_alpha_floor() {
        let (mut state, cfg) = armed_upshift();
        let start = state.shift_torque_prev;
        let floor = start * cfg.shift.precut_alpha;
        let mut last = shift_torque(&state, &cfg.shift, 0.0);
        assert!((last - start).abs() < 1e-9);
        while state.shift_state == ShiftState::Precut {
            advance(&mut state, &cfg.shift, DT);
            if state.shift_state != ShiftState::Precut {
                break;
            }
            let now = shift_torque(&state, &cfg.shift, 0.0);
            assert!(now <= last + 1e-9, "precut torque rose: {last} -> {now}");
            assert!(now >= floor - 1e-9);
            last = now;
        }
    }

    #[test]
    fn cut_hold_pins_torque_to_cut_level() {
        let (mut state, cfg) = armed_upshift();
        while state.shift_state != ShiftState::CutHold {
            advance(&mut state, &cfg.shift, DT);
        }
        let torque = shift_torque(&state, &cfg.shift, 55.0);
        assert!((torque - cfg.shift.cut_torque).abs() < 1e-9);
    }

    #[test]
    fn reengage_is_smooth_from_cut_to_base() {
        let (mut state, cfg) = armed_upshift();
        while state.shift_state != ShiftState::Reengage {
            advance(&mut state, &cfg.shift, DT);
        }
        let base = 60.0;
        // Entry point sits at the cut level.
        assert!((shift_torque(&state, &cfg.shift, base) - cfg.shift.cut_torque).abs() < 1.0);

        // Halfway through, smoothstep(0.5) = 0.5.
        state.shift_timer_ms = cfg.shift.reengage_ms / 2.0;
        let mid = shift_torque(&state, &cfg.shift, base);
        let expected = cfg.shift.cut_torque + (base - cfg.shift.cut_torque) * 0.5;
        assert!((mid - expected).abs() < 1e-9);

        // End point reaches base.
        state.shift_timer_ms = cfg.shift.reengage_ms;
        assert!((shift_torque(&state, &cfg.shift, base) - base).abs() < 1e-9);
    }

    #[test]
    fn jerk_overshoots_then_stabilize_settles() {
        let (mut state, cfg) = armed_upshift();
        while state.shift_state != ShiftState::Jerk {
            advance(&mut state, &cfg.shift, DT);
        }
        let base = 50.0;
        assert!((shift_torque(&state, &cfg.shift, base) - (base + cfg.shift.jerk_delta)).abs() < 1e-9);

        while state.shift_state != ShiftState::Stabilize {
            advance(&mut state, &cfg.shift, DT);
        }
        assert!((shift_torque(&state, &cfg.shift, base) - base).abs() < 1e-9);
    }

    #[test]
    fn smoothstep_endpoints_and_midpoint() {
        assert!(smoothstep(0.0).abs() < 1e-12);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-12);
        assert!((smoothstep(1.0) - 1.0).abs() < 1e-12);
        // Clamped outside the unit interval.
        assert!(smoothstep(-3.0).abs() < 1e-12);
        assert!((smoothstep(9.0) - 1.0).abs() < 1e-12);
    }
}
