//! Engine start/stop interlocks and starter cranking.
//!
//! Starting needs park plus a pressed brake; stopping needs park. Violations
//! come back as event flags for the UI hint layer, never as errors. A start
//! runs the starter for a fixed cranking window before the engine catches.

use crate::config::ThresholdConfig;
use crate::state::{DriveEvents, Gear, VehicleState};

/// React to one engine toggle press.
pub(crate) fn handle_toggle(
    state: &mut VehicleState,
    thresholds: &ThresholdConfig,
    events: &mut DriveEvents,
) {
    if state.engine_cranking_timer_s > 0.0 {
        // Starter already engaged; ignore repeat presses.
        return;
    }

    if state.engine_running {
        if state.gear != Gear::Park {
            events.engine_stop_blocked = true;
            return;
        }
        state.engine_running = false;
        events.engine_stopped = true;
        return;
    }

    if state.gear != Gear::Park {
        events.engine_start_blocked_gear = true;
        return;
    }
    if state.brake_intent <= 0.0 {
        events.engine_start_blocked_brake = true;
        return;
    }
    state.engine_cranking_timer_s = thresholds.cranking_duration_s;
}

/// Run the starter down by one tick; the engine catches when it expires.
pub(crate) fn tick_cranking(state: &mut VehicleState, dt_s: f64, events: &mut DriveEvents) {
    if state.engine_cranking_timer_s <= 0.0 {
        return;
    }
    state.engine_cranking_timer_s -= dt_s;
    if state.engine_cranking_timer_s <= 0.0 {
        state.engine_cranking_timer_s = 0.0;
        state.engine_running = true;
        events.engine_started = true;
    }
}
