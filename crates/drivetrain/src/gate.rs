//! Gear selector safety gate.
//!
//! P and N are always reachable and stop the car. R and D are guarded by a
//! brake interlock unless the car is already in a motive gear; a direction
//! reversal never coasts through, it stops the car first.

use crate::state::{Gear, VehicleState};
use crate::MIN_VIRTUAL_GEAR;

/// Outcome of a selector request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateOutcome {
    Applied,
    Rejected,
}

/// Apply a selector request against the interlock rules.
///
/// A rejection leaves the state untouched; the caller raises `shift_fail` so
/// the UI can hint "press brake first". A repeated request for the current
/// gear is a no-op.
pub(crate) fn apply(state: &mut VehicleState, requested: Gear) -> GateOutcome {
    if requested == state.gear {
        return GateOutcome::Applied;
    }

    match requested {
        Gear::Park | Gear::Neutral => {
            state.gear = requested;
            state.speed = 0.0;
            state.reset_shift_machine();
            GateOutcome::Applied
        }
        Gear::Reverse | Gear::Drive => {
            let braking = state.brake_intent > 0.0;
            if !state.gear.is_motive() && !braking {
                return GateOutcome::Rejected;
            }

            let direction_change = state.gear.is_motive();
            state.gear = requested;
            if requested == Gear::Drive {
                state.virtual_gear = MIN_VIRTUAL_GEAR;
            }
            if direction_change {
                // No coasting through a D/R reversal.
                state.speed = 0.0;
            }
            state.reset_shift_machine();
            GateOutcome::Applied
        }
    }
}
