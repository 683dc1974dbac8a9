//! The drivetrain step function.
//!
//! [`Drivetrain`] owns the validated configuration and advances a
//! [`VehicleState`] by one fixed tick at a time, leaves first: pedals, engine
//! interlocks, gear gate, shift scheduling, shift shaping, torque blending,
//! physics, and finally the RPM the scheduler will read next tick. The step
//! is pure compute; it does no I/O and never blocks.

use crate::config::DriveConfig;
use crate::gate::{self, GateOutcome};
use crate::input::{self, TickInput};
use crate::state::{DriveEvents, TelemetrySnapshot, VehicleState};
use crate::{engine, physics, rpm, scheduler, shift, torque, DrivetrainResult};

/// Virtual drivetrain engine: one instance per vehicle session.
#[derive(Debug, Clone)]
pub struct Drivetrain {
    cfg: DriveConfig,
}

impl Drivetrain {
    /// Build a drivetrain from a configuration, rejecting invalid tuning.
    pub fn new(cfg: DriveConfig) -> DrivetrainResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    #[must_use]
    pub fn config(&self) -> &DriveConfig {
        &self.cfg
    }

    /// Advance `state` by one tick of `dt_s` seconds.
    ///
    /// Returns the event flags raised during this tick; callers that do not
    /// surface UI hints can ignore them.
    pub fn step(&self, state: &mut VehicleState, input: TickInput, dt_s: f64) -> DriveEvents {
        let mut events = DriveEvents::default();

        input::condition(state, input.axis, &self.cfg.thresholds);

        if input.head_toggle {
            state.headlight_on = !state.headlight_on;
        }
        if input.sport_mode_toggle {
            state.sport_mode_on = !state.sport_mode_on;
        }
        if input.engine_toggle {
            engine::handle_toggle(state, &self.cfg.thresholds, &mut events);
        }
        engine::tick_cranking(state, dt_s, &mut events);

        if let Some(requested) = input.gear_request {
            if gate::apply(state, requested) == GateOutcome::Rejected {
                events.shift_fail = true;
            }
        }

        scheduler::tick(state, &self.cfg.gearbox, &self.cfg.thresholds);
        shift::advance(state, &self.cfg.shift, dt_s);
        torque::tick(state, &self.cfg);
        physics::integrate(state, &self.cfg, dt_s);
        rpm::update(state, &self.cfg);

        events
    }

    /// Final override before teardown: kill torque, drop the pedal intents
    /// and disarm the ESC so the hardware layer can be torn down safely.
    /// Steering recentering is the output mapper's job.
    pub fn force_safe_state(&self, state: &mut VehicleState) {
        state.torque_cmd = 0.0;
        state.throttle_intent = 0.0;
        state.brake_intent = 0.0;
        state.axis = 0.0;
        state.engine_cranking_timer_s = 0.0;
        state.esc_armed = false;
        state.reset_shift_machine();
    }

    /// Immutable telemetry copy for concurrent publication.
    #[must_use]
    pub fn snapshot(&self, state: &VehicleState) -> TelemetrySnapshot {
        TelemetrySnapshot::capture(state)
    }
}
