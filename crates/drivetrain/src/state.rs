//! Vehicle state, gear and shift-state enums, events, and the telemetry
//! snapshot published after every tick.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MIN_VIRTUAL_GEAR;

/// Gear selector position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gear {
    /// Park: wheels held, no torque.
    #[default]
    #[serde(rename = "P")]
    Park,
    /// Reverse.
    #[serde(rename = "R")]
    Reverse,
    /// Neutral: freewheeling disabled in this model, speed is zeroed.
    #[serde(rename = "N")]
    Neutral,
    /// Drive: the 8-speed automatic is active.
    #[serde(rename = "D")]
    Drive,
}

impl Gear {
    /// True for the two gears that can move the car.
    #[must_use]
    pub fn is_motive(self) -> bool {
        matches!(self, Gear::Reverse | Gear::Drive)
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Gear::Park => "P",
            Gear::Reverse => "R",
            Gear::Neutral => "N",
            Gear::Drive => "D",
        };
        f.write_str(tag)
    }
}

/// Phase of the timed shift sequence.
///
/// READY is the resting state; the other five run in order once a shift is
/// requested, shaping torque along the way. The gear ratio swap happens
/// exactly on the CUT_HOLD to REENGAGE transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    #[default]
    Ready,
    Precut,
    CutHold,
    Reengage,
    Jerk,
    Stabilize,
}

impl ShiftState {
    /// True while a shift sequence is in progress.
    #[must_use]
    pub fn is_shifting(self) -> bool {
        !matches!(self, ShiftState::Ready)
    }
}

impl fmt::Display for ShiftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ShiftState::Ready => "ready",
            ShiftState::Precut => "precut",
            ShiftState::CutHold => "cut_hold",
            ShiftState::Reengage => "reengage",
            ShiftState::Jerk => "jerk",
            ShiftState::Stabilize => "stabilize",
        };
        f.write_str(tag)
    }
}

/// Mutable per-session vehicle state, owned exclusively by the control loop.
///
/// `speed` is a magnitude in [0,1]; direction is implied by `gear` and only
/// applied when mapping to the ESC. `torque_cmd` is a drive-torque magnitude
/// except during braking, where it goes negative for the integrator alone.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub gear: Gear,
    /// 1..=8, meaningful only while `gear` is Drive.
    pub virtual_gear: u8,
    pub shift_state: ShiftState,
    /// Time spent in the current shift state, milliseconds.
    pub shift_timer_ms: f64,
    /// -1, 0 or +1 while a shift is pending or in flight.
    pub shift_direction: i8,
    pub shift_target_gear: u8,
    /// Torque command captured when the shift was requested.
    pub shift_torque_prev: f64,
    /// Normalized speed magnitude in [0,1].
    pub speed: f64,
    /// Virtual engine RPM.
    pub vrpm: f64,
    /// `vrpm / scale_max_rpm`, clamped to [0,1] for the gauge.
    pub vrpm_norm: f64,
    /// Torque command in percent, [-100,100].
    pub torque_cmd: f64,
    pub throttle_intent: f64,
    pub brake_intent: f64,
    /// Conditioned pedal axis after clamping and slew limiting.
    pub axis: f64,
    pub engine_running: bool,
    pub esc_armed: bool,
    /// Seconds of starter cranking remaining; 0 when not cranking.
    pub engine_cranking_timer_s: f64,
    pub headlight_on: bool,
    pub sport_mode_on: bool,
    /// Servo pulse currently applied, microseconds.
    pub steering_current_us: f64,
    /// Servo pulse the steering is slewing toward, microseconds.
    pub steering_target_us: f64,
}

impl VehicleState {
    /// Fresh session state: parked, engine off, everything at rest.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gear: Gear::Park,
            virtual_gear: MIN_VIRTUAL_GEAR,
            shift_state: ShiftState::Ready,
            shift_timer_ms: 0.0,
            shift_direction: 0,
            shift_target_gear: MIN_VIRTUAL_GEAR,
            shift_torque_prev: 0.0,
            speed: 0.0,
            vrpm: 0.0,
            vrpm_norm: 0.0,
            torque_cmd: 0.0,
            throttle_intent: 0.0,
            brake_intent: 0.0,
            axis: 0.0,
            engine_running: false,
            esc_armed: false,
            engine_cranking_timer_s: 0.0,
            headlight_on: false,
            sport_mode_on: false,
            // Default center trim; the servo holds this until steered.
            steering_current_us: 1800.0,
            steering_target_us: 1800.0,
        }
    }

    /// Reset the shift machine to READY with the target pinned to the
    /// current gear. Called on every gear-selector transition.
    pub(crate) fn reset_shift_machine(&mut self) {
        self.shift_state = ShiftState::Ready;
        self.shift_timer_ms = 0.0;
        self.shift_direction = 0;
        self.shift_target_gear = self.virtual_gear;
    }

    /// True when neither pedal intent is active.
    #[must_use]
    pub(crate) fn coasting(&self) -> bool {
        self.throttle_intent <= 0.0 && self.brake_intent <= 0.0
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new()
    }
}

/// One-tick event flags produced by [`crate::Drivetrain::step`].
///
/// These are hints for the UI layer, not errors: a rejected gear change or a
/// blocked engine toggle leaves the state untouched and raises a flag here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveEvents {
    /// Gear request rejected by the safety interlock ("press brake first").
    pub shift_fail: bool,
    /// Engine start refused because the selector is not in P.
    pub engine_start_blocked_gear: bool,
    /// Engine start refused because the brake is not held.
    pub engine_start_blocked_brake: bool,
    /// Engine stop refused because the selector is not in P.
    pub engine_stop_blocked: bool,
    /// Cranking finished this tick; the host should begin ESC arming.
    pub engine_started: bool,
    /// Engine stopped this tick; the host should begin ESC disarming.
    pub engine_stopped: bool,
}

impl DriveEvents {
    /// True if any flag is set.
    #[must_use]
    pub fn any(self) -> bool {
        self.shift_fail
            || self.engine_start_blocked_gear
            || self.engine_start_blocked_brake
            || self.engine_stop_blocked
            || self.engine_started
            || self.engine_stopped
    }
}

/// Immutable telemetry copied out after each tick for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Normalized RPM gauge value in [0,1].
    pub virtual_rpm: f64,
    /// Speed as a whole percentage, 0..=100.
    pub speed_pct: u8,
    pub gear: Gear,
    pub virtual_gear: u8,
    pub shift_state: ShiftState,
    pub engine_running: bool,
    pub esc_armed: bool,
    pub sport_mode_on: bool,
    pub torque_cmd: f64,
}

impl TelemetrySnapshot {
    /// Snapshot the fields a UI needs from the live state.
    #[must_use]
    pub fn capture(state: &VehicleState) -> Self {
        let pct = (state.speed * 100.0).round().clamp(0.0, 100.0);
        Self {
            virtual_rpm: state.vrpm_norm,
            speed_pct: u8::try_from(pct as i64).unwrap_or(100),
            gear: state.gear,
            virtual_gear: state.virtual_gear,
            shift_state: state.shift_state,
            engine_running: state.engine_running,
            esc_armed: state.esc_armed,
            sport_mode_on: state.sport_mode_on,
            torque_cmd: state.torque_cmd,
        }
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::capture(&VehicleState::new())
    }
}
