//! Drivetrain configuration: gearbox tables, shift timing, and thresholds.
//!
//! Configuration is supplied once at construction and never mutated
//! afterwards. All tables are fixed-size arrays indexed by virtual gear;
//! the `*_for` accessors clamp out-of-range gears instead of panicking.

use serde::{Deserialize, Serialize};

use crate::{DrivetrainError, DrivetrainResult, MAX_VIRTUAL_GEAR};

/// Gear ratio tables and the wheel geometry the RPM model derives from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearboxConfig {
    /// Ratio per forward gear, gear 1 first. Must be strictly decreasing.
    pub gear_ratios: [f64; 8],
    /// Final drive ratio applied after the selected gear ratio.
    pub final_drive: f64,
    /// Fixed ratio used while in reverse.
    pub reverse_ratio: f64,
    /// Torque multiplier per forward gear (taller gears pull less).
    pub torque_scale: [f64; 8],
    /// Engine-braking multiplier per forward gear.
    pub drag_scale: [f64; 8],
    /// Wheel radius in meters.
    pub wheel_radius_m: f64,
    /// Vehicle speed in m/s that a normalized speed of 1.0 represents.
    pub speed_scale_mps: f64,
}

impl Default for GearboxConfig {
    fn default() -> Self {
        Self {
            gear_ratios: [4.70, 3.13, 2.10, 1.67, 1.29, 1.00, 0.84, 0.67],
            final_drive: 3.31,
            reverse_ratio: 3.00,
            torque_scale: [1.00, 0.93, 0.87, 0.80, 0.74, 0.68, 0.63, 0.58],
            drag_scale: [1.00, 0.85, 0.72, 0.61, 0.52, 0.45, 0.39, 0.34],
            wheel_radius_m: 0.024,
            speed_scale_mps: 5.56,
        }
    }
}

impl GearboxConfig {
    /// Gear ratio for a 1-based virtual gear, clamped to the table range.
    #[must_use]
    pub fn ratio_for(&self, virtual_gear: u8) -> f64 {
        table_lookup(&self.gear_ratios, virtual_gear)
    }

    /// Torque multiplier for a 1-based virtual gear, clamped to the table range.
    #[must_use]
    pub fn torque_scale_for(&self, virtual_gear: u8) -> f64 {
        table_lookup(&self.torque_scale, virtual_gear)
    }

    /// Engine-braking multiplier for a 1-based virtual gear, clamped to the
    /// table range.
    #[must_use]
    pub fn drag_scale_for(&self, virtual_gear: u8) -> f64 {
        table_lookup(&self.drag_scale, virtual_gear)
    }

    fn validate(&self) -> DrivetrainResult<()> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;

        for table in [&self.gear_ratios, &self.torque_scale, &self.drag_scale] {
            if !table.iter().copied().all(finite_positive) {
                return Err(DrivetrainError::InvalidGearbox(
                    "all table entries must be finite and positive".to_string(),
                ));
            }
        }
        if !self
            .gear_ratios
            .windows(2)
            .all(|pair| pair.first().copied().unwrap_or(0.0) > pair.last().copied().unwrap_or(0.0))
        {
            return Err(DrivetrainError::InvalidGearbox(
                "gear ratios must be strictly decreasing".to_string(),
            ));
        }
        if !finite_positive(self.final_drive)
            || !finite_positive(self.reverse_ratio)
            || !finite_positive(self.wheel_radius_m)
            || !finite_positive(self.speed_scale_mps)
        {
            return Err(DrivetrainError::InvalidGearbox(
                "ratios and geometry must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn table_lookup(table: &[f64; 8], virtual_gear: u8) -> f64 {
    let idx = usize::from(virtual_gear.saturating_sub(1)).min(usize::from(MAX_VIRTUAL_GEAR - 1));
    table.get(idx).copied().unwrap_or(1.0)
}

/// Durations and torque shaping for the five non-READY shift states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftTimingConfig {
    /// PRECUT duration: torque ramps down toward the snapshot.
    pub precut_ms: f64,
    /// CUT_HOLD duration: torque pinned low, ratio swap on exit.
    pub cut_hold_ms: f64,
    /// REENGAGE duration: S-curve back up to base torque.
    pub reengage_ms: f64,
    /// JERK duration: clutch-engagement overshoot.
    pub jerk_ms: f64,
    /// STABILIZE duration: base torque before returning to READY.
    pub stabilize_ms: f64,
    /// Fraction of the pre-shift torque that PRECUT ramps toward.
    pub precut_alpha: f64,
    /// Torque held during CUT_HOLD, percent.
    pub cut_torque: f64,
    /// Overshoot added on top of base torque during JERK, percent.
    pub jerk_delta: f64,
}

impl Default for ShiftTimingConfig {
    fn default() -> Self {
        Self {
            precut_ms: 80.0,
            cut_hold_ms: 120.0,
            reengage_ms: 150.0,
            jerk_ms: 60.0,
            stabilize_ms: 90.0,
            precut_alpha: 0.35,
            cut_torque: 4.0,
            jerk_delta: 6.0,
        }
    }
}

impl ShiftTimingConfig {
    /// Total wall time of one full shift sequence in milliseconds.
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.precut_ms + self.cut_hold_ms + self.reengage_ms + self.jerk_ms + self.stabilize_ms
    }

    fn validate(&self) -> DrivetrainResult<()> {
        let durations = [
            self.precut_ms,
            self.cut_hold_ms,
            self.reengage_ms,
            self.jerk_ms,
            self.stabilize_ms,
        ];
        if !durations.iter().all(|d| d.is_finite() && *d > 0.0) {
            return Err(DrivetrainError::InvalidShiftTiming(
                "all state durations must be finite and positive".to_string(),
            ));
        }
        if !self.precut_alpha.is_finite() || !(0.0..=1.0).contains(&self.precut_alpha) {
            return Err(DrivetrainError::InvalidShiftTiming(format!(
                "precut_alpha must be within [0,1], got {}",
                self.precut_alpha
            )));
        }
        if !(0.0..=100.0).contains(&self.cut_torque) || !(0.0..=100.0).contains(&self.jerk_delta) {
            return Err(DrivetrainError::InvalidShiftTiming(
                "cut_torque and jerk_delta must be within [0,100]".to_string(),
            ));
        }
        Ok(())
    }
}

/// RPM thresholds, input shaping, physics constants, and supplemental knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Idle RPM floor while the engine runs.
    pub idle_rpm: f64,
    /// Fuel-cut RPM; torque is cut and the RPM model ceilings here.
    pub redline_rpm: f64,
    /// RPM corresponding to 1.0 on the normalized telemetry gauge.
    pub scale_max_rpm: f64,
    /// Upshift request threshold.
    pub up_threshold_rpm: f64,
    /// Downshift request threshold.
    pub down_threshold_rpm: f64,
    /// Extra RPM required before upshifting under heavy throttle.
    pub throttle_delay_rpm: f64,
    /// Engine-curve peak RPM for the triangular torque factor.
    pub torque_peak_rpm: f64,
    /// Pedal axis deadzone, in axis units (of +/-50).
    pub input_deadzone: f64,
    /// Max pedal axis change per tick, in axis units.
    pub input_slew_limit: f64,
    /// Constant crawl torque at rest, percent.
    pub creep_torque: f64,
    /// Normalized speed at which creep releases.
    pub creep_release_speed: f64,
    /// Full-pedal braking torque, percent.
    pub max_brake_torque: f64,
    /// Engine-braking torque before per-gear scaling, percent.
    pub max_drag_torque: f64,
    /// Static rolling resistance.
    pub drag_static: f64,
    /// Linear drag coefficient.
    pub drag_linear: f64,
    /// Quadratic (aero) drag coefficient.
    pub drag_quadratic: f64,
    /// Inverse-inertia factor applied to net accelerating force.
    pub mass_factor: f64,
    /// Starter cranking time before the engine catches, seconds.
    pub cranking_duration_s: f64,
    /// Base-torque multiplier while sport mode is on.
    pub sport_torque_boost: f64,
    /// Upshift threshold offset while sport mode is on.
    pub sport_upshift_offset_rpm: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            idle_rpm: 700.0,
            redline_rpm: 7000.0,
            scale_max_rpm: 8000.0,
            up_threshold_rpm: 5400.0,
            down_threshold_rpm: 1600.0,
            throttle_delay_rpm: 250.0,
            torque_peak_rpm: 3600.0,
            input_deadzone: 5.0,
            input_slew_limit: 4.0,
            creep_torque: 10.0,
            creep_release_speed: 0.12,
            max_brake_torque: 60.0,
            max_drag_torque: 4.0,
            drag_static: 0.030,
            drag_linear: 0.10,
            drag_quadratic: 0.18,
            mass_factor: 0.4,
            cranking_duration_s: 0.8,
            sport_torque_boost: 1.6,
            sport_upshift_offset_rpm: 600.0,
        }
    }
}

impl ThresholdConfig {
    fn validate(&self) -> DrivetrainResult<()> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;

        if !finite_positive(self.idle_rpm)
            || !finite_positive(self.redline_rpm)
            || !finite_positive(self.scale_max_rpm)
            || !finite_positive(self.torque_peak_rpm)
        {
            return Err(DrivetrainError::InvalidThresholds(
                "RPM anchors must be finite and positive".to_string(),
            ));
        }
        if self.idle_rpm >= self.redline_rpm {
            return Err(DrivetrainError::InvalidThresholds(format!(
                "idle_rpm ({}) must be below redline_rpm ({})",
                self.idle_rpm, self.redline_rpm
            )));
        }
        if !(self.idle_rpm < self.down_threshold_rpm
            && self.down_threshold_rpm < self.up_threshold_rpm
            && self.up_threshold_rpm < self.redline_rpm)
        {
            return Err(DrivetrainError::InvalidThresholds(
                "shift thresholds must satisfy idle < down < up < redline".to_string(),
            ));
        }
        if !finite_positive(self.input_deadzone) || !finite_positive(self.input_slew_limit) {
            return Err(DrivetrainError::InvalidThresholds(
                "input shaping values must be finite and positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.creep_release_speed) {
            return Err(DrivetrainError::InvalidThresholds(format!(
                "creep_release_speed must be within [0,1), got {}",
                self.creep_release_speed
            )));
        }
        let torques = [
            self.creep_torque,
            self.max_brake_torque,
            self.max_drag_torque,
        ];
        if !torques.iter().all(|t| (0.0..=100.0).contains(t)) {
            return Err(DrivetrainError::InvalidThresholds(
                "torque magnitudes must be within [0,100]".to_string(),
            ));
        }
        if !finite_positive(self.mass_factor) || !finite_positive(self.cranking_duration_s) {
            return Err(DrivetrainError::InvalidThresholds(
                "mass_factor and cranking_duration_s must be finite and positive".to_string(),
            ));
        }
        let drags = [self.drag_static, self.drag_linear, self.drag_quadratic];
        if !drags.iter().all(|d| d.is_finite() && *d >= 0.0) {
            return Err(DrivetrainError::InvalidThresholds(
                "drag coefficients must be finite and non-negative".to_string(),
            ));
        }
        if !self.sport_torque_boost.is_finite() || self.sport_torque_boost < 1.0 {
            return Err(DrivetrainError::InvalidThresholds(format!(
                "sport_torque_boost must be >= 1, got {}",
                self.sport_torque_boost
            )));
        }
        if !self.sport_upshift_offset_rpm.is_finite() || self.sport_upshift_offset_rpm < 0.0 {
            return Err(DrivetrainError::InvalidThresholds(
                "sport_upshift_offset_rpm must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate drivetrain configuration, supplied once to [`crate::Drivetrain::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default)]
    pub gearbox: GearboxConfig,
    #[serde(default)]
    pub shift: ShiftTimingConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl DriveConfig {
    /// Check every section for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first section-specific error encountered.
    pub fn validate(&self) -> DrivetrainResult<()> {
        self.gearbox.validate()?;
        self.shift.validate()?;
        self.thresholds.validate()
    }
}
