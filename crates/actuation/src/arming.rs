//! Timed ESC arming sequence, run as a tick-driven state machine.
//!
//! Hobby ESCs must see a calibration throw before they accept throttle:
//! full reverse, full forward, then a long settle at neutral. The sequencer
//! owns the ESC line while that plays out and hands it back once armed.
//! Time advances only through [`ArmingSequencer::tick`], so tests can run
//! the whole sequence without real delays.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{round_pulse_us, ActuationError, ActuationResult};

/// Pulse levels and hold times for the arming throw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmingConfig {
    /// Low end of the calibration throw, microseconds.
    pub arm_min_pulse_us: f64,
    /// High end of the calibration throw, microseconds.
    pub arm_max_pulse_us: f64,
    /// Neutral pulse held while settling, microseconds.
    pub neutral_pulse_us: f64,
    /// Hold time at each throw endpoint, seconds.
    pub step_s: f64,
    /// Neutral settle time before the ESC counts as armed, seconds.
    pub neutral_hold_s: f64,
    /// Neutral hold time when disarming, seconds.
    pub disarm_settle_s: f64,
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            arm_min_pulse_us: 1000.0,
            arm_max_pulse_us: 2000.0,
            neutral_pulse_us: 1500.0,
            step_s: 0.5,
            neutral_hold_s: 2.0,
            disarm_settle_s: 0.5,
        }
    }
}

impl ArmingConfig {
    fn validate(&self) -> ActuationResult<()> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;
        if !finite_positive(self.arm_min_pulse_us)
            || !finite_positive(self.arm_max_pulse_us)
            || !finite_positive(self.neutral_pulse_us)
        {
            return Err(ActuationError::InvalidPulseRange(
                "arming pulses must be finite and positive".to_string(),
            ));
        }
        if self.arm_min_pulse_us >= self.neutral_pulse_us
            || self.neutral_pulse_us >= self.arm_max_pulse_us
        {
            return Err(ActuationError::InvalidPulseRange(
                "arming pulses must satisfy min < neutral < max".to_string(),
            ));
        }
        if ![self.step_s, self.neutral_hold_s, self.disarm_settle_s]
            .iter()
            .all(|d| finite_positive(*d))
        {
            return Err(ActuationError::InvalidRate(
                "arming hold times must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the sequencer is in the arm/disarm cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArmingPhase {
    /// No sequence running; the ESC line belongs to the output mapper.
    #[default]
    Idle,
    /// Holding the low calibration pulse.
    ArmMin,
    /// Holding the high calibration pulse.
    ArmMax,
    /// Settling at neutral before the ESC counts as armed.
    ArmNeutral,
    /// Sequence complete; drive commands are live.
    Armed,
    /// Settling at neutral on the way back to idle.
    Disarming,
}

impl fmt::Display for ArmingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ArmingPhase::Idle => "idle",
            ArmingPhase::ArmMin => "arm_min",
            ArmingPhase::ArmMax => "arm_max",
            ArmingPhase::ArmNeutral => "arm_neutral",
            ArmingPhase::Armed => "armed",
            ArmingPhase::Disarming => "disarming",
        };
        f.write_str(tag)
    }
}

/// Sequential arm/disarm state machine for one ESC.
#[derive(Debug, Clone)]
pub struct ArmingSequencer {
    cfg: ArmingConfig,
    phase: ArmingPhase,
    timer_s: f64,
}

impl ArmingSequencer {
    pub fn new(cfg: ArmingConfig) -> ActuationResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            phase: ArmingPhase::Idle,
            timer_s: 0.0,
        })
    }

    #[must_use]
    pub fn phase(&self) -> ArmingPhase {
        self.phase
    }

    /// True once the calibration throw and neutral settle have completed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.phase == ArmingPhase::Armed
    }

    /// True while the sequencer owns the ESC line.
    #[must_use]
    pub fn is_sequencing(&self) -> bool {
        !matches!(self.phase, ArmingPhase::Idle | ArmingPhase::Armed)
    }

    /// Start the calibration throw from the beginning, from any phase.
    pub fn begin_arming(&mut self) {
        self.phase = ArmingPhase::ArmMin;
        self.timer_s = self.cfg.step_s;
    }

    /// Drop out of armed (or abort an arm in progress) through a neutral
    /// settle. A sequencer that never armed stays idle.
    pub fn begin_disarming(&mut self) {
        if self.phase == ArmingPhase::Idle {
            return;
        }
        self.phase = ArmingPhase::Disarming;
        self.timer_s = self.cfg.disarm_settle_s;
    }

    /// Abandon whatever is in flight without the neutral settle. Used on
    /// shutdown after the safe frame has already been applied.
    pub fn reset(&mut self) {
        self.phase = ArmingPhase::Idle;
        self.timer_s = 0.0;
    }

    /// Advance one tick. Returns the raw pulse to hold on the ESC line, or
    /// `None` when the sequencer is not driving it.
    pub fn tick(&mut self, dt_s: f64) -> Option<u16> {
        if !self.is_sequencing() {
            return None;
        }
        self.timer_s -= dt_s.max(0.0);
        if self.timer_s <= 0.0 {
            self.advance();
        }
        match self.phase {
            ArmingPhase::ArmMin => Some(round_pulse_us(self.cfg.arm_min_pulse_us)),
            ArmingPhase::ArmMax => Some(round_pulse_us(self.cfg.arm_max_pulse_us)),
            ArmingPhase::ArmNeutral | ArmingPhase::Disarming => {
                Some(round_pulse_us(self.cfg.neutral_pulse_us))
            }
            ArmingPhase::Idle | ArmingPhase::Armed => None,
        }
    }

    fn advance(&mut self) {
        let (next, duration_s) = match self.phase {
            ArmingPhase::ArmMin => (ArmingPhase::ArmMax, self.cfg.step_s),
            ArmingPhase::ArmMax => (ArmingPhase::ArmNeutral, self.cfg.neutral_hold_s),
            ArmingPhase::ArmNeutral => (ArmingPhase::Armed, 0.0),
            ArmingPhase::Disarming => (ArmingPhase::Idle, 0.0),
            ArmingPhase::Idle | ArmingPhase::Armed => return,
        };
        self.phase = next;
        self.timer_s = duration_s;
    }
}
