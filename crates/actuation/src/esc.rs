//! ESC throttle mapping from normalized drive commands to pulse widths.

use serde::{Deserialize, Serialize};

use crate::{ActuationError, ActuationResult};

/// Pulse calibration for the electronic speed controller.
///
/// Hobby ESCs ignore a narrow band of pulse widths around neutral and only
/// start driving once the command clears an internal threshold. The start
/// fractions here jump the output past that threshold the moment the
/// deadzone is crossed, so the smallest live command already turns the
/// wheels instead of humming below the ESC's own cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscConfig {
    /// Full-reverse pulse, microseconds.
    pub min_pulse_us: f64,
    /// Neutral (stopped) pulse, microseconds.
    pub neutral_pulse_us: f64,
    /// Full-forward pulse, microseconds.
    pub max_pulse_us: f64,
    /// Commands below this magnitude are treated as neutral.
    pub deadzone_norm: f64,
    /// Fraction of the forward range applied at the deadzone edge.
    pub forward_start_norm: f64,
    /// Fraction of the reverse range applied at the deadzone edge.
    pub reverse_start_norm: f64,
}

impl Default for EscConfig {
    fn default() -> Self {
        Self {
            min_pulse_us: 1000.0,
            neutral_pulse_us: 1500.0,
            max_pulse_us: 2000.0,
            deadzone_norm: 0.01,
            forward_start_norm: 0.02,
            reverse_start_norm: 0.02,
        }
    }
}

impl EscConfig {
    /// Map a normalized drive command in [-1,1] to a pulse width in
    /// microseconds. Non-finite commands and anything inside the deadzone
    /// come out as exact neutral.
    #[must_use]
    pub fn pulse_for(&self, normalized: f64) -> f64 {
        if !normalized.is_finite() {
            return self.neutral_pulse_us;
        }
        let command = normalized.clamp(-1.0, 1.0);
        if command.abs() < self.deadzone_norm {
            return self.neutral_pulse_us;
        }
        if command > 0.0 {
            let fraction = self.live_fraction(command, self.forward_start_norm);
            self.neutral_pulse_us + fraction * (self.max_pulse_us - self.neutral_pulse_us)
        } else {
            let fraction = self.live_fraction(-command, self.reverse_start_norm);
            self.neutral_pulse_us - fraction * (self.neutral_pulse_us - self.min_pulse_us)
        }
    }

    /// Rescale a command magnitude so the deadzone edge lands on the start
    /// fraction and full deflection lands on 1.
    fn live_fraction(&self, magnitude: f64, start: f64) -> f64 {
        let span = (1.0 - self.deadzone_norm).max(f64::EPSILON);
        let live = (magnitude - self.deadzone_norm) / span;
        (start + (1.0 - start) * live).clamp(0.0, 1.0)
    }

    pub(crate) fn validate(&self) -> ActuationResult<()> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;
        if !finite_positive(self.min_pulse_us)
            || !finite_positive(self.neutral_pulse_us)
            || !finite_positive(self.max_pulse_us)
        {
            return Err(ActuationError::InvalidPulseRange(
                "ESC pulses must be finite and positive".to_string(),
            ));
        }
        if self.min_pulse_us >= self.neutral_pulse_us || self.neutral_pulse_us >= self.max_pulse_us
        {
            return Err(ActuationError::InvalidPulseRange(
                "ESC pulses must satisfy min < neutral < max".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.deadzone_norm) {
            return Err(ActuationError::InvalidRate(
                "ESC deadzone must be in [0,1)".to_string(),
            ));
        }
        if ![self.forward_start_norm, self.reverse_start_norm]
            .iter()
            .all(|start| (0.0..=1.0).contains(start))
        {
            return Err(ActuationError::InvalidRate(
                "ESC start fractions must be in [0,1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_commands_hold_exact_neutral() {
        let cfg = EscConfig::default();
        for command in [0.0, 0.005, -0.009, 0.0099] {
            let pulse = cfg.pulse_for(command);
            assert!(
                (pulse - cfg.neutral_pulse_us).abs() < f64::EPSILON,
                "command {command} produced {pulse}"
            );
        }
    }

    #[test]
    fn full_deflection_reaches_the_range_endpoints() {
        let cfg = EscConfig::default();
        assert!((cfg.pulse_for(1.0) - cfg.max_pulse_us).abs() < 1e-9);
        assert!((cfg.pulse_for(-1.0) - cfg.min_pulse_us).abs() < 1e-9);
    }

    #[test]
    fn first_live_command_clears_the_start_fraction() {
        let cfg = EscConfig::default();
        let just_live = cfg.deadzone_norm + 1e-6;
        let floor = cfg.neutral_pulse_us
            + cfg.forward_start_norm * (cfg.max_pulse_us - cfg.neutral_pulse_us);
        assert!(cfg.pulse_for(just_live) >= floor - 1e-6);
        assert!(cfg.pulse_for(just_live) < floor + 1.0);
    }

    #[test]
    fn reverse_mirrors_forward_with_equal_start_fractions() {
        let cfg = EscConfig::default();
        let up = cfg.pulse_for(0.5) - cfg.neutral_pulse_us;
        let down = cfg.neutral_pulse_us - cfg.pulse_for(-0.5);
        assert!((up - down).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_commands_clamp_to_full_deflection() {
        let cfg = EscConfig::default();
        assert!((cfg.pulse_for(3.5) - cfg.max_pulse_us).abs() < 1e-9);
        assert!((cfg.pulse_for(-2.0) - cfg.min_pulse_us).abs() < 1e-9);
    }

    #[test]
    fn non_finite_commands_fall_back_to_neutral() {
        let cfg = EscConfig::default();
        for command in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!((cfg.pulse_for(command) - cfg.neutral_pulse_us).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn mapping_is_monotone_across_the_forward_band() {
        let cfg = EscConfig::default();
        let mut previous = cfg.pulse_for(cfg.deadzone_norm);
        let mut command = cfg.deadzone_norm;
        while command < 1.0 {
            command += 0.01;
            let pulse = cfg.pulse_for(command);
            assert!(pulse >= previous);
            previous = pulse;
        }
    }

    #[test]
    fn inverted_pulse_range_is_rejected() {
        let cfg = EscConfig {
            min_pulse_us: 2000.0,
            max_pulse_us: 1000.0,
            ..EscConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ActuationError::InvalidPulseRange(_))
        ));
    }

    #[test]
    fn overwide_deadzone_is_rejected() {
        let cfg = EscConfig {
            deadzone_norm: 1.0,
            ..EscConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ActuationError::InvalidRate(_))));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let cfg = EscConfig::default();
        let json = serde_json::to_string(&cfg).unwrap_or_default();
        let back: EscConfig = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back, cfg);
    }
}
