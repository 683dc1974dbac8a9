//! Dry-run hardware bridge.
//!
//! Stands in for the PWM hat when roverd runs on a bench machine. Each
//! channel remembers its last value and logs at debug level only on change,
//! so the 100 Hz tick loop stays quiet while the vehicle idles.

use openrover_actuation::{ActuationResult, EscConfig, HardwareBridge};
use tracing::debug;

/// [`HardwareBridge`] that logs channel writes instead of driving PWM.
#[derive(Debug)]
pub struct DryRunBridge {
    esc: EscConfig,
    steering_us: Option<u16>,
    esc_normalized: Option<f64>,
    esc_pulse_us: Option<u16>,
    headlight: Option<f64>,
    taillight: Option<f64>,
}

impl DryRunBridge {
    /// The ESC calibration is only used to display the physical pulse width
    /// a normalized drive command corresponds to.
    #[must_use]
    pub fn new(esc: EscConfig) -> Self {
        Self {
            esc,
            steering_us: None,
            esc_normalized: None,
            esc_pulse_us: None,
            headlight: None,
            taillight: None,
        }
    }
}

/// Change detection over bit patterns, so a repeated NaN still counts as
/// unchanged.
fn store_if_changed(last: &mut Option<f64>, value: f64) -> bool {
    if last.map(f64::to_bits) == Some(value.to_bits()) {
        return false;
    }
    *last = Some(value);
    true
}

impl HardwareBridge for DryRunBridge {
    fn set_steering_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()> {
        if self.steering_us != Some(pulse_us) {
            self.steering_us = Some(pulse_us);
            debug!(pulse_us, "steering servo");
        }
        Ok(())
    }

    fn set_esc_normalized(&mut self, value: f64) -> ActuationResult<()> {
        if store_if_changed(&mut self.esc_normalized, value) {
            debug!(value, pulse_us = self.esc.pulse_for(value).round(), "esc drive");
        }
        Ok(())
    }

    fn set_esc_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()> {
        if self.esc_pulse_us != Some(pulse_us) {
            self.esc_pulse_us = Some(pulse_us);
            debug!(pulse_us, "esc raw pulse");
        }
        Ok(())
    }

    fn set_headlight(&mut self, brightness: f64) -> ActuationResult<()> {
        if store_if_changed(&mut self.headlight, brightness) {
            debug!(brightness, "headlight");
        }
        Ok(())
    }

    fn set_taillight(&mut self, brightness: f64) -> ActuationResult<()> {
        if store_if_changed(&mut self.taillight, brightness) {
            debug!(brightness, "taillight");
        }
        Ok(())
    }
}
