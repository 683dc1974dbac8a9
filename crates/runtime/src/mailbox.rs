//! Single-writer command mailbox between the transport layer and the
//! control thread.
//!
//! Pedal axis and steering direction are level signals: the latest value
//! holds until overwritten. Gear requests and toggles are one-shot: they
//! fire on exactly one tick and clear when sampled. Repeated presses
//! between two ticks coalesce into one.

use std::sync::Arc;

use parking_lot::Mutex;

use openrover_drivetrain::{Gear, TickInput};

#[derive(Debug, Default)]
struct MailboxInner {
    axis: f64,
    steer_dir: i8,
    gear_request: Option<Gear>,
    head_toggle: bool,
    sport_mode_toggle: bool,
    engine_toggle: bool,
}

/// Shared command mailbox. Clones refer to the same slot; the writer side
/// is the network/UI transport and the reader side is the control loop.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    inner: Arc<Mutex<MailboxInner>>,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the combined pedal axis. Level signal; persists until the
    /// next update.
    pub fn set_axis(&self, axis: f64) {
        self.inner.lock().axis = axis;
    }

    /// Update the steering direction: -1 left, 0 center, +1 right.
    pub fn set_steer_dir(&self, direction: i8) {
        self.inner.lock().steer_dir = direction;
    }

    /// Request a selector change. A newer request before the next tick
    /// replaces the pending one.
    pub fn request_gear(&self, gear: Gear) {
        self.inner.lock().gear_request = Some(gear);
    }

    pub fn toggle_headlight(&self) {
        self.inner.lock().head_toggle = true;
    }

    pub fn toggle_sport_mode(&self) {
        self.inner.lock().sport_mode_toggle = true;
    }

    pub fn toggle_engine(&self) {
        self.inner.lock().engine_toggle = true;
    }

    /// Sample the mailbox for one tick: levels are copied, one-shots are
    /// taken. Called exactly once per tick by the control loop.
    #[must_use]
    pub fn sample(&self) -> TickInput {
        let mut inner = self.inner.lock();
        TickInput {
            axis: inner.axis,
            steer_dir: inner.steer_dir,
            gear_request: inner.gear_request.take(),
            head_toggle: std::mem::take(&mut inner.head_toggle),
            sport_mode_toggle: std::mem::take(&mut inner.sport_mode_toggle),
            engine_toggle: std::mem::take(&mut inner.engine_toggle),
        }
    }
}
