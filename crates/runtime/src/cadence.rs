//! Absolute-deadline tick cadence with jitter accounting.
//!
//! Deadlines advance by a fixed period from the previous deadline, not from
//! the wake time, so sleep slop never accumulates into drift. A stall long
//! enough to leave the loop several periods behind rebases the schedule
//! instead of replaying a burst of catch-up ticks.

use std::thread;
use std::time::{Duration, Instant};

use crate::{RuntimeError, RuntimeResult};

/// Rebase the schedule after falling this many periods behind.
const RESYNC_AFTER_PERIODS: u32 = 4;

/// Timing counters for one control session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceMetrics {
    /// Ticks delivered.
    pub total_ticks: u64,
    /// Ticks that started at or past their deadline.
    pub missed_deadlines: u64,
    /// Schedule rebases after long stalls.
    pub stall_resyncs: u64,
    /// Worst wake error seen, microseconds.
    pub max_jitter_us: u64,
    /// Wake error of the most recent tick, microseconds.
    pub last_jitter_us: u64,
    jitter_sum_us: u64,
}

impl CadenceMetrics {
    /// Mean wake error across the session, microseconds.
    #[must_use]
    pub fn mean_jitter_us(&self) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        self.jitter_sum_us as f64 / self.total_ticks as f64
    }

    fn record(&mut self, jitter: Duration, missed: bool) {
        let jitter_us = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
        self.total_ticks += 1;
        if missed {
            self.missed_deadlines += 1;
        }
        self.last_jitter_us = jitter_us;
        self.max_jitter_us = self.max_jitter_us.max(jitter_us);
        self.jitter_sum_us = self.jitter_sum_us.saturating_add(jitter_us);
    }
}

/// Blocking fixed-rate scheduler for the control thread.
#[derive(Debug)]
pub struct TickCadence {
    period: Duration,
    next_tick: Instant,
    metrics: CadenceMetrics,
}

impl TickCadence {
    /// Cadence at a whole-Hz rate. Rates outside 1..=10000 Hz are refused.
    pub fn from_hz(hz: u32) -> RuntimeResult<Self> {
        if hz == 0 || hz > 10_000 {
            return Err(RuntimeError::InvalidCadence(format!(
                "tick rate {hz} Hz out of range"
            )));
        }
        Ok(Self::new(Duration::from_nanos(
            1_000_000_000 / u64::from(hz),
        )))
    }

    fn new(period: Duration) -> Self {
        Self {
            period,
            next_tick: Instant::now() + period,
            metrics: CadenceMetrics::default(),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn metrics(&self) -> CadenceMetrics {
        self.metrics
    }

    /// Sleep until the next deadline and schedule the one after. Returns
    /// the tick count. Never blocks when already past the deadline.
    pub fn wait_for_tick(&mut self) -> u64 {
        let arrived = Instant::now();
        let missed = arrived >= self.next_tick;
        if !missed {
            thread::sleep(self.next_tick.saturating_duration_since(arrived));
        }
        // Wake error relative to the deadline. A healthy tick lands within
        // the sleeper's overshoot; a late arrival carries its full overrun.
        let jitter = Instant::now().saturating_duration_since(self.next_tick);
        self.metrics.record(jitter, missed);

        if jitter > self.period * RESYNC_AFTER_PERIODS {
            self.metrics.stall_resyncs += 1;
            self.next_tick = Instant::now() + self.period;
        } else {
            self.next_tick += self.period;
        }
        self.metrics.total_ticks
    }
}
