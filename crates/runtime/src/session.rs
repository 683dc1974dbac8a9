//! The control session: a dedicated thread stepping the drivetrain at a
//! fixed cadence, running the ESC arming handover, pushing actuator frames
//! to the hardware bridge, and publishing telemetry.
//!
//! All vehicle state lives on the control thread. The rest of the process
//! talks to it through the [`Mailbox`] (inbound) and a `tokio::sync::watch`
//! channel (outbound), so no lock is ever held across a tick.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use openrover_actuation::{
    ArmingConfig, ArmingSequencer, HardwareBridge, OutputMapper, OutputMapperConfig,
};
use openrover_drivetrain::{
    DriveConfig, DriveEvents, Drivetrain, TelemetrySnapshot, TickInput, VehicleState,
};

use crate::cadence::{CadenceMetrics, TickCadence};
use crate::mailbox::Mailbox;
use crate::{RuntimeError, RuntimeResult};

/// Everything a session needs, supplied once at spawn time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Control loop rate in Hz.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub output: OutputMapperConfig,
    #[serde(default)]
    pub arming: ArmingConfig,
}

fn default_tick_hz() -> u32 {
    100
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            drive: DriveConfig::default(),
            output: OutputMapperConfig::default(),
            arming: ArmingConfig::default(),
        }
    }
}

enum LoopCommand {
    Shutdown,
}

/// Handle to a running control session.
///
/// Dropping the handle stops the loop too (the command channel disconnects
/// and the thread applies the safe frame on its way out), but going through
/// [`Session::shutdown`] is preferred: it joins the thread and hands back
/// the timing metrics.
#[derive(Debug)]
pub struct Session {
    mailbox: Mailbox,
    telemetry_rx: watch::Receiver<TelemetrySnapshot>,
    command_tx: Sender<LoopCommand>,
    thread: Option<JoinHandle<CadenceMetrics>>,
}

impl Session {
    /// Validate the configuration, spawn the control thread, start ticking.
    pub fn spawn<B>(cfg: SessionConfig, bridge: B) -> RuntimeResult<Self>
    where
        B: HardwareBridge + Send + 'static,
    {
        let drivetrain = Drivetrain::new(cfg.drive.clone())?;
        let mapper = OutputMapper::new(cfg.output.clone())?;
        let sequencer = ArmingSequencer::new(cfg.arming.clone())?;
        let mut cadence = TickCadence::from_hz(cfg.tick_hz)?;
        let dt_s = cadence.period().as_secs_f64();

        let mailbox = Mailbox::new();
        let (command_tx, command_rx) = channel::bounded(4);
        let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySnapshot::default());

        let mut ctx = LoopContext {
            drivetrain,
            mapper,
            sequencer,
            state: VehicleState::new(),
            bridge,
            telemetry_tx,
            dt_s,
        };
        let loop_mailbox = mailbox.clone();

        let thread = thread::Builder::new()
            .name("rover-control".to_string())
            .spawn(move || run_loop(&mut ctx, &loop_mailbox, &command_rx, &mut cadence))?;

        info!(tick_hz = cfg.tick_hz, "control session started");
        Ok(Self {
            mailbox,
            telemetry_rx,
            command_tx,
            thread: Some(thread),
        })
    }

    /// Writer handle for the transport layer.
    #[must_use]
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Telemetry receiver; holds the latest post-tick snapshot.
    #[must_use]
    pub fn telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry_rx.clone()
    }

    /// Stop the loop, wait for the safe frame to be applied, and collect
    /// the session's timing metrics.
    pub fn shutdown(mut self) -> RuntimeResult<CadenceMetrics> {
        if self.command_tx.try_send(LoopCommand::Shutdown).is_err() {
            debug!("control thread already stopping");
        }
        match self.thread.take() {
            Some(handle) => match handle.join() {
                Ok(metrics) => Ok(metrics),
                Err(_panic) => Err(RuntimeError::LoopPanicked),
            },
            None => Err(RuntimeError::LoopPanicked),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            if self.command_tx.try_send(LoopCommand::Shutdown).is_err() {
                debug!("control thread already stopping");
            }
            if handle.join().is_err() {
                warn!("control thread panicked during drop");
            }
        }
    }
}

/// All state owned by the control thread.
struct LoopContext<B> {
    drivetrain: Drivetrain,
    mapper: OutputMapper,
    sequencer: ArmingSequencer,
    state: VehicleState,
    bridge: B,
    telemetry_tx: watch::Sender<TelemetrySnapshot>,
    dt_s: f64,
}

impl<B: HardwareBridge> LoopContext<B> {
    /// One full control tick: step the model, run the arming handover, map
    /// and apply outputs, publish telemetry.
    fn tick(&mut self, input: TickInput) {
        let events = self.drivetrain.step(&mut self.state, input, self.dt_s);
        self.handle_events(events);

        let esc_override = self.sequencer.tick(self.dt_s);
        self.state.esc_armed = self.sequencer.is_armed();

        let frame = self.mapper.tick(&mut self.state, input.steer_dir, self.dt_s);
        if let Err(e) = self.mapper.apply(&frame, esc_override, &mut self.bridge) {
            warn!(error = %e, "hardware write failed; continuing");
        }

        self.telemetry_tx
            .send_replace(self.drivetrain.snapshot(&self.state));
    }

    fn handle_events(&mut self, events: DriveEvents) {
        if events.engine_started {
            info!("engine running; starting ESC arming sequence");
            self.sequencer.begin_arming();
        }
        if events.engine_stopped {
            info!("engine stopped; disarming ESC");
            self.sequencer.begin_disarming();
        }
        if events.shift_fail {
            debug!("gear request rejected: brake not held");
        }
        if events.engine_start_blocked_gear || events.engine_stop_blocked {
            debug!("engine toggle refused outside Park");
        }
        if events.engine_start_blocked_brake {
            debug!("engine start refused without brake held");
        }
    }

    /// Final transition before teardown: zero torque, centered steering,
    /// ESC disarmed, one last telemetry snapshot.
    fn safe_stop(&mut self) {
        self.drivetrain.force_safe_state(&mut self.state);
        self.sequencer.reset();
        self.state.esc_armed = false;

        let frame = self.mapper.safe_frame();
        if let Err(e) = self.mapper.apply(&frame, None, &mut self.bridge) {
            warn!(error = %e, "failed to apply safe frame during shutdown");
        }
        self.telemetry_tx
            .send_replace(self.drivetrain.snapshot(&self.state));
        info!("control session stopped; safe frame applied");
    }
}

fn run_loop<B: HardwareBridge>(
    ctx: &mut LoopContext<B>,
    mailbox: &Mailbox,
    commands: &Receiver<LoopCommand>,
    cadence: &mut TickCadence,
) -> CadenceMetrics {
    loop {
        let _tick = cadence.wait_for_tick();
        match commands.try_recv() {
            Ok(LoopCommand::Shutdown) => break,
            // Every session handle is gone; stop rather than tick into the void.
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        ctx.tick(mailbox.sample());
    }
    ctx.safe_stop();
    cadence.metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrover_actuation::ActuationResult;
    use openrover_drivetrain::Gear;
    use std::time::Duration;

    const DT: f64 = 0.01;

    /// Bridge double recording the last value written per channel.
    #[derive(Debug, Default, Clone)]
    struct TestBridge {
        steering_us: u16,
        esc_normalized: f64,
        esc_pulse_us: u16,
        headlight: f64,
        taillight: f64,
        writes: u64,
    }

    impl HardwareBridge for TestBridge {
        fn set_steering_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()> {
            self.steering_us = pulse_us;
            self.writes += 1;
            Ok(())
        }

        fn set_esc_normalized(&mut self, value: f64) -> ActuationResult<()> {
            self.esc_normalized = value;
            self.writes += 1;
            Ok(())
        }

        fn set_esc_pulse_us(&mut self, pulse_us: u16) -> ActuationResult<()> {
            self.esc_pulse_us = pulse_us;
            self.writes += 1;
            Ok(())
        }

        fn set_headlight(&mut self, brightness: f64) -> ActuationResult<()> {
            self.headlight = brightness;
            self.writes += 1;
            Ok(())
        }

        fn set_taillight(&mut self, brightness: f64) -> ActuationResult<()> {
            self.taillight = brightness;
            self.writes += 1;
            Ok(())
        }
    }

    fn context() -> (LoopContext<TestBridge>, watch::Receiver<TelemetrySnapshot>) {
        let cfg = SessionConfig::default();
        let drivetrain = match Drivetrain::new(cfg.drive) {
            Ok(model) => model,
            Err(e) => panic!("default drive config rejected: {e}"),
        };
        let mapper = match OutputMapper::new(cfg.output) {
            Ok(mapper) => mapper,
            Err(e) => panic!("default output config rejected: {e}"),
        };
        let sequencer = match ArmingSequencer::new(cfg.arming) {
            Ok(seq) => seq,
            Err(e) => panic!("default arming config rejected: {e}"),
        };
        let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySnapshot::default());
        let ctx = LoopContext {
            drivetrain,
            mapper,
            sequencer,
            state: VehicleState::new(),
            bridge: TestBridge::default(),
            telemetry_tx,
            dt_s: DT,
        };
        (ctx, telemetry_rx)
    }

    fn hold_brake(ctx: &mut LoopContext<TestBridge>, ticks: u32) {
        for _ in 0..ticks {
            ctx.tick(TickInput::with_axis(-40.0));
        }
    }

    #[test]
    fn engine_start_kicks_off_the_arming_sequence() {
        let (mut ctx, _rx) = context();

        hold_brake(&mut ctx, 15);
        ctx.tick(TickInput {
            axis: -40.0,
            engine_toggle: true,
            ..TickInput::default()
        });
        assert!(!ctx.state.engine_running);

        // Cranking runs 0.8s; the toggle tick already spent one of its 80
        // ticks, and the sequencer stays idle until the catch.
        for _ in 0..78 {
            ctx.tick(TickInput::with_axis(-40.0));
            assert!(!ctx.sequencer.is_sequencing());
        }
        ctx.tick(TickInput::with_axis(-40.0));
        assert!(ctx.state.engine_running);
        assert!(ctx.sequencer.is_sequencing());

        // Calibration throw plus neutral settle at 100 Hz.
        for _ in 0..300 {
            ctx.tick(TickInput::with_axis(-40.0));
        }
        assert!(ctx.state.esc_armed);
        assert_eq!(ctx.bridge.esc_pulse_us, 1500);
    }

    #[test]
    fn full_drive_away_reaches_the_esc() {
        let (mut ctx, rx) = context();

        hold_brake(&mut ctx, 15);
        ctx.tick(TickInput {
            axis: -40.0,
            engine_toggle: true,
            ..TickInput::default()
        });
        for _ in 0..380 {
            ctx.tick(TickInput::with_axis(-40.0));
        }
        assert!(ctx.state.esc_armed);

        ctx.tick(TickInput {
            axis: -40.0,
            gear_request: Some(Gear::Drive),
            ..TickInput::default()
        });
        assert_eq!(ctx.state.gear, Gear::Drive);

        for _ in 0..300 {
            ctx.tick(TickInput::with_axis(45.0));
        }
        assert!(ctx.state.speed > 0.05);
        assert!(ctx.bridge.esc_normalized > 0.05);
        assert_eq!(rx.borrow().gear, Gear::Drive);
        assert!(rx.borrow().engine_running);
    }

    #[test]
    fn telemetry_is_published_every_tick() {
        let (mut ctx, rx) = context();
        ctx.tick(TickInput::with_axis(10.0));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow().gear, Gear::Park);
    }

    #[test]
    fn safe_stop_parks_the_outputs() {
        let (mut ctx, rx) = context();

        hold_brake(&mut ctx, 15);
        ctx.tick(TickInput {
            axis: -40.0,
            engine_toggle: true,
            ..TickInput::default()
        });
        for _ in 0..100 {
            ctx.tick(TickInput::with_axis(-40.0));
        }
        assert!(ctx.sequencer.is_sequencing());

        ctx.safe_stop();
        assert!(!ctx.state.esc_armed);
        assert!(!ctx.sequencer.is_sequencing());
        assert_eq!(ctx.bridge.steering_us, 1800);
        assert!(ctx.bridge.esc_normalized.abs() < f64::EPSILON);
        assert!(rx.borrow().torque_cmd.abs() < f64::EPSILON);
    }

    #[test]
    fn session_spawns_ticks_and_shuts_down_cleanly() {
        let session = match Session::spawn(SessionConfig::default(), TestBridge::default()) {
            Ok(session) => session,
            Err(e) => panic!("session failed to spawn: {e}"),
        };

        let mailbox = session.mailbox();
        mailbox.set_axis(-40.0);
        let telemetry = session.telemetry();

        thread::sleep(Duration::from_millis(100));
        let metrics = match session.shutdown() {
            Ok(metrics) => metrics,
            Err(e) => panic!("shutdown failed: {e}"),
        };

        assert!(metrics.total_ticks >= 5);
        let last = telemetry.borrow();
        assert_eq!(last.gear, Gear::Park);
        assert!(!last.engine_running);
    }

    #[test]
    fn invalid_tick_rate_fails_spawn() {
        let cfg = SessionConfig {
            tick_hz: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::spawn(cfg, TestBridge::default()),
            Err(RuntimeError::InvalidCadence(_))
        ));
    }
}
