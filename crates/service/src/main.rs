//! OpenRover service daemon (roverd).
//!
//! Hosts one control session against a dry-run bridge: loads or creates the
//! YAML configuration, spawns the control thread, mirrors telemetry into the
//! log, and shuts the session down safely on ctrl-c.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use openrover_drivetrain::TelemetrySnapshot;
use openrover_runtime::Session;
use openrover_service::{DryRunBridge, RoverConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,roverd=debug,openrover_runtime=debug,openrover_service=debug")
        .init();

    info!("starting OpenRover service v{}", env!("CARGO_PKG_VERSION"));

    let mut print_config = false;
    let mut config_path: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "print-config" => print_config = true,
            "--config" => {
                let path = args.next().context("--config requires a path argument")?;
                config_path = Some(PathBuf::from(path));
            }
            other => {
                bail!("unknown argument `{other}` (usage: roverd [print-config] [--config <path>])")
            }
        }
    }

    if print_config {
        println!("{}", RoverConfig::default().to_yaml()?);
        return Ok(());
    }

    let path = match config_path {
        Some(path) => path,
        None => RoverConfig::default_path()?,
    };
    let config = match RoverConfig::load_or_init(&path).await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "config load failed, running with defaults");
            RoverConfig::default()
        }
    };

    let bridge = DryRunBridge::new(config.session.output.esc.clone());
    let session = Session::spawn(config.session, bridge)?;
    let telemetry_task = tokio::spawn(log_telemetry(session.telemetry()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    let metrics = session.shutdown()?;
    info!(
        total_ticks = metrics.total_ticks,
        missed_deadlines = metrics.missed_deadlines,
        stall_resyncs = metrics.stall_resyncs,
        max_jitter_us = metrics.max_jitter_us,
        mean_jitter_us = metrics.mean_jitter_us(),
        "control loop cadence summary"
    );

    // The telemetry channel closed with the session, so the task is done.
    if telemetry_task.await.is_err() {
        warn!("telemetry logger ended abnormally");
    }

    info!("service stopped");
    Ok(())
}

/// Mirror state transitions from the telemetry stream into the log.
async fn log_telemetry(mut rx: watch::Receiver<TelemetrySnapshot>) {
    let mut last = rx.borrow().clone();
    while rx.changed().await.is_ok() {
        let snap = rx.borrow().clone();
        if snap.gear != last.gear || snap.virtual_gear != last.virtual_gear {
            info!(gear = ?snap.gear, virtual_gear = snap.virtual_gear, "gear");
        }
        if snap.engine_running != last.engine_running {
            info!(running = snap.engine_running, "engine");
        }
        if snap.esc_armed != last.esc_armed {
            info!(armed = snap.esc_armed, "esc");
        }
        if snap.sport_mode_on != last.sport_mode_on {
            info!(sport = snap.sport_mode_on, "sport mode");
        }
        last = snap;
    }
}
