//! Criterion benchmarks for the per-tick step.
//!
//! The step must fit comfortably inside a 10 ms control period; these runs
//! track the hot path at a few representative operating points.

use criterion::{criterion_group, criterion_main, Criterion};
use openrover_drivetrain::{
    DriveConfig, Drivetrain, Gear, TickInput, VehicleState, DEFAULT_TICK_INTERVAL_S,
};
use std::hint::black_box;

fn must<T, E: std::fmt::Debug>(r: Result<T, E>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("must() failed: {e:?}"),
    }
}

fn rolling_state(axis: f64) -> VehicleState {
    let mut state = VehicleState::new();
    state.gear = Gear::Drive;
    state.engine_running = true;
    state.vrpm = 700.0;
    state.axis = axis;
    state
}

fn bench_idle_creep_step(c: &mut Criterion) {
    let model = must(Drivetrain::new(DriveConfig::default()));
    let mut state = rolling_state(0.0);

    c.bench_function("step_idle_creep", |b| {
        b.iter(|| {
            let _ = black_box(model.step(black_box(&mut state), TickInput::default(), DEFAULT_TICK_INTERVAL_S));
        })
    });
}

fn bench_full_throttle_step(c: &mut Criterion) {
    let model = must(Drivetrain::new(DriveConfig::default()));
    let mut state = rolling_state(50.0);
    let input = TickInput::with_axis(50.0);

    c.bench_function("step_full_throttle", |b| {
        b.iter(|| {
            let _ = black_box(model.step(black_box(&mut state), input, DEFAULT_TICK_INTERVAL_S));
            // Keep the loop inside the interesting band instead of pinning
            // at full scale.
            if state.speed >= 0.95 {
                state.speed = 0.2;
            }
        })
    });
}

fn bench_ten_second_drive_cycle(c: &mut Criterion) {
    let model = must(Drivetrain::new(DriveConfig::default()));

    c.bench_function("drive_cycle_1000_ticks", |b| {
        b.iter(|| {
            let mut state = rolling_state(50.0);
            for _ in 0..1000 {
                let _ = black_box(model.step(
                    black_box(&mut state),
                    TickInput::with_axis(50.0),
                    DEFAULT_TICK_INTERVAL_S,
                ));
            }
            black_box(state.virtual_gear)
        })
    });
}

fn bench_snapshot_capture(c: &mut Criterion) {
    let model = must(Drivetrain::new(DriveConfig::default()));
    let mut state = rolling_state(50.0);
    for _ in 0..300 {
        let _ = model.step(&mut state, TickInput::with_axis(50.0), DEFAULT_TICK_INTERVAL_S);
    }

    c.bench_function("telemetry_snapshot", |b| {
        b.iter(|| black_box(model.snapshot(black_box(&state))))
    });
}

criterion_group!(
    benches,
    bench_idle_creep_step,
    bench_full_throttle_step,
    bench_ten_second_drive_cycle,
    bench_snapshot_capture
);
criterion_main!(benches);
