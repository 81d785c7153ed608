//! Jog pipeline micro-benchmark.
//!
//! Measures per-sample cost of the stages a joystick sample passes through:
//! - Soft-limit filter alone
//! - Proportional controller (with envelope)
//! - Full orchestrator step into a recording sink

use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};

use jog_common::config::JogTuning;
use jog_common::geometry::{Vec3, WorkEnvelope};
use jog_common::input::InputEvent;
use jog_common::machine::{MachineSnapshot, MachineStatus};
use jog_common::settings::{JogMode, JogSettings};
use jog_control::orchestrator::JogOrchestrator;
use jog_control::proportional::ProportionalJogController;
use jog_control::sink::RecordingSink;
use jog_control::soft_limit::filter_movement;

fn envelope() -> WorkEnvelope {
    WorkEnvelope::new(Vec3::new(-300.0, -300.0, -100.0), Vec3::ZERO)
}

fn bench_soft_limit(c: &mut Criterion) {
    let env = envelope();
    let mut i = 0u64;
    c.bench_function("filter_movement", |b| {
        b.iter(|| {
            i += 1;
            let t = i as f64 * 0.001;
            let requested = Vec3::new(t.sin(), t.cos(), 0.1);
            filter_movement(requested, Vec3::new(-1.5, -150.0, -50.0), Some(&env))
        });
    });
}

fn bench_controller(c: &mut Criterion) {
    let env = envelope();
    let ctl = ProportionalJogController::default();
    let mut i = 0u64;
    c.bench_function("proportional_process_2d", |b| {
        b.iter(|| {
            i += 1;
            let t = i as f64 * 0.001;
            ctl.process_2d(
                t.sin(),
                t.cos(),
                1500.0,
                25,
                Some(Vec3::new(-2.0, -150.0, -50.0)),
                Some(&env),
            )
        });
    });
}

fn bench_orchestrator_step(c: &mut Criterion) {
    let sink = RecordingSink::new();
    let mut orch = JogOrchestrator::new(JogTuning::default(), Box::new(sink.clone()));
    orch.update_jog_settings(JogSettings {
        mode: JogMode::Joystick,
        ..JogSettings::default()
    });
    orch.handle_machine_snapshot(MachineSnapshot {
        status: MachineStatus::Jog,
        machine_position: Some(Vec3::new(-150.0, -150.0, -50.0)),
        work_envelope: Some(envelope()),
        planner_blocks_available: 20,
        max_observed_buffer_blocks: 35,
        is_online: true,
        controller_present: true,
        firmware_detected: true,
    });

    let t0 = Instant::now();
    let mut i = 0u64;
    c.bench_function("orchestrator_handle_input", |b| {
        b.iter(|| {
            i += 1;
            let now = t0 + Duration::from_millis(i * 25);
            let angle = i as f64 * 0.05;
            let ev = InputEvent::xy("bench", 0.5 * angle.cos(), 0.5 * angle.sin(), now);
            let out = orch.handle_input(&ev, now);
            // Keep the log from growing without bound.
            if i % 1024 == 0 {
                sink.take();
            }
            out
        });
    });
}

criterion_group!(benches, bench_soft_limit, bench_controller, bench_orchestrator_step);
criterion_main!(benches);
