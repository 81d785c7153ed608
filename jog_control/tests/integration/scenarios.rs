//! Integration test: reference scenarios.
//!
//! A. Base distance at 1000 mm/min and 25 ms.
//! B. Request toward a boundary the tool is already inside the buffer of.
//! C. Dead zone regardless of envelope and feed.
//! D. Leaving Jog for Alarm drops the prediction.

use std::time::{Duration, Instant};

use jog_common::config::JogTuning;
use jog_common::geometry::{Vec3, WorkEnvelope};
use jog_common::input::InputEvent;
use jog_common::machine::{MachineSnapshot, MachineStatus};
use jog_common::settings::{JogMode, JogSettings};

use jog_control::orchestrator::{InputOutcome, JogOrchestrator};
use jog_control::predictor::PositionPredictor;
use jog_control::proportional::{ProportionalJogController, base_distance};
use jog_control::sink::RecordingSink;
use jog_control::soft_limit::{filter_movement, filter_proportional};

// ── Helpers ─────────────────────────────────────────────────────────

fn cube() -> WorkEnvelope {
    WorkEnvelope::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::ZERO)
}

fn machine(status: MachineStatus, pos: Vec3) -> MachineSnapshot {
    MachineSnapshot {
        status,
        machine_position: Some(pos),
        work_envelope: Some(cube()),
        is_online: true,
        controller_present: true,
        firmware_detected: true,
        ..Default::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn scenario_a_base_distance() {
    let d = base_distance(1000.0, 25);
    assert!((d - 0.416_666_666_666_666_7).abs() < 1e-12);

    let out = ProportionalJogController::default().process_2d(1.0, 0.0, 1000.0, 25, None, None);
    assert_eq!(out.base_distance, d);
}

#[test]
fn scenario_b_inside_buffer_never_reverses() {
    let env = cube();
    let pos = Vec3::new(-0.5, -50.0, -50.0);

    let filtered = filter_proportional(Vec3::new(1.0, 0.0, 0.0), pos, Some(&env), 10.0, 1.0);
    assert_eq!(filtered.x, 0.0);

    // Same in millimetres.
    let mm = filter_movement(Vec3::new(10.0, 0.0, 0.0), pos, Some(&env));
    assert_eq!(mm, Vec3::ZERO);

    // Backing out of the buffer zone is unrestricted.
    let back = filter_proportional(Vec3::new(-1.0, 0.0, 0.0), pos, Some(&env), 10.0, 1.0);
    assert_eq!(back.x, -1.0);
}

#[test]
fn scenario_c_dead_zone_beats_everything() {
    let ctl = ProportionalJogController::default();
    let env = cube();
    for feed in [1.0, 1000.0, 50_000.0] {
        for pos in [None, Some(Vec3::new(-50.0, -50.0, -50.0)), Some(Vec3::ZERO)] {
            let out = ctl.process_2d(0.02, 0.02, feed, 25, pos, Some(&env));
            assert!(!out.is_active, "feed {feed} pos {pos:?}");
            assert_eq!(out.magnitude, 0.0);
            assert_eq!(out.scaled_feed_rate, 0.0);
        }
    }
}

#[test]
fn scenario_d_alarm_clears_prediction() {
    let sink = RecordingSink::new();
    let mut orch = JogOrchestrator::new(JogTuning::default(), Box::new(sink.clone()));
    orch.update_jog_settings(JogSettings {
        mode: JogMode::Joystick,
        ..JogSettings::default()
    });

    let start = Vec3::new(-50.0, -50.0, -50.0);
    orch.handle_machine_snapshot(machine(MachineStatus::Idle, start));
    let t0 = Instant::now();
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, t0), t0),
        InputOutcome::Sent
    );
    orch.handle_machine_snapshot(machine(MachineStatus::Jog, start));
    assert!(orch.predictor().state().predicted_position.is_some());

    let after_alarm = Vec3::new(-42.0, -50.0, -50.0);
    orch.handle_machine_snapshot(machine(MachineStatus::Alarm, after_alarm));
    assert_eq!(orch.predictor().state().predicted_position, None);

    // Next filtering call adopts the fresh actual position.
    let mut predictor = orch.predictor().clone();
    let t1 = t0 + Duration::from_millis(10);
    assert_eq!(
        predictor.position_for_filtering(Some(after_alarm), t1),
        Some(after_alarm)
    );
}

#[test]
fn prediction_goes_stale_at_two_seconds() {
    let mut p = PositionPredictor::default();
    let t0 = Instant::now();
    p.position_for_filtering(Some(Vec3::ZERO), t0);
    p.update_after_command(Vec3::new(3.0, 0.0, 0.0), t0);

    let actual = Vec3::new(1.0, 0.0, 0.0);
    assert_eq!(
        p.position_for_filtering(Some(actual), t0 + Duration::from_millis(1999)),
        Some(Vec3::new(3.0, 0.0, 0.0))
    );
    assert_eq!(
        p.position_for_filtering(Some(actual), t0 + Duration::from_millis(2000)),
        Some(actual)
    );
}
