//! Integration test: orchestrator pipeline against a recording sink.
//!
//! Validates the end-to-end numeric behaviour of joystick jogging:
//! 1. Soft limits hold under position lag (prediction in effect)
//! 2. Sliding along a wall
//! 3. Interval follows planner headroom
//! 4. Sink order equals emission order
//! 5. Rotary and six-axis samples obey the same pacing as linear ones

use std::time::{Duration, Instant};

use jog_common::config::JogTuning;
use jog_common::geometry::{Vec3, WorkEnvelope};
use jog_common::input::InputEvent;
use jog_common::machine::{AxisDeltas, MachineCommand, MachineSnapshot, MachineStatus};
use jog_common::settings::{JogMode, JogSettings};
use jog_common::state::JogState;

use jog_control::orchestrator::{InputOutcome, JogOrchestrator};
use jog_control::sink::RecordingSink;

// ── Helpers ─────────────────────────────────────────────────────────

fn machine(pos: Vec3, blocks: u32, max_blocks: u32) -> MachineSnapshot {
    MachineSnapshot {
        status: MachineStatus::Idle,
        machine_position: Some(pos),
        work_envelope: Some(WorkEnvelope::new(
            Vec3::new(-100.0, -100.0, -100.0),
            Vec3::ZERO,
        )),
        planner_blocks_available: blocks,
        max_observed_buffer_blocks: max_blocks,
        is_online: true,
        controller_present: true,
        firmware_detected: true,
    }
}

fn joystick(snapshot: MachineSnapshot) -> (JogOrchestrator, RecordingSink) {
    let sink = RecordingSink::new();
    let mut orch = JogOrchestrator::new(JogTuning::default(), Box::new(sink.clone()));
    orch.update_jog_settings(JogSettings {
        mode: JogMode::Joystick,
        ..JogSettings::default()
    });
    orch.handle_machine_snapshot(snapshot);
    (orch, sink)
}

fn jogs(sink: &RecordingSink) -> Vec<(AxisDeltas, f64)> {
    sink.commands()
        .into_iter()
        .filter_map(|c| match c {
            MachineCommand::Jog { delta, feed_rate } => Some((delta, feed_rate)),
            _ => None,
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn lagging_position_cannot_push_past_boundary() {
    let start = Vec3::new(-5.0, -50.0, -50.0);
    let (mut orch, sink) = joystick(machine(start, 0, 0));

    // The machine never reports a new position during the push.
    let t0 = Instant::now();
    let mut stopped = false;
    for i in 0..80u64 {
        let now = t0 + Duration::from_millis(i * 25);
        if orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, now), now) == InputOutcome::Stopped {
            stopped = true;
            break;
        }
    }
    assert!(stopped, "wall never reached");
    assert_eq!(sink.commands().last(), Some(&MachineCommand::JogStop));

    let travelled: f64 = jogs(&sink).iter().map(|(d, _)| d.x).sum();
    // Buffer face is at -1.0: 4 mm available from -5.0.
    assert!(travelled <= 4.0 + 1e-9, "travelled {travelled}");
    assert!(travelled > 3.9, "travelled {travelled}");
}

#[test]
fn slides_along_wall() {
    // Pinned against +X; diagonal push keeps moving in Y only.
    let (mut orch, sink) = joystick(machine(Vec3::new(-1.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();
    let out = orch.handle_input(&InputEvent::xy("vj", 0.7, 0.7, t0), t0);
    assert_eq!(out, InputOutcome::Sent);

    let (delta, feed) = jogs(&sink)[0];
    assert_eq!(delta.x, 0.0);
    assert!(delta.y > 0.0);
    // Feed follows the filtered magnitude.
    assert_eq!(feed, 700.0);
}

#[test]
fn full_planner_slows_commands() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 35));
    let t0 = Instant::now();
    orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, t0), t0);

    // 100 ms interval at 1000 mm/min.
    let (delta, _) = jogs(&sink)[0];
    assert!((delta.x - 1000.0 / 60.0 * 0.1).abs() < 1e-9);

    let at = |ms| t0 + Duration::from_millis(ms);
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, at(50)), at(50)),
        InputOutcome::Held
    );
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, at(100)), at(100)),
        InputOutcome::Sent
    );
}

#[test]
fn empty_planner_streams_fast() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 35, 35));
    let t0 = Instant::now();
    orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, t0), t0);
    let now = t0 + Duration::from_millis(20);
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 1.0, 0.0, now), now),
        InputOutcome::Sent
    );
    assert_eq!(jogs(&sink).len(), 2);
}

#[test]
fn magnitude_change_sends_early() {
    let (mut orch, _) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();
    orch.handle_input(&InputEvent::xy("vj", 0.3, 0.0, t0), t0);
    let now = t0 + Duration::from_millis(3);
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 0.32, 0.0, now), now),
        InputOutcome::Held
    );
    assert_eq!(
        orch.handle_input(&InputEvent::xy("vj", 0.9, 0.0, now), now),
        InputOutcome::Sent
    );
}

#[test]
fn release_sequence_order() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();
    orch.handle_input(&InputEvent::xy("vj", 0.0, -1.0, t0), t0);
    let t1 = t0 + Duration::from_millis(25);
    orch.handle_input(&InputEvent::xy("vj", 0.0, -1.0, t1), t1);
    orch.handle_input(&InputEvent::released("vj", t1), t1);

    let cmds = sink.commands();
    assert_eq!(cmds.len(), 3);
    assert!(matches!(cmds[0], MachineCommand::Jog { delta, .. } if delta.y < 0.0));
    assert!(matches!(cmds[1], MachineCommand::Jog { .. }));
    assert_eq!(cmds[2], MachineCommand::JogStop);
    assert_eq!(orch.state(), JogState::Idle);
}

#[test]
fn rotary_deflection_jogs_rotary_axis() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();
    let ev = InputEvent::new("spacemouse", 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, t0);
    assert_eq!(orch.handle_input(&ev, t0), InputOutcome::Sent);

    let (delta, feed) = jogs(&sink)[0];
    assert_eq!(delta.linear(), Vec3::ZERO);
    assert!(delta.a > 0.0);
    assert_eq!(feed, 500.0);
}

#[test]
fn steady_rotary_stick_is_paced() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();

    // 5 ms samples for 200 ms against the 25 ms default interval.
    let mut sent = 0;
    for i in 0..40u64 {
        let now = t0 + Duration::from_millis(i * 5);
        let ev = InputEvent::new("spacemouse", 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, now);
        if orch.handle_input(&ev, now) == InputOutcome::Sent {
            sent += 1;
        }
    }

    let jogs = jogs(&sink);
    assert_eq!(sent, 8);
    assert_eq!(jogs.len(), 8);
    assert!(jogs.iter().all(|(d, _)| d.a > 0.0 && d.linear() == Vec3::ZERO));
}

#[test]
fn six_axis_sample_is_paced_until_rotation_turns() {
    let (mut orch, sink) = joystick(machine(Vec3::new(-50.0, -50.0, -50.0), 0, 0));
    let t0 = Instant::now();
    let at = |ms| t0 + Duration::from_millis(ms);
    let sample = |a: f64, now| InputEvent::new("spacemouse", 0.3, 0.2, 0.1, a, 0.2, 0.1, now);

    assert_eq!(orch.handle_input(&sample(0.4, at(0)), at(0)), InputOutcome::Sent);
    assert_eq!(orch.handle_input(&sample(0.4, at(5)), at(5)), InputOutcome::Held);

    // Reversing A alone turns the six-axis direction well past the threshold.
    assert_eq!(orch.handle_input(&sample(-0.4, at(10)), at(10)), InputOutcome::Sent);
    assert_eq!(orch.handle_input(&sample(-0.4, at(15)), at(15)), InputOutcome::Held);

    let jogs = jogs(&sink);
    assert_eq!(jogs.len(), 2);
    assert!(jogs[0].0.a > 0.0 && jogs[0].0.x > 0.0);
    assert!(jogs[1].0.a < 0.0 && jogs[1].0.x > 0.0);
    assert!(orch.joystick().a < 0.0);
}
