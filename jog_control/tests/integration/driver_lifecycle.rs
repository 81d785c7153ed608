//! Integration test: driver lifecycle through the running service.
//!
//! 1. Failed initialize → not registered, error propagated
//! 2. Disabled driver → events ignored
//! 3. Disable or remove during a joystick jog → JogStop
//! 4. Shutdown disposes drivers
//! 5. Stop has taken effect when it returns, ahead of queued samples

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jog_common::config::JogServiceConfig;
use jog_common::driver::{DriverError, InputDriver};
use jog_common::geometry::{Axis, Direction, Vec3, WorkEnvelope};
use jog_common::input::{Capabilities, InputEvent};
use jog_common::machine::{MachineCommand, MachineSnapshot, MachineStatus};
use jog_common::settings::{JogMode, JogSettings};
use jog_common::state::{JogSnapshot, JogState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use jog_control::drivers::VirtualJoystick;
use jog_control::service::{JogHandle, JogService};
use jog_control::sink::RecordingSink;
use jog_control::RegistryError;

// ── Helpers ─────────────────────────────────────────────────────────

struct FlakyDriver {
    fail: bool,
    disposed: Arc<AtomicBool>,
    _tx: mpsc::Sender<InputEvent>,
    rx: Option<mpsc::Receiver<InputEvent>>,
}

impl FlakyDriver {
    fn new(fail: bool) -> (Self, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel(4);
        let disposed = Arc::new(AtomicBool::new(false));
        (
            Self {
                fail,
                disposed: disposed.clone(),
                _tx: tx,
                rx: Some(rx),
            },
            disposed,
        )
    }
}

#[async_trait]
impl InputDriver for FlakyDriver {
    fn device_id(&self) -> &str {
        "pendant"
    }

    fn display_name(&self) -> &str {
        "USB pendant"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::XYZ_3D
    }

    fn is_active(&self) -> bool {
        !self.fail
    }

    async fn initialize(&mut self) -> Result<(), DriverError> {
        if self.fail {
            Err(DriverError::InitFailed("device not found".into()))
        } else {
            Ok(())
        }
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<InputEvent>, DriverError> {
        self.rx
            .take()
            .ok_or_else(|| DriverError::StreamUnavailable("taken".into()))
    }

    async fn dispose(&mut self) -> Result<(), DriverError> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn idle_machine() -> MachineSnapshot {
    MachineSnapshot {
        status: MachineStatus::Idle,
        machine_position: Some(Vec3::new(-50.0, -50.0, -50.0)),
        work_envelope: Some(WorkEnvelope::new(
            Vec3::new(-100.0, -100.0, -100.0),
            Vec3::ZERO,
        )),
        is_online: true,
        controller_present: true,
        firmware_detected: true,
        ..Default::default()
    }
}

struct Harness {
    handle: JogHandle,
    sink: RecordingSink,
    machine_tx: watch::Sender<MachineSnapshot>,
    task: JoinHandle<()>,
}

async fn start(mode: JogMode) -> Harness {
    let (machine_tx, machine_rx) = watch::channel(idle_machine());
    let sink = RecordingSink::new();
    let (service, handle) =
        JogService::new(&JogServiceConfig::default(), Box::new(sink.clone()), machine_rx);
    let task = tokio::spawn(service.run());
    handle
        .update_jog_settings(JogSettings {
            mode,
            ..JogSettings::default()
        })
        .await
        .unwrap();
    Harness {
        handle,
        sink,
        machine_tx,
        task,
    }
}

async fn wait_until(handle: &JogHandle, pred: impl Fn(&JogSnapshot) -> bool) -> JogSnapshot {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snap = rx.borrow_and_update().clone();
            if pred(&snap) {
                return snap;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("snapshot condition not reached")
}

async fn finish(h: Harness) {
    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_initialize_propagates() {
    let h = start(JogMode::Joystick).await;
    let (driver, _) = FlakyDriver::new(true);
    let err = h.handle.add_input_driver(Box::new(driver)).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Driver {
            source: DriverError::InitFailed(_),
            ..
        }
    ));
    assert!(h.handle.list_input_drivers().await.unwrap().is_empty());
    finish(h).await;
}

#[tokio::test]
async fn registration_is_listed_and_removable() {
    let h = start(JogMode::Joystick).await;
    let (driver, disposed) = FlakyDriver::new(false);
    h.handle.add_input_driver(Box::new(driver)).await.unwrap();
    h.handle
        .add_input_driver(Box::new(VirtualJoystick::new("screen")))
        .await
        .unwrap();

    let list = h.handle.list_input_drivers().await.unwrap();
    let ids: Vec<_> = list.iter().map(|d| d.device_id.as_str()).collect();
    assert_eq!(ids, vec!["pendant", "screen"]);
    assert!(list.iter().all(|d| d.enabled && d.active));
    assert_eq!(list[0].capabilities, Capabilities::XYZ_3D);

    let (dup, _) = FlakyDriver::new(false);
    assert!(matches!(
        h.handle.add_input_driver(Box::new(dup)).await,
        Err(RegistryError::DuplicateDevice(_))
    ));

    h.handle.remove_input_driver("pendant").await.unwrap();
    assert!(disposed.load(Ordering::SeqCst));
    assert!(matches!(
        h.handle.remove_input_driver("pendant").await,
        Err(RegistryError::UnknownDevice(_))
    ));

    let snap = wait_until(&h.handle, |s| s.drivers.len() == 1).await;
    assert_eq!(snap.drivers[0].device_id, "screen");
    finish(h).await;
}

#[tokio::test]
async fn disabled_driver_is_ignored() {
    let h = start(JogMode::Joystick).await;
    let js = VirtualJoystick::new("screen");
    let control = js.control();
    h.handle.add_input_driver(Box::new(js)).await.unwrap();
    h.handle.set_input_driver_enabled("screen", false).await.unwrap();

    control.set_deflection(1.0, 0.0).unwrap();
    // A round trip through the service guarantees the sample was processed.
    h.handle.list_input_drivers().await.unwrap();
    assert!(h.sink.commands().is_empty());

    h.handle.set_input_driver_enabled("screen", true).await.unwrap();
    control.set_deflection(1.0, 0.0).unwrap();
    wait_until(&h.handle, |s| s.state == JogState::Jogging).await;
    finish(h).await;
}

#[tokio::test]
async fn disabling_during_jog_stops_motion() {
    let h = start(JogMode::Joystick).await;
    let js = VirtualJoystick::new("screen");
    let control = js.control();
    h.handle.add_input_driver(Box::new(js)).await.unwrap();

    control.set_deflection(0.0, 1.0).unwrap();
    wait_until(&h.handle, |s| s.state == JogState::Jogging).await;

    h.handle.set_input_driver_enabled("screen", false).await.unwrap();
    assert_eq!(h.sink.commands().last(), Some(&MachineCommand::JogStop));
    let snap = wait_until(&h.handle, |s| s.state == JogState::Idle).await;
    assert!(!snap.joystick.is_active);
    finish(h).await;
}

#[tokio::test]
async fn discrete_jog_and_completion() {
    let h = start(JogMode::Discrete).await;
    h.handle.discrete_jog(Axis::X, Direction::Negative).await.unwrap();
    wait_until(&h.handle, |s| s.state == JogState::Jogging).await;

    match &h.sink.commands()[0] {
        MachineCommand::Jog { delta, feed_rate } => {
            assert_eq!(delta.x, -1.0);
            assert_eq!(*feed_rate, 1000.0);
        }
        other => panic!("expected jog, got {other:?}"),
    }

    h.machine_tx.send_modify(|m| m.status = MachineStatus::Jog);
    // Round trip so the Jog report is applied before the next one.
    h.handle.list_input_drivers().await.unwrap();
    h.machine_tx.send_modify(|m| {
        m.status = MachineStatus::Idle;
        m.machine_position = Some(Vec3::new(-51.0, -50.0, -50.0));
    });
    wait_until(&h.handle, |s| s.state == JogState::Idle).await;
    finish(h).await;
}

#[tokio::test]
async fn shutdown_disposes_registered_drivers() {
    let h = start(JogMode::Joystick).await;
    let (driver, disposed) = FlakyDriver::new(false);
    h.handle.add_input_driver(Box::new(driver)).await.unwrap();

    let handle = h.handle.clone();
    finish(h).await;
    assert!(disposed.load(Ordering::SeqCst));
    let snap = handle.snapshot();
    assert!(!snap.initialized);
    assert!(snap.drivers.is_empty());
}

fn jogs_after_last_stop(sink: &RecordingSink) -> usize {
    let cmds = sink.commands();
    let last_stop = cmds
        .iter()
        .rposition(|c| *c == MachineCommand::JogStop)
        .expect("no JogStop emitted");
    cmds[last_stop..]
        .iter()
        .filter(|c| matches!(c, MachineCommand::Jog { .. }))
        .count()
}

#[tokio::test]
async fn stop_returns_after_motion_is_stopped() {
    let h = start(JogMode::Joystick).await;
    let js = VirtualJoystick::new("screen");
    let control = js.control();
    h.handle.add_input_driver(Box::new(js)).await.unwrap();

    control.set_deflection(1.0, 0.0).unwrap();
    wait_until(&h.handle, |s| s.state == JogState::Jogging).await;

    h.handle.stop().await.unwrap();
    let snap = h.handle.snapshot();
    assert_eq!(snap.state, JogState::Idle);
    assert!(!snap.joystick.is_active);
    assert_eq!(h.sink.commands().last(), Some(&MachineCommand::JogStop));

    // The stick is still deflected but no new sample arrived: nothing resumes.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(jogs_after_last_stop(&h.sink), 0);
    assert_eq!(h.handle.snapshot().state, JogState::Idle);
    finish(h).await;
}

#[tokio::test]
async fn stop_overtakes_queued_samples() {
    let h = start(JogMode::Joystick).await;
    let js = VirtualJoystick::new("screen");
    let control = js.control();
    h.handle.add_input_driver(Box::new(js)).await.unwrap();

    for i in 0..32 {
        let x = if i % 2 == 0 { 1.0 } else { -1.0 };
        control.set_deflection(x, 0.5).unwrap();
    }
    h.handle.stop().await.unwrap();
    assert_eq!(h.handle.snapshot().state, JogState::Idle);

    // Let the forward task drain whatever was still queued.
    h.handle.list_input_drivers().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(jogs_after_last_stop(&h.sink), 0);
    assert_eq!(h.handle.snapshot().state, JogState::Idle);

    control.set_deflection(0.0, 1.0).unwrap();
    wait_until(&h.handle, |s| s.state == JogState::Jogging).await;
    finish(h).await;
}
