//! Jog service: single-consumer processing loop.
//!
//! ```text
//! JogHandle (stop) ──────────► mpsc<ControlMessage> ──┐
//! driver A ─► forward task ─┐                          │
//! driver B ─► forward task ─┼─► mpsc<ServiceMessage> ──┼─► JogService::run ─► CommandSink
//! JogHandle (settings, ops) ┘                          │          │
//! watch<MachineSnapshot> ──────────────────────────────┘          └─► watch<JogSnapshot>
//! ```
//!
//! Everything that touches jog state goes through [`JogService::run`], so
//! input, machine updates, settings and registry changes are applied in
//! one order. Driver `initialize()` / `dispose()` are awaited inside the
//! loop; event processing itself is synchronous.
//!
//! Loop priority: stop requests, machine state, queued messages, then the
//! pacing tick that re-runs a held joystick sample.

use std::time::{Duration, Instant};

use jog_common::config::{ConfigError, JogServiceConfig};
use jog_common::consts::{EVENT_CHANNEL_CAPACITY, PACING_TICK_MS};
use jog_common::driver::{DriverInfo, InputDriver};
use jog_common::geometry::{Axis, AxisMask, Direction};
use jog_common::input::InputEvent;
use jog_common::machine::MachineSnapshot;
use jog_common::settings::{JogSettings, ProbeSettings};
use jog_common::state::{JogSnapshot, JogState};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::driver_registry::{DriverRegistry, RegistryError};
use crate::orchestrator::{InputOutcome, JogOrchestrator};
use crate::sink::CommandSink;

/// Errors returned by [`JogHandle`] requests that are not registry operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] ConfigError),

    #[error("Jog service closed")]
    Closed,
}

type Reply<T> = oneshot::Sender<Result<T, RegistryError>>;

/// Message consumed by the service loop.
pub enum ServiceMessage {
    /// Sample forwarded from a registered driver.
    Input(InputEvent),
    UpdateJogSettings(JogSettings),
    UpdateProbeSettings(ProbeSettings),
    DiscreteJog { axis: Axis, direction: Direction },
    ContinuousJogStart { axis: Axis, direction: Direction },
    SetWorkZero(AxisMask),
    Probe,
    Home,
    AddDriver {
        driver: Box<dyn InputDriver>,
        reply: Reply<()>,
    },
    RemoveDriver {
        device_id: String,
        reply: Reply<()>,
    },
    SetDriverEnabled {
        device_id: String,
        enabled: bool,
        reply: Reply<()>,
    },
    ListDrivers {
        reply: oneshot::Sender<Vec<DriverInfo>>,
    },
    Shutdown,
}

/// Stop requests. Served ahead of queued input and answered once the stop
/// has been applied.
pub enum ControlMessage {
    Stop { reply: oneshot::Sender<()> },
    ContinuousJogStop { reply: oneshot::Sender<()> },
}

/// The jog service loop. Build with [`JogService::new`], then spawn
/// [`JogService::run`].
pub struct JogService {
    orchestrator: JogOrchestrator,
    registry: DriverRegistry,
    rx: mpsc::Receiver<ServiceMessage>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    machine_rx: watch::Receiver<MachineSnapshot>,
    snapshot_tx: watch::Sender<JogSnapshot>,
    initialized: bool,
    /// Samples taken at or before this instant predate the last stop.
    stopped_at: Option<Instant>,
}

impl JogService {
    /// Create the service and its handle.
    ///
    /// `machine_rx` is the machine state source; `sink` receives every
    /// emitted command in emission order.
    pub fn new(
        config: &JogServiceConfig,
        sink: Box<dyn CommandSink>,
        machine_rx: watch::Receiver<MachineSnapshot>,
    ) -> (Self, JogHandle) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let orchestrator = JogOrchestrator::from_config(config, sink);
        let (snapshot_tx, snapshot_rx) = watch::channel(orchestrator.snapshot());

        let service = Self {
            orchestrator,
            registry: DriverRegistry::new(tx.clone()),
            rx,
            control_rx,
            machine_rx,
            snapshot_tx,
            initialized: false,
            stopped_at: None,
        };
        let handle = JogHandle {
            tx,
            control_tx,
            snapshot_rx,
        };
        (service, handle)
    }

    /// Run until [`JogHandle::shutdown`].
    ///
    /// Drivers are disposed before the final stop and snapshot.
    pub async fn run(mut self) {
        let initial = self.machine_rx.borrow_and_update().clone();
        self.orchestrator.handle_machine_snapshot(initial);
        self.initialized = true;
        self.publish();
        info!(state = ?self.orchestrator.state(), "Jog service started");

        let mut machine_open = true;
        let mut control_open = true;
        let mut pacing = interval(Duration::from_millis(PACING_TICK_MS));
        pacing.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // Stops first, then machine state: input is judged against the
            // newest status.
            let changed_state = tokio::select! {
                biased;

                control = self.control_rx.recv(), if control_open => match control {
                    Some(msg) => {
                        self.handle_control(msg);
                        false
                    }
                    None => {
                        control_open = false;
                        false
                    }
                },
                changed = self.machine_rx.changed(), if machine_open => {
                    let snapshot = match changed {
                        Ok(()) => self.machine_rx.borrow_and_update().clone(),
                        Err(_) => {
                            warn!("Machine state source closed, treating machine as offline");
                            machine_open = false;
                            MachineSnapshot::default()
                        }
                    };
                    self.orchestrator.handle_machine_snapshot(snapshot);
                    true
                }
                msg = self.rx.recv() => match msg {
                    Some(ServiceMessage::Shutdown) | None => break,
                    Some(msg) => {
                        self.handle(msg).await;
                        true
                    }
                },
                _ = pacing.tick(), if self.orchestrator.has_held_sample() => {
                    let outcome = self.orchestrator.reevaluate(Instant::now());
                    trace!(?outcome, "Held sample re-evaluated");
                    !matches!(outcome, None | Some(InputOutcome::Held | InputOutcome::Suppressed))
                }
            };
            if changed_state {
                self.publish();
            }
        }

        info!("Jog service shutting down");
        self.registry.shutdown().await;
        let moving = self.orchestrator.state() == JogState::Jogging;
        if moving || self.orchestrator.joystick().is_active {
            self.orchestrator.stop();
        }
        self.initialized = false;
        self.publish();
        info!("Jog service stopped");
    }

    async fn handle(&mut self, msg: ServiceMessage) {
        let now = Instant::now();
        match msg {
            ServiceMessage::Input(event) => {
                if !self.registry.accepts(&event.device_id) {
                    trace!(device = %event.device_id, "Input from disabled or inactive driver ignored");
                    return;
                }
                if self.stopped_at.is_some_and(|t| event.timestamp <= t) {
                    trace!(device = %event.device_id, "Input sampled before stop discarded");
                    return;
                }
                let outcome = self.orchestrator.handle_input(&event, now);
                trace!(device = %event.device_id, ?outcome, "Input processed");
            }
            ServiceMessage::UpdateJogSettings(settings) => {
                debug!(?settings, "Jog settings updated");
                self.orchestrator.update_jog_settings(settings);
            }
            ServiceMessage::UpdateProbeSettings(settings) => {
                debug!(?settings, "Probe settings updated");
                self.orchestrator.update_probe_settings(settings);
            }
            ServiceMessage::DiscreteJog { axis, direction } => {
                self.orchestrator.discrete_jog(axis, direction, now);
            }
            ServiceMessage::ContinuousJogStart { axis, direction } => {
                self.orchestrator.continuous_jog_start(axis, direction, now);
            }
            ServiceMessage::SetWorkZero(axes) => {
                self.orchestrator.set_work_zero(axes);
            }
            ServiceMessage::Probe => {
                self.orchestrator.probe();
            }
            ServiceMessage::Home => {
                self.orchestrator.home();
            }
            ServiceMessage::AddDriver { driver, reply } => {
                let result = self.registry.add(driver).await;
                if let Err(e) = &result {
                    warn!(error = %e, "Input driver not added");
                }
                let _ = reply.send(result);
            }
            ServiceMessage::RemoveDriver { device_id, reply } => {
                let result = self.registry.remove(&device_id).await;
                if !matches!(result, Err(RegistryError::UnknownDevice(_))) {
                    self.stop_joystick_motion();
                }
                let _ = reply.send(result);
            }
            ServiceMessage::SetDriverEnabled {
                device_id,
                enabled,
                reply,
            } => {
                let result = self.registry.set_enabled(&device_id, enabled);
                if result.is_ok() && !enabled {
                    self.stop_joystick_motion();
                }
                let _ = reply.send(result);
            }
            ServiceMessage::ListDrivers { reply } => {
                let _ = reply.send(self.registry.list());
            }
            ServiceMessage::Shutdown => {}
        }
    }

    /// Apply a stop, publish, then answer the caller.
    fn handle_control(&mut self, msg: ControlMessage) {
        let reply = match msg {
            ControlMessage::Stop { reply } => {
                self.orchestrator.stop();
                reply
            }
            ControlMessage::ContinuousJogStop { reply } => {
                self.orchestrator.continuous_jog_stop();
                reply
            }
        };
        self.stopped_at = Some(Instant::now());
        self.publish();
        let _ = reply.send(());
    }

    /// A driver that can no longer deliver its release sample must not
    /// leave a joystick jog running.
    fn stop_joystick_motion(&mut self) {
        if self.orchestrator.joystick().is_active {
            info!("Joystick source went away, stopping jog");
            self.orchestrator.stop();
        } else {
            self.orchestrator.discard_held_sample();
        }
    }

    fn publish(&self) {
        let mut snapshot = self.orchestrator.snapshot();
        snapshot.initialized = self.initialized;
        snapshot.drivers = self.registry.list();
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// Cloneable client of a running [`JogService`].
#[derive(Clone)]
pub struct JogHandle {
    tx: mpsc::Sender<ServiceMessage>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    snapshot_rx: watch::Receiver<JogSnapshot>,
}

impl JogHandle {
    // ─── Registration ───────────────────────────────────────────────

    /// Initialize and register a driver; returns once it is live.
    ///
    /// # Errors
    /// `RegistryError::Driver` if initialization fails, `DuplicateDevice`
    /// if the id is taken, `ServiceClosed` if the service has stopped.
    pub async fn add_input_driver(&self, driver: Box<dyn InputDriver>) -> Result<(), RegistryError> {
        self.request(|reply| ServiceMessage::AddDriver { driver, reply })
            .await
    }

    /// Cancel the driver's subscription and dispose it.
    ///
    /// # Errors
    /// `UnknownDevice`, `Driver` (dispose failed) or `ServiceClosed`.
    pub async fn remove_input_driver(&self, device_id: &str) -> Result<(), RegistryError> {
        let device_id = device_id.to_string();
        self.request(|reply| ServiceMessage::RemoveDriver { device_id, reply })
            .await
    }

    /// # Errors
    /// `UnknownDevice` or `ServiceClosed`.
    pub async fn set_input_driver_enabled(
        &self,
        device_id: &str,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let device_id = device_id.to_string();
        self.request(|reply| ServiceMessage::SetDriverEnabled {
            device_id,
            enabled,
            reply,
        })
        .await
    }

    /// # Errors
    /// `ServiceClosed` if the service has stopped.
    pub async fn list_input_drivers(&self) -> Result<Vec<DriverInfo>, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceMessage::ListDrivers { reply })
            .await
            .map_err(|_| RegistryError::ServiceClosed)?;
        rx.await.map_err(|_| RegistryError::ServiceClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> ServiceMessage,
    ) -> Result<T, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| RegistryError::ServiceClosed)?;
        rx.await.map_err(|_| RegistryError::ServiceClosed)?
    }

    // ─── Settings ───────────────────────────────────────────────────

    /// # Errors
    /// `InvalidSettings` if validation fails (nothing is sent), `Closed`
    /// if the service has stopped.
    pub async fn update_jog_settings(&self, settings: JogSettings) -> Result<(), ServiceError> {
        settings.validate()?;
        self.send(ServiceMessage::UpdateJogSettings(settings)).await
    }

    /// # Errors
    /// `InvalidSettings` if validation fails, `Closed` if the service has stopped.
    pub async fn update_probe_settings(&self, settings: ProbeSettings) -> Result<(), ServiceError> {
        settings.validate()?;
        self.send(ServiceMessage::UpdateProbeSettings(settings)).await
    }

    // ─── Operator requests ──────────────────────────────────────────

    /// Cancel all jog motion.
    ///
    /// Served ahead of queued input. On return `JogStop` has been emitted,
    /// the joystick and predicted position are cleared, and the published
    /// snapshot reflects it. Samples taken before the stop are discarded.
    ///
    /// # Errors
    /// `Closed` if the service has stopped.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        self.control(|reply| ControlMessage::Stop { reply }).await
    }

    pub async fn discrete_jog(&self, axis: Axis, direction: Direction) -> Result<(), ServiceError> {
        self.send(ServiceMessage::DiscreteJog { axis, direction }).await
    }

    pub async fn continuous_jog_start(
        &self,
        axis: Axis,
        direction: Direction,
    ) -> Result<(), ServiceError> {
        self.send(ServiceMessage::ContinuousJogStart { axis, direction })
            .await
    }

    /// Same guarantees as [`stop`](Self::stop).
    pub async fn continuous_jog_stop(&self) -> Result<(), ServiceError> {
        self.control(|reply| ControlMessage::ContinuousJogStop { reply })
            .await
    }

    pub async fn set_work_zero(&self, axes: AxisMask) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetWorkZero(axes)).await
    }

    pub async fn probe(&self) -> Result<(), ServiceError> {
        self.send(ServiceMessage::Probe).await
    }

    pub async fn home(&self) -> Result<(), ServiceError> {
        self.send(ServiceMessage::Home).await
    }

    /// Ask the service to dispose drivers and stop.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(ServiceMessage::Shutdown).await
    }

    async fn send(&self, msg: ServiceMessage) -> Result<(), ServiceError> {
        self.tx.send(msg).await.map_err(|_| ServiceError::Closed)
    }

    async fn control(
        &self,
        build: impl FnOnce(oneshot::Sender<()>) -> ControlMessage,
    ) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(build(reply))
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    // ─── Snapshot ───────────────────────────────────────────────────

    /// Latest published snapshot.
    pub fn snapshot(&self) -> JogSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<JogSnapshot> {
        self.snapshot_rx.clone()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
