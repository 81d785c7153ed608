//! Jog orchestrator.
//!
//! Synchronous owner of all jog state. The service loop feeds it input
//! samples, machine snapshots, settings and operator requests, one at a
//! time, together with the current `Instant`.
//!
//! ## Proportional pipeline (per joystick sample)
//!
//! 1. Gate: mode is Joystick and the machine can jog.
//! 2. Position: fresh prediction, else actual position (new baseline).
//! 3. Interval from planner telemetry.
//! 4. Controller: dead zone, clamp, soft limit, feed scaling.
//! 5. Inactive result → stop if anything is outstanding.
//! 6. Pacer: send on first sample, elapsed interval, or significant change.
//! 7. Deltas = output · base_distance, noise floor applied; net-zero is
//!    suppressed.
//! 8. Sink accepts → predictor advances, state → Jogging.
//!
//! The latest active sample is kept. The service re-runs it through
//! [`JogOrchestrator::reevaluate`] on its pacing tick, so a stick held
//! still keeps streaming without new driver events.

use std::sync::Arc;
use std::time::Instant;

use jog_common::config::{JogServiceConfig, JogTuning};
use jog_common::geometry::{Axis, AxisMask, Direction, Vec3, WorkEnvelope};
use jog_common::input::InputEvent;
use jog_common::machine::{AxisDeltas, MachineCommand, MachineSnapshot, MachineStatus};
use jog_common::settings::{JogMode, JogSettings, ProbeSettings};
use jog_common::state::{JogSnapshot, JogState, JoystickState};
use tracing::{debug, info, trace, warn};

use super::machine::{JogEvent, JogStateMachine, TransitionResult};
use crate::pacer::CommandPacer;
use crate::predictor::PositionPredictor;
use crate::proportional::{JogInput, ProportionalJogController};
use crate::sink::CommandSink;
use crate::soft_limit::{filter_movement_with_buffer, remaining_travel};

/// What happened to one input sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Jog command emitted.
    Sent,
    /// Active sample held back by the pacer.
    Held,
    /// Inactive sample; `JogStop` emitted.
    Stopped,
    /// Inactive sample with nothing outstanding.
    Idle,
    /// Nets to zero after the soft limit and noise floor.
    Suppressed,
    /// Dropped: wrong mode, machine not ready or sink failure.
    Dropped,
}

/// Jog state machine plus the numeric pipeline around it.
pub struct JogOrchestrator {
    tuning: JogTuning,
    controller: ProportionalJogController,
    pacer: CommandPacer,
    predictor: PositionPredictor,
    machine: JogStateMachine,
    jog_settings: JogSettings,
    probe_settings: ProbeSettings,
    joystick: JoystickState,
    /// Discrete or continuous jog outstanding.
    axis_jog_active: bool,
    /// Latest active sample, re-run by [`reevaluate`](Self::reevaluate)
    /// while the stick is held without new events.
    held_sample: Option<InputEvent>,
    envelope: Option<Arc<WorkEnvelope>>,
    /// Last rejected envelope, so the warning fires once per change.
    rejected_envelope: Option<WorkEnvelope>,
    last_snapshot: MachineSnapshot,
    sink: Box<dyn CommandSink>,
}

impl JogOrchestrator {
    pub fn new(tuning: JogTuning, sink: Box<dyn CommandSink>) -> Self {
        Self {
            controller: ProportionalJogController::new(&tuning),
            pacer: CommandPacer::new(&tuning),
            predictor: PositionPredictor::new(tuning.prediction_validity()),
            machine: JogStateMachine::new(),
            jog_settings: JogSettings::default(),
            probe_settings: ProbeSettings::default(),
            joystick: JoystickState::inactive(),
            axis_jog_active: false,
            held_sample: None,
            envelope: None,
            rejected_envelope: None,
            last_snapshot: MachineSnapshot::default(),
            sink,
            tuning,
        }
    }

    /// Tuning and startup settings from the service configuration.
    pub fn from_config(config: &JogServiceConfig, sink: Box<dyn CommandSink>) -> Self {
        let mut orch = Self::new(config.tuning, sink);
        orch.jog_settings = config.defaults.jog;
        orch.probe_settings = config.defaults.probe;
        orch
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub const fn state(&self) -> JogState {
        self.machine.state()
    }

    #[inline]
    pub const fn jog_settings(&self) -> &JogSettings {
        &self.jog_settings
    }

    #[inline]
    pub const fn probe_settings(&self) -> &ProbeSettings {
        &self.probe_settings
    }

    #[inline]
    pub const fn joystick(&self) -> &JoystickState {
        &self.joystick
    }

    #[inline]
    pub const fn predictor(&self) -> &PositionPredictor {
        &self.predictor
    }

    #[inline]
    pub const fn machine_snapshot(&self) -> &MachineSnapshot {
        &self.last_snapshot
    }

    /// Envelope in effect (validated), if any.
    pub fn work_envelope(&self) -> Option<Arc<WorkEnvelope>> {
        self.envelope.clone()
    }

    /// Current view without service-level fields (`initialized`, `drivers`).
    pub fn snapshot(&self) -> JogSnapshot {
        JogSnapshot {
            state: self.state(),
            jog_settings: self.jog_settings,
            probe_settings: self.probe_settings,
            joystick: self.joystick,
            initialized: false,
            drivers: Vec::new(),
        }
    }

    // ─── Joystick input ─────────────────────────────────────────────

    /// Process one accepted driver sample.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> InputOutcome {
        self.held_sample = None;
        if self.jog_settings.mode != JogMode::Joystick {
            debug!(device = %event.device_id, mode = ?self.jog_settings.mode, "Input dropped: not in joystick mode");
            return InputOutcome::Dropped;
        }
        if !self.last_snapshot.can_jog() {
            debug!(device = %event.device_id, status = ?self.last_snapshot.status, "Input dropped: machine not ready");
            if self.machine.is_jogging() {
                self.halt(JogEvent::Stop);
            }
            return InputOutcome::Dropped;
        }

        let position = self
            .predictor
            .position_for_filtering(self.last_snapshot.machine_position, now);
        let interval_ms = self.pacer.calculate_command_interval(
            self.last_snapshot.planner_blocks_available,
            self.last_snapshot.max_observed_buffer_blocks,
        );

        let input = JogInput {
            x: event.x,
            y: event.y,
            z: event.z,
            a: event.a,
            b: event.b,
            c: event.c,
            selected_feed_rate: self.jog_settings.selected_feed_rate,
            target_interval_ms: interval_ms,
            current_position: position,
            work_envelope: self.envelope.as_deref(),
        };
        let output = self.controller.process(&input);
        self.joystick.last_input_time = Some(now);

        if !output.is_active {
            if self.joystick.is_active || self.machine.is_jogging() {
                self.halt(JogEvent::InputInactive);
                return InputOutcome::Stopped;
            }
            return InputOutcome::Idle;
        }
        self.held_sample = Some(event.clone());

        let direction_changed = self
            .controller
            .has_significant_direction_change_6d(output.axes(), self.joystick.axes());
        let magnitude_changed = self
            .controller
            .has_significant_magnitude_delta(output.magnitude, self.joystick.magnitude);

        let Some(reason) = self.pacer.decide(
            self.joystick.last_command_time,
            interval_ms,
            now,
            direction_changed,
            magnitude_changed,
        ) else {
            trace!(magnitude = output.magnitude, "Sample held by pacer");
            return InputOutcome::Held;
        };

        let base = output.base_distance;
        let delta = AxisDeltas {
            x: output.x * base,
            y: output.y * base,
            z: output.z * base,
            a: output.a * base,
            b: output.b * base,
            c: output.c * base,
        }
        .without_noise(self.tuning.min_move_mm);

        if !delta.is_meaningful(self.tuning.min_move_mm) || output.scaled_feed_rate <= 0.0 {
            debug!(?reason, "Jog suppressed: nets to zero");
            return InputOutcome::Suppressed;
        }

        trace!(
            ?reason,
            interval_ms,
            x = delta.x,
            y = delta.y,
            z = delta.z,
            feed = output.scaled_feed_rate,
            "Jog sample"
        );

        let command = MachineCommand::Jog {
            delta,
            feed_rate: output.scaled_feed_rate,
        };
        if !self.emit(command) {
            self.held_sample = None;
            return InputOutcome::Dropped;
        }

        self.predictor.update_after_command(delta.linear(), now);
        self.joystick = JoystickState {
            x: output.x,
            y: output.y,
            z: output.z,
            a: output.a,
            b: output.b,
            c: output.c,
            magnitude: output.magnitude,
            is_active: true,
            last_input_time: Some(now),
            last_command_time: Some(now),
        };
        self.apply(JogEvent::InputAccepted);
        InputOutcome::Sent
    }

    /// Re-run the held sample so a steady stick keeps streaming once the
    /// interval elapses. `None` if no active sample is held.
    pub fn reevaluate(&mut self, now: Instant) -> Option<InputOutcome> {
        let event = self.held_sample.take()?;
        Some(self.handle_input(&event, now))
    }

    #[inline]
    pub const fn has_held_sample(&self) -> bool {
        self.held_sample.is_some()
    }

    /// Forget the held sample, e.g. when its driver goes away.
    pub fn discard_held_sample(&mut self) {
        self.held_sample = None;
    }

    // ─── Machine state ──────────────────────────────────────────────

    /// Apply a machine state update.
    pub fn handle_machine_snapshot(&mut self, snapshot: MachineSnapshot) {
        self.update_envelope(snapshot.work_envelope);

        let previous = self.last_snapshot.status;
        if previous == MachineStatus::Jog && snapshot.status != MachineStatus::Jog {
            trace!(to = ?snapshot.status, "Status left Jog, prediction reset");
            self.predictor.reset();
        }
        self.last_snapshot = snapshot;

        if !self.last_snapshot.can_jog() {
            if self.machine.is_jogging() {
                self.halt(JogEvent::Stop);
            }
            self.apply(JogEvent::MachineNotReady);
            return;
        }
        self.apply(JogEvent::MachineReady);

        let completed = previous == MachineStatus::Jog
            && self.last_snapshot.status == MachineStatus::Idle
            && self.machine.is_jogging()
            && self.axis_jog_active
            && !self.joystick.is_active;
        if completed {
            self.axis_jog_active = false;
            self.apply(JogEvent::JogCompleted);
        }
    }

    fn update_envelope(&mut self, reported: Option<WorkEnvelope>) {
        match reported {
            Some(env) if env.is_valid() => {
                self.rejected_envelope = None;
                if self.envelope.as_deref() != Some(&env) {
                    info!(min = ?env.min, max = ?env.max, "Work envelope updated");
                    self.envelope = Some(Arc::new(env));
                }
            }
            Some(env) => {
                if self.rejected_envelope != Some(env) {
                    warn!(min = ?env.min, max = ?env.max, "Invalid work envelope, soft limits disabled");
                    self.rejected_envelope = Some(env);
                }
                self.envelope = None;
            }
            None => {
                self.rejected_envelope = None;
                if self.envelope.take().is_some() {
                    warn!("Work envelope no longer reported, soft limits disabled");
                }
            }
        }
    }

    // ─── Settings ───────────────────────────────────────────────────

    /// Replace jog settings. Leaving Joystick mode stops any joystick jog.
    pub fn update_jog_settings(&mut self, settings: JogSettings) {
        let previous = self.jog_settings.mode;
        self.jog_settings = settings;
        if previous == settings.mode {
            return;
        }
        info!(from = ?previous, to = ?settings.mode, "Jog mode changed");
        if previous == JogMode::Joystick && (self.joystick.is_active || self.machine.is_jogging()) {
            self.halt(JogEvent::ModeChangeAway);
        } else {
            self.joystick = JoystickState::inactive();
            self.held_sample = None;
        }
    }

    pub fn update_probe_settings(&mut self, settings: ProbeSettings) {
        self.probe_settings = settings;
    }

    // ─── Operator requests ──────────────────────────────────────────

    /// Explicit stop: always emits `JogStop`.
    pub fn stop(&mut self) {
        self.halt(JogEvent::Stop);
    }

    /// One `selected_distance` step along `axis`.
    ///
    /// Returns true if a jog command was emitted.
    pub fn discrete_jog(&mut self, axis: Axis, direction: Direction, now: Instant) -> bool {
        let distance = self.jog_settings.selected_distance;
        self.axis_jog(axis, direction.sign() * distance, now)
    }

    /// Jog toward the envelope boundary (or a fixed distance without one).
    pub fn continuous_jog_start(&mut self, axis: Axis, direction: Direction, now: Instant) -> bool {
        let position = self
            .predictor
            .position_for_filtering(self.last_snapshot.machine_position, now);
        let distance = position
            .and_then(|pos| {
                remaining_travel(
                    pos,
                    self.envelope.as_deref(),
                    axis,
                    direction,
                    self.tuning.safety_buffer_mm,
                )
            })
            .unwrap_or(self.tuning.continuous_jog_distance_mm);
        self.axis_jog(axis, direction.sign() * distance, now)
    }

    pub fn continuous_jog_stop(&mut self) {
        self.halt(JogEvent::Stop);
    }

    fn axis_jog(&mut self, axis: Axis, distance: f64, now: Instant) -> bool {
        if !self.last_snapshot.can_jog() {
            debug!(?axis, status = ?self.last_snapshot.status, "Axis jog dropped: machine not ready");
            return false;
        }

        let mut delta = AxisDeltas::default();
        if axis.is_linear() {
            let requested = Vec3::along(axis, distance);
            let position = self
                .predictor
                .position_for_filtering(self.last_snapshot.machine_position, now);
            let filtered = match position {
                Some(pos) => filter_movement_with_buffer(
                    requested,
                    pos,
                    self.envelope.as_deref(),
                    self.tuning.safety_buffer_mm,
                ),
                None => requested,
            };
            delta = AxisDeltas::from_linear(filtered);
        } else {
            match axis {
                Axis::A => delta.a = distance,
                Axis::B => delta.b = distance,
                _ => delta.c = distance,
            }
        }

        let delta = delta.without_noise(self.tuning.min_move_mm);
        if !delta.is_meaningful(self.tuning.min_move_mm) {
            debug!(?axis, "Axis jog suppressed: at soft limit");
            return false;
        }

        let command = MachineCommand::Jog {
            delta,
            feed_rate: self.jog_settings.selected_feed_rate,
        };
        if !self.emit(command) {
            return false;
        }
        self.predictor.update_after_command(delta.linear(), now);
        self.axis_jog_active = true;
        self.apply(JogEvent::InputAccepted);
        true
    }

    /// Zero the work offset on `axes`.
    pub fn set_work_zero(&mut self, axes: AxisMask) -> bool {
        if !self.last_snapshot.can_jog() {
            debug!(?axes, "Work zero dropped: machine not ready");
            return false;
        }
        self.emit(MachineCommand::SetWorkZero { axes })
    }

    /// Probe toward -Z with the current probe settings.
    pub fn probe(&mut self) -> bool {
        if !self.last_snapshot.can_jog() {
            debug!("Probe dropped: machine not ready");
            return false;
        }
        self.emit(MachineCommand::Probe {
            distance: self.probe_settings.distance,
            feed_rate: self.probe_settings.feed_rate,
        })
    }

    /// Start the homing cycle. Allowed from Idle and Alarm.
    pub fn home(&mut self) -> bool {
        if !self.last_snapshot.can_home() {
            debug!(status = ?self.last_snapshot.status, "Homing dropped: machine not ready");
            return false;
        }
        self.predictor.reset();
        self.emit(MachineCommand::Home)
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Emit `JogStop` and clear everything that describes outstanding motion.
    fn halt(&mut self, event: JogEvent) {
        self.emit(MachineCommand::JogStop);
        self.predictor.reset();
        self.joystick = JoystickState::inactive();
        self.held_sample = None;
        self.axis_jog_active = false;
        self.apply(event);
    }

    fn emit(&mut self, command: MachineCommand) -> bool {
        let kind = command.kind();
        match self.sink.send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(command = kind, error = %e, "Command sink failed");
                false
            }
        }
    }

    fn apply(&mut self, event: JogEvent) {
        let before = self.machine.state();
        match self.machine.handle_event(event) {
            TransitionResult::Ok(after) if after != before => {
                info!(from = ?before, to = ?after, ?event, "Jog state transition");
            }
            TransitionResult::Ok(_) => {}
            TransitionResult::Rejected(reason) => {
                debug!(?event, reason, "Jog transition rejected");
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
