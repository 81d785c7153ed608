//! Simulated grblHAL-class machine.
//!
//! Accepts [`MachineCommand`]s the way a controller does (queue jog moves
//! into a fixed-size planner, refuse targets outside travel, flush on jog
//! cancel), integrates queued motion at the commanded feed and reports
//! [`MachineSnapshot`]s at a fixed period. Every command is rendered to its
//! grbl wire form first so the run reports what a serial link would carry.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use jog_common::config::ConfigError;
use jog_common::geometry::{Axis, AxisMask, Vec3, WorkEnvelope};
use jog_common::machine::{GrblOutput, MachineCommand, MachineSnapshot, MachineStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

/// Simulated machine parameters (`[machine]` in the sim config).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimMachineConfig {
    /// Travel per linear axis (`$130`-`$132`) [mm].
    #[serde(default = "default_max_travel")]
    pub max_travel: Vec3,
    /// Machine position at power-up [mm].
    #[serde(default = "default_start_position")]
    pub start_position: Vec3,
    /// Planner blocks (`Bf:` at rest).
    #[serde(default = "default_planner_blocks")]
    pub planner_blocks: u32,
    /// Status report period [ms].
    #[serde(default = "default_report_period")]
    pub report_period_ms: u64,
}

fn default_max_travel() -> Vec3 {
    Vec3::new(300.0, 300.0, 100.0)
}
fn default_start_position() -> Vec3 {
    Vec3::new(-20.0, -150.0, -50.0)
}
fn default_planner_blocks() -> u32 {
    35
}
fn default_report_period() -> u64 {
    40
}

impl Default for SimMachineConfig {
    fn default() -> Self {
        Self {
            max_travel: default_max_travel(),
            start_position: default_start_position(),
            planner_blocks: default_planner_blocks(),
            report_period_ms: default_report_period(),
        }
    }
}

impl SimMachineConfig {
    pub fn envelope(&self) -> WorkEnvelope {
        WorkEnvelope::from_max_travel(self.max_travel, AxisMask::empty())
    }

    pub const fn report_period(&self) -> Duration {
        Duration::from_millis(self.report_period_ms)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the travel is degenerate,
    /// the start position lies outside it, or a count is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let envelope = self.envelope();
        if !envelope.is_valid() {
            return Err(ConfigError::ValidationError(format!(
                "max_travel {:?} must be finite and non-zero on X/Y/Z",
                self.max_travel
            )));
        }
        if !envelope.contains(self.start_position) {
            return Err(ConfigError::ValidationError(format!(
                "start_position {:?} outside travel [{:?}, {:?}]",
                self.start_position, envelope.min, envelope.max
            )));
        }
        if self.planner_blocks == 0 {
            return Err(ConfigError::ValidationError(
                "planner_blocks must be > 0".to_string(),
            ));
        }
        if self.report_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "report_period_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One queued jog move.
#[derive(Debug, Clone, Copy)]
struct Segment {
    remaining: Vec3,
    /// [mm/s]
    speed: f64,
}

/// Counters reported at exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub jogs_accepted: u32,
    pub jogs_rejected: u32,
    pub jog_cancels: u32,
    /// Command lines as written to the controller.
    pub lines_sent: u32,
    /// Realtime bytes as written to the controller.
    pub realtime_bytes: u32,
}

/// Controller model: planner queue, position and status.
#[derive(Debug)]
pub struct SimMachine {
    envelope: WorkEnvelope,
    position: Vec3,
    work_offset: Vec3,
    status: MachineStatus,
    queue: VecDeque<Segment>,
    planner_blocks: u32,
    stats: SimStats,
}

impl SimMachine {
    pub fn new(config: &SimMachineConfig) -> Self {
        Self {
            envelope: config.envelope(),
            position: config.start_position,
            work_offset: Vec3::ZERO,
            status: MachineStatus::Idle,
            queue: VecDeque::with_capacity(config.planner_blocks as usize),
            planner_blocks: config.planner_blocks,
            stats: SimStats::default(),
        }
    }

    pub const fn position(&self) -> Vec3 {
        self.position
    }

    pub const fn status(&self) -> MachineStatus {
        self.status
    }

    pub const fn work_offset(&self) -> Vec3 {
        self.work_offset
    }

    pub const fn stats(&self) -> SimStats {
        self.stats
    }

    /// Position the planner will reach once the queue drains.
    fn queued_end(&self) -> Vec3 {
        self.queue
            .iter()
            .fold(self.position, |p, seg| p + seg.remaining)
    }

    fn free_blocks(&self) -> u32 {
        self.planner_blocks.saturating_sub(self.queue.len() as u32)
    }

    /// Count the wire traffic of one command.
    fn receive_wire(&mut self, command: &MachineCommand) {
        for output in command.to_grbl() {
            match output {
                GrblOutput::Line(line) => {
                    trace!(%line, "Line received");
                    self.stats.lines_sent += 1;
                }
                GrblOutput::Realtime(byte) => {
                    trace!(byte = format_args!("{byte:#04x}"), "Realtime byte received");
                    self.stats.realtime_bytes += 1;
                }
            }
        }
    }

    /// Accept one command as the controller would.
    pub fn apply(&mut self, command: MachineCommand) {
        self.receive_wire(&command);
        match command {
            MachineCommand::Jog { delta, feed_rate } => {
                let reject = |reason: &str, stats: &mut SimStats| {
                    warn!("Jog rejected: {}", reason);
                    stats.jogs_rejected += 1;
                };
                if !matches!(self.status, MachineStatus::Idle | MachineStatus::Jog) {
                    return reject("machine busy", &mut self.stats);
                }
                if !(feed_rate.is_finite() && feed_rate > 0.0) {
                    return reject("invalid feed rate", &mut self.stats);
                }
                if self.free_blocks() == 0 {
                    return reject("planner full", &mut self.stats);
                }
                let target = self.queued_end() + delta.linear();
                if !self.envelope.contains(target) {
                    // grbl error:15, travel exceeded
                    return reject("target exceeds machine travel", &mut self.stats);
                }
                trace!(?target, feed_rate, "Jog queued");
                self.queue.push_back(Segment {
                    remaining: delta.linear(),
                    speed: feed_rate / 60.0,
                });
                self.status = MachineStatus::Jog;
                self.stats.jogs_accepted += 1;
            }
            MachineCommand::JogStop => {
                self.stats.jog_cancels += 1;
                if !self.queue.is_empty() {
                    debug!(flushed = self.queue.len(), "Jog cancel");
                }
                self.queue.clear();
                if self.status == MachineStatus::Jog {
                    self.status = MachineStatus::Idle;
                }
            }
            MachineCommand::SetWorkZero { axes } => {
                for axis in axes.axes() {
                    match axis {
                        Axis::X => self.work_offset.x = self.position.x,
                        Axis::Y => self.work_offset.y = self.position.y,
                        Axis::Z => self.work_offset.z = self.position.z,
                        Axis::A | Axis::B | Axis::C => {}
                    }
                }
                info!(offset = ?self.work_offset, "Work zero set");
            }
            MachineCommand::Probe { distance, feed_rate } => {
                if self.status != MachineStatus::Idle {
                    warn!("Probe ignored: machine not idle");
                    return;
                }
                // No workpiece: the probe runs its full distance or to the floor.
                self.position.z = (self.position.z - distance).max(self.envelope.min.z);
                info!(z = self.position.z, feed_rate, "Probe finished without contact");
            }
            MachineCommand::Home => {
                if !matches!(self.status, MachineStatus::Idle | MachineStatus::Alarm) {
                    warn!("Homing ignored: machine busy");
                    return;
                }
                self.queue.clear();
                self.position = Vec3::ZERO;
                self.status = MachineStatus::Idle;
                info!("Homing cycle complete");
            }
        }
    }

    /// Advance queued motion by `dt`.
    pub fn step(&mut self, dt: Duration) {
        let mut budget = dt.as_secs_f64();
        while budget > 0.0 {
            let Some(seg) = self.queue.front_mut() else {
                break;
            };
            let dist = seg.remaining.magnitude();
            let needed = dist / seg.speed;
            if needed <= budget {
                self.position += seg.remaining;
                budget -= needed;
                self.queue.pop_front();
            } else {
                let part = seg.remaining * (seg.speed * budget / dist);
                self.position += part;
                seg.remaining = seg.remaining - part;
                budget = 0.0;
            }
        }
        if self.queue.is_empty() && self.status == MachineStatus::Jog {
            self.status = MachineStatus::Idle;
        }
    }

    /// Status report as seen by the jog service.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            status: self.status,
            machine_position: Some(self.position),
            work_envelope: Some(self.envelope),
            planner_blocks_available: self.free_blocks(),
            max_observed_buffer_blocks: self.planner_blocks,
            is_online: true,
            controller_present: true,
            firmware_detected: true,
        }
    }
}

/// Drive `machine` until the command channel closes.
///
/// Commands are applied as they arrive; motion advances and a report is
/// published every `period`.
pub async fn run(
    mut machine: SimMachine,
    mut commands: mpsc::UnboundedReceiver<MachineCommand>,
    state_tx: watch::Sender<MachineSnapshot>,
    period: Duration,
) -> SimMachine {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => machine.apply(command),
                None => break,
            },
            _ = tick.tick() => {
                let now = Instant::now();
                machine.step(now - last);
                last = now;
                state_tx.send_replace(machine.snapshot());
            }
        }
    }

    info!(stats = ?machine.stats(), position = ?machine.position(), "Simulated machine stopped");
    machine
}

// ─── Tests ──────────────────────────────────────────────────────────
