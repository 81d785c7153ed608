//! Machine-facing types: status snapshots in, commands out.
//!
//! The jog core consumes [`MachineSnapshot`]s from the machine state source
//! and emits [`MachineCommand`]s into a command sink. Transport and framing
//! belong to the communication layer, which uses two entry points from
//! here: [`MachineStatus::from_grbl`] to read the state word of a status
//! report, and [`MachineCommand::to_grbl`] for the bytes to write to a
//! grblHAL controller. The jog core itself never calls either.

use serde::{Deserialize, Serialize};

use crate::consts::JOG_CANCEL_BYTE;
use crate::geometry::{Axis, AxisMask, Vec3, WorkEnvelope};

// ─── Status ─────────────────────────────────────────────────────────

/// Controller state as reported in grbl status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Idle,
    Run,
    Hold,
    Jog,
    Alarm,
    Door,
    Check,
    Home,
    Sleep,
    Tool,
    #[default]
    Unknown,
}

impl MachineStatus {
    /// Parse the state word of a status report (`Hold:0` → `Hold`).
    pub fn from_grbl(word: &str) -> Self {
        let state = word.split(':').next().unwrap_or_default();
        match state.to_ascii_lowercase().as_str() {
            "idle" => Self::Idle,
            "run" => Self::Run,
            "hold" => Self::Hold,
            "jog" => Self::Jog,
            "alarm" => Self::Alarm,
            "door" => Self::Door,
            "check" => Self::Check,
            "home" => Self::Home,
            "sleep" => Self::Sleep,
            "tool" => Self::Tool,
            _ => Self::Unknown,
        }
    }

    /// States in which jog commands are accepted.
    #[inline]
    pub const fn is_jog_eligible(self) -> bool {
        matches!(self, Self::Idle | Self::Jog | Self::Check)
    }
}

/// One update from the machine state source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub status: MachineStatus,
    /// Machine position (MPos), if the controller has reported one.
    pub machine_position: Option<Vec3>,
    /// Soft-limit envelope derived from travel settings, if known.
    pub work_envelope: Option<WorkEnvelope>,
    /// Free planner blocks from the last `Bf:` field.
    pub planner_blocks_available: u32,
    /// Largest free-block count seen since connect (planner size estimate).
    pub max_observed_buffer_blocks: u32,
    pub is_online: bool,
    pub controller_present: bool,
    pub firmware_detected: bool,
}

impl MachineSnapshot {
    /// Controller reachable and identified.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        self.controller_present && self.is_online && self.firmware_detected
    }

    /// Jog gate: connected and in a jog-eligible state.
    #[inline]
    pub const fn can_jog(&self) -> bool {
        self.is_connected() && self.status.is_jog_eligible()
    }

    /// Homing gate: connected and idle or alarmed.
    #[inline]
    pub const fn can_home(&self) -> bool {
        self.is_connected() && matches!(self.status, MachineStatus::Idle | MachineStatus::Alarm)
    }
}

// ─── Commands ───────────────────────────────────────────────────────

/// Relative motion per axis. Linear [mm], rotary [deg].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisDeltas {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl AxisDeltas {
    pub const fn from_linear(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
            a: 0.0,
            b: 0.0,
            c: 0.0,
        }
    }

    #[inline]
    pub const fn linear(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
            Axis::B => self.b,
            Axis::C => self.c,
        }
    }

    /// Copy with every axis below `min_move` set to zero.
    pub fn without_noise(&self, min_move: f64) -> Self {
        let f = |v: f64| if v.abs() < min_move { 0.0 } else { v };
        Self {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
            a: f(self.a),
            b: f(self.b),
            c: f(self.c),
        }
    }

    /// True if at least one axis moves by `min_move` or more.
    pub fn is_meaningful(&self, min_move: f64) -> bool {
        Axis::ALL.iter().any(|&a| self.get(a).abs() >= min_move)
    }
}

/// Command emitted by the jog core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MachineCommand {
    /// Relative jog move.
    Jog { delta: AxisDeltas, feed_rate: f64 },
    /// Cancel any active jog and flush queued jog motion.
    JogStop,
    /// Set the active work offset to zero on the given axes.
    SetWorkZero { axes: AxisMask },
    /// Straight probe toward -Z.
    Probe { distance: f64, feed_rate: f64 },
    /// Run the homing cycle.
    Home,
}

/// Controller-bound output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrblOutput {
    /// Line-buffered command (newline added by the transport).
    Line(String),
    /// Single realtime byte, bypasses the line buffer.
    Realtime(u8),
}

impl MachineCommand {
    /// Render the command for a grblHAL controller.
    pub fn to_grbl(&self) -> Vec<GrblOutput> {
        match self {
            Self::Jog { delta, feed_rate } => {
                let mut line = String::from("$J=G91 G21");
                for axis in Axis::ALL {
                    let v = delta.get(axis);
                    if v != 0.0 {
                        line.push_str(&format!(" {}{:.3}", axis.letter(), v));
                    }
                }
                line.push_str(&format!(" F{:.0}", feed_rate));
                vec![GrblOutput::Line(line)]
            }
            Self::JogStop => vec![GrblOutput::Realtime(JOG_CANCEL_BYTE)],
            Self::SetWorkZero { axes } => {
                let mut line = String::from("G10 L20 P0");
                for axis in axes.axes() {
                    line.push_str(&format!(" {}0", axis.letter()));
                }
                vec![GrblOutput::Line(line)]
            }
            Self::Probe {
                distance,
                feed_rate,
            } => vec![
                GrblOutput::Line(format!(
                    "G91 G38.2 Z-{:.3} F{:.0}",
                    distance.abs(),
                    feed_rate
                )),
                GrblOutput::Line("G90".to_string()),
            ],
            Self::Home => vec![GrblOutput::Line("$H".to_string())],
        }
    }

    /// Short name for log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Jog { .. } => "jog",
            Self::JogStop => "jog_stop",
            Self::SetWorkZero { .. } => "set_work_zero",
            Self::Probe { .. } => "probe",
            Self::Home => "home",
        }
    }
}
