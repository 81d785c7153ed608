//! Jog state types published to UI collaborators.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::driver::DriverInfo;
use crate::settings::{JogSettings, ProbeSettings};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JogState {
    /// No jog outstanding.
    #[default]
    Idle,
    /// At least one accepted jog command outstanding.
    Jogging,
    /// Machine not ready; input is dropped.
    Blocked,
}

/// Last processed proportional sample.
///
/// Used to detect significant change between sends and to decide when an
/// inactive sample has to stop motion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JoystickState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Rotary deflection.
    #[serde(default)]
    pub a: f64,
    #[serde(default)]
    pub b: f64,
    #[serde(default)]
    pub c: f64,
    pub magnitude: f64,
    pub is_active: bool,
    #[serde(skip)]
    pub last_input_time: Option<Instant>,
    #[serde(skip)]
    pub last_command_time: Option<Instant>,
}

impl JoystickState {
    /// Deflection on all six axes, `[x, y, z, a, b, c]`.
    pub const fn axes(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.a, self.b, self.c]
    }

    /// Released stick, nothing sent.
    pub const fn inactive() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            magnitude: 0.0,
            is_active: false,
            last_input_time: None,
            last_command_time: None,
        }
    }
}

/// Read-only view of the jog service for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JogSnapshot {
    pub state: JogState,
    pub jog_settings: JogSettings,
    pub probe_settings: ProbeSettings,
    pub joystick: JoystickState,
    /// True once the service loop is running.
    pub initialized: bool,
    pub drivers: Vec<DriverInfo>,
}
