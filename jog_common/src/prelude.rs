//! Prelude module for common re-exports.
//!
//! Consumers can do `use jog_common::prelude::*;` and get the most
//! important types without listing individual paths.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, JogServiceConfig, JogTuning, LogLevel};

// ─── Geometry ───────────────────────────────────────────────────────
pub use crate::geometry::{Axis, AxisMask, Direction, Vec3, WorkEnvelope};

// ─── Input ──────────────────────────────────────────────────────────
pub use crate::driver::{DriverError, DriverInfo, InputDriver};
pub use crate::input::{Capabilities, InputEvent};

// ─── Machine ────────────────────────────────────────────────────────
pub use crate::machine::{AxisDeltas, MachineCommand, MachineSnapshot, MachineStatus};

// ─── Settings & State ───────────────────────────────────────────────
pub use crate::settings::{JogMode, JogSettings, ProbeSettings};
pub use crate::state::{JogSnapshot, JogState, JoystickState};
