//! System-wide constants for the jog workspace.
//!
//! Single source of truth for dead zones, safety margins, pacing limits and
//! prediction windows. Configuration defaults are taken from here.

use std::time::Duration;

use static_assertions::const_assert;

/// Input magnitude below which analog input is treated as no input.
pub const DEAD_ZONE: f64 = 0.05;

/// Distance kept between the tool and every work-envelope face [mm].
pub const SAFETY_BUFFER_MM: f64 = 1.0;

/// How long an optimistic position prediction stays authoritative [ms].
pub const PREDICTION_VALIDITY_MS: u64 = 2000;

/// [`PREDICTION_VALIDITY_MS`] as a `Duration`.
pub const PREDICTION_VALIDITY: Duration = Duration::from_millis(PREDICTION_VALIDITY_MS);

/// Shortest interval between proportional jog commands [ms].
pub const MIN_COMMAND_INTERVAL_MS: u64 = 20;

/// Longest interval between proportional jog commands [ms].
pub const MAX_COMMAND_INTERVAL_MS: u64 = 100;

/// Interval used until the controller has reported planner telemetry [ms].
pub const DEFAULT_COMMAND_INTERVAL_MS: u64 = 25;

/// Angle between consecutive samples that forces an early send [deg].
pub const DIRECTION_CHANGE_THRESHOLD_DEG: f64 = 15.0;

/// Magnitude delta (fraction of full scale) that forces an early send.
pub const MAGNITUDE_CHANGE_THRESHOLD: f64 = 0.1;

/// Per-axis distance below which a command carries no movement [mm].
pub const MIN_MOVE_MM: f64 = 0.001;

/// Travel requested by a continuous jog when no envelope is known [mm].
pub const CONTINUOUS_JOG_DISTANCE_MM: f64 = 1000.0;

/// Period at which a held joystick sample is re-evaluated [ms].
pub const PACING_TICK_MS: u64 = 5;

/// Capacity of the orchestrator's inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of each input driver's event channel.
pub const DRIVER_CHANNEL_CAPACITY: usize = 64;

/// grbl realtime command that cancels an active jog.
pub const JOG_CANCEL_BYTE: u8 = 0x85;

const_assert!(MIN_COMMAND_INTERVAL_MS < MAX_COMMAND_INTERVAL_MS);
const_assert!(DEFAULT_COMMAND_INTERVAL_MS >= MIN_COMMAND_INTERVAL_MS);
const_assert!(DEFAULT_COMMAND_INTERVAL_MS <= MAX_COMMAND_INTERVAL_MS);
const_assert!(PREDICTION_VALIDITY_MS > MAX_COMMAND_INTERVAL_MS);
const_assert!(PACING_TICK_MS > 0 && PACING_TICK_MS < MIN_COMMAND_INTERVAL_MS);
