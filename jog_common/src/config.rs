//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for the jog service and its host binaries.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jog_common::config::{ConfigLoader, ConfigError, JogServiceConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = JogServiceConfig::load(Path::new("jog.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    CONTINUOUS_JOG_DISTANCE_MM, DEAD_ZONE, DEFAULT_COMMAND_INTERVAL_MS,
    DIRECTION_CHANGE_THRESHOLD_DEG, MAGNITUDE_CHANGE_THRESHOLD, MAX_COMMAND_INTERVAL_MS,
    MIN_COMMAND_INTERVAL_MS, MIN_MOVE_MM, PREDICTION_VALIDITY_MS, SAFETY_BUFFER_MM,
};
use crate::settings::{JogSettings, ProbeSettings};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "jog-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Jog Tuning ─────────────────────────────────────────────────────

/// Numeric tuning of the jog pipeline.
///
/// Every field defaults to the matching constant in [`crate::consts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JogTuning {
    /// Input magnitude treated as no input.
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,
    /// Distance kept from every envelope face [mm].
    #[serde(default = "default_safety_buffer")]
    pub safety_buffer_mm: f64,
    /// Lifetime of an optimistic position prediction [ms].
    #[serde(default = "default_prediction_validity")]
    pub prediction_validity_ms: u64,
    /// Command interval floor [ms].
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    /// Command interval ceiling [ms].
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    /// Interval without planner telemetry [ms].
    #[serde(default = "default_interval")]
    pub default_interval_ms: u64,
    /// Direction change forcing an early send [deg].
    #[serde(default = "default_direction_threshold")]
    pub direction_change_threshold_deg: f64,
    /// Magnitude change forcing an early send (fraction of full scale).
    #[serde(default = "default_magnitude_threshold")]
    pub magnitude_change_threshold: f64,
    /// Per-axis distance treated as no movement [mm].
    #[serde(default = "default_min_move")]
    pub min_move_mm: f64,
    /// Continuous jog travel when no envelope is known [mm].
    #[serde(default = "default_continuous_distance")]
    pub continuous_jog_distance_mm: f64,
}

fn default_dead_zone() -> f64 {
    DEAD_ZONE
}
fn default_safety_buffer() -> f64 {
    SAFETY_BUFFER_MM
}
fn default_prediction_validity() -> u64 {
    PREDICTION_VALIDITY_MS
}
fn default_min_interval() -> u64 {
    MIN_COMMAND_INTERVAL_MS
}
fn default_max_interval() -> u64 {
    MAX_COMMAND_INTERVAL_MS
}
fn default_interval() -> u64 {
    DEFAULT_COMMAND_INTERVAL_MS
}
fn default_direction_threshold() -> f64 {
    DIRECTION_CHANGE_THRESHOLD_DEG
}
fn default_magnitude_threshold() -> f64 {
    MAGNITUDE_CHANGE_THRESHOLD
}
fn default_min_move() -> f64 {
    MIN_MOVE_MM
}
fn default_continuous_distance() -> f64 {
    CONTINUOUS_JOG_DISTANCE_MM
}

impl Default for JogTuning {
    fn default() -> Self {
        Self {
            dead_zone: DEAD_ZONE,
            safety_buffer_mm: SAFETY_BUFFER_MM,
            prediction_validity_ms: PREDICTION_VALIDITY_MS,
            min_interval_ms: MIN_COMMAND_INTERVAL_MS,
            max_interval_ms: MAX_COMMAND_INTERVAL_MS,
            default_interval_ms: DEFAULT_COMMAND_INTERVAL_MS,
            direction_change_threshold_deg: DIRECTION_CHANGE_THRESHOLD_DEG,
            magnitude_change_threshold: MAGNITUDE_CHANGE_THRESHOLD,
            min_move_mm: MIN_MOVE_MM,
            continuous_jog_distance_mm: CONTINUOUS_JOG_DISTANCE_MM,
        }
    }
}

impl JogTuning {
    /// Prediction lifetime as a `Duration`.
    #[inline]
    pub const fn prediction_validity(&self) -> Duration {
        Duration::from_millis(self.prediction_validity_ms)
    }

    /// Validate parameter bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::ValidationError(msg));

        if !(self.dead_zone > 0.0 && self.dead_zone < 1.0) {
            return fail(format!("dead_zone {} out of range (0, 1)", self.dead_zone));
        }
        if !(self.safety_buffer_mm.is_finite() && self.safety_buffer_mm >= 0.0) {
            return fail(format!(
                "safety_buffer_mm {} must be >= 0",
                self.safety_buffer_mm
            ));
        }
        if self.prediction_validity_ms == 0 {
            return fail("prediction_validity_ms must be > 0".to_string());
        }
        if self.min_interval_ms == 0 || self.min_interval_ms >= self.max_interval_ms {
            return fail(format!(
                "interval range [{}, {}] is empty",
                self.min_interval_ms, self.max_interval_ms
            ));
        }
        if !(self.min_interval_ms..=self.max_interval_ms).contains(&self.default_interval_ms) {
            return fail(format!(
                "default_interval_ms {} outside [{}, {}]",
                self.default_interval_ms, self.min_interval_ms, self.max_interval_ms
            ));
        }
        if !(self.direction_change_threshold_deg > 0.0
            && self.direction_change_threshold_deg < 180.0)
        {
            return fail(format!(
                "direction_change_threshold_deg {} out of range (0, 180)",
                self.direction_change_threshold_deg
            ));
        }
        if !(self.magnitude_change_threshold > 0.0 && self.magnitude_change_threshold < 1.0) {
            return fail(format!(
                "magnitude_change_threshold {} out of range (0, 1)",
                self.magnitude_change_threshold
            ));
        }
        if !(self.min_move_mm.is_finite() && self.min_move_mm > 0.0) {
            return fail(format!("min_move_mm {} must be > 0", self.min_move_mm));
        }
        if !(self.continuous_jog_distance_mm.is_finite() && self.continuous_jog_distance_mm > 0.0)
        {
            return fail(format!(
                "continuous_jog_distance_mm {} must be > 0",
                self.continuous_jog_distance_mm
            ));
        }
        Ok(())
    }
}

// ─── Service Config ─────────────────────────────────────────────────

/// Settings in effect when the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StartupSettings {
    #[serde(default)]
    pub jog: JogSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
}

/// Top-level jog service configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "jog"
///
/// [tuning]
/// safety_buffer_mm = 2.0
///
/// [defaults.jog]
/// mode = "joystick"
/// selected_feed_rate = 1500.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JogServiceConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub tuning: JogTuning,
    #[serde(default)]
    pub defaults: StartupSettings,
}

impl Default for JogServiceConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: "jog".to_string(),
            },
            tuning: JogTuning::default(),
            defaults: StartupSettings::default(),
        }
    }
}

impl JogServiceConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.tuning.validate()?;
        self.defaults.jog.validate()?;
        self.defaults.probe.validate()
    }
}

// ─── Loader ─────────────────────────────────────────────────────────

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
