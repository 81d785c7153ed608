//! Operator-facing jog and probe settings.
//!
//! Both structs are plain values, replaced only through explicit update
//! requests to the jog service.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// How operator input is turned into motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JogMode {
    /// One fixed-distance move per button press.
    #[default]
    Discrete,
    /// Move while a button is held, stop on release.
    Continuous,
    /// Proportional analog jogging.
    Joystick,
}

/// Jog parameters selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JogSettings {
    /// Step size for discrete jogs [mm].
    #[serde(default = "default_distance")]
    pub selected_distance: f64,
    /// Feed rate at full deflection / for discrete jogs [mm/min].
    #[serde(default = "default_feed_rate")]
    pub selected_feed_rate: f64,
    #[serde(default)]
    pub mode: JogMode,
}

fn default_distance() -> f64 {
    1.0
}
fn default_feed_rate() -> f64 {
    1000.0
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            selected_distance: default_distance(),
            selected_feed_rate: default_feed_rate(),
            mode: JogMode::default(),
        }
    }
}

impl JogSettings {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if distance or feed rate is
    /// not a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("selected_distance", self.selected_distance)?;
        positive("selected_feed_rate", self.selected_feed_rate)
    }
}

/// Probe cycle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Maximum probe travel [mm].
    #[serde(default = "default_probe_distance")]
    pub distance: f64,
    /// Probe feed rate [mm/min].
    #[serde(default = "default_probe_feed")]
    pub feed_rate: f64,
}

fn default_probe_distance() -> f64 {
    10.0
}
fn default_probe_feed() -> f64 {
    100.0
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            distance: default_probe_distance(),
            feed_rate: default_probe_feed(),
        }
    }
}

impl ProbeSettings {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` on non-positive values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("probe distance", self.distance)?;
        positive("probe feed_rate", self.feed_rate)
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
