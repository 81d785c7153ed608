//! Simulator configuration file: the jog service config plus `[machine]`.

use jog_common::config::{ConfigError, JogServiceConfig};
use serde::{Deserialize, Serialize};

use crate::machine::SimMachineConfig;

/// Contents of the `--config` TOML.
///
/// ```toml
/// [shared]
/// service_name = "jog-sim"
///
/// [defaults.jog]
/// selected_feed_rate = 1500.0
///
/// [machine]
/// max_travel = { x = 300.0, y = 300.0, z = 100.0 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(flatten)]
    pub service: JogServiceConfig,
    #[serde(default)]
    pub machine: SimMachineConfig,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.machine.validate()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
