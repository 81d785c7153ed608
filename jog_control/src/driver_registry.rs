//! Registry of input drivers.
//!
//! Owns every registered [`InputDriver`], its enabled flag and the task that
//! forwards its events onto the service channel. Constructed by the service
//! with the channel it consumes; no global state.
//!
//! Whether an event reaches the jog pipeline is decided when the service
//! receives it ([`DriverRegistry::accepts`]): the driver must still be
//! registered, enabled and active.

use std::collections::HashMap;

use jog_common::driver::{DriverError, DriverInfo, InputDriver};
use jog_common::input::InputEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::service::ServiceMessage;

/// Registry operation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No driver with this id is registered.
    #[error("Unknown input device: {0}")]
    UnknownDevice(String),

    /// A driver with this id is already registered.
    #[error("Input device already registered: {0}")]
    DuplicateDevice(String),

    /// Driver lifecycle call failed.
    #[error("Input device {device_id}: {source}")]
    Driver {
        device_id: String,
        #[source]
        source: DriverError,
    },

    /// Jog service is no longer running.
    #[error("Jog service closed")]
    ServiceClosed,
}

struct DriverEntry {
    driver: Box<dyn InputDriver>,
    enabled: bool,
    subscription: JoinHandle<()>,
}

impl DriverEntry {
    fn info(&self) -> DriverInfo {
        DriverInfo {
            device_id: self.driver.device_id().to_string(),
            display_name: self.driver.display_name().to_string(),
            capabilities: self.driver.capabilities(),
            enabled: self.enabled,
            active: self.driver.is_active(),
        }
    }
}

/// Registered input drivers keyed by device id.
pub struct DriverRegistry {
    drivers: HashMap<String, DriverEntry>,
    forward: mpsc::Sender<ServiceMessage>,
}

impl DriverRegistry {
    /// Empty registry forwarding driver events into `forward`.
    pub fn new(forward: mpsc::Sender<ServiceMessage>) -> Self {
        Self {
            drivers: HashMap::new(),
            forward,
        }
    }

    /// Initialize, subscribe and register a driver. New drivers start enabled.
    ///
    /// # Errors
    /// - `RegistryError::DuplicateDevice` if the id is taken.
    /// - `RegistryError::Driver` if `initialize()` or `subscribe()` fails;
    ///   the driver is not registered.
    pub async fn add(&mut self, mut driver: Box<dyn InputDriver>) -> Result<(), RegistryError> {
        let device_id = driver.device_id().to_string();
        if self.drivers.contains_key(&device_id) {
            return Err(RegistryError::DuplicateDevice(device_id));
        }

        driver
            .initialize()
            .await
            .map_err(|source| RegistryError::Driver {
                device_id: device_id.clone(),
                source,
            })?;

        let events = match driver.subscribe() {
            Ok(rx) => rx,
            Err(source) => {
                if let Err(e) = driver.dispose().await {
                    warn!(device = %device_id, error = %e, "Dispose after failed subscribe");
                }
                return Err(RegistryError::Driver { device_id, source });
            }
        };

        let subscription = tokio::spawn(forward_events(
            device_id.clone(),
            events,
            self.forward.clone(),
        ));

        info!(
            device = %device_id,
            name = driver.display_name(),
            capabilities = ?driver.capabilities(),
            "Input driver registered"
        );
        self.drivers.insert(
            device_id,
            DriverEntry {
                driver,
                enabled: true,
                subscription,
            },
        );
        Ok(())
    }

    /// Cancel the subscription, then dispose and drop the driver.
    ///
    /// The entry is removed even if `dispose()` fails.
    ///
    /// # Errors
    /// - `RegistryError::UnknownDevice` if the id is not registered.
    /// - `RegistryError::Driver` if `dispose()` fails.
    pub async fn remove(&mut self, device_id: &str) -> Result<(), RegistryError> {
        let mut entry = self
            .drivers
            .remove(device_id)
            .ok_or_else(|| RegistryError::UnknownDevice(device_id.to_string()))?;

        entry.subscription.abort();
        // Cancelled is the expected outcome.
        let _ = (&mut entry.subscription).await;

        let result = entry
            .driver
            .dispose()
            .await
            .map_err(|source| RegistryError::Driver {
                device_id: device_id.to_string(),
                source,
            });
        info!(device = %device_id, ok = result.is_ok(), "Input driver removed");
        result
    }

    /// # Errors
    /// Returns `RegistryError::UnknownDevice` if the id is not registered.
    pub fn set_enabled(&mut self, device_id: &str, enabled: bool) -> Result<(), RegistryError> {
        let entry = self
            .drivers
            .get_mut(device_id)
            .ok_or_else(|| RegistryError::UnknownDevice(device_id.to_string()))?;
        if entry.enabled != enabled {
            info!(device = %device_id, enabled, "Input driver enable changed");
        }
        entry.enabled = enabled;
        Ok(())
    }

    /// All registered drivers, sorted by device id.
    pub fn list(&self) -> Vec<DriverInfo> {
        let mut list: Vec<DriverInfo> = self.drivers.values().map(DriverEntry::info).collect();
        list.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        list
    }

    /// True if events from `device_id` may enter the jog pipeline.
    pub fn accepts(&self, device_id: &str) -> bool {
        self.drivers
            .get(device_id)
            .is_some_and(|e| e.enabled && e.driver.is_active())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.drivers.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Cancel every subscription, then dispose every driver.
    pub async fn shutdown(&mut self) {
        for entry in self.drivers.values() {
            entry.subscription.abort();
        }
        for (device_id, mut entry) in self.drivers.drain() {
            let _ = (&mut entry.subscription).await;
            if let Err(e) = entry.driver.dispose().await {
                warn!(device = %device_id, error = %e, "Input driver dispose failed");
            }
        }
        info!("All input drivers disposed");
    }
}

async fn forward_events(
    device_id: String,
    mut events: mpsc::Receiver<InputEvent>,
    forward: mpsc::Sender<ServiceMessage>,
) {
    while let Some(event) = events.recv().await {
        if forward.send(ServiceMessage::Input(event)).await.is_err() {
            break;
        }
    }
    trace!(device = %device_id, "Input stream ended");
}

// ─── Tests ──────────────────────────────────────────────────────────
