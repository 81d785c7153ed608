//! Input driver trait and error types.
//!
//! This module defines:
//! - `InputDriver` trait - Interface for pluggable analog input devices
//! - `DriverError` enum - Error types for driver lifecycle operations
//! - `DriverInfo` struct - Read-only description for UI listings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::input::{Capabilities, InputEvent};

/// Error types for input driver operations.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Releasing driver resources failed
    #[error("Dispose failed: {0}")]
    DisposeFailed(String),

    /// Event stream requested before `initialize()` or requested twice
    #[error("Event stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    Hardware(String),
}

/// Trait defining the interface for analog input drivers.
///
/// The jog service manages drivers only through this trait; it never sees
/// concrete device types.
///
/// # Lifecycle
///
/// 1. `initialize()` - Acquire device resources. Failure means the driver
///    is not registered.
/// 2. `subscribe()` - Hand the event receiver to the service. Called once,
///    after a successful `initialize()`.
/// 3. `dispose()` - Release resources. Called after the subscription has
///    been cancelled.
///
/// Events are only forwarded into the jog pipeline while the driver is
/// both enabled (registry flag) and [`is_active`](InputDriver::is_active).
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// Unique device identifier, also carried by every emitted event.
    fn device_id(&self) -> &str;

    /// Human readable name for UI listings.
    fn display_name(&self) -> &str;

    /// Axis sets this device can produce.
    fn capabilities(&self) -> Capabilities;

    /// Whether the device is currently producing meaningful input.
    fn is_active(&self) -> bool;

    /// Acquire device resources.
    ///
    /// # Errors
    /// Return `DriverError::InitFailed` if the device cannot be opened.
    async fn initialize(&mut self) -> Result<(), DriverError>;

    /// Take the receiving end of the device's event channel.
    ///
    /// # Errors
    /// Return `DriverError::StreamUnavailable` if the stream was already taken.
    fn subscribe(&mut self) -> Result<mpsc::Receiver<InputEvent>, DriverError>;

    /// Release device resources.
    async fn dispose(&mut self) -> Result<(), DriverError>;
}

/// Snapshot of one registered driver, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub device_id: String,
    pub display_name: String,
    pub capabilities: Capabilities,
    pub enabled: bool,
    pub active: bool,
}
