//! On-screen joystick driver.
//!
//! The widget keeps a [`VirtualJoystickControl`] and reports knob position
//! through it; the [`VirtualJoystick`] itself is handed to the jog service.
//! Screen y grows downward, machine +Y points away from the operator, so
//! pixel offsets are inverted on Y.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use jog_common::consts::DRIVER_CHANNEL_CAPACITY;
use jog_common::driver::{DriverError, InputDriver};
use jog_common::input::{Capabilities, InputEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

/// On-screen XY joystick implementing the InputDriver trait.
pub struct VirtualJoystick {
    device_id: Arc<str>,
    display_name: String,
    control: VirtualJoystickControl,
    rx: Option<mpsc::Receiver<InputEvent>>,
}

impl VirtualJoystick {
    /// Create a joystick with the given device id.
    pub fn new(device_id: impl Into<String>) -> Self {
        let device_id: Arc<str> = Arc::from(device_id.into());
        let (tx, rx) = mpsc::channel(DRIVER_CHANNEL_CAPACITY);
        Self {
            display_name: format!("On-screen joystick ({device_id})"),
            control: VirtualJoystickControl {
                device_id: device_id.clone(),
                tx,
                active: Arc::new(AtomicBool::new(false)),
            },
            device_id,
            rx: Some(rx),
        }
    }

    /// Widget-side handle; clones share the same stream.
    pub fn control(&self) -> VirtualJoystickControl {
        self.control.clone()
    }
}

#[async_trait]
impl InputDriver for VirtualJoystick {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::XY_2D
    }

    fn is_active(&self) -> bool {
        self.control.is_active()
    }

    async fn initialize(&mut self) -> Result<(), DriverError> {
        self.control.active.store(true, Ordering::Release);
        info!(device = %self.device_id, "On-screen joystick ready");
        Ok(())
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<InputEvent>, DriverError> {
        self.rx
            .take()
            .ok_or_else(|| DriverError::StreamUnavailable(format!("{} already subscribed", self.device_id)))
    }

    async fn dispose(&mut self) -> Result<(), DriverError> {
        self.control.active.store(false, Ordering::Release);
        info!(device = %self.device_id, "On-screen joystick disposed");
        Ok(())
    }
}

/// Widget-side handle of a [`VirtualJoystick`].
///
/// Methods never block. A full queue drops the sample with an error; the
/// next sample supersedes it.
#[derive(Debug, Clone)]
pub struct VirtualJoystickControl {
    device_id: Arc<str>,
    tx: mpsc::Sender<InputEvent>,
    active: Arc<AtomicBool>,
}

impl VirtualJoystickControl {
    /// True between `initialize()` and `dispose()`.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Report a normalized deflection (`y > 0` is machine +Y).
    ///
    /// # Errors
    /// `StreamUnavailable` if the driver is not live, `Hardware` if the
    /// event queue is full.
    pub fn set_deflection(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.emit(InputEvent::xy(self.device_id.as_ref(), x, y, Instant::now()))
    }

    /// Report the knob offset from the widget center in pixels.
    ///
    /// The offset is normalized by `radius_px`, Y is inverted, and a knob
    /// dragged past the rim is held on the rim.
    ///
    /// # Errors
    /// As [`set_deflection`](Self::set_deflection). A non-positive radius
    /// reports a released stick.
    pub fn set_screen_offset(&self, dx_px: f64, dy_px: f64, radius_px: f64) -> Result<(), DriverError> {
        let (x, y) = screen_to_deflection(dx_px, dy_px, radius_px);
        self.set_deflection(x, y)
    }

    /// Report a centered stick.
    ///
    /// # Errors
    /// As [`set_deflection`](Self::set_deflection).
    pub fn release(&self) -> Result<(), DriverError> {
        self.emit(InputEvent::released(self.device_id.as_ref(), Instant::now()))
    }

    fn emit(&self, event: InputEvent) -> Result<(), DriverError> {
        if !self.is_active() {
            return Err(DriverError::StreamUnavailable(format!("{} not initialized", self.device_id)));
        }
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => {
                debug!(device = %self.device_id, "Joystick queue full, sample dropped");
                DriverError::Hardware("event queue full".to_string())
            }
            TrySendError::Closed(_) => DriverError::StreamUnavailable(format!("{} stream closed", self.device_id)),
        })
    }
}

/// Pixel offset → normalized deflection, y inverted, clamped to the unit circle.
pub fn screen_to_deflection(dx_px: f64, dy_px: f64, radius_px: f64) -> (f64, f64) {
    if !(radius_px.is_finite() && radius_px > 0.0) || !(dx_px.is_finite() && dy_px.is_finite()) {
        return (0.0, 0.0);
    }
    let x = dx_px / radius_px;
    let y = -dy_px / radius_px;
    let r = x.hypot(y);
    if r > 1.0 { (x / r, y / r) } else { (x, y) }
}

// ─── Tests ──────────────────────────────────────────────────────────
