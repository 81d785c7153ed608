//! Canonical analog input event produced by input drivers.
//!
//! Every driver, whatever its hardware, reduces its state to an
//! [`InputEvent`]: up to six normalized axes in `[-1, 1]`. Axes a device
//! does not have stay at zero.
//!
//! # Axis convention
//!
//! `y > 0` means machine +Y, away from the operator. Drivers that work in
//! screen space (pixel y growing downward) invert y when normalizing.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::geometry::Vec3;

bitflags! {
    /// Axis sets a driver can produce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Planar X/Y stick (on-screen joystick, thumbstick).
        const XY_2D = 0x01;
        /// X/Y/Z (stick + throttle or Z rocker).
        const XYZ_3D = 0x02;
        /// Full six degrees of freedom (space mouse).
        const DOF_6 = 0x04;
    }
}

impl Capabilities {
    /// True if the driver can deflect the Z axis.
    #[inline]
    pub const fn has_z(self) -> bool {
        self.intersects(Self::XYZ_3D.union(Self::DOF_6))
    }

    /// True if the driver can deflect rotary axes.
    #[inline]
    pub const fn has_rotary(self) -> bool {
        self.contains(Self::DOF_6)
    }
}

/// One normalized sample from one input device.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Identifier of the producing driver.
    pub device_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// When the device produced the sample.
    pub timestamp: Instant,
}

impl InputEvent {
    /// Six-axis event. Values are clamped into `[-1, 1]`; non-finite values become 0.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_id: impl Into<String>,
        x: f64,
        y: f64,
        z: f64,
        a: f64,
        b: f64,
        c: f64,
        timestamp: Instant,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            x: normalize_axis(x),
            y: normalize_axis(y),
            z: normalize_axis(z),
            a: normalize_axis(a),
            b: normalize_axis(b),
            c: normalize_axis(c),
            timestamp,
        }
    }

    /// Planar event, Z and rotary axes zero.
    pub fn xy(device_id: impl Into<String>, x: f64, y: f64, timestamp: Instant) -> Self {
        Self::new(device_id, x, y, 0.0, 0.0, 0.0, 0.0, timestamp)
    }

    /// Linear event, rotary axes zero.
    pub fn xyz(device_id: impl Into<String>, x: f64, y: f64, z: f64, timestamp: Instant) -> Self {
        Self::new(device_id, x, y, z, 0.0, 0.0, 0.0, timestamp)
    }

    /// Centered (released) sample.
    pub fn released(device_id: impl Into<String>, timestamp: Instant) -> Self {
        Self::new(device_id, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, timestamp)
    }

    /// Linear deflection as a vector.
    #[inline]
    pub fn linear(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Rotary deflection as `[a, b, c]`.
    #[inline]
    pub fn rotary(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }
}

#[inline]
fn normalize_axis(v: f64) -> f64 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}
