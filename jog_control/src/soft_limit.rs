//! Soft-limit filter.
//!
//! Clamps a requested relative move so the tool stays at least
//! `safety_buffer` inside every face of the work envelope.
//!
//! Axes are filtered independently: an axis at its boundary stops while the
//! others keep moving, so the tool slides along the wall instead of the whole
//! vector being scaled down.
//!
//! ```text
//! dir > 0:  available = (max - buffer) - pos
//! dir < 0:  available = pos - (min + buffer)
//! out     = clamp(requested, -max(available, 0), max(available, 0))
//! ```

use jog_common::consts::SAFETY_BUFFER_MM;
use jog_common::geometry::{Axis, Direction, Vec3, WorkEnvelope};

/// Filter one axis.
///
/// Never reverses direction: if the position is already inside the buffer
/// zone, the result is zero, not a move back out.
#[inline]
pub fn filter_axis(requested: f64, position: f64, min: f64, max: f64, safety_buffer: f64) -> f64 {
    if requested > 0.0 {
        let available = ((max - safety_buffer) - position).max(0.0);
        requested.min(available)
    } else if requested < 0.0 {
        let available = (position - (min + safety_buffer)).max(0.0);
        requested.max(-available)
    } else {
        // zero or NaN
        0.0
    }
}

/// 3D filter with the default safety buffer.
#[inline]
pub fn filter_movement(requested: Vec3, position: Vec3, envelope: Option<&WorkEnvelope>) -> Vec3 {
    filter_movement_with_buffer(requested, position, envelope, SAFETY_BUFFER_MM)
}

/// 3D filter. `None` envelope passes the request through unchanged.
pub fn filter_movement_with_buffer(
    requested: Vec3,
    position: Vec3,
    envelope: Option<&WorkEnvelope>,
    safety_buffer: f64,
) -> Vec3 {
    let Some(env) = envelope else {
        return requested;
    };
    Vec3::new(
        filter_axis(requested.x, position.x, env.min.x, env.max.x, safety_buffer),
        filter_axis(requested.y, position.y, env.min.y, env.max.y, safety_buffer),
        filter_axis(requested.z, position.z, env.min.z, env.max.z, safety_buffer),
    )
}

/// Planar filter on X/Y; Z of the envelope is ignored.
pub fn filter_movement_2d(
    requested: (f64, f64),
    position: (f64, f64),
    envelope: Option<&WorkEnvelope>,
    safety_buffer: f64,
) -> (f64, f64) {
    let Some(env) = envelope else {
        return requested;
    };
    (
        filter_axis(requested.0, position.0, env.min.x, env.max.x, safety_buffer),
        filter_axis(requested.1, position.1, env.min.y, env.max.y, safety_buffer),
    )
}

/// Filter in normalized joystick space.
///
/// `raw` is deflection in `[-1, 1]`, `base_distance` the travel [mm] that
/// full deflection represents over one command interval. The result is
/// again in normalized space.
///
/// `None` envelope is the identity. A non-positive or non-finite
/// `base_distance` yields zero on every axis.
pub fn filter_proportional(
    raw: Vec3,
    position: Vec3,
    envelope: Option<&WorkEnvelope>,
    base_distance: f64,
    safety_buffer: f64,
) -> Vec3 {
    if envelope.is_none() {
        return raw;
    }
    if !(base_distance.is_finite() && base_distance > 0.0) {
        return Vec3::ZERO;
    }
    let mm = filter_movement_with_buffer(raw * base_distance, position, envelope, safety_buffer);
    mm * (1.0 / base_distance)
}

/// Travel left [mm] along one linear axis before the buffer zone.
///
/// Returns `None` for rotary axes or when no envelope is known.
pub fn remaining_travel(
    position: Vec3,
    envelope: Option<&WorkEnvelope>,
    axis: Axis,
    direction: Direction,
    safety_buffer: f64,
) -> Option<f64> {
    let env = envelope?;
    let pos = position.component(axis)?;
    let min = env.min.component(axis)?;
    let max = env.max.component(axis)?;
    let available = match direction {
        Direction::Positive => (max - safety_buffer) - pos,
        Direction::Negative => pos - (min + safety_buffer),
    };
    Some(available.max(0.0))
}

// ─── Tests ──────────────────────────────────────────────────────────
