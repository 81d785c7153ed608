//! Geometry primitives shared by the jog pipeline.
//!
//! - [`Vec3`] - linear XYZ vector in machine coordinates [mm]
//! - [`Axis`] / [`AxisMask`] - axis identifiers and bit masks
//! - [`WorkEnvelope`] - axis-aligned soft-limit box

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

// ─── Vec3 ───────────────────────────────────────────────────────────

/// Linear XYZ vector [mm].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    #[inline]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean norm.
    #[inline]
    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True if every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component for a linear axis, `None` for rotary axes.
    #[inline]
    pub const fn component(self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => Some(self.x),
            Axis::Y => Some(self.y),
            Axis::Z => Some(self.z),
            Axis::A | Axis::B | Axis::C => None,
        }
    }

    /// Unit vector along a linear axis scaled by `value`; zero for rotary axes.
    #[inline]
    pub const fn along(axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => Self::new(value, 0.0, 0.0),
            Axis::Y => Self::new(0.0, value, 0.0),
            Axis::Z => Self::new(0.0, 0.0, value),
            Axis::A | Axis::B | Axis::C => Self::ZERO,
        }
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ─── Axes ───────────────────────────────────────────────────────────

/// Machine axis identifier. X/Y/Z are linear, A/B/C rotary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    A = 3,
    B = 4,
    C = 5,
}

impl Axis {
    /// All axes in controller order.
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// G-code word letter.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
        }
    }

    #[inline]
    pub const fn is_linear(self) -> bool {
        matches!(self, Axis::X | Axis::Y | Axis::Z)
    }

    /// Single-bit mask for this axis.
    #[inline]
    pub const fn mask(self) -> AxisMask {
        AxisMask::from_bits_truncate(1 << self as u8)
    }
}

/// Jog direction along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

bitflags! {
    /// Axis selection mask, bit layout matches grbl's `$3`/`$23` settings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AxisMask: u8 {
        const X = 0x01;
        const Y = 0x02;
        const Z = 0x04;
        const A = 0x08;
        const B = 0x10;
        const C = 0x20;
        const XYZ = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
    }
}

impl AxisMask {
    /// Axes selected by this mask, in controller order.
    pub fn axes(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(a.mask()))
    }
}

// ─── Work Envelope ──────────────────────────────────────────────────

/// Axis-aligned box of permitted travel in machine coordinates [mm].
///
/// Immutable once built; a configuration change produces a new envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkEnvelope {
    pub min: Vec3,
    pub max: Vec3,
}

impl WorkEnvelope {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Build from grbl max-travel settings (`$130`-`$132`).
    ///
    /// grbl puts machine zero at the homed end of each axis, so travel runs
    /// `[-travel, 0]`. Axes whose bit is set in `homing_dir_invert` (`$23`)
    /// home toward the minimum and run `[0, travel]`.
    pub fn from_max_travel(max_travel: Vec3, homing_dir_invert: AxisMask) -> Self {
        let span = |axis: Axis, travel: f64| {
            let travel = travel.abs();
            if homing_dir_invert.contains(axis.mask()) {
                (0.0, travel)
            } else {
                (-travel, 0.0)
            }
        };
        let (x0, x1) = span(Axis::X, max_travel.x);
        let (y0, y1) = span(Axis::Y, max_travel.y);
        let (z0, z1) = span(Axis::Z, max_travel.z);
        Self::new(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    }

    /// Finite bounds with `min < max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x < self.max.x
            && self.min.y < self.max.y
            && self.min.z < self.max.z
    }

    /// True if `p` lies inside the box (faces included).
    pub fn contains(&self, p: Vec3) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    /// Box extent per axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}
