//! Proportional jog controller.
//!
//! Pure numeric core that turns one normalized joystick sample into the
//! movement for one command interval:
//!
//! 1. Linear magnitude = |(x, y, z)|. Rotary axes get the same dead zone
//!    per axis but do not feed the linear magnitude.
//! 2. Dead zone → inactive, before any envelope math.
//! 3. Magnitude above 1 is scaled down to exactly 1 (never up).
//! 4. `base_distance = feed/60 · interval/1000` [mm per interval].
//! 5. Soft-limit filter on (x, y, z) when position and envelope are known.
//! 6. Filtered magnitude below the dead zone → linear axes inactive.
//! 7. `scaled_feed_rate = round(feed · magnitude)`.
//!
//! Nothing here returns an error; degenerate input produces an inactive
//! result.

use jog_common::config::JogTuning;
use jog_common::geometry::{Vec3, WorkEnvelope};

use crate::soft_limit::filter_proportional;

/// One sample to process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogInput<'a> {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Feed rate at full deflection [mm/min].
    pub selected_feed_rate: f64,
    /// Interval one command covers [ms].
    pub target_interval_ms: u64,
    /// Best known machine position (actual or predicted).
    pub current_position: Option<Vec3>,
    pub work_envelope: Option<&'a WorkEnvelope>,
}

impl<'a> JogInput<'a> {
    /// Sample with only linear axes deflected and no envelope.
    pub fn linear(v: Vec3, selected_feed_rate: f64, target_interval_ms: u64) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            selected_feed_rate,
            target_interval_ms,
            current_position: None,
            work_envelope: None,
        }
    }

    /// Attach position and envelope for soft-limit filtering.
    pub fn with_limits(mut self, position: Option<Vec3>, envelope: Option<&'a WorkEnvelope>) -> Self {
        self.current_position = position;
        self.work_envelope = envelope;
        self
    }
}

/// Result of processing one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JogOutput {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Deflection magnitude after filtering, in `[0, 1]`.
    pub magnitude: f64,
    pub is_active: bool,
    /// Feed rate for this command [mm/min].
    pub scaled_feed_rate: f64,
    /// Travel [mm] full deflection represents over one interval.
    pub base_distance: f64,
}

impl JogOutput {
    /// All-zero inactive result.
    pub const fn inactive() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            magnitude: 0.0,
            is_active: false,
            scaled_feed_rate: 0.0,
            base_distance: 0.0,
        }
    }

    #[inline]
    pub const fn linear(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// `[x, y, z, a, b, c]`
    #[inline]
    pub const fn axes(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.a, self.b, self.c]
    }
}

/// Travel [mm] one command interval represents at `feed_rate` [mm/min].
#[inline]
pub fn base_distance(feed_rate: f64, target_interval_ms: u64) -> f64 {
    (feed_rate / 60.0) * (target_interval_ms as f64 / 1000.0)
}

/// Dead-zone, clamp and soft-limit processing for joystick samples.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalJogController {
    dead_zone: f64,
    safety_buffer: f64,
    direction_threshold_cos: f64,
    magnitude_threshold: f64,
}

impl Default for ProportionalJogController {
    fn default() -> Self {
        Self::new(&JogTuning::default())
    }
}

impl ProportionalJogController {
    pub fn new(tuning: &JogTuning) -> Self {
        Self {
            dead_zone: tuning.dead_zone,
            safety_buffer: tuning.safety_buffer_mm,
            direction_threshold_cos: tuning.direction_change_threshold_deg.to_radians().cos(),
            magnitude_threshold: tuning.magnitude_change_threshold,
        }
    }

    #[inline]
    pub const fn dead_zone(&self) -> f64 {
        self.dead_zone
    }

    /// Process one sample. See the module docs for the step order.
    pub fn process(&self, input: &JogInput<'_>) -> JogOutput {
        let feed = input.selected_feed_rate;
        if !(feed.is_finite() && feed > 0.0) {
            return JogOutput::inactive();
        }

        let linear = Vec3::new(sanitize(input.x), sanitize(input.y), sanitize(input.z));
        let rotary = [input.a, input.b, input.c].map(|v| {
            let v = sanitize(v);
            if v.abs() < self.dead_zone { 0.0 } else { v }
        });
        let rotary_active = rotary.iter().any(|v| *v != 0.0);

        let raw_magnitude = linear.magnitude();
        let mut linear_active = raw_magnitude >= self.dead_zone;
        if !linear_active && !rotary_active {
            return JogOutput::inactive();
        }

        let linear = if !linear_active {
            Vec3::ZERO
        } else if raw_magnitude > 1.0 {
            linear * (1.0 / raw_magnitude)
        } else {
            linear
        };

        let base = base_distance(feed, input.target_interval_ms);

        let filtered = match (input.current_position, input.work_envelope) {
            (Some(pos), Some(env)) if linear_active => {
                filter_proportional(linear, pos, Some(env), base, self.safety_buffer)
            }
            _ => linear,
        };

        let mut magnitude = filtered.magnitude().min(1.0);
        let filtered = if magnitude < self.dead_zone {
            linear_active = false;
            magnitude = 0.0;
            Vec3::ZERO
        } else {
            filtered
        };

        if !linear_active {
            if !rotary_active {
                return JogOutput::inactive();
            }
            magnitude = rotary.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        }

        JogOutput {
            x: filtered.x,
            y: filtered.y,
            z: filtered.z,
            a: rotary[0],
            b: rotary[1],
            c: rotary[2],
            magnitude,
            is_active: true,
            scaled_feed_rate: (feed * magnitude).round(),
            base_distance: base,
        }
    }

    /// Planar sample, Z and rotary axes zero.
    pub fn process_2d(
        &self,
        x: f64,
        y: f64,
        selected_feed_rate: f64,
        target_interval_ms: u64,
        current_position: Option<Vec3>,
        work_envelope: Option<&WorkEnvelope>,
    ) -> JogOutput {
        self.process_3d(
            Vec3::new(x, y, 0.0),
            selected_feed_rate,
            target_interval_ms,
            current_position,
            work_envelope,
        )
    }

    /// Linear sample, rotary axes zero.
    pub fn process_3d(
        &self,
        v: Vec3,
        selected_feed_rate: f64,
        target_interval_ms: u64,
        current_position: Option<Vec3>,
        work_envelope: Option<&WorkEnvelope>,
    ) -> JogOutput {
        let input = JogInput::linear(v, selected_feed_rate, target_interval_ms)
            .with_limits(current_position, work_envelope);
        self.process(&input)
    }

    /// Angle between the planar samples exceeds the direction threshold.
    ///
    /// Leaving or entering rest counts as a change.
    pub fn has_significant_direction_change(
        &self,
        new_x: f64,
        new_y: f64,
        old_x: f64,
        old_y: f64,
    ) -> bool {
        self.has_significant_direction_change_3d(
            Vec3::new(new_x, new_y, 0.0),
            Vec3::new(old_x, old_y, 0.0),
        )
    }

    /// 3D form of [`has_significant_direction_change`](Self::has_significant_direction_change).
    pub fn has_significant_direction_change_3d(&self, new: Vec3, old: Vec3) -> bool {
        self.direction_changed(&new.to_array(), &old.to_array())
    }

    /// Direction change over all six axes, as sent in one jog command.
    pub fn has_significant_direction_change_6d(&self, new: [f64; 6], old: [f64; 6]) -> bool {
        self.direction_changed(&new, &old)
    }

    fn direction_changed(&self, new: &[f64], old: &[f64]) -> bool {
        let norm = |v: &[f64]| v.iter().map(|c| c * c).sum::<f64>().sqrt();
        let new_mag = norm(new);
        let old_mag = norm(old);
        let new_rest = !(new_mag >= self.dead_zone);
        let old_rest = !(old_mag >= self.dead_zone);
        if new_rest || old_rest {
            return new_rest != old_rest;
        }
        let dot: f64 = new.iter().zip(old).map(|(n, o)| n * o).sum();
        let cos = (dot / (new_mag * old_mag)).clamp(-1.0, 1.0);
        cos < self.direction_threshold_cos
    }

    /// Magnitude moved by more than the threshold fraction of full scale.
    pub fn has_significant_magnitude_change(&self, new_magnitude: f64, old_x: f64, old_y: f64) -> bool {
        self.has_significant_magnitude_change_3d(new_magnitude, Vec3::new(old_x, old_y, 0.0))
    }

    /// 3D form of [`has_significant_magnitude_change`](Self::has_significant_magnitude_change).
    pub fn has_significant_magnitude_change_3d(&self, new_magnitude: f64, old: Vec3) -> bool {
        self.has_significant_magnitude_delta(new_magnitude, old.magnitude().min(1.0))
    }

    /// Compare against the magnitude of the last sent sample directly.
    ///
    /// Needed when rotary axes contribute: their magnitude is not the norm
    /// of the linear part.
    pub fn has_significant_magnitude_delta(&self, new_magnitude: f64, old_magnitude: f64) -> bool {
        (new_magnitude - old_magnitude).abs() > self.magnitude_threshold
    }
}

#[inline]
fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

// ─── Tests ──────────────────────────────────────────────────────────
