//! Optimistic position prediction.
//!
//! Position reports lag the command stream. Between reports the predictor
//! adds every accepted jog delta to a baseline so the soft-limit filter sees
//! where the machine is heading, not where it was.
//!
//! A prediction is authoritative for `validity` after its last update
//! (default [`PREDICTION_VALIDITY`]). After that, the next reported position
//! becomes the new baseline.

use std::time::{Duration, Instant};

use jog_common::consts::PREDICTION_VALIDITY;
use jog_common::geometry::Vec3;

/// Predicted machine position and its age.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PredictedPositionState {
    pub predicted_position: Option<Vec3>,
    pub last_update: Option<Instant>,
}

/// Owner of the predicted position state.
#[derive(Debug, Clone)]
pub struct PositionPredictor {
    state: PredictedPositionState,
    validity: Duration,
}

impl Default for PositionPredictor {
    fn default() -> Self {
        Self::new(PREDICTION_VALIDITY)
    }
}

impl PositionPredictor {
    pub const fn new(validity: Duration) -> Self {
        Self {
            state: PredictedPositionState {
                predicted_position: None,
                last_update: None,
            },
            validity,
        }
    }

    #[inline]
    pub const fn state(&self) -> &PredictedPositionState {
        &self.state
    }

    /// True if a prediction exists and is younger than the validity window.
    pub fn is_fresh(&self, now: Instant) -> bool {
        match (self.state.predicted_position, self.state.last_update) {
            (Some(_), Some(at)) => now.saturating_duration_since(at) < self.validity,
            _ => false,
        }
    }

    /// Position the soft-limit filter should use.
    ///
    /// A fresh prediction wins over `actual`. Otherwise `actual` becomes
    /// the new baseline. `None` when neither exists.
    pub fn position_for_filtering(&mut self, actual: Option<Vec3>, now: Instant) -> Option<Vec3> {
        if self.is_fresh(now) {
            return self.state.predicted_position;
        }
        match actual {
            Some(pos) => {
                self.state = PredictedPositionState {
                    predicted_position: Some(pos),
                    last_update: Some(now),
                };
                Some(pos)
            }
            None => {
                self.state = PredictedPositionState::default();
                None
            }
        }
    }

    /// Advance the prediction by a command the sink accepted.
    ///
    /// Without a baseline there is nothing to advance.
    pub fn update_after_command(&mut self, delta: Vec3, now: Instant) {
        if let Some(pos) = self.state.predicted_position.as_mut() {
            *pos += delta;
            self.state.last_update = Some(now);
        }
    }

    /// Drop the prediction.
    pub fn reset(&mut self) {
        self.state = PredictedPositionState::default();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
