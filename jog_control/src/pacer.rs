//! Command pacing against the controller's planner buffer.
//!
//! More free planner blocks → shorter interval (stream harder), fewer →
//! longer interval so the queue never overflows:
//!
//! ```text
//! headroom = blocks_available / max_observed_blocks     ∈ [0, 1]
//! interval = max_interval - headroom · (max_interval - min_interval)
//! ```
//!
//! Without telemetry (`max_observed_blocks == 0`) the default interval applies.

use std::time::{Duration, Instant};

use jog_common::config::JogTuning;

/// Why a sample is sent now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    /// Nothing sent yet in this jog.
    FirstSample,
    /// Target interval elapsed since the last send.
    IntervalElapsed,
    /// Direction changed beyond threshold since the last send.
    DirectionChange,
    /// Magnitude changed beyond threshold since the last send.
    MagnitudeChange,
}

/// Interval calculator and send gate.
#[derive(Debug, Clone, Copy)]
pub struct CommandPacer {
    min_interval_ms: u64,
    max_interval_ms: u64,
    default_interval_ms: u64,
}

impl Default for CommandPacer {
    fn default() -> Self {
        Self::new(&JogTuning::default())
    }
}

impl CommandPacer {
    pub fn new(tuning: &JogTuning) -> Self {
        Self {
            min_interval_ms: tuning.min_interval_ms,
            max_interval_ms: tuning.max_interval_ms,
            default_interval_ms: tuning.default_interval_ms,
        }
    }

    /// Target interval [ms] for the reported planner state.
    pub fn calculate_command_interval(&self, blocks_available: u32, max_observed_blocks: u32) -> u64 {
        if max_observed_blocks == 0 {
            return self.default_interval_ms;
        }
        let headroom = blocks_available.min(max_observed_blocks) as f64 / max_observed_blocks as f64;
        let span = (self.max_interval_ms - self.min_interval_ms) as f64;
        let interval = (self.max_interval_ms as f64 - headroom * span).round() as u64;
        interval.clamp(self.min_interval_ms, self.max_interval_ms)
    }

    /// True on the first sample or once `target_interval_ms` has elapsed.
    pub fn should_send_command(
        &self,
        last_command_time: Option<Instant>,
        target_interval_ms: u64,
        now: Instant,
    ) -> bool {
        match last_command_time {
            None => true,
            Some(last) => {
                now.saturating_duration_since(last) >= Duration::from_millis(target_interval_ms)
            }
        }
    }

    /// Full send decision including the early-send overrides.
    ///
    /// `None` means hold the sample.
    pub fn decide(
        &self,
        last_command_time: Option<Instant>,
        target_interval_ms: u64,
        now: Instant,
        direction_changed: bool,
        magnitude_changed: bool,
    ) -> Option<SendReason> {
        if last_command_time.is_none() {
            Some(SendReason::FirstSample)
        } else if self.should_send_command(last_command_time, target_interval_ms, now) {
            Some(SendReason::IntervalElapsed)
        } else if direction_changed {
            Some(SendReason::DirectionChange)
        } else if magnitude_changed {
            Some(SendReason::MagnitudeChange)
        } else {
            None
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
