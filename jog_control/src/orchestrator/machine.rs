//! Jog state transitions.
//!
//! Idle ↔ Jogging, with Blocked overriding both while the machine is not
//! ready:
//!
//! ```text
//! Idle     --InputAccepted-->                         Jogging
//! Jogging  --InputInactive | Stop | ModeChangeAway
//!            | JogCompleted-->                        Idle
//! *        --MachineNotReady-->                       Blocked
//! Blocked  --MachineReady-->                          Idle
//! ```

use jog_common::state::JogState;

/// Result of a JogState transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(JogState),
    /// Transition rejected, with reason.
    Rejected(&'static str),
}

/// Event that can trigger a jog state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogEvent {
    /// A jog command was accepted by the sink.
    InputAccepted,
    /// Joystick sample fell inside the dead zone (or was filtered to rest).
    InputInactive,
    /// Explicit stop request.
    Stop,
    /// Jog mode changed away from Joystick.
    ModeChangeAway,
    /// Machine reported the end of a discrete/continuous jog.
    JogCompleted,
    /// Machine left the jog-eligible states or went offline.
    MachineNotReady,
    /// Machine returned to a jog-eligible state.
    MachineReady,
}

/// JogState manager holding the current state.
#[derive(Debug, Clone)]
pub struct JogStateMachine {
    state: JogState,
}

impl Default for JogStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl JogStateMachine {
    /// Starts Blocked until the first machine snapshot says otherwise.
    pub const fn new() -> Self {
        Self {
            state: JogState::Blocked,
        }
    }

    #[inline]
    pub const fn state(&self) -> JogState {
        self.state
    }

    #[inline]
    pub const fn is_jogging(&self) -> bool {
        matches!(self.state, JogState::Jogging)
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: JogEvent) -> TransitionResult {
        use JogEvent::*;
        use JogState::*;

        let next = match (self.state, event) {
            (_, MachineNotReady) => Blocked,
            (Blocked, MachineReady) => Idle,
            (Blocked, InputAccepted) => {
                return TransitionResult::Rejected("Blocked: machine not ready for jog");
            }
            (Blocked, _) => Blocked,

            (Idle | Jogging, InputAccepted) => Jogging,
            (Idle | Jogging, InputInactive | Stop | ModeChangeAway | JogCompleted) => Idle,
            (s @ (Idle | Jogging), MachineReady) => s,
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
