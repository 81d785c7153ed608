//! Jog orchestration root.
//!
//! The state machine and the synchronous orchestrator that drives it.

pub mod jog;
pub mod machine;

pub use jog::{InputOutcome, JogOrchestrator};
pub use machine::{JogEvent, JogStateMachine, TransitionResult};
