//! # Jog Control
//!
//! Proportional jog core for a grblHAL-class CNC controller. Turns analog
//! operator input into paced, soft-limited relative jog commands.
//!
//! ## Pipeline
//!
//! ```text
//! InputDriver ─► InputEvent ─► JogOrchestrator ─► ProportionalJogController
//!                                    │                 (soft limit on predicted position)
//!                                    ├─► CommandPacer (interval, early send)
//!                                    ├─► CommandSink (MachineCommand)
//!                                    └─► PositionPredictor (advance on accept)
//! ```
//!
//! ## Module Structure
//!
//! - [`soft_limit`] - Per-axis envelope clamping
//! - [`proportional`] - Dead zone, magnitude clamp, feed scaling
//! - [`predictor`] - Optimistic position between status reports
//! - [`pacer`] - Command interval from planner headroom
//! - [`sink`] - Command sink trait and implementations
//! - [`orchestrator`] - Jog state machine and synchronous orchestrator
//! - [`driver_registry`] - Input driver lifetime and gating
//! - [`service`] - Single-consumer service loop and client handle
//! - [`drivers`] - Reference input drivers

pub mod driver_registry;
pub mod drivers;
pub mod orchestrator;
pub mod pacer;
pub mod predictor;
pub mod proportional;
pub mod service;
pub mod sink;
pub mod soft_limit;

pub use crate::driver_registry::{DriverRegistry, RegistryError};
pub use crate::orchestrator::{InputOutcome, JogOrchestrator};
pub use crate::service::{JogHandle, JogService, ServiceError};
pub use crate::sink::{ChannelSink, CommandSink, RecordingSink, SinkError};
