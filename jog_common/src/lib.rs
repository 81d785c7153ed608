//! Jog Common Library
//!
//! Shared types, constants and configuration loading for the jog control
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`geometry`] - Vectors, axes and the work envelope
//! - [`input`] - Normalized input events and driver capabilities
//! - [`driver`] - Input driver trait and lifecycle errors
//! - [`machine`] - Machine status snapshots and outbound commands
//! - [`settings`] - Operator jog and probe settings
//! - [`state`] - Jog state published for display
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Numeric defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use jog_common::prelude::*;
//!
//! let env = WorkEnvelope::from_max_travel(Vec3::new(300.0, 200.0, 80.0), AxisMask::empty());
//! assert!(env.is_valid());
//! ```

pub mod config;
pub mod consts;
pub mod driver;
pub mod geometry;
pub mod input;
pub mod machine;
pub mod prelude;
pub mod settings;
pub mod state;
