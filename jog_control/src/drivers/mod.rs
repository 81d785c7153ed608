//! Input driver implementations.
//!
//! Hardware drivers (gamepads, space mice, pendants) implement
//! `jog_common::driver::InputDriver` the same way.

mod virtual_joystick;

pub use virtual_joystick::{VirtualJoystick, VirtualJoystickControl, screen_to_deflection};
