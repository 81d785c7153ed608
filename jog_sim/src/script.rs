//! Scripted joystick: push into the +X wall, sweep along it, release.

use std::time::{Duration, Instant};

use jog_common::driver::DriverError;
use jog_control::drivers::VirtualJoystickControl;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Deflection at `elapsed` into a run of `total`, `None` once released.
///
/// - first 40 %: steady push toward +X at 0.8
/// - next 40 %: 0.7 deflection rotating through 270° starting at +X
/// - rest: released
pub fn sweep(elapsed: Duration, total: Duration) -> Option<(f64, f64)> {
    if total.is_zero() {
        return None;
    }
    let f = elapsed.as_secs_f64() / total.as_secs_f64();
    if f < 0.4 {
        Some((0.8, 0.0))
    } else if f < 0.8 {
        let angle = (f - 0.4) / 0.4 * 1.5 * std::f64::consts::PI;
        Some((0.7 * angle.cos(), 0.7 * angle.sin()))
    } else {
        None
    }
}

/// Feed [`sweep`] into `control` every `period` for `total`.
pub async fn drive(control: VirtualJoystickControl, total: Duration, period: Duration) {
    let start = Instant::now();
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?total, "Joystick script started");

    loop {
        tick.tick().await;
        let elapsed = start.elapsed();
        if elapsed >= total {
            break;
        }
        let sent = match sweep(elapsed, total) {
            Some((x, y)) => control.set_deflection(x, y),
            None => control.release(),
        };
        match sent {
            Ok(()) => {}
            Err(DriverError::StreamUnavailable(reason)) => {
                debug!("Joystick gone: {}", reason);
                return;
            }
            Err(e) => debug!("Sample dropped: {}", e),
        }
    }

    if let Err(e) = control.release() {
        debug!("Final release dropped: {}", e);
    }
    info!("Joystick script finished");
}

// ─── Tests ──────────────────────────────────────────────────────────
