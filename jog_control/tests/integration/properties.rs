//! Integration test: numeric properties of the pipeline (proptest).

use jog_common::geometry::{Vec3, WorkEnvelope};
use jog_common::machine::AxisDeltas;
use proptest::prelude::*;

use jog_control::pacer::CommandPacer;
use jog_control::proportional::ProportionalJogController;
use jog_control::soft_limit::{filter_axis, filter_movement_with_buffer, filter_proportional};

fn axis() -> impl Strategy<Value = f64> {
    -1.5f64..1.5
}

fn inside() -> impl Strategy<Value = Vec3> {
    (-100.0f64..0.0, -100.0f64..0.0, -100.0f64..0.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn cube() -> WorkEnvelope {
    WorkEnvelope::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::ZERO)
}

proptest! {
    #[test]
    fn magnitude_never_exceeds_one(x in axis(), y in axis(), z in axis(), feed in 1.0f64..10_000.0) {
        let out = ProportionalJogController::default().process_3d(Vec3::new(x, y, z), feed, 25, None, None);
        prop_assert!(out.magnitude <= 1.0 + 1e-12);
        prop_assert!(out.scaled_feed_rate <= feed.round() + 1e-9);
    }

    #[test]
    fn dead_zone_is_always_inactive(angle in 0.0f64..std::f64::consts::TAU, r in 0.0f64..0.0499) {
        let out = ProportionalJogController::default()
            .process_2d(r * angle.cos(), r * angle.sin(), 1000.0, 25, None, None);
        prop_assert!(!out.is_active);
    }

    #[test]
    fn filter_never_grows_or_reverses(req in -50.0f64..50.0, pos in -100.0f64..0.0, buffer in 0.0f64..5.0) {
        let out = filter_axis(req, pos, -100.0, 0.0, buffer);
        prop_assert!(out.abs() <= req.abs());
        prop_assert!(out == 0.0 || out.signum() == req.signum());
    }

    #[test]
    fn filtered_move_stays_inside_buffer(req in (-50.0f64..50.0, -50.0f64..50.0, -50.0f64..50.0), pos in inside()) {
        let env = cube();
        let buffer = 1.0;
        let requested = Vec3::new(req.0, req.1, req.2);
        let end = pos + filter_movement_with_buffer(requested, pos, Some(&env), buffer);
        for (p, e, lo, hi) in [
            (pos.x, end.x, env.min.x, env.max.x),
            (pos.y, end.y, env.min.y, env.max.y),
            (pos.z, end.z, env.min.z, env.max.z),
        ] {
            // Either inside the buffered box, or no further out than the start.
            let limit_hi = (hi - buffer).max(p);
            let limit_lo = (lo + buffer).min(p);
            prop_assert!(e <= limit_hi + 1e-9);
            prop_assert!(e >= limit_lo - 1e-9);
        }
    }

    #[test]
    fn no_envelope_is_identity(x in axis(), y in axis(), z in axis(), pos in inside(), base in 0.01f64..100.0) {
        let raw = Vec3::new(x, y, z);
        prop_assert_eq!(filter_proportional(raw, pos, None, base, 1.0), raw);
    }

    #[test]
    fn interval_within_bounds(blocks in 0u32..200, max in 0u32..200) {
        let i = CommandPacer::default().calculate_command_interval(blocks, max);
        prop_assert!((20..=100).contains(&i));
    }

    #[test]
    fn noise_floor_leaves_no_sub_threshold_axis(x in -0.01f64..0.01, y in -0.01f64..0.01) {
        let d = AxisDeltas { x, y, ..Default::default() }.without_noise(0.001);
        prop_assert!(d.x == 0.0 || d.x.abs() >= 0.001);
        prop_assert!(d.y == 0.0 || d.y.abs() >= 0.001);
        prop_assert_eq!(d.is_meaningful(0.001), d.x != 0.0 || d.y != 0.0);
    }
}
