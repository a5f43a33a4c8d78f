//! Drag mode convergence and speed bounds

use super::{anchor, controller, step, world_with_box, DT};
use crate::foundation::math::Vec3;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_offset_anchor_converges_monotonically() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let mut grab = controller();
        let attach_point = Vec3::new(1.0, 0.0, 0.0);
        let target = attach_point + Vec3::new(5.0, 0.0, 0.0);

        grab.attach(&mut world, body, attach_point).unwrap();
        grab.set_target(target);

        let max_velocity = grab.max_linear_velocity();
        let mut previous = (target - anchor(&world, body, &grab)).magnitude();
        for substep in 0..120 {
            step(&mut world, &mut grab, DT);

            let distance = (target - anchor(&world, body, &grab)).magnitude();
            assert!(
                distance <= previous + 1e-4,
                "substep {substep}: distance grew from {previous} to {distance}"
            );
            assert!(grab.last_report().implied_velocity.magnitude() <= max_velocity + 1e-3);
            assert!(world.body(body).unwrap().velocity.magnitude() <= max_velocity + 1e-3);
            previous = distance;
        }

        assert_relative_eq!(anchor(&world, body, &grab), target, epsilon = 1e-3);
        grab.detach(&mut world);
    }

    #[test]
    fn test_huge_displacement_still_clamps() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        grab.set_target(Vec3::new(10_000.0, -10_000.0, 10_000.0));

        for _ in 0..30 {
            step(&mut world, &mut grab, DT);
            let report = grab.last_report();
            assert!(!report.skipped);
            assert!(report.implied_velocity.magnitude() <= grab.max_linear_velocity() + 1e-3);
        }
        grab.detach(&mut world);
    }

    #[test]
    fn test_pacing_window_never_grows() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        grab.set_target(Vec3::new(0.0, 2.0, 0.0));

        let mut previous = grab.time_to_arrive();
        for _ in 0..6 {
            step(&mut world, &mut grab, DT / 4.0);
            let remaining = grab.time_to_arrive();
            let fraction = grab.last_report().fraction;
            assert!(remaining <= previous);
            assert!(remaining >= 0.0);
            assert!((0.0..=1.0).contains(&fraction));
            previous = remaining;
        }
        assert_eq!(grab.time_to_arrive(), 0.0);
        assert_relative_eq!(grab.last_report().fraction, 1.0);
        grab.detach(&mut world);
    }

    #[test]
    fn test_anchor_tracks_moving_target() {
        let (mut world, body) = world_with_box(Vec3::new(0.0, 0.0, 1.0));
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::new(0.5, 0.0, 1.0)).unwrap();

        // Target sweeps sideways at 3 m/s, well under the speed cap
        let mut target = Vec3::new(0.5, 0.0, 1.0);
        for _ in 0..132 {
            target.y += 3.0 * DT;
            grab.set_target(target);
            step(&mut world, &mut grab, DT / 2.0);
            step(&mut world, &mut grab, DT / 2.0);
        }

        assert_relative_eq!(anchor(&world, body, &grab), target, epsilon = 0.1);
        grab.detach(&mut world);
    }

    #[test]
    fn test_world_position_reports_last_anchor() {
        let (mut world, body) = world_with_box(Vec3::new(2.0, 0.0, 0.0));
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        grab.set_target(Vec3::new(3.0, 1.0, 0.0));

        let before = anchor(&world, body, &grab);
        step(&mut world, &mut grab, DT);
        assert_relative_eq!(grab.world_position(), before, epsilon = 1e-5);
        grab.detach(&mut world);
    }
}
