//! Attach/detach lifecycle against the engine registry

use super::{anchor, controller, step, world_with_box, DT};
use crate::foundation::math::{Quat, Vec3};
use crate::grab::AttachError;
use crate::physics::backend::{Damping, MotionType, PhysicsBackend};
use crate::physics::body::RigidBodyDesc;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_anchor_matches_attach_point() {
        let (mut world, body) = world_with_box(Vec3::new(4.0, -2.0, 1.5));
        world.body_mut(body).unwrap().transform.rotation = Quat::from_euler_angles(0.4, -1.1, 2.0);
        let mut grab = controller();
        let attach_point = Vec3::new(4.3, -1.8, 1.9);

        grab.attach(&mut world, body, attach_point).unwrap();

        assert_relative_eq!(anchor(&world, body, &grab), attach_point, epsilon = 1e-5);
        assert_eq!(grab.world_position(), attach_point);
        assert_eq!(grab.target_position(), attach_point);
        assert_relative_eq!(
            grab.target_rotation(),
            world.body(body).unwrap().transform.rotation,
            epsilon = 1e-6
        );
        grab.detach(&mut world);
    }

    #[test]
    fn test_detach_restores_damping_and_allows_reattach() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let original = world.damping(body).unwrap();
        let mut grab = controller();

        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        grab.set_target(Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..10 {
            step(&mut world, &mut grab, DT);
        }
        grab.detach(&mut world);

        assert_eq!(world.damping(body), Some(original));
        assert_eq!(world.motion_controller_count(body), 0);
        assert!(!grab.is_attached());
        assert_eq!(grab.target_position(), Vec3::zeros());
        assert_eq!(grab.world_position(), Vec3::zeros());

        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        assert_eq!(world.motion_controller_count(body), 1);
        assert_eq!(grab.saved_damping(), original);
        grab.detach(&mut world);
        assert_eq!(world.damping(body), Some(original));
    }

    #[test]
    fn test_detach_without_body_is_noop() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        world.set_damping(body, Damping::new(0.5, 0.5));
        let mut grab = controller();
        grab.set_target(Vec3::new(1.0, 1.0, 1.0));

        grab.detach(&mut world);
        grab.detach(&mut world);

        assert!(!grab.is_attached());
        assert_eq!(world.damping(body), Some(Damping::new(0.5, 0.5)));
        // Idle detach leaves the marker alone
        assert_eq!(grab.target_position(), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_body_destroyed_mid_hold() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        grab.set_target(Vec3::new(5.0, 0.0, 0.0));
        step(&mut world, &mut grab, DT);

        world.remove_body(body);
        let before = *grab.last_report();
        // The engine skips the dead registration: no solve happens
        step(&mut world, &mut grab, DT);
        assert_eq!(*grab.last_report(), before);

        assert!(!grab.sync(&mut world));
        assert!(!grab.is_attached());
        assert_eq!(world.motion_controller_total(), 0);
        grab.detach(&mut world);
    }

    #[test]
    fn test_reused_slot_is_not_mistaken_for_held_body() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::zeros()).unwrap();

        world.remove_body(body);
        let newcomer = world.add_body(RigidBodyDesc::dynamic_sphere(1.0, 0.5));
        assert_ne!(newcomer, body);

        assert!(!grab.sync(&mut world));
        assert_eq!(world.motion_controller_count(newcomer), 0);
    }

    #[test]
    fn test_dropped_controller_hands_body_back() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let original = world.damping(body).unwrap();
        {
            let mut grab = controller();
            grab.attach(&mut world, body, Vec3::zeros()).unwrap();
            grab.set_target(Vec3::new(2.0, 0.0, 0.0));
            step(&mut world, &mut grab, DT);
            assert_eq!(world.motion_controller_count(body), 1);
        }
        assert_eq!(world.motion_controller_count(body), 0);

        // The next grab sees the body's own damping, not the held value
        let mut next = controller();
        next.attach(&mut world, body, Vec3::zeros()).unwrap();
        assert_eq!(next.saved_damping(), original);
        assert_eq!(world.motion_controller_count(body), 1);

        next.detach(&mut world);
        assert_eq!(world.damping(body), Some(original));
        assert_eq!(world.motion_controller_total(), 0);
    }

    #[test]
    fn test_dropped_controller_released_on_next_step() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let original = world.damping(body).unwrap();
        let mut grab = controller();
        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        assert_ne!(world.damping(body), Some(original));

        drop(grab);
        world.step(DT, &mut []);

        assert_eq!(world.damping(body), Some(original));
        assert_eq!(world.motion_controller_total(), 0);
    }

    #[test]
    fn test_attach_wakes_sleeping_body() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        world.set_sleeping(body, true);
        let mut grab = controller();

        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        assert!(!world.is_asleep(body));
        grab.detach(&mut world);
    }

    #[test]
    fn test_failed_attach_leaves_world_untouched() {
        let (mut world, body) = world_with_box(Vec3::zeros());
        let wall = world.add_body(
            RigidBodyDesc::dynamic_sphere(5.0, 1.0)
                .with_motion_type(MotionType::Kinematic)
                .with_damping(0.3, 0.3),
        );
        let mut grab = controller();

        let result = grab.attach(&mut world, wall, Vec3::zeros());
        assert!(matches!(result, Err(AttachError::NotDynamic(_))));
        assert_eq!(world.damping(wall), Some(Damping::new(0.3, 0.3)));
        assert_eq!(world.motion_controller_total(), 0);

        grab.attach(&mut world, body, Vec3::zeros()).unwrap();
        grab.detach(&mut world);
    }
}
