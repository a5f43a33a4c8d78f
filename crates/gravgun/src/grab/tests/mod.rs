//! Scenario tests driving the controller through the reference physics world

mod convergence;
mod lifecycle;

use crate::core::config::GravityGunConfig;
use crate::foundation::math::Vec3;
use crate::grab::AttachmentController;
use crate::physics::backend::{BodyHandle, MotionEvent};
use crate::physics::body::RigidBodyDesc;
use crate::physics::world::PhysicsWorld;

/// Substep length used throughout
const DT: f32 = 1.0 / 66.0;

fn controller() -> AttachmentController {
    AttachmentController::new(&GravityGunConfig::default())
}

/// Gravity-free world with a 10 kg box (2 x 1 x 1 m) at `position`
fn world_with_box(position: Vec3) -> (PhysicsWorld, BodyHandle) {
    let mut world = PhysicsWorld::new();
    let body = world.add_body(
        RigidBodyDesc::dynamic_cuboid(10.0, Vec3::new(1.0, 0.5, 0.5))
            .with_position(position)
            .with_damping(0.05, 0.25),
    );
    (world, body)
}

fn step(world: &mut PhysicsWorld, grab: &mut AttachmentController, delta_time: f32) {
    world.step(delta_time, &mut [grab as &mut dyn MotionEvent]);
}

/// Current world position of the controller's anchor
fn anchor(world: &PhysicsWorld, body: BodyHandle, grab: &AttachmentController) -> Vec3 {
    world
        .body(body)
        .map(|b| b.transform.transform_point(grab.local_attach_point()))
        .unwrap_or_else(Vec3::zeros)
}
