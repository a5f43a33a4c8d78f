//! Physics module
//!
//! The engine-facing seams of the grab controller, plus a small reference
//! rigid body world that implements them.

pub mod backend;
pub mod body;
pub mod collision;
pub mod world;

pub use backend::{
    BodyHandle,
    ControllerPriority,
    Damping,
    MassProperties,
    MotionControllerHandle,
    MotionControllerLease,
    MotionEvent,
    MotionOutput,
    MotionType,
    PhysicsBackend,
    PhysicsObject,
    SimResult,
};
pub use body::{RigidBody, RigidBodyDesc};
pub use collision::{BoundingSphere, Collider, Ray, RayHit, WorldQuery};
pub use world::PhysicsWorld;
