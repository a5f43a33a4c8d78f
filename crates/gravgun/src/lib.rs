//! # Gravgun
//!
//! A physics manipulation controller: grab a rigid body at any point, drag it
//! towards a target under velocity and acceleration limits, and optionally
//! seat it flush against a surface.
//!
//! ## Features
//!
//! - **Bounded control law**: speed, acceleration, and per-axis angular limits
//!   derived from mass and inertia
//! - **Off-center grabs**: the grabbed spot is driven, so pulls induce natural spin
//! - **Alignment mode**: rotate a face onto a surface normal, then seat it
//! - **Engine agnostic**: talks to physics through the [`physics::PhysicsBackend`] seam
//! - **Reference world**: a small deterministic integrator for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gravgun::prelude::*;
//!
//! let config = GravityGunConfig::default();
//! let mut world = PhysicsWorld::new();
//! let crate_body = world.add_body(
//!     RigidBodyDesc::dynamic_cuboid(10.0, Vec3::new(0.5, 0.5, 0.5))
//!         .with_position(Vec3::new(5.0, 0.0, 1.0)),
//! );
//!
//! let mut grab = AttachmentController::new(&config);
//! grab.attach(&mut world, crate_body, Vec3::new(4.5, 0.0, 1.0))?;
//! grab.set_target(Vec3::new(3.0, 0.0, 2.0));
//!
//! let frame_time = 1.0 / 66.0;
//! for _ in 0..66 {
//!     world.substep(frame_time, 2, &mut [&mut grab as &mut dyn MotionEvent]);
//! }
//! grab.detach(&mut world);
//! # Ok::<(), AttachError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod grab;
pub mod physics;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        core::config::{
            Config, ConfigError, ControllerTunables, GravityGunConfig, GunTunables, SolverTunables,
        },
        foundation::math::{Quat, Transform, Vec3},
        grab::{
            AimRay, AttachError, AttachmentController, ControllerSnapshot, GunEvent, HoldCommand,
            MotionSolver, PhysGun,
        },
        physics::{
            BodyHandle, Damping, MotionControllerLease, MotionEvent, MotionType, PhysicsBackend,
            PhysicsObject, PhysicsWorld, Ray, RigidBodyDesc, WorldQuery,
        },
    };
}
