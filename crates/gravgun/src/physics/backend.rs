//! Physics engine abstraction consumed by the grab controller
//!
//! The controller never talks to a concrete engine. It sees three seams:
//!
//! - [`PhysicsBackend`]: body queries, damping, and motion controller registration
//! - [`MotionControllerLease`]: the owning side of one registration
//! - [`PhysicsObject`]: the read-only kinematic view of one body during a substep
//! - [`MotionEvent`]: the callback the engine invokes once per substep per registration
//!
//! Conventions follow the classic rigid body engines: linear quantities are in
//! the world frame, angular velocity and angular acceleration are in the body
//! frame (principal axes), so per-axis inertia bounds apply directly.

use std::sync::Arc;

use crate::foundation::collections::new_key_type;
use crate::foundation::math::{Quat, Transform, Vec3};

new_key_type! {
    /// Generational handle to a rigid body
    pub struct BodyHandle;

    /// Generational handle to a motion controller registration
    pub struct MotionControllerHandle;
}

/// How the engine moves a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionType {
    /// Fully simulated; responds to forces
    Dynamic,
    /// Moved by game code, pushes dynamic bodies
    Kinematic,
    /// Never moves
    Static,
}

/// Velocity damping coefficients (per second)
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Damping {
    /// Linear velocity damping
    pub linear: f32,
    /// Angular velocity damping
    pub angular: f32,
}

impl Damping {
    /// Create damping coefficients
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }
}

/// Mass and principal-axis inertia of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Mass in kilograms
    pub mass: f32,
    /// `1 / mass`, zero for infinite mass
    pub inverse_mass: f32,
    /// Inverse principal moments of inertia, body frame
    pub inverse_inertia: Vec3,
}

impl MassProperties {
    /// Build from mass and principal moments; non-positive values mean "infinite"
    pub fn new(mass: f32, inertia: Vec3) -> Self {
        let invert = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };
        Self {
            mass: mass.max(0.0),
            inverse_mass: invert(mass),
            inverse_inertia: inertia.map(invert),
        }
    }

    /// Solid sphere of the given mass and radius
    pub fn sphere(mass: f32, radius: f32) -> Self {
        let moment = 0.4 * mass * radius * radius;
        Self::new(mass, Vec3::repeat(moment))
    }

    /// Solid box of the given mass and half extents
    pub fn cuboid(mass: f32, half_extents: Vec3) -> Self {
        let size = half_extents * 2.0;
        let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
        let k = mass / 12.0;
        Self::new(mass, Vec3::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2)))
    }
}

/// Ordering of motion controllers within a substep; higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControllerPriority {
    /// Ambient effects
    Low,
    /// Default
    Normal,
    /// Player-driven controllers that must not be overridden
    High,
}

/// How the engine should interpret a [`MotionOutput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimResult {
    /// Apply nothing this substep
    Nothing,
    /// Linear acceleration in world frame, angular in body frame; mass already accounted for
    GlobalAcceleration,
}

/// Result of one motion controller invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOutput {
    /// Linear acceleration
    pub linear: Vec3,
    /// Angular acceleration, body frame
    pub angular: Vec3,
    /// Interpretation
    pub mode: SimResult,
}

impl MotionOutput {
    /// Apply nothing
    pub fn nothing() -> Self {
        Self {
            linear: Vec3::zeros(),
            angular: Vec3::zeros(),
            mode: SimResult::Nothing,
        }
    }

    /// Mass-normalized accelerations
    pub fn global_acceleration(linear: Vec3, angular: Vec3) -> Self {
        Self {
            linear,
            angular,
            mode: SimResult::GlobalAcceleration,
        }
    }

    /// Whether the engine will apply anything
    pub fn is_nothing(&self) -> bool {
        self.mode == SimResult::Nothing
    }
}

/// Owning side of a motion controller registration
///
/// The engine only keeps a weak reference to the lease. Once the lease is
/// dropped the registration is abandoned: queries stop reporting it, and the
/// engine releases it on its next mutable call, putting back the damping that
/// was recorded when it was created.
#[derive(Debug)]
pub struct MotionControllerLease {
    handle: MotionControllerHandle,
    _owner: Arc<()>,
}

impl MotionControllerLease {
    /// Wrap a freshly created registration; the engine keeps `Arc::downgrade(&owner)`
    pub fn new(handle: MotionControllerHandle, owner: Arc<()>) -> Self {
        Self { handle, _owner: owner }
    }

    /// Registration this lease keeps alive
    pub fn handle(&self) -> MotionControllerHandle {
        self.handle
    }
}

/// Live kinematic state of one body, as seen by a motion controller
pub trait PhysicsObject {
    /// Center of mass position, world frame
    fn position(&self) -> Vec3;

    /// Orientation
    fn rotation(&self) -> Quat;

    /// Linear velocity, world frame
    fn velocity(&self) -> Vec3;

    /// Angular velocity, body frame
    fn angular_velocity(&self) -> Vec3;

    /// Mass and inertia
    fn mass_properties(&self) -> MassProperties;

    /// Body transform
    fn transform(&self) -> Transform {
        Transform::from_position_rotation(self.position(), self.rotation())
    }

    /// Map a body-local point to world space
    fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.transform().transform_point(local)
    }

    /// Map a world point into the body frame
    fn world_to_local(&self, world: Vec3) -> Vec3 {
        self.transform().inverse_transform_point(world)
    }

    /// Split a linear acceleration applied at `world_point` into center acceleration
    /// (world frame) and angular acceleration (body frame)
    fn calculate_force_offset(&self, acceleration: Vec3, world_point: Vec3) -> (Vec3, Vec3) {
        let props = self.mass_properties();
        let lever = world_point - self.position();
        let world_torque = lever.cross(&(acceleration * props.mass));
        let local_torque = self.rotation().inverse_transform_vector(&world_torque);
        (acceleration, props.inverse_inertia.component_mul(&local_torque))
    }
}

/// Body store and motion controller registry of a physics engine
pub trait PhysicsBackend {
    /// Whether the handle refers to a live body
    fn contains(&self, body: BodyHandle) -> bool;

    /// Motion type of a live body
    fn motion_type(&self, body: BodyHandle) -> Option<MotionType>;

    /// Read view of a live body
    fn object(&self, body: BodyHandle) -> Option<&dyn PhysicsObject>;

    /// Current damping of a live body
    fn damping(&self, body: BodyHandle) -> Option<Damping>;

    /// Replace damping; returns false when the body is gone
    fn set_damping(&mut self, body: BodyHandle, damping: Damping) -> bool;

    /// Wake a sleeping body
    fn wake(&mut self, body: BodyHandle);

    /// Whether the body is asleep (false for missing bodies)
    fn is_asleep(&self, body: BodyHandle) -> bool;

    /// Register a motion controller on a body
    ///
    /// `release_damping` is put back on the body if the lease is dropped
    /// without [`destroy_motion_controller`](Self::destroy_motion_controller).
    fn create_motion_controller(
        &mut self,
        body: BodyHandle,
        priority: ControllerPriority,
        release_damping: Damping,
    ) -> Option<MotionControllerLease>;

    /// Release a registration; stale leases are ignored
    fn destroy_motion_controller(&mut self, lease: MotionControllerLease);

    /// Release every registration whose lease has been dropped
    fn release_abandoned(&mut self);

    /// Body a registration drives, if both are still alive
    fn motion_controller_body(&self, handle: MotionControllerHandle) -> Option<BodyHandle>;

    /// Number of live, owned registrations on a body
    fn motion_controller_count(&self, body: BodyHandle) -> usize;
}

/// Callback invoked by the engine once per substep for its registration
pub trait MotionEvent {
    /// Registration this event answers for; `None` means "skip me"
    fn registration(&self) -> Option<MotionControllerHandle>;

    /// Compute accelerations for the registered body over `delta_time`
    fn simulate(&mut self, object: &dyn PhysicsObject, delta_time: f32) -> MotionOutput;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct StillBody {
        position: Vec3,
        rotation: Quat,
        props: MassProperties,
    }

    impl PhysicsObject for StillBody {
        fn position(&self) -> Vec3 { self.position }
        fn rotation(&self) -> Quat { self.rotation }
        fn velocity(&self) -> Vec3 { Vec3::zeros() }
        fn angular_velocity(&self) -> Vec3 { Vec3::zeros() }
        fn mass_properties(&self) -> MassProperties { self.props }
    }

    #[test]
    fn test_mass_properties_inversion() {
        let props = MassProperties::new(4.0, Vec3::new(2.0, 0.0, 0.5));
        assert_relative_eq!(props.inverse_mass, 0.25);
        assert_relative_eq!(props.inverse_inertia, Vec3::new(0.5, 0.0, 2.0));

        let infinite = MassProperties::new(0.0, Vec3::zeros());
        assert_eq!(infinite.inverse_mass, 0.0);
    }

    #[test]
    fn test_force_offset_through_center_has_no_torque() {
        let body = StillBody {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_euler_angles(0.1, 0.2, 0.3),
            props: MassProperties::sphere(10.0, 0.5),
        };
        let accel = Vec3::new(0.0, 0.0, 5.0);
        let (linear, angular) = body.calculate_force_offset(accel, body.position + accel * 3.0);

        assert_relative_eq!(linear, accel);
        assert_relative_eq!(angular, Vec3::zeros(), epsilon = 1e-4);
    }

    #[test]
    fn test_force_offset_lever_spins_body() {
        let body = StillBody {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            props: MassProperties::sphere(10.0, 0.5),
        };
        // Pushing +Y at +X spins around +Z
        let (_, angular) = body.calculate_force_offset(Vec3::y(), Vec3::x());
        assert!(angular.z > 0.0);
        assert_relative_eq!(angular.x, 0.0);
        assert_relative_eq!(angular.y, 0.0);
    }

    #[test]
    fn test_priority_order() {
        assert!(ControllerPriority::High > ControllerPriority::Normal);
        assert!(ControllerPriority::Normal > ControllerPriority::Low);
    }
}
