//! Rigid body state for the reference physics world
//!
//! Velocity, angular velocity, damping, and a semi-implicit integration step.
//! Angular velocity is kept in the body frame.

use crate::foundation::math::{constants::EPSILON, Quat, Transform, Vec3};
use crate::physics::backend::{Damping, MassProperties, MotionType, PhysicsObject};
use crate::physics::collision::Collider;

/// A simulated rigid body
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Center of mass position and orientation
    pub transform: Transform,

    /// Linear velocity in metres per second, world frame
    pub velocity: Vec3,

    /// Angular velocity in radians per second, body frame
    pub angular_velocity: Vec3,

    /// Mass and inertia
    pub mass_properties: MassProperties,

    /// Velocity damping per second (0 = none)
    pub damping: Damping,

    /// How the body moves
    pub motion_type: MotionType,

    /// Shape for ray queries
    pub collider: Collider,

    /// Sleeping bodies are not integrated
    pub asleep: bool,
}

impl RigidBody {
    /// Integrate one step under the given world-frame linear and body-frame angular accelerations
    pub fn integrate(&mut self, linear: Vec3, angular: Vec3, delta_time: f32) {
        if self.motion_type != MotionType::Dynamic || self.asleep {
            return;
        }

        self.velocity += linear * delta_time;
        self.angular_velocity += angular * delta_time;

        // Apply damping
        if self.damping.linear > 0.0 {
            self.velocity *= (1.0 - self.damping.linear * delta_time).max(0.0);
        }
        if self.damping.angular > 0.0 {
            self.angular_velocity *= (1.0 - self.damping.angular * delta_time).max(0.0);
        }

        self.transform.position += self.velocity * delta_time;

        // Body-frame angular velocity composes on the right
        let spin = Quat::from_scaled_axis(self.angular_velocity * delta_time);
        let rotation = self.transform.rotation * spin;
        self.transform.rotation = Quat::new_normalize(rotation.into_inner());
    }

    /// Stop all movement
    pub fn stop(&mut self) {
        self.velocity = Vec3::zeros();
        self.angular_velocity = Vec3::zeros();
    }
}

impl PhysicsObject for RigidBody {
    fn position(&self) -> Vec3 {
        self.transform.position
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn mass_properties(&self) -> MassProperties {
        self.mass_properties
    }

    fn transform(&self) -> Transform {
        self.transform
    }
}

/// Builder for rigid bodies
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    body: RigidBody,
}

impl RigidBodyDesc {
    /// Dynamic sphere of the given mass and radius
    pub fn dynamic_sphere(mass: f32, radius: f32) -> Self {
        Self {
            body: RigidBody {
                transform: Transform::identity(),
                velocity: Vec3::zeros(),
                angular_velocity: Vec3::zeros(),
                mass_properties: MassProperties::sphere(mass, radius),
                damping: Damping::default(),
                motion_type: MotionType::Dynamic,
                collider: Collider::Sphere { radius },
                asleep: false,
            },
        }
    }

    /// Dynamic box, ray-queried through its bounding sphere
    pub fn dynamic_cuboid(mass: f32, half_extents: Vec3) -> Self {
        let mut desc = Self::dynamic_sphere(mass, half_extents.magnitude());
        desc.body.mass_properties = MassProperties::cuboid(mass, half_extents);
        desc
    }

    /// Static plane through `point` facing `normal`
    pub fn static_plane(point: Vec3, normal: Vec3) -> Self {
        let mut desc = Self::dynamic_sphere(0.0, 0.0);
        desc.body.transform.position = point;
        desc.body.mass_properties = MassProperties::new(0.0, Vec3::zeros());
        desc.body.motion_type = MotionType::Static;
        desc.body.collider = Collider::Plane {
            normal: normal.try_normalize(EPSILON).unwrap_or_else(Vec3::z),
        };
        desc
    }

    /// Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.body.transform.position = position;
        self
    }

    /// Set orientation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.body.transform.rotation = rotation;
        self
    }

    /// Set initial velocities
    pub fn with_velocity(mut self, velocity: Vec3, angular_velocity: Vec3) -> Self {
        self.body.velocity = velocity;
        self.body.angular_velocity = angular_velocity;
        self
    }

    /// Set damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.body.damping = Damping::new(linear, angular);
        self
    }

    /// Set motion type
    pub fn with_motion_type(mut self, motion_type: MotionType) -> Self {
        self.body.motion_type = motion_type;
        self
    }

    /// Override mass properties
    pub fn with_mass_properties(mut self, mass_properties: MassProperties) -> Self {
        self.body.mass_properties = mass_properties;
        self
    }

    /// Start asleep
    pub fn sleeping(mut self) -> Self {
        self.body.asleep = true;
        self
    }

    /// Finish the body
    pub fn build(self) -> RigidBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integrate_linear() {
        let mut body = RigidBodyDesc::dynamic_sphere(1.0, 0.5).build();
        body.integrate(Vec3::new(0.0, 0.0, 2.0), Vec3::zeros(), 0.5);

        assert_relative_eq!(body.velocity, Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(body.transform.position, Vec3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_integrate_spin_in_body_frame() {
        let quarter = Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2);
        let mut body = RigidBodyDesc::dynamic_sphere(1.0, 0.5)
            .with_rotation(quarter)
            .with_velocity(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0))
            .build();
        body.integrate(Vec3::zeros(), Vec3::zeros(), 0.1);

        // Body Z maps to world -Y after the quarter turn about X
        let expected = quarter * Quat::from_axis_angle(&Vec3::z_axis(), 0.1);
        assert_relative_eq!(body.transform.rotation, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_damping_never_reverses_velocity() {
        let mut body = RigidBodyDesc::dynamic_sphere(1.0, 0.5)
            .with_velocity(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0))
            .with_damping(100.0, 100.0)
            .build();
        body.integrate(Vec3::zeros(), Vec3::zeros(), 0.1);

        assert_eq!(body.velocity, Vec3::zeros());
        assert_eq!(body.angular_velocity, Vec3::zeros());
    }

    #[test]
    fn test_static_and_sleeping_bodies_hold_still() {
        let mut plane = RigidBodyDesc::static_plane(Vec3::zeros(), Vec3::z()).build();
        plane.integrate(Vec3::new(0.0, 0.0, -9.81), Vec3::zeros(), 1.0);
        assert_eq!(plane.transform.position, Vec3::zeros());

        let mut sleeper = RigidBodyDesc::dynamic_sphere(1.0, 0.5).sleeping().build();
        sleeper.integrate(Vec3::new(0.0, 0.0, -9.81), Vec3::zeros(), 1.0);
        assert_eq!(sleeper.velocity, Vec3::zeros());
    }
}
