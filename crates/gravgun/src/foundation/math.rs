//! Math utilities and types
//!
//! Provides the fundamental math types used by the physics abstraction and
//! the grab controller. Everything is `f32`, right-handed, Z-up world.

pub use nalgebra::{Vector2, Vector3, UnitQuaternion};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid body transform: position and orientation, no scale
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,

    /// Orientation in world space
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Map a point from the local frame into world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Map a world-space point into the local frame
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&(point - self.position))
    }

    /// Rotate a local direction into world space
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Rotate a world direction into the local frame
    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&vector)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Lengths below this are treated as zero when normalizing
    pub const EPSILON: f32 = 1.0e-6;
}

/// Math utility functions
pub mod utils {
    use super::*;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }

    /// Linear fraction of `value` between `low` and `high`, times `scale`
    ///
    /// `value` is clamped into `[low, high]` first, so `line_fraction(1.5, 1.0, 2.0, 1.0)`
    /// is `0.5`. A zero-width range yields zero.
    pub fn line_fraction(value: f32, low: f32, high: f32, scale: f32) -> f32 {
        let value = clamp(value, low, high);
        let delta = high - low;
        if delta == 0.0 {
            return 0.0;
        }
        scale * (value - low) / delta
    }

    /// Move `value` toward `target` by at most `speed`
    pub fn approach(target: f32, value: f32, speed: f32) -> f32 {
        let delta = target - value;
        if delta > speed {
            value + speed
        } else if delta < -speed {
            value - speed
        } else {
            target
        }
    }

    /// Rescale `vector` so its length does not exceed `max`, keeping its direction
    pub fn clamp_magnitude(vector: Vec3, max: f32) -> Vec3 {
        let max = max.max(0.0);
        let length = vector.magnitude();
        if length > max {
            if length <= constants::EPSILON {
                return Vec3::zeros();
            }
            vector * (max / length)
        } else {
            vector
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::utils::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_point_roundtrip() {
        let transform = Transform::from_position_rotation(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_euler_angles(0.3, -0.7, 1.1),
        );
        let local = Vec3::new(0.5, 0.25, -4.0);

        let world = transform.transform_point(local);
        assert_relative_eq!(transform.inverse_transform_point(world), local, epsilon = EPSILON);

        let direction = Vec3::new(0.0, 1.0, 0.0);
        let rotated = transform.transform_vector(direction);
        assert_relative_eq!(rotated.magnitude(), 1.0, epsilon = EPSILON);
        let back = transform.inverse_transform_vector(rotated);
        assert_relative_eq!(back, direction, epsilon = EPSILON);
    }

    #[test]
    fn test_line_fraction() {
        assert_relative_eq!(line_fraction(1.5, 1.0, 2.0, 1.0), 0.5);
        assert_relative_eq!(line_fraction(-3.0, 0.0, 10.0, 60.0), 0.0);
        assert_relative_eq!(line_fraction(30.0, 0.0, 10.0, 60.0), 60.0);
        assert_eq!(line_fraction(5.0, 2.0, 2.0, 1.0), 0.0);
    }

    #[test]
    fn test_approach() {
        assert_relative_eq!(approach(10.0, 0.0, 2.5), 2.5);
        assert_relative_eq!(approach(-10.0, 0.0, 2.5), -2.5);
        assert_relative_eq!(approach(1.0, 0.5, 2.5), 1.0);
    }

    #[test]
    fn test_clamp_magnitude_preserves_direction() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let clamped = clamp_magnitude(v, 2.5);
        assert_relative_eq!(clamped.magnitude(), 2.5, epsilon = EPSILON);
        assert_relative_eq!(clamped.normalize(), v.normalize(), epsilon = EPSILON);

        assert_eq!(clamp_magnitude(v, 10.0), v);
        assert_eq!(clamp_magnitude(v, 0.0), Vec3::zeros());
    }
}
