//! Ray queries against the world
//!
//! The grab controller itself never casts rays; the weapon driver does, to
//! find something to grab and to keep the held body out of walls. Engines
//! provide [`WorldQuery`]; the reference [`PhysicsWorld`](super::PhysicsWorld)
//! answers it with sphere and plane colliders.

use crate::foundation::math::{constants::EPSILON, Vec3};
use crate::physics::backend::BodyHandle;

/// A ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// A zero direction is replaced by +X so the ray stays well-formed.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(EPSILON).unwrap_or_else(Vec3::x),
        }
    }

    /// Ray from `start` towards `end`, with the segment length
    pub fn between(start: Vec3, end: Vec3) -> (Self, f32) {
        let delta = end - start;
        (Self::new(start, delta), delta.magnitude())
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The body that was hit
    pub body: BodyHandle,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// `distance / max_distance`, in [0, 1]
    pub fraction: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

/// Shape used for ray queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    /// Sphere centred on the body
    Sphere {
        /// Radius in metres
        radius: f32,
    },
    /// Infinite plane through the body position, facing `normal` (world frame)
    Plane {
        /// Unit normal
        normal: Vec3,
    },
}

/// A bounding sphere for collision detection
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Ray-sphere intersection: distance, point, and normal of the first hit ahead of the origin
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        // Solve: |origin + t*direction - center|^2 = radius^2 with |direction| = 1
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = -b - sqrt_discriminant;
        let t2 = -b + sqrt_discriminant;

        // Origin inside the sphere hits at t = 0
        let t = if t1 >= 0.0 {
            t1
        } else if t2 >= 0.0 {
            0.0
        } else {
            return None;
        };

        let hit_point = ray.point_at(t);
        let normal = (hit_point - self.center)
            .try_normalize(EPSILON)
            .unwrap_or(-ray.direction);

        Some((t, hit_point, normal))
    }
}

/// Ray-plane intersection for a plane through `point` with unit `normal`
///
/// Only the front face is hit; rays parallel to the plane miss.
pub fn intersect_plane(ray: &Ray, point: Vec3, normal: Vec3) -> Option<(f32, Vec3, Vec3)> {
    let denom = ray.direction.dot(&normal);
    if denom > -EPSILON {
        return None;
    }
    let t = (point - ray.origin).dot(&normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some((t, ray.point_at(t), normal))
}

/// World ray casting service
pub trait WorldQuery {
    /// Nearest hit along `ray` within `max_distance`, skipping bodies in `ignore`
    fn cast_ray(&self, ray: &Ray, max_distance: f32, ignore: &[BodyHandle]) -> Option<RayHit>;
}
