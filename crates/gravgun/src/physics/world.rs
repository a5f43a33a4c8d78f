//! Reference physics world
//!
//! A deterministic, single-threaded rigid body integrator implementing the
//! engine seams the grab controller needs. It is deliberately small: no
//! contacts, only gravity, damping, and motion controllers. Games embed their
//! own engine behind [`PhysicsBackend`]; this one drives tests and the demo.

use std::sync::{Arc, Weak};

use log::{debug, trace};

use crate::foundation::collections::HandleMap;
use crate::foundation::math::{Vec3, constants::EPSILON};
use crate::physics::backend::{
    BodyHandle, ControllerPriority, Damping, MotionControllerHandle, MotionControllerLease,
    MotionEvent, MotionOutput, MotionType, PhysicsBackend, PhysicsObject, SimResult,
};
use crate::physics::body::{RigidBody, RigidBodyDesc};
use crate::physics::collision::{
    intersect_plane, BoundingSphere, Collider, Ray, RayHit, WorldQuery,
};

/// A motion controller registration
#[derive(Debug, Clone)]
struct Registration {
    body: BodyHandle,
    priority: ControllerPriority,
    owner: Weak<()>,
    release_damping: Damping,
}

impl Registration {
    /// The lease was dropped without destroying the registration
    fn is_abandoned(&self) -> bool {
        self.owner.strong_count() == 0
    }
}

/// Rigid body world with motion controller support
pub struct PhysicsWorld {
    bodies: HandleMap<BodyHandle, RigidBody>,
    controllers: HandleMap<MotionControllerHandle, Registration>,
    gravity: Vec3,
}

impl PhysicsWorld {
    /// Create an empty world without gravity
    pub fn new() -> Self {
        Self {
            bodies: HandleMap::with_key(),
            controllers: HandleMap::with_key(),
            gravity: Vec3::zeros(),
        }
    }

    /// Set gravity (world frame, m/s²)
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Gravity acceleration
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Add a body
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        self.bodies.insert(desc.build())
    }

    /// Remove a body and every registration that drives it
    pub fn remove_body(&mut self, body: BodyHandle) -> Option<RigidBody> {
        let removed = self.bodies.remove(body)?;
        self.controllers.retain(|handle, registration| {
            let keep = registration.body != body;
            if !keep {
                debug!("Dropping motion controller {:?} with removed body {:?}", handle, body);
            }
            keep
        });
        Some(removed)
    }

    /// Borrow a body
    pub fn body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(body)
    }

    /// Mutably borrow a body
    pub fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(body)
    }

    /// Put a body to sleep or wake it
    pub fn set_sleeping(&mut self, body: BodyHandle, asleep: bool) {
        if let Some(rigid_body) = self.bodies.get_mut(body) {
            rigid_body.asleep = asleep;
        }
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live, owned motion controller registrations
    pub fn motion_controller_total(&self) -> usize {
        self.controllers.values().filter(|r| !r.is_abandoned()).count()
    }

    /// Advance one substep
    ///
    /// Abandoned registrations are released first. Each event whose
    /// registration is alive is simulated against its body, highest priority
    /// first; events without a live registration are skipped. Then every
    /// dynamic body is integrated under gravity plus the summed controller
    /// accelerations.
    pub fn step(&mut self, delta_time: f32, events: &mut [&mut dyn MotionEvent]) {
        self.release_abandoned();
        if !(delta_time > 0.0) {
            return;
        }

        let mut order: Vec<(usize, ControllerPriority, BodyHandle)> = events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                let handle = event.registration()?;
                let registration = self.controllers.get(handle)?;
                self.bodies
                    .contains_key(registration.body)
                    .then_some((index, registration.priority, registration.body))
            })
            .collect();
        // Stable sort keeps caller order within a priority
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let mut pending: Vec<(BodyHandle, MotionOutput)> = Vec::with_capacity(order.len());
        for (index, _, body) in order {
            let Some(rigid_body) = self.bodies.get(body) else { continue };
            let output = events[index].simulate(rigid_body, delta_time);
            if !output.is_nothing() {
                pending.push((body, output));
            }
        }

        for (body, output) in pending {
            let Some(rigid_body) = self.bodies.get_mut(body) else { continue };
            if rigid_body.motion_type != MotionType::Dynamic
                || output.mode != SimResult::GlobalAcceleration
            {
                continue;
            }
            let pushed =
                output.linear.magnitude() > EPSILON || output.angular.magnitude() > EPSILON;
            if rigid_body.asleep && pushed {
                rigid_body.asleep = false;
            }
            // Controller accelerations are applied as a velocity change now; gravity follows below
            rigid_body.velocity += output.linear * delta_time;
            rigid_body.angular_velocity += output.angular * delta_time;
        }

        let gravity = self.gravity;
        for (handle, rigid_body) in self.bodies.iter_mut() {
            rigid_body.integrate(gravity, Vec3::zeros(), delta_time);
            trace!("Body {:?} at {:?}", handle, rigid_body.transform.position);
        }
    }

    /// Advance one logical frame split into `substeps` equal substeps
    pub fn substep(
        &mut self,
        frame_time: f32,
        substeps: u32,
        events: &mut [&mut dyn MotionEvent],
    ) {
        let count = substeps.max(1);
        let delta_time = frame_time / count as f32;
        for _ in 0..count {
            self.step(delta_time, events);
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(body)
    }

    fn motion_type(&self, body: BodyHandle) -> Option<MotionType> {
        self.bodies.get(body).map(|b| b.motion_type)
    }

    fn object(&self, body: BodyHandle) -> Option<&dyn PhysicsObject> {
        self.bodies.get(body).map(|b| b as &dyn PhysicsObject)
    }

    fn damping(&self, body: BodyHandle) -> Option<Damping> {
        self.bodies.get(body).map(|b| b.damping)
    }

    fn set_damping(&mut self, body: BodyHandle, damping: Damping) -> bool {
        match self.bodies.get_mut(body) {
            Some(rigid_body) => {
                rigid_body.damping = damping;
                true
            }
            None => false,
        }
    }

    fn wake(&mut self, body: BodyHandle) {
        self.set_sleeping(body, false);
    }

    fn is_asleep(&self, body: BodyHandle) -> bool {
        self.bodies.get(body).is_some_and(|b| b.asleep)
    }

    fn create_motion_controller(
        &mut self,
        body: BodyHandle,
        priority: ControllerPriority,
        release_damping: Damping,
    ) -> Option<MotionControllerLease> {
        self.release_abandoned();
        if !self.bodies.contains_key(body) {
            return None;
        }
        let owner = Arc::new(());
        let handle = self.controllers.insert(Registration {
            body,
            priority,
            owner: Arc::downgrade(&owner),
            release_damping,
        });
        debug!("Created motion controller {:?} for body {:?} ({:?})", handle, body, priority);
        Some(MotionControllerLease::new(handle, owner))
    }

    fn destroy_motion_controller(&mut self, lease: MotionControllerLease) {
        let handle = lease.handle();
        drop(lease);
        if self.controllers.remove(handle).is_some() {
            debug!("Destroyed motion controller {:?}", handle);
        }
    }

    fn release_abandoned(&mut self) {
        let bodies = &mut self.bodies;
        self.controllers.retain(|handle, registration| {
            if !registration.is_abandoned() {
                return true;
            }
            if let Some(rigid_body) = bodies.get_mut(registration.body) {
                rigid_body.damping = registration.release_damping;
                rigid_body.asleep = false;
            }
            debug!(
                "Released abandoned motion controller {:?} on body {:?}",
                handle, registration.body
            );
            false
        });
    }

    fn motion_controller_body(&self, handle: MotionControllerHandle) -> Option<BodyHandle> {
        let registration = self.controllers.get(handle)?;
        let live = !registration.is_abandoned() && self.bodies.contains_key(registration.body);
        live.then_some(registration.body)
    }

    fn motion_controller_count(&self, body: BodyHandle) -> usize {
        self.controllers
            .values()
            .filter(|r| r.body == body && !r.is_abandoned())
            .count()
    }
}

impl WorldQuery for PhysicsWorld {
    fn cast_ray(&self, ray: &Ray, max_distance: f32, ignore: &[BodyHandle]) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;

        for (handle, body) in self.bodies.iter() {
            if ignore.contains(&handle) {
                continue;
            }
            let hit = match body.collider {
                Collider::Sphere { radius } => {
                    BoundingSphere::new(body.transform.position, radius).intersect_ray(ray)
                }
                Collider::Plane { normal } => intersect_plane(ray, body.transform.position, normal),
            };
            let Some((distance, point, normal)) = hit else { continue };
            if distance > max_distance {
                continue;
            }
            if best.map_or(true, |b| distance < b.distance) {
                let fraction = if max_distance > 0.0 { distance / max_distance } else { 0.0 };
                best = Some(RayHit { body: handle, distance, fraction, point, normal });
            }
        }

        best
    }
}
