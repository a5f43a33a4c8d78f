//! # Physics Gun
//!
//! The weapon-level driver around an [`AttachmentController`]. Each logical
//! frame the owner hands it the player's aim and an abstract hold command;
//! the gun casts rays, decides what to grab or drop, and pushes a new target
//! into the controller. The controller then does the actual work inside the
//! physics substeps.
//!
//! Input devices, sounds, and beam visuals belong to the caller. The gun only
//! exposes the values they are driven by ([`PhysGun::lift_pitch`],
//! [`PhysGun::mass_blend`], [`PhysGun::movement_fade`]).

use log::{debug, info};

use crate::core::config::{GravityGunConfig, GunTunables};
use crate::foundation::math::constants::EPSILON;
use crate::foundation::math::utils::{approach, line_fraction};
use crate::foundation::math::Vec3;
use crate::grab::controller::AttachmentController;
use crate::physics::backend::{BodyHandle, MotionType, PhysicsBackend};
use crate::physics::collision::{Ray, RayHit, WorldQuery};

/// Where the player is looking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimRay {
    /// Muzzle position, world frame
    pub origin: Vec3,
    /// Aim direction; need not be normalized
    pub forward: Vec3,
    /// View yaw around world up (radians)
    pub yaw: f32,
}

impl AimRay {
    /// Create an aim ray
    pub fn new(origin: Vec3, forward: Vec3, yaw: f32) -> Self {
        Self { origin, forward, yaw }
    }
}

/// Hold distance adjustment requested this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldCommand {
    /// Keep the current distance
    #[default]
    None,
    /// Move away at the configured rate
    Push,
    /// Move closer at the configured rate
    Pull,
    /// Step closer by a fraction of the distance
    ZoomIn,
    /// Step away by a fraction of the distance
    ZoomOut,
}

/// What changed during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GunEvent {
    /// Nothing was grabbed or released
    None,
    /// Started holding a body
    Attached(BodyHandle),
    /// Stopped holding a body
    Dropped(BodyHandle),
}

/// Gravity gun weapon state
///
/// Prefer [`holster`](Self::holster) before dropping the gun. A gun dropped
/// mid-hold abandons its registration and the engine hands the body back on
/// its next update.
#[derive(Debug)]
pub struct PhysGun {
    tunables: GunTunables,
    controller: AttachmentController,
    active: bool,
    distance: f32,
    last_yaw: f32,
    original_object_position: Vec3,
    movement_length: f32,
}

impl PhysGun {
    /// Create an inactive gun
    pub fn new(config: &GravityGunConfig) -> Self {
        Self {
            tunables: config.gun.clone(),
            controller: AttachmentController::new(config),
            active: false,
            distance: 0.0,
            last_yaw: 0.0,
            original_object_position: Vec3::zeros(),
            movement_length: 0.0,
        }
    }

    /// Run one logical frame of the firing gun
    pub fn update<W>(
        &mut self,
        world: &mut W,
        aim: &AimRay,
        command: HoldCommand,
        frame_time: f32,
    ) -> GunEvent
    where
        W: PhysicsBackend + WorldQuery,
    {
        let mut event = GunEvent::None;

        if !self.active {
            self.active = true;
            debug!("Gravity gun activated");
        }

        // Something removed the held body since last frame
        if let Some(body) = self.controller.attached_body() {
            if !self.controller.sync(world) {
                event = GunEvent::Dropped(body);
            }
        }

        let ray = Ray::new(aim.origin, aim.forward);
        let hit = world.cast_ray(&ray, self.tunables.max_range, &[]);
        let end = hit.map_or_else(|| ray.point_at(self.tunables.max_range), |h| h.point);

        if hit.is_some_and(|h| h.distance < self.tunables.drop_distance) {
            return match self.drop_object(world) {
                GunEvent::None => event,
                dropped => dropped,
            };
        }

        if !self.controller.is_attached() {
            let grabbable = hit.filter(|h| world.motion_type(h.body) == Some(MotionType::Dynamic));
            if let Some(hit) = grabbable {
                event = self.attach_object(world, &hit, aim.yaw);
            }
        }

        self.controller.rotate_target_yaw(aim.yaw - self.last_yaw);
        self.last_yaw = aim.yaw;

        match self.controller.attached_body() {
            Some(body) => {
                self.apply_command(command, frame_time);
                let target = self.hold_target(world, &ray, body, frame_time);
                self.controller.set_target(target);
                self.movement_length = world
                    .object(body)
                    .map_or(0.0, |object| (target - object.position()).magnitude());
            }
            // Idle beam: the target marker follows the aim point
            None => self.controller.set_target(end),
        }

        self.controller.clear_alignment();
        event
    }

    /// Trigger released: deactivate and drop whatever is held
    pub fn idle(&mut self, world: &mut dyn PhysicsBackend) -> GunEvent {
        if !self.active {
            return GunEvent::None;
        }
        self.active = false;
        debug!("Gravity gun deactivated");
        self.drop_object(world)
    }

    /// Weapon put away: always release
    pub fn holster(&mut self, world: &mut dyn PhysicsBackend) -> GunEvent {
        self.active = false;
        self.drop_object(world)
    }

    /// Release the held body, if any
    pub fn drop_object(&mut self, world: &mut dyn PhysicsBackend) -> GunEvent {
        match self.controller.attached_body() {
            Some(body) => {
                self.controller.detach(world);
                self.movement_length = 0.0;
                info!("Dropped {:?}", body);
                GunEvent::Dropped(body)
            }
            None => GunEvent::None,
        }
    }

    fn attach_object(
        &mut self,
        world: &mut dyn PhysicsBackend,
        hit: &RayHit,
        yaw: f32,
    ) -> GunEvent {
        if let Err(err) = self.controller.attach(world, hit.body, hit.point) {
            debug!("Could not grab {:?}: {}", hit.body, err);
            return GunEvent::None;
        }

        self.distance = hit.distance;
        self.last_yaw = yaw;
        self.movement_length = 0.0;
        self.original_object_position = world.object(hit.body).map_or(hit.point, |o| o.position());
        info!("Grabbed {:?} at {:.2} m", hit.body, hit.distance);
        GunEvent::Attached(hit.body)
    }

    fn apply_command(&mut self, command: HoldCommand, frame_time: f32) {
        let t = &self.tunables;
        let slide = t.distance_speed * frame_time;
        let zoom = self.distance * t.zoom_fraction;
        self.distance = match command {
            HoldCommand::None => self.distance,
            HoldCommand::Push => approach(t.max_hold_distance, self.distance, slide),
            HoldCommand::Pull => approach(t.min_hold_distance, self.distance, slide),
            HoldCommand::ZoomOut => approach(t.max_hold_distance, self.distance, zoom),
            HoldCommand::ZoomIn => approach(t.min_hold_distance, self.distance, zoom),
        };
    }

    /// Where the held body should go this frame
    ///
    /// A short trace in front of the muzzle keeps the body out of the
    /// player. Past it, a sweep towards the desired point ignores the held
    /// body; when blocked, the target backs off from the desired point by at
    /// most one frame of travel.
    fn hold_target(
        &self,
        world: &dyn WorldQuery,
        ray: &Ray,
        body: BodyHandle,
        frame_time: f32,
    ) -> Vec3 {
        let desired = ray.point_at(self.distance);
        let clearance = ray.point_at(self.tunables.player_clearance);

        if let Some(blocked) = world.cast_ray(ray, self.tunables.player_clearance, &[]) {
            return blocked.point;
        }

        let (sweep, sweep_length) = Ray::between(clearance, desired);
        let reached = if sweep_length > EPSILON {
            world.cast_ray(&sweep, sweep_length, &[body]).map_or(desired, |h| h.point)
        } else {
            desired
        };

        let back = reached - desired;
        let back_length = back.magnitude();
        let max_step = self.controller.max_linear_velocity() * frame_time;
        if back_length > max_step {
            desired + back * (max_step / back_length)
        } else {
            reached
        }
    }

    // ========================================================================
    // Queries and telemetry
    // ========================================================================

    /// Whether the trigger is held
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Held body, if any
    pub fn held_body(&self) -> Option<BodyHandle> {
        self.controller.attached_body()
    }

    /// Current hold distance along the aim (m)
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Distance between the last target and the held body's center (m)
    pub fn movement_length(&self) -> f32 {
        self.movement_length
    }

    /// Held body position at grab time
    pub fn original_object_position(&self) -> Vec3 {
        self.original_object_position
    }

    /// The attachment controller
    pub fn controller(&self) -> &AttachmentController {
        &self.controller
    }

    /// The attachment controller, e.g. to hand to the physics step
    pub fn controller_mut(&mut self) -> &mut AttachmentController {
        &mut self.controller
    }

    /// Seat the held body against a surface until the next update
    pub fn set_alignment(
        &mut self,
        local_normal: Vec3,
        local_position: Vec3,
        target_normal: Vec3,
        target_position: Vec3,
    ) -> bool {
        self.controller
            .set_alignment(local_normal, local_position, target_normal, target_position)
    }

    /// Lock-on pitch: 90 at the grab height rising to 150 at `lift_height` above it
    pub fn lift_pitch(&self, world: &dyn PhysicsBackend) -> Option<f32> {
        let object = world.object(self.held_body()?)?;
        let height = object.position().z - self.original_object_position.z;
        Some(90.0 + line_fraction(height, 0.0, self.tunables.lift_height, 60.0))
    }

    /// 0 for light bodies, 1 for heavy ones
    pub fn mass_blend(&self, world: &dyn PhysicsBackend) -> Option<f32> {
        let object = world.object(self.held_body()?)?;
        Some(line_fraction(
            object.mass_properties().mass,
            self.tunables.light_mass,
            self.tunables.heavy_mass,
            1.0,
        ))
    }

    /// Movement intensity in [0, 1], saturating at `movement_fade_distance`
    pub fn movement_fade(&self) -> f32 {
        line_fraction(self.movement_length, 0.0, self.tunables.movement_fade_distance, 1.0)
    }
}
