//! # Attachment Controller
//!
//! Owns the lifecycle of one grab: attach, retarget, align, detach. The
//! physics engine calls back into it once per substep through
//! [`MotionEvent`], where the [`MotionSolver`] turns the current target into
//! bounded accelerations.
//!
//! ## Invariants
//!
//! - A body is attached exactly while a motion controller registration is held.
//! - The local attach point and the acceleration bounds are fixed for the
//!   duration of one attachment.
//! - Detach restores the body's damping and releases the registration.
//! - Dropping an attached controller drops its registration lease; the
//!   engine then releases the registration and restores the damping.

use log::{debug, warn};
use thiserror::Error;

use crate::core::config::{ControllerTunables, GravityGunConfig, SolverTunables};
use crate::foundation::math::{constants::EPSILON, Quat, Vec3};
use crate::grab::snapshot::ControllerSnapshot;
use crate::grab::solver::{AlignmentFrame, MotionSolver, SolveReport, SolverState};
use crate::physics::backend::{
    BodyHandle, ControllerPriority, Damping, MotionControllerHandle, MotionControllerLease,
    MotionEvent, MotionOutput, MotionType, PhysicsBackend, PhysicsObject,
};

/// Why a body could not be grabbed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The handle does not refer to a live body
    #[error("body {0:?} does not exist")]
    MissingBody(BodyHandle),

    /// Only dynamic bodies can be driven
    #[error("body is {0:?}, only dynamic bodies can be grabbed")]
    NotDynamic(MotionType),

    /// Already holding something; detach first
    #[error("already attached to body {0:?}")]
    AlreadyAttached(BodyHandle),

    /// The engine refused the motion controller registration
    #[error("engine refused a motion controller for body {0:?}")]
    RegistrationRefused(BodyHandle),
}

/// Engine-side resources of a live grab
#[derive(Debug)]
struct Attachment {
    body: BodyHandle,
    registration: MotionControllerLease,
}

/// Drives one grabbed body towards a target
#[derive(Debug)]
pub struct AttachmentController {
    tunables: ControllerTunables,
    solver: MotionSolver,
    state: SolverState,
    target_rotation: Quat,
    saved_damping: Damping,
    attachment: Option<Attachment>,
    last_report: SolveReport,
}

impl AttachmentController {
    /// Create an idle controller with its own copy of the tunables
    pub fn new(config: &GravityGunConfig) -> Self {
        Self::with_tunables(config.controller.clone(), config.solver.clone())
    }

    /// Create an idle controller from individual tunable sections
    pub fn with_tunables(controller: ControllerTunables, solver: SolverTunables) -> Self {
        Self {
            tunables: controller,
            solver: MotionSolver::new(solver),
            state: SolverState::default(),
            target_rotation: Quat::identity(),
            saved_damping: Damping::default(),
            attachment: None,
            last_report: SolveReport::default(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Grab `body` at `world_point`
    ///
    /// On success the anchor sits at `world_point`, the target equals the
    /// anchor, and the target rotation is the body's current orientation.
    /// On failure nothing changes.
    pub fn attach(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: BodyHandle,
        world_point: Vec3,
    ) -> Result<(), AttachError> {
        // A body let go by a dropped controller gets its own damping back first
        backend.release_abandoned();
        self.check_attachable(backend, body)?;

        let object = backend.object(body).ok_or(AttachError::MissingBody(body))?;
        let local_attach_point = object.world_to_local(world_point);
        let rotation = object.rotation();
        let props = object.mass_properties();
        let saved_damping = backend.damping(body).unwrap_or_default();

        self.register(backend, body, saved_damping)?;

        self.state = SolverState {
            local_attach_point,
            target_position: world_point,
            world_position: world_point,
            time_to_arrive: self.tunables.nominal_frame_time,
            max_linear_velocity: self.tunables.max_velocity_for_mass(props.mass).max(0.0),
            max_linear_acceleration: (self.tunables.force * props.inverse_mass).max(0.0),
            max_angular_acceleration: (props.inverse_inertia * self.tunables.torque)
                .map(|v| v.max(0.0)),
            alignment: None,
        };
        self.target_rotation = rotation;
        self.last_report = SolveReport::default();

        debug!(
            "Attached to {:?} at {:?}: max velocity {:.2}, max acceleration {:.2}, \
             max angular {:?}",
            body,
            world_point,
            self.state.max_linear_velocity,
            self.state.max_linear_acceleration,
            self.state.max_angular_acceleration
        );
        Ok(())
    }

    /// Re-register on `body` keeping the current (restored) data
    ///
    /// Counterpart of [`restore`](Self::restore): the attach point, bounds,
    /// targets, and saved damping come from the snapshot instead of the body.
    pub fn resume(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: BodyHandle,
    ) -> Result<(), AttachError> {
        backend.release_abandoned();
        self.check_attachable(backend, body)?;
        self.register(backend, body, self.saved_damping)?;
        debug!("Resumed grab of {:?}", body);
        Ok(())
    }

    /// Release the held body; a no-op when nothing is held
    ///
    /// Tolerates the body having been destroyed: the registration is still
    /// released.
    pub fn detach(&mut self, backend: &mut dyn PhysicsBackend) {
        let Some(attachment) = self.attachment.take() else {
            return;
        };

        if backend.contains(attachment.body) {
            // It may have fallen asleep while held
            backend.wake(attachment.body);
            backend.set_damping(attachment.body, self.saved_damping);
        }
        backend.destroy_motion_controller(attachment.registration);

        // Never leave the last grabbed position observable
        self.state.target_position = Vec3::zeros();
        self.state.world_position = Vec3::zeros();

        debug!("Detached from {:?}", attachment.body);
    }

    /// Detach if the body or its registration has gone away
    ///
    /// Call between ticks. Returns whether the controller is still attached.
    pub fn sync(&mut self, backend: &mut dyn PhysicsBackend) -> bool {
        let Some(attachment) = &self.attachment else {
            return false;
        };

        let body = attachment.body;
        let alive = backend.contains(body)
            && backend.motion_controller_body(attachment.registration.handle()) == Some(body);
        if !alive {
            warn!("Held body {:?} is gone, detaching", body);
            self.detach(backend);
        }
        alive
    }

    fn check_attachable(
        &self,
        backend: &dyn PhysicsBackend,
        body: BodyHandle,
    ) -> Result<(), AttachError> {
        if let Some(attachment) = &self.attachment {
            warn!("Rejecting attach to {:?}: still holding {:?}", body, attachment.body);
            return Err(AttachError::AlreadyAttached(attachment.body));
        }

        match backend.motion_type(body) {
            None => {
                warn!("Rejecting attach: body {:?} does not exist", body);
                Err(AttachError::MissingBody(body))
            }
            Some(MotionType::Dynamic) => Ok(()),
            Some(other) => {
                warn!("Rejecting attach: body {:?} is {:?}", body, other);
                Err(AttachError::NotDynamic(other))
            }
        }
    }

    fn register(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: BodyHandle,
        saved_damping: Damping,
    ) -> Result<(), AttachError> {
        let registration = backend
            .create_motion_controller(body, ControllerPriority::High, saved_damping)
            .ok_or(AttachError::RegistrationRefused(body))?;

        // Our braking, not the body's own, should dominate rotation
        let held = Damping::new(saved_damping.linear, self.tunables.held_angular_damping);
        backend.set_damping(body, held);
        backend.wake(body);

        self.saved_damping = saved_damping;
        self.attachment = Some(Attachment { body, registration });
        Ok(())
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Move the target and restart the pacing window
    ///
    /// While idle the cached world position follows too, so a marker keeps
    /// tracking the aim point.
    pub fn set_target(&mut self, position: Vec3) {
        self.state.target_position = position;
        if self.attachment.is_none() {
            self.state.world_position = position;
        }
        self.state.time_to_arrive = self.tunables.nominal_frame_time;
    }

    /// Override the speed cap computed on attach
    pub fn set_max_velocity(&mut self, max_velocity: f32) {
        self.state.max_linear_velocity = max_velocity.max(0.0);
    }

    /// Set the desired orientation
    pub fn set_target_rotation(&mut self, rotation: Quat) {
        self.target_rotation = rotation;
    }

    /// Compose a turn around world up (+Z) onto the desired orientation
    pub fn rotate_target_yaw(&mut self, delta: f32) {
        self.target_rotation = Quat::from_axis_angle(&Vec3::z_axis(), delta) * self.target_rotation;
    }

    /// Enter alignment mode
    ///
    /// Normals are normalized; returns false and leaves the mode unchanged
    /// when either normal has no direction.
    pub fn set_alignment(
        &mut self,
        local_normal: Vec3,
        local_position: Vec3,
        target_normal: Vec3,
        target_position: Vec3,
    ) -> bool {
        let (Some(local_normal), Some(target_normal)) =
            (local_normal.try_normalize(EPSILON), target_normal.try_normalize(EPSILON))
        else {
            warn!("Ignoring alignment with a zero normal");
            return false;
        };

        self.state.alignment = Some(AlignmentFrame {
            local_normal,
            local_position,
            target_normal,
            target_position,
        });
        true
    }

    /// Leave alignment mode
    pub fn clear_alignment(&mut self) {
        self.state.alignment = None;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether a body is held
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Held body, if any
    pub fn attached_body(&self) -> Option<BodyHandle> {
        self.attachment.as_ref().map(|a| a.body)
    }

    /// Anchor position at the last solve (world frame)
    pub fn world_position(&self) -> Vec3 {
        self.state.world_position
    }

    /// Desired anchor position (world frame)
    pub fn target_position(&self) -> Vec3 {
        self.state.target_position
    }

    /// Desired orientation
    pub fn target_rotation(&self) -> Quat {
        self.target_rotation
    }

    /// Attach point in the body frame
    pub fn local_attach_point(&self) -> Vec3 {
        self.state.local_attach_point
    }

    /// Anchor speed cap
    pub fn max_linear_velocity(&self) -> f32 {
        self.state.max_linear_velocity
    }

    /// Linear acceleration cap
    pub fn max_linear_acceleration(&self) -> f32 {
        self.state.max_linear_acceleration
    }

    /// Per-axis angular acceleration cap (body frame)
    pub fn max_angular_acceleration(&self) -> Vec3 {
        self.state.max_angular_acceleration
    }

    /// Pacing time left
    pub fn time_to_arrive(&self) -> f32 {
        self.state.time_to_arrive
    }

    /// Whether alignment mode is on
    pub fn is_aligning(&self) -> bool {
        self.state.alignment.is_some()
    }

    /// Seating frame in alignment mode
    pub fn alignment(&self) -> Option<AlignmentFrame> {
        self.state.alignment
    }

    /// Damping the held body had before it was grabbed
    pub fn saved_damping(&self) -> Damping {
        self.saved_damping
    }

    /// Diagnostics of the most recent substep
    pub fn last_report(&self) -> &SolveReport {
        &self.last_report
    }

    /// Bounds in use
    pub fn tunables(&self) -> &ControllerTunables {
        &self.tunables
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Copy out every non-handle field
    pub fn snapshot(&self) -> ControllerSnapshot {
        let frame = self.state.alignment;
        ControllerSnapshot {
            local_attach_point: self.state.local_attach_point,
            target_position: self.state.target_position,
            world_position: self.state.world_position,
            target_rotation: self.target_rotation,
            time_to_arrive: self.state.time_to_arrive,
            max_linear_velocity: self.state.max_linear_velocity,
            max_linear_acceleration: self.state.max_linear_acceleration,
            max_angular_acceleration: self.state.max_angular_acceleration,
            saved_damping: self.saved_damping,
            aligning: frame.is_some(),
            align_local_normal: frame.map_or_else(Vec3::zeros, |f| f.local_normal),
            align_local_position: frame.map_or_else(Vec3::zeros, |f| f.local_position),
            align_target_normal: frame.map_or_else(Vec3::zeros, |f| f.target_normal),
            align_target_position: frame.map_or_else(Vec3::zeros, |f| f.target_position),
        }
    }

    /// Load data from a snapshot; registrations are never restored
    ///
    /// Only allowed while idle. Follow with [`resume`](Self::resume) to
    /// drive the body again.
    pub fn restore(&mut self, snapshot: &ControllerSnapshot) -> Result<(), AttachError> {
        if let Some(attachment) = &self.attachment {
            return Err(AttachError::AlreadyAttached(attachment.body));
        }

        self.state = SolverState {
            local_attach_point: snapshot.local_attach_point,
            target_position: snapshot.target_position,
            world_position: snapshot.world_position,
            time_to_arrive: snapshot.time_to_arrive.max(0.0),
            max_linear_velocity: snapshot.max_linear_velocity.max(0.0),
            max_linear_acceleration: snapshot.max_linear_acceleration.max(0.0),
            max_angular_acceleration: snapshot.max_angular_acceleration.map(|v| v.max(0.0)),
            alignment: snapshot.aligning.then(|| AlignmentFrame {
                local_normal: snapshot.align_local_normal,
                local_position: snapshot.align_local_position,
                target_normal: snapshot.align_target_normal,
                target_position: snapshot.align_target_position,
            }),
        };
        self.target_rotation = snapshot.target_rotation;
        self.saved_damping = snapshot.saved_damping;
        Ok(())
    }
}

impl MotionEvent for AttachmentController {
    fn registration(&self) -> Option<MotionControllerHandle> {
        self.attachment.as_ref().map(|a| a.registration.handle())
    }

    fn simulate(&mut self, object: &dyn PhysicsObject, delta_time: f32) -> MotionOutput {
        if self.attachment.is_none() {
            return MotionOutput::nothing();
        }
        let (output, report) = self.solver.solve(&mut self.state, object, delta_time);
        self.last_report = report;
        output
    }
}

impl Drop for AttachmentController {
    fn drop(&mut self) {
        if let Some(attachment) = &self.attachment {
            debug!(
                "Controller dropped while holding {:?}; abandoning registration {:?}",
                attachment.body,
                attachment.registration.handle()
            );
        }
    }
}
