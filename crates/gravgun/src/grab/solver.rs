//! Per-substep control law for a held body
//!
//! Invoked by the physics engine once per substep for the grabbed body. Reads
//! the body's live kinematic state plus the controller's target and returns
//! bounded, mass-normalized accelerations.
//!
//! Two modes:
//!
//! - **Drag**: drive the anchor point (the grabbed spot, not the center of mass)
//!   towards the target position, with a speed cap and an acceleration cap. The
//!   acceleration is applied at the anchor, so an off-center pull also spins the
//!   body.
//! - **Align**: rotate the body so a local face normal matches a target surface
//!   normal, spin it around that normal so the anchor lines up with the target,
//!   and only then pull it onto the seat.
//!
//! All angles are radians internally; thresholds in [`SolverTunables`] are degrees.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::core::config::SolverTunables;
use crate::foundation::math::{
    constants::EPSILON,
    utils::{clamp_magnitude, deg_to_rad},
    Vec2, Vec3,
};
use crate::physics::backend::{MotionOutput, PhysicsObject};

/// Seating reference frame for alignment mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentFrame {
    /// Face normal to seat, body frame (unit)
    pub local_normal: Vec3,
    /// Rotation center on the body, body frame
    pub local_position: Vec3,
    /// Normal the face must match, world frame (unit)
    pub target_normal: Vec3,
    /// Where the rotation center should end up, world frame
    pub target_position: Vec3,
}

/// Controller fields the solver reads, plus the bookkeeping it updates
#[derive(Debug, Clone, PartialEq)]
pub struct SolverState {
    /// Grabbed spot in the body frame
    pub local_attach_point: Vec3,
    /// Desired anchor position, world frame
    pub target_position: Vec3,
    /// Anchor position at the last solve, world frame
    pub world_position: Vec3,
    /// Pacing time left before full-strength correction
    pub time_to_arrive: f32,
    /// Speed cap for the anchor
    pub max_linear_velocity: f32,
    /// Linear acceleration cap
    pub max_linear_acceleration: f32,
    /// Per-axis angular acceleration cap, body frame
    pub max_angular_acceleration: Vec3,
    /// Seating frame when alignment mode is on
    pub alignment: Option<AlignmentFrame>,
}

impl Default for SolverState {
    fn default() -> Self {
        Self {
            local_attach_point: Vec3::zeros(),
            target_position: Vec3::zeros(),
            world_position: Vec3::zeros(),
            time_to_arrive: 0.0,
            max_linear_velocity: 0.0,
            max_linear_acceleration: 0.0,
            max_angular_acceleration: Vec3::zeros(),
            alignment: None,
        }
    }
}

/// Diagnostics of one solve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveReport {
    /// Pacing fraction used
    pub fraction: f32,
    /// Anchor velocity the drag correction asked for (after the speed cap)
    pub implied_velocity: Vec3,
    /// Normal alignment error (radians), or the fallback nudge when it fired
    pub align_angle: f32,
    /// In-plane rotation around the target normal (radians)
    pub in_plane_angle: f32,
    /// The anti-parallel fallback axis was used
    pub fallback_fired: bool,
    /// Nothing was computed this substep
    pub skipped: bool,
}

/// Rotation bringing one normal onto another, as an axis scaled by angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignRotation {
    /// Rotation axis scaled by angle (radians), world frame
    pub axis_angle: Vec3,
    /// Rotation angle (radians)
    pub angle: f32,
    /// The anti-parallel fallback was used
    pub fallback: bool,
}

/// Pacing fraction for this substep and the time left afterwards
///
/// Right after a target change only a share of the error is corrected,
/// proportional to how much of the pacing window this substep covers.
pub fn ease_fraction(delta_time: f32, time_to_arrive: f32) -> (f32, f32) {
    let fraction = if time_to_arrive > 0.0 {
        (delta_time / time_to_arrive).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let remaining = (time_to_arrive - delta_time).max(0.0);
    (fraction, remaining)
}

/// Rotation taking `world_normal` onto `target_normal`
///
/// Uses the cross product, so the angle comes out of `asin` and stays within
/// 90°. Anti-parallel normals produce no usable axis; when the angle is below
/// `fallback_angle` and the normals face away from each other, a fixed nudge of
/// `fallback_angle` around X (or Z when the normal already leans towards X) is
/// used instead. The axis choice is an arbitrary tie-break.
pub fn align_rotation(
    world_normal: &Vec3,
    target_normal: &Vec3,
    fallback_angle: f32,
) -> AlignRotation {
    let cross = world_normal.cross(target_normal);
    let (axis, sine) = match cross.try_normalize(EPSILON) {
        Some(axis) => (axis, cross.magnitude().min(1.0)),
        None => (Vec3::zeros(), 0.0),
    };
    let angle = sine.asin();

    if angle < fallback_angle && world_normal.dot(target_normal) < 0.0 {
        let axis_angle = if world_normal.x < 0.5 {
            Vec3::new(fallback_angle, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 0.0, fallback_angle)
        };
        return AlignRotation {
            axis_angle,
            angle: fallback_angle,
            fallback: true,
        };
    }

    AlignRotation {
        axis_angle: axis * angle,
        angle,
        fallback: false,
    }
}

/// Signed rotation around `normal` that swings `source` onto `destination`
///
/// Both vectors are measured from the rotation center and projected onto the
/// plane perpendicular to `normal`. Returns `None` when the source is too close
/// to the normal (tangent shorter than `min_tangent`) or its projection is
/// shorter than `min_radius`.
pub fn in_plane_rotation(
    source: &Vec3,
    destination: &Vec3,
    normal: &Vec3,
    min_tangent: f32,
    min_radius: f32,
) -> Option<f32> {
    let source_dir = source.try_normalize(EPSILON)?;
    let tangent = source_dir.cross(normal);
    let length = tangent.magnitude();
    if length <= min_tangent {
        return None;
    }
    let tangent = tangent / length;
    let binormal = normal.cross(&tangent);

    let plane_source = Vec2::new(source.dot(&tangent), source.dot(&binormal));
    let plane_destination = Vec2::new(destination.dot(&tangent), destination.dot(&binormal));
    if plane_source.magnitude() <= min_radius {
        return None;
    }

    let sine = plane_source.x * plane_destination.y - plane_source.y * plane_destination.x;
    let cosine = plane_source.dot(&plane_destination);
    Some(sine.atan2(cosine))
}

/// Clamp each component of `value` into `[-limit, limit]`
pub fn clamp_per_axis(value: Vec3, limit: Vec3) -> Vec3 {
    value.zip_map(&limit, |component, bound| {
        let bound = bound.max(0.0);
        component.clamp(-bound, bound)
    })
}

/// The control law
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSolver {
    tunables: SolverTunables,
}

impl MotionSolver {
    /// Create a solver with the given thresholds
    pub fn new(tunables: SolverTunables) -> Self {
        Self { tunables }
    }

    /// Thresholds in use
    pub fn tunables(&self) -> &SolverTunables {
        &self.tunables
    }

    /// Compute this substep's accelerations and update pacing bookkeeping
    pub fn solve(
        &self,
        state: &mut SolverState,
        object: &dyn PhysicsObject,
        delta_time: f32,
    ) -> (MotionOutput, SolveReport) {
        let mut report = SolveReport::default();

        let position = object.position();
        let valid_step = delta_time > 0.0 && delta_time.is_finite();
        if !valid_step || !position.iter().all(|v| v.is_finite()) {
            debug!("Skipping grab solve: dt={delta_time}, position={position:?}");
            report.skipped = true;
            return (MotionOutput::nothing(), report);
        }

        let (fraction, remaining) = ease_fraction(delta_time, state.time_to_arrive);
        state.time_to_arrive = remaining;
        report.fraction = fraction;

        let inv_delta_time = 1.0 / delta_time;
        let anchor = object.local_to_world(state.local_attach_point);
        state.world_position = anchor;
        let predicted = anchor + object.velocity() * delta_time;

        let output = match state.alignment {
            Some(frame) => self.solve_align(
                state,
                &frame,
                object,
                predicted,
                fraction,
                inv_delta_time,
                &mut report,
            ),
            None => {
                self.solve_drag(state, object, predicted, fraction, inv_delta_time, &mut report)
            }
        };

        trace!(
            "Grab solve: anchor={:?} target={:?} fraction={:.3} linear={:?} angular={:?}",
            anchor, state.target_position, fraction, output.linear, output.angular
        );

        (output, report)
    }

    fn solve_drag(
        &self,
        state: &SolverState,
        object: &dyn PhysicsObject,
        predicted: Vec3,
        fraction: f32,
        inv_delta_time: f32,
        report: &mut SolveReport,
    ) -> MotionOutput {
        let velocity = object.velocity();
        let correction = (state.target_position - predicted) * fraction * inv_delta_time;

        // Cap the velocity we would end up with, not the correction itself
        let next_velocity = clamp_magnitude(correction + velocity, state.max_linear_velocity);
        report.implied_velocity = next_velocity;

        let acceleration = clamp_magnitude(
            (next_velocity - velocity) * inv_delta_time,
            state.max_linear_acceleration,
        );

        let (linear, angular) = object.calculate_force_offset(acceleration, predicted);
        let angular = clamp_per_axis(angular, state.max_angular_acceleration);
        MotionOutput::global_acceleration(linear, angular)
    }

    fn solve_align(
        &self,
        state: &SolverState,
        frame: &AlignmentFrame,
        object: &dyn PhysicsObject,
        predicted: Vec3,
        fraction: f32,
        inv_delta_time: f32,
        report: &mut SolveReport,
    ) -> MotionOutput {
        let tunables = &self.tunables;
        let transform = object.transform();
        let velocity = object.velocity();

        let world_normal = transform.transform_vector(frame.local_normal);
        let mut rotation = align_rotation(
            &world_normal,
            &frame.target_normal,
            deg_to_rad(tunables.align_fallback_degrees),
        );
        report.align_angle = rotation.angle;
        report.fallback_fired = rotation.fallback;

        let rotation_center = object.local_to_world(frame.local_position);
        let source = predicted - rotation_center;
        let destination = state.target_position - rotation_center;
        if let Some(angle) = in_plane_rotation(
            &source,
            &destination,
            &frame.target_normal,
            tunables.min_tangent_length,
            tunables.min_rotation_radius,
        ) {
            rotation.axis_angle += frame.target_normal * angle;
            report.in_plane_angle = angle;
        }

        // Desired spin change in the body frame, braked by the current spin
        let local_rotation = transform.inverse_transform_vector(rotation.axis_angle);
        let spin_change = local_rotation * fraction * inv_delta_time
            - object.angular_velocity() * tunables.angular_damping;
        let angular = clamp_per_axis(spin_change * inv_delta_time, state.max_angular_acceleration);

        // Pull onto the seat only once nearly aligned, fading out at the cutoff
        let mut linear = Vec3::zeros();
        let cutoff = deg_to_rad(tunables.align_pull_cutoff_degrees);
        let error = rotation.angle.abs();
        if error < cutoff {
            let factor = error / cutoff;
            let mut seat = frame.target_position - rotation_center;
            let plane_forward = seat.dot(&frame.target_normal);
            // Behind the seat plane: only back out along the normal
            if plane_forward > tunables.seat_plane_epsilon {
                seat = frame.target_normal * plane_forward;
            }
            let strength = fraction * (1.0 - factor) * tunables.seat_pull_gain;
            let pull = seat * strength * inv_delta_time * inv_delta_time;
            linear += clamp_magnitude(pull, state.max_linear_acceleration);
        }
        linear -= velocity * tunables.velocity_damping * inv_delta_time;

        let linear = clamp_magnitude(linear, state.max_linear_acceleration);
        MotionOutput::global_acceleration(linear, angular)
    }
}

impl Default for MotionSolver {
    fn default() -> Self {
        Self::new(SolverTunables::default())
    }
}
