//! Plain-data copy of a controller for save/restore and replication
//!
//! Handles are never part of a snapshot; after [`AttachmentController::restore`]
//! the owner calls [`AttachmentController::resume`] with the body it re-resolved.
//!
//! [`AttachmentController::restore`]: crate::grab::AttachmentController::restore
//! [`AttachmentController::resume`]: crate::grab::AttachmentController::resume

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Quat, Vec3};
use crate::physics::backend::Damping;

/// Every non-handle field of an [`AttachmentController`](crate::grab::AttachmentController)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    /// Grabbed spot, body frame
    pub local_attach_point: Vec3,
    /// Desired anchor position
    pub target_position: Vec3,
    /// Anchor position at the last solve
    pub world_position: Vec3,
    /// Desired orientation
    pub target_rotation: Quat,
    /// Pacing time left
    pub time_to_arrive: f32,
    /// Anchor speed cap
    pub max_linear_velocity: f32,
    /// Linear acceleration cap
    pub max_linear_acceleration: f32,
    /// Per-axis angular acceleration cap, body frame
    pub max_angular_acceleration: Vec3,
    /// Damping to restore on release
    pub saved_damping: Damping,
    /// Alignment mode flag
    pub aligning: bool,
    /// Face normal to seat, body frame
    pub align_local_normal: Vec3,
    /// Rotation center, body frame
    pub align_local_position: Vec3,
    /// Normal to match, world frame
    pub align_target_normal: Vec3,
    /// Seat position, world frame
    pub align_target_position: Vec3,
}

impl ControllerSnapshot {
    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Parse from RON
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}
