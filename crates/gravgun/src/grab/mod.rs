//! # Grab
//!
//! Holding and placing rigid bodies.
//!
//! - [`AttachmentController`]: lifecycle of one grab and the engine callback
//! - [`MotionSolver`]: the per-substep control law
//! - [`ControllerSnapshot`]: plain-data save/restore
//! - [`PhysGun`]: weapon driver that aims, grabs, holds, and drops

pub mod controller;
pub mod physgun;
pub mod snapshot;
pub mod solver;

#[cfg(test)]
mod tests;

pub use controller::{AttachError, AttachmentController};
pub use physgun::{AimRay, GunEvent, HoldCommand, PhysGun};
pub use snapshot::ControllerSnapshot;
pub use solver::{AlignmentFrame, MotionSolver, SolveReport, SolverState};
