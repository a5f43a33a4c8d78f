//! # Core Module
//!
//! Shared configuration used by every subsystem of the crate.
//!
//! ## Organization
//!
//! - **Config**: Tunables for the controller, the solver, and the weapon driver
//! - **Foundation**: Low-level utilities (math, collections, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    GravityGunConfig,
    ControllerTunables,
    SolverTunables,
    GunTunables,
    Config,
    ConfigError,
};
