//! # Gravity Gun Configuration
//!
//! All tunables for the grab controller, its motion solver, and the weapon
//! driver live here instead of in process-wide globals. A controller takes a
//! copy at construction, so two guns with different settings never interfere.
//!
//! ## Units
//!
//! Distances are metres, masses kilograms, angles degrees (converted to
//! radians at the point of use), times seconds.

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// # Controller Tunables
///
/// Bounds that are turned into per-attachment limits on attach. Acceleration
/// limits scale with the grabbed body's inverse mass and inverse inertia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerTunables {
    /// Linear force budget (N); max linear acceleration is `force * inverse_mass`
    pub force: f32,
    /// Torque budget (N·m); max angular acceleration is `torque * inverse_inertia` per axis
    pub torque: f32,
    /// Bodies heavier than this get a proportionally lower speed cap (kg)
    pub reference_mass: f32,
    /// Speed cap for bodies at or below the reference mass (m/s)
    pub max_velocity: f32,
    /// Angular damping applied to a held body, replacing its own until release
    pub held_angular_damping: f32,
    /// Pacing window after a target change (s); one logical frame
    pub nominal_frame_time: f32,
}

impl ControllerTunables {
    /// Speed cap for a body of the given mass
    pub fn max_velocity_for_mass(&self, mass: f32) -> f32 {
        if mass > self.reference_mass {
            self.max_velocity * self.reference_mass / mass
        } else {
            self.max_velocity
        }
    }
}

impl Default for ControllerTunables {
    fn default() -> Self {
        Self {
            force: 12_700.0,
            torque: 100.0,
            reference_mass: 200.0,
            max_velocity: 20.0,
            held_angular_damping: 2.0,
            nominal_frame_time: 1.0 / 66.0,
        }
    }
}

/// # Solver Tunables
///
/// Thresholds of the per-substep control law. The defaults reproduce the
/// classic behaviour; they are exposed so tests and tools can exercise edge cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverTunables {
    /// Below this alignment angle an opposed normal gets a fixed nudge of the same size (degrees)
    pub align_fallback_degrees: f32,
    /// Seating pull is zero at this alignment error and full at zero (degrees)
    pub align_pull_cutoff_degrees: f32,
    /// Minimum tangent length for the in-plane rotation; 0.08 is roughly sin(5°)
    pub min_tangent_length: f32,
    /// Minimum projected radius for the in-plane rotation (m)
    pub min_rotation_radius: f32,
    /// Anchor this far in front of the seat plane only moves along the normal (m)
    pub seat_plane_epsilon: f32,
    /// Gain on the seating pull
    pub seat_pull_gain: f32,
    /// Linear velocity braking factor
    pub velocity_damping: f32,
    /// Angular velocity braking factor in alignment mode
    pub angular_damping: f32,
}

impl Default for SolverTunables {
    fn default() -> Self {
        Self {
            align_fallback_degrees: 10.0,
            align_pull_cutoff_degrees: 5.0,
            min_tangent_length: 0.08,
            min_rotation_radius: 0.0025,
            seat_plane_epsilon: 0.0254,
            seat_pull_gain: 0.2,
            velocity_damping: 1.0,
            angular_damping: 1.0,
        }
    }
}

/// # Gun Tunables
///
/// Geometry of the weapon driver: how far it reaches and how a held body's
/// hold distance can be adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GunTunables {
    /// Length of the aim ray (m)
    pub max_range: f32,
    /// Closest hold distance (m)
    pub min_hold_distance: f32,
    /// Farthest hold distance (m)
    pub max_hold_distance: f32,
    /// Anything hit closer than this drops the held body (m)
    pub drop_distance: f32,
    /// Clearance trace in front of the muzzle, larger than the player's half-extent (m)
    pub player_clearance: f32,
    /// Push/pull rate (m/s)
    pub distance_speed: f32,
    /// Zoom step as a fraction of the current distance
    pub zoom_fraction: f32,
    /// Height gain mapped onto the full lift pitch range (m)
    pub lift_height: f32,
    /// Movement length at which the movement fade saturates (m)
    pub movement_fade_distance: f32,
    /// Mass blend is 0 at or below this mass (kg)
    pub light_mass: f32,
    /// Mass blend is 1 at or above this mass (kg)
    pub heavy_mass: f32,
}

impl Default for GunTunables {
    fn default() -> Self {
        Self {
            max_range: 104.0,
            min_hold_distance: 1.0,
            max_hold_distance: 26.0,
            drop_distance: 0.9,
            player_clearance: 0.6,
            distance_speed: 2.5,
            zoom_fraction: 0.1,
            lift_height: 12.7,
            movement_fade_distance: 5.08,
            light_mass: 50.0,
            heavy_mass: 500.0,
        }
    }
}

/// # Complete Gravity Gun Configuration
///
/// Top-level configuration; load it from TOML or RON through [`Config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityGunConfig {
    /// Default log filter used by binaries
    pub log_level: String,
    /// Attachment bounds
    pub controller: ControllerTunables,
    /// Control law thresholds
    pub solver: SolverTunables,
    /// Weapon driver geometry
    pub gun: GunTunables,
}

impl GravityGunConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            controller: ControllerTunables::default(),
            solver: SolverTunables::default(),
            gun: GunTunables::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        let positive = [
            ("controller.force", c.force),
            ("controller.torque", c.torque),
            ("controller.reference_mass", c.reference_mass),
            ("controller.max_velocity", c.max_velocity),
            ("controller.nominal_frame_time", c.nominal_frame_time),
            ("gun.max_range", self.gun.max_range),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let s = &self.solver;
        let non_negative = [
            ("controller.held_angular_damping", c.held_angular_damping),
            ("solver.align_fallback_degrees", s.align_fallback_degrees),
            ("solver.align_pull_cutoff_degrees", s.align_pull_cutoff_degrees),
            ("solver.min_tangent_length", s.min_tangent_length),
            ("solver.min_rotation_radius", s.min_rotation_radius),
            ("solver.seat_plane_epsilon", s.seat_plane_epsilon),
            ("solver.seat_pull_gain", s.seat_pull_gain),
            ("solver.velocity_damping", s.velocity_damping),
            ("solver.angular_damping", s.angular_damping),
            ("gun.min_hold_distance", self.gun.min_hold_distance),
            ("gun.drop_distance", self.gun.drop_distance),
            ("gun.player_clearance", self.gun.player_clearance),
            ("gun.distance_speed", self.gun.distance_speed),
            ("gun.zoom_fraction", self.gun.zoom_fraction),
            ("gun.lift_height", self.gun.lift_height),
            ("gun.movement_fade_distance", self.gun.movement_fade_distance),
            ("gun.light_mass", self.gun.light_mass),
            ("gun.heavy_mass", self.gun.heavy_mass),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                let message = format!("{name} must not be negative, got {value}");
                return Err(ConfigError::Invalid(message));
            }
        }

        if self.gun.min_hold_distance > self.gun.max_hold_distance {
            return Err(ConfigError::Invalid(format!(
                "gun.min_hold_distance ({}) exceeds gun.max_hold_distance ({})",
                self.gun.min_hold_distance, self.gun.max_hold_distance
            )));
        }

        Ok(())
    }
}

impl Default for GravityGunConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for GravityGunConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_validate() {
        assert!(GravityGunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_max_velocity_scales_down_for_heavy_bodies() {
        let tunables = ControllerTunables::default();
        assert_relative_eq!(tunables.max_velocity_for_mass(50.0), 20.0);
        assert_relative_eq!(tunables.max_velocity_for_mass(200.0), 20.0);
        assert_relative_eq!(tunables.max_velocity_for_mass(400.0), 10.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let text = r#"
            log_level = "debug"

            [controller]
            max_velocity = 8.0

            [gun]
            max_range = 50.0
        "#;
        let config = GravityGunConfig::from_toml_str(text).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_relative_eq!(config.controller.max_velocity, 8.0);
        assert_relative_eq!(config.controller.force, ControllerTunables::default().force);
        assert_relative_eq!(config.gun.max_range, 50.0);
        assert_eq!(config.solver, SolverTunables::default());
    }

    #[test]
    fn test_toml_and_ron_roundtrip() {
        let config = GravityGunConfig::default().with_log_level("trace");

        let toml_text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(GravityGunConfig::from_toml_str(&toml_text).unwrap(), config);

        let ron_text = ron::ser::to_string_pretty(&config, Default::default()).unwrap();
        assert_eq!(GravityGunConfig::from_ron_str(&ron_text).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GravityGunConfig::default();
        config.controller.force = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GravityGunConfig::default();
        config.solver.min_tangent_length = -0.1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GravityGunConfig::default();
        config.gun.min_hold_distance = 30.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = GravityGunConfig::default().save_to_file("gravgun.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
