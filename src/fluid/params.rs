//! Fluid simulation parameters.
//!
//! Every physical constant of the solver lives here. Values can be tuned at
//! runtime through the Bevy resource, or loaded from a RON file.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{FluidError, Result};

/// How the spatial grid is refreshed at the start of each step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum GridRebuild {
    /// Clear every bucket and reinsert all particles.
    Full,
    /// Move a particle between buckets only when its cell changes.
    #[default]
    Incremental,
}

/// Parameters controlling the fluid simulation behavior.
///
/// Units are whatever the host uses consistently: lengths in scene units,
/// time in seconds, mass in mass units. The defaults assume a domain of
/// roughly 200 units per side.
#[derive(Resource, Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct FluidParams {
    /// Smoothing kernel support radius (h). Also the grid cell size.
    pub smoothing_radius: f32,

    /// Equation-of-state stiffness (k) in `pressure = k * (density - rest)`.
    pub stiffness: f32,

    /// Dynamic viscosity coefficient (mu).
    pub viscosity: f32,

    /// Coefficient of restitution for all collisions.
    /// 0.0 = fully inelastic, 1.0 = fully elastic.
    pub restitution: f32,

    /// Surface tension coefficient (sigma).
    pub surface_tension: f32,

    /// Minimum color-field gradient magnitude for surface tension to apply.
    /// Interior particles fall below it.
    pub surface_threshold: f32,

    /// Gravity acceleration. Scaled by rest density for particles and by
    /// mass for bodies.
    pub gravity: Vec3,

    /// Constant wind force per unit rest density.
    pub wind: Vec3,

    /// Mass given to particles created without an explicit mass.
    pub particle_mass: f32,

    /// Rest density given to particles created without an explicit one.
    pub rest_density: f32,

    /// Densities at or below this are treated as empty and skipped.
    pub density_epsilon: f32,

    /// Separations at or below this are treated as coincident and skipped.
    pub distance_epsilon: f32,

    /// Quadratic leading coefficient (or displacement component) below which
    /// a sweep is treated as stationary.
    pub sweep_epsilon: f32,

    /// Distance a particle is pushed off a body surface after a contact.
    pub collision_skin: f32,

    /// Spatial grid refresh policy.
    pub grid_rebuild: GridRebuild,
}

impl Default for FluidParams {
    fn default() -> Self {
        Self {
            smoothing_radius: 5.0,
            stiffness: 250.0,
            viscosity: 2.5,
            restitution: 0.3,
            surface_tension: 0.6,
            surface_threshold: 1.0e-4,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            wind: Vec3::new(4.0, 0.0, 0.0),
            particle_mass: 1.0,
            rest_density: 1.0,
            density_epsilon: 1.0e-6,
            distance_epsilon: 1.0e-6,
            sweep_epsilon: 1.0e-9,
            collision_skin: 1.0e-3,
            grid_rebuild: GridRebuild::Incremental,
        }
    }
}

impl FluidParams {
    /// Creates parameters for water-like behavior.
    pub fn water() -> Self {
        Self::default()
    }

    /// Creates parameters for honey-like viscous fluid.
    pub fn honey() -> Self {
        Self {
            viscosity: 40.0,
            stiffness: 120.0,
            restitution: 0.05,
            surface_tension: 1.5,
            ..Self::default()
        }
    }

    /// Set the smoothing radius.
    pub fn with_smoothing_radius(mut self, h: f32) -> Self {
        self.smoothing_radius = h;
        self
    }

    /// Set the equation-of-state stiffness.
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Set the viscosity coefficient.
    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set the restitution coefficient.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the grid refresh policy.
    pub fn with_grid_rebuild(mut self, policy: GridRebuild) -> Self {
        self.grid_rebuild = policy;
        self
    }

    /// Cell size of the spatial grid.
    pub fn cell_size(&self) -> f32 {
        self.smoothing_radius
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("smoothing_radius", self.smoothing_radius),
            ("particle_mass", self.particle_mass),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FluidError::param(
                    name,
                    format!("must be positive, got {value}"),
                ));
            }
        }

        let non_negative = [
            ("stiffness", self.stiffness),
            ("viscosity", self.viscosity),
            ("surface_tension", self.surface_tension),
            ("surface_threshold", self.surface_threshold),
            ("rest_density", self.rest_density),
            ("density_epsilon", self.density_epsilon),
            ("distance_epsilon", self.distance_epsilon),
            ("sweep_epsilon", self.sweep_epsilon),
            ("collision_skin", self.collision_skin),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FluidError::param(
                    name,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(FluidError::param(
                "restitution",
                format!("must lie in [0, 1], got {}", self.restitution),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(FluidError::param("gravity", "must be finite"));
        }
        if !self.wind.is_finite() {
            return Err(FluidError::param("wind", "must be finite"));
        }
        Ok(())
    }

    /// Parses parameters from RON. Missing fields take their default values.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let params: Self =
            ron::from_str(source).map_err(|err| FluidError::Config(err.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Serializes the parameters to pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|err| FluidError::Config(err.to_string()))
    }
}

/// Feature switches the host can flip between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct SimulationToggles {
    /// Apply gravity to fluid particles.
    pub fluid_gravity: bool,
    /// Apply gravity to rigid bodies.
    pub body_gravity: bool,
    /// Apply the constant wind force to fluid particles.
    pub wind: bool,
    /// Apply color-field surface tension.
    pub surface_tension: bool,
    /// Use the spatial grid for neighbor search instead of all pairs.
    pub spatial_index: bool,
}

impl Default for SimulationToggles {
    fn default() -> Self {
        Self {
            fluid_gravity: true,
            body_gravity: false,
            wind: false,
            surface_tension: false,
            spatial_index: true,
        }
    }
}
