//! Fluid particle data and spawning utilities.
//!
//! Particles are stored by value in the simulation arena and addressed by
//! [`ParticleId`]. Emitters produce lattices of positions for bulk creation.

use bevy::prelude::*;

use super::error::{FluidError, Result};
use super::params::FluidParams;

/// Stable index of a particle inside the simulation arena.
///
/// Ids stay valid until [`FluidSimulation::clear`](super::simulation::FluidSimulation::clear).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub usize);

/// A single SPH fluid parcel.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Force accumulator, zeroed at the start of every step.
    pub force: Vec3,
    pub mass: f32,
    /// Density estimate from the last step.
    pub density: f32,
    /// Density at which pressure is zero.
    pub rest_density: f32,
    /// Pressure from the equation of state in the last step.
    pub pressure: f32,
    /// Grid cell the particle is currently bucketed in.
    pub(crate) cell: Option<usize>,
    /// Position before the last integration, the start of the frame sweep.
    pub(crate) previous_position: Vec3,
}

impl Particle {
    /// Create a particle at rest with the given mass and rest density.
    pub fn new(position: Vec3, mass: f32, rest_density: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            density: rest_density,
            rest_density,
            pressure: 0.0,
            cell: None,
            previous_position: position,
        }
    }

    /// Create a particle at rest with the default mass and rest density from
    /// `params`.
    pub fn from_params(position: Vec3, params: &FluidParams) -> Self {
        Self::new(position, params.particle_mass, params.rest_density)
    }

    /// Set the initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the mass.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Set the rest density. The density estimate is reset to match.
    pub fn with_rest_density(mut self, rest_density: f32) -> Self {
        self.rest_density = rest_density;
        self.density = rest_density;
        self
    }

    /// Grid cell the particle was last bucketed in, if any.
    pub fn cell(&self) -> Option<usize> {
        self.cell
    }

    /// Movement over the last integration.
    pub fn displacement(&self) -> Vec3 {
        self.position - self.previous_position
    }

    /// Rejects particles that would poison the solver.
    pub fn validate(&self) -> Result<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(FluidError::NonPositiveMass(self.mass));
        }
        if !(self.rest_density.is_finite() && self.rest_density >= 0.0) {
            return Err(FluidError::NegativeRestDensity(self.rest_density));
        }
        if !self.position.is_finite() {
            return Err(FluidError::NonFinite("particle position"));
        }
        if !self.velocity.is_finite() {
            return Err(FluidError::NonFinite("particle velocity"));
        }
        Ok(())
    }
}

/// Shape for fluid emitters.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub enum EmitterShape {
    /// Box-shaped emitter.
    Box { half_extents: Vec3 },
    /// Spherical emitter.
    Sphere { radius: f32 },
    /// Cylindrical emitter, axis along Y.
    Cylinder { radius: f32, half_height: f32 },
}

impl Default for EmitterShape {
    fn default() -> Self {
        EmitterShape::Box {
            half_extents: Vec3::splat(10.0),
        }
    }
}

/// Fills a volume with a lattice of particles.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct FluidEmitter {
    /// Shape of the emitter volume.
    pub shape: EmitterShape,

    /// Center of the emitter volume.
    pub center: Vec3,

    /// Spacing between particles.
    pub particle_spacing: f32,

    /// Initial velocity for spawned particles.
    pub initial_velocity: Vec3,

    /// Mass of each particle. `None` takes the simulation default.
    pub mass: Option<f32>,

    /// Rest density of each particle. `None` takes the simulation default.
    pub rest_density: Option<f32>,
}

impl Default for FluidEmitter {
    fn default() -> Self {
        Self {
            shape: EmitterShape::default(),
            center: Vec3::ZERO,
            particle_spacing: 2.5,
            initial_velocity: Vec3::ZERO,
            mass: None,
            rest_density: None,
        }
    }
}

impl FluidEmitter {
    /// Create a box-shaped emitter.
    pub fn box_emitter(center: Vec3, half_extents: Vec3, particle_spacing: f32) -> Self {
        Self {
            shape: EmitterShape::Box { half_extents },
            center,
            particle_spacing,
            ..default()
        }
    }

    /// Create a spherical emitter.
    pub fn sphere_emitter(center: Vec3, radius: f32, particle_spacing: f32) -> Self {
        Self {
            shape: EmitterShape::Sphere { radius },
            center,
            particle_spacing,
            ..default()
        }
    }

    /// Set initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.initial_velocity = velocity;
        self
    }

    /// Set per-particle mass and rest density.
    pub fn with_material(mut self, mass: f32, rest_density: f32) -> Self {
        self.mass = Some(mass);
        self.rest_density = Some(rest_density);
        self
    }

    /// Generate particle positions for this emitter shape.
    pub fn generate_positions(&self) -> Vec<Vec3> {
        let spacing = self.particle_spacing;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Vec::new();
        }

        let (half, inside): (Vec3, Box<dyn Fn(Vec3) -> bool>) = match self.shape {
            EmitterShape::Box { half_extents } => (half_extents, Box::new(|_| true)),
            EmitterShape::Sphere { radius } => (
                Vec3::splat(radius),
                Box::new(move |p: Vec3| p.length_squared() <= radius * radius),
            ),
            EmitterShape::Cylinder { radius, half_height } => (
                Vec3::new(radius, half_height, radius),
                Box::new(move |p: Vec3| p.x * p.x + p.z * p.z <= radius * radius),
            ),
        };

        let steps = (half * 2.0 / spacing).floor().as_uvec3();
        let mut positions = Vec::new();
        for ix in 0..=steps.x {
            for iy in 0..=steps.y {
                for iz in 0..=steps.z {
                    let local = -half + Vec3::new(ix as f32, iy as f32, iz as f32) * spacing;
                    if inside(local) {
                        positions.push(self.center + local);
                    }
                }
            }
        }
        positions
    }

    /// Generate ready-to-add particles. Unset material falls back to the
    /// defaults in `params`.
    pub fn generate_particles(&self, params: &FluidParams) -> Vec<Particle> {
        let mass = self.mass.unwrap_or(params.particle_mass);
        let rest_density = self.rest_density.unwrap_or(params.rest_density);
        self.generate_positions()
            .into_iter()
            .map(|position| {
                Particle::new(position, mass, rest_density)
                    .with_velocity(self.initial_velocity)
            })
            .collect()
    }
}

/// Per-particle record laid out for direct upload into a vertex or storage
/// buffer by the renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    /// Position (xyz) + density (w).
    pub position_density: [f32; 4],
    /// Velocity (xyz) + pressure (w).
    pub velocity_pressure: [f32; 4],
}

impl From<&Particle> for ParticleInstance {
    fn from(p: &Particle) -> Self {
        Self {
            position_density: [p.position.x, p.position.y, p.position.z, p.density],
            velocity_pressure: [p.velocity.x, p.velocity.y, p.velocity.z, p.pressure],
        }
    }
}

impl ParticleInstance {
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.position_density[0],
            self.position_density[1],
            self.position_density[2],
        )
    }
}
