//! Smoothed particle hydrodynamics (SPH) fluid simulation module for Bevy.
//!
//! The simulation advances a set of fluid particles and rigid obstacles inside
//! an axis-aligned bounding volume. Each step computes densities and pressures,
//! accumulates pressure, viscosity, surface tension and external forces,
//! integrates with semi-implicit Euler and resolves collisions.
//!
//! # Architecture
//!
//! - [`params`]: Simulation parameters and feature toggles
//! - [`error`]: Error type for rejected inputs
//! - [`kernels`]: SPH smoothing kernels
//! - [`particle`]: Particle data, emitters and render records
//! - [`body`]: Rigid bodies and swept collision tests
//! - [`boundary`]: Bounding volume
//! - [`spatial`]: Uniform grid for neighbor search
//! - [`solver`]: Force accumulation
//! - [`integrator`]: Time integration
//! - [`collision`]: Collision response
//! - [`simulation`]: The simulation resource and step sequence
//! - [`plugin`]: Bevy plugin for easy integration
//!
//! # Example
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use fluidsim::fluid::prelude::*;
//!
//! fn main() -> Result<(), FluidError> {
//!     let bounds = BoundingVolume::cube(Vec3::ZERO, 60.0)?;
//!     let mut simulation = FluidSimulation::new(FluidParams::water(), bounds)?;
//!
//!     // A block of fluid that collapses onto a sphere
//!     simulation.spawn_emitter(&FluidEmitter::box_emitter(
//!         Vec3::new(0.0, 15.0, 0.0),
//!         Vec3::splat(6.0),
//!         2.0,
//!     ))?;
//!     simulation.add_body(RigidBody::sphere(Vec3::ZERO, 5.0, 10.0))?;
//!
//!     for _ in 0..120 {
//!         simulation.step(1.0 / 60.0)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod boundary;
pub mod collision;
pub mod error;
pub mod integrator;
pub mod kernels;
pub mod params;
pub mod particle;
pub mod plugin;
pub mod simulation;
pub mod solver;
pub mod spatial;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::body::*;
    pub use super::boundary::*;
    pub use super::collision::*;
    pub use super::error::FluidError;
    pub use super::kernels::*;
    pub use super::params::*;
    pub use super::particle::*;
    pub use super::plugin::*;
    pub use super::simulation::*;
    pub use super::solver::*;
    pub use super::spatial::*;
}
