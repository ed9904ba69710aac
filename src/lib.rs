//! Fluidsim - SPH fluid simulation for Bevy
//!
//! This library simulates liquids with Smoothed Particle Hydrodynamics and lets
//! them interact with rigid obstacles inside a bounded domain.
//!
//! # Features
//!
//! - **SPH forces**: Pressure, viscosity and color-field surface tension
//! - **Rigid obstacles**: Spheres, boxes and rotating boxes with swept collision tests
//! - **Spatial grid**: Incremental or full rebuilds, parallel force gathering
//!   with the `parallel` feature
//! - **RON configuration**: Parameters load from and save to RON files
//! - **Easy Integration**: Simple Bevy plugin interface
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use fluidsim::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(FluidPlugin::default())
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut simulation: ResMut<FluidSimulation>) {
//!     let emitter = FluidEmitter::box_emitter(Vec3::new(0.0, 20.0, 0.0), Vec3::splat(5.0), 2.5);
//!     if let Err(err) = simulation.spawn_emitter(&emitter) {
//!         warn!("{err}");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`fluid`]: Core fluid simulation module
//!   - [`fluid::kernels`]: Smoothing kernels
//!   - [`fluid::spatial`]: Uniform grid for neighbor search
//!   - [`fluid::solver`]: Force solver
//!   - [`fluid::body`]: Rigid obstacles
//!   - [`fluid::collision`]: Collision response
//!   - [`fluid::simulation`]: Simulation resource
//!   - [`fluid::plugin`]: Bevy plugin

pub mod fluid;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::fluid::prelude::*;
}
