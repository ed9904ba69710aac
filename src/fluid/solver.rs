//! SPH force solver.
//!
//! Forces are accumulated in a fixed order every step:
//! density → pressure → pressure force → gravity → wind → viscosity → surface tension.
//!
//! Two pair traversals are supported and produce the same sums:
//!
//! - [`NeighborSearch::AllPairs`] visits every unordered pair `(i < j)` once and
//!   applies both sides of the interaction.
//! - [`NeighborSearch::Grid`] gathers, for each particle, the one-sided
//!   contribution of every candidate in its 3x3x3 cell block. Each pair in range
//!   is seen from both ends, and each end writes only its own accumulator, so
//!   the gather runs in parallel when the `parallel` feature is enabled.

use std::ops::AddAssign;

use bevy::prelude::*;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::body::RigidBody;
use super::kernels::SphKernels;
use super::params::{FluidParams, SimulationToggles};
use super::particle::Particle;
use super::spatial::SpatialGrid;

/// How the solver enumerates interacting pairs.
#[derive(Clone, Copy, Debug)]
pub enum NeighborSearch<'a> {
    /// Every unordered pair, with a mirrored update.
    AllPairs,
    /// Candidates from a grid that is up to date with the particle positions.
    Grid(&'a SpatialGrid),
}

/// Color-field sums used for surface tension.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ColorField {
    gradient: Vec3,
    laplacian: f32,
}

impl AddAssign for ColorField {
    fn add_assign(&mut self, rhs: Self) {
        self.gradient += rhs.gradient;
        self.laplacian += rhs.laplacian;
    }
}

/// Accumulates SPH and external forces into particle and body accumulators.
pub struct ForceSolver<'a> {
    params: &'a FluidParams,
    toggles: SimulationToggles,
    search: NeighborSearch<'a>,
}

impl<'a> ForceSolver<'a> {
    pub fn new(
        params: &'a FluidParams,
        toggles: SimulationToggles,
        search: NeighborSearch<'a>,
    ) -> Self {
        Self {
            params,
            toggles,
            search,
        }
    }

    /// Run every force pass in order. Accumulators must already be zeroed.
    pub fn accumulate(&self, particles: &mut [Particle], bodies: &mut [RigidBody]) {
        self.compute_densities(particles);
        self.compute_pressures(particles);
        self.apply_pressure_forces(particles);
        self.apply_gravity(particles, bodies);
        self.apply_wind(particles);
        self.apply_viscosity_forces(particles);
        if self.toggles.surface_tension {
            self.apply_surface_tension(particles);
        }
    }

    /// Density from the rest-density baseline plus every neighbor's Poly6
    /// weight. A particle never contributes to its own density.
    pub fn compute_densities(&self, particles: &mut [Particle]) {
        let h = self.params.smoothing_radius;
        let sums = self.pair_sums(particles, |i, j| {
            let r_sq = particles[i].position.distance_squared(particles[j].position);
            particles[j].mass * SphKernels::poly6(r_sq, h)
        });

        for (particle, sum) in particles.iter_mut().zip(sums) {
            particle.density = particle.rest_density + sum;
        }
    }

    /// Equation of state. Negative pressure is kept.
    pub fn compute_pressures(&self, particles: &mut [Particle]) {
        let k = self.params.stiffness;
        for particle in particles {
            particle.pressure = k * (particle.density - particle.rest_density);
        }
    }

    pub fn apply_pressure_forces(&self, particles: &mut [Particle]) {
        let h = self.params.smoothing_radius;
        let density_eps = self.params.density_epsilon;
        let distance_eps = self.params.distance_epsilon;

        let forces = self.pair_sums(particles, |i, j| {
            let (pi, pj) = (&particles[i], &particles[j]);
            let r = pi.position - pj.position;
            if pi.density <= density_eps
                || pj.density <= density_eps
                || r.length() <= distance_eps
            {
                return Vec3::ZERO;
            }
            let shared = (pi.pressure + pj.pressure) / (2.0 * pj.density);
            -pj.mass * shared * SphKernels::spiky_gradient(r, h)
        });
        add_forces(particles, forces);
    }

    /// Gravity scaled by rest density for particles and by mass for bodies.
    pub fn apply_gravity(&self, particles: &mut [Particle], bodies: &mut [RigidBody]) {
        let gravity = self.params.gravity;
        if self.toggles.fluid_gravity {
            for particle in particles.iter_mut() {
                particle.force += gravity * particle.rest_density;
            }
        }
        if self.toggles.body_gravity {
            for body in bodies.iter_mut() {
                body.force += gravity * body.mass;
            }
        }
    }

    pub fn apply_wind(&self, particles: &mut [Particle]) {
        if !self.toggles.wind {
            return;
        }
        let wind = self.params.wind;
        for particle in particles {
            particle.force += wind * particle.rest_density;
        }
    }

    pub fn apply_viscosity_forces(&self, particles: &mut [Particle]) {
        let h = self.params.smoothing_radius;
        let mu = self.params.viscosity;
        let density_eps = self.params.density_epsilon;

        let forces = self.pair_sums(particles, |i, j| {
            let (pi, pj) = (&particles[i], &particles[j]);
            if pj.density <= density_eps {
                return Vec3::ZERO;
            }
            let r = pi.position - pj.position;
            mu * pj.mass * (pj.velocity - pi.velocity) / pj.density
                * SphKernels::viscosity_laplacian(r, h)
        });
        add_forces(particles, forces);
    }

    /// Color-field surface tension. Only particles whose color gradient
    /// exceeds the threshold lie on the surface and receive a force.
    pub fn apply_surface_tension(&self, particles: &mut [Particle]) {
        let h = self.params.smoothing_radius;
        let sigma = self.params.surface_tension;
        let threshold = self.params.surface_threshold;
        let density_eps = self.params.density_epsilon;

        let fields = self.pair_sums(particles, |i, j| {
            let pj = &particles[j];
            if pj.density <= density_eps {
                return ColorField::default();
            }
            let r = particles[i].position - pj.position;
            let volume = pj.mass / pj.density;
            ColorField {
                gradient: volume * SphKernels::poly6_gradient(r, h),
                laplacian: volume * SphKernels::poly6_laplacian(r, h),
            }
        });

        for (particle, field) in particles.iter_mut().zip(fields) {
            let magnitude = field.gradient.length();
            if magnitude > threshold {
                particle.force += -sigma * field.laplacian * field.gradient / magnitude;
            }
        }
    }

    /// Per particle, the sum of `contribution(i, j)` over its neighbors `j != i`.
    fn pair_sums<T, F>(&self, particles: &[Particle], contribution: F) -> Vec<T>
    where
        T: Copy + Default + AddAssign + Send,
        F: Fn(usize, usize) -> T + Sync,
    {
        match self.search {
            NeighborSearch::AllPairs => mirrored_sums(particles.len(), contribution),
            NeighborSearch::Grid(grid) => gathered_sums(particles, grid, contribution),
        }
    }
}

fn mirrored_sums<T, F>(len: usize, contribution: F) -> Vec<T>
where
    T: Copy + Default + AddAssign,
    F: Fn(usize, usize) -> T,
{
    let mut sums = vec![T::default(); len];
    for i in 0..len {
        for j in (i + 1)..len {
            let to_i = contribution(i, j);
            let to_j = contribution(j, i);
            sums[i] += to_i;
            sums[j] += to_j;
        }
    }
    sums
}

fn gathered_sums<T, F>(particles: &[Particle], grid: &SpatialGrid, contribution: F) -> Vec<T>
where
    T: Default + AddAssign + Send,
    F: Fn(usize, usize) -> T + Sync,
{
    let gather = |i: usize| {
        let particle = &particles[i];
        let cell = particle
            .cell
            .unwrap_or_else(|| grid.locate(particle.position).0);
        let mut sum = T::default();
        for j in grid.candidates(cell) {
            if j != i && j < particles.len() {
                sum += contribution(i, j);
            }
        }
        sum
    };

    #[cfg(feature = "parallel")]
    let sums = (0..particles.len()).into_par_iter().map(gather).collect();
    #[cfg(not(feature = "parallel"))]
    let sums = (0..particles.len()).map(gather).collect();
    sums
}

fn add_forces(particles: &mut [Particle], forces: Vec<Vec3>) {
    for (particle, force) in particles.iter_mut().zip(forces) {
        particle.force += force;
    }
}

/// Mean of `|density - rest| / rest` over particles with a non-zero rest density.
pub fn average_density_error(particles: &[Particle]) -> f32 {
    let (sum, count) = particles
        .iter()
        .filter(|p| p.rest_density > 0.0)
        .fold((0.0, 0usize), |(sum, count), p| {
            let error = (p.density - p.rest_density).abs() / p.rest_density;
            (sum + error, count + 1)
        });
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}
