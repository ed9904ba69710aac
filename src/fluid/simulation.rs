//! Fluid simulation core logic.
//!
//! [`FluidSimulation`] owns the particle and body arenas, the spatial grid and
//! the parameters. A step runs as a fixed phase sequence:
//! clear forces → refresh grid → accumulate forces → integrate → collide.

use bevy::log::{debug, trace};
use bevy::prelude::*;

use super::body::{BodyId, RigidBody};
use super::boundary::BoundingVolume;
use super::collision::CollisionResolver;
use super::error::{FluidError, Result};
use super::integrator;
use super::params::{FluidParams, GridRebuild, SimulationToggles};
use super::particle::{FluidEmitter, Particle, ParticleId, ParticleInstance};
use super::solver::{self, ForceSolver, NeighborSearch};
use super::spatial::{SpatialGrid, SpatialGridConfig};

/// Upper bound on grid cells, so a tiny smoothing radius in a large volume
/// fails at construction instead of exhausting memory.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Diagnostics from one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles pushed back inside the bounding volume.
    pub boundary_contacts: usize,
    /// Bodies pushed back inside the bounding volume.
    pub body_boundary_contacts: usize,
    /// Particles that hit a rigid body.
    pub body_contacts: usize,
    /// Particles outside the grid that were clamped into edge cells.
    pub clamped: usize,
    /// Particles that changed grid cell during an incremental refresh.
    pub moved: usize,
}

/// Main fluid simulation resource.
#[derive(Resource, Debug)]
pub struct FluidSimulation {
    params: FluidParams,
    bounds: BoundingVolume,
    toggles: SimulationToggles,
    particles: Vec<Particle>,
    bodies: Vec<RigidBody>,
    grid: SpatialGrid,
    /// Buckets no longer match the arena; the next refresh must be a full rebuild.
    grid_dirty: bool,
}

impl Default for FluidSimulation {
    fn default() -> Self {
        Self::build(FluidParams::default(), BoundingVolume::default())
    }
}

impl FluidSimulation {
    /// Create an empty simulation.
    pub fn new(params: FluidParams, bounds: BoundingVolume) -> Result<Self> {
        bounds.validate()?;
        params.validate()?;
        check_grid_size(&bounds, params.cell_size())?;
        Ok(Self::build(params, bounds))
    }

    fn build(params: FluidParams, bounds: BoundingVolume) -> Self {
        let grid = SpatialGrid::new(SpatialGridConfig::for_bounds(&bounds, params.cell_size()));
        Self {
            params,
            bounds,
            toggles: SimulationToggles::default(),
            particles: Vec::new(),
            bodies: Vec::new(),
            grid,
            grid_dirty: true,
        }
    }

    /// Replace the parameters. The grid is reallocated when the cell size changes.
    pub fn set_params(&mut self, params: FluidParams) -> Result<()> {
        params.validate()?;
        if params.cell_size() != self.params.cell_size() {
            check_grid_size(&self.bounds, params.cell_size())?;
            let config = SpatialGridConfig::for_bounds(&self.bounds, params.cell_size());
            self.grid = SpatialGrid::new(config);
            self.grid_dirty = true;
            debug!(
                "spatial grid resized to {} cells",
                self.grid.config().cell_count()
            );
        }
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    pub fn bounds(&self) -> &BoundingVolume {
        &self.bounds
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.0)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    /// Mutable access for host-driven bodies. The body is expected to stay
    /// valid (positive mass and dimensions).
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    /// Add a particle after validating it.
    pub fn add_particle(&mut self, particle: Particle) -> Result<ParticleId> {
        if let Err(err) = particle.validate() {
            debug!("rejected particle: {err}");
            return Err(err);
        }
        let id = ParticleId(self.particles.len());
        self.particles.push(particle);
        self.grid_dirty = true;
        Ok(id)
    }

    /// Add a particle at rest at `position` with the default mass and rest
    /// density from the parameters.
    pub fn add_particle_at(&mut self, position: Vec3) -> Result<ParticleId> {
        self.add_particle(Particle::from_params(position, &self.params))
    }

    /// Add a batch of particles. Nothing is added if any particle is invalid.
    pub fn add_particles(
        &mut self,
        particles: impl IntoIterator<Item = Particle>,
    ) -> Result<Vec<ParticleId>> {
        let batch: Vec<Particle> = particles.into_iter().collect();
        if let Some(err) = batch.iter().find_map(|p| p.validate().err()) {
            debug!("rejected batch of {} particles: {err}", batch.len());
            return Err(err);
        }

        let first = self.particles.len();
        self.particles.extend(batch);
        self.grid_dirty = true;
        Ok((first..self.particles.len()).map(ParticleId).collect())
    }

    /// Fill an emitter volume with particles. Emitters without an explicit
    /// material use the parameter defaults.
    pub fn spawn_emitter(&mut self, emitter: &FluidEmitter) -> Result<Vec<ParticleId>> {
        let ids = self.add_particles(emitter.generate_particles(&self.params))?;
        debug!(
            "emitter spawned {} particles at {}",
            ids.len(),
            emitter.center
        );
        Ok(ids)
    }

    /// Add a rigid body after validating it.
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyId> {
        if let Err(err) = body.validate() {
            debug!("rejected body: {err}");
            return Err(err);
        }
        let id = BodyId(self.bodies.len());
        self.bodies.push(body);
        Ok(id)
    }

    /// Add a batch of bodies. Nothing is added if any body is invalid.
    pub fn add_bodies(
        &mut self,
        bodies: impl IntoIterator<Item = RigidBody>,
    ) -> Result<Vec<BodyId>> {
        let batch: Vec<RigidBody> = bodies.into_iter().collect();
        if let Some(err) = batch.iter().find_map(|b| b.validate().err()) {
            debug!("rejected batch of {} bodies: {err}", batch.len());
            return Err(err);
        }

        let first = self.bodies.len();
        self.bodies.extend(batch);
        Ok((first..self.bodies.len()).map(BodyId).collect())
    }

    /// Remove every particle and body. Previously issued ids become invalid.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.bodies.clear();
        self.grid.clear(&mut self.particles);
        self.grid_dirty = true;
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Result<StepReport> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(FluidError::InvalidTimeStep(dt));
        }
        let mut report = StepReport::default();

        integrator::clear_forces(&mut self.particles, &mut self.bodies);

        let search = if self.toggles.spatial_index {
            report.moved = self.refresh_grid();
            report.clamped = self.grid.clamped_count();
            NeighborSearch::Grid(&self.grid)
        } else {
            NeighborSearch::AllPairs
        };
        ForceSolver::new(&self.params, self.toggles, search)
            .accumulate(&mut self.particles, &mut self.bodies);

        integrator::integrate_particles(&mut self.particles, dt);
        integrator::integrate_bodies(&mut self.bodies, dt);

        let resolver = CollisionResolver::new(&self.params, &self.bounds);
        report.boundary_contacts = resolver.contain_particles(&mut self.particles);
        report.body_boundary_contacts = resolver.contain_bodies(&mut self.bodies);
        report.body_contacts = resolver.collide_bodies(&mut self.particles, &self.bodies);

        trace!(
            "step dt={dt}: {} particles, {} bodies, {report:?}",
            self.particles.len(),
            self.bodies.len()
        );
        Ok(report)
    }

    fn refresh_grid(&mut self) -> usize {
        if self.grid_dirty || self.params.grid_rebuild == GridRebuild::Full {
            self.grid.rebuild(&mut self.particles);
            self.grid_dirty = false;
            0
        } else {
            self.grid.update(&mut self.particles)
        }
    }

    pub fn toggles(&self) -> SimulationToggles {
        self.toggles
    }

    pub fn set_toggles(&mut self, toggles: SimulationToggles) {
        self.toggles = toggles;
    }

    pub fn fluid_gravity_enabled(&self) -> bool {
        self.toggles.fluid_gravity
    }

    pub fn set_fluid_gravity(&mut self, enabled: bool) {
        self.toggles.fluid_gravity = enabled;
    }

    pub fn toggle_fluid_gravity(&mut self) {
        self.toggles.fluid_gravity = !self.toggles.fluid_gravity;
    }

    pub fn body_gravity_enabled(&self) -> bool {
        self.toggles.body_gravity
    }

    pub fn set_body_gravity(&mut self, enabled: bool) {
        self.toggles.body_gravity = enabled;
    }

    pub fn toggle_body_gravity(&mut self) {
        self.toggles.body_gravity = !self.toggles.body_gravity;
    }

    pub fn wind_enabled(&self) -> bool {
        self.toggles.wind
    }

    pub fn set_wind(&mut self, enabled: bool) {
        self.toggles.wind = enabled;
    }

    pub fn toggle_wind(&mut self) {
        self.toggles.wind = !self.toggles.wind;
    }

    pub fn surface_tension_enabled(&self) -> bool {
        self.toggles.surface_tension
    }

    pub fn set_surface_tension(&mut self, enabled: bool) {
        self.toggles.surface_tension = enabled;
    }

    pub fn toggle_surface_tension(&mut self) {
        self.toggles.surface_tension = !self.toggles.surface_tension;
    }

    pub fn spatial_index_enabled(&self) -> bool {
        self.toggles.spatial_index
    }

    pub fn set_spatial_index(&mut self, enabled: bool) {
        self.toggles.spatial_index = enabled;
    }

    pub fn toggle_spatial_index(&mut self) {
        self.toggles.spatial_index = !self.toggles.spatial_index;
    }

    /// Per-particle records ready for a vertex or storage buffer.
    pub fn particle_instances(&self) -> Vec<ParticleInstance> {
        self.particles.iter().map(ParticleInstance::from).collect()
    }

    /// Mean relative density error from the last step.
    pub fn average_density_error(&self) -> f32 {
        solver::average_density_error(&self.particles)
    }
}

fn check_grid_size(bounds: &BoundingVolume, cell_size: f32) -> Result<()> {
    let cells = ((bounds.max() - bounds.min()) / cell_size).ceil() + Vec3::splat(2.0);
    let count = cells.x as f64 * cells.y as f64 * cells.z as f64;
    if count > MAX_GRID_CELLS as f64 {
        return Err(FluidError::param(
            "smoothing_radius",
            format!("grid would need {count} cells, limit is {MAX_GRID_CELLS}"),
        ));
    }
    Ok(())
}
