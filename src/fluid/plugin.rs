//! Bevy plugin for fluid simulation.

use bevy::log::warn;
use bevy::prelude::*;

use super::boundary::BoundingVolume;
use super::params::FluidParams;
use super::simulation::{FluidSimulation, StepReport};

/// Plugin that steps an SPH fluid simulation in `FixedUpdate`.
///
/// The plugin inserts [`FluidParams`], [`FluidSimulation`] and [`FluidState`].
/// Edits to the `FluidParams` resource are pushed into the simulation before
/// the next step.
///
/// # Example
///
/// ```rust,ignore
/// use bevy::prelude::*;
/// use fluidsim::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(MinimalPlugins)
///         .add_plugins(FluidPlugin::default().with_params(FluidParams::honey()))
///         .run();
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct FluidPlugin {
    pub params: FluidParams,
    pub bounds: BoundingVolume,
}

impl FluidPlugin {
    pub fn with_params(mut self, params: FluidParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingVolume) -> Self {
        self.bounds = bounds;
        self
    }
}

impl Plugin for FluidPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<FluidParams>()
            .register_type::<BoundingVolume>();

        let simulation = match FluidSimulation::new(self.params.clone(), self.bounds) {
            Ok(simulation) => {
                app.insert_resource(self.params.clone());
                simulation
            }
            Err(err) => {
                warn!("invalid fluid configuration, using defaults: {err}");
                app.insert_resource(FluidParams::default());
                FluidSimulation::default()
            }
        };

        app.insert_resource(simulation)
            .init_resource::<FluidState>()
            .add_systems(FixedUpdate, (sync_params, step_simulation).chain());
    }
}

/// Run control and last-step statistics.
#[derive(Resource, Clone, Debug, Default)]
pub struct FluidState {
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Advance one step while paused.
    pub step_requested: bool,
    /// Completed steps.
    pub frame: u64,
    /// Simulated seconds.
    pub time: f32,
    pub particle_count: usize,
    pub avg_density_error: f32,
    pub last_report: StepReport,
}

impl FluidState {
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn request_step(&mut self) {
        self.step_requested = true;
    }
}

/// Push edited parameters into the simulation.
fn sync_params(params: Res<FluidParams>, mut simulation: ResMut<FluidSimulation>) {
    if !params.is_changed() || *params == *simulation.params() {
        return;
    }
    if let Err(err) = simulation.set_params(params.clone()) {
        warn!("ignoring fluid parameter update: {err}");
    }
}

/// Advance the simulation by one fixed timestep.
fn step_simulation(
    time: Res<Time<Fixed>>,
    mut state: ResMut<FluidState>,
    mut simulation: ResMut<FluidSimulation>,
) {
    if state.paused && !state.step_requested {
        return;
    }
    state.step_requested = false;

    let dt = time.delta_secs();
    match simulation.step(dt) {
        Ok(report) => {
            state.frame += 1;
            state.time += dt;
            state.particle_count = simulation.particle_count();
            state.avg_density_error = simulation.average_density_error();
            state.last_report = report;
        }
        Err(err) => warn!("fluid step skipped: {err}"),
    }
}
