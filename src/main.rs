//! Fluidsim - headless SPH demo
//!
//! Runs a dam break against a sphere and a spinning paddle for a fixed number
//! of steps, logging progress, then exits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::Parser;
use fluidsim::prelude::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of simulation steps to run.
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Fixed steps per simulated second.
    #[arg(long, default_value_t = 60.0)]
    hz: f64,

    /// RON file with fluid parameters. Missing fields use defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lattice spacing of the initial fluid block.
    #[arg(short, long, default_value_t = 2.5)]
    spacing: f32,

    /// Print the parameters as RON and exit.
    #[arg(long)]
    print_config: bool,
}

/// Settings the demo systems read.
#[derive(Resource, Debug)]
struct DemoSettings {
    frames: u64,
    spacing: f32,
}

fn main() {
    let args = Args::parse();

    let params = match &args.config {
        Some(path) => match load_params(path) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("Error: could not load {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => FluidParams::water(),
    };

    if args.print_config {
        match params.to_ron_string() {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    if !(args.hz.is_finite() && args.hz > 0.0) {
        eprintln!("Error: hz must be positive, got {}", args.hz);
        std::process::exit(1);
    }

    let bounds = BoundingVolume::new(Vec3::new(-40.0, 0.0, -15.0), Vec3::new(40.0, 50.0, 15.0));
    let bounds = match bounds {
        Ok(bounds) => bounds,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let timestep = Duration::from_secs_f64(1.0 / args.hz);
    App::new()
        .add_plugins((MinimalPlugins, LogPlugin::default()))
        // Every app update advances exactly one fixed step.
        .insert_resource(TimeUpdateStrategy::ManualDuration(timestep))
        .insert_resource(Time::<Fixed>::from_duration(timestep))
        .add_plugins(
            FluidPlugin::default()
                .with_params(params)
                .with_bounds(bounds),
        )
        .insert_resource(DemoSettings {
            frames: args.frames,
            spacing: args.spacing,
        })
        .add_systems(Startup, setup_scene)
        .add_systems(Update, report_progress)
        .run();
}

fn load_params(path: &Path) -> Result<FluidParams, String> {
    let source = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    FluidParams::from_ron_str(&source).map_err(|err| err.to_string())
}

/// Dam break: a block of fluid on the left collapses toward a sphere and a
/// paddle spinning about the z axis.
fn setup_scene(settings: Res<DemoSettings>, mut simulation: ResMut<FluidSimulation>) {
    let emitter = FluidEmitter::box_emitter(
        Vec3::new(-28.0, 14.0, 0.0),
        Vec3::new(10.0, 12.0, 12.0),
        settings.spacing,
    );
    if let Err(err) = simulation.spawn_emitter(&emitter) {
        error!("could not spawn fluid: {err}");
        return;
    }

    let bodies = [
        RigidBody::sphere(Vec3::new(5.0, 6.0, 0.0), 6.0, 50.0),
        RigidBody::rotating_box(Vec3::new(25.0, 10.0, 0.0), Vec3::new(14.0, 2.0, 8.0), 20.0)
            .with_angular_velocity(Vec3::new(0.0, 0.0, -1.5)),
    ];
    if let Err(err) = simulation.add_bodies(bodies) {
        error!("could not add bodies: {err}");
        return;
    }

    simulation.set_surface_tension(true);
    info!(
        "dam break: {} particles, {} bodies",
        simulation.particle_count(),
        simulation.body_count()
    );
}

/// Log progress and exit once the requested number of steps has run.
fn report_progress(
    settings: Res<DemoSettings>,
    state: Res<FluidState>,
    mut exit: EventWriter<AppExit>,
) {
    if !state.is_changed() || state.frame == 0 {
        return;
    }

    if state.frame % 100 == 0 {
        let report = state.last_report;
        info!(
            "step {}: t = {:.2}s, density error {:.2}%, wall contacts {}, body contacts {}",
            state.frame,
            state.time,
            state.avg_density_error * 100.0,
            report.boundary_contacts,
            report.body_contacts,
        );
    }

    if state.frame >= settings.frames {
        info!(
            "finished {} steps with {} particles",
            state.frame, state.particle_count
        );
        exit.write(AppExit::Success);
    }
}
