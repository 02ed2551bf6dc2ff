//! # Tearable Cloth Runner
//!
//! Headless driver: loads settings, sweeps the probe down through the cloth
//! and logs tearing progress. Set `RUST_LOG=info` (or `debug` for per-tick
//! tear counts) to see output.

use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

use tearable_cloth::error::ClothError;
use tearable_cloth::scene::{ClothScene, Scene};
use tearable_cloth::simulation::SimulationSettings;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct ProgramArgs {
    /// RON settings file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Wall-clock seconds per frame fed to the fixed-timestep clock
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f32,

    /// Worker threads (0 = rayon default)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Log stats every this many frames
    #[arg(long, default_value_t = 60)]
    report_every: u32,

    /// Distance the probe travels downwards over the whole run
    #[arg(long, default_value_t = 1.0)]
    probe_travel: f32,

    /// Print the effective settings as RON and exit
    #[arg(long)]
    dump_settings: bool,
}

fn main() {
    env_logger::init();
    let args = ProgramArgs::parse();

    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &ProgramArgs) -> Result<(), ClothError> {
    let settings = match &args.config {
        Some(path) => SimulationSettings::load(path)?,
        None => SimulationSettings::default(),
    };

    if args.dump_settings {
        println!("{}", settings.to_ron_string()?);
        return Ok(());
    }

    if args.threads > 0 {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
        {
            log::warn!("Could not configure rayon pool: {err}");
        }
    }
    log::info!("Using {} worker threads", rayon::current_num_threads());

    let mut scene = ClothScene::new(&settings)?;
    let start = settings.controls.probe.position;
    let report_every = args.report_every.max(1);

    for frame in 0..args.frames {
        let progress = frame as f32 / args.frames.max(1) as f32;
        scene.set_probe_position(start - Vec3::Y * (args.probe_travel * progress));
        scene.update(args.frame_dt);

        if (frame + 1) % report_every == 0 {
            log::info!("{}", scene.stats());
        }
    }

    let stats = scene.stats();
    println!(
        "Simulated {:.2}s over {} ticks: {} springs torn, {} vertices on a tear",
        scene.current_time(),
        stats.tick,
        stats.torn_springs,
        stats.torn_vertices
    );
    Ok(())
}
