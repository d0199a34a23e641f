// ============================================================================
// main.rs — Cursor Trail
// Entry point. Initializes logging, merges config file and CLI flags, then
// starts either the windowed event loop or a headless run.
// ============================================================================

mod app;
mod config;
mod driver;
mod error;
mod field;
mod gpu_field;
mod headless;
mod input;
mod metrics;
mod pipeline;
mod presenter;
mod renderer;
mod updater;

use std::path::PathBuf;

use clap::Parser;
use winit::event_loop::EventLoop;

use app::App;
use config::{Backend, PresentMode, TrailParams};
use error::TrailError;
use headless::{run_headless, HeadlessConfig};

#[derive(Parser, Debug)]
#[command(name = "cursor-trail", about = "Pointer trail drawn from a persistent distance field")]
struct Args {
    /// JSON parameter file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the update pass on the CPU instead of a compute shader
    #[arg(long)]
    cpu: bool,

    /// Start in raw distance mode
    #[arg(long)]
    raw: bool,

    /// Stroke threshold in texel units
    #[arg(long)]
    threshold: Option<f32>,

    /// Distance units per second added to the carried trail (0 = permanent)
    #[arg(long)]
    fade_rate: Option<f32>,

    /// Run without a window and export a PNG at the end
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode
    #[arg(long)]
    frames: Option<u32>,

    /// Headless field width
    #[arg(long)]
    width: Option<u32>,

    /// Headless field height
    #[arg(long)]
    height: Option<u32>,

    /// Seed for the headless pointer wander
    #[arg(long)]
    seed: Option<u64>,

    /// Headless PNG output path
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Config file first, then CLI overrides.
fn resolve_params(args: &Args) -> Result<TrailParams, TrailError> {
    let mut params = match &args.config {
        Some(path) => {
            log::info!("Loading parameters from {}", path.display());
            TrailParams::load(path)?
        }
        None => TrailParams::default(),
    };

    if args.cpu {
        params.backend = Backend::Cpu;
    }
    if args.raw {
        params.present_mode = PresentMode::Raw;
    }
    if let Some(threshold) = args.threshold {
        params.stroke_threshold = threshold;
    }
    if let Some(fade_rate) = args.fade_rate {
        params.fade_rate = fade_rate;
    }

    params.validate()?;
    Ok(params)
}

fn headless_config(args: &Args) -> HeadlessConfig {
    let defaults = HeadlessConfig::default();
    HeadlessConfig {
        frames: args.frames.unwrap_or(defaults.frames),
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        seed: args.seed,
        out_path: args.out.clone(),
        progress_interval: defaults.progress_interval,
    }
}

fn run_windowed(params: TrailParams) -> Result<(), TrailError> {
    let event_loop =
        EventLoop::new().map_err(|e| TrailError::Gpu(format!("event loop creation failed: {e}")))?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = App::new(params);
    event_loop
        .run_app(&mut app)
        .map_err(|e| TrailError::Gpu(format!("event loop failed: {e}")))?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run(args: Args) -> Result<(), TrailError> {
    let params = resolve_params(&args)?;
    if args.headless {
        run_headless(&headless_config(&args), &params)
    } else {
        run_windowed(params)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
