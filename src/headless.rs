// ============================================================================
// headless.rs — Cursor Trail
// Windowless runner: drives the CPU field over a scripted pointer wander and
// exports the presented result as a PNG.
// ============================================================================

use std::path::PathBuf;
use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::TrailParams;
use crate::driver::{FrameContext, FrameDriver};
use crate::error::TrailError;
use crate::input::PointerSmoother;
use crate::metrics::FieldDiagnostics;
use crate::presenter::{export_file_name, save_image};
use crate::updater::PointerSample;

/// Simulated frame interval.
const FRAME_DT: f32 = 1.0 / 60.0;
/// Frames between new wander targets.
const RETARGET_EVERY: u32 = 24;

#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub out_path: Option<PathBuf>,
    pub progress_interval: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            width: 800,
            height: 600,
            seed: None,
            out_path: None,
            progress_interval: 120,
        }
    }
}

/// Pointer targets for a headless run.
pub struct Wander {
    rng: StdRng,
}

impl Wander {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_target(&mut self) -> [f32; 2] {
        [self.rng.gen_range(-0.9..0.9), self.rng.gen_range(-0.9..0.9)]
    }
}

/// Run the scripted session and return the driver in its final state.
pub fn simulate(config: &HeadlessConfig, params: &TrailParams) -> Result<FrameDriver, TrailError> {
    let mut driver =
        FrameDriver::new(config.width, config.height)?.with_fade_rate(params.fade_rate);
    let mut smoother = PointerSmoother::new(params.smoothing_secs);
    let mut wander = Wander::new(config.seed);

    log::info!(
        "Headless run started: {} frames on {}x{}",
        config.frames,
        config.width,
        config.height
    );

    let started = Instant::now();
    let mut last_diag: Option<FieldDiagnostics> = None;
    let diag_interval = params.diag_interval.max(1);

    for step in 0..config.frames {
        if step % RETARGET_EVERY == 0 {
            smoother.set_target(wander.next_target());
        }
        let (current, previous) = smoother.advance(FRAME_DT);

        let ctx = FrameContext {
            width: config.width,
            height: config.height,
            pointer: PointerSample::new(current, previous),
            elapsed: step as f32 * FRAME_DT,
        };
        driver.frame(&ctx)?;

        let done = step + 1;
        if config.progress_interval > 0 && done % config.progress_interval == 0 {
            let total_elapsed = started.elapsed().as_secs_f64().max(1e-6);
            log::info!(
                "Headless progress: {}/{} | fps={:.0}",
                done,
                config.frames,
                done as f64 / total_elapsed,
            );
        }

        if done % diag_interval == 0 {
            let diag = FieldDiagnostics::from_field(driver.current(), params.stroke_threshold);
            diag.log(driver.frame_count(), last_diag.as_ref());
            last_diag = Some(diag);
        }
    }

    Ok(driver)
}

pub fn run_headless(config: &HeadlessConfig, params: &TrailParams) -> Result<(), TrailError> {
    let driver = simulate(config, params)?;

    let path = config
        .out_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_file_name()));
    let img = driver.present(params.present_mode, params.stroke_threshold);
    save_image(&img, params.present_mode, &path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> HeadlessConfig {
        HeadlessConfig {
            frames: 90,
            width: 64,
            height: 48,
            seed: Some(seed),
            out_path: None,
            progress_interval: 0,
        }
    }

    #[test]
    fn seeded_runs_are_deterministic() {
        let params = TrailParams::default();
        let a = simulate(&small_config(3), &params).unwrap();
        let b = simulate(&small_config(3), &params).unwrap();
        assert_eq!(a.current(), b.current());
        assert_eq!(a.frame_count(), 90);
    }

    #[test]
    fn wander_leaves_a_trail() {
        let params = TrailParams::default();
        let driver = simulate(&small_config(11), &params).unwrap();
        let diag = FieldDiagnostics::from_field(driver.current(), params.stroke_threshold);
        assert!(diag.stroke_cells > 0);
        assert!(diag.touched_cells == diag.cells);
    }

    #[test]
    fn run_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(5);
        config.out_path = Some(dir.path().join("run.png"));
        run_headless(&config, &TrailParams::default()).unwrap();
        let img = image::open(dir.path().join("run.png")).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn zero_sized_run_fails_with_invalid_dimension() {
        let mut config = small_config(1);
        config.width = 0;
        assert!(matches!(
            simulate(&config, &TrailParams::default()),
            Err(TrailError::InvalidDimension { .. })
        ));
    }
}
