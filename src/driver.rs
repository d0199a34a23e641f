// ============================================================================
// driver.rs — Cursor Trail
// FrameDriver: sequences one update → swap → present per frame over the CPU
// field store, fed by an explicit per-frame context from the host.
// ============================================================================

use image::RgbaImage;

use crate::config::PresentMode;
use crate::error::TrailError;
use crate::field::{Field, FieldStore};
use crate::presenter::present_rgba;
use crate::updater::{update_field, PointerSample, UpdatePass};

// ======================== Frame Context ========================

/// What the host hands the driver each frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub width: u32,
    pub height: u32,
    pub pointer: PointerSample,
    /// Seconds since the pipeline started.
    pub elapsed: f32,
}

// ======================== Frame Clock ========================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub elapsed: f32,
    pub dt: f32,
}

/// Tracks the last accepted elapsed time and rejects regressions.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<f32>,
}

impl FrameClock {
    pub fn last(&self) -> f32 {
        self.last.unwrap_or(0.0)
    }

    /// Accept a new elapsed time. A value below the last accepted one (or
    /// below zero, or NaN) is rejected and leaves the clock unchanged.
    pub fn advance(&mut self, elapsed: f32) -> Result<Tick, TrailError> {
        let previous = self.last();
        if !(elapsed >= previous) {
            return Err(TrailError::ClockRegression {
                previous,
                current: elapsed,
            });
        }
        let dt = match self.last {
            Some(p) => elapsed - p,
            None => 0.0,
        };
        self.last = Some(elapsed);
        Ok(Tick { elapsed, dt })
    }

    /// Repeat the last accepted time with no progress.
    pub fn hold(&self) -> Tick {
        Tick {
            elapsed: self.last(),
            dt: 0.0,
        }
    }
}

// ======================== Frame Driver ========================

pub struct FrameDriver {
    store: FieldStore,
    clock: FrameClock,
    fade_rate: f32,
    frame: u64,
}

impl FrameDriver {
    pub fn new(width: u32, height: u32) -> Result<Self, TrailError> {
        Ok(Self {
            store: FieldStore::allocate(width, height)?,
            clock: FrameClock::default(),
            fade_rate: 0.0,
            frame: 0,
        })
    }

    pub fn with_fade_rate(mut self, fade_rate: f32) -> Self {
        self.fade_rate = fade_rate;
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn width(&self) -> u32 {
        self.store.width()
    }

    pub fn height(&self) -> u32 {
        self.store.height()
    }

    /// The slot that is safe to present.
    pub fn current(&self) -> &Field {
        self.store.current()
    }

    /// Reallocate both slots, discarding the trail.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<(), TrailError> {
        self.store.resize(width, height)?;
        log::info!("Field store reallocated at {}x{}", width, height);
        Ok(())
    }

    /// Run one frame: update the next slot from the current one, swap, and
    /// return the new current slot for presentation.
    pub fn frame(&mut self, ctx: &FrameContext) -> Result<&Field, TrailError> {
        if ctx.width == 0 || ctx.height == 0 {
            log::debug!("Skipping frame for {}x{} viewport", ctx.width, ctx.height);
            return Ok(self.store.current());
        }
        if (ctx.width, ctx.height) != (self.store.width(), self.store.height()) {
            self.on_resize(ctx.width, ctx.height)?;
        }

        let tick = match self.clock.advance(ctx.elapsed) {
            Ok(tick) => tick,
            Err(err) => {
                log::warn!("{err}; holding clock at {:.4}s", self.clock.last());
                self.clock.hold()
            }
        };

        let pass = UpdatePass {
            pointer: ctx.pointer,
            elapsed: tick.elapsed,
            dt: tick.dt,
            fade_rate: self.fade_rate,
        };

        log::debug!(
            "Frame {}: read slot {}, write slot {}",
            self.frame,
            self.store.cur(),
            self.store.next()
        );
        let (read, write) = self.store.split();
        update_field(read, write, &pass);
        self.store.swap();
        self.frame += 1;

        Ok(self.store.current())
    }

    /// Present the current slot as an RGBA image.
    pub fn present(&self, mode: PresentMode, threshold: f32) -> RgbaImage {
        present_rgba(self.store.current(), mode, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::texel_uv;

    fn ctx(w: u32, h: u32, pointer: PointerSample, elapsed: f32) -> FrameContext {
        FrameContext {
            width: w,
            height: h,
            pointer,
            elapsed,
        }
    }

    #[test]
    fn clock_rejects_regression_and_holds() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(0.0).unwrap(), Tick { elapsed: 0.0, dt: 0.0 });
        assert_eq!(clock.advance(0.5).unwrap().dt, 0.5);
        assert!(matches!(
            clock.advance(0.25),
            Err(TrailError::ClockRegression { previous, current }) if previous == 0.5 && current == 0.25
        ));
        assert_eq!(clock.hold(), Tick { elapsed: 0.5, dt: 0.0 });
        assert!(clock.advance(f32::NAN).is_err());
    }

    #[test]
    fn first_frame_on_4x4_draws_distance_to_centre() {
        let mut driver = FrameDriver::new(4, 4).unwrap();
        let field = driver
            .frame(&ctx(4, 4, PointerSample::at([0.0, 0.0]), 0.0))
            .unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let uv = texel_uv(x, y, 4, 4);
                let d = ((uv[0] - 0.5).powi(2) + (uv[1] - 0.5).powi(2)).sqrt();
                assert!((field.get(x, y) - d).abs() < 1e-6);
            }
        }
        assert_eq!(driver.store.cur(), 1);
        assert_eq!(driver.frame_count(), 1);
    }

    #[test]
    fn trail_persists_across_frames() {
        let mut driver = FrameDriver::new(8, 8).unwrap();
        driver
            .frame(&ctx(8, 8, PointerSample::at([-0.625, -0.625]), 0.0))
            .unwrap();
        let marked = driver.current().get(1, 1);
        assert!(marked < 1e-6);
        // Pointer moves far away; the earlier mark stays.
        for i in 1..10 {
            driver
                .frame(&ctx(8, 8, PointerSample::at([0.8, 0.8]), i as f32 / 60.0))
                .unwrap();
        }
        assert_eq!(driver.current().get(1, 1), marked);
    }

    #[test]
    fn clock_regression_does_not_rebootstrap() {
        let mut driver = FrameDriver::new(8, 8).unwrap();
        driver
            .frame(&ctx(8, 8, PointerSample::at([-0.625, -0.625]), 1.0))
            .unwrap();
        driver
            .frame(&ctx(8, 8, PointerSample::at([0.8, 0.8]), 0.0))
            .unwrap();
        // A bootstrap would have replaced the mark with the far distance.
        assert!(driver.current().get(1, 1) < 1e-6);
    }

    #[test]
    fn resize_discards_trail() {
        let mut driver = FrameDriver::new(6, 4).unwrap();
        for i in 0..3 {
            driver
                .frame(&ctx(6, 4, PointerSample::new([0.5, 0.5], [-0.5, -0.5]), i as f32))
                .unwrap();
        }
        driver.on_resize(6, 4).unwrap();
        let fresh = Field::sentinel(6, 4);
        assert_eq!(driver.current(), &fresh);
        driver.store.swap();
        assert_eq!(driver.current(), &fresh);
    }

    #[test]
    fn context_size_change_reallocates() {
        let mut driver = FrameDriver::new(4, 4).unwrap();
        let field = driver
            .frame(&ctx(10, 5, PointerSample::default(), 0.5))
            .unwrap();
        assert_eq!((field.width(), field.height()), (10, 5));
    }

    #[test]
    fn zero_sized_context_is_a_no_op() {
        let mut driver = FrameDriver::new(4, 4).unwrap();
        let before = driver.current().clone();
        let after = driver
            .frame(&ctx(0, 4, PointerSample::default(), 0.5))
            .unwrap()
            .clone();
        assert_eq!(before, after);
        assert_eq!(driver.frame_count(), 0);
        assert!(matches!(
            driver.on_resize(0, 0),
            Err(TrailError::InvalidDimension { .. })
        ));
        assert_eq!(driver.width(), 4);
    }

    #[test]
    fn present_marks_pointer_cell() {
        let mut driver = FrameDriver::new(8, 8).unwrap();
        driver
            .frame(&ctx(8, 8, PointerSample::at([-0.625, -0.625]), 0.0))
            .unwrap();
        let img = driver.present(PresentMode::Stroke, 0.01);
        // Field row 1 from the bottom is image row 6.
        assert_eq!(img.get_pixel(1, 6).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(6, 1).0, [0, 0, 0, 255]);
    }
}
