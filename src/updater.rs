// ============================================================================
// updater.rs — Cursor Trail
// Per-frame field update: every cell takes the minimum of its carried-over
// distance and its distance to the latest pointer segment. Cells are
// independent, so the pass runs as a data-parallel map over grid rows.
// ============================================================================

use rayon::prelude::*;

use crate::config::REINIT_TIME;
use crate::field::{sentinel_at, texel_uv, Field};

// ======================== Inputs ========================

/// Smoothed pointer positions in normalized device range [-1, 1], +y up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerSample {
    pub current: [f32; 2],
    pub previous: [f32; 2],
}

impl PointerSample {
    pub fn new(current: [f32; 2], previous: [f32; 2]) -> Self {
        Self { current, previous }
    }

    /// A zero-length segment at `p`.
    #[cfg(test)]
    pub fn at(p: [f32; 2]) -> Self {
        Self { current: p, previous: p }
    }
}

/// Everything one update pass needs besides the two slots.
#[derive(Clone, Copy, Debug)]
pub struct UpdatePass {
    pub pointer: PointerSample,
    /// Seconds since the pipeline started.
    pub elapsed: f32,
    /// Seconds since the previous update.
    pub dt: f32,
    /// Distance units per second added back to carried values.
    pub fade_rate: f32,
}

impl UpdatePass {
    pub fn new(pointer: PointerSample, elapsed: f32) -> Self {
        Self {
            pointer,
            elapsed,
            dt: 0.0,
            fade_rate: 0.0,
        }
    }
}

// ======================== Kernel ========================

/// Map a [-1, 1] pointer coordinate into [0, 1] texel space.
#[inline]
pub fn to_texel_space(p: [f32; 2]) -> [f32; 2] {
    [(p[0] + 1.0) * 0.5, (p[1] + 1.0) * 0.5]
}

/// Distance from `p` to segment `a`–`b`, measured after scaling x by
/// `aspect` so the trail stays round on non-square viewports.
#[inline]
pub fn distance_to_segment(p: [f32; 2], a: [f32; 2], b: [f32; 2], aspect: f32) -> f32 {
    let pa = [(p[0] - a[0]) * aspect, p[1] - a[1]];
    let ba = [(b[0] - a[0]) * aspect, b[1] - a[1]];
    let len_sq = ba[0] * ba[0] + ba[1] * ba[1];
    // Zero-length segment: distance to the point.
    let h = if len_sq > 0.0 {
        ((pa[0] * ba[0] + pa[1] * ba[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = pa[0] - ba[0] * h;
    let dy = pa[1] - ba[1] * h;
    (dx * dx + dy * dy).sqrt()
}

/// 0 during the bootstrap window, 1 afterwards (`step(REINIT_TIME, t)`).
#[inline]
pub fn reinit_flag(elapsed: f32) -> f32 {
    if elapsed >= REINIT_TIME {
        1.0
    } else {
        0.0
    }
}

/// `mix(base, carried, flag)`, exact at both ends.
#[inline]
pub fn seed_value(base: f32, carried: f32, flag: f32) -> f32 {
    base * (1.0 - flag) + carried * flag
}

/// New value for cell (x, y) given the slot being read.
pub fn update_cell(x: u32, y: u32, read: &Field, pass: &UpdatePass) -> f32 {
    let (width, height) = (read.width(), read.height());
    let uv = texel_uv(x, y, width, height);

    let base = sentinel_at(uv);
    let prev = read.sample_bilinear(uv);
    let carried = if pass.fade_rate > 0.0 {
        (prev + pass.fade_rate * pass.dt.max(0.0)).min(base)
    } else {
        prev
    };
    let seed = seed_value(base, carried, reinit_flag(pass.elapsed));

    let mouse = to_texel_space(pass.pointer.current);
    let prev_mouse = to_texel_space(pass.pointer.previous);
    let aspect = width as f32 / height as f32;
    let d = distance_to_segment(uv, prev_mouse, mouse, aspect);

    seed.min(d)
}

// ======================== Pass ========================

/// Compute `write` from `read` for every cell. Returns once all rows are
/// written, so the caller may swap slots immediately after.
pub fn update_field(read: &Field, write: &mut Field, pass: &UpdatePass) {
    if read.is_empty() {
        return;
    }
    debug_assert_eq!(
        (read.width(), read.height()),
        (write.width(), write.height()),
        "ping-pong slots must share dimensions"
    );

    let w = read.width() as usize;
    write
        .as_mut_slice()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = update_cell(x as u32, y as u32, read, pass);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(1.0)
    }

    #[test]
    fn segment_distance_projects_and_clamps() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        assert!(approx(distance_to_segment([0.5, 0.25], a, b, 1.0), 0.25));
        assert!(approx(distance_to_segment([-0.3, 0.4], a, b, 1.0), 0.5));
        assert!(approx(distance_to_segment([1.3, -0.4], a, b, 1.0), 0.5));
    }

    #[test]
    fn degenerate_segment_is_point_distance() {
        let m = [0.3, 0.7];
        for &p in &[[0.0, 0.0], [0.3, 0.7], [0.9, 0.1], [0.5, 0.5]] {
            for &aspect in &[1.0f32, 1.7, 0.5] {
                let dx = (p[0] - m[0]) * aspect;
                let dy = p[1] - m[1];
                let expected = (dx * dx + dy * dy).sqrt();
                let d = distance_to_segment(p, m, m, aspect);
                assert!(d.is_finite());
                assert!(approx(d, expected), "{d} vs {expected}");
            }
        }
    }

    #[test]
    fn square_aspect_is_plain_euclidean() {
        let p = [0.2, 0.9];
        let a = [0.6, 0.1];
        let b = [0.6, 0.5];
        let expected = ((0.4f32).powi(2) + (0.4f32).powi(2)).sqrt();
        assert!(approx(distance_to_segment(p, a, b, 1.0), expected));
    }

    #[test]
    fn aspect_scales_horizontal_distance_only() {
        let a = [0.5, 0.5];
        assert!(approx(distance_to_segment([0.6, 0.5], a, a, 2.0), 0.2));
        assert!(approx(distance_to_segment([0.5, 0.6], a, a, 2.0), 0.1));
    }

    #[test]
    fn reinit_gate_steps_at_threshold() {
        assert_eq!(reinit_flag(0.0), 0.0);
        assert_eq!(reinit_flag(0.0159), 0.0);
        assert_eq!(reinit_flag(0.016), 1.0);
        assert_eq!(reinit_flag(5.0), 1.0);
        assert_eq!(seed_value(1000.0, 0.003, 1.0), 0.003);
        assert_eq!(seed_value(1000.0, 0.003, 0.0), 1000.0);
    }

    #[test]
    fn pointer_maps_into_texel_space() {
        assert_eq!(to_texel_space([0.0, 0.0]), [0.5, 0.5]);
        assert_eq!(to_texel_space([-1.0, 1.0]), [0.0, 1.0]);
    }

    #[test]
    fn bootstrap_ignores_slot_contents() {
        let (w, h) = (6, 3);
        let read = Field::filled(w, h, -42.0);
        let mut write = Field::filled(w, h, 0.0);
        let pointer = PointerSample::new([0.4, -0.2], [-0.6, 0.3]);
        update_field(&read, &mut write, &UpdatePass::new(pointer, 0.0));

        let aspect = w as f32 / h as f32;
        for y in 0..h {
            for x in 0..w {
                let uv = texel_uv(x, y, w, h);
                let seg = distance_to_segment(
                    uv,
                    to_texel_space(pointer.previous),
                    to_texel_space(pointer.current),
                    aspect,
                );
                assert_eq!(write.get(x, y), sentinel_at(uv).min(seg));
            }
        }
    }

    #[test]
    fn bootstrap_with_pointer_at_origin_on_4x4() {
        let read = Field::sentinel(4, 4);
        let mut write = Field::filled(4, 4, 0.0);
        update_field(&read, &mut write, &UpdatePass::new(PointerSample::at([0.0, 0.0]), 0.0));
        for y in 0..4 {
            for x in 0..4 {
                let uv = texel_uv(x, y, 4, 4);
                let expected = ((uv[0] - 0.5).powi(2) + (uv[1] - 0.5).powi(2)).sqrt();
                let got = write.get(x, y);
                assert!(approx(got, expected), "cell ({x},{y}): {got} vs {expected}");
                assert!(got < 1.0);
            }
        }
    }

    #[test]
    fn carried_values_never_increase() {
        let (w, h) = (16, 9);
        let mut rng = StdRng::seed_from_u64(7);
        let mut read = Field::sentinel(w, h);
        let mut write = Field::sentinel(w, h);
        let mut t = 0.0f32;
        for _ in 0..30 {
            let pointer = PointerSample::new(
                [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)],
                [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)],
            );
            t += 1.0 / 60.0;
            update_field(&read, &mut write, &UpdatePass::new(pointer, t));
            for (next, prev) in write.as_slice().iter().zip(read.as_slice()) {
                assert!(next <= prev);
            }
            std::mem::swap(&mut read, &mut write);
        }
    }

    #[test]
    fn far_segment_leaves_carried_value_untouched() {
        let mut read = Field::sentinel(8, 8);
        read.set(1, 1, 0.002);
        let mut write = Field::filled(8, 8, 0.0);
        let pass = UpdatePass::new(PointerSample::at([0.9, 0.9]), 1.0);
        update_field(&read, &mut write, &pass);
        assert_eq!(write.get(1, 1), 0.002);
    }

    #[test]
    fn fade_relaxes_towards_sentinel_but_not_past_it() {
        let mut read = Field::sentinel(4, 4);
        read.set(0, 0, 0.0);
        let mut write = Field::filled(4, 4, 0.0);
        let mut pass = UpdatePass::new(PointerSample::at([0.9, 0.9]), 1.0);
        pass.fade_rate = 0.5;
        pass.dt = 0.1;
        update_field(&read, &mut write, &pass);
        assert!(approx(write.get(0, 0), 0.05));

        pass.dt = 1.0e6;
        update_field(&read, &mut write, &pass);
        let uv = texel_uv(0, 0, 4, 4);
        let seg = distance_to_segment(uv, [0.95, 0.95], [0.95, 0.95], 1.0);
        assert!(seg < sentinel_at(uv));
        assert!(approx(write.get(0, 0), seg));
    }

    #[test]
    fn empty_field_is_a_no_op() {
        let read = Field::filled(0, 0, 0.0);
        let mut write = Field::filled(0, 0, 0.0);
        update_field(&read, &mut write, &UpdatePass::new(PointerSample::default(), 1.0));
        assert!(write.is_empty());
    }
}
