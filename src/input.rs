// ============================================================================
// input.rs — Cursor Trail
// Pointer smoothing: raw cursor events retarget a per-axis eased follower
// whose output is what the field updater sees.
// ============================================================================

use crate::config::DEFAULT_SMOOTHING_SECS;

/// How long after the last raw event the pointer counts as moving.
pub const MOVE_HOLD_SECS: f32 = 0.1;

/// power2.out: fast start, gentle arrival.
#[inline]
pub fn ease_power2_out(p: f32) -> f32 {
    let inv = 1.0 - p.clamp(0.0, 1.0);
    1.0 - inv * inv
}

/// One axis tweening from where it was when last retargeted to the target.
#[derive(Clone, Copy, Debug)]
pub struct EasedAxis {
    start: f32,
    target: f32,
    value: f32,
    t: f32,
    duration: f32,
}

impl EasedAxis {
    pub fn new(value: f32, duration: f32) -> Self {
        Self {
            start: value,
            target: value,
            value,
            t: duration,
            duration,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Restart the tween from the current value towards `target`.
    pub fn retarget(&mut self, target: f32) {
        self.start = self.value;
        self.target = target;
        self.t = 0.0;
    }

    pub fn tick(&mut self, dt: f32) {
        self.t += dt.max(0.0);
        if self.duration <= 0.0 || self.t >= self.duration {
            self.value = self.target;
            return;
        }
        let k = ease_power2_out(self.t / self.duration);
        self.value = self.start + (self.target - self.start) * k;
    }
}

/// Smoothed pointer in [-1, 1] with +y up, plus the previous frame's value.
#[derive(Clone, Debug)]
pub struct PointerSmoother {
    x: EasedAxis,
    y: EasedAxis,
    previous: [f32; 2],
    since_event: f32,
}

impl Default for PointerSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_SECS)
    }
}

impl PointerSmoother {
    pub fn new(duration: f32) -> Self {
        Self {
            x: EasedAxis::new(0.0, duration),
            y: EasedAxis::new(0.0, duration),
            previous: [0.0, 0.0],
            since_event: f32::INFINITY,
        }
    }

    /// Raw cursor position in window pixels (origin top-left).
    pub fn on_cursor_moved(&mut self, px: f64, py: f64, win_w: u32, win_h: u32) {
        if win_w == 0 || win_h == 0 {
            return;
        }
        let [nx, ny] = pixel_to_ndc(px, py, win_w, win_h);
        self.set_target([nx, ny]);
    }

    /// Retarget towards a point already in [-1, 1].
    pub fn set_target(&mut self, p: [f32; 2]) {
        self.x.retarget(p[0]);
        self.y.retarget(p[1]);
        self.since_event = 0.0;
    }

    /// Advance by one frame and return (current, previous).
    pub fn advance(&mut self, dt: f32) -> ([f32; 2], [f32; 2]) {
        self.previous = self.position();
        self.x.tick(dt);
        self.y.tick(dt);
        self.since_event += dt.max(0.0);
        (self.position(), self.previous)
    }

    pub fn position(&self) -> [f32; 2] {
        [self.x.value(), self.y.value()]
    }

    pub fn is_moving(&self) -> bool {
        self.since_event < MOVE_HOLD_SECS
    }
}

/// Window pixel → normalized device coordinates, +y up.
pub fn pixel_to_ndc(px: f64, py: f64, win_w: u32, win_h: u32) -> [f32; 2] {
    [
        (px / win_w as f64 * 2.0 - 1.0) as f32,
        (-(py / win_h as f64) * 2.0 + 1.0) as f32,
    ]
}
