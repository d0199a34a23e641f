// ============================================================================
// field.rs — Cursor Trail
// Field: one slot of per-pixel trail distances. FieldStore: the ping-pong
// pair of slots and the index of the one that is currently presentable.
// ============================================================================

use crate::config::SENTINEL_OFFSET;
use crate::error::TrailError;

/// Normalized texel-centre coordinate of cell (x, y) in a width×height grid.
#[inline]
pub fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> [f32; 2] {
    [
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    ]
}

/// Bootstrap value for a cell: its distance from the origin plus a large
/// offset, so no two rows start out identical.
#[inline]
pub fn sentinel_at(uv: [f32; 2]) -> f32 {
    (uv[0] * uv[0] + uv[1] * uv[1]).sqrt() + SENTINEL_OFFSET
}

// ======================== Field ========================

/// Row-major grid of distances. Row 0 is the bottom of the viewport.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Field {
    /// A field where every cell holds its sentinel value.
    pub fn sentinel(width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(sentinel_at(texel_uv(x, y, width, height)));
            }
        }
        Self { width, height, data }
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[cfg(test)]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let w = self.width as usize;
        self.data[y as usize * w + x as usize] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Bilinear read at a normalized coordinate with clamp-to-edge
    /// addressing. At a texel centre this returns that texel exactly.
    pub fn sample_bilinear(&self, uv: [f32; 2]) -> f32 {
        let (fx0, tx) = split_coord(uv[0] as f64 * self.width as f64 - 0.5);
        let (fy0, ty) = split_coord(uv[1] as f64 * self.height as f64 - 0.5);

        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let x0 = fx0.clamp(0, max_x) as u32;
        let x1 = (fx0 + 1).clamp(0, max_x) as u32;
        let y0 = fy0.clamp(0, max_y) as u32;
        let y1 = (fy0 + 1).clamp(0, max_y) as u32;

        if tx == 0.0 && ty == 0.0 {
            return self.get(x0, y0);
        }

        let top = lerp(self.get(x0, y0), self.get(x1, y0), tx);
        let bottom = lerp(self.get(x0, y1), self.get(x1, y1), tx);
        lerp(top, bottom, ty)
    }
}

/// Integer cell and blend weight of a pixel-space coordinate. Weights within
/// `CENTRE_SNAP` of a centre snap to it so centre reads stay exact.
fn split_coord(p: f64) -> (i64, f32) {
    const CENTRE_SNAP: f64 = 1e-3;
    let base = p.floor();
    let t = p - base;
    if t < CENTRE_SNAP {
        (base as i64, 0.0)
    } else if t > 1.0 - CENTRE_SNAP {
        (base as i64 + 1, 0.0)
    } else {
        (base as i64, t as f32)
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ======================== FieldStore ========================

/// Two equally sized slots used in alternation. `current` is readable and
/// presentable; the other slot is the write target of the next update.
pub struct FieldStore {
    slots: [Field; 2],
    current: usize,
}

impl FieldStore {
    pub fn allocate(width: u32, height: u32) -> Result<Self, TrailError> {
        check_dimensions(width, height)?;
        Ok(Self {
            slots: [Field::sentinel(width, height), Field::sentinel(width, height)],
            current: 0,
        })
    }

    /// Discard both slots and reallocate. On error the previous slots remain.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TrailError> {
        *self = Self::allocate(width, height)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.slots[0].width
    }

    pub fn height(&self) -> u32 {
        self.slots[0].height
    }

    /// Index of the current (read) slot.
    pub fn cur(&self) -> usize {
        self.current
    }

    /// Index of the next (write) slot.
    pub fn next(&self) -> usize {
        1 - self.current
    }

    pub fn current(&self) -> &Field {
        &self.slots[self.current]
    }

    /// Current slot for reading together with the next slot for writing.
    pub fn split(&mut self) -> (&Field, &mut Field) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        }
    }

    /// Flip the current slot. Must follow exactly one completed update.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

pub fn check_dimensions(width: u32, height: u32) -> Result<(), TrailError> {
    if width == 0 || height == 0 {
        return Err(TrailError::InvalidDimension { width, height });
    }
    Ok(())
}
