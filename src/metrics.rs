// ============================================================================
// metrics.rs — Cursor Trail
// Field diagnostics: how much of the viewport the trail covers and how close
// the touched cells are, logged periodically.
// ============================================================================

use crate::config::SENTINEL_OFFSET;
use crate::field::Field;

/// Snapshot statistics of one field slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDiagnostics {
    pub cells: usize,
    /// Cells within the stroke threshold.
    pub stroke_cells: usize,
    pub stroke_fraction: f32,
    /// Cells whose value came from a pointer segment rather than the sentinel.
    pub touched_cells: usize,
    pub touched_fraction: f32,
    pub min_distance: f32,
    /// Mean over touched cells only.
    pub mean_touched_distance: f32,
}

impl FieldDiagnostics {
    pub fn from_field(field: &Field, threshold: f32) -> Self {
        let n = field.len();
        if n == 0 {
            return Self::default();
        }

        let mut stroke_cells = 0usize;
        let mut touched_cells = 0usize;
        let mut sum_touched = 0.0f64;
        let mut min_distance = f32::INFINITY;

        for &v in field.as_slice() {
            if v <= threshold {
                stroke_cells += 1;
            }
            if v < SENTINEL_OFFSET {
                touched_cells += 1;
                sum_touched += v as f64;
            }
            if v < min_distance {
                min_distance = v;
            }
        }

        let mean_touched_distance = if touched_cells > 0 {
            (sum_touched / touched_cells as f64) as f32
        } else {
            0.0
        };

        FieldDiagnostics {
            cells: n,
            stroke_cells,
            stroke_fraction: stroke_cells as f32 / n as f32,
            touched_cells,
            touched_fraction: touched_cells as f32 / n as f32,
            min_distance,
            mean_touched_distance,
        }
    }

    /// Log at INFO level, with deltas against the previous sample if any.
    pub fn log(&self, frame: u64, prev: Option<&FieldDiagnostics>) {
        log::info!("══════════════ Frame {} Field ══════════════", frame);

        if let Some(p) = prev {
            log::info!(
                "TRENDS: Δstroke={:+} | Δtouched={:+}",
                self.stroke_cells as i64 - p.stroke_cells as i64,
                self.touched_cells as i64 - p.touched_cells as i64,
            );
        }

        log::info!(
            "COVERAGE: stroke={} ({:.2}%) | touched={} ({:.1}%) of {} cells",
            self.stroke_cells,
            self.stroke_fraction * 100.0,
            self.touched_cells,
            self.touched_fraction * 100.0,
            self.cells,
        );
        log::info!(
            "DISTANCE: min={:.4} | mean_touched={:.4}",
            self.min_distance,
            self.mean_touched_distance,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_field_reports_nothing() {
        let d = FieldDiagnostics::from_field(&Field::sentinel(10, 10), 0.01);
        assert_eq!(d.cells, 100);
        assert_eq!(d.stroke_cells, 0);
        assert_eq!(d.touched_cells, 0);
        assert_eq!(d.mean_touched_distance, 0.0);
        assert!(d.min_distance > SENTINEL_OFFSET);
    }

    #[test]
    fn counts_stroke_and_touched_cells() {
        let mut f = Field::sentinel(4, 1);
        f.set(0, 0, 0.0);
        f.set(1, 0, 0.01);
        f.set(2, 0, 0.5);
        let d = FieldDiagnostics::from_field(&f, 0.01);
        assert_eq!(d.stroke_cells, 2);
        assert_eq!(d.touched_cells, 3);
        assert_eq!(d.stroke_fraction, 0.5);
        assert_eq!(d.min_distance, 0.0);
        assert!((d.mean_touched_distance - 0.17).abs() < 1e-6);
    }

    #[test]
    fn empty_field_is_default() {
        let d = FieldDiagnostics::from_field(&Field::filled(0, 0, 0.0), 0.01);
        assert_eq!(d, FieldDiagnostics::default());
    }
}
