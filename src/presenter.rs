// ============================================================================
// presenter.rs — Cursor Trail
// Turns the current field into displayable intensities: a thresholded
// stroke, or the raw distance for debugging. The GPU render shader applies
// the same rule per fragment; this is the CPU side used for export.
// ============================================================================

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::config::PresentMode;
use crate::error::TrailError;
use crate::field::Field;

/// `step(value, threshold)`: 1 when the cell is within the stroke, else 0.
#[inline]
pub fn stroke(value: f32, threshold: f32) -> f32 {
    if threshold >= value {
        1.0
    } else {
        0.0
    }
}

/// Grey level in [0, 1] for one cell.
#[inline]
pub fn shade(value: f32, mode: PresentMode, threshold: f32) -> f32 {
    match mode {
        PresentMode::Stroke => stroke(value, threshold),
        PresentMode::Raw => value.clamp(0.0, 1.0),
    }
}

/// Opaque RGBA image of the field. Image row 0 is the top of the viewport,
/// field row 0 the bottom, so rows are flipped.
pub fn present_rgba(field: &Field, mode: PresentMode, threshold: f32) -> RgbaImage {
    let (w, h) = (field.width(), field.height());
    RgbaImage::from_fn(w, h, |x, y| {
        let level = shade(field.get(x, h - 1 - y), mode, threshold);
        let c = (level * 255.0).round() as u8;
        Rgba([c, c, c, 255])
    })
}

pub fn save_png(
    field: &Field,
    mode: PresentMode,
    threshold: f32,
    path: impl AsRef<Path>,
) -> Result<(), TrailError> {
    save_image(&present_rgba(field, mode, threshold), mode, path)
}

/// Write an already presented frame as PNG.
pub fn save_image(
    img: &RgbaImage,
    mode: PresentMode,
    path: impl AsRef<Path>,
) -> Result<(), TrailError> {
    img.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    log::info!(
        "Exported {}x{} {} frame to {}",
        img.width(),
        img.height(),
        mode.name(),
        path.as_ref().display()
    );
    Ok(())
}

/// Default export file name, timestamped.
pub fn export_file_name() -> String {
    format!("trail_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundary_is_inclusive() {
        assert_eq!(stroke(0.01, 0.01), 1.0);
        assert_eq!(stroke(0.0101, 0.01), 0.0);
        assert_eq!(stroke(0.0, 0.01), 1.0);
    }

    #[test]
    fn raw_mode_clamps() {
        assert_eq!(shade(0.25, PresentMode::Raw, 0.01), 0.25);
        assert_eq!(shade(999.9, PresentMode::Raw, 0.01), 1.0);
    }

    #[test]
    fn image_rows_are_flipped() {
        let mut f = Field::filled(2, 3, 5.0);
        f.set(1, 0, 0.0);
        let img = present_rgba(&f, PresentMode::Stroke, 0.01);
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.get_pixel(1, 2), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(img.get_pixel(0, 2), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn png_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let f = Field::sentinel(8, 4);
        save_png(&f, PresentMode::Stroke, 0.01, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (8, 4));
        assert!(back.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }
}
