// ============================================================================
// error.rs — Cursor Trail
// Error taxonomy shared by the field store, frame driver and host surfaces.
// ============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    /// A field store was asked for a grid with a zero dimension.
    #[error("invalid field dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// The host clock went backwards between two frames.
    #[error("clock regression: {current:.4}s after {previous:.4}s")]
    ClockRegression { previous: f32, current: f32 },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("gpu error: {0}")]
    Gpu(String),
}

impl From<serde_json::Error> for TrailError {
    fn from(err: serde_json::Error) -> Self {
        TrailError::Config(err.to_string())
    }
}
