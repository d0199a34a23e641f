// ============================================================================
// config.rs — Cursor Trail
// Trail parameters, presentation modes, and runtime configuration.
// ============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TrailError;

// ======================== Update Rule Constants ========================

/// Elapsed time below which the updater seeds the field instead of
/// carrying over the previous slot (first frame at 60 Hz).
pub const REINIT_TIME: f32 = 0.016;
/// Added to the texel's distance from the origin to build the sentinel.
pub const SENTINEL_OFFSET: f32 = 999.9;
/// Distance at or below which a cell counts as "on the trail".
pub const DEFAULT_STROKE_THRESHOLD: f32 = 0.01;
/// Duration of the eased pointer follow, in seconds.
pub const DEFAULT_SMOOTHING_SECS: f32 = 0.6;

// ======================== Enums ========================

/// How the current field is turned into pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentMode {
    /// Binary on-trail / background via the stroke threshold.
    #[default]
    Stroke,
    /// Raw distance value, unthresholded (debug).
    Raw,
}

impl PresentMode {
    pub fn name(self) -> &'static str {
        match self {
            PresentMode::Stroke => "Stroke",
            PresentMode::Raw => "Raw Distance",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            PresentMode::Stroke => PresentMode::Raw,
            PresentMode::Raw => PresentMode::Stroke,
        }
    }

    /// Index passed to the render shader.
    pub fn gpu_index(self) -> u32 {
        match self {
            PresentMode::Stroke => 0,
            PresentMode::Raw => 1,
        }
    }
}

/// Where the per-frame update pass runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gpu,
    Cpu,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Gpu => "GPU compute",
            Backend::Cpu => "CPU (rayon)",
        }
    }
}

// ======================== TrailParams ========================

/// Runtime trail parameters, loadable from JSON and adjustable via keyboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailParams {
    pub stroke_threshold: f32,
    pub present_mode: PresentMode,
    pub backend: Backend,
    pub smoothing_secs: f32,
    /// Distance units per second added to carried values before the
    /// minimum is taken. Zero keeps the trail permanent.
    pub fade_rate: f32,
    pub diag_interval: u32,
    pub paused: bool,
    pub show_hud: bool,
}

impl Default for TrailParams {
    fn default() -> Self {
        Self {
            stroke_threshold: DEFAULT_STROKE_THRESHOLD,
            present_mode: PresentMode::Stroke,
            backend: Backend::Gpu,
            smoothing_secs: DEFAULT_SMOOTHING_SECS,
            fade_rate: 0.0,
            diag_interval: 300,
            paused: false,
            show_hud: true,
        }
    }
}

impl TrailParams {
    /// Load parameters from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrailError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let params: TrailParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), TrailError> {
        if !(self.stroke_threshold.is_finite() && self.stroke_threshold >= 0.0) {
            return Err(TrailError::Config(format!(
                "stroke_threshold must be a non-negative number, got {}",
                self.stroke_threshold
            )));
        }
        if !(self.fade_rate.is_finite() && self.fade_rate >= 0.0) {
            return Err(TrailError::Config(format!(
                "fade_rate must be a non-negative number, got {}",
                self.fade_rate
            )));
        }
        if !(self.smoothing_secs.is_finite() && self.smoothing_secs >= 0.0) {
            return Err(TrailError::Config(format!(
                "smoothing_secs must be a non-negative number, got {}",
                self.smoothing_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_constants() {
        let p = TrailParams::default();
        assert_eq!(p.stroke_threshold, 0.01);
        assert_eq!(p.fade_rate, 0.0);
        assert_eq!(p.present_mode, PresentMode::Stroke);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "present_mode": "raw", "backend": "cpu" }}"#).unwrap();
        let p = TrailParams::load(file.path()).unwrap();
        assert_eq!(p.present_mode, PresentMode::Raw);
        assert_eq!(p.backend, Backend::Cpu);
        assert_eq!(p.stroke_threshold, DEFAULT_STROKE_THRESHOLD);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "stroke_threshold": -1.0 }}"#).unwrap();
        assert!(matches!(TrailParams::load(file.path()), Err(TrailError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(TrailParams::load(file.path()), Err(TrailError::Config(_))));
    }

    #[test]
    fn present_mode_toggles() {
        assert_eq!(PresentMode::Stroke.toggled(), PresentMode::Raw);
        assert_eq!(PresentMode::Raw.toggled().gpu_index(), 0);
    }
}
