// ============================================================================
// renderer.rs — Cursor Trail
// HUD text rendering via glyphon, drawn over the field in the present pass.
// ============================================================================

use glyphon::{
    Attrs, Buffer as TextBuffer, Cache as GlyphCache, Color as GlyphColor, Family, FontSystem,
    Metrics, Resolution, Shaping, SwashCache, TextArea, TextAtlas, TextBounds, TextRenderer,
    Viewport as GlyphViewport,
};

use crate::config::TrailParams;
use crate::error::TrailError;

/// Per-frame values shown in the HUD.
pub struct HudStatus {
    pub frame: u64,
    pub fps: f32,
    pub pointer: [f32; 2],
    pub moving: bool,
    pub field_w: u32,
    pub field_h: u32,
}

/// All glyphon resources needed for HUD text rendering.
pub struct HudRenderer {
    pub font_system: FontSystem,
    pub swash_cache: SwashCache,
    pub glyph_viewport: GlyphViewport,
    pub text_atlas: TextAtlas,
    pub text_renderer: TextRenderer,
}

impl HudRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let font_system = FontSystem::new();
        let swash_cache = SwashCache::new();
        let glyph_cache = GlyphCache::new(device);
        let glyph_viewport = GlyphViewport::new(device, &glyph_cache);
        let mut text_atlas = TextAtlas::new(device, queue, &glyph_cache, surface_format);
        let text_renderer =
            TextRenderer::new(&mut text_atlas, device, wgpu::MultisampleState::default(), None);

        Self {
            font_system,
            swash_cache,
            glyph_viewport,
            text_atlas,
            text_renderer,
        }
    }

    /// Prepare HUD text for the current frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        params: &TrailParams,
        status: &HudStatus,
        win_w: u32,
        win_h: u32,
    ) -> Result<(), TrailError> {
        self.glyph_viewport.update(
            queue,
            Resolution {
                width: win_w,
                height: win_h,
            },
        );

        let hud_text = build_hud_text(params, status);

        let mut text_buf = TextBuffer::new(&mut self.font_system, Metrics::new(14.0, 18.0));
        text_buf.set_size(&mut self.font_system, Some(win_w as f32), Some(win_h as f32));
        text_buf.set_text(
            &mut self.font_system,
            &hud_text,
            Attrs::new().family(Family::Monospace),
            Shaping::Basic,
        );
        text_buf.shape_until_scroll(&mut self.font_system, false);

        self.text_renderer
            .prepare(
                device,
                queue,
                &mut self.font_system,
                &mut self.text_atlas,
                &self.glyph_viewport,
                [TextArea {
                    buffer: &text_buf,
                    left: 10.0,
                    top: 10.0,
                    scale: 1.0,
                    bounds: TextBounds {
                        left: 0,
                        top: 0,
                        right: win_w as i32,
                        bottom: win_h as i32,
                    },
                    // Tinted so it stays distinct from the white stroke.
                    default_color: GlyphColor::rgb(120, 200, 255),
                    custom_glyphs: &[],
                }],
                &mut self.swash_cache,
            )
            .map_err(|e| TrailError::Gpu(format!("HUD prepare failed: {e}")))
    }

    /// Render HUD overlay into an active render pass.
    pub fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) -> Result<(), TrailError> {
        self.text_renderer
            .render(&self.text_atlas, &self.glyph_viewport, pass)
            .map_err(|e| TrailError::Gpu(format!("HUD render failed: {e}")))
    }

    /// Trim the glyph atlas after presenting.
    pub fn trim(&mut self) {
        self.text_atlas.trim();
    }
}

// ======================== HUD Text Builder ========================

pub fn build_hud_text(params: &TrailParams, status: &HudStatus) -> String {
    let pause_status = if params.paused { " [PAUSED]" } else { "" };
    let fade = if params.fade_rate > 0.0 {
        format!("fade {:.3}/s", params.fade_rate)
    } else {
        String::from("no fade")
    };

    format!(
        "Frame: {}   FPS: {:.0}{}   Field: {}×{}\n\
         Backend: {} | Mode: {} | Threshold: {:.3} | {}\n\
         Pointer: ({:+.3}, {:+.3}){}\n\
         Tab: Mode | Space: Pause | C: Clear | [ ]: Threshold | P: Export PNG | H: HUD | Esc: Quit",
        status.frame,
        status.fps,
        pause_status,
        status.field_w,
        status.field_h,
        params.backend.name(),
        params.present_mode.name(),
        params.stroke_threshold,
        fade,
        status.pointer[0],
        status.pointer[1],
        if status.moving { " moving" } else { "" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hud_text_reflects_params() {
        let mut params = TrailParams::default();
        params.paused = true;
        let status = HudStatus {
            frame: 42,
            fps: 59.6,
            pointer: [0.25, -0.5],
            moving: true,
            field_w: 800,
            field_h: 600,
        };
        let text = build_hud_text(&params, &status);
        assert!(text.contains("Frame: 42"));
        assert!(text.contains("[PAUSED]"));
        assert!(text.contains("Mode: Stroke"));
        assert!(text.contains("no fade"));
        assert!(text.contains("(+0.250, -0.500) moving"));
        assert!(text.contains("800×600"));
    }
}
