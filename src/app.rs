// ============================================================================
// app.rs — Cursor Trail
// Application state and winit event-loop handler. Each redraw runs one
// update → swap → present sequence on the selected backend.
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::config::{Backend, TrailParams};
use crate::driver::{FrameClock, FrameContext, FrameDriver};
use crate::error::TrailError;
use crate::field::Field;
use crate::gpu_field::GpuFieldStore;
use crate::input::PointerSmoother;
use crate::metrics::FieldDiagnostics;
use crate::pipeline::{create_bind_groups, create_pipelines, encode_update_pass, FieldBindGroups, Pipelines};
use crate::presenter::{export_file_name, save_png};
use crate::renderer::{HudRenderer, HudStatus};
use crate::updater::{PointerSample, UpdatePass};

// ======================== Application ========================

pub struct App {
    state: Option<AppState>,
    params: TrailParams,
    error: Option<TrailError>,
}

struct AppState {
    // GPU
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    // Field
    gpu_field: GpuFieldStore,
    pipelines: Pipelines,
    bind_groups: FieldBindGroups,
    /// CPU field store, present only on the CPU backend.
    cpu: Option<FrameDriver>,
    gpu_clock: FrameClock,

    // Window
    window: Arc<Window>,

    // Input
    pointer: PointerSmoother,
    params: TrailParams,

    hud: HudRenderer,

    // Timing
    started: Instant,
    last_redraw: Instant,
    fps: f32,
    frame: u64,

    // Diagnostics
    last_diag: Option<FieldDiagnostics>,
    export_requested: bool,
}

impl App {
    pub fn new(params: TrailParams) -> Self {
        Self {
            state: None,
            params,
            error: None,
        }
    }

    /// The error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<TrailError> {
        self.error.take()
    }

    fn init_state(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
    ) -> Result<AppState, TrailError> {
        let window_attrs = WindowAttributes::default()
            .with_title("Cursor Trail")
            .with_inner_size(winit::dpi::LogicalSize::new(1280u32, 800u32));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| TrailError::Gpu(format!("window creation failed: {e}")))?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| TrailError::Gpu(format!("surface creation failed: {e}")))?;

        let (device, queue, surface_config) =
            pollster::block_on(init_gpu(&instance, &surface, &window))?;

        surface.configure(&device, &surface_config);

        let (width, height) = (surface_config.width, surface_config.height);
        let gpu_field = GpuFieldStore::new(&device, width, height)?;
        let pipelines = create_pipelines(&device, surface_config.format);
        let bind_groups = create_bind_groups(&device, &pipelines, &gpu_field);
        let cpu = match self.params.backend {
            Backend::Cpu => Some(FrameDriver::new(width, height)?.with_fade_rate(self.params.fade_rate)),
            Backend::Gpu => None,
        };
        let hud = HudRenderer::new(&device, &queue, surface_config.format);

        log::info!(
            "Cursor trail initialized: {}x{} field, backend = {}",
            width,
            height,
            self.params.backend.name()
        );

        let now = Instant::now();
        Ok(AppState {
            device,
            queue,
            surface,
            surface_config,
            gpu_field,
            pipelines,
            bind_groups,
            cpu,
            gpu_clock: FrameClock::default(),
            window,
            pointer: PointerSmoother::new(self.params.smoothing_secs),
            params: self.params.clone(),
            hud,
            started: now,
            last_redraw: now,
            fps: 0.0,
            frame: 0,
            last_diag: None,
            export_requested: false,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.init_state(event_loop) {
            Ok(state) => {
                // Initial redraw — required on macOS with winit 0.30
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => {
                log::error!("Initialization failed: {err}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput { event, .. } => {
                handle_keyboard(state, event_loop, &event);
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.pointer.on_cursor_moved(
                    position.x,
                    position.y,
                    state.surface_config.width,
                    state.surface_config.height,
                );
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    state.surface_config.width = new_size.width;
                    state.surface_config.height = new_size.height;
                    state.surface.configure(&state.device, &state.surface_config);
                    if let Err(err) = reallocate_field(state, new_size.width, new_size.height) {
                        log::error!("Field reallocation failed: {err}");
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                redraw(state);
            }

            _ => {}
        }
    }
}

// ======================== GPU Initialization ========================

async fn init_gpu(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
    window: &Window,
) -> Result<(wgpu::Device, wgpu::Queue, wgpu::SurfaceConfiguration), TrailError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| {
            TrailError::Gpu(String::from(
                "no suitable GPU adapter (Vulkan, Metal, or DX12 required)",
            ))
        })?;

    log::info!("GPU: {}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cursor_trail_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| TrailError::Gpu(format!("failed to create device: {e}")))?;

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| TrailError::Gpu(String::from("surface reports no formats")))?;

    // One frame's update must land before the next reads it, so a queue-
    // throttled mode is fine; prefer Mailbox for latency.
    let present_mode = if surface_caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
        log::info!("Present mode: Mailbox");
        wgpu::PresentMode::Mailbox
    } else {
        log::info!("Present mode: Fifo (VSync ON)");
        wgpu::PresentMode::Fifo
    };

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode,
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    Ok((device, queue, surface_config))
}

// ======================== Field Lifecycle ========================

/// Discard both slots on every backend and allocate fresh ones. Nothing is
/// in flight here: redraws run on this thread and submit synchronously.
fn reallocate_field(state: &mut AppState, width: u32, height: u32) -> Result<(), TrailError> {
    let gpu_field = GpuFieldStore::new(&state.device, width, height)?;
    if let Some(cpu) = &mut state.cpu {
        cpu.on_resize(width, height)?;
    }
    state.bind_groups = create_bind_groups(&state.device, &state.pipelines, &gpu_field);
    state.gpu_field = gpu_field;
    state.last_diag = None;
    log::info!("Field reallocated at {}x{}", width, height);
    Ok(())
}

// ======================== Keyboard Handling ========================

fn handle_keyboard(
    state: &mut AppState,
    event_loop: &winit::event_loop::ActiveEventLoop,
    event: &winit::event::KeyEvent,
) {
    if !event.state.is_pressed() {
        return;
    }

    match &event.logical_key {
        Key::Named(NamedKey::Escape) => event_loop.exit(),
        Key::Named(NamedKey::Space) => {
            state.params.paused = !state.params.paused;
            log::info!("{}", if state.params.paused { "Paused" } else { "Resumed" });
        }
        Key::Named(NamedKey::Tab) => {
            state.params.present_mode = state.params.present_mode.toggled();
            log::info!("Present mode: {}", state.params.present_mode.name());
        }
        Key::Character(c) => match c.as_str() {
            "c" | "C" => {
                let (w, h) = (state.surface_config.width, state.surface_config.height);
                if let Err(err) = reallocate_field(state, w, h) {
                    log::error!("Clear failed: {err}");
                }
            }
            "h" | "H" => state.params.show_hud = !state.params.show_hud,
            "p" | "P" => state.export_requested = true,
            "[" => {
                state.params.stroke_threshold = (state.params.stroke_threshold * 0.8).max(0.001);
            }
            "]" => {
                state.params.stroke_threshold = (state.params.stroke_threshold * 1.25).min(0.5);
            }
            _ => {}
        },
        _ => {}
    }
}

// ======================== Frame Rendering ========================

fn redraw(state: &mut AppState) {
    // FPS (exponential moving average)
    let now = Instant::now();
    let dt = now.duration_since(state.last_redraw).as_secs_f32().max(0.0001);
    state.last_redraw = now;
    state.fps = state.fps * 0.95 + (1.0 / dt) * 0.05;

    let output = match state.surface.get_current_texture() {
        Ok(t) => t,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            log::warn!("Surface lost or outdated; reconfiguring");
            state.surface.configure(&state.device, &state.surface_config);
            return;
        }
        Err(e) => {
            log::error!("Surface error: {:?}", e);
            return;
        }
    };

    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

    // ---- Update + swap ----
    if !state.params.paused {
        let (current, previous) = state.pointer.advance(dt);
        let pointer = PointerSample::new(current, previous);
        let elapsed = state.started.elapsed().as_secs_f32();

        match &mut state.cpu {
            Some(driver) => {
                let ctx = FrameContext {
                    width: state.gpu_field.width(),
                    height: state.gpu_field.height(),
                    pointer,
                    elapsed,
                };
                match driver.frame(&ctx) {
                    Ok(field) => state.gpu_field.upload_current(&state.queue, field),
                    Err(err) => log::error!("CPU update failed: {err}"),
                }
            }
            None => {
                let tick = match state.gpu_clock.advance(elapsed) {
                    Ok(tick) => tick,
                    Err(err) => {
                        log::warn!("{err}; holding clock at {:.4}s", state.gpu_clock.last());
                        state.gpu_clock.hold()
                    }
                };
                let pass = UpdatePass {
                    pointer,
                    elapsed: tick.elapsed,
                    dt: tick.dt,
                    fade_rate: state.params.fade_rate,
                };
                state.gpu_field.write_update_params(&state.queue, &pass);
                encode_update_pass(
                    &mut encoder,
                    &state.pipelines,
                    &state.bind_groups,
                    &state.gpu_field,
                );
                state.gpu_field.swap();
                log::debug!(
                    "frame {}: read slot {}, present slot {}",
                    state.frame,
                    state.gpu_field.next(),
                    state.gpu_field.cur()
                );
            }
        }
        state.frame += 1;
    }

    // ---- Present ----
    state.gpu_field.write_render_params(
        &state.queue,
        state.params.present_mode,
        state.params.stroke_threshold,
    );

    let win_w = state.surface_config.width;
    let win_h = state.surface_config.height;
    if state.params.show_hud {
        let status = HudStatus {
            frame: state.frame,
            fps: state.fps,
            pointer: state.pointer.position(),
            moving: state.pointer.is_moving(),
            field_w: state.gpu_field.width(),
            field_h: state.gpu_field.height(),
        };
        if let Err(err) = state.hud.prepare(
            &state.device,
            &state.queue,
            &state.params,
            &status,
            win_w,
            win_h,
        ) {
            log::error!("{err}");
        }
    }

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&state.pipelines.render_pipeline);
        pass.set_bind_group(0, &state.bind_groups.render[state.gpu_field.cur()], &[]);
        pass.draw(0..6, 0..1);

        if state.params.show_hud {
            if let Err(err) = state.hud.render(&mut pass) {
                log::error!("{err}");
            }
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    state.hud.trim();

    // ---- Export ----
    if state.export_requested {
        state.export_requested = false;
        let path = export_file_name();
        let result = current_field(state).and_then(|field| {
            save_png(
                &field,
                state.params.present_mode,
                state.params.stroke_threshold,
                &path,
            )
        });
        if let Err(err) = result {
            log::error!("Export failed: {err}");
        }
    }

    // ---- Periodic diagnostics ----
    let diag_interval = state.params.diag_interval.max(1) as u64;
    if !state.params.paused && state.frame > 0 && state.frame % diag_interval == 0 {
        match current_field(state) {
            Ok(field) => {
                let diag = FieldDiagnostics::from_field(&field, state.params.stroke_threshold);
                diag.log(state.frame, state.last_diag.as_ref());
                state.last_diag = Some(diag);
            }
            Err(err) => log::warn!("Diagnostics skipped: {err}"),
        }
    }

    state.window.request_redraw();
}

/// Copy of the presentable slot from whichever backend owns it.
fn current_field(state: &AppState) -> Result<Field, TrailError> {
    match &state.cpu {
        Some(driver) => Ok(driver.current().clone()),
        None => state.gpu_field.read_current(&state.device, &state.queue),
    }
}
