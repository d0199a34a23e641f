// ============================================================================
// gpu_field.rs — Cursor Trail
// GpuFieldStore: the ping-pong pair of field slots as GPU storage buffers,
// plus the uniform buffers the update and render passes read.
// ============================================================================

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::{PresentMode, REINIT_TIME, SENTINEL_OFFSET};
use crate::error::TrailError;
use crate::field::{check_dimensions, Field};
use crate::updater::UpdatePass;

// ======================== Constants ========================

pub const WORKGROUP_X: u32 = 16;
pub const WORKGROUP_Y: u32 = 16;

// ======================== Uniform Structs ========================

/// Mirrors `UpdateParams` in update_field.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct UpdateParams {
    pub width: u32,
    pub height: u32,
    pub elapsed: f32,
    pub dt: f32,
    pub pointer: [f32; 2],
    pub prev_pointer: [f32; 2],
    pub fade_rate: f32,
    pub reinit_time: f32,
    pub sentinel_offset: f32,
    pub _pad: f32,
}

impl UpdateParams {
    pub fn new(width: u32, height: u32, pass: &UpdatePass) -> Self {
        Self {
            width,
            height,
            elapsed: pass.elapsed,
            dt: pass.dt,
            pointer: pass.pointer.current,
            prev_pointer: pass.pointer.previous,
            fade_rate: pass.fade_rate,
            reinit_time: REINIT_TIME,
            sentinel_offset: SENTINEL_OFFSET,
            _pad: 0.0,
        }
    }
}

/// Mirrors `RenderParams` in render.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RenderParams {
    pub width: u32,
    pub height: u32,
    pub mode: u32,
    pub threshold: f32,
}

// ======================== GpuFieldStore ========================

pub struct GpuFieldStore {
    // Ping-pong slot index: 0 or 1
    current: usize,
    width: u32,
    height: u32,

    pub slots: [wgpu::Buffer; 2],

    pub update_params_buffer: wgpu::Buffer,
    pub render_params_buffer: wgpu::Buffer,
}

impl GpuFieldStore {
    /// Allocate both slots at the given size, filled with the sentinel field.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, TrailError> {
        check_dimensions(width, height)?;

        let sentinel = Field::sentinel(width, height);
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let create_slot = |label: &str| -> wgpu::Buffer {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(sentinel.as_slice()),
                usage,
            })
        };
        let slots = [create_slot("field_0"), create_slot("field_1")];

        let update_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("update_params"),
            contents: bytemuck::bytes_of(&UpdateParams::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_params = RenderParams {
            width,
            height,
            mode: PresentMode::Stroke.gpu_index(),
            threshold: crate::config::DEFAULT_STROKE_THRESHOLD,
        };
        let render_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("render_params"),
            contents: bytemuck::bytes_of(&render_params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(GpuFieldStore {
            current: 0,
            width,
            height,
            slots,
            update_params_buffer,
            render_params_buffer,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> u32 {
        self.width * self.height
    }

    /// Swap ping-pong slots after an update has been encoded.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Index of the current (read) slot
    pub fn cur(&self) -> usize {
        self.current
    }

    /// Index of the next (write) slot
    pub fn next(&self) -> usize {
        1 - self.current
    }

    /// Workgroup counts covering the whole grid.
    pub fn dispatch_size(&self) -> (u32, u32) {
        (
            self.width.div_ceil(WORKGROUP_X),
            self.height.div_ceil(WORKGROUP_Y),
        )
    }

    pub fn write_update_params(&self, queue: &wgpu::Queue, pass: &UpdatePass) {
        let params = UpdateParams::new(self.width, self.height, pass);
        queue.write_buffer(&self.update_params_buffer, 0, bytemuck::bytes_of(&params));
    }

    pub fn write_render_params(&self, queue: &wgpu::Queue, mode: PresentMode, threshold: f32) {
        let params = RenderParams {
            width: self.width,
            height: self.height,
            mode: mode.gpu_index(),
            threshold,
        };
        queue.write_buffer(&self.render_params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Copy a CPU-computed field into the current slot for display.
    pub fn upload_current(&self, queue: &wgpu::Queue, field: &Field) {
        debug_assert_eq!((field.width(), field.height()), (self.width, self.height));
        queue.write_buffer(
            &self.slots[self.current],
            0,
            bytemuck::cast_slice(field.as_slice()),
        );
    }

    /// Blocking readback of the current slot.
    pub fn read_current(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Field, TrailError> {
        let size = self.cells() as u64 * std::mem::size_of::<f32>() as u64;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.slots[self.current], 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(TrailError::Gpu(format!("field readback map failed: {e}"))),
            Err(e) => return Err(TrailError::Gpu(format!("field readback channel closed: {e}"))),
        }

        let mut field = Field::filled(self.width, self.height, 0.0);
        {
            let data = slice.get_mapped_range();
            field
                .as_mut_slice()
                .copy_from_slice(bytemuck::cast_slice(&data[..]));
        }
        staging.unmap();
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::PointerSample;

    #[test]
    fn uniform_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<UpdateParams>(), 48);
        assert_eq!(std::mem::size_of::<RenderParams>(), 16);
        assert_eq!(std::mem::offset_of!(UpdateParams, pointer), 16);
        assert_eq!(std::mem::offset_of!(UpdateParams, fade_rate), 32);
    }

    #[test]
    fn update_params_carry_pass_and_constants() {
        let mut pass = UpdatePass::new(PointerSample::new([0.5, -0.5], [0.1, 0.2]), 2.0);
        pass.dt = 0.016;
        let p = UpdateParams::new(640, 480, &pass);
        assert_eq!((p.width, p.height), (640, 480));
        assert_eq!(p.pointer, [0.5, -0.5]);
        assert_eq!(p.prev_pointer, [0.1, 0.2]);
        assert_eq!(p.reinit_time, REINIT_TIME);
        assert_eq!(p.sentinel_offset, SENTINEL_OFFSET);
    }
}
