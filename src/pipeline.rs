// ============================================================================
// pipeline.rs — Cursor Trail
// GPU pipeline creation (field update compute & present render) and the
// per-slot bind groups, which are rebuilt whenever the field is reallocated.
// ============================================================================

use crate::gpu_field::GpuFieldStore;

// ======================== Pipelines ========================

/// Pipelines and layouts. These outlive resizes.
pub struct Pipelines {
    pub update_pipeline: wgpu::ComputePipeline,
    pub update_bgl: wgpu::BindGroupLayout,

    pub render_pipeline: wgpu::RenderPipeline,
    pub render_bgl: wgpu::BindGroupLayout,
}

/// Bind groups tied to one allocation of the field slots.
pub struct FieldBindGroups {
    /// Indexed by the current slot: read [i], write [1 - i].
    pub update: [wgpu::BindGroup; 2],
    /// Indexed by the slot to present.
    pub render: [wgpu::BindGroup; 2],
}

// ======================== Pipeline Creation ========================

pub fn create_pipelines(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Pipelines {
    let update_shader = load_shader(device, "update_field", include_str!("shaders/update_field.wgsl"));
    let render_shader = load_shader(device, "render", include_str!("shaders/render.wgsl"));

    // ================================================================
    // UPDATE PIPELINE
    // ================================================================
    let update_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("update_bgl"),
        entries: &[bgl_uniform(0), bgl_storage_ro(1), bgl_storage_rw(2)],
    });

    let update_pipeline = create_compute_pipeline(device, "update_field", &update_bgl, &update_shader, "main");

    // ================================================================
    // RENDER PIPELINE
    // ================================================================
    let render_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("render_bgl"),
        entries: &[bgl_uniform(0), bgl_storage_ro(1)],
    });

    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("render_pipeline_layout"),
        bind_group_layouts: &[&render_bgl],
        push_constant_ranges: &[],
    });

    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("render_pipeline"),
        layout: Some(&render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &render_shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &render_shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Pipelines {
        update_pipeline,
        update_bgl,
        render_pipeline,
        render_bgl,
    }
}

pub fn create_bind_groups(
    device: &wgpu::Device,
    pipelines: &Pipelines,
    field: &GpuFieldStore,
) -> FieldBindGroups {
    let update_bg = |read: usize, write: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("update_bg_{read}")),
            layout: &pipelines.update_bgl,
            entries: &[
                bg_buffer(0, &field.update_params_buffer),
                bg_buffer(1, &field.slots[read]),
                bg_buffer(2, &field.slots[write]),
            ],
        })
    };

    let render_bg = |slot: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("render_bg_{slot}")),
            layout: &pipelines.render_bgl,
            entries: &[
                bg_buffer(0, &field.render_params_buffer),
                bg_buffer(1, &field.slots[slot]),
            ],
        })
    };

    FieldBindGroups {
        // cur=0: read [0], write [1]
        update: [update_bg(0, 1), update_bg(1, 0)],
        render: [render_bg(0), render_bg(1)],
    }
}

// ======================== Encoding ========================

/// Encode one update pass reading the current slot and writing the next.
/// The caller swaps after encoding; later passes in the same submission see
/// the completed writes.
pub fn encode_update_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipelines: &Pipelines,
    bind_groups: &FieldBindGroups,
    field: &GpuFieldStore,
) {
    let (dispatch_x, dispatch_y) = field.dispatch_size();
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("update_field_pass"),
        timestamp_writes: None,
    });
    pass.set_pipeline(&pipelines.update_pipeline);
    pass.set_bind_group(0, &bind_groups.update[field.cur()], &[]);
    pass.dispatch_workgroups(dispatch_x, dispatch_y, 1);
}

// ======================== Helpers ========================

fn load_shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

fn create_compute_pipeline(
    device: &wgpu::Device,
    name: &str,
    bgl: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{name}_pipeline_layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{name}_pipeline")),
        layout: Some(&layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_ro(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_rw(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bg_buffer(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}
