use std::borrow::Cow;

use crate::compile::{CompileError, COMPUTE_ENTRY, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::stage::StageKind;

/// A compiled stage, ready to record.
#[derive(Debug)]
pub enum GpuProgram {
    Compute(wgpu::ComputePipeline),
    Render(wgpu::RenderPipeline),
}

/// Bind group layouts fixed for the lifetime of the device. Reloaded shaders
/// must match them; a mismatch fails inside the validation scope.
pub(crate) struct StageLayouts {
    pub simulate: wgpu::BindGroupLayout,
    pub normalize: wgpu::BindGroupLayout,
    pub present: wgpu::BindGroupLayout,
    simulate_pipeline: wgpu::PipelineLayout,
    normalize_pipeline: wgpu::PipelineLayout,
    present_pipeline: wgpu::PipelineLayout,
}

impl StageLayouts {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let simulate = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("simulate layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, false),
            ],
        });
        let normalize = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("normalize layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::R32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });
        let present = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("present layout"),
            entries: &[
                texture_entry(0, false),
                texture_entry(1, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = |label: &str, layout: &wgpu::BindGroupLayout| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            })
        };
        let simulate_pipeline = pipeline_layout("simulate pipeline layout", &simulate);
        let normalize_pipeline = pipeline_layout("normalize pipeline layout", &normalize);
        let present_pipeline = pipeline_layout("present pipeline layout", &present);

        Self {
            simulate,
            normalize,
            present,
            simulate_pipeline,
            normalize_pipeline,
            present_pipeline,
        }
    }

    /// Builds the stage's pipeline from validated WGSL. Device-side errors are
    /// caught by a validation scope and reported instead of raised.
    pub(crate) fn build(
        &self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        stage: StageKind,
        source: &str,
    ) -> Result<GpuProgram, CompileError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(stage.label()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_owned())),
        });

        let program = match stage {
            StageKind::Simulate | StageKind::Normalize => {
                let layout = if stage == StageKind::Simulate {
                    &self.simulate_pipeline
                } else {
                    &self.normalize_pipeline
                };
                GpuProgram::Compute(device.create_compute_pipeline(
                    &wgpu::ComputePipelineDescriptor {
                        label: Some(stage.label()),
                        layout: Some(layout),
                        module: &module,
                        entry_point: Some(COMPUTE_ENTRY),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        cache: None,
                    },
                ))
            }
            StageKind::Present => GpuProgram::Render(self.build_present(
                device,
                surface_format,
                &module,
            )),
        };

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(CompileError::Device {
                stage,
                message: err.to_string(),
            });
        }
        Ok(program)
    }

    fn build_present(
        &self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        module: &wgpu::ShaderModule,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("present"),
            layout: Some(&self.present_pipeline),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}
