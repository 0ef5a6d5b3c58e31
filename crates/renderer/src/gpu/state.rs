use std::sync::Arc;

use anyhow::Result;
use params::ConfigUniform;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::accumulation::StageBackend;
use crate::compile::{prepare_source, validate_wgsl, CompileError};
use crate::reload::ProgramCompiler;
use crate::stage::StageKind;
use crate::types::{NORMALIZE_WORKGROUPS, SIMULATE_WORKGROUPS};

use super::context::GpuContext;
use super::palette::Palette;
use super::pipeline::{GpuProgram, StageLayouts};

/// Surface texture and encoder of the frame being recorded.
struct FrameInFlight {
    encoder: wgpu::CommandEncoder,
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Borrowed pieces of the current frame for overlay painters.
pub(crate) struct FrameParts<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub size: [u32; 2],
}

pub(crate) struct GpuState {
    context: GpuContext,
    layouts: StageLayouts,
    config_buffer: wgpu::Buffer,
    hits: wgpu::Buffer,
    _presentable: wgpu::Texture,
    _palette: Palette,
    simulate_bind_group: wgpu::BindGroup,
    normalize_bind_group: wgpu::BindGroup,
    present_bind_group: wgpu::BindGroup,
    frame: Option<FrameInFlight>,
}

impl GpuState {
    pub(crate) fn new(window: Arc<Window>, target_size: (u32, u32)) -> Result<Self> {
        let context = GpuContext::new(window, target_size)?;
        let device = &context.device;
        let layouts = StageLayouts::new(device);

        let config_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("config uniform"),
            size: std::mem::size_of::<ConfigUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let cells = u64::from(target_size.0) * u64::from(target_size.1);
        // wgpu zero-initialises new buffers, so the first epoch starts empty
        let hits = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hit counters"),
            size: cells * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let presentable = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("presentable density"),
            size: wgpu::Extent3d {
                width: target_size.0,
                height: target_size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let presentable_view = presentable.create_view(&wgpu::TextureViewDescriptor::default());
        let palette = Palette::new(device, &context.queue);

        let simulate_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("simulate bind group"),
            layout: &layouts.simulate,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: config_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: hits.as_entire_binding(),
                },
            ],
        });
        let normalize_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("normalize bind group"),
            layout: &layouts.normalize,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: config_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: hits.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&presentable_view),
                },
            ],
        });
        let present_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("present bind group"),
            layout: &layouts.present,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&presentable_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&palette.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&palette.sampler),
                },
            ],
        });

        tracing::debug!(
            width = target_size.0,
            height = target_size.1,
            "accumulation targets allocated"
        );

        Ok(Self {
            context,
            layouts,
            config_buffer,
            hits,
            _presentable: presentable,
            _palette: palette,
            simulate_bind_group,
            normalize_bind_group,
            present_bind_group,
            frame: None,
        })
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub(crate) fn surface_format(&self) -> wgpu::TextureFormat {
        self.context.surface_format
    }

    pub(crate) fn max_texture_side(&self) -> usize {
        self.context.device.limits().max_texture_dimension_2d as usize
    }

    pub(crate) fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    /// Acquires the next surface texture and opens the frame's encoder.
    pub(crate) fn begin_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let surface = self.context.surface.get_current_texture()?;
        if surface.suboptimal {
            tracing::debug!("surface suboptimal; reconfiguring after this frame");
        }
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.frame = Some(FrameInFlight {
            encoder,
            surface,
            view,
        });
        Ok(())
    }

    pub(crate) fn frame_parts(&mut self) -> Option<FrameParts<'_>> {
        let frame = self.frame.as_mut()?;
        Some(FrameParts {
            device: &self.context.device,
            queue: &self.context.queue,
            encoder: &mut frame.encoder,
            view: &frame.view,
            size: [self.context.config.width, self.context.config.height],
        })
    }

    /// Submits the recorded frame after `extra` and presents it.
    pub(crate) fn submit_frame(&mut self, extra: Vec<wgpu::CommandBuffer>) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        let suboptimal = frame.surface.suboptimal;
        self.context
            .queue
            .submit(extra.into_iter().chain(std::iter::once(frame.encoder.finish())));
        frame.surface.present();
        if suboptimal {
            self.context.reconfigure();
        }
    }
}

fn frame_missing(pass: &str) {
    tracing::warn!(pass, "no frame in flight; pass skipped");
}

impl StageBackend for GpuState {
    type Program = GpuProgram;

    fn clear_accumulation(&mut self) {
        match self.frame.as_mut() {
            Some(frame) => frame.encoder.clear_buffer(&self.hits, 0, None),
            None => frame_missing("clear"),
        }
    }

    fn upload_config(&mut self, config: &ConfigUniform) {
        self.context
            .queue
            .write_buffer(&self.config_buffer, 0, bytemuck::bytes_of(config));
    }

    fn dispatch_simulate(&mut self, program: &GpuProgram) {
        let GpuProgram::Compute(pipeline) = program else {
            tracing::warn!("simulate stage holds a render program");
            return;
        };
        let Some(frame) = self.frame.as_mut() else {
            frame_missing("simulate");
            return;
        };
        {
            let mut pass = frame
                .encoder
                .begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("simulate pass"),
                    timestamp_writes: None,
                });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.simulate_bind_group, &[]);
            pass.dispatch_workgroups(SIMULATE_WORKGROUPS, 1, 1);
        }
    }

    fn dispatch_normalize(&mut self, program: &GpuProgram) {
        let GpuProgram::Compute(pipeline) = program else {
            tracing::warn!("normalize stage holds a render program");
            return;
        };
        let Some(frame) = self.frame.as_mut() else {
            frame_missing("normalize");
            return;
        };
        {
            let mut pass = frame
                .encoder
                .begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("normalize pass"),
                    timestamp_writes: None,
                });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.normalize_bind_group, &[]);
            pass.dispatch_workgroups(NORMALIZE_WORKGROUPS, 1, 1);
        }
    }

    fn draw_present(&mut self, program: &GpuProgram) {
        let GpuProgram::Render(pipeline) = program else {
            tracing::warn!("present stage holds a compute program");
            return;
        };
        let Some(frame) = self.frame.as_mut() else {
            frame_missing("present");
            return;
        };
        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("present pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
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
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.present_bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }
}

impl ProgramCompiler for GpuState {
    type Program = GpuProgram;

    fn compile(&mut self, stage: StageKind, source: &str) -> Result<GpuProgram, CompileError> {
        let prepared = prepare_source(stage, source);
        validate_wgsl(stage, &prepared)?;
        self.layouts.build(
            &self.context.device,
            self.context.surface_format,
            stage,
            &prepared,
        )
    }
}
