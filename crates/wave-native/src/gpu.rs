use std::sync::mpsc;

use anyhow::anyhow;
use wave_core::{
    validate_wgsl, PixelBuffer, ProgramSource, RenderTarget, ShaderBackend, UniformLayout,
    FRAGMENT_ENTRY, VERTEX_ENTRY,
};

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const INITIAL_MARKER_CAPACITY: usize = 32;

const MARKER_WGSL: &str = r#"
struct MarkerUniforms {
    resolution: vec2<f32>,
    pad: vec2<f32>,
}

@group(0) @binding(0) var<uniform> mu: MarkerUniforms;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@vertex
fn vs_marker(
    @builtin(vertex_index) vi: u32,
    @location(0) center: vec2<f32>,
    @location(1) radius: f32,
    @location(2) color: vec4<f32>,
) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let local = corners[vi];
    let p = center + local * radius;
    // pixel space (y down) to clip space
    let ndc = vec2<f32>(p.x / mu.resolution.x * 2.0 - 1.0, 1.0 - p.y / mu.resolution.y * 2.0);
    var out: VsOut;
    out.pos = vec4<f32>(ndc, 0.0, 1.0);
    out.local = local;
    out.color = color;
    return out;
}

@fragment
fn fs_marker(in: VsOut) -> @location(0) vec4<f32> {
    let d = length(in.local);
    let ring = smoothstep(0.66, 0.74, d) * (1.0 - smoothstep(0.92, 1.0, d));
    if (ring <= 0.0) {
        discard;
    }
    return vec4<f32>(in.color.rgb, in.color.a * ring);
}
"#;

/// One marker ring, in window pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerInstance {
    pub center: [f32; 2],
    pub radius: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

impl MarkerInstance {
    pub fn new(center: glam::Vec2, radius: f32, color: glam::Vec4) -> Self {
        Self {
            center: center.to_array(),
            radius,
            _pad: 0.0,
            color: color.to_array(),
        }
    }
}

/// A synthesized field program compiled for one target format.
pub struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    target: RenderTarget,
}

struct MarkerOverlay {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instance_vb: wgpu::Buffer,
    capacity: usize,
    instances: Vec<MarkerInstance>,
}

pub struct WgpuBackend<'w> {
    pub window: &'w winit::window::Window,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    markers: MarkerOverlay,
}

fn uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl<'w> WgpuBackend<'w> {
    pub async fn new(window: &'w winit::window::Window) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No GPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // the field colours are computed in display space already
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!(
            "[gpu] adapter={} format={:?} size={}x{}",
            adapter.get_info().name,
            format,
            config.width,
            config.height
        );

        let bind_group_layout = uniform_bind_group_layout(&device, "field_bgl");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("field_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let markers = MarkerOverlay::new(&device, format);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            bind_group_layout,
            pipeline_layout,
            markers,
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Rings drawn over the field on the next `draw`.
    pub fn set_markers(&mut self, instances: &[MarkerInstance]) {
        self.markers.instances.clear();
        self.markers.instances.extend_from_slice(instances);
    }

    fn field_pipeline(
        &self,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("field_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                cache: None,
                multiview: None,
            })
    }

    fn encode_field(
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        program: &GpuProgram,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("field_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
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
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(0, &program.bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    fn read_texture(
        &self,
        texture: &wgpu::Texture,
        width: u32,
        height: u32,
        mut encoder: wgpu::CommandEncoder,
    ) -> anyhow::Result<Vec<u8>> {
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row =
            align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("export_readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| anyhow!("failed receiving GPU map callback"))??;

        let mapped = slice.get_mapped_range();
        let pixels = copy_tight_rows(&mapped, unpadded_bytes_per_row, padded_bytes_per_row, height)?;
        drop(mapped);
        readback.unmap();
        Ok(pixels)
    }

    fn offscreen(
        &self,
        program: &GpuProgram,
        uniforms: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<PixelBuffer> {
        if program.target != RenderTarget::Offscreen {
            return Err(anyhow!("program was not compiled for an off-screen target"));
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(anyhow!("{}x{} exceeds the device limit of {}", width, height, max));
        }
        self.queue.write_buffer(&program.uniform_buffer, 0, uniforms);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("export_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("export_encoder"),
            });
        Self::encode_field(&mut encoder, &view, program);
        let data = self.read_texture(&texture, width, height, encoder)?;
        texture.destroy();
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }
}

impl ShaderBackend for WgpuBackend<'_> {
    type Program = GpuProgram;
    type DrawError = wgpu::SurfaceError;

    fn compile(
        &mut self,
        source: &ProgramSource,
        layout: &UniformLayout,
        target: RenderTarget,
    ) -> Result<GpuProgram, String> {
        // naga gives readable diagnostics before wgpu sees the module
        validate_wgsl(&source.text)?;

        let format = match target {
            RenderTarget::Surface => self.config.format,
            RenderTarget::Offscreen => OFFSCREEN_FORMAT,
        };
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("field_shader"),
                source: wgpu::ShaderSource::Wgsl(source.text.as_str().into()),
            });
        let pipeline = self.field_pipeline(&shader, format);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_uniforms"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field_bg"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Ok(GpuProgram {
            pipeline,
            uniform_buffer,
            bind_group,
            target,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn draw(&mut self, program: &GpuProgram, uniforms: &[u8]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(&program.uniform_buffer, 0, uniforms);
        self.markers.upload(
            &self.device,
            &self.queue,
            [self.config.width as f32, self.config.height as f32],
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        Self::encode_field(&mut encoder, &view, program);
        self.markers.encode(&mut encoder, &view);
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn render_offscreen(
        &mut self,
        program: &GpuProgram,
        uniforms: &[u8],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, String> {
        self.offscreen(program, uniforms, width, height)
            .map_err(|e| format!("{e:#}"))
    }
}

impl MarkerOverlay {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("marker_shader"),
            source: wgpu::ShaderSource::Wgsl(MARKER_WGSL.into()),
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker_uniforms"),
            size: std::mem::size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = uniform_bind_group_layout(device, "marker_bgl");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marker_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("marker_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32,
                    offset: 8,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 16,
                    shader_location: 2,
                },
            ],
        }];
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("marker_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_marker"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_marker"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            cache: None,
            multiview: None,
        });
        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            instance_vb: Self::instance_buffer(device, INITIAL_MARKER_CAPACITY),
            capacity: INITIAL_MARKER_CAPACITY,
            instances: Vec::new(),
        }
    }

    fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker_instances"),
            size: (std::mem::size_of::<MarkerInstance>() * capacity) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, resolution: [f32; 2]) {
        if self.instances.is_empty() {
            return;
        }
        if self.instances.len() > self.capacity {
            self.capacity = self.instances.len().next_power_of_two();
            self.instance_vb = Self::instance_buffer(device, self.capacity);
        }
        let uniforms = [resolution[0], resolution[1], 0.0, 0.0];
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&uniforms));
        queue.write_buffer(&self.instance_vb, 0, bytemuck::cast_slice(&self.instances));
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        if self.instances.is_empty() {
            return;
        }
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("marker_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.instance_vb.slice(..));
        rpass.draw(0..6, 0..self.instances.len() as u32);
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn copy_tight_rows(
    mapped: &[u8],
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    height: u32,
) -> anyhow::Result<Vec<u8>> {
    let required = padded_bytes_per_row as usize * height as usize;
    if mapped.len() < required {
        return Err(anyhow!(
            "mapped image too small: expected at least {} bytes, got {}",
            required,
            mapped.len()
        ));
    }
    let row = unpadded_bytes_per_row as usize;
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in mapped.chunks(padded_bytes_per_row as usize).take(height as usize) {
        out.extend_from_slice(&chunk[..row]);
    }
    Ok(out)
}
