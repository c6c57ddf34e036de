//! [`GraphicsApi`] on top of wgpu.
//!
//! wgpu has no bound state: pipelines, bind groups and render passes are
//! explicit objects. This backend keeps the bound state itself and turns it
//! into wgpu objects at the last moment:
//!
//! - draws are collected into a pending render pass per target; the pass is
//!   encoded and submitted when the target changes, when a clear follows draws,
//!   on readback and on present
//! - every draw snapshots the program's uniform block into its own buffer and
//!   builds a bind group from the texture units the program samples
//! - render pipelines are created lazily per program and target format
//! - buffer writes orphan the old buffer so draws already recorded keep their data

use std::{collections::HashMap, iter, sync::Arc};

use instant::Duration;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    BufferHandle, BufferKind, Bytes, Capability, FramebufferHandle, FramebufferStatus,
    GraphicsApi, ProgramDesc, ProgramHandle, SamplerLocation, ShaderHandle, ShaderStage,
    TextureDesc, TextureDimension, TextureHandle, UniformLocation, UniformValue, Viewport,
    framebuffer_status,
    reflect::{self, CompiledStage, LinkedProgram},
};
use crate::error::{RenderError, Result};

/// Where the on-screen surface of a [`WgpuApi`] lives.
#[derive(Clone, Debug)]
pub enum SurfaceTarget {
    Window(Arc<Window>),
    /// An offscreen texture standing in for the surface. Can be read back.
    Headless { width: u32, height: u32 },
}

enum Presentation {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Headless {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

struct GpuProgram {
    linked: LinkedProgram,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    blend: Option<wgpu::BlendState>,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    block: Vec<u8>,
    units: Vec<u32>,
}

struct GpuBuffer {
    label: String,
    kind: BufferKind,
    buffer: wgpu::Buffer,
}

struct GpuTexture {
    desc: TextureDesc,
    /// `None` when the description has no sampleable wgpu equivalent.
    gpu: Option<(wgpu::Texture, wgpu::TextureView)>,
}

struct GpuFramebuffer {
    color: TextureHandle,
}

struct DrawCall {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex_buffers: Vec<wgpu::Buffer>,
    index: wgpu::Buffer,
    index_count: u32,
    instances: u32,
    viewport: Viewport,
}

struct PendingPass {
    target: Option<FramebufferHandle>,
    clear: Option<wgpu::Color>,
    draws: Vec<DrawCall>,
}

pub struct WgpuApi {
    device: wgpu::Device,
    queue: wgpu::Queue,
    capability: Capability,
    max_texture_size: u32,
    presentation: Presentation,
    surface_format: wgpu::TextureFormat,
    size: (u32, u32),
    next_id: u32,
    shaders: HashMap<ShaderHandle, CompiledStage>,
    programs: HashMap<ProgramHandle, GpuProgram>,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    textures: HashMap<TextureHandle, GpuTexture>,
    framebuffers: HashMap<FramebufferHandle, GpuFramebuffer>,
    sampler: wgpu::Sampler,
    fallbacks: HashMap<TextureDimension, wgpu::TextureView>,
    zero_stream: Option<wgpu::Buffer>,
    program: Option<ProgramHandle>,
    framebuffer: Option<FramebufferHandle>,
    units: HashMap<u32, (TextureHandle, TextureDimension)>,
    streams: HashMap<u32, BufferHandle>,
    index: Option<BufferHandle>,
    viewport: Viewport,
    pending: Option<PendingPass>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuApi {
    /// Creates the device, preferring full limits when `want_enhanced` is set
    /// and falling back to WebGL2 downlevel limits otherwise.
    pub async fn new(target: SurfaceTarget, want_enhanced: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: match target {
                SurfaceTarget::Window(_) => wgpu::Backends::PRIMARY,
                SurfaceTarget::Headless { .. } => wgpu::Backends::all(),
            },
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let (surface, size) = match &target {
            SurfaceTarget::Window(window) => {
                let size = window.inner_size();
                let surface = instance
                    .create_surface(window.clone())
                    .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;
                (Some(surface), (size.width.max(1), size.height.max(1)))
            }
            SurfaceTarget::Headless { width, height } => (None, ((*width).max(1), (*height).max(1))),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;

        let mut resolved = None;
        if want_enhanced && adapter.get_downlevel_capabilities().is_webgpu_compliant() {
            match request_device(&adapter, wgpu::Limits::default()).await {
                Ok(pair) => resolved = Some((pair, Capability::Enhanced)),
                Err(e) => log::warn!("enhanced device unavailable, falling back to baseline: {e}"),
            }
        }
        let ((device, queue), capability) = match resolved {
            Some(resolved) => resolved,
            None => {
                let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
                let pair = request_device(&adapter, limits)
                    .await
                    .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;
                (pair, Capability::Baseline)
            }
        };
        log::info!(
            "created {:?} context on {:?}",
            capability,
            adapter.get_info().backend
        );

        let (presentation, surface_format) = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let format = caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| f.is_srgb())
                    .or_else(|| caps.formats.first().copied())
                    .ok_or_else(|| {
                        RenderError::ContextUnavailable("surface reports no formats".to_string())
                    })?;
                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.0,
                    height: size.1,
                    present_mode: caps
                        .present_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::PresentMode::Fifo),
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&device, &config);
                (Presentation::Window { surface, config }, format)
            }
            None => {
                let format = wgpu::TextureFormat::Rgba8UnormSrgb;
                let (texture, view) = headless_surface(&device, size, format);
                (Presentation::Headless { texture, view }, format)
            }
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pass sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let fallbacks = [TextureDimension::D1, TextureDimension::D2, TextureDimension::D3]
            .into_iter()
            .map(|dimension| (dimension, fallback_texture(&device, dimension)))
            .collect();

        let max_texture_size = device.limits().max_texture_dimension_2d;
        Ok(Self {
            device,
            queue,
            capability,
            max_texture_size,
            presentation,
            surface_format,
            size,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            sampler,
            fallbacks,
            zero_stream: None,
            program: None,
            framebuffer: None,
            units: HashMap::new(),
            streams: HashMap::new(),
            index: None,
            viewport: Viewport::full(size.0, size.1),
            pending: None,
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn color_texture(&self, framebuffer: FramebufferHandle) -> Option<&GpuTexture> {
        self.framebuffers
            .get(&framebuffer)
            .and_then(|fb| self.textures.get(&fb.color))
    }

    fn target_format(&self) -> Result<wgpu::TextureFormat> {
        match self.framebuffer {
            None => Ok(self.surface_format),
            Some(fb) => self
                .color_texture(fb)
                .and_then(|texture| texture.gpu.as_ref())
                .map(|(texture, _)| texture.format())
                .ok_or_else(|| {
                    RenderError::InvalidArgument("the bound framebuffer is incomplete".to_string())
                }),
        }
    }

    fn target_extent(&self, target: Option<FramebufferHandle>) -> (u32, u32) {
        match target {
            None => self.size,
            Some(fb) => self
                .color_texture(fb)
                .map(|texture| (texture.desc.width, texture.desc.height))
                .unwrap_or((0, 0)),
        }
    }

    /// The pending pass for the bound framebuffer, flushing any other one.
    fn pass(&mut self) -> Result<&mut PendingPass> {
        if self.pending.as_ref().map(|pass| pass.target) != Some(self.framebuffer) {
            self.flush()?;
            self.pending = Some(PendingPass {
                target: self.framebuffer,
                clear: None,
                draws: Vec::new(),
            });
        }
        self.pending
            .as_mut()
            .ok_or_else(|| RenderError::InvalidArgument("no pending pass".to_string()))
    }

    fn surface_view(&mut self) -> Result<wgpu::TextureView> {
        match &self.presentation {
            Presentation::Headless { view, .. } => Ok(view.clone()),
            Presentation::Window { surface, .. } => {
                if self.frame.is_none() {
                    let frame = match surface.get_current_texture() {
                        wgpu::CurrentSurfaceTexture::Success(frame) => frame,
                        wgpu::CurrentSurfaceTexture::Suboptimal(frame) => {
                            log::debug!("surface texture is suboptimal");
                            frame
                        }
                        other => return Err(RenderError::Surface(format!("{other:?}"))),
                    };
                    self.frame = Some(frame);
                }
                self.frame
                    .as_ref()
                    .map(|frame| {
                        frame
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default())
                    })
                    .ok_or_else(|| RenderError::Surface("no surface texture".to_string()))
            }
        }
    }

    /// Encodes and submits the pending pass.
    fn flush(&mut self) -> Result<()> {
        let Some(pass) = self.pending.take() else {
            return Ok(());
        };
        if pass.clear.is_none() && pass.draws.is_empty() {
            return Ok(());
        }
        let view = match pass.target {
            None => self.surface_view()?,
            Some(fb) => self
                .color_texture(fb)
                .and_then(|texture| texture.gpu.as_ref())
                .map(|(_, view)| view.clone())
                .ok_or_else(|| {
                    RenderError::InvalidArgument("flushing into an incomplete framebuffer".to_string())
                })?,
        };
        let (width, height) = self.target_extent(pass.target);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pass Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match pass.clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for draw in &pass.draws {
                let Some(rect) = clamp_viewport(draw.viewport, width, height) else {
                    log::warn!("dropping a draw with a viewport outside its target");
                    continue;
                };
                render_pass.set_viewport(rect.x, rect.y, rect.width, rect.height, 0.0, 1.0);
                render_pass.set_pipeline(&draw.pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                render_pass.set_index_buffer(draw.index.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..draw.instances);
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }

    fn zero_stream(&mut self, size: u64) -> wgpu::Buffer {
        match &self.zero_stream {
            Some(buffer) if buffer.size() >= size => buffer.clone(),
            _ => {
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Zero Instance Stream"),
                    size: size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                    usage: wgpu::BufferUsages::VERTEX,
                    mapped_at_creation: false,
                });
                self.zero_stream = Some(buffer.clone());
                buffer
            }
        }
    }

    fn record_draw(&mut self, index_count: u32, instances: u32) -> Result<()> {
        let handle = self.program.ok_or(RenderError::NoProgramBound)?;
        let format = self.target_format()?;
        let target_texture = self
            .framebuffer
            .and_then(|fb| self.framebuffers.get(&fb))
            .map(|fb| fb.color);
        let index = self
            .index
            .and_then(|b| self.buffers.get(&b))
            .filter(|b| b.kind == BufferKind::Index)
            .map(|b| b.buffer.clone())
            .ok_or_else(|| RenderError::InvalidArgument("draw without an index buffer".to_string()))?;

        let program = self.programs.get(&handle).ok_or(RenderError::NoProgramBound)?;

        let mut views = Vec::with_capacity(program.linked.textures.len());
        for (binding, unit) in program.linked.textures.iter().zip(&program.units) {
            let bound = self
                .units
                .get(unit)
                .filter(|(_, dimension)| *dimension == binding.dimension)
                .map(|(texture, _)| *texture);
            if bound.is_some() && bound == target_texture {
                return Err(RenderError::InvalidArgument(format!(
                    "`{}` samples the texture that is being drawn into",
                    binding.name
                )));
            }
            let view = bound
                .and_then(|texture| self.textures.get(&texture))
                .and_then(|texture| texture.gpu.as_ref())
                .map(|(_, view)| view.clone())
                .or_else(|| self.fallbacks.get(&binding.dimension).cloned())
                .ok_or_else(|| {
                    RenderError::NotSupported(format!("{:?} textures", binding.dimension))
                })?;
            views.push((binding.texture_binding, binding.sampler_binding, view));
        }

        let mut streams = Vec::new();
        for (slot, stream) in program
            .linked
            .streams
            .iter()
            .take(program.linked.used_streams())
            .enumerate()
        {
            let bound = self
                .streams
                .get(&(slot as u32))
                .and_then(|b| self.buffers.get(b))
                .map(|b| b.buffer.clone());
            match (bound, stream.step_mode) {
                (Some(buffer), _) => streams.push(Ok(buffer)),
                (None, wgpu::VertexStepMode::Instance) => {
                    streams.push(Err(stream.stride * instances as u64))
                }
                (None, wgpu::VertexStepMode::Vertex) => {
                    return Err(RenderError::InvalidArgument(format!(
                        "vertex stream {slot} is not bound"
                    )));
                }
            }
        }

        let uniform_buffer = (!program.block.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Uniform Snapshot"),
                    contents: &program.block,
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        });

        let mut entries = Vec::with_capacity(1 + views.len() * 2);
        if let Some(buffer) = &uniform_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: reflect::UNIFORM_BINDING,
                resource: buffer.as_entire_binding(),
            });
        }
        for (texture_binding, sampler_binding, view) in &views {
            entries.push(wgpu::BindGroupEntry {
                binding: *texture_binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: *sampler_binding,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.linked.label),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let pipeline = match program.pipelines.get(&format) {
            Some(pipeline) => pipeline.clone(),
            None => {
                let pipeline = build_pipeline(&self.device, program, format);
                if let Some(program) = self.programs.get_mut(&handle) {
                    program.pipelines.insert(format, pipeline.clone());
                }
                pipeline
            }
        };

        let vertex_buffers = streams
            .into_iter()
            .map(|stream| match stream {
                Ok(buffer) => buffer,
                Err(size) => self.zero_stream(size),
            })
            .collect();

        let draw = DrawCall {
            pipeline,
            bind_group,
            vertex_buffers,
            index,
            index_count,
            instances,
            viewport: self.viewport,
        };
        self.pass()?.draws.push(draw);
        Ok(())
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
    required_limits: wgpu::Limits,
) -> std::result::Result<(wgpu::Device, wgpu::Queue), wgpu::RequestDeviceError> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("multipass device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
}

fn headless_surface(
    device: &wgpu::Device,
    size: (u32, u32),
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Surface"),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn wgpu_dimension(dimension: TextureDimension) -> (wgpu::TextureDimension, wgpu::TextureViewDimension) {
    match dimension {
        TextureDimension::D1 => (wgpu::TextureDimension::D1, wgpu::TextureViewDimension::D1),
        TextureDimension::D2 => (wgpu::TextureDimension::D2, wgpu::TextureViewDimension::D2),
        TextureDimension::D3 => (wgpu::TextureDimension::D3, wgpu::TextureViewDimension::D3),
    }
}

/// Transparent black 1x1(x1) texture sampled by units nothing is bound to.
fn fallback_texture(device: &wgpu::Device, dimension: TextureDimension) -> wgpu::TextureView {
    let (dim, _) = wgpu_dimension(dimension);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Fallback Texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: dim,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Formats the pass layouts can sample with a filtering sampler.
fn sampleable_format(desc: &TextureDesc) -> Option<wgpu::TextureFormat> {
    desc.wgpu_format().filter(|format| {
        matches!(
            format,
            wgpu::TextureFormat::Rgba8Unorm
                | wgpu::TextureFormat::Rgba8UnormSrgb
                | wgpu::TextureFormat::Rgba16Float
                | wgpu::TextureFormat::R8Unorm
                | wgpu::TextureFormat::R16Float
        )
    })
}

fn clamp_viewport(viewport: Viewport, width: u32, height: u32) -> Option<Viewport> {
    let x = viewport.x.clamp(0.0, width as f32);
    let y = viewport.y.clamp(0.0, height as f32);
    let rect = Viewport {
        x,
        y,
        width: viewport.width.min(width as f32 - x),
        height: viewport.height.min(height as f32 - y),
    };
    (rect.width > 0.0 && rect.height > 0.0).then_some(rect)
}

/// Pads upload data to the copy alignment. Empty data becomes one zero word.
fn aligned(data: &[u8]) -> Vec<u8> {
    let len = (data.len() as u64)
        .max(wgpu::COPY_BUFFER_ALIGNMENT)
        .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize;
    let mut out = data.to_vec();
    out.resize(len, 0);
    out
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &GpuProgram,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let attributes: Vec<Vec<wgpu::VertexAttribute>> = program
        .linked
        .streams
        .iter()
        .map(|stream| {
            stream
                .attributes
                .iter()
                .filter_map(|attribute| {
                    program
                        .linked
                        .attributes
                        .get(attribute.name)
                        .map(|&shader_location| wgpu::VertexAttribute {
                            format: attribute.format,
                            offset: attribute.offset,
                            shader_location,
                        })
                })
                .collect()
        })
        .collect();
    let layouts: Vec<wgpu::VertexBufferLayout> = program
        .linked
        .streams
        .iter()
        .zip(&attributes)
        .take(program.linked.used_streams())
        .map(|(stream, attributes)| wgpu::VertexBufferLayout {
            array_stride: stream.stride,
            step_mode: stream.step_mode,
            attributes,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&program.linked.label),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some(ShaderStage::Vertex.entry_point()),
            buffers: &layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some(ShaderStage::Fragment.entry_point()),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: program.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

impl GraphicsApi for WgpuApi {
    fn capability(&mut self) -> Capability {
        self.capability
    }

    fn surface_size(&mut self) -> (u32, u32) {
        self.size
    }

    fn max_texture_size(&mut self) -> u32 {
        self.max_texture_size
    }

    fn compile_shader(&mut self, stage: ShaderStage, label: &str, source: &str) -> Result<ShaderHandle> {
        let compiled = reflect::compile(stage, label, source)?;
        let handle = ShaderHandle(self.next());
        self.shaders.insert(handle, compiled);
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        desc: &ProgramDesc,
    ) -> Result<ProgramHandle> {
        let missing = || RenderError::ProgramLink {
            label: desc.label.clone(),
            log: "stage handle does not exist".to_string(),
        };
        let vs = self.shaders.get(&vertex).ok_or_else(missing)?;
        let fs = self.shaders.get(&fragment).ok_or_else(missing)?;
        let linked = reflect::link(vs, fs, desc)?;

        let module = |stage: &CompiledStage| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&stage.label),
                    source: wgpu::ShaderSource::Wgsl(stage.source.as_str().into()),
                })
        };
        let vertex_module = module(vs);
        let fragment_module = module(fs);

        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let mut entries = Vec::new();
        if let Some(block) = &linked.uniforms {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for texture in &linked.textures {
            let (_, view_dimension) = wgpu_dimension(texture.dimension);
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture.texture_binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture.sampler_binding,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&desc.label),
                entries: &entries,
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&desc.label),
                bind_group_layouts: &[Some(&bind_group_layout)],
                immediate_size: 0,
            });

        let block = vec![0u8; linked.uniform_block_size()];
        let units = vec![0; linked.textures.len()];
        let handle = ProgramHandle(self.next());
        self.programs.insert(
            handle,
            GpuProgram {
                linked,
                vertex: vertex_module,
                fragment: fragment_module,
                bind_group_layout,
                pipeline_layout,
                blend: desc.blend,
                pipelines: HashMap::new(),
                block,
                units,
            },
        );
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        if self.program == Some(program) {
            self.program = None;
        }
    }

    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs
            .get(&program)
            .and_then(|p| p.linked.attributes.get(name).copied())
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)
            .and_then(|p| p.linked.uniform_location(name))
    }

    fn sampler_location(&mut self, program: ProgramHandle, name: &str) -> Option<SamplerLocation> {
        self.programs
            .get(&program)
            .and_then(|p| p.linked.sampler_location(name))
    }

    fn assign_sampler_unit(&mut self, program: ProgramHandle, location: SamplerLocation, unit: u32) {
        if let Some(slot) = self
            .programs
            .get_mut(&program)
            .and_then(|p| p.units.get_mut(location.0 as usize))
        {
            *slot = unit;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.program = program;
    }

    fn write_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()> {
        let handle = self.program.ok_or(RenderError::NoProgramBound)?;
        let program = self
            .programs
            .get_mut(&handle)
            .ok_or(RenderError::NoProgramBound)?;
        value.write_into(location, &mut program.block)
    }

    fn create_buffer(&mut self, kind: BufferKind, label: &str, data: Bytes<'_>) -> BufferHandle {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &aligned(data.0),
                usage,
            });
        let handle = BufferHandle(self.next());
        self.buffers.insert(
            handle,
            GpuBuffer {
                label: label.to_string(),
                kind,
                buffer,
            },
        );
        handle
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: Bytes<'_>) {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            log::error!("write to unknown buffer {buffer:?}");
            return;
        };
        let usage = match entry.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        entry.buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&entry.label),
                contents: &aligned(data.0),
                usage,
            });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.streams.retain(|_, bound| *bound != buffer);
        if self.index == Some(buffer) {
            self.index = None;
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc, data: Option<Bytes<'_>>) -> Result<TextureHandle> {
        let texel = desc.texel_size();
        if let Some(data) = data {
            desc.check_upload(data.0)?;
        }

        let format = sampleable_format(desc).filter(|_| desc.has_valid_extent(self.max_texture_size));
        let gpu = match format {
            None => {
                log::warn!(
                    "texture '{}' ({:?} {:?} {}x{}x{}) has no GPU storage",
                    desc.label,
                    desc.format,
                    desc.component,
                    desc.width,
                    desc.height,
                    desc.depth
                );
                None
            }
            Some(format) => {
                let (dimension, _) = wgpu_dimension(desc.dimension);
                let size = wgpu::Extent3d {
                    width: desc.width,
                    height: if desc.dimension == TextureDimension::D1 { 1 } else { desc.height },
                    depth_or_array_layers: if desc.dimension == TextureDimension::D3 {
                        desc.depth
                    } else {
                        1
                    },
                };
                let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC;
                if framebuffer_status(desc, self.max_texture_size, self.capability)
                    == FramebufferStatus::Complete
                {
                    usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
                }
                let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&desc.label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension,
                    format,
                    usage,
                    view_formats: &[],
                });
                if let (Some(data), Some(texel)) = (data, texel) {
                    self.queue.write_texture(
                        wgpu::TexelCopyTextureInfo {
                            aspect: wgpu::TextureAspect::All,
                            texture: &texture,
                            mip_level: 0,
                            origin: wgpu::Origin3d::ZERO,
                        },
                        data.0,
                        wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(texel * size.width),
                            rows_per_image: Some(size.height),
                        },
                        size,
                    );
                }
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Some((texture, view))
            }
        };

        let handle = TextureHandle(self.next());
        self.textures.insert(
            handle,
            GpuTexture {
                desc: desc.clone(),
                gpu,
            },
        );
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.units.retain(|_, (bound, _)| *bound != texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>, dimension: TextureDimension) {
        match texture {
            Some(texture) => {
                self.units.insert(unit, (texture, dimension));
            }
            None => {
                self.units.remove(&unit);
            }
        }
    }

    fn create_framebuffer(&mut self, _label: &str, color: TextureHandle) -> FramebufferHandle {
        let handle = FramebufferHandle(self.next());
        self.framebuffers.insert(handle, GpuFramebuffer { color });
        handle
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        match self.color_texture(framebuffer) {
            Some(texture) => match framebuffer_status(&texture.desc, self.max_texture_size, self.capability) {
                FramebufferStatus::Complete if texture.gpu.is_none() => FramebufferStatus::Unsupported,
                status => status,
            },
            None => FramebufferStatus::IncompleteAttachment,
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffers.remove(&framebuffer);
        if self.framebuffer == Some(framebuffer) {
            self.framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.framebuffer = framebuffer;
    }

    fn viewport(&mut self, rect: Viewport) {
        self.viewport = rect;
    }

    fn clear(&mut self, color: wgpu::Color, _depth: Option<f32>) {
        let result = (|| -> Result<()> {
            if !self.pass()?.draws.is_empty() {
                self.flush()?;
            }
            self.pass()?.clear = Some(color);
            Ok(())
        })();
        if let Err(e) = result {
            log::error!("clear dropped: {e}");
        }
    }

    fn bind_vertex_buffer(&mut self, stream: u32, buffer: Option<BufferHandle>) {
        match buffer {
            Some(buffer) => {
                self.streams.insert(stream, buffer);
            }
            None => {
                self.streams.remove(&stream);
            }
        }
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.index = buffer;
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.record_draw(index_count, 1)
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instances: u32) -> Result<()> {
        self.record_draw(index_count, instances)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Err(e) = self.flush() {
            log::warn!("pending pass lost on resize: {e}");
        }
        self.frame = None;
        self.size = (width, height);
        match &mut self.presentation {
            Presentation::Window { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            Presentation::Headless { texture, view } => {
                let (new_texture, new_view) = headless_surface(&self.device, self.size, self.surface_format);
                *texture = new_texture;
                *view = new_view;
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        self.flush()?;
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn read_pixels(&mut self, framebuffer: Option<FramebufferHandle>) -> Result<image::RgbaImage> {
        self.flush()?;
        let (texture, (width, height)) = match framebuffer {
            Some(fb) => {
                let texture = self
                    .color_texture(fb)
                    .and_then(|texture| texture.gpu.as_ref())
                    .map(|(texture, _)| texture.clone())
                    .ok_or_else(|| {
                        RenderError::InvalidArgument("framebuffer has no color storage".to_string())
                    })?;
                (texture, self.target_extent(Some(fb)))
            }
            None => match &self.presentation {
                Presentation::Headless { texture, .. } => (texture.clone(), self.size),
                Presentation::Window { .. } => {
                    return Err(RenderError::NotSupported(
                        "reading back a window surface".to_string(),
                    ));
                }
            },
        };
        if texture.format().block_copy_size(None) != Some(4) {
            return Err(RenderError::NotSupported(format!(
                "reading back {:?} textures",
                texture.format()
            )));
        }
        read_texture(&self.device, &self.queue, &texture, width, height)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<image::RgbaImage> {
    let unpadded = 4 * width;
    let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let output = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let slice = output.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .map_err(|e| RenderError::Surface(format!("readback poll failed: {e}")))?;
    match futures::executor::block_on(rx.receive()) {
        Some(Ok(())) => {}
        Some(Err(e)) => return Err(RenderError::Surface(format!("readback map failed: {e}"))),
        None => return Err(RenderError::Surface("readback was cancelled".to_string())),
    }

    let pixels = {
        let data = slice.get_mapped_range();
        data.chunks_exact(padded as usize)
            .flat_map(|row| row[..unpadded as usize].iter().copied())
            .collect::<Vec<u8>>()
    };
    output.unmap();
    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| RenderError::Surface("readback size mismatch".to_string()))
}

#[cfg(target_arch = "wasm32")]
fn read_texture(
    _device: &wgpu::Device,
    _queue: &wgpu::Queue,
    _texture: &wgpu::Texture,
    _width: u32,
    _height: u32,
) -> Result<image::RgbaImage> {
    Err(RenderError::NotSupported(
        "blocking readback on the web".to_string(),
    ))
}
