//! A headless [`GraphicsApi`] that journals what the device asks of it.
//!
//! Shaders go through the same WGSL front end as the GPU backend, so location
//! queries, link errors and uniform layouts are real. Instead of rasterizing,
//! every clear and draw is appended to a shared [`Journal`] together with a
//! snapshot of the state it would have consumed.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use super::{
    BufferHandle, BufferKind, Bytes, Capability, FramebufferHandle, FramebufferStatus,
    GraphicsApi, ProgramDesc, ProgramHandle, SamplerLocation, ShaderHandle, ShaderStage,
    TextureDesc, TextureDimension, TextureHandle, UniformLocation, UniformValue, Viewport,
    framebuffer_status,
    reflect::{self, CompiledStage, LinkedProgram},
};
use crate::error::{RenderError, Result};

/// Logical per-instance values of a draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceSample {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClearRecord {
    /// Framebuffer label, `None` for the surface.
    pub target: Option<String>,
    pub color: wgpu::Color,
    pub depth: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub program: String,
    /// Framebuffer label, `None` for the surface.
    pub target: Option<String>,
    /// Label of the buffer bound to stream 0.
    pub mesh: Option<String>,
    pub index_count: u32,
    pub instances: u32,
    pub instanced: bool,
    pub viewport: Viewport,
    /// Uniform block contents by member name.
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Sampled texture label by sampler name.
    pub textures: BTreeMap<String, String>,
    /// Values read from the per-instance stream, zero when it is unbound.
    pub instance_data: Vec<InstanceSample>,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn int_uniform(&self, name: &str) -> Option<i32> {
        match self.uniform(name) {
            Some(UniformValue::Int(value)) => Some(value),
            _ => None,
        }
    }

    pub fn primitives(&self) -> u32 {
        self.index_count / 3 * self.instances
    }

    /// Position and texcoord offset each drawn instance ends up with.
    pub fn logical_instances(&self) -> Vec<InstanceSample> {
        let object_position = match self.uniform("object_position") {
            Some(UniformValue::Vec3(v)) => v,
            _ => [0.0; 3],
        };
        let texcoord_offset = match self.uniform("texcoord_offset") {
            Some(UniformValue::Vec2(v)) => v,
            _ => [0.0; 2],
        };
        self.instance_data
            .iter()
            .map(|instance| InstanceSample {
                position: [
                    object_position[0] + instance.position[0],
                    object_position[1] + instance.position[1],
                    object_position[2] + instance.position[2],
                ],
                texcoord: [
                    texcoord_offset[0] + instance.texcoord[0],
                    texcoord_offset[1] + instance.texcoord[1],
                ],
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Clear(ClearRecord),
    Draw(DrawRecord),
    Present,
}

/// Everything a [`RecordingApi`] observed, in call order.
#[derive(Debug, Default)]
pub struct Journal {
    /// Name of every API operation invoked.
    pub calls: Vec<&'static str>,
    pub events: Vec<Event>,
    /// Name lookups of attributes, uniforms and samplers.
    pub resolutions: usize,
    /// Number of `write_buffer` uploads.
    pub buffer_writes: usize,
    pub live_buffers: usize,
    pub live_textures: usize,
    pub live_framebuffers: usize,
}

impl Journal {
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.events.iter().filter_map(|event| match event {
            Event::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn clears(&self) -> impl Iterator<Item = &ClearRecord> {
        self.events.iter().filter_map(|event| match event {
            Event::Clear(clear) => Some(clear),
            _ => None,
        })
    }

    pub fn presents(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Present))
            .count()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|name| **name == call).count()
    }

    pub fn reset(&mut self) {
        self.calls.clear();
        self.events.clear();
        self.resolutions = 0;
        self.buffer_writes = 0;
    }
}

struct RecordedProgram {
    linked: LinkedProgram,
    block: Vec<u8>,
    units: Vec<u32>,
}

struct RecordedBuffer {
    label: String,
    data: Vec<u8>,
}

struct RecordedFramebuffer {
    label: String,
    color: TextureHandle,
}

pub struct RecordingApi {
    capability: Capability,
    size: (u32, u32),
    max_texture_size: u32,
    next_id: u32,
    shaders: HashMap<ShaderHandle, CompiledStage>,
    programs: HashMap<ProgramHandle, RecordedProgram>,
    buffers: HashMap<BufferHandle, RecordedBuffer>,
    textures: HashMap<TextureHandle, TextureDesc>,
    framebuffers: HashMap<FramebufferHandle, RecordedFramebuffer>,
    program: Option<ProgramHandle>,
    framebuffer: Option<FramebufferHandle>,
    units: BTreeMap<u32, (TextureHandle, TextureDimension)>,
    streams: BTreeMap<u32, BufferHandle>,
    index: Option<BufferHandle>,
    viewport: Viewport,
    journal: Rc<RefCell<Journal>>,
}

impl RecordingApi {
    pub fn new(capability: Capability, width: u32, height: u32) -> Self {
        let max_texture_size = match capability {
            Capability::Enhanced => wgpu::Limits::default().max_texture_dimension_2d,
            Capability::Baseline => wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d,
        };
        Self {
            capability,
            size: (width, height),
            max_texture_size,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            program: None,
            framebuffer: None,
            units: BTreeMap::new(),
            streams: BTreeMap::new(),
            index: None,
            viewport: Viewport::full(width, height),
            journal: Rc::new(RefCell::new(Journal::default())),
        }
    }

    /// A handle on the journal that stays valid after the API is boxed.
    pub fn journal(&self) -> Rc<RefCell<Journal>> {
        self.journal.clone()
    }

    fn call(&self, name: &'static str) {
        self.journal.borrow_mut().calls.push(name);
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_label(&self) -> Option<String> {
        self.framebuffer
            .and_then(|fb| self.framebuffers.get(&fb))
            .map(|fb| fb.label.clone())
    }

    fn record_draw(&mut self, index_count: u32, instances: u32, instanced: bool) -> Result<()> {
        let handle = self.program.ok_or(RenderError::NoProgramBound)?;
        let program = self
            .programs
            .get(&handle)
            .ok_or(RenderError::NoProgramBound)?;
        if self.index.is_none() || !self.streams.contains_key(&0) {
            return Err(RenderError::InvalidArgument(
                "draw without a bound mesh".to_string(),
            ));
        }

        let target_texture = self
            .framebuffer
            .and_then(|fb| self.framebuffers.get(&fb))
            .map(|fb| fb.color);
        let mut textures = BTreeMap::new();
        for (binding, unit) in program.linked.textures.iter().zip(&program.units) {
            let Some((texture, dimension)) = self.units.get(unit) else {
                continue;
            };
            if *dimension != binding.dimension {
                continue;
            }
            if Some(*texture) == target_texture {
                return Err(RenderError::InvalidArgument(format!(
                    "`{}` samples the texture that is being drawn into",
                    binding.name
                )));
            }
            if let Some(desc) = self.textures.get(texture) {
                textures.insert(binding.name.clone(), desc.label.clone());
            }
        }

        let uniforms = program
            .linked
            .uniforms
            .iter()
            .flat_map(|block| block.members.iter())
            .filter_map(|(name, location)| {
                UniformValue::read_from(*location, &program.block).map(|value| (name.clone(), value))
            })
            .collect();

        let mut instance_data = vec![
            InstanceSample {
                position: [0.0; 3],
                texcoord: [0.0; 2],
            };
            instances as usize
        ];
        for (slot, stream) in program.linked.streams.iter().enumerate() {
            if stream.step_mode != wgpu::VertexStepMode::Instance {
                continue;
            }
            let Some(buffer) = self
                .streams
                .get(&(slot as u32))
                .and_then(|b| self.buffers.get(b))
            else {
                continue;
            };
            let read = |offset: u64, i: usize, count: usize| -> Option<Vec<f32>> {
                let start = i * stream.stride as usize + offset as usize;
                let bytes = buffer.data.get(start..start + count * 4)?;
                Some(
                    bytes
                        .chunks_exact(4)
                        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            };
            for (i, sample) in instance_data.iter_mut().enumerate() {
                if let Some(attribute) = stream.attribute("instance_position") {
                    if let Some(v) = read(attribute.offset, i, 3) {
                        sample.position = [v[0], v[1], v[2]];
                    }
                }
                if let Some(attribute) = stream.attribute("instance_texcoord") {
                    if let Some(v) = read(attribute.offset, i, 2) {
                        sample.texcoord = [v[0], v[1]];
                    }
                }
            }
        }

        let mesh = self
            .streams
            .get(&0)
            .and_then(|b| self.buffers.get(b))
            .map(|b| b.label.clone());
        let record = DrawRecord {
            program: program.linked.label.clone(),
            target: self.target_label(),
            mesh,
            index_count,
            instances,
            instanced,
            viewport: self.viewport,
            uniforms,
            textures,
            instance_data,
        };
        self.journal.borrow_mut().events.push(Event::Draw(record));
        Ok(())
    }
}

impl GraphicsApi for RecordingApi {
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
        self.call("compile_shader");
        let compiled = reflect::compile(stage, label, source)?;
        let handle = ShaderHandle(self.next());
        self.shaders.insert(handle, compiled);
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.call("delete_shader");
        self.shaders.remove(&shader);
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        desc: &ProgramDesc,
    ) -> Result<ProgramHandle> {
        self.call("link_program");
        let missing = || RenderError::ProgramLink {
            label: desc.label.clone(),
            log: "stage handle does not exist".to_string(),
        };
        let vs = self.shaders.get(&vertex).ok_or_else(missing)?;
        let fs = self.shaders.get(&fragment).ok_or_else(missing)?;
        let linked = reflect::link(vs, fs, desc)?;
        let block = vec![0u8; linked.uniform_block_size()];
        let units = vec![0; linked.textures.len()];
        let handle = ProgramHandle(self.next());
        self.programs.insert(
            handle,
            RecordedProgram {
                linked,
                block,
                units,
            },
        );
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.call("delete_program");
        self.programs.remove(&program);
        if self.program == Some(program) {
            self.program = None;
        }
    }

    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.call("attribute_location");
        self.journal.borrow_mut().resolutions += 1;
        self.programs
            .get(&program)
            .and_then(|p| p.linked.attributes.get(name).copied())
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.call("uniform_location");
        self.journal.borrow_mut().resolutions += 1;
        self.programs
            .get(&program)
            .and_then(|p| p.linked.uniform_location(name))
    }

    fn sampler_location(&mut self, program: ProgramHandle, name: &str) -> Option<SamplerLocation> {
        self.call("sampler_location");
        self.journal.borrow_mut().resolutions += 1;
        self.programs
            .get(&program)
            .and_then(|p| p.linked.sampler_location(name))
    }

    fn assign_sampler_unit(&mut self, program: ProgramHandle, location: SamplerLocation, unit: u32) {
        self.call("assign_sampler_unit");
        if let Some(slot) = self
            .programs
            .get_mut(&program)
            .and_then(|p| p.units.get_mut(location.0 as usize))
        {
            *slot = unit;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.call("use_program");
        self.program = program;
    }

    fn write_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()> {
        self.call("write_uniform");
        let handle = self.program.ok_or(RenderError::NoProgramBound)?;
        let program = self
            .programs
            .get_mut(&handle)
            .ok_or(RenderError::NoProgramBound)?;
        value.write_into(location, &mut program.block)
    }

    fn create_buffer(&mut self, _kind: BufferKind, label: &str, data: Bytes<'_>) -> BufferHandle {
        self.call("create_buffer");
        let handle = BufferHandle(self.next());
        self.buffers.insert(
            handle,
            RecordedBuffer {
                label: label.to_string(),
                data: data.0.to_vec(),
            },
        );
        self.journal.borrow_mut().live_buffers += 1;
        handle
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: Bytes<'_>) {
        self.call("write_buffer");
        if let Some(recorded) = self.buffers.get_mut(&buffer) {
            recorded.data = data.0.to_vec();
            self.journal.borrow_mut().buffer_writes += 1;
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.call("delete_buffer");
        if self.buffers.remove(&buffer).is_some() {
            self.journal.borrow_mut().live_buffers -= 1;
        }
        self.streams.retain(|_, bound| *bound != buffer);
        if self.index == Some(buffer) {
            self.index = None;
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc, data: Option<Bytes<'_>>) -> Result<TextureHandle> {
        self.call("create_texture");
        if let Some(data) = data {
            desc.check_upload(data.0)?;
        }
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, desc.clone());
        self.journal.borrow_mut().live_textures += 1;
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.call("delete_texture");
        if self.textures.remove(&texture).is_some() {
            self.journal.borrow_mut().live_textures -= 1;
        }
        self.units.retain(|_, (bound, _)| *bound != texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>, dimension: TextureDimension) {
        self.call("bind_texture");
        match texture {
            Some(texture) => {
                self.units.insert(unit, (texture, dimension));
            }
            None => {
                self.units.remove(&unit);
            }
        }
    }

    fn create_framebuffer(&mut self, label: &str, color: TextureHandle) -> FramebufferHandle {
        self.call("create_framebuffer");
        let handle = FramebufferHandle(self.next());
        self.framebuffers.insert(
            handle,
            RecordedFramebuffer {
                label: label.to_string(),
                color,
            },
        );
        self.journal.borrow_mut().live_framebuffers += 1;
        handle
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        self.call("framebuffer_status");
        self.framebuffers
            .get(&framebuffer)
            .and_then(|fb| self.textures.get(&fb.color))
            .map(|desc| framebuffer_status(desc, self.max_texture_size, self.capability))
            .unwrap_or(FramebufferStatus::IncompleteAttachment)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.call("delete_framebuffer");
        if self.framebuffers.remove(&framebuffer).is_some() {
            self.journal.borrow_mut().live_framebuffers -= 1;
        }
        if self.framebuffer == Some(framebuffer) {
            self.framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.call("bind_framebuffer");
        self.framebuffer = framebuffer;
    }

    fn viewport(&mut self, rect: Viewport) {
        self.call("viewport");
        self.viewport = rect;
    }

    fn clear(&mut self, color: wgpu::Color, depth: Option<f32>) {
        self.call("clear");
        let record = ClearRecord {
            target: self.target_label(),
            color,
            depth,
        };
        self.journal.borrow_mut().events.push(Event::Clear(record));
    }

    fn bind_vertex_buffer(&mut self, stream: u32, buffer: Option<BufferHandle>) {
        self.call("bind_vertex_buffer");
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
        self.call("bind_index_buffer");
        self.index = buffer;
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.call("draw_indexed");
        self.record_draw(index_count, 1, false)
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instances: u32) -> Result<()> {
        self.call("draw_indexed_instanced");
        self.record_draw(index_count, instances, true)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.call("resize");
        self.size = (width, height);
    }

    fn present(&mut self) -> Result<()> {
        self.call("present");
        self.journal.borrow_mut().events.push(Event::Present);
        Ok(())
    }

    fn read_pixels(&mut self, _framebuffer: Option<FramebufferHandle>) -> Result<image::RgbaImage> {
        self.call("read_pixels");
        Err(RenderError::NotSupported(
            "the recording backend does not rasterize".to_string(),
        ))
    }
}
