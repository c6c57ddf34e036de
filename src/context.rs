//! The graphics device: single owner of everything currently bound.
//!
//! Every state change of the pipeline is routed through [`GraphicsDevice`], so
//! there is exactly one answer to "which program, material, target and
//! viewport are active". Each call leaves that state fully applied before it
//! returns.

use std::collections::BTreeMap;

use crate::{
    backend::{
        BufferHandle, BufferKind, Bytes, Capability, DebugApi, GraphicsApi, SurfaceTarget,
        TextureDesc, TextureDimension, TextureHandle, UniformValue, Viewport, WgpuApi,
    },
    config::DeviceConfig,
    data_structures::{
        material::{Material, MaterialId, MaterialSlot},
        texture::Texture,
    },
    error::{RenderError, Result},
    pipelines::program::{Location, ShaderProgram, Uniform},
    target::RenderTarget,
};

/// Float arguments of the vector uniform setters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Components<'a> {
    /// One value repeated `count` times.
    Broadcast { value: f32, count: usize },
    PerComponent(&'a [f32]),
}

impl Components<'_> {
    pub fn to_value(self) -> Result<UniformValue> {
        match self {
            Components::Broadcast { value, count } => match count {
                1..=4 => UniformValue::from_floats(&[value; 4][..count]),
                _ => Err(RenderError::InvalidArgument(format!(
                    "uniform vectors have 1 to 4 components, got {count}"
                ))),
            },
            Components::PerComponent(values) => UniformValue::from_floats(values),
        }
    }
}

/// Creates the device for `surface`.
///
/// With `want_enhanced` the full capability level is tried first; the baseline
/// level is used when it is unavailable. Only a missing adapter is an error.
pub async fn create_context(
    surface: SurfaceTarget,
    want_enhanced: bool,
    want_debug: bool,
) -> Result<GraphicsDevice> {
    let api = WgpuApi::new(surface, want_enhanced).await?;
    Ok(GraphicsDevice::from_api(api, want_debug))
}

impl DeviceConfig {
    pub async fn create_context(&self, surface: SurfaceTarget) -> Result<GraphicsDevice> {
        create_context(surface, self.enhanced, self.debug).await
    }
}

pub struct GraphicsDevice {
    api: Box<dyn GraphicsApi>,
    capability: Capability,
    size: (u32, u32),
    program: Option<ShaderProgram>,
    material: Option<MaterialId>,
    viewport: Viewport,
    /// Color texture of the bound render target, `None` for the surface.
    draw_target: Option<TextureHandle>,
    /// Textures bound for sampling by slot.
    slots: BTreeMap<u32, TextureHandle>,
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("capability", &self.capability)
            .field("size", &self.size)
            .field("program", &self.program.as_ref().map(|p| p.label()))
            .field("material", &self.material)
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl GraphicsDevice {
    /// Wraps an existing API. `debug` adds call logging.
    pub fn from_api<A: GraphicsApi + 'static>(api: A, debug: bool) -> Self {
        let mut api: Box<dyn GraphicsApi> = if debug {
            Box::new(DebugApi::new(api))
        } else {
            Box::new(api)
        };
        let capability = api.capability();
        let size = api.surface_size();
        if capability == Capability::Baseline {
            log::warn!("running on the baseline capability level: no instancing, no 3D textures");
        }
        Self {
            api,
            capability,
            size,
            program: None,
            material: None,
            viewport: Viewport::full(size.0, size.1),
            draw_target: None,
            slots: BTreeMap::new(),
        }
    }

    pub(crate) fn api(&mut self) -> &mut dyn GraphicsApi {
        self.api.as_mut()
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn max_texture_size(&mut self) -> u32 {
        self.api.max_texture_size()
    }

    pub fn current_program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    pub fn current_material(&self) -> Option<MaterialId> {
        self.material
    }

    pub(crate) fn is_current_program(&self, program: &ShaderProgram) -> bool {
        self.program.as_ref() == Some(program)
    }

    pub(crate) fn is_draw_target(&self, texture: TextureHandle) -> bool {
        self.draw_target == Some(texture)
    }

    /// Makes `program` current. The current material is forgotten either way.
    pub fn set_program(&mut self, program: Option<&ShaderProgram>) {
        log::debug!("program -> {:?}", program.map(|p| p.label()));
        self.api.use_program(program.map(|p| p.handle()));
        self.program = program.cloned();
        self.material = None;
    }

    /// Pushes the material's parameters into the current program.
    ///
    /// Each of the four texture slots is bound (or unbound) and its `use_*`
    /// flag written, so nothing of a previous material survives.
    pub fn set_material(&mut self, material: &Material) -> Result<()> {
        if self.program.is_none() {
            return Err(RenderError::NoProgramBound);
        }
        self.apply_uniform(Uniform::DiffuseColor, material.diffuse_color)?;
        self.apply_uniform(
            Uniform::Specular,
            [material.specular, material.specular_exponent],
        )?;
        self.apply_uniform(Uniform::Transparency, material.transparency)?;
        for slot in MaterialSlot::ALL {
            let texture = material.texture(slot);
            self.set_texture(slot.texture_code().slot(), texture)?;
            self.apply_uniform(slot.flag(), texture.is_some() as i32)?;
        }
        self.material = Some(material.id());
        Ok(())
    }

    pub fn set_texture(&mut self, slot: u32, texture: Option<&Texture>) -> Result<()> {
        match texture {
            Some(texture) => self.set_texture_handle(slot, Some(texture.handle()), texture.dimension()),
            None => self.set_texture_handle(slot, None, TextureDimension::D2),
        }
    }

    /// Binds a texture of the given dimension to `slot`, `None` unbinds it.
    pub fn set_texture_handle(
        &mut self,
        slot: u32,
        texture: Option<TextureHandle>,
        dimension: TextureDimension,
    ) -> Result<()> {
        if let Some(texture) = texture {
            if dimension == TextureDimension::D3 && !self.capability.supports_volume_textures() {
                return Err(RenderError::NotSupported(
                    "3D textures need the enhanced capability level".to_string(),
                ));
            }
            if self.draw_target == Some(texture) {
                return Err(RenderError::InvalidArgument(format!(
                    "slot {slot}: the texture is the active render target"
                )));
            }
            self.slots.insert(slot, texture);
        } else {
            self.slots.remove(&slot);
        }
        self.api.bind_texture(slot, texture, dimension);
        Ok(())
    }

    /// Writes a uniform of the current program.
    ///
    /// A code the program queried but does not use is skipped. A code that
    /// was never queried is a programming error.
    pub fn set_uniform(&mut self, code: Uniform, value: impl Into<UniformValue>) -> Result<()> {
        let program = self.program.as_ref().ok_or(RenderError::NoProgramBound)?;
        match program.uniform_entry(code) {
            Location::Present(location) => self.api.write_uniform(location, &value.into()),
            Location::Absent => Ok(()),
            Location::Unqueried => Err(program.unregistered(code)),
        }
    }

    pub fn set_uniform_components(&mut self, code: Uniform, components: Components<'_>) -> Result<()> {
        self.set_uniform(code, components.to_value()?)
    }

    /// Like [`set_uniform`](Self::set_uniform) but skips codes the current
    /// program never registered. Used for inputs only some programs have.
    pub fn apply_uniform(&mut self, code: Uniform, value: impl Into<UniformValue>) -> Result<()> {
        let program = self.program.as_ref().ok_or(RenderError::NoProgramBound)?;
        match program.uniform_entry(code) {
            Location::Present(location) => self.api.write_uniform(location, &value.into()),
            Location::Absent | Location::Unqueried => Ok(()),
        }
    }

    /// Selects the draw destination. Exactly one entry is supported; `None`
    /// is the on-screen surface.
    ///
    /// Slots sampling the new target are unbound and the viewport is reset to
    /// the full target.
    pub fn set_render_targets(&mut self, targets: &[Option<&RenderTarget>]) -> Result<()> {
        let target = match targets {
            [] => {
                return Err(RenderError::InvalidArgument(
                    "at least one render target is required".to_string(),
                ));
            }
            [target] => *target,
            _ => {
                return Err(RenderError::NotSupported(format!(
                    "{} simultaneous render targets",
                    targets.len()
                )));
            }
        };

        let color = target.map(|target| target.texture());
        if let Some(color) = color {
            let sampling: Vec<u32> = self
                .slots
                .iter()
                .filter(|(_, texture)| **texture == color)
                .map(|(slot, _)| *slot)
                .collect();
            for slot in sampling {
                log::debug!("unbinding slot {slot}, it samples the new render target");
                self.slots.remove(&slot);
                self.api.bind_texture(slot, None, TextureDimension::D2);
            }
        }

        log::debug!("render target -> {:?}", target.map(|t| t.label()));
        self.api.bind_framebuffer(target.map(|t| t.framebuffer()));
        self.draw_target = color;
        let (width, height) = target.map(|t| t.size()).unwrap_or(self.size);
        self.set_viewport(Viewport::full(width, height));
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.api.viewport(viewport);
    }

    pub fn clear(&mut self, color: wgpu::Color, depth: Option<f32>) {
        self.api.clear(color, depth);
    }

    /// Draws an indexed mesh without per-instance data.
    pub fn draw_mesh(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32) -> Result<()> {
        self.api.bind_vertex_buffer(0, Some(vertices));
        self.api.bind_vertex_buffer(1, None);
        self.api.bind_index_buffer(Some(indices));
        self.api.draw_indexed(index_count)
    }

    /// Draws `count` instances of a mesh in one call. Needs hardware instancing.
    pub fn draw_mesh_instanced(
        &mut self,
        vertices: BufferHandle,
        instances: BufferHandle,
        indices: BufferHandle,
        index_count: u32,
        count: u32,
    ) -> Result<()> {
        if !self.capability.supports_instancing() {
            return Err(RenderError::NotSupported(
                "hardware instancing on the baseline capability level".to_string(),
            ));
        }
        self.api.bind_vertex_buffer(0, Some(vertices));
        self.api.bind_vertex_buffer(1, Some(instances));
        self.api.bind_index_buffer(Some(indices));
        self.api.draw_indexed_instanced(index_count, count)
    }

    pub fn create_buffer(&mut self, kind: BufferKind, label: &str, data: &[u8]) -> BufferHandle {
        self.api.create_buffer(kind, label, Bytes(data))
    }

    pub fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        self.api.write_buffer(buffer, Bytes(data));
    }

    pub fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.api.delete_buffer(buffer);
    }

    pub fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<TextureHandle> {
        self.api.create_texture(desc, data.map(Bytes))
    }

    pub fn delete_texture(&mut self, texture: TextureHandle) {
        self.slots.retain(|_, bound| *bound != texture);
        self.api.delete_texture(texture);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.api.resize(width, height);
        if self.draw_target.is_none() {
            self.set_viewport(Viewport::full(width, height));
        }
    }

    pub fn present(&mut self) -> Result<()> {
        self.api.present()
    }

    /// Reads back a render target, or the surface for `None`.
    pub fn read_pixels(&mut self, target: Option<&RenderTarget>) -> Result<image::RgbaImage> {
        self.api.read_pixels(target.map(|t| t.framebuffer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_repeats_value() {
        let value = Components::Broadcast {
            value: 0.5,
            count: 3,
        }
        .to_value()
        .unwrap();
        assert_eq!(value, UniformValue::Vec3([0.5; 3]));
    }

    #[test]
    fn broadcast_rejects_huge_counts() {
        for count in [0, 5, usize::MAX] {
            let result = Components::Broadcast { value: 1.0, count }.to_value();
            assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
        }
    }

    #[test]
    fn per_component_keeps_order() {
        let value = Components::PerComponent(&[1.0, 2.0]).to_value().unwrap();
        assert_eq!(value, UniformValue::Vec2([1.0, 2.0]));
        assert!(Components::PerComponent(&[]).to_value().is_err());
    }
}
