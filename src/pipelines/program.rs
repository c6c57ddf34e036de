//! Linked shader programs and their cached location tables.
//!
//! Inputs are addressed by small integer codes ([`Attribute`], [`Uniform`],
//! [`TextureCode`]) instead of names. A program variant resolves each name it
//! declares exactly once, right after linking, and the result is stored at the
//! code's index. Draw-time code only ever reads the tables.
//!
//! # Key types
//! - [`ShaderProgram`]: a cheap-to-clone handle on one linked program
//! - [`Location`]: the three states a table entry can be in

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    backend::{ProgramDesc, ProgramHandle, SamplerLocation, ShaderStage, UniformLocation},
    context::GraphicsDevice,
    error::{RenderError, Result},
};

/// A fixed, enumerated program input.
pub trait Code: Copy + fmt::Debug {
    /// Table name used in diagnostics.
    const KIND: &'static str;

    fn index(self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Texcoord,
    InstancePosition,
    InstanceTexcoord,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Uniform {
    InverseFrameSize,
    ViewProjection,
    ObjectRotation,
    ObjectPosition,
    TexcoordOffset,
    DiffuseColor,
    Specular,
    Transparency,
    UseDiffuseTexture,
    UseSpecularTexture,
    UseNormalTexture,
    UseAlphaTexture,
    PixelOffset,
    PostProcessStage,
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureCode {
    Color,
    Interface,
    Diffuse,
    Specular,
    Normal,
    Alpha,
}

impl TextureCode {
    /// The texture unit this input always samples from.
    pub fn slot(self) -> u32 {
        match self {
            TextureCode::Color | TextureCode::Diffuse => 0,
            TextureCode::Interface | TextureCode::Specular => 1,
            TextureCode::Normal => 2,
            TextureCode::Alpha => 3,
        }
    }
}

impl Code for Attribute {
    const KIND: &'static str = "attribute";

    fn index(self) -> usize {
        self as usize
    }
}

impl Code for Uniform {
    const KIND: &'static str = "uniform";

    fn index(self) -> usize {
        self as usize
    }
}

impl Code for TextureCode {
    const KIND: &'static str = "texture";

    fn index(self) -> usize {
        self as usize
    }
}

/// One entry of a location table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Location<T> {
    /// The code was never queried on this program.
    #[default]
    Unqueried,
    /// Queried, but the program does not use the input.
    Absent,
    Present(T),
}

impl<T: Copy> Location<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Location::Present(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Table<T>(RefCell<Vec<Location<T>>>);

impl<T: Copy> Table<T> {
    fn new() -> Self {
        Self(RefCell::new(Vec::new()))
    }

    fn get(&self, index: usize) -> Location<T> {
        self.0.borrow().get(index).copied().unwrap_or_default()
    }

    /// Returns the cached entry or stores the result of `resolve`.
    fn resolve_once(&self, index: usize, resolve: impl FnOnce() -> Option<T>) -> Location<T> {
        match self.get(index) {
            Location::Unqueried => {}
            cached => return cached,
        }
        let entry = match resolve() {
            Some(value) => Location::Present(value),
            None => Location::Absent,
        };
        let mut table = self.0.borrow_mut();
        if table.len() <= index {
            table.resize(index + 1, Location::Unqueried);
        }
        table[index] = entry;
        entry
    }
}

#[derive(Debug)]
struct ProgramInner {
    label: String,
    handle: ProgramHandle,
    attributes: Table<u32>,
    uniforms: Table<UniformLocation>,
    textures: Table<SamplerLocation>,
}

/// A linked vertex/fragment program.
///
/// Clones share the program and its tables.
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    inner: Rc<ProgramInner>,
}

impl PartialEq for ShaderProgram {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ShaderProgram {
    /// Compiles both stages and links them.
    ///
    /// The stage objects are released again once the program exists or
    /// construction failed.
    pub fn new(
        device: &mut GraphicsDevice,
        vertex_source: &str,
        fragment_source: &str,
        desc: ProgramDesc,
    ) -> Result<Self> {
        let api = device.api();
        let vertex = api.compile_shader(
            ShaderStage::Vertex,
            &format!("{} vertex", desc.label),
            vertex_source,
        )?;
        let fragment = match api.compile_shader(
            ShaderStage::Fragment,
            &format!("{} fragment", desc.label),
            fragment_source,
        ) {
            Ok(fragment) => fragment,
            Err(e) => {
                api.delete_shader(vertex);
                return Err(e);
            }
        };
        let linked = api.link_program(vertex, fragment, &desc);
        api.delete_shader(vertex);
        api.delete_shader(fragment);
        let handle = linked?;
        log::debug!("linked program '{}'", desc.label);

        Ok(Self {
            inner: Rc::new(ProgramInner {
                label: desc.label,
                handle,
                attributes: Table::new(),
                uniforms: Table::new(),
                textures: Table::new(),
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub(crate) fn handle(&self) -> ProgramHandle {
        self.inner.handle
    }

    pub fn query_attribute_location(
        &self,
        device: &mut GraphicsDevice,
        name: &str,
        code: Attribute,
    ) -> Option<u32> {
        let handle = self.inner.handle;
        self.inner
            .attributes
            .resolve_once(code.index(), || device.api().attribute_location(handle, name))
            .present()
    }

    pub fn query_uniform_location(
        &self,
        device: &mut GraphicsDevice,
        name: &str,
        code: Uniform,
    ) -> Option<UniformLocation> {
        let handle = self.inner.handle;
        self.inner
            .uniforms
            .resolve_once(code.index(), || device.api().uniform_location(handle, name))
            .present()
    }

    /// Resolves a texture input and points its sampler at the code's fixed slot.
    pub fn query_texture_location(
        &self,
        device: &mut GraphicsDevice,
        name: &str,
        code: TextureCode,
    ) -> Option<SamplerLocation> {
        let handle = self.inner.handle;
        self.inner
            .textures
            .resolve_once(code.index(), || {
                let api = device.api();
                let location = api.sampler_location(handle, name)?;
                api.assign_sampler_unit(handle, location, code.slot());
                Some(location)
            })
            .present()
    }

    pub fn attribute_location(&self, code: Attribute) -> Option<u32> {
        self.inner.attributes.get(code.index()).present()
    }

    pub fn uniform_location(&self, code: Uniform) -> Option<UniformLocation> {
        self.inner.uniforms.get(code.index()).present()
    }

    pub fn texture_location(&self, code: TextureCode) -> Option<SamplerLocation> {
        self.inner.textures.get(code.index()).present()
    }

    /// The uniform table entry including whether the code was ever queried.
    pub fn uniform_entry(&self, code: Uniform) -> Location<UniformLocation> {
        self.inner.uniforms.get(code.index())
    }

    pub(crate) fn unregistered<C: Code>(&self, code: C) -> RenderError {
        RenderError::UnregisteredCode {
            kind: C::KIND,
            code: code.index(),
            program: self.inner.label.clone(),
        }
    }

    pub fn dispose(&self, device: &mut GraphicsDevice) {
        if device.is_current_program(self) {
            device.set_program(None);
        }
        device.api().delete_program(self.inner.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_grows_to_highest_code() {
        let table = Table::<u32>::new();
        assert_eq!(table.get(Uniform::PostProcessStage.index()), Location::Unqueried);
        table.resolve_once(Uniform::PixelOffset.index(), || Some(7));
        assert_eq!(table.0.borrow().len(), Uniform::PixelOffset.index() + 1);
        assert_eq!(table.get(0), Location::Unqueried);
        assert_eq!(table.get(Uniform::PixelOffset.index()), Location::Present(7));
    }

    #[test]
    fn resolution_happens_once() {
        let table = Table::<u32>::new();
        let mut calls = 0;
        for _ in 0..3 {
            table.resolve_once(2, || {
                calls += 1;
                None
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(table.get(2), Location::Absent);
    }

    #[test]
    fn material_slots_are_distinct() {
        let slots: Vec<u32> = [
            TextureCode::Diffuse,
            TextureCode::Specular,
            TextureCode::Normal,
            TextureCode::Alpha,
        ]
        .iter()
        .map(|code| code.slot())
        .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        assert_ne!(TextureCode::Color.slot(), TextureCode::Interface.slot());
    }
}
