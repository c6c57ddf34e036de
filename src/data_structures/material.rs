//! Materials: shared textures plus scalar surface parameters.

use std::{
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    data_structures::texture::Texture,
    pipelines::program::{TextureCode, Uniform},
};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

/// The four optional textures of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    Diffuse,
    Specular,
    Normal,
    Alpha,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 4] = [
        MaterialSlot::Diffuse,
        MaterialSlot::Specular,
        MaterialSlot::Normal,
        MaterialSlot::Alpha,
    ];

    pub fn texture_code(self) -> TextureCode {
        match self {
            MaterialSlot::Diffuse => TextureCode::Diffuse,
            MaterialSlot::Specular => TextureCode::Specular,
            MaterialSlot::Normal => TextureCode::Normal,
            MaterialSlot::Alpha => TextureCode::Alpha,
        }
    }

    /// The integer uniform telling the shader whether the slot is filled.
    pub fn flag(self) -> Uniform {
        match self {
            MaterialSlot::Diffuse => Uniform::UseDiffuseTexture,
            MaterialSlot::Specular => Uniform::UseSpecularTexture,
            MaterialSlot::Normal => Uniform::UseNormalTexture,
            MaterialSlot::Alpha => Uniform::UseAlphaTexture,
        }
    }
}

/// A named bundle of textures and shading parameters.
///
/// Every material gets a unique id; materials are deliberately not `Clone`.
#[derive(Debug)]
pub struct Material {
    id: MaterialId,
    pub name: String,
    pub diffuse_color: [f32; 4],
    pub specular: f32,
    pub specular_exponent: f32,
    /// 0 is opaque, 1 fully transparent.
    pub transparency: f32,
    textures: [Option<Rc<Texture>>; 4],
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            diffuse_color: [1.0; 4],
            specular: 0.0,
            specular_exponent: 1.0,
            transparency: 0.0,
            textures: Default::default(),
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn with_diffuse_color(mut self, color: [f32; 4]) -> Self {
        self.diffuse_color = color;
        self
    }

    pub fn with_specular(mut self, value: f32, exponent: f32) -> Self {
        self.specular = value;
        self.specular_exponent = exponent;
        self
    }

    pub fn with_transparency(mut self, transparency: f32) -> Self {
        self.transparency = transparency.clamp(0.0, 1.0);
        self
    }

    pub fn with_texture(mut self, slot: MaterialSlot, texture: Rc<Texture>) -> Self {
        self.set_texture(slot, Some(texture));
        self
    }

    pub fn set_texture(&mut self, slot: MaterialSlot, texture: Option<Rc<Texture>>) {
        self.textures[slot as usize] = texture;
    }

    pub fn texture(&self, slot: MaterialSlot) -> Option<&Texture> {
        self.textures[slot as usize].as_deref()
    }
}
