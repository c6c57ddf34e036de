//! Sampled textures and texture creation utilities.
//!
//! This module provides [`Texture`], a device texture together with the
//! description it was created from, and helpers for loading image data,
//! creating volume textures and the neutral default normal map.

use anyhow::{Context as _, anyhow};
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

use crate::{
    backend::{ComponentType, PixelFormat, TextureDesc, TextureDimension, TextureHandle},
    context::GraphicsDevice,
    error::{RenderError, Result},
};

/// A texture living on the graphics device.
///
/// Materials share textures through `Rc`; the texture is released with
/// [`dispose`](Self::dispose) once the last user is gone.
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    desc: TextureDesc,
}

impl Texture {
    /// Load a texture from encoded image data (PNG, JPEG, ...).
    ///
    /// # Arguments
    ///
    /// * `bytes` are the raw file contents
    /// * `label` is used as a debug name for the device resource
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    /// * `is_normal_map` toggles between sRGB (false) and linear (true) color space
    pub fn from_bytes(
        device: &mut GraphicsDevice,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> anyhow::Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(ext) => {
                let format = ImageFormat::from_extension(ext)
                    .ok_or_else(|| anyhow!("unknown image format '{ext}' for '{label}'"))?;
                load_from_memory_with_format(bytes, format)?
            }
        };
        Self::from_image(device, &img, label, is_normal_map)
    }

    pub fn from_image(
        device: &mut GraphicsDevice,
        img: &image::DynamicImage,
        label: &str,
        is_normal_map: bool,
    ) -> anyhow::Result<Self> {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        Self::from_rgba(device, label, width, height, &rgba, !is_normal_map)
            .with_context(|| format!("uploading image '{label}'"))
    }

    /// A 2D texture from tightly packed RGBA8 rows.
    pub fn from_rgba(
        device: &mut GraphicsDevice,
        label: &str,
        width: u32,
        height: u32,
        data: &[u8],
        srgb: bool,
    ) -> Result<Self> {
        let desc = TextureDesc {
            srgb,
            ..TextureDesc::new_2d(label, width, height)
        };
        let handle = device.create_texture(&desc, Some(data))?;
        Ok(Self { handle, desc })
    }

    /// A 3D texture. Only available on the enhanced capability level.
    pub fn create_volume(
        device: &mut GraphicsDevice,
        label: &str,
        size: [u32; 3],
        format: PixelFormat,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        if !device.capability().supports_volume_textures() {
            return Err(RenderError::NotSupported(format!(
                "volume texture '{label}' needs the enhanced capability level"
            )));
        }
        let desc = TextureDesc {
            label: label.to_string(),
            width: size[0],
            height: size[1],
            depth: size[2],
            dimension: TextureDimension::D3,
            format,
            component: ComponentType::UnsignedByte,
            srgb: false,
        };
        let handle = device.create_texture(&desc, data)?;
        Ok(Self { handle, desc })
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    ///
    /// Useful where a material must carry a normal texture but the asset has none.
    pub fn create_default_normal_map(device: &mut GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        // The blue/purple-ish colour that represents the default for normal maps
        let len = TextureDesc::new_2d("default normal map", width, height).byte_len()?;
        let data: Vec<u8> = [127, 127, 255, 255].iter().cycle().take(len).copied().collect();
        Self::from_rgba(device, "default normal map", width, height, &data, false)
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn dimension(&self) -> TextureDimension {
        self.desc.dimension
    }

    pub fn label(&self) -> &str {
        &self.desc.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        device.delete_texture(self.handle);
    }
}
