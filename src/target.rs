//! Offscreen render targets.

use crate::{
    backend::{
        ComponentType, FramebufferHandle, FramebufferStatus, PixelFormat, TextureDesc,
        TextureDimension, TextureHandle,
    },
    context::GraphicsDevice,
    error::{RenderError, Result},
};

/// A color texture attached to its own framebuffer.
///
/// Both are fixed at construction. A new resolution means a new target.
#[derive(Debug)]
pub struct RenderTarget {
    label: String,
    texture: TextureHandle,
    framebuffer: FramebufferHandle,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates the texture and framebuffer and checks completeness.
    ///
    /// An incomplete framebuffer releases both objects again before the
    /// status is returned.
    pub fn new(
        device: &mut GraphicsDevice,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        component: ComponentType,
    ) -> Result<Self> {
        let desc = TextureDesc {
            label: format!("{label} color"),
            width,
            height,
            depth: 1,
            dimension: TextureDimension::D2,
            format,
            component,
            srgb: false,
        };
        let api = device.api();
        let texture = api.create_texture(&desc, None)?;
        let framebuffer = api.create_framebuffer(label, texture);
        match api.framebuffer_status(framebuffer) {
            FramebufferStatus::Complete => {}
            status => {
                api.delete_framebuffer(framebuffer);
                api.delete_texture(texture);
                return Err(RenderError::FramebufferIncomplete {
                    label: label.to_string(),
                    status,
                });
            }
        }
        log::debug!("created render target '{label}' {width}x{height} {format:?}/{component:?}");

        Ok(Self {
            label: label.to_string(),
            texture,
            framebuffer,
            width,
            height,
        })
    }

    /// An 8-bit RGBA target, the format every pass of the pipeline uses.
    pub fn rgba(device: &mut GraphicsDevice, label: &str, width: u32, height: u32) -> Result<Self> {
        Self::new(
            device,
            label,
            width,
            height,
            PixelFormat::Rgba,
            ComponentType::UnsignedByte,
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub(crate) fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    pub fn bind_as_target(&self, device: &mut GraphicsDevice) -> Result<()> {
        device.set_render_targets(&[Some(self)])
    }

    pub fn bind_as_texture(&self, device: &mut GraphicsDevice, slot: u32) -> Result<()> {
        device.set_texture_handle(slot, Some(self.texture), TextureDimension::D2)
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        if device.is_draw_target(self.texture) {
            // Falls back to the surface, which always exists.
            if let Err(e) = device.set_render_targets(&[None]) {
                log::warn!("could not unbind '{}' before disposing it: {e}", self.label);
            }
        }
        let api = device.api();
        api.delete_framebuffer(self.framebuffer);
        device.delete_texture(self.texture);
    }
}
