//! The graphics API surface consumed by the render core.
//!
//! Everything the device does to the GPU goes through [`GraphicsApi`], an
//! immediate-mode binding API modelled after the classic bind-then-draw style:
//! programs, uniforms, texture units and framebuffers are bound as state and
//! draw calls consume whatever is currently bound.
//!
//! # Implementations
//!
//! - [`WgpuApi`] records the bound state into wgpu render passes (windowed or headless)
//! - [`RecordingApi`] is a headless journal used to observe the device in tests
//! - [`DebugApi`] wraps any implementation and logs every call and its result
//!
//! The trait and the logging decorator are generated from the single operation
//! table in this file, so a new operation cannot be forgotten by the decorator.

mod debug;
mod recording;
pub(crate) mod reflect;
mod gpu;

use std::fmt;

pub use debug::{API_LOG_TARGET, DebugApi};
pub use gpu::{SurfaceTarget, WgpuApi};
pub use recording::{ClearRecord, DrawRecord, Event, InstanceSample, Journal, RecordingApi};

use crate::error::{RenderError, Result};

/// Generates [`GraphicsApi`] from one operation table together with the
/// forwarding impls for boxed APIs and the logging [`DebugApi`].
macro_rules! graphics_api {
    ($(
        $(#[$meta:meta])*
        fn $name:ident(&mut self $(, $arg:ident : $ty:ty)* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Immediate-mode GPU binding API.
        pub trait GraphicsApi {
            $(
                $(#[$meta])*
                fn $name(&mut self $(, $arg: $ty)*) $(-> $ret)?;
            )*
        }

        impl<A: GraphicsApi + ?Sized> GraphicsApi for Box<A> {
            $(
                fn $name(&mut self $(, $arg: $ty)*) $(-> $ret)? {
                    (**self).$name($($arg),*)
                }
            )*
        }

        impl<A: GraphicsApi> GraphicsApi for DebugApi<A> {
            $(
                fn $name(&mut self $(, $arg: $ty)*) $(-> $ret)? {
                    log::debug!(
                        target: API_LOG_TARGET,
                        "{}{:?}",
                        stringify!($name),
                        ($(&$arg,)*)
                    );
                    let result = self.inner.$name($($arg),*);
                    log::trace!(target: API_LOG_TARGET, "{} -> {:?}", stringify!($name), &result);
                    result
                }
            )*
        }
    };
}

graphics_api! {
    /// The capability level resolved when the context was created.
    fn capability(&mut self) -> Capability;
    /// Size of the on-screen surface in pixels.
    fn surface_size(&mut self) -> (u32, u32);
    /// Largest supported edge length of a 2D texture.
    fn max_texture_size(&mut self) -> u32;

    /// Compiles one shader stage. Diagnostics are returned in the error.
    fn compile_shader(&mut self, stage: ShaderStage, label: &str, source: &str) -> Result<ShaderHandle>;
    fn delete_shader(&mut self, shader: ShaderHandle);
    /// Links two compiled stages into a program.
    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle, desc: &ProgramDesc) -> Result<ProgramHandle>;
    fn delete_program(&mut self, program: ProgramHandle);

    /// Resolves a vertex attribute by name.
    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32>;
    /// Resolves a member of the program's uniform block by name.
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    /// Resolves a texture/sampler pair by its base name.
    fn sampler_location(&mut self, program: ProgramHandle, name: &str) -> Option<SamplerLocation>;
    /// Makes the sampler at `location` read from texture unit `unit`.
    fn assign_sampler_unit(&mut self, program: ProgramHandle, location: SamplerLocation, unit: u32);

    fn use_program(&mut self, program: Option<ProgramHandle>);
    /// Writes into the uniform block of the program in use.
    fn write_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> Result<()>;

    fn create_buffer(&mut self, kind: BufferKind, label: &str, data: Bytes<'_>) -> BufferHandle;
    /// Replaces the whole content of a buffer, growing it when needed.
    fn write_buffer(&mut self, buffer: BufferHandle, data: Bytes<'_>);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_texture(&mut self, desc: &TextureDesc, data: Option<Bytes<'_>>) -> Result<TextureHandle>;
    fn delete_texture(&mut self, texture: TextureHandle);
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>, dimension: TextureDimension);

    fn create_framebuffer(&mut self, label: &str, color: TextureHandle) -> FramebufferHandle;
    fn framebuffer_status(&mut self, framebuffer: FramebufferHandle) -> FramebufferStatus;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    /// `None` selects the on-screen surface.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    fn viewport(&mut self, rect: Viewport);
    /// Clears the bound framebuffer. Color targets ignore the depth value.
    fn clear(&mut self, color: wgpu::Color, depth: Option<f32>);

    fn bind_vertex_buffer(&mut self, stream: u32, buffer: Option<BufferHandle>);
    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>);
    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;
    fn draw_indexed_instanced(&mut self, index_count: u32, instances: u32) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);
    /// Finishes the frame and shows the surface.
    fn present(&mut self) -> Result<()>;
    /// Reads back a framebuffer, or the surface for `None`.
    fn read_pixels(&mut self, framebuffer: Option<FramebufferHandle>) -> Result<image::RgbaImage>;
}

/// Capability level of the context, resolved once at creation.
///
/// `Baseline` has no hardware instancing and no 3D textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Enhanced,
    Baseline,
}

impl Capability {
    pub fn supports_instancing(self) -> bool {
        self == Capability::Enhanced
    }

    pub fn supports_volume_textures(self) -> bool {
        self == Capability::Enhanced
    }
}

macro_rules! handle {
    ($($name:ident),*) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub(crate) u32);
        )*
    };
}

handle!(
    ShaderHandle,
    ProgramHandle,
    BufferHandle,
    TextureHandle,
    FramebufferHandle
);

/// Raw bytes handed to the API. Debug-prints the length only.
#[derive(Clone, Copy)]
pub struct Bytes<'a>(pub &'a [u8]);

impl fmt::Debug for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.0.len())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

impl TryFrom<u32> for TextureDimension {
    type Error = RenderError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(TextureDimension::D1),
            2 => Ok(TextureDimension::D2),
            3 => Ok(TextureDimension::D3),
            other => Err(RenderError::InvalidArgument(format!(
                "texture dimension must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

/// Channel layout of a texture.
///
/// `Luminance` and `Depth` exist for completeness but are not color-renderable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba,
    Red,
    Luminance,
    Depth,
}

/// Storage type of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    UnsignedByte,
    HalfFloat,
    Float,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub dimension: TextureDimension,
    pub format: PixelFormat,
    pub component: ComponentType,
    pub srgb: bool,
}

impl TextureDesc {
    pub fn new_2d(label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            depth: 1,
            dimension: TextureDimension::D2,
            format: PixelFormat::Rgba,
            component: ComponentType::UnsignedByte,
            srgb: false,
        }
    }

    /// The wgpu format backing this description, if one exists.
    pub fn wgpu_format(&self) -> Option<wgpu::TextureFormat> {
        use wgpu::TextureFormat as F;
        Some(match (self.format, self.component) {
            (PixelFormat::Rgba, ComponentType::UnsignedByte) if self.srgb => F::Rgba8UnormSrgb,
            (PixelFormat::Rgba, ComponentType::UnsignedByte) => F::Rgba8Unorm,
            (PixelFormat::Rgba, ComponentType::HalfFloat) => F::Rgba16Float,
            (PixelFormat::Rgba, ComponentType::Float) => F::Rgba32Float,
            (PixelFormat::Red, ComponentType::UnsignedByte) => F::R8Unorm,
            (PixelFormat::Red, ComponentType::HalfFloat) => F::R16Float,
            (PixelFormat::Red, ComponentType::Float) => F::R32Float,
            (PixelFormat::Depth, ComponentType::Float) => F::Depth32Float,
            _ => return None,
        })
    }

    /// Bytes per texel of the upload data.
    pub fn texel_size(&self) -> Option<u32> {
        self.wgpu_format()
            .and_then(|format| format.block_copy_size(None))
    }

    /// Size in bytes of the full upload data, or an error when the format has no
    /// upload layout or the size does not fit in memory.
    pub fn byte_len(&self) -> Result<usize> {
        let texel = self.texel_size().ok_or_else(|| {
            RenderError::InvalidArgument(format!(
                "texture '{}' has no upload layout for {:?} {:?}",
                self.label, self.format, self.component
            ))
        })?;
        [self.width, self.height, self.depth]
            .into_iter()
            .try_fold(u64::from(texel), |len, extent| len.checked_mul(u64::from(extent)))
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| {
                RenderError::InvalidArgument(format!(
                    "texture '{}' of {}x{}x{} is too large",
                    self.label, self.width, self.height, self.depth
                ))
            })
    }

    /// Checks that `data` covers the texture exactly.
    pub(crate) fn check_upload(&self, data: &[u8]) -> Result<()> {
        let expected = self.byte_len()?;
        if expected != data.len() {
            return Err(RenderError::InvalidArgument(format!(
                "texture '{}' expects {expected} bytes, got {}",
                self.label,
                data.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn has_valid_extent(&self, max: u32) -> bool {
        let dims = match self.dimension {
            TextureDimension::D1 => [self.width, 1, 1],
            TextureDimension::D2 => [self.width, self.height, 1],
            TextureDimension::D3 => [self.width, self.height, self.depth],
        };
        dims.iter().all(|&d| d > 0 && d <= max)
    }
}

/// Completeness of a framebuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    /// The attachment's format/type combination is not color-renderable.
    IncompleteAttachment,
    /// Zero sized or larger than the device allows.
    IncompleteDimensions,
    /// Renderable in principle but not on this capability level.
    Unsupported,
}

/// Completeness rules shared by every backend.
pub(crate) fn framebuffer_status(
    desc: &TextureDesc,
    max_texture_size: u32,
    capability: Capability,
) -> FramebufferStatus {
    if !desc.has_valid_extent(max_texture_size) {
        return FramebufferStatus::IncompleteDimensions;
    }
    if desc.dimension != TextureDimension::D2 {
        return FramebufferStatus::IncompleteAttachment;
    }
    match (desc.format, desc.component) {
        (PixelFormat::Luminance | PixelFormat::Depth, _) => FramebufferStatus::IncompleteAttachment,
        // 32-bit float targets cannot be sampled with filtering by the next pass
        (_, ComponentType::Float) => FramebufferStatus::Unsupported,
        (_, ComponentType::HalfFloat) if capability == Capability::Baseline => {
            FramebufferStatus::Unsupported
        }
        _ => FramebufferStatus::Complete,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }
}

/// Type of one uniform block member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    Mat3,
    Mat4,
}

impl UniformKind {
    /// Size in the uniform block, including the column padding of `mat3x3`.
    pub fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
        }
    }
}

/// Location of a uniform: byte offset into the program's block plus its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Index of a texture/sampler pair within a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerLocation(pub u32);

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    Mat3([[f32; 3]; 3]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Builds a float value from 1 to 4 components.
    pub fn from_floats(values: &[f32]) -> Result<Self> {
        Ok(match *values {
            [x] => UniformValue::Float(x),
            [x, y] => UniformValue::Vec2([x, y]),
            [x, y, z] => UniformValue::Vec3([x, y, z]),
            [x, y, z, w] => UniformValue::Vec4([x, y, z, w]),
            _ => {
                return Err(RenderError::InvalidArgument(format!(
                    "uniform vectors have 1 to 4 components, got {}",
                    values.len()
                )));
            }
        })
    }

    /// Encodes the value with the uniform address space layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec2(v) => bytemuck::cast_slice(v).to_vec(),
            UniformValue::Vec3(v) => bytemuck::cast_slice(v).to_vec(),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v).to_vec(),
            UniformValue::Mat3(columns) => {
                let mut out = Vec::with_capacity(48);
                for column in columns {
                    out.extend_from_slice(bytemuck::cast_slice(column));
                    out.extend_from_slice(&[0u8; 4]);
                }
                out
            }
            UniformValue::Mat4(columns) => bytemuck::cast_slice(columns).to_vec(),
        }
    }

    /// Decodes a value of `location.kind` from a uniform block.
    pub(crate) fn read_from(location: UniformLocation, block: &[u8]) -> Option<Self> {
        let start = location.offset as usize;
        let bytes = block.get(start..start + location.kind.size())?;
        let floats = |count: usize| -> Vec<f32> {
            bytes
                .chunks_exact(4)
                .take(count)
                .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect()
        };
        Some(match location.kind {
            UniformKind::Int => {
                UniformValue::Int(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            UniformKind::Float | UniformKind::Vec2 | UniformKind::Vec3 | UniformKind::Vec4 => {
                let count = location.kind.size() / 4;
                UniformValue::from_floats(&floats(count)).ok()?
            }
            UniformKind::Mat3 => {
                let f = floats(12);
                UniformValue::Mat3([
                    [f[0], f[1], f[2]],
                    [f[4], f[5], f[6]],
                    [f[8], f[9], f[10]],
                ])
            }
            UniformKind::Mat4 => {
                let f = floats(16);
                let mut columns = [[0.0; 4]; 4];
                for (i, column) in columns.iter_mut().enumerate() {
                    column.copy_from_slice(&f[i * 4..i * 4 + 4]);
                }
                UniformValue::Mat4(columns)
            }
        })
    }

    pub(crate) fn write_into(&self, location: UniformLocation, block: &mut [u8]) -> Result<()> {
        if self.kind() != location.kind {
            return Err(RenderError::InvalidArgument(format!(
                "uniform at offset {} is a {:?}, got a {:?}",
                location.offset,
                location.kind,
                self.kind()
            )));
        }
        let start = location.offset as usize;
        let bytes = self.to_bytes();
        let end = start + bytes.len();
        match block.get_mut(start..end) {
            Some(dst) => {
                dst.copy_from_slice(&bytes);
                Ok(())
            }
            None => Err(RenderError::InvalidArgument(format!(
                "uniform range {start}..{end} exceeds the block of {} bytes",
                block.len()
            ))),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<cgmath::Matrix3<f32>> for UniformValue {
    fn from(value: cgmath::Matrix3<f32>) -> Self {
        UniformValue::Mat3(value.into())
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(value: cgmath::Matrix4<f32>) -> Self {
        UniformValue::Mat4(value.into())
    }
}

/// One attribute inside a vertex stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamAttribute {
    pub name: &'static str,
    pub offset: u64,
    pub format: wgpu::VertexFormat,
}

/// Memory layout of one vertex buffer slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexStream {
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: &'static [StreamAttribute],
}

impl VertexStream {
    pub fn attribute(&self, name: &str) -> Option<&StreamAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

/// Fixed-function state a program is linked with.
#[derive(Clone, Debug)]
pub struct ProgramDesc {
    pub label: String,
    /// Vertex buffer slots, indexed by stream number.
    pub streams: Vec<VertexStream>,
    pub blend: Option<wgpu::BlendState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat3_is_padded_per_column() {
        let value = UniformValue::Mat3([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let bytes = value.to_bytes();
        assert_eq!(bytes.len(), UniformKind::Mat3.size());
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]);
    }

    #[test]
    fn uniform_write_rejects_kind_mismatch() {
        let mut block = vec![0u8; 32];
        let location = UniformLocation {
            offset: 16,
            kind: UniformKind::Vec4,
        };
        assert!(UniformValue::Float(1.0).write_into(location, &mut block).is_err());
        UniformValue::Vec4([1.0; 4]).write_into(location, &mut block).unwrap();
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(&floats[4..], &[1.0; 4]);
    }

    #[test]
    fn from_floats_picks_vector_width() {
        assert_eq!(UniformValue::from_floats(&[1.0]).unwrap(), UniformValue::Float(1.0));
        assert_eq!(
            UniformValue::from_floats(&[1.0, 2.0, 3.0]).unwrap().kind(),
            UniformKind::Vec3
        );
        assert!(UniformValue::from_floats(&[]).is_err());
        assert!(UniformValue::from_floats(&[0.0; 5]).is_err());
    }

    #[test]
    fn framebuffer_rules() {
        let mut desc = TextureDesc::new_2d("t", 64, 64);
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Baseline),
            FramebufferStatus::Complete
        );
        desc.width = 0;
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Baseline),
            FramebufferStatus::IncompleteDimensions
        );
        desc.width = 4096;
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Enhanced),
            FramebufferStatus::IncompleteDimensions
        );
        desc.width = 64;
        desc.format = PixelFormat::Depth;
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Enhanced),
            FramebufferStatus::IncompleteAttachment
        );
        desc.format = PixelFormat::Rgba;
        desc.component = ComponentType::HalfFloat;
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Baseline),
            FramebufferStatus::Unsupported
        );
        assert_eq!(
            framebuffer_status(&desc, 2048, Capability::Enhanced),
            FramebufferStatus::Complete
        );
    }

    #[test]
    fn upload_size_does_not_overflow() {
        let mut desc = TextureDesc::new_2d("t", 16, 8);
        assert_eq!(desc.byte_len().unwrap(), 16 * 8 * 4);
        assert!(desc.check_upload(&[0; 16 * 8 * 4]).is_ok());
        assert!(matches!(desc.check_upload(&[0; 4]), Err(RenderError::InvalidArgument(_))));

        desc.width = u32::MAX;
        desc.height = u32::MAX;
        desc.depth = u32::MAX;
        assert!(matches!(desc.byte_len(), Err(RenderError::InvalidArgument(_))));
        assert!(matches!(desc.check_upload(&[0; 4]), Err(RenderError::InvalidArgument(_))));
    }

    #[test]
    fn dimension_from_number() {
        assert_eq!(TextureDimension::try_from(3).unwrap(), TextureDimension::D3);
        assert!(TextureDimension::try_from(0).is_err());
        assert!(TextureDimension::try_from(4).is_err());
    }
}
