//! multipass-ngin
//!
//! A small multi-pass render pipeline on top of wgpu for native and WASM
//! targets. Scenes are drawn in a geometry pass and an interface pass into
//! offscreen targets, optionally blurred, and composited onto the surface.
//! Objects are grouped by material, instanced where the device allows it and
//! drawn object by object where it does not.
//!
//! High-level modules
//! - `backend`: the immediate-mode graphics API and its wgpu, recording and logging implementations
//! - `context`: the graphics device that tracks bound state on top of the API
//! - `pipelines`: shader programs with cached input locations
//! - `target`: offscreen render targets
//! - `data_structures`: textures, materials, meshes, objects, batches and the world
//! - `render`: pass masks and the `Renderable` / `Scene` traits
//! - `renderer`: the fixed frame pipeline and the Gaussian blur
//! - `flow`: frame pacing and the application event loop
//! - `config`, `error`: configuration values and the error taxonomy
//!

pub mod backend;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod target;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::{Capability, SurfaceTarget};
pub use config::{BlurConfig, DeviceConfig, RendererConfig};
pub use context::{Components, GraphicsDevice, create_context};
pub use data_structures::{
    instance::{InstancedBatch, InstancingMode},
    material::{Material, MaterialId, MaterialSlot},
    mesh::MeshDescriptor,
    object::RenderableObject,
    texture::Texture,
    world::{ItemHandle, World, WorldItem},
};
pub use error::{RenderError, Result};
pub use flow::{AppFlow, FrameRate, FrameTimer};
pub use render::{Pass, Renderable, Scene};
pub use renderer::{BlurRenderer, GaussianBlur, NoHooks, RenderHooks, Renderer};
pub use target::RenderTarget;

pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;
