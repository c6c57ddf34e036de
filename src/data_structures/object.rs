//! The base unit of geometry.

use cgmath::{One, Zero};

use crate::{
    context::GraphicsDevice,
    data_structures::mesh::{Mesh, MeshDescriptor},
    error::Result,
    pipelines::program::Uniform,
    render::{Pass, Renderable},
};

/// A mesh with its own buffers and a mutable placement.
///
/// The object does not know its material; the [`World`](super::world::World)
/// groups objects under materials.
#[derive(Debug)]
pub struct RenderableObject {
    label: String,
    mesh: Mesh,
    passes: Pass,
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub texcoord_offset: cgmath::Vector2<f32>,
}

impl RenderableObject {
    pub fn new(device: &mut GraphicsDevice, descriptor: &MeshDescriptor) -> Self {
        Self {
            label: descriptor.label.clone(),
            mesh: Mesh::new(device, descriptor),
            passes: descriptor.passes,
            position: cgmath::Vector3::zero(),
            rotation: cgmath::Quaternion::one(),
            texcoord_offset: cgmath::Vector2::zero(),
        }
    }

    /// A fresh object placed at `position` with its texture shifted by `texcoord`.
    pub fn instance_of(
        device: &mut GraphicsDevice,
        descriptor: &MeshDescriptor,
        position: cgmath::Vector3<f32>,
        texcoord: cgmath::Vector2<f32>,
    ) -> Self {
        let mut object = Self::new(device, descriptor);
        object.position = position;
        object.texcoord_offset = texcoord;
        object
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: cgmath::Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_passes(&mut self, passes: Pass) {
        self.passes = passes;
    }

    pub fn index_count(&self) -> u32 {
        self.mesh.index_count
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        self.mesh.dispose(device);
    }
}

/// Writes the per-object uniforms of the current program.
pub(crate) fn apply_placement(
    device: &mut GraphicsDevice,
    position: cgmath::Vector3<f32>,
    rotation: cgmath::Quaternion<f32>,
    texcoord_offset: cgmath::Vector2<f32>,
) -> Result<()> {
    let position: [f32; 3] = position.into();
    device.apply_uniform(Uniform::ObjectPosition, position)?;
    device.apply_uniform(
        Uniform::ObjectRotation,
        [rotation.v.x, rotation.v.y, rotation.v.z, rotation.s],
    )?;
    let texcoord_offset: [f32; 2] = texcoord_offset.into();
    device.apply_uniform(Uniform::TexcoordOffset, texcoord_offset)
}

impl Renderable for RenderableObject {
    fn passes(&self) -> Pass {
        self.passes
    }

    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        if !pass.intersects(self.passes) {
            return Ok(());
        }
        apply_placement(device, self.position, self.rotation, self.texcoord_offset)?;
        device.draw_mesh(self.mesh.vertices, self.mesh.indices, self.mesh.index_count)
    }
}
