//! Instanced batches with a per-object fallback.
//!
//! A batch draws one mesh many times. With hardware instancing the instance
//! records live in one vertex buffer and a single instanced draw covers them
//! all. Without it every instance becomes its own [`RenderableObject`] and is
//! drawn separately. Both paths place instances identically.

use cgmath::{One, Zero};

use crate::{
    backend::{BufferHandle, BufferKind},
    context::GraphicsDevice,
    data_structures::{
        mesh::{InstanceRaw, Mesh, MeshDescriptor},
        object::{RenderableObject, apply_placement},
    },
    error::Result,
    render::{Pass, Renderable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstancingMode {
    Hardware,
    Emulated,
}

#[derive(Debug)]
enum BatchState {
    Hardware {
        mesh: Mesh,
        records: Vec<InstanceRaw>,
        buffer: Option<BufferHandle>,
        dirty: bool,
    },
    Emulated {
        clones: Vec<RenderableObject>,
    },
}

/// Append-only collection of instances of one mesh.
#[derive(Debug)]
pub struct InstancedBatch {
    descriptor: MeshDescriptor,
    state: BatchState,
}

impl InstancedBatch {
    /// Picks the instancing mode from the device capability. It never changes.
    pub fn new(device: &mut GraphicsDevice, descriptor: MeshDescriptor) -> Self {
        let state = if device.capability().supports_instancing() {
            BatchState::Hardware {
                mesh: Mesh::new(device, &descriptor),
                records: Vec::new(),
                buffer: None,
                dirty: false,
            }
        } else {
            log::debug!("batch '{}' emulates instancing", descriptor.label);
            BatchState::Emulated { clones: Vec::new() }
        };
        Self { descriptor, state }
    }

    pub fn mode(&self) -> InstancingMode {
        match self.state {
            BatchState::Hardware { .. } => InstancingMode::Hardware,
            BatchState::Emulated { .. } => InstancingMode::Emulated,
        }
    }

    pub fn len(&self) -> usize {
        match &self.state {
            BatchState::Hardware { records, .. } => records.len(),
            BatchState::Emulated { clones } => clones.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_instance(
        &mut self,
        device: &mut GraphicsDevice,
        position: cgmath::Vector3<f32>,
        texcoord: cgmath::Vector2<f32>,
    ) {
        match &mut self.state {
            BatchState::Hardware { records, dirty, .. } => {
                records.push(InstanceRaw {
                    position: position.into(),
                    texcoord: texcoord.into(),
                });
                *dirty = true;
            }
            BatchState::Emulated { clones } => {
                clones.push(RenderableObject::instance_of(
                    device,
                    &self.descriptor,
                    position,
                    texcoord,
                ));
            }
        }
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        match self.state {
            BatchState::Hardware { mesh, buffer, .. } => {
                mesh.dispose(device);
                if let Some(buffer) = buffer {
                    device.delete_buffer(buffer);
                }
            }
            BatchState::Emulated { clones } => {
                for clone in clones {
                    clone.dispose(device);
                }
            }
        }
    }
}

impl Renderable for InstancedBatch {
    fn passes(&self) -> Pass {
        self.descriptor.passes
    }

    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        if !pass.intersects(self.descriptor.passes) {
            return Ok(());
        }
        match &mut self.state {
            BatchState::Hardware {
                mesh,
                records,
                buffer,
                dirty,
            } => {
                if records.is_empty() {
                    return Ok(());
                }
                if *dirty {
                    let data: &[u8] = bytemuck::cast_slice(records);
                    match buffer {
                        Some(buffer) => device.write_buffer(*buffer, data),
                        None => {
                            *buffer = Some(device.create_buffer(
                                BufferKind::Vertex,
                                &format!("{} instances", self.descriptor.label),
                                data,
                            ));
                        }
                    }
                    *dirty = false;
                }
                let Some(instances) = *buffer else {
                    return Ok(());
                };
                // Instances carry the whole placement.
                apply_placement(
                    device,
                    cgmath::Vector3::zero(),
                    cgmath::Quaternion::one(),
                    cgmath::Vector2::zero(),
                )?;
                device.draw_mesh_instanced(
                    mesh.vertices,
                    instances,
                    mesh.indices,
                    mesh.index_count,
                    records.len() as u32,
                )
            }
            BatchState::Emulated { clones } => {
                for clone in clones.iter_mut() {
                    clone.render(device, pass)?;
                }
                Ok(())
            }
        }
    }
}
