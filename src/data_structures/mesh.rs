//! Vertex formats and GPU meshes.
//!
//! Every program reads the same two streams: per-vertex data in slot 0 and
//! per-instance data in slot 1. Programs that do not declare the instance
//! attributes simply ignore slot 1.

use crate::{
    backend::{BufferHandle, BufferKind, StreamAttribute, VertexStream},
    context::GraphicsDevice,
    render::Pass,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl Vertex {
    pub const STREAM: VertexStream = VertexStream {
        stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            StreamAttribute {
                name: "position",
                offset: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            StreamAttribute {
                name: "texcoord",
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// One record of the per-instance stream.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl InstanceRaw {
    pub const STREAM: VertexStream = VertexStream {
        stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
        // Advance once per instance rather than per vertex.
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            StreamAttribute {
                name: "instance_position",
                offset: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            StreamAttribute {
                name: "instance_texcoord",
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// The two streams in slot order.
pub fn streams() -> Vec<VertexStream> {
    vec![Vertex::STREAM, InstanceRaw::STREAM]
}

/// Geometry plus the passes it is drawn in, before anything lives on the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshDescriptor {
    pub label: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub passes: Pass,
}

impl MeshDescriptor {
    /// A quad covering the whole viewport in clip space.
    pub fn fullscreen_quad(label: &str, passes: Pass) -> Self {
        Self::quad(label, [-1.0, -1.0], [1.0, 1.0], passes)
    }

    /// An axis-aligned `width` x `height` rectangle with its corner at the origin.
    pub fn rect(label: &str, width: f32, height: f32, passes: Pass) -> Self {
        Self::quad(label, [0.0, 0.0], [width, height], passes)
    }

    /// Texture v grows downwards while y grows upwards.
    fn quad(label: &str, min: [f32; 2], max: [f32; 2], passes: Pass) -> Self {
        let vertices = vec![
            Vertex {
                position: [min[0], min[1], 0.0],
                texcoord: [0.0, 1.0],
            },
            Vertex {
                position: [max[0], min[1], 0.0],
                texcoord: [1.0, 1.0],
            },
            Vertex {
                position: [max[0], max[1], 0.0],
                texcoord: [1.0, 0.0],
            },
            Vertex {
                position: [min[0], max[1], 0.0],
                texcoord: [0.0, 0.0],
            },
        ];
        Self {
            label: label.to_string(),
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
            passes,
        }
    }

    pub fn triangles(&self) -> u32 {
        self.indices.len() as u32 / 3
    }
}

/// Vertex and index buffers of one mesh.
#[derive(Debug)]
pub struct Mesh {
    pub vertices: BufferHandle,
    pub indices: BufferHandle,
    pub index_count: u32,
}

impl Mesh {
    pub fn new(device: &mut GraphicsDevice, descriptor: &MeshDescriptor) -> Self {
        let vertices = device.create_buffer(
            BufferKind::Vertex,
            &descriptor.label,
            bytemuck::cast_slice(&descriptor.vertices),
        );
        let indices = device.create_buffer(
            BufferKind::Index,
            &format!("{} indices", descriptor.label),
            bytemuck::cast_slice(&descriptor.indices),
        );
        Self {
            vertices,
            indices,
            index_count: descriptor.indices.len() as u32,
        }
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        device.delete_buffer(self.vertices);
        device.delete_buffer(self.indices);
    }
}
