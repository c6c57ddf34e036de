//! Program of the geometry pass: world-space meshes under a material.

use crate::{
    backend::ProgramDesc,
    context::GraphicsDevice,
    data_structures::mesh,
    error::Result,
    pipelines::program::{Attribute, ShaderProgram, TextureCode, Uniform},
};

pub const LABEL: &str = "geometry";

pub fn mk_geometry_program(device: &mut GraphicsDevice) -> Result<ShaderProgram> {
    let program = ShaderProgram::new(
        device,
        include_str!("shaders/geometry_vs.wgsl"),
        include_str!("shaders/geometry_fs.wgsl"),
        ProgramDesc {
            label: LABEL.to_string(),
            streams: mesh::streams(),
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        },
    )?;

    for (name, code) in [
        ("position", Attribute::Position),
        ("texcoord", Attribute::Texcoord),
        ("instance_position", Attribute::InstancePosition),
        ("instance_texcoord", Attribute::InstanceTexcoord),
    ] {
        program.query_attribute_location(device, name, code);
    }
    for (name, code) in [
        ("view_projection", Uniform::ViewProjection),
        ("object_rotation", Uniform::ObjectRotation),
        ("object_position", Uniform::ObjectPosition),
        ("texcoord_offset", Uniform::TexcoordOffset),
        ("diffuse_color", Uniform::DiffuseColor),
        ("specular", Uniform::Specular),
        ("transparency", Uniform::Transparency),
        ("use_diffuse", Uniform::UseDiffuseTexture),
        ("use_specular", Uniform::UseSpecularTexture),
        ("use_normal", Uniform::UseNormalTexture),
        ("use_alpha", Uniform::UseAlphaTexture),
    ] {
        program.query_uniform_location(device, name, code);
    }
    for (name, code) in [
        ("diffuse", TextureCode::Diffuse),
        ("specular", TextureCode::Specular),
        ("normal", TextureCode::Normal),
        ("alpha", TextureCode::Alpha),
    ] {
        program.query_texture_location(device, name, code);
    }
    Ok(program)
}
