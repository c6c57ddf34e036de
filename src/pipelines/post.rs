//! Composite of the geometry and interface outputs onto the surface.

use crate::{
    backend::ProgramDesc,
    context::GraphicsDevice,
    data_structures::mesh,
    error::Result,
    pipelines::program::{Attribute, ShaderProgram, TextureCode, Uniform},
};

pub const LABEL: &str = "post";

/// What the post-process pass writes to the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostProcessStage {
    /// Interface over geometry.
    #[default]
    Composite = 0,
    GeometryOnly = 1,
    InterfaceOnly = 2,
}

pub fn mk_post_program(device: &mut GraphicsDevice) -> Result<ShaderProgram> {
    let program = ShaderProgram::new(
        device,
        include_str!("shaders/quad_vs.wgsl"),
        include_str!("shaders/post_fs.wgsl"),
        ProgramDesc {
            label: LABEL.to_string(),
            streams: mesh::streams(),
            blend: None,
        },
    )?;

    program.query_attribute_location(device, "position", Attribute::Position);
    program.query_attribute_location(device, "texcoord", Attribute::Texcoord);
    program.query_uniform_location(device, "background", Uniform::Background);
    program.query_uniform_location(device, "post_process_stage", Uniform::PostProcessStage);
    program.query_texture_location(device, "color", TextureCode::Color);
    program.query_texture_location(device, "interface", TextureCode::Interface);
    Ok(program)
}
