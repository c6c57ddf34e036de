//! Copies one render target into another.

use crate::{
    backend::ProgramDesc,
    context::GraphicsDevice,
    data_structures::mesh,
    error::Result,
    pipelines::program::{Attribute, ShaderProgram, TextureCode},
};

pub const LABEL: &str = "copy";

pub fn mk_copy_program(device: &mut GraphicsDevice) -> Result<ShaderProgram> {
    let program = ShaderProgram::new(
        device,
        include_str!("shaders/quad_vs.wgsl"),
        include_str!("shaders/copy_fs.wgsl"),
        ProgramDesc {
            label: LABEL.to_string(),
            streams: mesh::streams(),
            blend: None,
        },
    )?;

    program.query_attribute_location(device, "position", Attribute::Position);
    program.query_attribute_location(device, "texcoord", Attribute::Texcoord);
    program.query_texture_location(device, "color", TextureCode::Color);
    Ok(program)
}
