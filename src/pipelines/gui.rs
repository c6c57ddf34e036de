//! Program of the user interface pass.
//!
//! Positions are in pixels from the top left corner of the frame, which is why
//! the program needs `inverse_frame_size`. Output is premultiplied and blended
//! into a target cleared to zero alpha. The target keeps the cleared RGB scaled
//! by the uncovered share, which the composite subtracts again.

use crate::{
    backend::ProgramDesc,
    context::GraphicsDevice,
    data_structures::mesh,
    error::Result,
    pipelines::program::{Attribute, ShaderProgram, TextureCode, Uniform},
};

pub const LABEL: &str = "interface";

pub fn mk_gui_program(device: &mut GraphicsDevice) -> Result<ShaderProgram> {
    let program = ShaderProgram::new(
        device,
        include_str!("shaders/gui_vs.wgsl"),
        include_str!("shaders/gui_fs.wgsl"),
        ProgramDesc {
            label: LABEL.to_string(),
            streams: mesh::streams(),
            blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
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
        ("inverse_frame_size", Uniform::InverseFrameSize),
        ("object_position", Uniform::ObjectPosition),
        ("texcoord_offset", Uniform::TexcoordOffset),
        ("diffuse_color", Uniform::DiffuseColor),
        ("transparency", Uniform::Transparency),
        ("use_diffuse", Uniform::UseDiffuseTexture),
    ] {
        program.query_uniform_location(device, name, code);
    }
    program.query_texture_location(device, "diffuse", TextureCode::Diffuse);
    Ok(program)
}
