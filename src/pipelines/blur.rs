//! One direction of the separable gaussian blur.

use crate::{
    backend::ProgramDesc,
    context::GraphicsDevice,
    data_structures::mesh,
    error::Result,
    pipelines::program::{Attribute, ShaderProgram, TextureCode, Uniform},
};

pub const LABEL: &str = "blur";

/// Weights of the center tap and the four taps on each side.
pub const WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

pub fn mk_blur_program(device: &mut GraphicsDevice) -> Result<ShaderProgram> {
    let program = ShaderProgram::new(
        device,
        include_str!("shaders/quad_vs.wgsl"),
        include_str!("shaders/blur_fs.wgsl"),
        ProgramDesc {
            label: LABEL.to_string(),
            streams: mesh::streams(),
            blend: None,
        },
    )?;

    program.query_attribute_location(device, "position", Attribute::Position);
    program.query_attribute_location(device, "texcoord", Attribute::Texcoord);
    program.query_uniform_location(device, "pixel_offset", Uniform::PixelOffset);
    program.query_uniform_location(device, "inverse_frame_size", Uniform::InverseFrameSize);
    program.query_texture_location(device, "color", TextureCode::Color);
    Ok(program)
}
