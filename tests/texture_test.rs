use std::io::Cursor;

use multipass_ngin::{
    backend::{RecordingApi, UniformValue},
    config::RendererConfig,
    context::GraphicsDevice,
    data_structures::texture::Texture,
    pipelines::{geometry::mk_geometry_program, program::Uniform},
    render::{EmptyScene, Pass, Renderable},
    renderer::Renderer,
    Capability, Components, RenderError,
};

use crate::common::test_utils::{draws, draws_of, recording_device, square};

mod common;

fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn should_load_encoded_images() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let bytes = encoded_png(3, 2);

    let guessed = Texture::from_bytes(&mut device, &bytes, "guessed", None, false).unwrap();
    assert_eq!(guessed.size(), (3, 2));
    assert_eq!(guessed.label(), "guessed");

    let named = Texture::from_bytes(&mut device, &bytes, "named", Some("png"), true).unwrap();
    assert_eq!(named.size(), (3, 2));
    assert_eq!(journal.borrow().live_textures, 2);

    guessed.dispose(&mut device);
    named.dispose(&mut device);
    assert_eq!(journal.borrow().live_textures, 0);
}

#[test]
fn should_reject_undecodable_images() {
    let (mut device, journal) = recording_device(Capability::Enhanced);

    let garbage = [0u8, 1, 2, 3, 4, 5, 6, 7];
    assert!(Texture::from_bytes(&mut device, &garbage, "garbage", None, false).is_err());

    let bytes = encoded_png(2, 2);
    let err = Texture::from_bytes(&mut device, &bytes, "odd", Some("notaformat"), false).unwrap_err();
    assert!(err.to_string().contains("notaformat"));
    assert_eq!(journal.borrow().live_textures, 0);
}

#[test]
fn should_create_default_normal_map() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let normal = Texture::create_default_normal_map(&mut device, 4, 3).unwrap();
    assert_eq!(normal.label(), "default normal map");
    assert_eq!(normal.size(), (4, 3));
    assert_eq!(journal.borrow().live_textures, 1);
}

#[test]
fn should_refuse_normal_maps_too_large_to_address() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let result = Texture::create_default_normal_map(&mut device, u32::MAX, u32::MAX);
    assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
    assert_eq!(journal.borrow().live_textures, 0);
}

#[test]
fn should_write_vector_uniforms_from_components() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let program = mk_geometry_program(&mut device).unwrap();
    device.set_program(Some(&program));
    let mut object = square(&mut device, "tile", Pass::GEOMETRY);

    device
        .set_uniform_components(Uniform::DiffuseColor, Components::Broadcast { value: 0.25, count: 4 })
        .unwrap();
    object.render(&mut device, Pass::GEOMETRY).unwrap();

    device
        .set_uniform_components(Uniform::DiffuseColor, Components::PerComponent(&[1.0, 0.5, 0.0, 1.0]))
        .unwrap();
    object.render(&mut device, Pass::GEOMETRY).unwrap();

    let geometry = draws_of(&journal, "geometry");
    assert_eq!(geometry.len(), 2);
    assert_eq!(geometry[0].uniform("diffuse_color"), Some(UniformValue::Vec4([0.25; 4])));
    assert_eq!(
        geometry[1].uniform("diffuse_color"),
        Some(UniformValue::Vec4([1.0, 0.5, 0.0, 1.0]))
    );
}

#[test]
fn should_reject_components_of_the_wrong_arity() {
    let (mut device, _journal) = recording_device(Capability::Enhanced);
    let program = mk_geometry_program(&mut device).unwrap();
    device.set_program(Some(&program));

    let short = device.set_uniform_components(Uniform::DiffuseColor, Components::PerComponent(&[1.0, 0.0]));
    assert!(matches!(short, Err(RenderError::InvalidArgument(_))));
    let broadcast = device.set_uniform_components(Uniform::DiffuseColor, Components::Broadcast { value: 1.0, count: 3 });
    assert!(matches!(broadcast, Err(RenderError::InvalidArgument(_))));
    let empty = device.set_uniform_components(Uniform::DiffuseColor, Components::PerComponent(&[]));
    assert!(matches!(empty, Err(RenderError::InvalidArgument(_))));
}

#[test]
fn should_render_default_frame_at_window_size() {
    let api = RecordingApi::new(Capability::Enhanced, 640, 480);
    let journal = api.journal();
    let mut device = GraphicsDevice::from_api(api, false);
    let config = RendererConfig::default();
    let mut renderer = Renderer::new(&mut device, config).unwrap();
    renderer.render(&mut device, &mut EmptyScene).unwrap();

    let clears: Vec<_> = journal.borrow().clears().cloned().collect();
    assert_eq!(clears.len(), 3);
    assert_eq!(clears[0].target.as_deref(), Some("geometry target"));
    assert_eq!(clears[0].color, config.background);
    assert_eq!(clears[1].target.as_deref(), Some("interface target"));
    assert_eq!(clears[1].color.r, config.background.r);
    assert_eq!(clears[1].color.g, config.background.g);
    assert_eq!(clears[1].color.b, config.background.b);
    assert_eq!(clears[1].color.a, 0.0);
    assert_eq!(clears[2].target, None);

    let all = draws(&journal);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].program, "post");
    assert_eq!(all[0].viewport.width, 640.0);
    assert_eq!(all[0].viewport.height, 480.0);
    assert_eq!(journal.borrow().presents(), 1);
}
