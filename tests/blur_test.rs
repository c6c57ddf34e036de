use instant::Duration;
use multipass_ngin::{
    backend::UniformValue,
    config::{BlurConfig, RendererConfig},
    data_structures::{material::Material, world::World},
    render::Pass,
    renderer::{BLUR_EPSILON, BlurRenderer, RenderHooks, Renderer},
    Capability,
};

use crate::common::test_utils::{assert_close, draws, event_outline, recording_device, square};

mod common;

fn scene(device: &mut multipass_ngin::GraphicsDevice) -> World {
    let mut world = World::new();
    let material = world.add_material(Material::new("plain"));
    let object = square(device, "object", Pass::GEOMETRY | Pass::USER_INTERFACE);
    world.add(material, object).unwrap();
    world
}

#[test]
fn should_match_the_plain_renderer_without_strength() {
    let (mut plain_device, plain_journal) = recording_device(Capability::Enhanced);
    let mut plain = Renderer::new(&mut plain_device, RendererConfig::default()).unwrap();
    let mut plain_world = scene(&mut plain_device);

    let (mut blur_device, blur_journal) = recording_device(Capability::Enhanced);
    let config = RendererConfig::default().with_blur(BlurConfig::default().with_strength(0.0));
    let mut blurred = BlurRenderer::blurred(&mut blur_device, config).unwrap();
    let mut blur_world = scene(&mut blur_device);

    plain_journal.borrow_mut().reset();
    blur_journal.borrow_mut().reset();
    plain.render(&mut plain_device, &mut plain_world).unwrap();
    blurred.render(&mut blur_device, &mut blur_world).unwrap();

    assert!(!blurred.hooks().is_active());
    assert_eq!(event_outline(&plain_journal), event_outline(&blur_journal));
}

#[test]
fn should_ping_pong_then_copy_back() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let config = RendererConfig::default().with_blur(BlurConfig::default().with_strength(2.0).with_passes(2));
    let mut renderer = BlurRenderer::blurred(&mut device, config).unwrap();
    let mut world = scene(&mut device);

    journal.borrow_mut().reset();
    renderer.render(&mut device, &mut world).unwrap();

    let draws = draws(&journal);
    let steps: Vec<(String, String, String)> = draws
        .iter()
        .filter(|d| d.program == "blur" || d.program == "copy")
        .map(|d| {
            (
                d.program.clone(),
                d.textures.get("color").cloned().unwrap_or_default(),
                d.target.clone().unwrap_or_default(),
            )
        })
        .collect();
    let step = |p: &str, from: &str, to: &str| (p.to_string(), from.to_string(), to.to_string());
    assert_eq!(
        steps,
        vec![
            step("blur", "geometry target color", "blur target A"),
            step("blur", "blur target A color", "blur target B"),
            step("blur", "blur target B color", "blur target A"),
            step("blur", "blur target A color", "blur target B"),
            step("copy", "blur target B color", "geometry target"),
        ]
    );

    let blurs: Vec<_> = draws.iter().filter(|d| d.program == "blur").collect();
    assert_eq!(blurs[0].uniform("pixel_offset"), Some(UniformValue::Vec2([2.0, 0.0])));
    assert_eq!(blurs[1].uniform("pixel_offset"), Some(UniformValue::Vec2([0.0, 2.0])));
    assert_eq!(
        blurs[0].uniform("inverse_frame_size"),
        Some(UniformValue::Vec2([1.0 / 64.0, 1.0 / 48.0]))
    );

    // The blur sits between the scene and the interface pass.
    let order: Vec<&str> = draws.iter().map(|d| d.program.as_str()).collect();
    assert_eq!(
        order,
        vec!["geometry", "blur", "blur", "blur", "blur", "copy", "interface", "post"]
    );
}

#[test]
fn should_decay_strength_over_time() {
    let (mut device, _journal) = recording_device(Capability::Enhanced);
    let blur = BlurConfig::default()
        .with_strength(4.0)
        .with_decay_per_second(0.5);
    let mut renderer =
        BlurRenderer::blurred(&mut device, RendererConfig::default().with_blur(blur)).unwrap();

    renderer.advance(Duration::from_secs(1));
    assert_close(renderer.hooks().strength(), 2.0);
    renderer.advance(Duration::from_millis(2000));
    assert_close(renderer.hooks().strength(), 0.5);

    renderer.advance(Duration::from_secs(60));
    assert_eq!(renderer.hooks().strength(), 0.0);
    assert!(renderer.hooks().strength() <= BLUR_EPSILON);
    assert!(!renderer.hooks().is_active());
}

#[test]
fn should_keep_strength_without_decay() {
    let (mut device, _journal) = recording_device(Capability::Baseline);
    let mut renderer = BlurRenderer::blurred(
        &mut device,
        RendererConfig::default().with_blur(BlurConfig::default().with_strength(1.5)),
    )
    .unwrap();
    renderer.hooks_mut().advance(Duration::from_secs(10));
    assert_close(renderer.hooks().strength(), 1.5);
}

#[test]
fn should_resize_blur_targets_with_the_renderer() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let config = RendererConfig::default().with_blur(BlurConfig::default().with_strength(1.0).with_passes(1));
    let mut renderer = BlurRenderer::blurred(&mut device, config).unwrap();
    let textures = journal.borrow().live_textures;
    renderer.resize(&mut device, 32, 32).unwrap();
    assert_eq!(journal.borrow().live_textures, textures);

    journal.borrow_mut().reset();
    renderer.render(&mut device, &mut World::new()).unwrap();
    let blur = draws(&journal).into_iter().find(|d| d.program == "blur").unwrap();
    assert_eq!(
        blur.uniform("inverse_frame_size"),
        Some(UniformValue::Vec2([1.0 / 32.0, 1.0 / 32.0]))
    );
    assert_eq!((blur.viewport.width, blur.viewport.height), (32.0, 32.0));
}
