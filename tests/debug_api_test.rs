use std::{cell::RefCell, rc::Rc};

use multipass_ngin::{
    backend::{Journal, TextureDesc},
    config::RendererConfig,
    context::GraphicsDevice,
    data_structures::{material::Material, world::World},
    render::Pass,
    renderer::Renderer,
    Capability,
};

use crate::common::test_utils::{debug_recording_device, event_outline, recording_device, square};

mod common;

fn render_two_frames(device: &mut GraphicsDevice) {
    let mut renderer = Renderer::new(device, RendererConfig::default()).unwrap();
    let mut world = World::new();
    let material = world.add_material(Material::new("tinted").with_diffuse_color([0.2, 0.4, 0.6, 1.0]));
    let scene = square(device, "scene", Pass::GEOMETRY);
    let ui = square(device, "ui", Pass::USER_INTERFACE);
    world.add(material, scene).unwrap();
    world.add(material, ui).unwrap();

    renderer.render(device, &mut world).unwrap();
    renderer.resize(device, 32, 24).unwrap();
    renderer.render(device, &mut world).unwrap();
}

fn assert_same_journal(plain: &Rc<RefCell<Journal>>, logged: &Rc<RefCell<Journal>>) {
    assert_eq!(event_outline(plain), event_outline(logged));

    let plain = plain.borrow();
    let logged = logged.borrow();
    assert_eq!(plain.calls, logged.calls);
    assert_eq!(plain.resolutions, logged.resolutions);
    assert_eq!(plain.buffer_writes, logged.buffer_writes);
    assert_eq!(plain.live_buffers, logged.live_buffers);
    assert_eq!(plain.live_textures, logged.live_textures);
    assert_eq!(plain.live_framebuffers, logged.live_framebuffers);

    let plain_draws: Vec<_> = plain.draws().collect();
    let logged_draws: Vec<_> = logged.draws().collect();
    assert_eq!(plain_draws.len(), logged_draws.len());
    for (a, b) in plain_draws.iter().zip(&logged_draws) {
        assert_eq!(a.viewport, b.viewport);
        assert_eq!(a.uniforms, b.uniforms);
        assert_eq!(a.textures, b.textures);
        assert_eq!(a.instance_data, b.instance_data);
    }
    let plain_clears: Vec<_> = plain.clears().collect();
    let logged_clears: Vec<_> = logged.clears().collect();
    assert_eq!(plain_clears, logged_clears);
}

#[test]
fn should_forward_every_call_when_logging() {
    let (mut plain_device, plain) = recording_device(Capability::Enhanced);
    let (mut logged_device, logged) = debug_recording_device(Capability::Enhanced);

    render_two_frames(&mut plain_device);
    render_two_frames(&mut logged_device);

    assert!(!plain.borrow().calls.is_empty());
    assert_eq!(plain.borrow().presents(), 2);
    assert_same_journal(&plain, &logged);
}

#[test]
fn should_forward_every_call_on_baseline_devices() {
    let (mut plain_device, plain) = recording_device(Capability::Baseline);
    let (mut logged_device, logged) = debug_recording_device(Capability::Baseline);

    render_two_frames(&mut plain_device);
    render_two_frames(&mut logged_device);

    assert_same_journal(&plain, &logged);
}

#[test]
fn should_pass_errors_through_the_logging_wrapper() {
    let (mut plain_device, _) = recording_device(Capability::Enhanced);
    let (mut logged_device, _) = debug_recording_device(Capability::Enhanced);

    let desc = TextureDesc::new_2d("short upload", 2, 2);
    let plain = plain_device.create_texture(&desc, Some(&[0u8; 3])).unwrap_err();
    let logged = logged_device.create_texture(&desc, Some(&[0u8; 3])).unwrap_err();
    assert_eq!(plain.to_string(), logged.to_string());
}
