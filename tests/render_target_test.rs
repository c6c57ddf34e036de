use multipass_ngin::{
    backend::{ComponentType, FramebufferStatus, PixelFormat},
    target::RenderTarget,
    Capability, RenderError,
};

use crate::common::test_utils::recording_device;

mod common;

fn live(journal: &std::rc::Rc<std::cell::RefCell<multipass_ngin::backend::Journal>>) -> (usize, usize) {
    let journal = journal.borrow();
    (journal.live_textures, journal.live_framebuffers)
}

#[test]
fn should_release_everything_when_incomplete() {
    let cases = [
        (Capability::Enhanced, 16, 16, PixelFormat::Rgba, ComponentType::Float, FramebufferStatus::Unsupported),
        (Capability::Baseline, 16, 16, PixelFormat::Rgba, ComponentType::HalfFloat, FramebufferStatus::Unsupported),
        (Capability::Enhanced, 16, 16, PixelFormat::Depth, ComponentType::UnsignedByte, FramebufferStatus::IncompleteAttachment),
        (Capability::Enhanced, 0, 16, PixelFormat::Rgba, ComponentType::UnsignedByte, FramebufferStatus::IncompleteDimensions),
        (Capability::Baseline, 1 << 20, 4, PixelFormat::Rgba, ComponentType::UnsignedByte, FramebufferStatus::IncompleteDimensions),
    ];
    for (capability, width, height, format, component, expected) in cases {
        let (mut device, journal) = recording_device(capability);
        let result = RenderTarget::new(&mut device, "broken", width, height, format, component);
        match result {
            Err(RenderError::FramebufferIncomplete { status, .. }) => assert_eq!(status, expected),
            other => panic!("expected an incomplete framebuffer, got {other:?}"),
        }
        assert_eq!(live(&journal), (0, 0));
    }
}

#[test]
fn should_allow_half_float_on_enhanced() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let target = RenderTarget::new(&mut device, "hdr", 8, 8, PixelFormat::Rgba, ComponentType::HalfFloat).unwrap();
    assert_eq!(target.size(), (8, 8));
    assert_eq!(live(&journal), (1, 1));
    target.dispose(&mut device);
    assert_eq!(live(&journal), (0, 0));
}

#[test]
fn should_unbind_a_sampled_texture_when_it_becomes_the_target() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let target = RenderTarget::rgba(&mut device, "offscreen", 16, 8).unwrap();
    target.bind_as_texture(&mut device, 3).unwrap();

    journal.borrow_mut().reset();
    target.bind_as_target(&mut device).unwrap();
    assert_eq!(
        journal.borrow().calls,
        vec!["bind_texture", "bind_framebuffer", "viewport"]
    );
    assert_eq!(device.viewport().width, 16.0);
    assert_eq!(device.viewport().height, 8.0);

    // The active target cannot be sampled.
    assert!(matches!(
        target.bind_as_texture(&mut device, 0),
        Err(RenderError::InvalidArgument(_))
    ));

    device.set_render_targets(&[None]).unwrap();
    assert_eq!(device.viewport().width, 64.0);
    target.bind_as_texture(&mut device, 0).unwrap();
}

#[test]
fn should_accept_exactly_one_target() {
    let (mut device, _journal) = recording_device(Capability::Enhanced);
    let a = RenderTarget::rgba(&mut device, "a", 4, 4).unwrap();
    let b = RenderTarget::rgba(&mut device, "b", 4, 4).unwrap();

    assert!(matches!(
        device.set_render_targets(&[]),
        Err(RenderError::InvalidArgument(_))
    ));
    assert!(matches!(
        device.set_render_targets(&[Some(&a), Some(&b)]),
        Err(RenderError::NotSupported(_))
    ));
    device.set_render_targets(&[Some(&b)]).unwrap();
}

#[test]
fn should_fall_back_to_the_surface_when_the_bound_target_is_disposed() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let target = RenderTarget::rgba(&mut device, "short lived", 4, 4).unwrap();
    target.bind_as_target(&mut device).unwrap();
    target.dispose(&mut device);

    device.clear(multipass_ngin::wgpu::Color::BLACK, None);
    let journal = journal.borrow();
    let clear = journal.clears().last().unwrap();
    assert_eq!(clear.target, None);
    assert_eq!(journal.live_framebuffers, 0);
    assert_eq!(device.viewport().width, 64.0);
}

#[test]
fn should_keep_the_bound_target_when_another_is_disposed() {
    let (mut device, journal) = recording_device(Capability::Enhanced);
    let kept = RenderTarget::rgba(&mut device, "kept", 8, 8).unwrap();
    let dropped = RenderTarget::rgba(&mut device, "dropped", 4, 4).unwrap();
    kept.bind_as_target(&mut device).unwrap();
    dropped.dispose(&mut device);

    device.clear(multipass_ngin::wgpu::Color::BLACK, None);
    let journal = journal.borrow();
    let clear = journal.clears().last().unwrap();
    assert_eq!(clear.target.as_deref(), Some("kept"));
    assert_eq!(journal.live_framebuffers, 1);
    assert_eq!(device.viewport().width, 8.0);
}
