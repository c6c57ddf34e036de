use std::num::NonZeroU32;

use multipass_ngin::{
    config::{BlurConfig, RendererConfig},
    flow::{FrameRate, FrameTimer},
    RenderError,
};

fn capped(fps: u32) -> FrameRate {
    FrameRate::Capped(NonZeroU32::new(fps).unwrap())
}

#[test]
fn should_default_to_sixty_frames() {
    assert_eq!(FrameRate::default(), capped(60));
    assert_eq!(RendererConfig::default().frame_rate, capped(60));
}

#[test]
fn should_accept_positive_integers_and_minus_one() {
    assert_eq!(FrameRate::try_from(30.0).unwrap(), capped(30));
    assert_eq!(FrameRate::try_from(-1.0).unwrap(), FrameRate::Uncapped);
    assert_eq!("144".parse::<FrameRate>().unwrap(), capped(144));
    assert_eq!("-1".parse::<FrameRate>().unwrap(), FrameRate::Uncapped);
    assert_eq!(" Uncapped ".parse::<FrameRate>().unwrap(), FrameRate::Uncapped);
}

#[test]
fn should_reject_everything_else() {
    for fps in [0.0, -2.0, 29.97, f64::NAN, f64::INFINITY] {
        assert!(
            matches!(FrameRate::try_from(fps), Err(RenderError::InvalidArgument(_))),
            "{fps} was accepted"
        );
    }
    assert!(matches!(
        "fast".parse::<FrameRate>(),
        Err(RenderError::InvalidArgument(_))
    ));
}

#[test]
fn should_keep_the_previous_rate_on_error() {
    let mut timer = FrameTimer::new(capped(30));
    assert!(timer.set_rate(0.0).is_err());
    assert_eq!(timer.rate(), capped(30));
    timer.set_rate(-1.0).unwrap();
    assert_eq!(timer.rate(), FrameRate::Uncapped);
    assert!(timer.next_deadline().is_none());
}

#[test]
fn should_clamp_blur_settings() {
    let blur = BlurConfig::default()
        .with_strength(-1.0)
        .with_decay_per_second(3.0);
    assert_eq!(blur.strength, 0.0);
    assert_eq!(blur.decay_per_second, 1.0);
    assert_eq!(BlurConfig::default().passes, 2);
    assert_eq!(capped(25).period().unwrap().as_millis(), 40);
    assert!(FrameRate::Uncapped.period().is_none());
}
