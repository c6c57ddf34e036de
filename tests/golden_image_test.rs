#![cfg(feature = "integration-tests")]

use multipass_ngin::{
    config::RendererConfig,
    context::{GraphicsDevice, create_context},
    data_structures::{material::Material, mesh::MeshDescriptor, object::RenderableObject, world::World},
    render::{EmptyScene, Pass},
    renderer::Renderer,
    wgpu::Color,
    SurfaceTarget,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn headless() -> GraphicsDevice {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime
        .block_on(create_context(
            SurfaceTarget::Headless {
                width: WIDTH,
                height: HEIGHT,
            },
            true,
            false,
        ))
        .expect("no adapter for the headless test")
}

fn to_pixel(colour: Color) -> image::Rgba<u8> {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ])
}

#[test]
fn should_render_clear_colour() {
    let mut device = headless();
    let config = RendererConfig::default().with_background(Color::WHITE);
    let mut renderer = Renderer::new(&mut device, config).unwrap();
    renderer.render(&mut device, &mut EmptyScene).unwrap();

    let image = device.read_pixels(None).unwrap();
    assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
    let desired_pixel = to_pixel(Color::WHITE);
    for pixel in image.pixels() {
        assert_eq!(*pixel, desired_pixel);
    }
}

#[test]
fn should_composite_geometry_over_background() {
    let mut device = headless();
    let config = RendererConfig::default().with_background(Color::BLACK);
    let mut renderer = Renderer::new(&mut device, config).unwrap();

    let mut world = World::new();
    let red = world.add_material(Material::new("red").with_diffuse_color([1.0, 0.0, 0.0, 1.0]));
    let quadrant = RenderableObject::new(
        &mut device,
        &MeshDescriptor::rect("upper right", 1.0, 1.0, Pass::GEOMETRY),
    );
    world.add(red, quadrant).unwrap();
    renderer.render(&mut device, &mut world).unwrap();

    let image = device.read_pixels(None).unwrap();
    assert_eq!(*image.get_pixel(WIDTH * 3 / 4, HEIGHT / 4), image::Rgba([255, 0, 0, 255]));
    assert_eq!(*image.get_pixel(WIDTH / 4, HEIGHT * 3 / 4), to_pixel(Color::BLACK));
}

fn assert_near(actual: image::Rgba<u8>, expected: [u8; 4]) {
    for (a, e) in actual.0.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 2, "expected {expected:?}, got {actual:?}");
    }
}

fn translucent_interface(background: Color) -> image::RgbaImage {
    let mut device = headless();
    let config = RendererConfig::default().with_background(background);
    let mut renderer = Renderer::new(&mut device, config).unwrap();

    let mut world = World::new();
    let half_red = world.add_material(Material::new("half red").with_diffuse_color([1.0, 0.0, 0.0, 0.5]));
    let panel = RenderableObject::new(
        &mut device,
        &MeshDescriptor::rect("panel", WIDTH as f32, HEIGHT as f32, Pass::USER_INTERFACE),
    );
    world.add(half_red, panel).unwrap();
    renderer.render(&mut device, &mut world).unwrap();
    device.read_pixels(None).unwrap()
}

#[test]
fn should_blend_translucent_interface_once() {
    // Half red over black is linear 0.5, sRGB encoded on the surface.
    let image = translucent_interface(Color::BLACK);
    assert_near(*image.get_pixel(WIDTH / 2, HEIGHT / 2), [188, 0, 0, 255]);
}

#[test]
fn should_not_leak_the_cleared_background_into_the_interface() {
    let grey = Color {
        r: 0.5,
        g: 0.5,
        b: 0.5,
        a: 1.0,
    };
    let image = translucent_interface(grey);
    // 0.5 * red + 0.5 * grey = (0.75, 0.25, 0.25) in linear space.
    assert_near(*image.get_pixel(WIDTH / 2, HEIGHT / 2), [225, 137, 137, 255]);
}
