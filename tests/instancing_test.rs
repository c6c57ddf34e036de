use std::{cell::RefCell, rc::Rc};

use multipass_ngin::{
    backend::{BufferKind, InstanceSample, Journal},
    config::RendererConfig,
    context::GraphicsDevice,
    data_structures::{
        instance::{InstancedBatch, InstancingMode},
        material::Material,
        mesh::MeshDescriptor,
        world::World,
    },
    render::Pass,
    renderer::Renderer,
    Capability, RenderError,
};

use crate::common::test_utils::{draws_of, recording_device};

mod common;

const PLACEMENTS: [([f32; 3], [f32; 2]); 3] = [
    ([0.0, 0.0, 0.0], [0.0, 0.0]),
    ([1.5, -2.0, 0.5], [0.25, 0.0]),
    ([-3.0, 4.0, 1.0], [0.5, 0.75]),
];

struct Setup {
    device: GraphicsDevice,
    journal: Rc<RefCell<Journal>>,
    renderer: Renderer,
    world: World,
    batch: multipass_ngin::ItemHandle,
}

fn setup(capability: Capability, instances: usize) -> Setup {
    let (mut device, journal) = recording_device(capability);
    let renderer = Renderer::new(&mut device, RendererConfig::default()).unwrap();
    let mut batch = InstancedBatch::new(
        &mut device,
        MeshDescriptor::rect("tile", 1.0, 1.0, Pass::GEOMETRY),
    );
    for (position, texcoord) in PLACEMENTS.iter().take(instances) {
        batch.add_instance(&mut device, (*position).into(), (*texcoord).into());
    }
    let mut world = World::new();
    let material = world.add_material(Material::new("tiles"));
    let batch = world.add(material, batch).unwrap();
    Setup {
        device,
        journal,
        renderer,
        world,
        batch,
    }
}

fn render_instances(setup: &mut Setup) -> (Vec<InstanceSample>, u32) {
    setup.journal.borrow_mut().reset();
    setup
        .renderer
        .render(&mut setup.device, &mut setup.world)
        .unwrap();
    let draws = draws_of(&setup.journal, "geometry");
    let mut samples: Vec<_> = draws.iter().flat_map(|d| d.logical_instances()).collect();
    samples.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
    let primitives = draws.iter().map(|d| d.primitives()).sum();
    (samples, primitives)
}

#[test]
fn should_pick_mode_from_capability() {
    let mut hardware = setup(Capability::Enhanced, 0);
    let mut emulated = setup(Capability::Baseline, 0);
    let hw = hardware.batch;
    let em = emulated.batch;
    assert_eq!(
        hardware.world.batch_mut(hw).unwrap().mode(),
        InstancingMode::Hardware
    );
    assert_eq!(
        emulated.world.batch_mut(em).unwrap().mode(),
        InstancingMode::Emulated
    );
}

#[test]
fn should_render_the_same_instances_on_both_paths() {
    let mut hardware = setup(Capability::Enhanced, 3);
    let mut emulated = setup(Capability::Baseline, 3);

    let (hw_samples, hw_primitives) = render_instances(&mut hardware);
    let (em_samples, em_primitives) = render_instances(&mut emulated);

    assert_eq!(hw_samples.len(), 3);
    assert_eq!(hw_samples, em_samples);
    assert_eq!(hw_primitives, 6);
    assert_eq!(hw_primitives, em_primitives);

    let hw_draws = draws_of(&hardware.journal, "geometry");
    assert_eq!(hw_draws.len(), 1);
    assert!(hw_draws[0].instanced);
    assert_eq!(hw_draws[0].instances, 3);
    assert_eq!(draws_of(&emulated.journal, "geometry").len(), 3);
}

#[test]
fn should_not_draw_an_empty_batch() {
    for capability in [Capability::Enhanced, Capability::Baseline] {
        let mut empty = setup(capability, 0);
        let (samples, primitives) = render_instances(&mut empty);
        assert!(samples.is_empty());
        assert_eq!(primitives, 0);
        assert!(draws_of(&empty.journal, "geometry").is_empty());
    }
}

#[test]
fn should_upload_instances_only_when_dirty() {
    let mut hardware = setup(Capability::Enhanced, 2);
    render_instances(&mut hardware);
    render_instances(&mut hardware);
    assert_eq!(hardware.journal.borrow().count("create_buffer"), 0);
    assert_eq!(hardware.journal.borrow().buffer_writes, 0);

    let handle = hardware.batch;
    let batch = hardware.world.batch_mut(handle).unwrap();
    batch.add_instance(
        &mut hardware.device,
        PLACEMENTS[2].0.into(),
        PLACEMENTS[2].1.into(),
    );
    let (samples, _) = render_instances(&mut hardware);
    assert_eq!(samples.len(), 3);
    assert_eq!(hardware.journal.borrow().buffer_writes, 1);

    render_instances(&mut hardware);
    assert_eq!(hardware.journal.borrow().buffer_writes, 0);
}

#[test]
fn should_refuse_instanced_draws_on_baseline() {
    let (mut device, journal) = recording_device(Capability::Baseline);
    let vertices = device.create_buffer(BufferKind::Vertex, "vertices", &[0; 60]);
    let instances = device.create_buffer(BufferKind::Vertex, "instances", &[0; 20]);
    let indices = device.create_buffer(BufferKind::Index, "indices", &[0; 6]);

    let result = device.draw_mesh_instanced(vertices, instances, indices, 3, 1);

    assert!(matches!(result, Err(RenderError::NotSupported(_))));
    assert_eq!(journal.borrow().count("draw_indexed_instanced"), 0);
}
