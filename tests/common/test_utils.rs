#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use multipass_ngin::{
    backend::{DrawRecord, Event, Journal, RecordingApi},
    context::GraphicsDevice,
    data_structures::{mesh::MeshDescriptor, object::RenderableObject},
    error::{RenderError, Result},
    render::{Pass, Renderable, Scene},
    Capability,
};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// A device on the recording backend and a handle on its journal.
pub fn recording_device(capability: Capability) -> (GraphicsDevice, Rc<RefCell<Journal>>) {
    let api = RecordingApi::new(capability, WIDTH, HEIGHT);
    let journal = api.journal();
    (GraphicsDevice::from_api(api, false), journal)
}

/// Same as [`recording_device`] but every API call is logged.
pub fn debug_recording_device(capability: Capability) -> (GraphicsDevice, Rc<RefCell<Journal>>) {
    let api = RecordingApi::new(capability, WIDTH, HEIGHT);
    let journal = api.journal();
    (GraphicsDevice::from_api(api, true), journal)
}

pub fn square(device: &mut GraphicsDevice, label: &str, passes: Pass) -> RenderableObject {
    RenderableObject::new(device, &MeshDescriptor::rect(label, 1.0, 1.0, passes))
}

pub fn draws(journal: &Rc<RefCell<Journal>>) -> Vec<DrawRecord> {
    journal.borrow().draws().cloned().collect()
}

/// Draws of one program, in order.
pub fn draws_of(journal: &Rc<RefCell<Journal>>, program: &str) -> Vec<DrawRecord> {
    journal
        .borrow()
        .draws()
        .filter(|draw| draw.program == program)
        .cloned()
        .collect()
}

/// A compact, comparable summary of every clear, draw and present.
pub fn event_outline(journal: &Rc<RefCell<Journal>>) -> Vec<String> {
    journal
        .borrow()
        .events
        .iter()
        .map(|event| match event {
            Event::Clear(clear) => format!("clear {:?}", clear.target),
            Event::Draw(draw) => format!(
                "draw {} -> {:?} mesh {:?} x{}",
                draw.program, draw.target, draw.mesh, draw.instances
            ),
            Event::Present => "present".to_string(),
        })
        .collect()
}

/// A renderable that draws nothing and remembers the passes it was asked for.
pub struct PassSpy {
    pub mask: Pass,
    pub seen: Rc<RefCell<Vec<Pass>>>,
}

impl PassSpy {
    pub fn new(mask: Pass) -> (Self, Rc<RefCell<Vec<Pass>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                mask,
                seen: seen.clone(),
            },
            seen,
        )
    }
}

impl Renderable for PassSpy {
    fn passes(&self) -> Pass {
        self.mask
    }

    fn render(&mut self, _device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        if pass.intersects(self.mask) {
            self.seen.borrow_mut().push(pass);
        }
        Ok(())
    }
}

/// A scene that fails as soon as it is asked to render `pass`.
pub struct FailingScene {
    pass: Pass,
}

impl FailingScene {
    pub fn new(pass: Pass) -> Self {
        Self { pass }
    }
}

impl Scene for FailingScene {
    fn render(&mut self, _device: &mut GraphicsDevice, pass: Pass) -> Result<()> {
        if pass.intersects(self.pass) {
            return Err(RenderError::InvalidArgument(format!("{pass:?} failed")));
        }
        Ok(())
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}
