//! The fixed three-stage frame pipeline.
//!
//! Every frame runs, in this order:
//!
//! 1. geometry: the geometry program draws `Pass::GEOMETRY` into its own target
//!    cleared to the background color
//! 2. interface: the UI program draws `Pass::USER_INTERFACE` into a second
//!    target cleared to the background RGB with zero alpha
//! 3. post-process: both outputs are sampled and a full-viewport quad composites
//!    them onto the surface
//!
//! after which the two inputs are unbound again and the frame is presented.
//! [`RenderHooks`] run before and after each stage; [`blur`] uses the
//! after-geometry hook.
//!
//! # Key types
//!
//! - [`Renderer`] owns the programs, targets and the composite quad
//! - [`RenderHooks`] is the extension point, [`NoHooks`] the plain pipeline
//! - [`FrameTargets`] are the per-stage outputs hooks may read or overwrite

pub mod blur;

use cgmath::SquareMatrix;
use instant::Duration;

use crate::{
    backend::TextureDimension,
    config::RendererConfig,
    context::GraphicsDevice,
    data_structures::{mesh::MeshDescriptor, object::RenderableObject},
    error::Result,
    pipelines::{
        geometry::mk_geometry_program,
        gui::mk_gui_program,
        post::{PostProcessStage, mk_post_program},
        program::{ShaderProgram, TextureCode, Uniform},
    },
    render::{Pass, Renderable, Scene},
    target::RenderTarget,
};

pub use blur::{BLUR_EPSILON, BlurRenderer, GaussianBlur};

/// Outputs of the geometry and interface stages.
#[derive(Debug)]
pub struct FrameTargets {
    pub geometry: RenderTarget,
    pub interface: RenderTarget,
}

impl FrameTargets {
    fn new(device: &mut GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let geometry = RenderTarget::rgba(device, "geometry target", width, height)?;
        let interface = match RenderTarget::rgba(device, "interface target", width, height) {
            Ok(interface) => interface,
            Err(e) => {
                geometry.dispose(device);
                return Err(e);
            }
        };
        Ok(Self {
            geometry,
            interface,
        })
    }

    fn dispose(self, device: &mut GraphicsDevice) {
        self.geometry.dispose(device);
        self.interface.dispose(device);
    }
}

/// What a hook gets to work with.
pub struct Frame<'a> {
    pub targets: &'a FrameTargets,
    /// The full-viewport quad, tagged `Pass::POST_PROCESSING`.
    pub quad: &'a mut RenderableObject,
}

/// Extension points around the three stages. All default to doing nothing.
///
/// A hook may change program, target and texture bindings; the renderer
/// rebinds what the next stage needs.
pub trait RenderHooks {
    fn before_geometry(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    fn after_geometry(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    fn before_interface(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    fn after_interface(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    fn before_post(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    fn after_post(&mut self, _device: &mut GraphicsDevice, _frame: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    /// Time passed since the previous frame.
    fn advance(&mut self, _dt: Duration) {}

    /// The surface changed size; frame targets are already recreated.
    fn resize(&mut self, _device: &mut GraphicsDevice, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }

    fn dispose(self, _device: &mut GraphicsDevice)
    where
        Self: Sized,
    {
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl RenderHooks for NoHooks {}

pub struct Renderer<H: RenderHooks = NoHooks> {
    config: RendererConfig,
    geometry: ShaderProgram,
    gui: ShaderProgram,
    post: ShaderProgram,
    targets: FrameTargets,
    quad: RenderableObject,
    view_projection: cgmath::Matrix4<f32>,
    post_stage: PostProcessStage,
    hooks: H,
    frames: u64,
}

impl Renderer<NoHooks> {
    pub fn new(device: &mut GraphicsDevice, config: RendererConfig) -> Result<Self> {
        Self::with_hooks(device, config, NoHooks)
    }
}

impl<H: RenderHooks> Renderer<H> {
    /// Builds the three programs and the frame targets at surface size.
    pub fn with_hooks(device: &mut GraphicsDevice, config: RendererConfig, hooks: H) -> Result<Self> {
        let geometry = mk_geometry_program(device)?;
        let gui = mk_gui_program(device)?;
        let post = mk_post_program(device)?;
        let (width, height) = device.surface_size();
        let targets = FrameTargets::new(device, width, height)?;
        let quad = RenderableObject::new(
            device,
            &MeshDescriptor::fullscreen_quad("composite quad", Pass::POST_PROCESSING),
        );
        log::info!("renderer ready at {width}x{height}");

        Ok(Self {
            config,
            geometry,
            gui,
            post,
            targets,
            quad,
            view_projection: cgmath::Matrix4::identity(),
            post_stage: PostProcessStage::default(),
            hooks,
            frames: 0,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_background(&mut self, background: wgpu::Color) {
        self.config.background = background;
    }

    pub fn set_view_projection(&mut self, view_projection: cgmath::Matrix4<f32>) {
        self.view_projection = view_projection;
    }

    pub fn set_post_process_stage(&mut self, stage: PostProcessStage) {
        self.post_stage = stage;
    }

    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn advance(&mut self, dt: Duration) {
        self.hooks.advance(dt);
    }

    /// Runs one full frame and presents it.
    ///
    /// The pass inputs are unbound and the surface is selected again even when
    /// a stage fails; the frame is then not presented.
    pub fn render(&mut self, device: &mut GraphicsDevice, scene: &mut dyn Scene) -> Result<()> {
        let stages = self.render_stages(device, scene);
        let cleanup = Self::unbind_pass_inputs(device);
        if let Err(e) = &stages {
            log::warn!("frame {} aborted: {e}", self.frames);
        }
        stages?;
        cleanup?;
        device.present()?;
        self.frames += 1;
        Ok(())
    }

    fn render_stages(&mut self, device: &mut GraphicsDevice, scene: &mut dyn Scene) -> Result<()> {
        let background = self.config.background;
        let mut frame = Frame {
            targets: &self.targets,
            quad: &mut self.quad,
        };

        self.hooks.before_geometry(device, &mut frame)?;
        device.set_program(Some(&self.geometry));
        frame.targets.geometry.bind_as_target(device)?;
        device.clear(background, Some(1.0));
        device.set_uniform(Uniform::ViewProjection, self.view_projection)?;
        scene.render(device, Pass::GEOMETRY)?;
        self.hooks.after_geometry(device, &mut frame)?;

        self.hooks.before_interface(device, &mut frame)?;
        device.set_program(Some(&self.gui));
        frame.targets.interface.bind_as_target(device)?;
        device.clear(self.config.transparent_background(), Some(1.0));
        let (width, height) = frame.targets.interface.size();
        device.set_uniform(
            Uniform::InverseFrameSize,
            [1.0 / width as f32, 1.0 / height as f32],
        )?;
        scene.render(device, Pass::USER_INTERFACE)?;
        self.hooks.after_interface(device, &mut frame)?;

        self.hooks.before_post(device, &mut frame)?;
        device.set_program(Some(&self.post));
        device.set_render_targets(&[None])?;
        frame
            .targets
            .geometry
            .bind_as_texture(device, TextureCode::Color.slot())?;
        frame
            .targets
            .interface
            .bind_as_texture(device, TextureCode::Interface.slot())?;
        device.clear(background, Some(1.0));
        device.set_uniform(Uniform::Background, color_to_vec4(background))?;
        device.set_uniform(Uniform::PostProcessStage, self.post_stage as i32)?;
        frame.quad.render(device, Pass::POST_PROCESSING)?;
        self.hooks.after_post(device, &mut frame)
    }

    fn unbind_pass_inputs(device: &mut GraphicsDevice) -> Result<()> {
        device.set_texture_handle(TextureCode::Color.slot(), None, TextureDimension::D2)?;
        device.set_texture_handle(TextureCode::Interface.slot(), None, TextureDimension::D2)?;
        device.set_render_targets(&[None])
    }

    /// Resizes the surface and replaces every frame target.
    pub fn resize(&mut self, device: &mut GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        device.resize(width, height);
        let targets = FrameTargets::new(device, width, height)?;
        std::mem::replace(&mut self.targets, targets).dispose(device);
        self.hooks.resize(device, width, height)
    }

    pub fn dispose(self, device: &mut GraphicsDevice) {
        self.hooks.dispose(device);
        self.targets.dispose(device);
        self.quad.dispose(device);
        for program in [self.geometry, self.gui, self.post] {
            program.dispose(device);
        }
    }
}

fn color_to_vec4(color: wgpu::Color) -> [f32; 4] {
    [color.r as f32, color.g as f32, color.b as f32, color.a as f32]
}
