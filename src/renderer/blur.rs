//! Separable Gaussian blur over the geometry output.
//!
//! Each iteration blurs horizontally into target A and vertically from A into
//! target B. The first iteration reads the geometry output, later ones read B.
//! Finally B is copied back over the geometry target so the composite picks it
//! up unchanged.

use instant::Duration;

use crate::{
    backend::TextureDimension,
    config::{BlurConfig, RendererConfig},
    context::GraphicsDevice,
    error::Result,
    pipelines::{
        blur::mk_blur_program,
        copy::mk_copy_program,
        program::{ShaderProgram, TextureCode, Uniform},
    },
    render::{Pass, Renderable},
    renderer::{Frame, RenderHooks, Renderer},
    target::RenderTarget,
};

/// Strengths at or below this skip the blur entirely.
pub const BLUR_EPSILON: f32 = 1e-3;

/// A renderer that blurs the scene before the interface is composited on top.
pub type BlurRenderer = Renderer<GaussianBlur>;

#[derive(Debug)]
pub struct GaussianBlur {
    config: BlurConfig,
    strength: f32,
    blur: ShaderProgram,
    copy: ShaderProgram,
    ping: RenderTarget,
    pong: RenderTarget,
}

impl GaussianBlur {
    pub fn new(device: &mut GraphicsDevice, config: BlurConfig) -> Result<Self> {
        let blur = mk_blur_program(device)?;
        let copy = mk_copy_program(device)?;
        let (width, height) = device.surface_size();
        let (ping, pong) = Self::targets(device, width, height)?;
        Ok(Self {
            config,
            strength: config.strength,
            blur,
            copy,
            ping,
            pong,
        })
    }

    fn targets(device: &mut GraphicsDevice, width: u32, height: u32) -> Result<(RenderTarget, RenderTarget)> {
        let ping = RenderTarget::rgba(device, "blur target A", width, height)?;
        match RenderTarget::rgba(device, "blur target B", width, height) {
            Ok(pong) => Ok((ping, pong)),
            Err(e) => {
                ping.dispose(device);
                Err(e)
            }
        }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.max(0.0);
    }

    pub fn passes(&self) -> u32 {
        self.config.passes
    }

    pub fn set_passes(&mut self, passes: u32) {
        self.config.passes = passes;
    }

    pub fn is_active(&self) -> bool {
        self.strength > BLUR_EPSILON && self.config.passes > 0
    }

    /// Draws the quad into `target` while `source` is bound for sampling.
    fn blur_into(
        device: &mut GraphicsDevice,
        quad: &mut dyn Renderable,
        source: &RenderTarget,
        target: &RenderTarget,
        offset: [f32; 2],
    ) -> Result<()> {
        target.bind_as_target(device)?;
        source.bind_as_texture(device, TextureCode::Color.slot())?;
        device.set_uniform(Uniform::PixelOffset, offset)?;
        quad.render(device, Pass::POST_PROCESSING)
    }
}

impl RenderHooks for GaussianBlur {
    fn after_geometry(&mut self, device: &mut GraphicsDevice, frame: &mut Frame<'_>) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let targets = frame.targets;
        let geometry = &targets.geometry;
        let (width, height) = geometry.size();

        device.set_program(Some(&self.blur));
        device.set_uniform(
            Uniform::InverseFrameSize,
            [1.0 / width as f32, 1.0 / height as f32],
        )?;
        for pass in 0..self.config.passes {
            let source = if pass == 0 { geometry } else { &self.pong };
            Self::blur_into(device, &mut *frame.quad, source, &self.ping, [self.strength, 0.0])?;
            Self::blur_into(device, &mut *frame.quad, &self.ping, &self.pong, [0.0, self.strength])?;
        }

        device.set_program(Some(&self.copy));
        geometry.bind_as_target(device)?;
        self.pong.bind_as_texture(device, TextureCode::Color.slot())?;
        frame.quad.render(device, Pass::POST_PROCESSING)?;
        device.set_texture_handle(TextureCode::Color.slot(), None, TextureDimension::D2)
    }

    fn advance(&mut self, dt: Duration) {
        if self.config.decay_per_second >= 1.0 || self.strength <= 0.0 {
            return;
        }
        self.strength *= self.config.decay_per_second.powf(dt.as_secs_f32());
        if self.strength <= BLUR_EPSILON {
            log::debug!("blur faded out");
            self.strength = 0.0;
        }
    }

    fn resize(&mut self, device: &mut GraphicsDevice, width: u32, height: u32) -> Result<()> {
        let (ping, pong) = Self::targets(device, width, height)?;
        std::mem::replace(&mut self.ping, ping).dispose(device);
        std::mem::replace(&mut self.pong, pong).dispose(device);
        Ok(())
    }

    fn dispose(self, device: &mut GraphicsDevice) {
        self.ping.dispose(device);
        self.pong.dispose(device);
        self.blur.dispose(device);
        self.copy.dispose(device);
    }
}

impl Renderer<GaussianBlur> {
    /// A renderer whose blur starts from `config.blur`.
    pub fn blurred(device: &mut GraphicsDevice, config: RendererConfig) -> Result<Self> {
        let blur = GaussianBlur::new(device, config.blur)?;
        Self::with_hooks(device, config, blur)
    }
}
