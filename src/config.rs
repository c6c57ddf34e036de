//! Explicit configuration values handed to the device and the renderer.
//!
//! Nothing here is process-wide: every setting travels with the value that is
//! passed into [`create_context`](crate::context::create_context) or
//! [`Renderer::new`](crate::renderer::Renderer::new).

use crate::flow::FrameRate;

/// How the graphics context is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Try the enhanced capability level first.
    pub enhanced: bool,
    /// Log every graphics API call.
    pub debug: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enhanced: true,
            debug: false,
        }
    }
}

impl DeviceConfig {
    pub fn with_enhanced(mut self, enhanced: bool) -> Self {
        self.enhanced = enhanced;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Settings of the separable blur applied after the geometry pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurConfig {
    /// Horizontal + vertical iterations per frame.
    pub passes: u32,
    /// Multiplier of the per-tap texel offset.
    pub strength: f32,
    /// Fraction of the strength that remains after one second. `1.0` keeps it constant.
    pub decay_per_second: f32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            passes: 2,
            strength: 0.0,
            decay_per_second: 1.0,
        }
    }
}

impl BlurConfig {
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength.max(0.0);
        self
    }

    pub fn with_decay_per_second(mut self, decay: f32) -> Self {
        self.decay_per_second = decay.clamp(0.0, 1.0);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    /// Clear color of the geometry and post-process passes.
    pub background: wgpu::Color,
    pub blur: BlurConfig,
    pub frame_rate: FrameRate,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            background: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            blur: BlurConfig::default(),
            frame_rate: FrameRate::default(),
        }
    }
}

impl RendererConfig {
    pub fn with_background(mut self, background: wgpu::Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_blur(mut self, blur: BlurConfig) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// The UI clear color: the background RGB with zero alpha.
    pub fn transparent_background(&self) -> wgpu::Color {
        wgpu::Color {
            a: 0.0,
            ..self.background
        }
    }
}
