//! Frame pacing and the application event loop.
//!
//! An application is an [`AppFlow`]: it builds its scene once the device exists,
//! reacts to window events and is updated every frame. [`run`] owns the window,
//! the device and a [`BlurRenderer`] and drives the flow at the configured
//! [`FrameRate`].
//!
//! # Lifecycle
//!
//! 1. the window is created on `resumed` and the device is created for it
//! 2. the flow constructor runs once with the device and the renderer
//! 3. window events go to `on_window_event`
//! 4. whenever the [`FrameTimer`] is due, `on_update` runs, the blur advances
//!    and the flow's scene is rendered
//!
//! A lost or outdated surface is handled by resizing to the window size.

use std::{fmt, num::NonZeroU32, str::FromStr, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    backend::SurfaceTarget,
    config::{DeviceConfig, RendererConfig},
    context::GraphicsDevice,
    error::{RenderError, Result},
    render::Scene,
    renderer::BlurRenderer,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Target number of frames per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRate {
    Capped(NonZeroU32),
    Uncapped,
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate::Capped(NonZeroU32::new(60).unwrap_or(NonZeroU32::MIN))
    }
}

impl FrameRate {
    /// Time between two frames, `None` when uncapped.
    pub fn period(self) -> Option<Duration> {
        match self {
            FrameRate::Capped(fps) => Some(Duration::from_secs_f64(1.0 / fps.get() as f64)),
            FrameRate::Uncapped => None,
        }
    }
}

/// `-1` means uncapped. Zero, other negatives and fractions are rejected.
impl TryFrom<f64> for FrameRate {
    type Error = RenderError;

    fn try_from(fps: f64) -> Result<Self> {
        if fps == -1.0 {
            return Ok(FrameRate::Uncapped);
        }
        if !fps.is_finite() || fps.fract() != 0.0 || fps < 1.0 || fps > u32::MAX as f64 {
            return Err(RenderError::InvalidArgument(format!(
                "frame rate must be a positive integer or -1, got {fps}"
            )));
        }
        NonZeroU32::new(fps as u32)
            .map(FrameRate::Capped)
            .ok_or_else(|| RenderError::InvalidArgument(format!("frame rate {fps} is zero")))
    }
}

impl FromStr for FrameRate {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("uncapped") {
            return Ok(FrameRate::Uncapped);
        }
        let fps: f64 = s
            .parse()
            .map_err(|_| RenderError::InvalidArgument(format!("'{s}' is not a frame rate")))?;
        FrameRate::try_from(fps)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRate::Capped(fps) => write!(f, "{fps} fps"),
            FrameRate::Uncapped => f.write_str("uncapped"),
        }
    }
}

/// Decides when the next frame is due.
#[derive(Clone, Copy, Debug)]
pub struct FrameTimer {
    rate: FrameRate,
    next: Instant,
    last: Instant,
}

impl FrameTimer {
    /// The first frame is due immediately.
    pub fn new(rate: FrameRate) -> Self {
        let now = Instant::now();
        Self {
            rate,
            next: now,
            last: now,
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Changes the rate and schedules the next frame one period from now.
    pub fn set_frame_rate(&mut self, rate: FrameRate) {
        self.set_frame_rate_at(rate, Instant::now());
    }

    pub fn set_frame_rate_at(&mut self, rate: FrameRate, now: Instant) {
        log::debug!("frame rate {} -> {}", self.rate, rate);
        self.rate = rate;
        self.next = now + rate.period().unwrap_or_default();
    }

    /// Like [`FrameTimer::set_frame_rate`] for a raw value. An invalid value
    /// keeps the previous rate and schedule.
    pub fn set_rate(&mut self, fps: f64) -> Result<()> {
        let rate = FrameRate::try_from(fps)?;
        self.set_frame_rate(rate);
        Ok(())
    }

    /// When the next frame is due, `None` when frames run back to back.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.rate {
            FrameRate::Capped(_) => Some(self.next),
            FrameRate::Uncapped => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.rate {
            FrameRate::Capped(_) => now >= self.next,
            FrameRate::Uncapped => true,
        }
    }

    /// Starts a frame if one is due and returns the time since the last one.
    ///
    /// A late frame does not cause catch-up frames; the schedule restarts from
    /// `now` instead.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if !self.is_due(now) {
            return None;
        }
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        if let Some(period) = self.rate.period() {
            self.next += period;
            if self.next <= now {
                self.next = now + period;
            }
        }
        Some(dt)
    }
}

/// The application driven by [`run`].
pub trait AppFlow {
    /// Called every frame before rendering.
    fn on_update(
        &mut self,
        _device: &mut GraphicsDevice,
        _renderer: &mut BlurRenderer,
        _dt: Duration,
    ) -> Result<()> {
        Ok(())
    }

    /// Called for every window event before the loop handles it.
    fn on_window_event(&mut self, _event: &WindowEvent, _timer: &mut FrameTimer) {}

    /// What is rendered this frame.
    fn scene(&mut self) -> &mut dyn Scene;

    fn dispose(self: Box<Self>, _device: &mut GraphicsDevice) {}
}

/// Builds the application once the device and the renderer exist.
pub type FlowConstructor =
    Box<dyn FnOnce(&mut GraphicsDevice, &mut BlurRenderer) -> anyhow::Result<Box<dyn AppFlow>>>;

struct Running {
    window: Arc<Window>,
    device: GraphicsDevice,
    renderer: BlurRenderer,
    flow: Box<dyn AppFlow>,
}

impl fmt::Debug for Running {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Running")
            .field("device", &self.device)
            .field("frames", &self.renderer.frames_rendered())
            .finish()
    }
}

impl Running {
    async fn start(
        window: Arc<Window>,
        device_config: DeviceConfig,
        config: RendererConfig,
        constructor: FlowConstructor,
    ) -> anyhow::Result<Self> {
        let mut device = device_config
            .create_context(SurfaceTarget::Window(window.clone()))
            .await?;
        let mut renderer = BlurRenderer::blurred(&mut device, config)?;
        let flow = constructor(&mut device, &mut renderer)?;
        Ok(Self {
            window,
            device,
            renderer,
            flow,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Err(e) = self.renderer.resize(&mut self.device, width, height) {
            log::error!("resize to {width}x{height} failed: {e}");
        }
    }

    fn frame(&mut self, dt: Duration) -> Result<()> {
        self.flow.on_update(&mut self.device, &mut self.renderer, dt)?;
        self.renderer.advance(dt);
        self.renderer.render(&mut self.device, self.flow.scene())
    }
}

// Only sent by the wasm start-up task.
#[allow(dead_code)]
enum FlowEvent {
    Initialized(Box<Running>),
    Failed(String),
}

impl fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowEvent::Initialized(running) => f.debug_tuple("Initialized").field(running).finish(),
            FlowEvent::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: EventLoopProxy<FlowEvent>,
    device_config: DeviceConfig,
    config: RendererConfig,
    constructor: Option<FlowConstructor>,
    running: Option<Running>,
    timer: FrameTimer,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        device_config: DeviceConfig,
        config: RendererConfig,
        constructor: FlowConstructor,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            device_config,
            config,
            constructor: Some(constructor),
            running: None,
            timer: FrameTimer::new(config.frame_rate),
        })
    }

    fn schedule(&self, event_loop: &ActiveEventLoop) {
        match self.timer.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                event_loop.set_control_flow(ControlFlow::wait_duration(wait));
            }
            None => event_loop.set_control_flow(ControlFlow::Poll),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructor) = self.constructor.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("multipass-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let start = Running::start(window, self.device_config, self.config, constructor);

        #[cfg(not(target_arch = "wasm32"))]
        match self.async_runtime.block_on(start) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                log::error!("could not start: {e:#}");
                event_loop.exit();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match start.await {
                    Ok(running) => FlowEvent::Initialized(Box::new(running)),
                    Err(e) => FlowEvent::Failed(format!("{e:#}")),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(running) => {
                let mut running = *running;
                let size = running.window.inner_size();
                running.resize(size.width, size.height);
                running.window.request_redraw();
                self.running = Some(running);
            }
            FlowEvent::Failed(e) => {
                log::error!("could not start: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };
        running.flow.on_window_event(&event, &mut self.timer);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => running.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let Some(dt) = self.timer.tick(Instant::now()) else {
                    return;
                };
                match running.frame(dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(e) if e.is_surface_lost() => {
                        log::warn!("{e}, reconfiguring");
                        let size = running.window.inner_size();
                        running.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("unable to render: {e}"),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            if self.timer.is_due(Instant::now()) {
                running.window.request_redraw();
            }
        }
        self.schedule(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.take() {
            let Running {
                mut device,
                renderer,
                flow,
                ..
            } = running;
            flow.dispose(&mut device);
            renderer.dispose(&mut device);
            log::info!("shut down");
        }
    }
}

/// Opens a window and runs `constructor`'s flow until the window closes.
pub fn run(
    device_config: DeviceConfig,
    config: RendererConfig,
    constructor: FlowConstructor,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, device_config, config, constructor)?;
    log::info!("running at {}", config.frame_rate);
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Boxes a constructor closure.
pub fn flow<F>(constructor: F) -> FlowConstructor
where
    F: FnOnce(&mut GraphicsDevice, &mut BlurRenderer) -> anyhow::Result<Box<dyn AppFlow>> + 'static,
{
    Box::new(constructor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(n: u32) -> FrameRate {
        FrameRate::Capped(NonZeroU32::new(n).unwrap())
    }

    #[test]
    fn timer_waits_for_the_period() {
        let mut timer = FrameTimer::new(fps(10));
        let start = Instant::now();
        timer.set_frame_rate_at(fps(10), start);

        assert!(timer.tick(start).is_none());
        assert!(timer.tick(start + Duration::from_millis(50)).is_none());
        assert!(timer.tick(start + Duration::from_millis(100)).is_some());
        assert_eq!(timer.next_deadline(), Some(start + Duration::from_millis(200)));
    }

    #[test]
    fn late_frames_do_not_catch_up() {
        let mut timer = FrameTimer::new(fps(10));
        let start = Instant::now();
        timer.set_frame_rate_at(fps(10), start);

        let late = start + Duration::from_millis(550);
        assert!(timer.tick(late).is_some());
        assert!(timer.tick(late + Duration::from_millis(1)).is_none());
        assert_eq!(timer.next_deadline(), Some(late + Duration::from_millis(100)));
    }

    #[test]
    fn rate_change_reschedules_from_now() {
        let mut timer = FrameTimer::new(fps(1));
        let now = Instant::now();
        timer.set_frame_rate_at(fps(4), now);
        assert_eq!(timer.next_deadline(), Some(now + Duration::from_millis(250)));

        timer.set_frame_rate_at(FrameRate::Uncapped, now);
        assert!(timer.next_deadline().is_none());
        assert!(timer.is_due(now));
    }

    #[test]
    fn invalid_rate_keeps_the_schedule() {
        let mut timer = FrameTimer::new(fps(30));
        let deadline = timer.next_deadline();
        assert!(timer.set_rate(0.0).is_err());
        assert!(timer.set_rate(-3.0).is_err());
        assert!(timer.set_rate(12.5).is_err());
        assert_eq!(timer.rate(), fps(30));
        assert_eq!(timer.next_deadline(), deadline);
    }
}
