//! Audioscope - the default audio input as a moving 3D spectrum history
//!
//! Capture feeds overlapping windows to an FFT worker; every transform becomes
//! the newest row of a surface drawn by a dedicated render thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use audioscope::audio::AudioSystem;
use audioscope::cli::Args;
use audioscope::params::{CameraParams, RenderConfig, SceneSelection, SpectrumConfig};
use audioscope::rendering::{Extent, FrameScheduler, NoOverlay, RenderThread, WgpuBackend};
use audioscope::spectrum::SharedSpectrum;

/// How often the window thread checks on the render and spectrum threads
const WATCHDOG_INTERVAL: Duration = Duration::from_millis(100);

/// Main application state
struct App {
    // Configuration
    spectrum_config: SpectrumConfig,
    render_config: RenderConfig,
    scene: SceneSelection,

    // Spectrum history shared by the audio worker and the renderer
    shared: SharedSpectrum,

    // Window, render thread and capture
    window: Option<Arc<Window>>,
    render: Option<RenderThread>,
    audio: Option<AudioSystem>,

    /// First fatal error; reported when the event loop returns
    error: Option<anyhow::Error>,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let spectrum_config = args.spectrum_config();
        spectrum_config
            .validate()
            .context("invalid spectrum settings")?;
        let render_config = args.render_config();
        render_config.validate().context("invalid render settings")?;

        let shared = SharedSpectrum::new(spectrum_config.layout(), args.parse_scale());

        Ok(Self {
            scene: render_config.scene,
            spectrum_config,
            render_config,
            shared,
            window: None,
            render: None,
            audio: None,
            error: None,
        })
    }

    /// Create the window, renderer and capture
    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Audioscope")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let layout = self.spectrum_config.layout();
        let backend = pollster::block_on(WgpuBackend::new(
            Arc::clone(&window),
            &self.render_config,
            layout,
        ))
        .context("failed to initialise GPU")?;
        let scheduler = FrameScheduler::new(
            backend,
            NoOverlay,
            &self.render_config,
            CameraParams::default(),
            layout,
        )
        .context("failed to create surface")?;
        let render = RenderThread::spawn(scheduler, self.shared.clone())
            .context("failed to start render thread")?;

        let audio = AudioSystem::new(&self.spectrum_config, self.shared.clone())
            .context("failed to start audio capture")?;

        log::info!("Audioscope is running");
        log::info!("S: scale  V: style  R: raster  ESC: quit");

        self.window = Some(window);
        self.render = Some(render);
        self.audio = Some(audio);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyS => {
                let scale = self.shared.scale().next();
                self.shared.set_scale(scale);
                log::info!("Scale: {}", scale.name());
            }
            KeyCode::KeyV => {
                self.scene.style = self.scene.style.next();
                self.select_scene();
            }
            KeyCode::KeyR => {
                self.scene.raster = self.scene.raster.next();
                self.select_scene();
            }
            _ => {}
        }
    }

    fn select_scene(&self) {
        log::info!(
            "Scene: {} / {}",
            self.scene.style.name(),
            self.scene.raster.name()
        );
        if let Some(render) = &self.render {
            render.select(self.scene);
        }
    }

    /// Stop capture first so nothing publishes into a renderer that is gone
    fn shutdown(&mut self) -> anyhow::Result<()> {
        let audio = match self.audio.take() {
            Some(mut audio) => audio.stop().context("spectrum worker failed"),
            None => Ok(()),
        };
        let render = match self.render.take() {
            Some(mut render) => render.stop().context("render thread failed"),
            None => Ok(()),
        };
        audio.and(render)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render) = &self.render {
                    render.resize(Extent::new(size.width, size.height));
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(key, event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + WATCHDOG_INTERVAL));

        // Both threads only end on their own after an error
        if self.render.as_ref().is_some_and(|render| render.is_finished()) {
            log::error!("Render thread stopped, exiting");
            event_loop.exit();
        }
        if self.audio.as_ref().is_some_and(|audio| audio.is_finished()) {
            log::error!("Spectrum worker stopped, exiting");
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Err(e) = self.shutdown() {
            log::error!("{:#}", e);
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut app = App::new(&args)?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
