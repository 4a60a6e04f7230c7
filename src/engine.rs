//! Host-facing engine
//!
//! Owns the device, the load coordinator and the frame renderer. The host
//! forwards device notifications (`on_device_lost`, `on_device_restored`,
//! `resize`) and drives frames with `update` and `render`.

use crate::assets::{AssetSource, IoRuntime};
use crate::backend::GraphicsBackend;
use crate::error::{LoadError, RenderError};
use crate::load_graph::{GpuResources, LoadCoordinator, LoadStatus};
use crate::renderer::{FrameOutcome, FrameRenderer};
use crate::scene::FrameState;
use crate::RendererConfig;

/// The FogMap engine over any [`GraphicsBackend`]
pub struct Engine<B: GraphicsBackend> {
    backend: B,
    config: RendererConfig,
    state: FrameState,
    loader: LoadCoordinator,
    renderer: FrameRenderer,
    device_lost: bool,
}

impl<B: GraphicsBackend> Engine<B> {
    /// Create the engine and issue every asset fetch.
    ///
    /// Resources are built by later `poll_loading` or `render` calls.
    pub fn new(
        backend: B,
        source: impl AssetSource,
        config: RendererConfig,
    ) -> Result<Self, LoadError> {
        let io = IoRuntime::new()?;

        let mut state = FrameState::new(config.camera.clone(), config.light.clone());
        state.model = config.model_transform;
        state.floor = config.floor_transform;
        state.light_speed = config.light_speed;
        let (width, height) = backend.surface_size();
        state.resize(width, height);

        let mut loader = LoadCoordinator::new(config.load_settings(), source, io);
        loader.start()?;

        let renderer = FrameRenderer::new(&config);
        log::info!(
            "Engine created ({}x{}, passes: {:?})",
            width,
            height,
            renderer.pass_names()
        );

        Ok(Self {
            backend,
            config,
            state,
            loader,
            renderer,
            device_lost: false,
        })
    }

    /// Run whatever load steps are runnable without blocking
    pub fn poll_loading(&mut self) -> Result<LoadStatus, LoadError> {
        if self.device_lost {
            return Ok(LoadStatus::Unloaded);
        }
        self.loader.poll(&mut self.backend)
    }

    /// Block until every load step has run
    pub fn wait_until_ready(&mut self) -> Result<(), LoadError> {
        if self.device_lost {
            return Err(LoadError::Aborted);
        }
        self.loader.wait(&mut self.backend)
    }

    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    /// Release every GPU resource and reset readiness.
    ///
    /// Loads in flight are abandoned; their results are discarded when they
    /// arrive.
    pub fn on_device_lost(&mut self) {
        log::warn!("Device lost, releasing resources");
        self.loader.teardown(&mut self.backend);
        self.device_lost = true;
    }

    /// Adopt a fresh device and re-run the whole load graph
    pub fn on_device_restored(&mut self, backend: B) -> Result<(), LoadError> {
        if !self.device_lost {
            self.loader.teardown(&mut self.backend);
        }
        self.backend = backend;
        self.device_lost = false;

        let (width, height) = self.backend.surface_size();
        self.state.resize(width, height);
        log::info!("Device restored ({}x{}), reloading", width, height);
        self.loader.start()
    }

    /// Resize the back buffer. Only the camera projection changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
        // The device may clamp the requested size
        let (width, height) = self.backend.surface_size();
        self.state.resize(width, height);
        log::debug!("Resized to {}x{}", width, height);
    }

    /// Advance time-dependent state by `time_step` seconds
    pub fn update(&mut self, time_step: f32) {
        self.state.update(time_step);
    }

    /// Draw one frame, or nothing while resources are not ready.
    ///
    /// Pending load steps are polled first. A failed load is returned as
    /// [`RenderError::Load`] from the frame that observed it; the attempt is
    /// already released and later frames skip until the device is restored.
    /// Device-fatal load errors report `is_device_fatal`, so the host runs
    /// its `on_device_lost` / `on_device_restored` recovery.
    pub fn render(&mut self) -> Result<FrameOutcome, RenderError> {
        if self.device_lost {
            return Ok(FrameOutcome::Skipped);
        }
        if !self.loader.is_ready() {
            self.loader.poll(&mut self.backend)?;
        }
        self.renderer
            .render(&mut self.backend, self.loader.resources(), &self.state)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.state
    }

    pub fn frame_state_mut(&mut self) -> &mut FrameState {
        &mut self.state
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Published resources, `None` until ready
    pub fn resources(&self) -> Option<&GpuResources> {
        self.loader.resources()
    }

    pub fn loader(&self) -> &LoadCoordinator {
        &self.loader
    }
}

impl<B: GraphicsBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.loader.teardown(&mut self.backend);
    }
}
