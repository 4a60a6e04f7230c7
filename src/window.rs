//! Window host using winit
//!
//! Owns the event loop and forwards its events to an [`Engine`] over the
//! wgpu backend: resizes, one update and render per redraw, and a device
//! rebuild when a frame reports a fatal device error.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::assets::AssetSource;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::backend::BackendError;
use crate::engine::Engine;
use crate::error::{LoadError, RenderError};
use crate::RendererConfig;

/// Errors that end the host loop
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Failed to create device: {0}")]
    Device(#[from] BackendError),
    #[error("Failed to load resources: {0}")]
    Load(#[from] LoadError),
}

/// Window settings for [`run`]
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "FogMap".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Open a window and run the engine until it is closed
pub fn run(
    options: WindowOptions,
    source: impl AssetSource,
    config: RendererConfig,
) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(options.title.as_str())
            .with_inner_size(PhysicalSize::new(options.width, options.height))
            .build(&event_loop)?,
    );

    let backend = WgpuBackend::new(Arc::clone(&window), options.vsync)?;
    let mut engine = Engine::new(backend, source, config)?;
    let mut last_frame = Instant::now();
    let mut load_failure = None;
    let failure = &mut load_failure;

    event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(size) => engine.resize(size.width, size.height),
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    engine.update(dt);
                    match engine.render() {
                        Ok(_) => {}
                        Err(e) if e.is_device_fatal() => {
                            log::error!("Frame failed: {}", e);
                            if !recover_device(&mut engine, &window, options.vsync) {
                                elwt.exit();
                            }
                        }
                        Err(RenderError::Load(e)) => {
                            *failure = Some(e);
                            elwt.exit();
                        }
                        Err(e) => log::error!("Frame failed: {}", e),
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        }
    })?;

    match load_failure {
        Some(e) => Err(RunError::Load(e)),
        None => Ok(()),
    }
}

/// Tear down, create a new device on the same window and reload
fn recover_device(
    engine: &mut Engine<WgpuBackend>,
    window: &Arc<WinitWindow>,
    vsync: bool,
) -> bool {
    engine.on_device_lost();
    let backend = match WgpuBackend::new(Arc::clone(window), vsync) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Failed to recreate device: {}", e);
            return false;
        }
    };
    match engine.on_device_restored(backend) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to restart loading: {}", e);
            false
        }
    }
}
