//! Shared setup for the engine integration tests.
//!
//! Everything runs on the headless recording backend with the built-in
//! assets, optionally behind a gate that holds fetches until released.

#![allow(dead_code)]

use std::sync::Arc;

use fogmap_renderer::assets::{builtin_source, AssetError, AssetFuture};
use fogmap_renderer::backend::{RecordedCommand, RecordingBackend};
use fogmap_renderer::{AssetSource, Engine, MemorySource, RendererConfig};
use tokio::sync::Semaphore;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 450;

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn engine_with(source: impl AssetSource, config: RendererConfig) -> Engine<RecordingBackend> {
    init_logging();
    Engine::new(RecordingBackend::new(WIDTH, HEIGHT), source, config)
        .expect("engine construction only spawns fetches")
}

pub fn builtin_engine(config: RendererConfig) -> Engine<RecordingBackend> {
    let source = builtin_source(&config.assets);
    engine_with(source, config)
}

/// Source whose reads wait for a permit before touching the inner store
#[derive(Clone)]
pub struct GatedSource {
    inner: MemorySource,
    gate: Arc<Semaphore>,
}

impl GatedSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let every pending and future read through
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

impl AssetSource for GatedSource {
    fn read(&self, name: &str) -> AssetFuture {
        let gate = Arc::clone(&self.gate);
        let read = self.inner.read(name);
        let name = name.to_owned();
        Box::pin(async move {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| AssetError::Disconnected(name))?;
            read.await
        })
    }
}

pub fn pass_labels(commands: &[RecordedCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::BeginRenderPass { label, .. } => label.clone(),
            _ => None,
        })
        .collect()
}

pub fn draw_count(commands: &[RecordedCommand]) -> usize {
    commands.iter().filter(|c| c.is_draw()).count()
}

pub fn bind_count(commands: &[RecordedCommand]) -> usize {
    commands.iter().filter(|c| c.is_bind()).count()
}
