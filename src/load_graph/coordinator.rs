//! Load coordinator
//!
//! Drives one load attempt per device generation. Fetches run on the
//! [`IoRuntime`]; build steps and the join run on the caller's thread inside
//! [`LoadCoordinator::poll`] or [`LoadCoordinator::wait`], one at a time.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::{AssetError, AssetSource, IoHandle, IoRuntime};
use crate::backend::GraphicsBackend;
use crate::error::LoadError;
use crate::load_graph::graph::{CompiledGraph, GraphError};
use crate::load_graph::ready::ReadyFlag;
use crate::load_graph::resources::{GpuResources, ResourceLedger};
use crate::load_graph::steps::{self, Asset, BranchOutputs, LoadSettings, Step};

/// How long `wait` blocks on one fetch before re-checking the others
const WAIT_SLICE: Duration = Duration::from_millis(5);

/// Externally visible progress of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No resources and no attempt in progress
    Unloaded,
    Loading,
    Ready,
}

/// Lifecycle of the GPU resource set. Only teardown leads back to `Unloaded`.
#[derive(Debug, Default)]
pub enum ResourceState {
    #[default]
    Unloaded,
    Loaded(GpuResources),
}

struct PendingFetch {
    generation: u64,
    asset: Asset,
    name: String,
    handle: IoHandle<Result<Vec<u8>, AssetError>>,
}

struct LoadAttempt {
    generation: u64,
    graph: CompiledGraph<Step>,
    completed: HashSet<Step>,
    fetched: HashMap<Asset, Vec<u8>>,
    outputs: BranchOutputs,
    ledger: ResourceLedger,
}

/// Builds the GPU resource set and owns it once built
pub struct LoadCoordinator {
    settings: LoadSettings,
    source: Arc<dyn AssetSource>,
    io: IoRuntime,
    ready: ReadyFlag,
    generation: u64,
    state: ResourceState,
    attempt: Option<LoadAttempt>,
    /// Fetches of every generation still running, stale ones included
    in_flight: Vec<PendingFetch>,
}

impl LoadCoordinator {
    pub fn new(settings: LoadSettings, source: impl AssetSource, io: IoRuntime) -> Self {
        Self {
            settings,
            source: Arc::new(source),
            io,
            ready: ReadyFlag::new(),
            generation: 0,
            state: ResourceState::Unloaded,
            attempt: None,
            in_flight: Vec::new(),
        }
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Shared view of the readiness flag
    pub fn ready_flag(&self) -> ReadyFlag {
        self.ready.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    /// Device generation the current or next attempt builds for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> LoadStatus {
        if self.ready.is_set() {
            LoadStatus::Ready
        } else if self.attempt.is_some() {
            LoadStatus::Loading
        } else {
            LoadStatus::Unloaded
        }
    }

    /// The published resource set. `None` until the join has completed.
    pub fn resources(&self) -> Option<&GpuResources> {
        match &self.state {
            ResourceState::Loaded(resources) if self.ready.is_set() => Some(resources),
            _ => None,
        }
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    /// Fetches still running, including discarded ones from older generations
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Issue every fetch of a new attempt.
    ///
    /// Does nothing while an attempt is running or resources are loaded.
    pub fn start(&mut self) -> Result<(), LoadError> {
        if self.attempt.is_some() || matches!(self.state, ResourceState::Loaded(_)) {
            log::debug!("Load already started for generation {}", self.generation);
            return Ok(());
        }

        let graph = steps::load_graph(&self.settings).compile()?;
        log::info!(
            "Starting load for generation {} ({} steps)",
            self.generation,
            graph.len()
        );

        for step in graph.roots() {
            if let Step::Fetch(asset) = step {
                let name = asset.name(&self.settings.assets).to_string();
                let handle = self.io.run(self.source.read(&name));
                self.in_flight.push(PendingFetch {
                    generation: self.generation,
                    asset,
                    name,
                    handle,
                });
            }
        }

        self.attempt = Some(LoadAttempt {
            generation: self.generation,
            graph,
            completed: HashSet::new(),
            fetched: HashMap::new(),
            outputs: BranchOutputs::default(),
            ledger: ResourceLedger::new(),
        });
        Ok(())
    }

    /// Run every step whose inputs are available without blocking.
    ///
    /// Call once per frame. A failure releases everything the attempt created
    /// and is returned here; readiness stays false.
    pub fn poll(&mut self, backend: &mut dyn GraphicsBackend) -> Result<LoadStatus, LoadError> {
        self.drive(backend, None)
    }

    /// Block until the current attempt is ready or has failed. Starts an
    /// attempt if none is running.
    pub fn wait(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), LoadError> {
        self.start()?;
        loop {
            match self.drive(backend, Some(WAIT_SLICE))? {
                LoadStatus::Ready => return Ok(()),
                LoadStatus::Loading => {}
                LoadStatus::Unloaded => return Err(LoadError::Aborted),
            }
        }
    }

    /// Drop readiness and release every GPU resource of this generation.
    ///
    /// Fetches still in flight are left to finish; their results are
    /// discarded when they arrive.
    pub fn teardown(&mut self, backend: &mut dyn GraphicsBackend) {
        self.ready.clear();
        let mut released = 0;
        if let Some(mut attempt) = self.attempt.take() {
            released += attempt.ledger.len();
            attempt.ledger.release(backend);
        }
        if let ResourceState::Loaded(resources) = std::mem::take(&mut self.state) {
            released += resources.handle_count();
            resources.release(backend);
        }
        log::info!(
            "Tore down generation {} ({} GPU objects released)",
            self.generation,
            released
        );
        self.generation += 1;
    }

    fn drive(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        wait: Option<Duration>,
    ) -> Result<LoadStatus, LoadError> {
        let result = self.collect(wait).and_then(|()| self.advance(backend));
        if let Err(err) = &result {
            log::warn!("Load of generation {} failed: {}", self.generation, err);
            self.abort(backend);
        }
        result
    }

    /// Move finished fetches of the current generation into the attempt
    fn collect(&mut self, wait: Option<Duration>) -> Result<(), LoadError> {
        let generation = self.generation;
        let mut blocking = wait;
        let mut arrived = Vec::new();

        let mut index = 0;
        while index < self.in_flight.len() {
            let pending = &self.in_flight[index];
            let timeout = blocking.filter(|_| pending.generation == generation);
            if timeout.is_some() {
                blocking = None;
            }
            let received = match timeout {
                Some(timeout) => {
                    match pending.handle.recv_timeout(timeout) {
                        Ok(result) => Some(result),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => {
                            Some(Err(AssetError::Disconnected(pending.name.clone())))
                        }
                    }
                }
                None => match pending.handle.try_recv() {
                    Ok(result) => Some(result),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        Some(Err(AssetError::Disconnected(pending.name.clone())))
                    }
                },
            };

            match received {
                Some(result) => {
                    let pending = self.in_flight.swap_remove(index);
                    if pending.generation == generation {
                        arrived.push((pending.asset, result));
                    } else {
                        log::debug!(
                            "Discarding stale fetch of {} from generation {}",
                            pending.name,
                            pending.generation
                        );
                    }
                }
                None => index += 1,
            }
        }

        let Some(attempt) = self.attempt.as_mut() else {
            return Ok(());
        };
        for (asset, result) in arrived {
            attempt.fetched.insert(asset, result?);
            attempt.completed.insert(Step::Fetch(asset));
        }
        Ok(())
    }

    /// Run runnable build steps in graph order, then the join
    fn advance(&mut self, backend: &mut dyn GraphicsBackend) -> Result<LoadStatus, LoadError> {
        let Some(attempt) = self.attempt.as_mut() else {
            return Ok(self.status());
        };

        let order: Vec<Step> = attempt.graph.order().collect();
        let mut joined = None;
        for step in order {
            if attempt.completed.contains(&step)
                || !attempt.graph.is_runnable(step, &attempt.completed)
            {
                continue;
            }
            match step {
                // Completed by `collect` when the bytes arrive
                Step::Fetch(_) => continue,
                Step::Build(asset) => {
                    let bytes = attempt
                        .fetched
                        .remove(&asset)
                        .ok_or_else(|| GraphError::OutOfOrder(format!("{:?}", step)))?;
                    steps::build_branch(
                        asset,
                        &bytes,
                        &self.settings,
                        backend,
                        &mut attempt.ledger,
                        &mut attempt.outputs,
                    )?;
                }
                Step::Join => {
                    let outputs = std::mem::take(&mut attempt.outputs);
                    joined = Some(steps::join(
                        &self.settings,
                        backend,
                        &mut attempt.ledger,
                        outputs,
                    )?);
                }
            }
            attempt.completed.insert(step);
        }

        match joined {
            Some(resources) => Ok(self.publish(resources, backend)),
            None => Ok(LoadStatus::Loading),
        }
    }

    fn publish(
        &mut self,
        resources: GpuResources,
        backend: &mut dyn GraphicsBackend,
    ) -> LoadStatus {
        let attempt_generation = self.attempt.take().map(|a| a.generation);
        if attempt_generation != Some(self.generation) {
            log::debug!("Discarding resources built for a stale generation");
            resources.release(backend);
            return LoadStatus::Unloaded;
        }

        log::info!(
            "Load complete for generation {} ({} GPU objects)",
            self.generation,
            resources.handle_count()
        );
        self.state = ResourceState::Loaded(resources);
        self.ready.set();
        LoadStatus::Ready
    }

    /// Release a failed attempt and move past its generation
    fn abort(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(mut attempt) = self.attempt.take() {
            attempt.ledger.release(backend);
        }
        self.ready.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{builtin_source, MemorySource};
    use crate::backend::RecordingBackend;
    use crate::AssetNames;

    fn settings(overlay: bool) -> LoadSettings {
        LoadSettings {
            assets: AssetNames::default(),
            shadow_map_size: 256,
            fog_grid: overlay.then(crate::resources::FogGrid::default),
        }
    }

    fn coordinator(source: MemorySource, overlay: bool) -> LoadCoordinator {
        LoadCoordinator::new(settings(overlay), source, IoRuntime::new().unwrap())
    }

    #[test]
    fn test_not_ready_until_loaded() {
        let mut backend = RecordingBackend::new(320, 240);
        let mut loader = coordinator(builtin_source(&AssetNames::default()), true);
        assert_eq!(loader.status(), LoadStatus::Unloaded);
        assert!(loader.resources().is_none());

        loader.start().unwrap();
        assert!(!loader.is_ready());
        loader.wait(&mut backend).unwrap();

        assert!(loader.is_ready());
        let resources = loader.resources().unwrap();
        assert!(resources.overlay_pipeline.is_some());
        assert_eq!(resources.handle_count(), backend.live_count());
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_overlay_assets_are_optional() {
        let names = AssetNames::default();
        let source = builtin_source(&names);
        source.remove(&names.overlay_vertex_shader);
        source.remove(&names.overlay_pixel_shader);

        let mut backend = RecordingBackend::new(320, 240);
        let mut loader = coordinator(source, false);
        loader.wait(&mut backend).unwrap();

        let resources = loader.resources().unwrap();
        assert!(resources.overlay_pipeline.is_none());
        assert!(resources.fog_grid.is_none());
    }

    #[test]
    fn test_missing_asset_fails_and_releases() {
        let names = AssetNames::default();
        let source = builtin_source(&names);
        source.remove(&names.mesh);

        let mut backend = RecordingBackend::new(320, 240);
        let mut loader = coordinator(source, true);
        let err = loader.wait(&mut backend).unwrap_err();

        assert!(matches!(
            err,
            LoadError::AssetFetch(AssetError::NotFound(name)) if name == "model.obj"
        ));
        assert!(!loader.is_ready());
        assert_eq!(loader.status(), LoadStatus::Unloaded);
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut backend = RecordingBackend::new(320, 240);
        let mut loader = coordinator(builtin_source(&AssetNames::default()), true);
        loader.wait(&mut backend).unwrap();
        let generation = loader.generation();

        loader.teardown(&mut backend);
        assert!(!loader.is_ready());
        assert!(loader.resources().is_none());
        assert!(matches!(loader.state(), ResourceState::Unloaded));
        assert_eq!(loader.generation(), generation + 1);
        assert_eq!(backend.live_count(), 0);
        assert!(backend.violations().is_empty());

        loader.wait(&mut backend).unwrap();
        assert!(loader.is_ready());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut backend = RecordingBackend::new(320, 240);
        let mut loader = coordinator(builtin_source(&AssetNames::default()), false);
        loader.start().unwrap();
        let fetches = loader.in_flight_count();
        loader.start().unwrap();
        assert_eq!(loader.in_flight_count(), fetches);

        loader.wait(&mut backend).unwrap();
        let live = backend.live_count();
        loader.start().unwrap();
        loader.poll(&mut backend).unwrap();
        assert_eq!(backend.live_count(), live);
    }
}
