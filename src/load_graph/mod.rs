//! Load graph
//!
//! GPU resources are built by an explicit DAG of named steps:
//! - one fetch step per asset, all issued at once
//! - one build step per fetch, depending only on that fetch
//! - a join step depending on every build step
//!
//! The join publishes the finished [`GpuResources`] and sets the
//! [`ReadyFlag`]. Device loss tears everything down and bumps the device
//! generation; fetches of older generations are discarded when they land.

mod coordinator;
pub mod graph;
mod ready;
mod resources;
mod steps;

pub use coordinator::{LoadCoordinator, LoadStatus, ResourceState};
pub use graph::{CompiledGraph, GraphError, LoadGraph, StepId, StepNode};
pub use ready::ReadyFlag;
pub use resources::{
    DrawSlot, GeometryBuffers, GpuHandle, GpuResources, ResourceLedger, ShadowTargets,
    TransformBinding,
};
pub use steps::{load_graph, Asset, LoadSettings, Step};
