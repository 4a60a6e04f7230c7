//! Errors surfaced to the host

use thiserror::Error;

use crate::assets::AssetError;
use crate::backend::BackendError;
use crate::load_graph::GraphError;
use crate::resources::{MeshImportError, ShaderError};

/// Why a load attempt failed. Every variant is fatal to the attempt.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("asset fetch failed: {0}")]
    AssetFetch(#[from] AssetError),
    #[error("shader compilation failed: {0}")]
    ShaderCompile(#[from] ShaderError),
    #[error("mesh import of {name} failed: {source}")]
    MeshImport {
        name: String,
        #[source]
        source: MeshImportError,
    },
    #[error("GPU resource creation failed: {0}")]
    GpuResource(#[from] BackendError),
    #[error("invalid load graph: {0}")]
    Graph(#[from] GraphError),
    #[error("load was torn down before it completed")]
    Aborted,
}

impl LoadError {
    /// The device went away while building; recovery goes through device loss.
    pub fn is_device_fatal(&self) -> bool {
        matches!(self, LoadError::GpuResource(e) if e.is_device_fatal())
    }
}

/// Errors raised while drawing a frame
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("GPU error during rendering: {0}")]
    GpuResource(#[from] BackendError),
    /// The pending load polled by this frame failed
    #[error("resource load failed: {0}")]
    Load(#[from] LoadError),
}

impl RenderError {
    pub fn is_device_fatal(&self) -> bool {
        match self {
            RenderError::GpuResource(e) => e.is_device_fatal(),
            RenderError::Load(e) => e.is_device_fatal(),
        }
    }
}
