use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while fetching an asset.
#[derive(Error, Debug)]
pub enum AssetError {
    /// No asset with this name exists in the source.
    #[error("asset not found: {0}")]
    NotFound(String),
    /// The source failed while reading an existing asset.
    #[error("IO error while reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// The fetch task ended without delivering a result.
    #[error("fetch of {0} was dropped before completing")]
    Disconnected(String),
    /// The IO runtime could not be started.
    #[error("failed to start IO runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl AssetError {
    pub(crate) fn from_io(name: impl Into<String>, err: std::io::Error) -> Self {
        let name = name.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            AssetError::NotFound(name)
        } else {
            AssetError::Io { name, source: err }
        }
    }
}

/// A boxed, `Send` future returning the bytes of one asset.
pub type AssetFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, AssetError>> + Send>>;

/// Resolves logical asset names to their raw bytes.
///
/// Names use forward slashes and are relative to the source's root. The
/// returned futures are `Send + 'static` so they can be spawned on the
/// [`IoRuntime`](crate::assets::IoRuntime).
pub trait AssetSource: Send + Sync + 'static {
    /// Read the entire contents of the named asset.
    fn read(&self, name: &str) -> AssetFuture;
}

impl<S: AssetSource + ?Sized> AssetSource for Arc<S> {
    fn read(&self, name: &str) -> AssetFuture {
        (**self).read(name)
    }
}
