//! Asset fetching
//!
//! Asset sources resolve a logical file name to raw bytes through boxed
//! `Send` futures. The futures do not drive themselves: they are spawned on an
//! [`IoRuntime`], whose [`IoHandle`]s can be checked once per frame without
//! blocking.
//!
//! - [`MemorySource`] holds files in memory (tests, embedded assets)
//! - [`DirectorySource`] reads files below a root directory
//! - [`builtin_source`] serves the shaders and model shipped with the crate

mod builtin;
mod directory;
mod io_handle;
mod io_runtime;
mod memory;
mod source;

pub use builtin::*;
pub use directory::DirectorySource;
pub use io_handle::IoHandle;
pub use io_runtime::IoRuntime;
pub use memory::MemorySource;
pub use source::{AssetError, AssetFuture, AssetSource};
