//! Backend abstraction layer
//!
//! Provides the device interface the load graph and the frame renderer work
//! against, a wgpu implementation, and a headless recording implementation.

pub mod recording;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use recording::{RecordedCommand, RecordingBackend, ResourceKind};
pub use traits::*;
pub use types::*;
