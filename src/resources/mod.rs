//! CPU-side resources
//!
//! Mesh data, the text mesh importer, built-in geometry and shader stage
//! compilation. Nothing in here touches the GPU.

mod mesh;
mod obj_import;
pub mod primitives;
mod shader;

pub use mesh::*;
pub use obj_import::{import_mesh, MeshImportError, IMPORTED_VERTEX_COLOR};
pub use primitives::FogGrid;
pub use shader::{compile_stage, CompiledStage, ShaderError, StageInput};
