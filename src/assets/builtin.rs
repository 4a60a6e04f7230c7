//! Shaders and model compiled into the crate

use super::memory::MemorySource;
use crate::AssetNames;

pub const SCENE_VERTEX_SHADER: &str = include_str!("../../assets/shaders/scene.vert.wgsl");
pub const SCENE_PIXEL_SHADER: &str = include_str!("../../assets/shaders/scene.frag.wgsl");
pub const SHADOW_VERTEX_SHADER: &str = include_str!("../../assets/shaders/shadow.vert.wgsl");
pub const SHADOW_PIXEL_SHADER: &str = include_str!("../../assets/shaders/shadow.frag.wgsl");
pub const OVERLAY_VERTEX_SHADER: &str = include_str!("../../assets/shaders/overlay.vert.wgsl");
pub const OVERLAY_PIXEL_SHADER: &str = include_str!("../../assets/shaders/overlay.frag.wgsl");
pub const MODEL: &str = include_str!("../../assets/model.obj");

/// Memory source holding every built-in asset under `names`
pub fn builtin_source(names: &AssetNames) -> MemorySource {
    let source = MemorySource::new();
    source.insert(names.scene_vertex_shader.as_str(), SCENE_VERTEX_SHADER);
    source.insert(names.scene_pixel_shader.as_str(), SCENE_PIXEL_SHADER);
    source.insert(names.shadow_vertex_shader.as_str(), SHADOW_VERTEX_SHADER);
    source.insert(names.shadow_pixel_shader.as_str(), SHADOW_PIXEL_SHADER);
    source.insert(names.overlay_vertex_shader.as_str(), OVERLAY_VERTEX_SHADER);
    source.insert(names.overlay_pixel_shader.as_str(), OVERLAY_PIXEL_SHADER);
    source.insert(names.mesh.as_str(), MODEL);
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::import_mesh;

    #[test]
    fn test_every_default_name_is_present() {
        let names = AssetNames::default();
        let source = builtin_source(&names);
        for name in [
            &names.scene_vertex_shader,
            &names.scene_pixel_shader,
            &names.shadow_vertex_shader,
            &names.shadow_pixel_shader,
            &names.overlay_vertex_shader,
            &names.overlay_pixel_shader,
            &names.mesh,
        ] {
            assert!(source.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_builtin_model_imports() {
        let mesh = import_mesh("model", MODEL.as_bytes()).unwrap();
        // Six faces, four corners each, no sharing across faces
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
    }
}
