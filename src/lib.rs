//! FogMap renderer - a shadow-mapped scene with a translucent fog-cell overlay
//!
//! GPU resources are built by a small dependency graph: every shader stage and
//! the model file are fetched concurrently, each fetch runs one build step, and
//! a join step publishes the finished resource set behind a single readiness
//! flag. Frames are drawn in three passes:
//! - **shadow**: depth and color from the light's point of view
//! - **scene**: the lit model and floor, sampling the shadow texture
//! - **overlay**: an alpha-blended grid of fog cells (optional)
//!
//! Two backends implement [`backend::GraphicsBackend`]:
//! - **wgpu**: a real device on a winit window
//! - **recording**: headless, records every command for inspection

pub mod assets;
pub mod backend;
pub mod engine;
pub mod error;
pub mod load_graph;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod window;

pub use assets::{AssetSource, DirectorySource, MemorySource};
pub use backend::wgpu_backend::WgpuBackend;
pub use backend::RecordingBackend;
pub use engine::Engine;
pub use error::{LoadError, RenderError};
pub use load_graph::{LoadSettings, LoadStatus};
pub use resources::FogGrid;

use scene::{Camera, DirectionalLight, Transform};

/// Logical names of the assets a load fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNames {
    pub scene_vertex_shader: String,
    pub scene_pixel_shader: String,
    pub shadow_vertex_shader: String,
    pub shadow_pixel_shader: String,
    pub overlay_vertex_shader: String,
    pub overlay_pixel_shader: String,
    pub mesh: String,
}

impl Default for AssetNames {
    fn default() -> Self {
        Self {
            scene_vertex_shader: "shaders/scene.vert.wgsl".to_string(),
            scene_pixel_shader: "shaders/scene.frag.wgsl".to_string(),
            shadow_vertex_shader: "shaders/shadow.vert.wgsl".to_string(),
            shadow_pixel_shader: "shaders/shadow.frag.wgsl".to_string(),
            overlay_vertex_shader: "shaders/overlay.vert.wgsl".to_string(),
            overlay_pixel_shader: "shaders/overlay.frag.wgsl".to_string(),
            mesh: "model.obj".to_string(),
        }
    }
}

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub assets: AssetNames,
    /// Edge length of the square shadow map in texels
    pub shadow_map_size: u32,
    /// Fog-cell grid drawn by the overlay pass, `None` disables the pass
    pub fog_grid: Option<FogGrid>,
    pub camera: Camera,
    pub light: DirectionalLight,
    /// Light spin in radians per second, `None` keeps the light static
    pub light_speed: Option<f32>,
    pub model_transform: Transform,
    pub floor_transform: Transform,
    /// Back buffer clear color
    pub clear_color: [f32; 4],
    pub shadow_clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            assets: AssetNames::default(),
            shadow_map_size: 1024,
            fog_grid: Some(FogGrid::default()),
            camera: Camera::default(),
            light: DirectionalLight::default(),
            light_speed: None,
            model_transform: Transform::from_rotation_y(-std::f32::consts::FRAC_PI_2),
            floor_transform: Transform::from_position(glam::Vec3::new(0.0, -1.0, 0.0)),
            clear_color: [0.392, 0.584, 0.929, 1.0],
            shadow_clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RendererConfig {
    pub fn with_assets(mut self, assets: AssetNames) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    pub fn with_fog_grid(mut self, grid: FogGrid) -> Self {
        self.fog_grid = Some(grid);
        self
    }

    /// Shadow and scene passes only
    pub fn without_overlay(mut self) -> Self {
        self.fog_grid = None;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_light(mut self, light: DirectionalLight) -> Self {
        self.light = light;
        self
    }

    pub fn with_light_animation(mut self, radians_per_second: f32) -> Self {
        self.light_speed = Some(radians_per_second);
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn load_settings(&self) -> LoadSettings {
        LoadSettings {
            assets: self.assets.clone(),
            shadow_map_size: self.shadow_map_size,
            fog_grid: self.fog_grid,
        }
    }
}
