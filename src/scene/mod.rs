//! Per-frame transform state
//!
//! The camera pose and the light are fixed at construction. `update` only
//! advances the optional light animation and `resize` only touches the
//! camera projection.

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

/// Matrices and light parameters uploaded by the frame renderer
#[derive(Debug, Clone)]
pub struct FrameState {
    pub camera: Camera,
    pub light: DirectionalLight,
    /// Model transform of the imported mesh
    pub model: Transform,
    pub floor: Transform,
    pub overlay: Transform,
    /// Light spin in radians per second, `None` keeps the light static
    pub light_speed: Option<f32>,
    elapsed: f64,
}

impl FrameState {
    pub fn new(camera: Camera, light: DirectionalLight) -> Self {
        Self {
            camera,
            light,
            model: Transform::from_rotation_y(-std::f32::consts::FRAC_PI_2),
            floor: Transform::default(),
            overlay: Transform::default(),
            light_speed: None,
            elapsed: 0.0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    /// Advance by `time_step` seconds.
    pub fn update(&mut self, time_step: f32) {
        self.elapsed += time_step as f64;
        if let Some(speed) = self.light_speed {
            self.light.rotate_y(speed * time_step);
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Transform block for one draw with the given model transform
    pub fn transform_for(&self, model: &Transform) -> TransformUniformData {
        TransformUniformData {
            model: model.matrix(),
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            light_view: self.light.view_matrix(),
            light_projection: self.light.projection_matrix(),
        }
    }

    pub fn light_data(&self) -> LightUniformData {
        self.light.uniform_data()
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new(Camera::default(), DirectionalLight::default())
    }
}
