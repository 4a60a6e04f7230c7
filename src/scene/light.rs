//! Shadow-casting directional light

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

use super::camera::Projection;

/// Directional light (like the sun) that also owns the shadow-map camera
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub diffuse: Vec4,
    pub ambient: Vec4,
    /// Normalized direction the light travels in
    pub direction: Vec3,
    /// Distance of the shadow camera from the origin, against `direction`
    pub distance: f32,
    /// Width and height of the orthographic shadow volume
    pub extent: f32,
    pub up: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            diffuse: Vec4::new(0.6, 0.6, 0.6, 1.0),
            ambient: Vec4::new(0.4, 0.4, 0.4, 1.0),
            direction: Vec3::new(-(3.0f32 / 4.0).sqrt(), -(1.0f32 / 4.0).sqrt(), 0.0),
            distance: 12.0,
            extent: 12.0,
            up: Vec3::new(0.0, 0.1, 0.0),
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vec3, diffuse: Vec4, ambient: Vec4) -> Self {
        Self {
            direction: direction.normalize(),
            diffuse,
            ambient,
            ..Default::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(-self.distance * self.direction, Vec3::ZERO, self.up)
    }

    /// Orthographic volume reaching from the light to twice its distance
    pub fn projection_matrix(&self) -> Mat4 {
        Projection::orthographic(self.extent, self.extent, 0.0, 2.0 * self.distance).matrix()
    }

    /// Spin the direction about +Y
    pub fn rotate_y(&mut self, angle: f32) {
        self.direction = (Quat::from_rotation_y(angle) * self.direction).normalize();
    }

    pub fn uniform_data(&self) -> LightUniformData {
        LightUniformData {
            diffuse: self.diffuse,
            ambient: self.ambient,
            direction: self.direction,
            _padding: 0.0,
        }
    }
}

/// Light parameter block read by the scene and overlay pixel stages
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniformData {
    pub diffuse: Vec4,
    pub ambient: Vec4,
    pub direction: Vec3,
    pub _padding: f32,
}
