//! Object transforms and the per-draw transform block

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Transform for positioning objects in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn from_rotation_y(angle: f32) -> Self {
        Self {
            rotation: Quat::from_rotation_y(angle),
            ..Default::default()
        }
    }

    /// Get the model matrix for this transform
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Matrices read by every vertex stage, one block per draw
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformUniformData {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light_view: Mat4,
    pub light_projection: Mat4,
}
