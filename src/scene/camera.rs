//! Camera system

use glam::{Mat4, Vec3};

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Orthographic volume of `width` x `height` centered on the view axis
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Projection::Orthographic {
            left: -half_w,
            right: half_w,
            bottom: -half_h,
            top: half_h,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(*fov_y, *aspect, *near, *far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(*left, *right, *bottom, *top, *near, *far),
        }
    }
}

/// Fixed-pose perspective camera
///
/// The pose never changes after construction. Only the projection is
/// recomputed, and only when the output size changes.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees for landscape outputs
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y_degrees: 70.0,
            near: 0.01,
            far: 100.0,
            projection: Projection::perspective(70.0, 16.0 / 9.0, 0.01, 100.0),
        };
        camera.set_viewport(16, 9);
        camera
    }

    pub fn with_fov(mut self, fov_y_degrees: f32) -> Self {
        self.fov_y_degrees = fov_y_degrees;
        self.refresh(self.aspect());
        self
    }

    pub fn with_depth_range(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self.refresh(self.aspect());
        self
    }

    /// Recompute the projection for an output of `width` x `height`.
    ///
    /// Portrait outputs get twice the vertical field of view. A zero-sized
    /// output (minimized window) keeps the previous projection.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.refresh(width as f32 / height as f32);
    }

    fn refresh(&mut self, aspect: f32) {
        let fov = if aspect < 1.0 {
            self.fov_y_degrees * 2.0
        } else {
            self.fov_y_degrees
        };
        self.projection = Projection::perspective(fov, aspect, self.near, self.far);
    }

    pub fn aspect(&self) -> f32 {
        match self.projection {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => (right - left) / (top - bottom),
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fov_of(camera: &Camera) -> f32 {
        match camera.projection() {
            Projection::Perspective { fov_y, .. } => fov_y,
            Projection::Orthographic { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_portrait_doubles_fov() {
        let mut camera = Camera::default();
        camera.set_viewport(1280, 720);
        let landscape = fov_of(&camera);
        assert!((landscape - 70f32.to_radians()).abs() < 1e-6);

        camera.set_viewport(720, 1280);
        assert!((fov_of(&camera) - 2.0 * landscape).abs() < 1e-6);
    }

    #[test]
    fn test_zero_size_keeps_projection() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 600);
        let before = camera.projection_matrix();
        camera.set_viewport(0, 600);
        assert_eq!(camera.projection_matrix(), before);
    }

    #[test]
    fn test_view_does_not_depend_on_viewport() {
        let mut camera = Camera::default();
        let view = camera.view_matrix();
        camera.set_viewport(640, 480);
        assert_eq!(camera.view_matrix(), view);
    }
}
