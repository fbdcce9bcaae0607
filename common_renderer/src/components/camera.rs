use bevy_ecs::prelude::*;

use glam::Mat4;

use crate::components::transform::Transform;

/// Perspective camera with depth mapped to `0` at the near plane and `1` at the far plane.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Camera {
    aspect: f32,
    fovy: f32,
    znear: f32,
    zfar: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            aspect,
            fovy: 45.0_f32.to_radians(),
            znear: 0.01,
            zfar: 100.0,
        }
    }

    pub fn with_planes(mut self, znear: f32, zfar: f32) -> Self {
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn with_fovy(mut self, fovy: f32) -> Self {
        self.fovy = fovy;
        self
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn build_view_matrix(&self, transform: &Transform) -> Mat4 {
        Mat4::from_rotation_translation(*transform.get_rot(), (*transform.get_pos()).into())
            .inverse()
    }

    pub fn build_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn build_view_projection_matrix(&self, transform: &Transform) -> Mat4 {
        self.build_projection_matrix() * self.build_view_matrix(transform)
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn fovy(&self) -> f32 {
        self.fovy
    }
}
