use bevy_ecs::component::Component;
use glam::{Mat4, Quat, Vec3, Vec3A};

#[derive(Debug, Copy, Clone, PartialEq, Component)]
pub struct Transform {
    pos: Vec3A,
    scale: Vec3A,
    rot: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new_pos(Vec3A::ZERO)
    }
}

impl Transform {
    pub fn new_scaled(pos: Vec3A, rot: Quat, scale: Vec3A) -> Self {
        Self { pos, rot, scale }
    }

    pub fn new(pos: Vec3A, rot: Quat) -> Self {
        Self::new_scaled(pos, rot, Vec3A::ONE)
    }

    pub fn new_pos(pos: Vec3A) -> Self {
        Self::new(pos, Quat::IDENTITY)
    }

    pub fn get_pos(&self) -> &Vec3A {
        &self.pos
    }

    pub fn translate(&mut self, translation: Vec3A) {
        self.pos += translation
    }

    /// Direction the local -Z axis faces, which a camera looks along
    pub fn forward(&self) -> Vec3A {
        self.rot.mul_vec3a(Vec3A::NEG_Z)
    }

    /// Turn so [Self::forward] faces `target`
    pub fn look_at(&mut self, target: Vec3A) {
        let dir = target - self.pos;
        if dir.length_squared() > 0.0 {
            self.rot = Quat::from_rotation_arc(Vec3::NEG_Z, dir.normalize().into());
        }
    }

    pub fn get_rot(&self) -> &Quat {
        &self.rot
    }

    pub fn get_rot_mut(&mut self) -> &mut Quat {
        &mut self.rot
    }

    pub fn get_scale(&self) -> &Vec3A {
        &self.scale
    }

    pub fn scale_mut(&mut self) -> &mut Vec3A {
        &mut self.scale
    }

    /// Largest axis scale. Radii are scaled by this, so spheres stay conservative under non-uniform scale.
    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max_element()
    }

    pub fn get_local_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale.into(), self.rot, self.pos.into())
    }
}
