#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, bincode::Decode, bincode::Encode, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct MeshVert {
    pub pos: [f32; 4],
    pub normal: [f32; 4],
    pub uv: [f32; 2],
    _pad: [f32; 2],
}

impl MeshVert {
    pub fn new(pos: glam::Vec3, normal: glam::Vec3, uv: glam::Vec2) -> Self {
        Self {
            pos: [pos.x, pos.y, pos.z, 1.0],
            normal: [normal.x, normal.y, normal.z, 0.0],
            uv: uv.into(),
            _pad: [0.0; 2],
        }
    }

    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::from_slice(&self.pos[..3])
    }

    pub fn normal(&self) -> glam::Vec3 {
        glam::Vec3::from_slice(&self.normal[..3])
    }

    pub fn uv(&self) -> glam::Vec2 {
        self.uv.into()
    }

    pub fn set_normal(&mut self, normal: glam::Vec3) {
        self.normal = [normal.x, normal.y, normal.z, 0.0];
    }
}
