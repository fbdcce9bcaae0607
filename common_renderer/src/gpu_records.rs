//! Records shared with the compute and raster stages.

use std::io;

use crevice::std430::{AsStd430, Writer};
use glam::{Vec3, Vec4};

/// World space bounds and index range of one cluster of one instance.
#[repr(C)]
#[derive(AsStd430, Clone, Copy, PartialEq, Debug)]
pub struct ClusterInfo {
    pub aabb_min: mint::Vector3<f32>,
    /// First triangle in the merged index buffer
    pub triangle_start: u32,
    pub aabb_max: mint::Vector3<f32>,
    /// One past the last triangle
    pub triangle_end: u32,
    pub instance_id: u32,
}

impl ClusterInfo {
    /// An empty range with inverted bounds, ready to have points merged into it
    pub fn empty(instance_id: u32) -> Self {
        Self {
            aabb_min: Vec3::splat(f32::INFINITY).into(),
            triangle_start: 0,
            aabb_max: Vec3::splat(f32::NEG_INFINITY).into(),
            triangle_end: 0,
            instance_id,
        }
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.aabb_min = self.min().min(p).into();
        self.aabb_max = self.max().max(p).into();
    }

    pub fn min(&self) -> Vec3 {
        self.aabb_min.into()
    }

    pub fn max(&self) -> Vec3 {
        self.aabb_max.into()
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_end.saturating_sub(self.triangle_start)
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }
}

/// Everything error projection needs for one cluster of one instance.
#[repr(C)]
#[derive(AsStd430, Clone, Copy, PartialEq, Debug)]
pub struct ErrorInfo {
    /// World space center in `xyz`, radius in `w`
    pub sphere: mint::Vector4<f32>,
    pub parent_sphere: mint::Vector4<f32>,
    pub error: f32,
    pub parent_error: f32,
}

impl ErrorInfo {
    pub fn sphere(&self) -> Vec4 {
        self.sphere.into()
    }

    pub fn parent_sphere(&self) -> Vec4 {
        self.parent_sphere.into()
    }
}

/// Pack records as an std430 storage buffer
pub fn write_std430<T: AsStd430>(records: &[T]) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut writer = Writer::new(&mut bytes);

    for record in records {
        writer.write(record)?;
    }

    Ok(bytes)
}

/// Layout of `VkDrawIndexedIndirectCommand`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}
