use bevy_ecs::component::Component;
use common::MeshHierarchy;
use glam::Mat4;

use crate::gpu_records::{ClusterInfo, ErrorInfo};

/// A placement of one of the scene's meshes. The placement itself is the entity's [Transform](super::transform::Transform).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    /// Index into the scene's meshes
    pub mesh: usize,
}

/// World space records for every cluster of every level, level 0 first.
///
/// Triangle ranges are offset by `first_triangle`, the start of the hierarchy's cluster sorted
/// triangles in the merged index buffer.
pub fn instance_records(
    hierarchy: &MeshHierarchy,
    first_triangle: u32,
    local_to_world: &Mat4,
    instance_id: u32,
) -> (Vec<ClusterInfo>, Vec<ErrorInfo>) {
    let mut cluster_info = Vec::with_capacity(hierarchy.cluster_count());
    let mut error_info = Vec::with_capacity(hierarchy.cluster_count());

    let mut level_first_triangle = first_triangle;

    for lod in &hierarchy.lods {
        for (cluster, range) in lod.clusters.iter().zip(lod.cluster_triangle_ranges()) {
            let mut info = ClusterInfo::empty(instance_id);

            info.triangle_start = level_first_triangle + range.start;
            info.triangle_end = level_first_triangle + range.end;

            for &f in &cluster.triangle_indices {
                for p in lod.triangle_positions(f as usize) {
                    info.include_point(local_to_world.transform_point3(p));
                }
            }

            cluster_info.push(info);

            error_info.push(ErrorInfo {
                sphere: cluster.bounding_sphere.transformed(local_to_world).packed().into(),
                parent_sphere: cluster
                    .parent_bounding_sphere
                    .transformed(local_to_world)
                    .packed()
                    .into(),
                error: cluster.normalized_lod_error as f32,
                parent_error: cluster.parent_normalized_error as f32,
            });
        }

        level_first_triangle += lod.face_count() as u32;
    }

    (cluster_info, error_info)
}
