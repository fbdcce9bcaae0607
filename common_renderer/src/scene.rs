use std::io;

use bevy_ecs::prelude::*;
use common::{MeshHierarchy, MeshVert};
use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::{
    components::{
        camera::Camera,
        instance::{instance_records, Instance},
        transform::Transform,
    },
    gpu_records::{write_std430, ClusterInfo, ErrorInfo},
};

#[derive(Debug, Clone, Copy, Event)]
pub enum SceneEvent {
    UpdateInstanceBuffers,
}

#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniformBufferObject {
    pub model: Mat4,
    pub inv_model: Mat4,
}

impl ModelUniformBufferObject {
    pub fn new(model: Mat4) -> Self {
        Self {
            model,
            inv_model: model.inverse(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniformBufferObject {
    pub view_proj: Mat4,
    // Freezable copies for culling calculations
    pub culling_view_proj: Mat4,
    pub culling_view: Mat4,
    pub proj: Mat4,
    pub cam_pos: Vec3,
    pub target_error: f32,
    pub znear: f32,
    _pad: [f32; 3],
}

impl Default for CameraUniformBufferObject {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, 1.0, 0.01)
    }
}

impl CameraUniformBufferObject {
    pub fn new(view: Mat4, proj: Mat4, cam_pos: Vec3, target_error: f32, znear: f32) -> Self {
        let view_proj = proj * view;

        Self {
            view_proj,
            culling_view_proj: view_proj,
            culling_view: view,
            proj,
            cam_pos,
            target_error,
            znear,
            _pad: [0.0; 3],
        }
    }

    /// Move the view. While `frozen`, culling keeps using the old one.
    pub fn update_view_proj(&mut self, view: Mat4, proj: Mat4, cam_pos: Vec3, frozen: bool) {
        self.view_proj = proj * view;
        if !frozen {
            self.culling_view_proj = self.view_proj;
            self.culling_view = view;
            self.proj = proj;
            self.cam_pos = cam_pos;
        }
    }
}

/// A deduplicated mesh and where it lives in the merged buffers
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub hierarchy: MeshHierarchy,
    pub first_vertex: u32,
    pub first_triangle: u32,
}

/// Every mesh and instance to draw, with the merged buffers the GPU stages read.
#[derive(Resource, Default)]
pub struct Scene {
    meshes: Vec<SceneMesh>,
    instance_transforms: Vec<Transform>,

    pub verts: Vec<MeshVert>,
    /// Cluster sorted triangles of every level of every mesh
    pub indices: Vec<u32>,
    pub cluster_info: Vec<ClusterInfo>,
    pub error_info: Vec<ErrorInfo>,
    pub model_uniforms: Vec<ModelUniformBufferObject>,

    pub uniform_camera: CameraUniformBufferObject,
    pub target_error: f32,
    pub freeze_culling: bool,
}

impl Scene {
    pub fn new(target_error: f32) -> Self {
        Self {
            target_error,
            ..Default::default()
        }
    }

    /// Add a mesh, returning its index. A mesh the same shape as one already added is shared.
    pub fn add_mesh(&mut self, hierarchy: MeshHierarchy) -> usize {
        if let Some(existing) = self
            .meshes
            .iter()
            .position(|m| m.hierarchy.same_shape(&hierarchy))
        {
            log::debug!("Sharing mesh {existing} with {}", hierarchy.name);
            return existing;
        }

        let geometry = hierarchy.flatten();
        let first_vertex = self.verts.len() as u32;
        let first_triangle = (self.indices.len() / 3) as u32;

        self.verts.extend_from_slice(&geometry.verts);
        self.indices
            .extend(geometry.indices.iter().map(|&i| i + first_vertex));

        log::info!(
            "Added mesh {} with {} levels, {} clusters",
            hierarchy.name,
            hierarchy.level_count(),
            hierarchy.cluster_count()
        );

        self.meshes.push(SceneMesh {
            hierarchy,
            first_vertex,
            first_triangle,
        });

        self.meshes.len() - 1
    }

    pub fn meshes(&self) -> &[SceneMesh] {
        &self.meshes
    }

    pub fn instance_count(&self) -> usize {
        self.instance_transforms.len()
    }

    /// Rebuild the world space records of every instance. Instance ids are positions in `instances`.
    pub fn set_instances(&mut self, instances: &[(Instance, Transform)]) {
        let records: Vec<_> = instances
            .par_iter()
            .enumerate()
            .filter_map(|(id, (instance, transform))| {
                let Some(mesh) = self.meshes.get(instance.mesh) else {
                    log::warn!("Instance {id} uses missing mesh {}", instance.mesh);
                    return None;
                };

                Some(instance_records(
                    &mesh.hierarchy,
                    mesh.first_triangle,
                    &transform.get_local_to_world(),
                    id as u32,
                ))
            })
            .collect();

        self.cluster_info.clear();
        self.error_info.clear();
        for (clusters, errors) in records {
            self.cluster_info.extend(clusters);
            self.error_info.extend(errors);
        }

        self.instance_transforms = instances.iter().map(|(_, t)| *t).collect();
        self.model_uniforms = self
            .instance_transforms
            .iter()
            .map(|t| ModelUniformBufferObject::new(t.get_local_to_world()))
            .collect();
    }

    pub fn update_camera_uniform(&mut self, camera: &Camera, camera_transform: &Transform) {
        self.uniform_camera.update_view_proj(
            camera.build_view_matrix(camera_transform),
            camera.build_projection_matrix(),
            (*camera_transform.get_pos()).into(),
            self.freeze_culling,
        );
        self.uniform_camera.target_error = self.target_error;
        self.uniform_camera.znear = camera.znear();
    }

    pub fn cluster_info_buffer(&self) -> io::Result<Vec<u8>> {
        write_std430(&self.cluster_info)
    }

    pub fn error_info_buffer(&self) -> io::Result<Vec<u8>> {
        write_std430(&self.error_info)
    }
}

pub fn process_scene_events(
    mut scene: ResMut<Scene>,
    mut event_read: EventReader<SceneEvent>,
    instances: Query<(&Instance, &Transform)>,
) {
    for e in event_read.read() {
        match e {
            SceneEvent::UpdateInstanceBuffers => {
                let instances: Vec<_> = instances.iter().map(|(i, t)| (*i, *t)).collect();
                scene.set_instances(&instances);

                log::info!(
                    "{} instances, {} cluster records",
                    instances.len(),
                    scene.cluster_info.len()
                );
            }
        }
    }
}

pub fn update_camera_uniform(mut scene: ResMut<Scene>, cameras: Query<(&Camera, &Transform)>) {
    if let Some((camera, transform)) = cameras.iter().next() {
        scene.update_camera_uniform(camera, transform);
    }
}
