use glam::{Mat4, UVec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::{gpu_records::ErrorInfo, scene::CameraUniformBufferObject};

/// Screen space error of a cluster and of its parents, in pixels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenError {
    pub error: f32,
    pub parent_error: f32,
}

/// Pixels covered by one world unit at distance one, vertically
pub fn pixels_per_unit(proj: &Mat4, viewport: UVec2) -> f32 {
    proj.y_axis.y * viewport.y as f32 * 0.5
}

/// Project a normalized error living on `sphere` to pixels.
///
/// The error is scaled back to world units by the radius, then divided by the distance to the
/// nearest point of the sphere, clamped to the near plane. A parent sphere encloses its children
/// and carries a larger normalized error, so a parent never projects smaller than a child.
/// Empty spheres project to infinity and are never selected.
pub fn project_sphere_error(
    sphere: Vec4,
    normalized_error: f32,
    cam_pos: Vec3,
    znear: f32,
    pixels_per_unit: f32,
) -> f32 {
    let radius = sphere.w;
    if radius <= 0.0 {
        return f32::INFINITY;
    }

    let distance = (sphere.truncate().distance(cam_pos) - radius).max(znear);

    normalized_error.max(0.0).sqrt() * radius * pixels_per_unit / distance
}

pub fn project_errors(
    errors: &[ErrorInfo],
    camera: &CameraUniformBufferObject,
    viewport: UVec2,
) -> Vec<ScreenError> {
    let ppu = pixels_per_unit(&camera.proj, viewport);

    errors
        .par_iter()
        .map(|e| ScreenError {
            error: project_sphere_error(e.sphere(), e.error, camera.cam_pos, camera.znear, ppu),
            parent_error: project_sphere_error(
                e.parent_sphere(),
                e.parent_error,
                camera.cam_pos,
                camera.znear,
                ppu,
            ),
        })
        .collect()
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_error_falls_with_distance() {
        let sphere = Vec4::new(0.0, 0.0, -10.0, 1.0);

        let near = project_sphere_error(sphere, 0.25, Vec3::ZERO, 0.01, 100.0);
        let far = project_sphere_error(sphere, 0.25, Vec3::new(0.0, 0.0, 10.0), 0.01, 100.0);

        // sqrt(0.25) * 1 * 100 / 9
        assert!((near - 50.0 / 9.0).abs() < 1e-4);
        assert!(far < near);
    }

    #[test]
    fn test_inside_sphere_clamps_to_near_plane() {
        let sphere = Vec4::new(0.0, 0.0, 0.0, 2.0);

        let error = project_sphere_error(sphere, 1.0, Vec3::ZERO, 0.5, 10.0);
        assert_eq!(error, 40.0);
    }

    #[test]
    fn test_empty_sphere_never_selected() {
        let error = project_sphere_error(Vec4::new(0.0, 0.0, -1.0, 0.0), 0.0, Vec3::ZERO, 0.1, 10.0);
        assert_eq!(error, f32::INFINITY);
    }

    #[test]
    fn test_parent_projects_larger() {
        let child = Vec4::new(1.0, 0.0, -5.0, 0.5);
        let parent = Vec4::new(1.2, 0.0, -5.0, 1.0);

        for cam in [Vec3::ZERO, Vec3::new(1.0, 0.0, -3.0), Vec3::new(-20.0, 4.0, 2.0)] {
            let c = project_sphere_error(child, 0.1, cam, 0.01, 500.0);
            let p = project_sphere_error(parent, 0.1 + f32::EPSILON, cam, 0.01, 500.0);
            assert!(p >= c, "{p} < {c} from {cam}");
        }
    }
}
