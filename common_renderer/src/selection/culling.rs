use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use super::{hiz::HiZPyramid, projection::ScreenError};

/// The coarsest acceptable cut: our own error is small enough, and our parents' is not.
pub fn selects(error: ScreenError, threshold: f32) -> bool {
    error.error <= threshold && error.parent_error > threshold
}

/// Frustum planes of a view projection with depth in `0..=1`, normals facing inwards.
pub fn planes_from_mat(mat: Mat4) -> [Vec4; 6] {
    let row = |i| mat.row(i);

    let mut planes = [
        row(3) + row(0),
        row(3) - row(0),
        row(3) + row(1),
        row(3) - row(1),
        // Near plane at z = 0
        row(2),
        row(3) - row(2),
    ];

    for plane in &mut planes {
        *plane *= plane.xyz().length_recip();
    }

    planes
}

fn dist_to_plane(plane: Vec4, point: Vec3) -> f32 {
    plane.xyz().dot(point) + plane.w
}

/// False only when the box lies entirely behind one plane
pub fn aabb_inside_planes(planes: &[Vec4; 6], min: Vec3, max: Vec3) -> bool {
    planes.iter().all(|&plane| {
        // Corner furthest along the plane normal
        let positive = Vec3::select(plane.xyz().cmpge(Vec3::ZERO), max, min);
        dist_to_plane(plane, positive) >= 0.0
    })
}

/// Screen rectangle covered by a sphere, in pixels with the origin at the top left,
/// and the depth of the sphere's nearest point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereFootprint {
    pub min: Vec2,
    pub max: Vec2,
    pub nearest_depth: f32,
}

/// `None` when the sphere reaches the near plane, so nothing can be in front of it.
pub fn sphere_footprint(
    center: Vec3,
    radius: f32,
    view: &Mat4,
    proj: &Mat4,
    znear: f32,
    viewport: Vec2,
) -> Option<SphereFootprint> {
    let view_center = view.transform_point3(center);
    let nearest = -view_center.z - radius;

    if nearest <= znear {
        return None;
    }

    let clip = *proj * Vec4::new(0.0, 0.0, -nearest, 1.0);
    let nearest_depth = clip.z / clip.w;

    let mut min = Vec2::INFINITY;
    let mut max = Vec2::NEG_INFINITY;

    // Project the corners of the sphere's view space box
    for corner in 0..8 {
        let offset = Vec3::new(
            if corner & 1 == 0 { -radius } else { radius },
            if corner & 2 == 0 { -radius } else { radius },
            if corner & 4 == 0 { -radius } else { radius },
        );

        let clip = *proj * (view_center + offset).extend(1.0);
        let ndc = clip.xy() / clip.w;
        let pixel = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5) * viewport;

        min = min.min(pixel);
        max = max.max(pixel);
    }

    Some(SphereFootprint {
        min,
        max,
        nearest_depth,
    })
}

/// Culled only when the sphere's nearest point is behind the farthest occluder over its footprint
pub fn is_occluded(hiz: &HiZPyramid, footprint: Option<SphereFootprint>) -> bool {
    let Some(footprint) = footprint else {
        return false;
    };

    hiz.sample_rect(footprint.min, footprint.max)
        .is_some_and(|occluder| footprint.nearest_depth > occluder)
}
