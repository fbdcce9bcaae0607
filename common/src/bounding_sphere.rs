use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Default, Clone, Copy, bincode::Decode, bincode::Encode, PartialEq)]
pub struct BoundingSphere {
    center: [f32; 3],
    radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center: center.into(),
            radius,
        }
    }

    /// Approximate minimal sphere around `points`.
    ///
    /// Start from the first point `px`, find the point `py` furthest from it, then the point `pz` furthest from `py`.
    /// The sphere through the midpoint of `py` and `pz` is then grown until it covers every point.
    /// Not a true minimal enclosing sphere, but at most a few percent larger in practice.
    ///
    /// An empty set of points gives a zero sphere at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(&px) = points.first() else {
            return Self::default();
        };

        let furthest_from = |p: Vec3| {
            points
                .iter()
                .copied()
                .max_by(|a, b| a.distance_squared(p).total_cmp(&b.distance_squared(p)))
                .unwrap_or(p)
        };

        let py = furthest_from(px);
        let pz = furthest_from(py);

        let center = (py + pz) * 0.5;
        let mut radius = py.distance(pz) * 0.5;

        for p in points {
            radius = radius.max(p.distance(center));
        }

        Self::new(center, radius)
    }

    pub fn center(&self) -> Vec3 {
        self.center.into()
    }
    pub fn packed(&self) -> Vec4 {
        (self.center(), self.radius).into()
    }
    pub fn set_center(&mut self, center: Vec3) {
        self.center = center.into();
    }
    pub fn translate(&mut self, offset: Vec3) {
        self.center = (self.center() + offset).into();
    }
    pub fn radius(&self) -> f32 {
        self.radius
    }
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }
    pub fn is_empty(&self) -> bool {
        self.radius <= 0.0
    }

    /// Same center, radius multiplied by `scale`.
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            center: self.center,
            radius: self.radius * scale,
        }
    }

    /// Move into the space of `local_to_world`. The radius is scaled by the largest axis scale.
    pub fn transformed(&self, local_to_world: &Mat4) -> Self {
        let scale = local_to_world
            .x_axis
            .truncate()
            .length()
            .max(local_to_world.y_axis.truncate().length())
            .max(local_to_world.z_axis.truncate().length());

        Self::new(
            local_to_world.transform_point3(self.center()),
            self.radius * scale,
        )
    }

    pub fn contains_point(&self, point: Vec3, epsilon: f32) -> bool {
        self.center().distance(point) <= self.radius + epsilon
    }

    /// Wrapper around including a sphere with 0 radius
    pub fn include_point(&mut self, point: Vec3) {
        self.include_sphere(&BoundingSphere::new(point, 0.0))
    }

    /// Shift this bounding sphere so it completely envelops `other`, with the minimal increase in volume.
    pub fn include_sphere(&mut self, other: &BoundingSphere) {
        let towards_other = other.center() - self.center();
        let distance_towards_other = towards_other.length();

        let furthest_point = distance_towards_other + other.radius();

        let increase_needed = furthest_point - self.radius();

        if increase_needed > 0.0 {
            // Shift half this many units towards the other sphere's center, and increase our radius by half of this

            // Small slack so containment survives float rounding
            const ERROR: f32 = 0.001;

            let half_increase_needed = increase_needed / 2.0;

            if distance_towards_other >= half_increase_needed && distance_towards_other > 0.0 {
                let other_dir = towards_other / distance_towards_other;

                self.radius += half_increase_needed + ERROR;
                self.translate(other_dir * half_increase_needed);
            } else {
                // Shift all the way to the other center, and increase radius further
                let rad_increase_needed = increase_needed - distance_towards_other;

                self.radius += rad_increase_needed + ERROR;
                self.set_center(other.center());
            }
        }

        debug_assert!(self.contains_sphere(other));
    }

    pub fn contains_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.center().distance(sphere.center()) + sphere.radius() <= self.radius
    }

    pub fn assert_contains_sphere(&self, sphere: &BoundingSphere) {
        let max_dist = self.center().distance(sphere.center()) + sphere.radius();
        assert!(
            max_dist <= self.radius,
            "{self:?} {sphere:?} MAX DIST - {max_dist}"
        )
    }
}
