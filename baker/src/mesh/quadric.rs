use std::ops;

/// Quadric type. Internally a DMat4.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct Quadric(pub glam::DMat4);

impl Default for Quadric {
    /// The empty sum, measuring no error anywhere
    fn default() -> Self {
        Quadric(glam::DMat4::ZERO)
    }
}

impl ops::Add for &Quadric {
    type Output = Quadric;

    fn add(self, rhs: Self) -> Self::Output {
        Quadric(self.0 + rhs.0)
    }
}

impl ops::AddAssign<Self> for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

impl Quadric {
    /// Calculate error from Q and vertex, `v^T K_p v`
    pub fn quadric_error(&self, v: glam::Vec3A) -> f64 {
        let v: glam::DVec4 = glam::Vec4::from((v, 1.0)).as_dvec4();
        v.dot(self.0 * v)
    }
}
