use glam::Vec3A;

use super::{
    edge::EdgeID,
    half_edge_mesh::{HalfEdgeMesh, MeshError},
    plane::Plane,
};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Face {
    pub edge: EdgeID,
    pub cluster_idx: usize,
}

#[derive(Default, Hash, Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
#[repr(transparent)]
pub struct FaceID(pub u32);

impl From<FaceID> for usize {
    fn from(value: FaceID) -> Self {
        value.0 as usize
    }
}

impl From<usize> for FaceID {
    fn from(value: usize) -> Self {
        FaceID(value as _)
    }
}

impl FaceID {
    pub fn face(self, mesh: &HalfEdgeMesh) -> &Face {
        mesh.faces().get(self)
    }

    pub fn face_mut(self, mesh: &mut HalfEdgeMesh) -> &mut Face {
        mesh.faces_mut().get_mut(self)
    }

    pub fn center(self, mesh: &HalfEdgeMesh) -> Result<Vec3A, MeshError> {
        let [a, b, c] = mesh.triangle_from_face(self)?;

        Ok((mesh.position(a) + mesh.position(b) + mesh.position(c)) / 3.0)
    }

    /// Generate plane from the 3 points a,b,c on this face.
    pub fn plane(self, mesh: &HalfEdgeMesh) -> Result<Plane, MeshError> {
        let [a, b, c] = mesh.triangle_from_face(self)?;

        Ok(Plane::from_three_points(
            mesh.position(a),
            mesh.position(b),
            mesh.position(c),
        ))
    }

    pub fn area(self, mesh: &HalfEdgeMesh) -> Result<f32, MeshError> {
        let [a, b, c] = mesh.triangle_from_face(self)?.map(|v| mesh.position(v));

        Ok((b - a).cross(c - a).length() * 0.5)
    }

    /// Tag shared by the three half-edges of this face
    pub fn tag(self, mesh: &HalfEdgeMesh) -> u32 {
        self.face(mesh).edge.edge(mesh).tag
    }
}
