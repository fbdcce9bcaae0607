use super::{
    face::FaceID,
    half_edge_mesh::{HalfEdgeMesh, MeshError},
    plane::Plane,
    quadric::Quadric,
    quadric_error::QuadricError,
    vertex::VertID,
};

#[derive(Default, Hash, Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
#[repr(transparent)]
pub struct EdgeID(pub u32);

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct HalfEdge {
    pub vert_origin: VertID,
    // The destination is the origin of the ccw edge
    pub face: FaceID,
    /// Edge connecting into the origin vert
    pub edge_back_cw: EdgeID,
    /// Edge leading on from the dest vert
    pub edge_next_ccw: EdgeID,
    /// Opposite half-edge in the neighbouring face. `None` on a mesh boundary.
    pub twin: Option<EdgeID>,
    /// `group + 1` of the owning face, `0` when unset
    pub tag: u32,
}

impl From<usize> for EdgeID {
    fn from(value: usize) -> Self {
        Self(value as _)
    }
}
impl From<EdgeID> for usize {
    fn from(value: EdgeID) -> Self {
        value.0 as _
    }
}
impl From<u32> for EdgeID {
    fn from(value: u32) -> Self {
        EdgeID(value)
    }
}

/// Walks the edges of one face, following `edge_back_cw`
pub struct EdgeIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: EdgeID,
    current: Option<EdgeID>,
    max_iter: usize,
}

impl<'a> EdgeIter<'a> {
    pub fn new(mesh: &'a HalfEdgeMesh, start: EdgeID, max_iter: usize) -> Self {
        Self {
            mesh,
            start,
            current: Some(start),
            max_iter,
        }
    }
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = EdgeID;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        if self.max_iter == 0 {
            // Broken loop, stop rather than spin
            self.current = None;
            return None;
        }
        self.max_iter -= 1;

        self.current = self
            .mesh
            .try_get_edge(current)
            .ok()
            .map(|e| e.edge_back_cw)
            .filter(|&e| e != self.start);

        Some(current)
    }
}

impl HalfEdge {
    /// Grab the source and destination vertex IDs from this edge.
    /// Source vertex is just `HalfEdge.vert_origin`, destination vertex is `HalfEdge.edge_next_ccw`'s vert_origin
    pub fn src_dst(&self, mesh: &HalfEdgeMesh) -> Result<(VertID, VertID), MeshError> {
        Ok((self.vert_origin, self.dst(mesh)?))
    }

    pub fn dst(&self, mesh: &HalfEdgeMesh) -> Result<VertID, MeshError> {
        Ok(mesh
            .try_get_edge(self.edge_next_ccw)
            .map_err(|_| MeshError::InvalidCCwEdge(self.edge_next_ccw))?
            .vert_origin)
    }
}

impl EdgeID {
    pub fn src_dst(self, mesh: &HalfEdgeMesh) -> Result<(VertID, VertID), MeshError> {
        mesh.try_get_edge(self)?.src_dst(mesh)
    }

    pub fn edge(self, mesh: &HalfEdgeMesh) -> &HalfEdge {
        mesh.edges().get(self)
    }
    pub fn edge_mut(self, mesh: &mut HalfEdgeMesh) -> &mut HalfEdge {
        mesh.edges_mut().get_mut(self)
    }

    /// Evaluate if any restrictions on edge collapse apply to this edge, moving the origin onto the destination.
    ///
    /// Current restrictions:
    /// - The origin must be selected and unlocked, the destination selected.
    /// - Cannot collapse with connected triangles which would cause an overlap.
    /// - Cannot flip normals of any triangles when collapsing.
    pub fn can_collapse_edge(self, mesh: &HalfEdgeMesh) -> Result<bool, MeshError> {
        let (orig, dest) = self.src_dst(mesh)?;

        let v_orig = mesh.try_get_vert(orig)?;
        let v_dest = mesh.try_get_vert(dest)?;

        if !v_orig.selected || v_orig.locked || !v_dest.selected {
            return Ok(false);
        }

        if !mesh.max_one_joint_neighbour_vertices_per_side(self)? {
            return Ok(false);
        }

        let new_corner = mesh.position(dest);

        // Test normals of triangles before and after the move
        for &e in v_orig.outgoing_edges() {
            let fid = e.edge(mesh).face;
            let tri = mesh.triangle_from_face(fid)?;

            if tri.contains(&dest) {
                // Removed by the collapse
                continue;
            }

            let corners = tri.map(|v| mesh.position(v));
            let moved = tri.map(|v| if v == orig { new_corner } else { mesh.position(v) });

            let starting_plane = Plane::from_three_points(corners[0], corners[1], corners[2]);
            let end_plane = Plane::from_three_points(moved[0], moved[1], moved[2]);

            if starting_plane.normal().dot(end_plane.normal()) <= 0.0 {
                // Flipped or degenerate triangle
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Estimate the error introduced by collapsing this edge. Does not take into account penalties from flipping triangles
    pub fn edge_collapse_error(
        self,
        mesh: &HalfEdgeMesh,
        quadrics: &[Quadric],
    ) -> Result<QuadricError, MeshError> {
        let (orig, dest) = self.src_dst(mesh)?;

        // Collapsing moves the origin onto the destination, so the merged quadric is measured there
        let q = &quadrics[usize::from(orig)] + &quadrics[usize::from(dest)];

        let error = q.quadric_error(mesh.position(dest));

        if error.is_nan() {
            return Err(MeshError::NanError(self, orig, dest));
        }

        // Rounding can leave a tiny negative value for a positive semi-definite quadric
        Ok(QuadricError::new(error.max(0.0), self))
    }
}
