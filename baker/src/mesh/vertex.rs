use super::{
    edge::EdgeID,
    half_edge_mesh::{HalfEdgeMesh, MeshError},
};

#[derive(Default, Hash, Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
#[repr(transparent)]
pub struct VertID(pub u32);

impl From<VertID> for usize {
    fn from(value: VertID) -> Self {
        value.0 as usize
    }
}
impl From<usize> for VertID {
    fn from(value: usize) -> Self {
        VertID(value as _)
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Vertex {
    // Edges with vert_origin = this id
    outgoing_edges: Vec<EdgeID>,
    // Edges with destination = this id
    incoming_edges: Vec<EdgeID>,
    /// Candidate for collapse in the group being simplified
    pub selected: bool,
    /// Shared with a region outside the group being simplified, so must not move
    pub locked: bool,
}

impl Vertex {
    pub fn remove_outgoing(&mut self, e: EdgeID) -> Result<(), MeshError> {
        let index = self
            .outgoing_edges
            .iter()
            .position(|&x| x == e)
            .ok_or(MeshError::InvalidEdge(e))?;
        self.outgoing_edges.swap_remove(index);
        Ok(())
    }
    pub fn remove_incoming(&mut self, e: EdgeID) -> Result<(), MeshError> {
        let index = self
            .incoming_edges
            .iter()
            .position(|&x| x == e)
            .ok_or(MeshError::InvalidEdge(e))?;
        self.incoming_edges.swap_remove(index);
        Ok(())
    }
    pub fn add_outgoing(&mut self, e: EdgeID) {
        self.outgoing_edges.push(e);
    }
    pub fn add_incoming(&mut self, e: EdgeID) {
        self.incoming_edges.push(e);
    }

    pub fn outgoing_edges(&self) -> &[EdgeID] {
        self.outgoing_edges.as_ref()
    }

    pub fn incoming_edges(&self) -> &[EdgeID] {
        self.incoming_edges.as_ref()
    }

    pub fn unpack(self) -> (Vec<EdgeID>, Vec<EdgeID>) {
        (self.incoming_edges, self.outgoing_edges)
    }
}

impl VertID {
    pub fn vert(self, mesh: &HalfEdgeMesh) -> &Vertex {
        mesh.verts().get(self)
    }

    pub fn vert_mut(self, mesh: &mut HalfEdgeMesh) -> &mut Vertex {
        mesh.verts_mut().get_mut(self)
    }

    /// Does this vertex have a complete fan of triangles surrounding it?
    pub fn is_local_manifold(self, mesh: &HalfEdgeMesh) -> bool {
        let Ok(vert) = mesh.try_get_vert(self) else {
            return false;
        };

        let Some(&eid_first) = vert.outgoing_edges().first() else {
            return false;
        };

        let mut eid = eid_first;

        for _ in 0..vert.outgoing_edges().len() {
            // Move around the fan, by moving to our twin edge and going to the next edge out of this vertex
            let Some(twin) = eid.edge(mesh).twin else {
                return false;
            };

            eid = twin.edge(mesh).edge_next_ccw;

            if eid == eid_first {
                return true;
            }
        }

        false
    }

    /// Are all the faces around this vertex tagged with the same group?
    pub fn is_group_embedded(self, mesh: &HalfEdgeMesh) -> bool {
        let Ok(vert) = mesh.try_get_vert(self) else {
            return false;
        };

        let mut tags = vert.outgoing_edges().iter().map(|e| e.edge(mesh).tag);

        match tags.next() {
            Some(first) => tags.all(|t| t == first),
            None => false,
        }
    }
}
