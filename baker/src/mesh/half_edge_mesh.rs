use anyhow::Context;
use common::{MeshVert, TriMesh};
use glam::Vec3A;

use std::collections::{HashMap, HashSet};

use super::{
    edge::{EdgeID, EdgeIter, HalfEdge},
    face::{Face, FaceID},
    pidge::Pidge,
    vertex::{VertID, Vertex},
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Invalid triangle {0:?}")]
    InvalidFace(FaceID),
    #[error("Invalid edge {0:?}")]
    InvalidEdge(EdgeID),
    #[error("Invalid vertex {0:?}")]
    InvalidVertex(VertID),
    #[error("{0:?} Has two edges with same property {1:?}, {2:?}")]
    DuplicateEdges(VertID, EdgeID, EdgeID),
    #[error("Cw piece of edge {0:?} is invalid")]
    InvalidCwEdge(EdgeID),
    #[error("Twin of edge {0:?} is invalid")]
    InvalidTwin(EdgeID),
    #[error("CCw piece of edge {0:?} is invalid")]
    InvalidCCwEdge(EdgeID),
    #[error("Edge {0:?} bridges a single vertex {1:?}")]
    SingletonEdge(EdgeID, VertID),
    #[error("Failed edge collapse on {0:?}, {1:?} -> {2:?}")]
    EdgeCollapse(EdgeID, VertID, VertID),
    #[error("Collapse error of edge {0:?} between {1:?} and {2:?} is NaN")]
    NanError(EdgeID, VertID, VertID),
    #[error("Triangle Already Exists")]
    EdgeExists(EdgeID),
}

/// Triangle mesh with half-edge connectivity.
///
/// Edge ids are always `face * 3 + k`, so a face's edges can be found without indirection.
/// Every half-edge belongs to a face; a missing twin marks a mesh boundary.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    faces: Pidge<FaceID, Face>,
    edges: Pidge<EdgeID, HalfEdge>,
    verts: Pidge<VertID, Vertex>,
    /// Attributes of every vertex, indexed by [VertID]. Entries of removed vertices are kept until [HalfEdgeMesh::garbage_collect]
    vert_data: Vec<MeshVert>,
}

impl HalfEdgeMesh {
    pub fn with_capacity(faces: usize, verts: usize) -> Self {
        Self {
            faces: Pidge::with_capacity(faces),
            edges: Pidge::with_capacity(faces * 3),
            verts: Pidge::with_capacity(verts),
            vert_data: Vec::with_capacity(verts),
        }
    }

    pub fn try_get_face(&self, fid: FaceID) -> Result<&Face, MeshError> {
        self.faces.try_get(fid).ok_or(MeshError::InvalidFace(fid))
    }

    pub fn try_get_edge(&self, eid: EdgeID) -> Result<&HalfEdge, MeshError> {
        self.edges.try_get(eid).ok_or(MeshError::InvalidEdge(eid))
    }

    pub fn try_get_edge_mut(&mut self, eid: EdgeID) -> Result<&mut HalfEdge, MeshError> {
        self.edges
            .try_get_mut(eid)
            .ok_or(MeshError::InvalidEdge(eid))
    }

    pub fn try_get_vert(&self, vid: VertID) -> Result<&Vertex, MeshError> {
        self.verts.try_get(vid).ok_or(MeshError::InvalidVertex(vid))
    }

    pub fn try_get_vert_mut(&mut self, vid: VertID) -> Result<&mut Vertex, MeshError> {
        self.verts
            .try_get_mut(vid)
            .ok_or(MeshError::InvalidVertex(vid))
    }

    fn get_vert_or_default(&mut self, vid: VertID) -> &mut Vertex {
        if !self.verts.slot_full(vid) {
            self.verts.insert(vid, Vertex::default());
        }
        vid.vert_mut(self)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn vert_data(&self) -> &[MeshVert] {
        &self.vert_data
    }

    pub fn position(&self, vid: VertID) -> Vec3A {
        self.vert_data[usize::from(vid)].position().into()
    }

    pub fn iter_edge_loop(&self, e: EdgeID) -> impl Iterator<Item = EdgeID> + '_ {
        // emit 3 edges and a none
        EdgeIter::new(self, e, 3)
    }

    /// Vertices of a face, starting with the origin of `face.edge`
    pub fn triangle_from_face(&self, fid: FaceID) -> Result<[VertID; 3], MeshError> {
        let face = self.try_get_face(fid)?;

        let first = self.try_get_edge(face.edge)?;
        let next = self
            .try_get_edge(first.edge_next_ccw)
            .map_err(|_| MeshError::InvalidCCwEdge(face.edge))?;
        let back = self
            .try_get_edge(first.edge_back_cw)
            .map_err(|_| MeshError::InvalidCwEdge(face.edge))?;

        Ok([first.vert_origin, next.vert_origin, back.vert_origin])
    }

    /// Triangle list of every face, in face order
    pub fn triangle_indices(&self) -> Result<Vec<u32>, MeshError> {
        let mut indices = Vec::with_capacity(self.face_count() * 3);

        for fid in self.faces.iter_keys() {
            indices.extend(self.triangle_from_face(fid)?.map(|v| v.0));
        }

        Ok(indices)
    }

    /// Build connectivity for a triangle soup. Degenerate triangles and triangles that would duplicate
    /// an existing directed edge are discarded, so face ids stay dense.
    pub fn from_tri_mesh(tri_mesh: &TriMesh) -> Self {
        let face_count = tri_mesh.face_count();
        let mut mesh = HalfEdgeMesh::with_capacity(face_count, tri_mesh.verts.len());
        mesh.vert_data = tri_mesh.mesh_verts();

        let bar = indicatif::ProgressBar::new(face_count as u64);

        let mut current = FaceID(0);
        let mut degenerate = 0;
        let mut duplicated = 0;

        for tri in tri_mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(VertID);

            if a == b || b == c || a == c {
                degenerate += 1;
            } else {
                match mesh.add_tri(current, a, b, c) {
                    Ok(_) => {
                        current.0 += 1;
                    }
                    Err(_) => duplicated += 1,
                };
            }

            bar.inc(1);
        }
        bar.finish_and_clear();

        if degenerate > 0 {
            log::warn!("Discarded {degenerate} zero area triangles");
        }
        if duplicated > 0 {
            log::warn!("Discarded {duplicated} potentially duplicated triangles");
        }

        mesh
    }

    fn find_edge(&self, a: VertID, b: VertID) -> Option<EdgeID> {
        let v = self.try_get_vert(a).ok()?;

        v.outgoing_edges()
            .iter()
            .find(|&&p| p.edge(self).dst(self).ok() == Some(b))
            .copied()
    }

    fn add_half_edge(
        &mut self,
        orig: VertID,
        dest: VertID,
        face: FaceID,
        eid: EdgeID,
        edge_back_cw: EdgeID,
        edge_next_ccw: EdgeID,
    ) {
        let twin = self.find_edge(dest, orig);

        let e = HalfEdge {
            vert_origin: orig,
            face,
            edge_back_cw,
            edge_next_ccw,
            twin,
            tag: 0,
        };

        if let Some(twin_eid) = twin {
            twin_eid.edge_mut(self).twin = Some(eid)
        }

        self.get_vert_or_default(orig).add_outgoing(eid);

        self.get_vert_or_default(dest).add_incoming(eid);

        self.edges_mut().insert(eid, e);
    }

    /// Add the triangle `a, b, c` as face `f`, with edges `f*3` (a->b), `f*3+2` (b->c), and `f*3+1` (c->a).
    pub fn add_tri(&mut self, f: FaceID, a: VertID, b: VertID, c: VertID) -> Result<(), MeshError> {
        for (o, d) in [(a, b), (b, c), (c, a)] {
            if let Some(e) = self.find_edge(o, d) {
                return Err(MeshError::EdgeExists(e));
            }
        }

        let edge_center = (f.0 * 3).into();
        let edge_back_cw = (f.0 * 3 + 1).into();
        let edge_next_ccw = (f.0 * 3 + 2).into();

        //     b   e    a
        //     next  prev
        //         c

        self.add_half_edge(a, b, f, edge_center, edge_back_cw, edge_next_ccw);
        self.add_half_edge(b, c, f, edge_next_ccw, edge_center, edge_back_cw);
        self.add_half_edge(c, a, f, edge_back_cw, edge_next_ccw, edge_center);

        self.faces_mut().insert(
            f,
            Face {
                edge: edge_center,
                cluster_idx: 0,
            },
        );

        Ok(())
    }

    /// Set the tag of all three half-edges of `fid`
    pub fn set_face_tag(&mut self, fid: FaceID, tag: u32) -> Result<(), MeshError> {
        let first = self.try_get_face(fid)?.edge;
        let loop_edges: Vec<_> = self.iter_edge_loop(first).collect();

        for e in loop_edges {
            self.try_get_edge_mut(e)?.tag = tag;
        }
        Ok(())
    }

    pub fn clear_flags(&mut self) {
        for v in self.verts.iter_mut() {
            v.selected = false;
            v.locked = false;
        }
    }

    fn neighbour_vertices(&self, v: &Vertex) -> Result<HashSet<VertID>, MeshError> {
        // This is the exact number of neighbours, assuming this is a manifold vertex, otherwise it will still be pretty close.
        let mut neighbours = HashSet::with_capacity(v.incoming_edges().len() + 1);

        for &e in v.incoming_edges() {
            neighbours.insert(self.try_get_edge(e)?.vert_origin);
        }
        for &e in v.outgoing_edges() {
            neighbours.insert(self.try_get_edge(e)?.dst(self)?);
        }

        Ok(neighbours)
    }

    /// Does this edge have the right amount of shared neighbours for edge collapse.
    /// Two when the edge has a twin, one on a mesh boundary.
    ///
    /// Logic sourced from https://stackoverflow.com/a/27049418
    pub fn max_one_joint_neighbour_vertices_per_side(&self, eid: EdgeID) -> Result<bool, MeshError> {
        let (src, dst) = eid.src_dst(self)?;

        let n0 = self.neighbour_vertices(self.try_get_vert(src)?)?;
        let n1 = self.neighbour_vertices(self.try_get_vert(dst)?)?;

        let joint_shared = n0.intersection(&n1).count();
        let has_twin = self.try_get_edge(eid)?.twin.is_some();

        Ok(has_twin && joint_shared == 2 || !has_twin && joint_shared == 1)
    }

    /// Collapse an edge so it no longer exists, the source vertex is no longer referenced,
    /// 	A
    ///   /	^ \
    ///  C	|  D
    ///   \	| /
    /// 	B
    ///
    /// Preconditions:
    ///  - `eid` is a valid edge
    ///  - `eid.face` is a valid face
    ///  - A and B have exactly two joint neighbours
    ///
    /// Postconditions:
    ///  - `eid` is an invalid edge.
    ///  - `eid.face` and `eid.twin?.face` are invalid faces
    pub fn collapse_edge(&mut self, eid: EdgeID) -> anyhow::Result<()> {
        let (vid_orig, vid_dest) = eid.src_dst(self)?;

        let edge = self
            .collapse_tri(eid)
            .context("Failed to collapse main triangle")
            .context(MeshError::EdgeCollapse(eid, vid_orig, vid_dest))?;

        if let Some(e0t) = edge.twin {
            self.collapse_tri(e0t)
                .context("Failed to collapse twin triangle")
                .context(MeshError::EdgeCollapse(eid, vid_orig, vid_dest))?;
        }

        // Remove `vert_origin`
        self.wipe_vert(vid_orig, vid_dest)
            .context(MeshError::EdgeCollapse(eid, vid_orig, vid_dest))?;

        #[cfg(debug_assertions)]
        {
            self.assert_vertex_valid(vid_dest)
                .context(MeshError::EdgeCollapse(eid, vid_orig, vid_dest))?;
        }

        Ok(())
    }

    /// Collapse a triangle, removing it from the graph, and pulling the two triangles on non-eid edges together
    /// 	A
    ///  	| 1
    ///  	0  D
    ///   	| 2
    /// 	B
    /// Preconditions: A valid triangle on valid edge `eid`
    /// Postconditions:
    /// - `eid` no longer valid, triangle removed,
    /// - The twins of the two non-eid edges are linked, despite not actually being opposites (invalid)
    /// - No edges have been moved
    ///
    /// This function should only be called as part of an edge collapse, as leaves mesh partially invalid.
    /// Returns:
    /// 	The halfedge eid collapsed into nothing and removed
    fn collapse_tri(&mut self, eid: EdgeID) -> anyhow::Result<HalfEdge> {
        let fid = self.try_get_edge(eid)?.face;

        let (_f, eids, [e0, e1, e2]) = self.wipe_face(fid)?;

        // we are pinching edge `eid` to nothing, so make the other two edges twins
        let (o1, o0, t) = match eid {
            eid if eid == eids[0] => (e1, e2, e0),
            eid if eid == eids[1] => (e0, e2, e1),
            eid if eid == eids[2] => (e0, e1, e2),
            _ => anyhow::bail!(MeshError::InvalidFace(fid)),
        };

        if let Some(t) = o1.twin {
            self.try_get_edge_mut(t)?.twin = o0.twin;
        }
        if let Some(t) = o0.twin {
            self.try_get_edge_mut(t)?.twin = o1.twin;
        }

        Ok(t)
    }

    pub fn wipe_face(
        &mut self,
        face: FaceID,
    ) -> Result<(Face, [EdgeID; 3], [HalfEdge; 3]), MeshError> {
        let f = self.faces.wipe(face).ok_or(MeshError::InvalidFace(face))?;
        let edge = self.wipe_edge(f.edge)?;

        let tri = [f.edge, edge.edge_next_ccw, edge.edge_back_cw];

        let edges = [edge, self.wipe_edge(tri[1])?, self.wipe_edge(tri[2])?];

        // Remove any references to this triangle
        for i in 0..3 {
            let v_o = self.try_get_vert_mut(edges[i].vert_origin)?;

            v_o.remove_outgoing(tri[i])?;
            v_o.remove_incoming(edges[i].edge_back_cw)?;
        }

        Ok((f, tri, edges))
    }

    /// Remove an edge from the mesh.
    /// For this to be valid, the cw and ccw edges must also be wiped,
    /// so this function is non public
    fn wipe_edge(&mut self, edge: EdgeID) -> Result<HalfEdge, MeshError> {
        let e = self.edges.wipe(edge).ok_or(MeshError::InvalidEdge(edge))?;

        // Consistency - neighbours must not reference this
        if let Some(t) = e.twin {
            if let Some(twin) = self.edges.try_get_mut(t) {
                twin.twin = None;
            }
        }

        Ok(e)
    }

    /// Remove the vert `vid`, and shift any edges that reference it to `replacement`.
    pub fn wipe_vert(&mut self, vid: VertID, replacement: VertID) -> Result<(), MeshError> {
        // Every incoming edge is the back edge of an outgoing edge in the same face,
        // so moving the outgoing edges moves both.
        let (_incomings, outgoings) = self
            .verts
            .wipe(vid)
            .ok_or(MeshError::InvalidVertex(vid))?
            .unpack();

        for outgoing in outgoings {
            let outgoing_edge = self.try_get_edge_mut(outgoing)?;
            outgoing_edge.vert_origin = replacement;
            let outgoing_prev = outgoing_edge.edge_back_cw;

            // Moving this origin moves both the start of this edge and the dest of the previous edge
            let v = self.try_get_vert_mut(replacement)?;
            v.add_outgoing(outgoing);
            v.add_incoming(outgoing_prev);
        }

        Ok(())
    }

    /// Rebuild with dense face and vertex ids, dropping removed elements and unreferenced vertex data.
    /// Faces keep their relative order, tags and clusters.
    pub fn garbage_collect(&mut self) -> Result<(), MeshError> {
        let mut vert_remap = vec![u32::MAX; self.vert_data.len()];
        let mut vert_data = Vec::with_capacity(self.verts.len());
        let mut tris = Vec::with_capacity(self.faces.len());

        for (fid, face) in self.faces.iter_items() {
            let tri = self.triangle_from_face(fid)?.map(|v| {
                let new = &mut vert_remap[usize::from(v)];
                if *new == u32::MAX {
                    *new = vert_data.len() as u32;
                    vert_data.push(self.vert_data[usize::from(v)]);
                }
                VertID(*new)
            });

            tris.push((tri, fid.tag(self), face.cluster_idx));
        }

        let mut mesh = HalfEdgeMesh::with_capacity(tris.len(), vert_data.len());
        mesh.vert_data = vert_data;

        let mut current = FaceID(0);
        for ([a, b, c], tag, cluster_idx) in tris {
            match mesh.add_tri(current, a, b, c) {
                Ok(()) => {
                    mesh.set_face_tag(current, tag)?;
                    current.face_mut(&mut mesh).cluster_idx = cluster_idx;
                    current.0 += 1;
                }
                Err(e) => log::warn!("Dropping face during garbage collection: {e}"),
            }
        }

        *self = mesh;
        Ok(())
    }

    pub fn assert_valid(&self) -> anyhow::Result<()> {
        for fid in self.faces().iter_keys() {
            self.assert_face_valid(fid).context("Invalid Mesh")?;
        }
        for vid in self.verts().iter_keys() {
            self.assert_vertex_valid(vid).context("Invalid Mesh")?;
        }
        Ok(())
    }

    pub fn assert_face_valid(&self, fid: FaceID) -> anyhow::Result<()> {
        let f = self.try_get_face(fid)?;
        let tri: Vec<_> = self.iter_edge_loop(f.edge).collect();

        if tri.len() != 3 || self.try_get_edge(tri[2])?.edge_back_cw != f.edge {
            Err(MeshError::InvalidFace(fid)).context("Tri does not have 3 edges")?;
        }

        for &e in &tri {
            self.assert_edge_valid(e)
                .context(MeshError::InvalidFace(fid))?;

            if e.edge(self).face != fid {
                Err(MeshError::InvalidFace(fid)).context("Edge belongs to another face")?
            }

            if let Some(t) = e.edge(self).twin {
                if tri.contains(&t) {
                    Err(MeshError::InvalidFace(fid)).context("Tri neighbours itself")?
                }
            }
        }
        Ok(())
    }

    pub fn assert_edge_valid(&self, eid: EdgeID) -> anyhow::Result<()> {
        let edge = self.try_get_edge(eid)?;

        self.try_get_face(edge.face)
            .context(MeshError::InvalidEdge(eid))?;

        if let Some(t) = edge.twin {
            let twin = self.try_get_edge(t).context(MeshError::InvalidTwin(eid))?;
            if twin.twin != Some(eid) {
                Err(MeshError::InvalidTwin(eid)).context("Twin does not point back")?;
            }
        }

        let v = self
            .try_get_vert(edge.vert_origin)
            .context(MeshError::InvalidEdge(eid))?;

        if !v.outgoing_edges().contains(&eid) {
            Err(MeshError::InvalidEdge(eid))
                .context(MeshError::InvalidVertex(edge.vert_origin))
                .context(
                    "Vertex does not contain reference to edge that is it's source in outgoing",
                )?;
        }

        self.try_get_edge(edge.edge_next_ccw)
            .context(MeshError::InvalidCCwEdge(eid))?;

        self.try_get_edge(edge.edge_back_cw)
            .context(MeshError::InvalidCwEdge(eid))?;

        let (src, dest) = eid.src_dst(self)?;

        if src == dest {
            Err(MeshError::SingletonEdge(eid, src))?;
        }

        Ok(())
    }

    pub fn assert_vertex_valid(&self, vid: VertID) -> anyhow::Result<()> {
        let vert = self.try_get_vert(vid)?;

        let mut dests = HashMap::new();
        let mut origs = HashMap::new();

        for &eid in vert.outgoing_edges() {
            let (orig, dest) = eid.src_dst(self).context(MeshError::InvalidVertex(vid))?;

            if orig != vid {
                return Err(MeshError::InvalidVertex(vid))
                    .context("Invalid vertex edge source loop");
            }

            if let Some(other) = dests.insert(dest, eid) {
                return Err(MeshError::InvalidVertex(vid))
                    .context(MeshError::DuplicateEdges(vid, eid, other))
                    .context("Vert has outgoing edges with duplicate destinations");
            }
        }
        for &eid in vert.incoming_edges() {
            let (orig, dest) = eid.src_dst(self).context(MeshError::InvalidVertex(vid))?;

            if dest != vid {
                return Err(MeshError::InvalidVertex(vid)).context("Invalid vertex edge dest loop");
            }

            if let Some(other) = origs.insert(orig, eid) {
                return Err(MeshError::InvalidVertex(vid))
                    .context(MeshError::DuplicateEdges(vid, eid, other))
                    .context("Vert has incoming edges with duplicate sources");
            }
        }
        Ok(())
    }

    pub fn faces_mut(&mut self) -> &mut Pidge<FaceID, Face> {
        &mut self.faces
    }

    pub fn edges_mut(&mut self) -> &mut Pidge<EdgeID, HalfEdge> {
        &mut self.edges
    }

    pub fn verts_mut(&mut self) -> &mut Pidge<VertID, Vertex> {
        &mut self.verts
    }

    pub fn faces(&self) -> &Pidge<FaceID, Face> {
        &self.faces
    }

    pub fn edges(&self) -> &Pidge<EdgeID, HalfEdge> {
        &self.edges
    }

    pub fn verts(&self) -> &Pidge<VertID, Vertex> {
        &self.verts
    }
}

#[cfg(test)]
pub mod test {
    use std::error::Error;

    use super::*;

    /// Interior edge of a closed torus, pointing between two vertices with full fans
    fn interior_edge(mesh: &HalfEdgeMesh) -> EdgeID {
        mesh.edges()
            .iter_keys()
            .find(|&e| mesh.max_one_joint_neighbour_vertices_per_side(e) == Ok(true))
            .unwrap()
    }

    #[test]
    pub fn test_torus_valid() -> Result<(), Box<dyn Error>> {
        let tri_mesh = TriMesh::torus(2.0, 0.5, 32, 16);
        let mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        mesh.assert_valid()?;

        assert_eq!(mesh.face_count(), 1024);
        assert_eq!(mesh.vertex_count(), 512);
        // Closed, so every edge has a twin
        assert!(mesh.edges().iter().all(|e| e.twin.is_some()));
        assert!(mesh
            .verts()
            .iter_keys()
            .all(|v| v.is_local_manifold(&mesh)));

        Ok(())
    }

    #[test]
    pub fn test_triangle_order() -> Result<(), Box<dyn Error>> {
        let tri_mesh = TriMesh::grid_plane(2, 2);
        let mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        assert_eq!(mesh.triangle_indices()?, tri_mesh.indices.to_vec());
        Ok(())
    }

    #[test]
    pub fn test_open_boundary() {
        let tri_mesh = TriMesh::grid_plane(3, 3);
        let mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        // 3 * 4 boundary sides
        assert_eq!(mesh.edges().iter().filter(|e| e.twin.is_none()).count(), 12);
        // Center vertices have a full fan
        assert!(VertID(5).is_local_manifold(&mesh));
        assert!(!VertID(0).is_local_manifold(&mesh));
    }

    #[test]
    pub fn test_duplicate_triangles_discarded() {
        let tri_mesh = TriMesh {
            verts: vec![glam::Vec4::ZERO, glam::Vec4::X, glam::Vec4::Y].into(),
            indices: vec![0, 1, 2, 0, 1, 2, 0, 0, 1].into(),
            ..Default::default()
        };
        let mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    pub fn test_collapse_edge() -> Result<(), Box<dyn Error>> {
        let tri_mesh = TriMesh::torus(2.0, 0.5, 16, 8);
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        let eid = interior_edge(&mesh);
        let (orig, dest) = eid.src_dst(&mesh)?;

        mesh.collapse_edge(eid)?;

        assert_eq!(mesh.face_count(), 256 - 2);
        assert!(mesh.try_get_vert(orig).is_err());
        assert!(mesh.try_get_edge(eid).is_err());
        mesh.assert_vertex_valid(dest)?;
        mesh.assert_valid()?;

        Ok(())
    }

    #[test]
    pub fn test_garbage_collect() -> Result<(), Box<dyn Error>> {
        let tri_mesh = TriMesh::torus(2.0, 0.5, 16, 8);
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        for f in mesh.faces().iter_keys().collect::<Vec<_>>() {
            mesh.set_face_tag(f, f.0 % 3 + 1)?;
        }

        for _ in 0..10 {
            let eid = interior_edge(&mesh);
            mesh.collapse_edge(eid)?;
        }

        let tags_before: Vec<_> = mesh.faces().iter_keys().map(|f| f.tag(&mesh)).collect();

        mesh.garbage_collect()?;
        mesh.assert_valid()?;

        assert_eq!(mesh.face_count(), 256 - 20);
        assert_eq!(mesh.vertex_count(), 128 - 10);
        assert_eq!(mesh.vert_data().len(), 128 - 10);
        assert_eq!(mesh.faces().capacity(), mesh.face_count());

        let tags_after: Vec<_> = mesh.faces().iter_keys().map(|f| f.tag(&mesh)).collect();
        assert_eq!(tags_before, tags_after);

        for (eid, _) in mesh.edges().iter_items() {
            assert_eq!(eid.edge(&mesh).face.0, eid.0 / 3);
        }

        Ok(())
    }
}
