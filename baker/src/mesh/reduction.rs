use anyhow::Context;
use common::ClusterGroup;

use super::{
    edge::EdgeID,
    face::FaceID,
    half_edge_mesh::{HalfEdgeMesh, MeshError},
    quadric::Quadric,
    vertex::VertID,
};

impl VertID {
    /// Generate error matrix Q, the sum of Kp for all planes p around this vertex.
    pub fn generate_error_matrix(self, mesh: &HalfEdgeMesh) -> Result<Quadric, MeshError> {
        let mut q = Quadric::default();

        for &e in mesh.try_get_vert(self)?.outgoing_edges() {
            let f = e.edge(mesh).face;

            q += f.plane(mesh)?.fundamental_error_quadric();
        }

        Ok(q)
    }
}

impl HalfEdgeMesh {
    /// Quadric of every vertex, indexed by [VertID]. Vertices not used by any face get a zero quadric.
    pub fn create_quadrics(&self) -> Result<Vec<Quadric>, MeshError> {
        let mut quadrics = vec![Quadric::default(); self.vert_data().len()];

        for vid in self.verts().iter_keys() {
            quadrics[usize::from(vid)] = vid.generate_error_matrix(self)?;
        }

        Ok(quadrics)
    }

    /// Select every vertex of the faces tagged `tag`, and lock those on a side shared with
    /// another group or on the mesh border. Returns the selected vertices.
    pub fn select_and_lock(&mut self, tag: u32) -> Result<Vec<VertID>, MeshError> {
        let mut touched = Vec::new();
        let mut locked = Vec::new();

        for edge in self.edges().iter() {
            if edge.tag != tag {
                continue;
            }

            let (orig, dest) = edge.src_dst(self)?;
            touched.push(orig);
            touched.push(dest);

            let crosses_group = match edge.twin {
                Some(twin) => twin.edge(self).tag != tag,
                None => true,
            };

            if crosses_group {
                locked.push(orig);
                locked.push(dest);
            }
        }

        touched.sort_unstable();
        touched.dedup();

        for &v in &touched {
            self.try_get_vert_mut(v)?.selected = true;
        }
        for v in locked {
            self.try_get_vert_mut(v)?.locked = true;
        }

        Ok(touched)
    }

    /// Edges that may move their origin onto their destination within group `tag`
    fn collapse_candidate(&self, eid: EdgeID, tag: u32) -> bool {
        let Some(edge) = self.edges().try_get(eid) else {
            return false;
        };

        edge.tag == tag
            && self
                .verts()
                .try_get(edge.vert_origin)
                .is_some_and(|v| v.selected && !v.locked)
    }

    /// Collapse the cheapest edges of group `tag` until `target_removed` faces are gone or nothing more can collapse.
    /// Returns the accumulated collapse error and the number of faces removed.
    pub fn simplify_group(
        &mut self,
        tag: u32,
        target_removed: usize,
        quadrics: &mut [Quadric],
    ) -> anyhow::Result<(f64, usize)> {
        let touched = self.select_and_lock(tag)?;

        let mut pq = priority_queue::PriorityQueue::new();

        for eid in self.edges().iter_keys() {
            if self.collapse_candidate(eid, tag) {
                pq.push(eid, eid.edge_collapse_error(self, quadrics)?);
            }
        }

        let mut error = 0.0;
        let mut removed = 0;

        while removed < target_removed {
            let Some((eid, err)) = pq.pop() else {
                log::debug!("Group {} ran out of collapsible edges at {removed}/{target_removed}", tag - 1);
                break;
            };

            if self.try_get_edge(eid).is_err() || !eid.can_collapse_edge(self)? {
                continue;
            }

            let (orig, dest) = eid.src_dst(self)?;
            let faces_removed = if eid.edge(self).twin.is_some() { 2 } else { 1 };

            let q_orig = quadrics[usize::from(orig)];
            quadrics[usize::from(dest)] += q_orig;

            let mut affected_edges = Vec::new();
            for v in [orig, dest] {
                let vert = self.try_get_vert(v)?;
                affected_edges.extend_from_slice(vert.outgoing_edges());
                affected_edges.extend_from_slice(vert.incoming_edges());
            }

            self.collapse_edge(eid)
                .with_context(|| format!("Collapse in group {}", tag - 1))?;

            error += err.error();
            removed += faces_removed;

            for e in affected_edges {
                if self.collapse_candidate(e, tag) {
                    pq.push(e, e.edge_collapse_error(self, quadrics)?);
                } else {
                    pq.remove(&e);
                }
            }
        }

        for v in touched {
            if let Some(vert) = self.verts_mut().try_get_mut(v) {
                vert.selected = false;
                vert.locked = false;
            }
        }

        Ok((error, removed))
    }

    /// Simplify every group in turn, recording each group's error, then compact the mesh.
    /// Each group loses `faces * (1 - fraction)` of its faces where the mesh allows.
    /// Returns the number of faces removed.
    pub fn simplify_groups(
        &mut self,
        groups: &mut [ClusterGroup],
        fraction: f64,
    ) -> anyhow::Result<usize> {
        let mut quadrics = self.create_quadrics()?;
        let mut total_removed = 0;

        let group_faces = self.group_faces(groups.len());

        for (g, (group, faces)) in groups.iter_mut().zip(&group_faces).enumerate() {
            let target_removed = (faces.len() as f64 * (1.0 - fraction)) as usize;

            let (error, removed) = self.simplify_group(g as u32 + 1, target_removed, &mut quadrics)?;

            log::debug!(
                "Group {g}: removed {removed}/{} faces with error {error}",
                faces.len()
            );

            group.qem_error = error;
            total_removed += removed;
        }

        self.garbage_collect()?;
        self.clear_flags();

        Ok(total_removed)
    }
}

impl FaceID {
    /// Quadric of this face's plane
    pub fn quadric(self, mesh: &HalfEdgeMesh) -> Result<Quadric, MeshError> {
        Ok(self.plane(mesh)?.fundamental_error_quadric())
    }
}
