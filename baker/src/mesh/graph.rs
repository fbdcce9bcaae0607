use partitioner::{add_edge_cost, set_edge, WeightedGraph};
use petgraph::graph::NodeIndex;

use super::{face::FaceID, half_edge_mesh::HalfEdgeMesh};

/// Number of isolated nodes to add to a dual graph of `faces` triangles so the partitioner
/// produces clusters of `size` triangles with no undersized remainder.
pub fn dual_graph_padding(faces: usize, size: usize) -> usize {
    let size = size.max(1);
    size * (1 + (faces + 1) / size) - faces
}

impl HalfEdgeMesh {
    /// Generates a graph that is the dual of this mesh - connections from each face to their neighbours.
    /// Node `i` is face `i`, so the mesh must have dense face ids.
    pub fn generate_face_graph(&self) -> WeightedGraph<Option<FaceID>> {
        let mut graph = WeightedGraph::with_capacity(self.face_count(), self.face_count() * 3 / 2);

        for fid in self.faces().iter_keys() {
            let n = graph.add_node(Some(fid));
            debug_assert_eq!(n.index(), usize::from(fid));
        }

        for (eid, edge) in self.edges().iter_items() {
            let Some(twin) = edge.twin else {
                continue;
            };
            // Visit each shared side once
            if twin < eid {
                continue;
            }

            let other_face = twin.edge(self).face;

            set_edge(
                &mut graph,
                NodeIndex::new(edge.face.into()),
                NodeIndex::new(other_face.into()),
                1,
            );
        }

        graph
    }

    /// `generate_face_graph`, but with one graph per group, keyed by the face tags.
    /// Sides crossing between groups are left out.
    pub fn generate_group_face_graphs(&self, group_count: usize) -> Vec<WeightedGraph<Option<FaceID>>> {
        let mut graphs = vec![WeightedGraph::default(); group_count];

        // Local node of every face, each face being in exactly one group
        let mut nodes = vec![NodeIndex::end(); self.faces().capacity()];

        for fid in self.faces().iter_keys() {
            let tag = fid.tag(self);
            if tag == 0 || tag as usize > group_count {
                log::warn!("Face {fid:?} has no valid group tag ({tag})");
                continue;
            }
            nodes[usize::from(fid)] = graphs[tag as usize - 1].add_node(Some(fid));
        }

        for (eid, edge) in self.edges().iter_items() {
            let Some(twin) = edge.twin else {
                continue;
            };
            if twin < eid {
                continue;
            }

            let twin_edge = twin.edge(self);

            if edge.tag != twin_edge.tag || edge.tag == 0 || edge.tag as usize > group_count {
                continue;
            }

            set_edge(
                &mut graphs[edge.tag as usize - 1],
                nodes[usize::from(edge.face)],
                nodes[usize::from(twin_edge.face)],
                1,
            );
        }

        graphs
    }

    /// Generates a graph of all clusters and their neighbours.
    /// A cluster neighbours another one iff there is some triangle in each that share an edge,
    /// and the edge weight counts how many sides they share.
    pub fn generate_cluster_graph(&self, cluster_count: usize) -> WeightedGraph<u32> {
        let mut graph = WeightedGraph::with_capacity(
            cluster_count,
            // Estimate each cluster hits roughly 3 others
            cluster_count * 3,
        );

        for c in 0..cluster_count {
            graph.add_node(c as u32);
        }

        for (eid, edge) in self.edges().iter_items() {
            let Some(twin) = edge.twin else {
                continue;
            };
            if twin < eid {
                continue;
            }

            let c0 = edge.face.face(self).cluster_idx;
            let c1 = twin.edge(self).face.face(self).cluster_idx;

            if c0 != c1 {
                add_edge_cost(&mut graph, NodeIndex::new(c0), NodeIndex::new(c1), 1);
            }
        }

        graph
    }

    /// Vertices touching a side whose two faces carry different group tags, or a side on the mesh border.
    /// Indexed by [VertID](super::vertex::VertID).
    pub fn inherited_boundary_verts(&self) -> Vec<bool> {
        let mut boundary = vec![false; self.vert_data().len()];

        for edge in self.edges().iter() {
            let on_boundary = match edge.twin {
                Some(twin) => twin.edge(self).tag != edge.tag,
                None => true,
            };

            if on_boundary {
                if let Ok(dst) = edge.dst(self) {
                    boundary[usize::from(edge.vert_origin)] = true;
                    boundary[usize::from(dst)] = true;
                }
            }
        }

        boundary
    }

    /// Faces of every group, keyed by tag
    pub fn group_faces(&self, group_count: usize) -> Vec<Vec<FaceID>> {
        let mut faces = vec![Vec::new(); group_count];

        for fid in self.faces().iter_keys() {
            let tag = fid.tag(self) as usize;
            if tag > 0 && tag <= group_count {
                faces[tag - 1].push(fid);
            }
        }

        faces
    }
}
