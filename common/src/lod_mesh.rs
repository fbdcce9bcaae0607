use std::ops::Range;

use bincode::{Decode, Encode};
use glam::Vec3;

use crate::{
    asset,
    cluster::{Cluster, ClusterGroup, ClusterNode},
    mesh_vert::MeshVert,
};

/// One level of a [MeshHierarchy]: a snapshot of the simplified mesh, and the clusters and groups over it.
#[derive(Debug, Clone, Default, PartialEq, Decode, Encode)]
pub struct LodMesh {
    pub level: u32,
    pub verts: Vec<MeshVert>,
    /// Triangle list in face order
    pub indices: Vec<u32>,
    pub clusters: Vec<Cluster>,
    pub groups: Vec<ClusterGroup>,
    /// Owning cluster of every face
    pub face_clusters: Vec<u32>,
    /// Faces ordered by owning cluster, so every cluster covers a contiguous run
    pub sorted_triangles: Vec<u32>,
    /// Vertex indices of `sorted_triangles`, three per triangle
    pub sorted_indices: Vec<u32>,
    /// Vertices on a group boundary inherited from the previous level
    pub boundary_verts: Vec<bool>,
}

impl LodMesh {
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn triangle(&self, face: usize) -> [u32; 3] {
        [
            self.indices[face * 3],
            self.indices[face * 3 + 1],
            self.indices[face * 3 + 2],
        ]
    }

    pub fn triangle_positions(&self, face: usize) -> [Vec3; 3] {
        self.triangle(face)
            .map(|v| self.verts[v as usize].position())
    }

    pub fn triangle_area(&self, face: usize) -> f64 {
        let [a, b, c] = self.triangle_positions(face);
        (b - a).cross(c - a).length() as f64 * 0.5
    }

    /// Stable sort of the faces by owning cluster, rebuilding the parallel vertex index array.
    pub fn sort_triangles_by_cluster(&mut self) {
        let mut sorted: Vec<u32> = (0..self.face_count() as u32).collect();
        sorted.sort_by_key(|&f| self.face_clusters[f as usize]);

        self.sorted_indices = sorted
            .iter()
            .flat_map(|&f| self.triangle(f as usize))
            .collect();
        self.sorted_triangles = sorted;
    }

    /// Range of `sorted_triangles` owned by each cluster, found by scanning for runs of equal cluster ids.
    /// Clusters without triangles get an empty range.
    pub fn cluster_triangle_ranges(&self) -> Vec<Range<u32>> {
        let mut ranges = vec![0..0; self.clusters.len()];

        let mut run_start = 0;
        for i in 0..self.sorted_triangles.len() {
            let cluster = self.face_clusters[self.sorted_triangles[i] as usize];

            let run_ends = i + 1 == self.sorted_triangles.len()
                || self.face_clusters[self.sorted_triangles[i + 1] as usize] != cluster;

            if run_ends {
                ranges[cluster as usize] = run_start as u32..i as u32 + 1;
                run_start = i + 1;
            }
        }

        ranges
    }

    pub fn cluster_nodes(&self) -> Vec<ClusterNode> {
        self.clusters.iter().map(Cluster::node).collect()
    }

    /// Coarsest level of a hierarchy, where no cluster has a parent
    pub fn is_terminal(&self) -> bool {
        self.clusters.iter().all(Cluster::is_root)
    }

    pub fn max_cluster_size(&self) -> usize {
        self.clusters
            .iter()
            .map(Cluster::triangle_count)
            .max()
            .unwrap_or_default()
    }
}

/// Every level of a mesh, from the full resolution level 0 to the coarsest.
#[derive(Debug, Clone, Default, PartialEq, Decode, Encode)]
pub struct MeshHierarchy {
    pub name: String,
    pub lods: Vec<LodMesh>,
}

/// Vertex and index buffers of every level of a hierarchy, end to end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedGeometry {
    pub verts: Vec<MeshVert>,
    /// Cluster sorted triangles of every level, indexing into `verts`
    pub indices: Vec<u32>,
    /// First triangle of each level within `indices`
    pub level_first_triangle: Vec<u32>,
}

impl MeshHierarchy {
    pub fn level_count(&self) -> usize {
        self.lods.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.lods.iter().map(|l| l.clusters.len()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.lods.iter().map(LodMesh::face_count).sum()
    }

    /// Hierarchies built from the same source have the same vertex and face counts at every level.
    pub fn same_shape(&self, other: &MeshHierarchy) -> bool {
        self.lods.len() == other.lods.len()
            && self.lods.iter().zip(&other.lods).all(|(a, b)| {
                a.vertex_count() == b.vertex_count() && a.face_count() == b.face_count()
            })
    }

    pub fn flatten(&self) -> FlattenedGeometry {
        let mut geometry = FlattenedGeometry::default();

        for lod in &self.lods {
            let base_vertex = geometry.verts.len() as u32;

            geometry
                .level_first_triangle
                .push((geometry.indices.len() / 3) as u32);
            geometry.verts.extend_from_slice(&lod.verts);
            geometry
                .indices
                .extend(lod.sorted_indices.iter().map(|&i| i + base_vertex));
        }

        geometry
    }
}

impl asset::Asset for MeshHierarchy {}

#[cfg(test)]
pub mod test {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::asset::Asset;

    /// Two clusters over a strip of 4 triangles, interleaved in face order
    fn strip_lod() -> LodMesh {
        let verts = (0..6)
            .map(|i| {
                MeshVert::new(
                    Vec3::new((i / 2) as f32, (i % 2) as f32, 0.0),
                    Vec3::Z,
                    Vec2::ZERO,
                )
            })
            .collect();

        let mut lod = LodMesh {
            verts,
            indices: vec![0, 1, 2, 2, 1, 3, 2, 3, 4, 4, 3, 5],
            face_clusters: vec![1, 0, 1, 0],
            clusters: vec![Cluster::new(0, vec![1, 3]), Cluster::new(0, vec![0, 2])],
            ..Default::default()
        };
        lod.sort_triangles_by_cluster();
        lod
    }

    #[test]
    fn test_sort_by_cluster() {
        let lod = strip_lod();

        assert_eq!(lod.sorted_triangles, vec![1, 3, 0, 2]);
        assert_eq!(
            lod.sorted_indices,
            vec![2, 1, 3, 4, 3, 5, 0, 1, 2, 2, 3, 4]
        );
        assert_eq!(lod.cluster_triangle_ranges(), vec![0..2, 2..4]);
    }

    #[test]
    fn test_triangle_area() {
        let lod = strip_lod();

        assert!((lod.triangle_area(0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_flatten_offsets_levels() {
        let lod = strip_lod();
        let hierarchy = MeshHierarchy {
            name: "strip".to_owned(),
            lods: vec![lod.clone(), lod],
        };

        let flat = hierarchy.flatten();

        assert_eq!(flat.verts.len(), 12);
        assert_eq!(flat.indices.len(), 24);
        assert_eq!(flat.level_first_triangle, vec![0, 4]);
        assert_eq!(flat.indices[12], 2 + 6);
    }

    #[test]
    fn test_same_shape() {
        let a = MeshHierarchy {
            name: "a".to_owned(),
            lods: vec![strip_lod()],
        };
        let mut b = a.clone();
        b.name = "b".to_owned();

        assert!(a.same_shape(&b));

        b.lods[0].indices.truncate(9);
        assert!(!a.same_shape(&b));
    }

    #[test]
    fn test_asset_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let a = MeshHierarchy {
            name: "strip".to_owned(),
            lods: vec![strip_lod()],
        };

        let b = MeshHierarchy::from_bytes(&a.to_bytes()?)?;

        assert_eq!(a, b);
        Ok(())
    }
}
