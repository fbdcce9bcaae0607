use crate::bounding_sphere::BoundingSphere;

/// A bounded set of triangles within one LOD level, and a node in the LOD DAG.
///
/// Parent and child links index the cluster arrays of the adjacent coarser and finer levels.
#[derive(Debug, Clone, PartialEq, bincode::Decode, bincode::Encode)]
pub struct Cluster {
    /// Group within this level
    pub group_index: usize,
    /// Faces of this level's mesh owned by this cluster
    pub triangle_indices: Vec<u32>,
    /// Clusters in level `lod_level + 1` this cluster was simplified into
    pub parent_cluster_indices: Vec<u32>,
    /// Clusters in level `lod_level - 1` that were simplified into this cluster
    pub child_cluster_indices: Vec<u32>,

    /// Quadric error introduced by the simplification that created this cluster
    pub qem_error: f64,
    pub lod_error: f64,
    pub normalized_lod_error: f64,
    pub child_lod_error_max: f64,
    /// Normalized error of every parent. Shared by all clusters with the same parents.
    pub parent_normalized_error: f64,

    pub lod_level: u32,
    pub surface_area: f64,
    pub parent_surface_area: f64,

    pub bounding_sphere: BoundingSphere,
    /// Sphere enclosing every parent, or an inflated copy of our own sphere in the coarsest level
    pub parent_bounding_sphere: BoundingSphere,

    /// Graph colour among the clusters of this level, for debug views
    pub colour: u32,
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            group_index: usize::MAX,
            triangle_indices: Vec::new(),
            parent_cluster_indices: Vec::new(),
            child_cluster_indices: Vec::new(),
            qem_error: -1.0,
            lod_error: -1.0,
            normalized_lod_error: -1.0,
            child_lod_error_max: 0.0,
            parent_normalized_error: -1.0,
            lod_level: 0,
            surface_area: 0.0,
            parent_surface_area: 0.0,
            bounding_sphere: BoundingSphere::default(),
            parent_bounding_sphere: BoundingSphere::default(),
            colour: 0,
        }
    }
}

impl Cluster {
    pub fn new(lod_level: u32, triangle_indices: Vec<u32>) -> Self {
        Self {
            lod_level,
            triangle_indices,
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_cluster_indices.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len()
    }

    pub fn node(&self) -> ClusterNode {
        ClusterNode {
            lod_error: self.normalized_lod_error,
            parent_max_lod_error: self.parent_normalized_error,
            bounding_sphere: self.bounding_sphere,
        }
    }
}

/// Clusters of one level that are simplified together.
#[derive(Debug, Clone, Default, PartialEq, bincode::Decode, bincode::Encode)]
pub struct ClusterGroup {
    pub cluster_indices: Vec<u32>,
    /// Faces of the level's mesh inside this group. Every half-edge of these faces is tagged with the group.
    pub faces: Vec<u32>,
    /// Error accumulated while simplifying this group into the next level, `-1` until simplified
    pub qem_error: f64,
}

/// Summary of a cluster for DAG visualisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterNode {
    pub lod_error: f64,
    pub parent_max_lod_error: f64,
    pub bounding_sphere: BoundingSphere,
}
