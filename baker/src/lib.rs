//! Offline builder of cluster LOD hierarchies.
//!
//! A source mesh is split into clusters of about [common::CLUSTER_SIZE] triangles, clusters are grouped,
//! each group is simplified with its border locked, and the result is clustered again within the old groups.
//! Repeating this gives a DAG of clusters from the full resolution mesh up to a single root.

pub mod cache;
pub mod lod;
pub mod mesh;

use common::{
    MeshHierarchy, TriMesh, CLUSTER_GROUP_SIZE, CLUSTER_SIZE, DEFAULT_MAX_LEVELS, PARTITION_SEED,
    SIMPLIFY_PERCENTAGE,
};
use partitioner::PartitioningConfig;

pub use lod::{
    hierarchy::{BuildError, BuildState, HierarchyBuilder},
    stat_readout, LevelStats,
};
pub use mesh::half_edge_mesh::{HalfEdgeMesh, MeshError};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Target triangles per cluster
    pub cluster_size: u32,
    /// Target clusters per group
    pub group_size: u32,
    /// Fraction of each group's triangles kept by simplification
    pub simplify_fraction: f64,
    pub seed: i32,
    /// Most levels to build, including level 0
    pub max_levels: u32,
    pub use_cache: bool,
    /// Colour the cluster graph of every level for debug views
    pub colour_groups: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cluster_size: CLUSTER_SIZE,
            group_size: CLUSTER_GROUP_SIZE,
            simplify_fraction: SIMPLIFY_PERCENTAGE,
            seed: PARTITION_SEED,
            max_levels: DEFAULT_MAX_LEVELS,
            use_cache: true,
            colour_groups: false,
        }
    }
}

impl BuildConfig {
    pub fn partitioning_config(&self) -> PartitioningConfig {
        PartitioningConfig::default().with_seed(self.seed)
    }
}

/// Build every level of `tri_mesh`
pub fn build_hierarchy(
    tri_mesh: &TriMesh,
    name: impl Into<String>,
    config: &BuildConfig,
) -> Result<MeshHierarchy, BuildError> {
    HierarchyBuilder::from_tri_mesh(tri_mesh, name, config.clone()).run()
}
