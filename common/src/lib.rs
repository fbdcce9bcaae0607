//! Data shared between the offline hierarchy builder and the runtime selection.
pub mod asset;
pub mod bounding_sphere;
pub mod cluster;
pub mod graph;
pub mod lod_mesh;
pub mod mesh_vert;
pub mod tri_mesh;

pub use asset::{Asset, AssetError};
pub use bounding_sphere::BoundingSphere;
pub use cluster::{Cluster, ClusterGroup, ClusterNode};
pub use lod_mesh::{FlattenedGeometry, LodMesh, MeshHierarchy};
pub use mesh_vert::MeshVert;
pub use tri_mesh::TriMesh;

/// Target triangles per cluster
pub const CLUSTER_SIZE: u32 = 56;
/// No cluster may exceed this many triangles
pub const CLUSTER_THRESHOLD: u32 = 64;
/// Target clusters per group
pub const CLUSTER_GROUP_SIZE: u32 = 15;
/// Groups over this many clusters are reported while baking
pub const CLUSTER_GROUP_THRESHOLD: u32 = 32;

pub const PARTITION_SEED: i32 = 42;
/// Fraction of each group's faces removed per level
pub const SIMPLIFY_PERCENTAGE: f64 = 0.5;
pub const DEFAULT_MAX_LEVELS: u32 = 16;

/// Parent error of clusters in the coarsest level, so they are always selectable
pub const ROOT_PARENT_ERROR: f64 = f32::MAX as f64;
/// Parent sphere of clusters in the coarsest level is their own sphere scaled by this
pub const ROOT_PARENT_SPHERE_SCALE: f32 = 1.5;
