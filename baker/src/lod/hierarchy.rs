use std::{mem, ops::Range};

use common::{
    graph::colour_graph, BoundingSphere, Cluster, ClusterGroup, LodMesh, MeshHierarchy, TriMesh,
    ROOT_PARENT_ERROR, ROOT_PARENT_SPHERE_SCALE,
};
use glam::Vec3;
use partitioner::{PartitioningConfig, PartitioningError};

use crate::{
    lod::stat_readout,
    mesh::half_edge_mesh::{HalfEdgeMesh, MeshError},
    BuildConfig,
};

/// Margin by which a parent's normalized error exceeds its children's
pub const NORMALIZED_ERROR_EPSILON: f64 = f32::EPSILON as f64;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("Source mesh has no triangles")]
    EmptyMesh,
    #[error("Cluster {cluster} in level {level} has negative error {error}")]
    NegativeError { level: u32, cluster: usize, error: f64 },
    #[error("Parents of cluster {cluster} in level {level} disagree on their error: {expected} vs {found}")]
    InconsistentParentError {
        level: u32,
        cluster: usize,
        expected: f64,
        found: f64,
    },
    #[error("Cluster {cluster} in level {level} has {triangles} triangles but a bounding radius of {radius}")]
    DegenerateBounds {
        level: u32,
        cluster: usize,
        triangles: usize,
        radius: f32,
    },
    #[error("Face {face} in level {level} is assigned to cluster {cluster} of {count}")]
    OutOfRangeCluster {
        level: u32,
        face: usize,
        cluster: usize,
        count: usize,
    },
    #[error("Cluster {cluster} in level {level} has parent {parent} of {count}")]
    OutOfRangeParent {
        level: u32,
        cluster: usize,
        parent: usize,
        count: usize,
    },
    #[error("Graph partitioning failed")]
    Partitioning(#[from] PartitioningError),
    #[error("Invalid mesh connectivity")]
    Mesh(#[from] MeshError),
    #[error("Simplification of level {0} failed")]
    Simplify(u32, #[source] anyhow::Error),
}

/// Stages of building one level of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Seed,
    /// Level 0 clusters over the whole mesh, later levels within the inherited groups
    PartitionClusters,
    PartitionGroups,
    /// Debug colouring of the cluster graph
    ColorGroups,
    Simplify,
    NextLevel,
    Done,
}

/// Drives a mesh through repeated clustering, grouping and simplification, producing one [LodMesh] per level.
pub struct HierarchyBuilder {
    config: BuildConfig,
    partitioning: PartitioningConfig,
    mesh: HalfEdgeMesh,
    state: BuildState,
    level: u32,
    /// Clusters of the level being built, moved into its [LodMesh] once grouped
    clusters: Vec<Cluster>,
    /// Inherited group boundary of the level being built
    boundary_verts: Vec<bool>,
    hierarchy: MeshHierarchy,
}

impl HierarchyBuilder {
    pub fn new(mesh: HalfEdgeMesh, name: impl Into<String>, config: BuildConfig) -> Self {
        let partitioning = config.partitioning_config();

        Self {
            config,
            partitioning,
            mesh,
            state: BuildState::Seed,
            level: 0,
            clusters: Vec::new(),
            boundary_verts: Vec::new(),
            hierarchy: MeshHierarchy {
                name: name.into(),
                lods: Vec::new(),
            },
        }
    }

    pub fn from_tri_mesh(tri_mesh: &TriMesh, name: impl Into<String>, config: BuildConfig) -> Self {
        Self::new(HalfEdgeMesh::from_tri_mesh(tri_mesh), name, config)
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn hierarchy(&self) -> &MeshHierarchy {
        &self.hierarchy
    }

    /// Run the current stage, returning the next
    pub fn step(&mut self) -> Result<BuildState, BuildError> {
        self.state = match self.state {
            BuildState::Seed => self.seed()?,
            BuildState::PartitionClusters => self.partition_clusters()?,
            BuildState::PartitionGroups => self.partition_groups()?,
            BuildState::ColorGroups => self.colour_groups()?,
            BuildState::Simplify => self.simplify()?,
            BuildState::NextLevel => {
                self.level += 1;
                BuildState::PartitionClusters
            }
            BuildState::Done => BuildState::Done,
        };

        Ok(self.state)
    }

    pub fn run(mut self) -> Result<MeshHierarchy, BuildError> {
        let bar = indicatif::ProgressBar::new(self.config.max_levels as u64);

        while self.state != BuildState::Done {
            if self.step()? == BuildState::NextLevel {
                bar.inc(1);
            }
        }
        bar.finish_and_clear();

        Ok(self.hierarchy)
    }

    fn seed(&mut self) -> Result<BuildState, BuildError> {
        if self.mesh.face_count() == 0 {
            return Err(BuildError::EmptyMesh);
        }

        log::info!(
            "Building hierarchy for {}: {} faces, {} vertices",
            self.hierarchy.name,
            self.mesh.face_count(),
            self.mesh.vertex_count()
        );

        self.level = 0;
        Ok(BuildState::PartitionClusters)
    }

    fn partition_clusters(&mut self) -> Result<BuildState, BuildError> {
        let cluster_size = self.config.cluster_size as usize;

        // Tags still hold the previous level's groups
        self.boundary_verts = self.mesh.inherited_boundary_verts();

        self.clusters = if self.level == 0 {
            let count = self.mesh.cluster_full_mesh(&self.partitioning, cluster_size)?;

            let mut clusters = self.collect_clusters(count)?;
            for c in &mut clusters {
                c.qem_error = 0.0;
                c.lod_error = 0.0;
                c.normalized_lod_error = 0.0;
                c.child_lod_error_max = 0.0;
            }
            clusters
        } else {
            let group_count = self.previous_level()?.groups.len();

            let ranges =
                self.mesh
                    .cluster_within_groups(&self.partitioning, group_count, cluster_size)?;
            let count = ranges.last().map_or(0, |r| r.end);

            let mut clusters = self.collect_clusters(count)?;
            self.link_to_children(&mut clusters, &ranges)?;
            clusters
        };

        log::info!(
            "Level {}: {} faces in {} clusters",
            self.level,
            self.mesh.face_count(),
            self.clusters.len()
        );

        Ok(BuildState::PartitionGroups)
    }

    fn previous_level(&self) -> Result<&LodMesh, BuildError> {
        self.hierarchy.lods.last().ok_or(BuildError::EmptyMesh)
    }

    /// Bucket faces by their cluster, and bound each cluster tightly
    fn collect_clusters(&self, count: usize) -> Result<Vec<Cluster>, BuildError> {
        let mut clusters = vec![Cluster::new(self.level, Vec::new()); count];
        let mut points = vec![Vec::new(); count];

        for (fid, face) in self.mesh.faces().iter_items() {
            let cluster = face.cluster_idx;

            if cluster >= count {
                return Err(BuildError::OutOfRangeCluster {
                    level: self.level,
                    face: fid.into(),
                    cluster,
                    count,
                });
            }

            clusters[cluster].triangle_indices.push(fid.0);
            clusters[cluster].surface_area += fid.area(&self.mesh)? as f64;

            points[cluster].extend(
                self.mesh
                    .triangle_from_face(fid)?
                    .map(|v| Vec3::from(self.mesh.position(v))),
            );
        }

        for (i, (cluster, points)) in clusters.iter_mut().zip(&points).enumerate() {
            cluster.bounding_sphere = BoundingSphere::from_points(points);

            if !cluster.is_empty() && cluster.bounding_sphere.radius() <= 0.0 {
                return Err(BuildError::DegenerateBounds {
                    level: self.level,
                    cluster: i,
                    triangles: cluster.triangle_count(),
                    radius: cluster.bounding_sphere.radius(),
                });
            }
        }

        Ok(clusters)
    }

    /// Connect the clusters made from each inherited group to the group's clusters in the previous level,
    /// and propagate error and bounds up from them.
    fn link_to_children(
        &mut self,
        clusters: &mut [Cluster],
        ranges: &[Range<usize>],
    ) -> Result<(), BuildError> {
        let level = self.level;
        let prev = self
            .hierarchy
            .lods
            .last_mut()
            .ok_or(BuildError::EmptyMesh)?;

        for (group, range) in prev.groups.iter().zip(ranges) {
            if range.is_empty() {
                log::warn!("Group simplified to nothing, its clusters become roots");
                for &c in &group.cluster_indices {
                    make_root(&mut prev.clusters[c as usize]);
                }
                continue;
            }

            if group.qem_error < 0.0 {
                return Err(BuildError::NegativeError {
                    level,
                    cluster: range.start,
                    error: group.qem_error,
                });
            }

            let children: Vec<&Cluster> = group
                .cluster_indices
                .iter()
                .map(|&c| &prev.clusters[c as usize])
                .collect();

            let child_lod_error_max = children
                .iter()
                .map(|c| c.lod_error.max(0.0))
                .fold(0.0, f64::max);
            let max_child_normalized_error = children
                .iter()
                .map(|c| c.normalized_lod_error)
                .fold(0.0, f64::max);

            // Every cluster from this group shares its children, so they share bounds and error
            let centroid = children
                .iter()
                .map(|c| c.bounding_sphere.center())
                .sum::<Vec3>()
                / children.len().max(1) as f32;
            let max_child_radius = children
                .iter()
                .map(|c| c.bounding_sphere.radius())
                .fold(0.0, f32::max);

            let mut sphere = BoundingSphere::new(centroid, max_child_radius * 2.0);
            for c in &children {
                sphere.include_sphere(&c.bounding_sphere);
            }
            for c in &clusters[range.clone()] {
                sphere.include_sphere(&c.bounding_sphere);
            }

            let lod_error = group.qem_error / (range.len() + 1) as f64 + child_lod_error_max;
            let radius = sphere.radius() as f64;
            let normalized_lod_error =
                (max_child_normalized_error + NORMALIZED_ERROR_EPSILON).max(lod_error / (radius * radius));

            let mut parent_surface_area = 0.0;

            for c in range.clone() {
                let cluster = &mut clusters[c];

                cluster.child_cluster_indices = group.cluster_indices.clone();
                cluster.qem_error = group.qem_error;
                cluster.child_lod_error_max = child_lod_error_max;
                cluster.lod_error = lod_error;
                cluster.normalized_lod_error = normalized_lod_error;
                cluster.bounding_sphere = sphere;

                parent_surface_area += cluster.surface_area;
            }

            let parents: Vec<u32> = range.clone().map(|c| c as u32).collect();

            for &c in &group.cluster_indices {
                let child = &mut prev.clusters[c as usize];

                child.parent_cluster_indices = parents.clone();
                child.parent_normalized_error = normalized_lod_error;
                child.parent_bounding_sphere = sphere;
                child.parent_surface_area = parent_surface_area;
            }
        }

        check_parent_consistency(prev, clusters)
    }

    fn partition_groups(&mut self) -> Result<BuildState, BuildError> {
        let cluster_count = self.clusters.len();

        let cluster_groups = self.mesh.group_clusters(
            &self.partitioning,
            cluster_count,
            self.config.group_size as usize,
        )?;
        self.mesh.tag_groups(&cluster_groups)?;

        let group_count = cluster_groups.iter().max().map_or(0, |&g| g as usize + 1);

        let mut groups = vec![
            ClusterGroup {
                qem_error: -1.0,
                ..Default::default()
            };
            group_count
        ];

        for (c, (&g, cluster)) in cluster_groups.iter().zip(&mut self.clusters).enumerate() {
            cluster.group_index = g as usize;
            groups[g as usize].cluster_indices.push(c as u32);
        }

        let mut face_clusters = Vec::with_capacity(self.mesh.face_count());
        for (fid, face) in self.mesh.faces().iter_items() {
            face_clusters.push(face.cluster_idx as u32);
            groups[cluster_groups[face.cluster_idx] as usize]
                .faces
                .push(fid.0);
        }

        let mut lod = LodMesh {
            level: self.level,
            verts: self.mesh.vert_data().to_vec(),
            indices: self.mesh.triangle_indices()?,
            clusters: mem::take(&mut self.clusters),
            groups,
            face_clusters,
            boundary_verts: mem::take(&mut self.boundary_verts),
            ..Default::default()
        };
        lod.sort_triangles_by_cluster();

        check_level(&lod)?;

        log::info!("Level {}: {group_count} groups", self.level);

        self.hierarchy.lods.push(lod);

        if self.config.colour_groups {
            Ok(BuildState::ColorGroups)
        } else {
            Ok(self.after_grouping())
        }
    }

    fn colour_groups(&mut self) -> Result<BuildState, BuildError> {
        let Some(lod) = self.hierarchy.lods.last_mut() else {
            return Err(BuildError::EmptyMesh);
        };

        let graph = self.mesh.generate_cluster_graph(lod.clusters.len());
        let colours = colour_graph(&graph);

        for (cluster, colour) in lod.clusters.iter_mut().zip(colours) {
            cluster.colour = colour;
        }

        Ok(self.after_grouping())
    }

    /// Finish when this level could not be simplified further
    fn after_grouping(&mut self) -> BuildState {
        let Some(lod) = self.hierarchy.lods.last() else {
            return BuildState::Done;
        };

        let done = if lod.clusters.len() <= 1 {
            log::info!("Reached a single cluster at level {}", self.level);
            true
        } else if self.level + 1 >= self.config.max_levels {
            log::info!("Reached the level limit of {}", self.config.max_levels);
            true
        } else {
            false
        };

        if done {
            self.finish()
        } else {
            BuildState::Simplify
        }
    }

    fn simplify(&mut self) -> Result<BuildState, BuildError> {
        let level = self.level;
        let Some(lod) = self.hierarchy.lods.last_mut() else {
            return Err(BuildError::EmptyMesh);
        };

        let removed = self
            .mesh
            .simplify_groups(&mut lod.groups, self.config.simplify_fraction)
            .map_err(|e| BuildError::Simplify(level, e))?;

        if let Some((g, group)) = lod
            .groups
            .iter()
            .enumerate()
            .find(|(_, g)| g.qem_error < 0.0)
        {
            return Err(BuildError::NegativeError {
                level,
                cluster: g,
                error: group.qem_error,
            });
        }

        if removed == 0 {
            log::warn!("Simplification stalled at level {level}, finishing early");
            return Ok(self.finish());
        }

        log::info!("Level {level}: removed {removed} faces");

        Ok(BuildState::NextLevel)
    }

    /// Mark the last level as the roots of the DAG
    fn finish(&mut self) -> BuildState {
        if let Some(lod) = self.hierarchy.lods.last_mut() {
            for cluster in &mut lod.clusters {
                make_root(cluster);
            }
        }

        for lod in &self.hierarchy.lods {
            stat_readout(lod);
        }

        BuildState::Done
    }
}

fn make_root(cluster: &mut Cluster) {
    cluster.parent_cluster_indices.clear();
    cluster.parent_normalized_error = ROOT_PARENT_ERROR;
    cluster.parent_bounding_sphere = cluster.bounding_sphere.scaled(ROOT_PARENT_SPHERE_SCALE);
    cluster.parent_surface_area = cluster.surface_area;
}

/// Every child must agree with every parent on the error of the parents
fn check_parent_consistency(prev: &LodMesh, parents: &[Cluster]) -> Result<(), BuildError> {
    for (c, child) in prev.clusters.iter().enumerate() {
        for &p in &child.parent_cluster_indices {
            let Some(parent) = parents.get(p as usize) else {
                return Err(BuildError::OutOfRangeParent {
                    level: prev.level,
                    cluster: c,
                    parent: p as usize,
                    count: parents.len(),
                });
            };
            let found = parent.normalized_lod_error;

            if (found - child.parent_normalized_error).abs() > f32::EPSILON as f64 {
                return Err(BuildError::InconsistentParentError {
                    level: prev.level,
                    cluster: c,
                    expected: child.parent_normalized_error,
                    found,
                });
            }
        }
    }
    Ok(())
}

fn check_level(lod: &LodMesh) -> Result<(), BuildError> {
    for (c, cluster) in lod.clusters.iter().enumerate() {
        for error in [cluster.lod_error, cluster.normalized_lod_error, cluster.qem_error] {
            if error < 0.0 {
                return Err(BuildError::NegativeError {
                    level: lod.level,
                    cluster: c,
                    error,
                });
            }
        }

        if !cluster.is_empty() && cluster.bounding_sphere.radius() <= 0.0 {
            return Err(BuildError::DegenerateBounds {
                level: lod.level,
                cluster: c,
                triangles: cluster.triangle_count(),
                radius: cluster.bounding_sphere.radius(),
            });
        }
    }

    for (f, &c) in lod.face_clusters.iter().enumerate() {
        if c as usize >= lod.clusters.len() {
            return Err(BuildError::OutOfRangeCluster {
                level: lod.level,
                face: f,
                cluster: c as usize,
                count: lod.clusters.len(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_state_order() -> Result<(), Box<dyn std::error::Error>> {
        let mut builder = HierarchyBuilder::from_tri_mesh(
            &TriMesh::torus(2.0, 0.5, 32, 16),
            "torus",
            BuildConfig {
                max_levels: 2,
                colour_groups: true,
                ..Default::default()
            },
        );

        let mut states = vec![builder.state()];
        while builder.state() != BuildState::Done {
            states.push(builder.step()?);
        }

        assert_eq!(
            states,
            vec![
                BuildState::Seed,
                BuildState::PartitionClusters,
                BuildState::PartitionGroups,
                BuildState::ColorGroups,
                BuildState::Simplify,
                BuildState::NextLevel,
                BuildState::PartitionClusters,
                BuildState::PartitionGroups,
                BuildState::ColorGroups,
                BuildState::Done,
            ]
        );
        assert_eq!(builder.level(), 1);
        assert_eq!(builder.hierarchy().level_count(), 2);

        Ok(())
    }

    #[test]
    fn test_empty_mesh() {
        let builder =
            HierarchyBuilder::from_tri_mesh(&TriMesh::default(), "empty", BuildConfig::default());

        assert!(matches!(builder.run(), Err(BuildError::EmptyMesh)));
    }

    #[test]
    fn test_single_cluster_is_root() -> Result<(), Box<dyn std::error::Error>> {
        let hierarchy =
            HierarchyBuilder::from_tri_mesh(&TriMesh::grid_plane(2, 2), "grid", BuildConfig::default())
                .run()?;

        assert_eq!(hierarchy.level_count(), 1);
        let lod = &hierarchy.lods[0];
        assert_eq!(lod.clusters.len(), 1);

        let root = &lod.clusters[0];
        assert!(root.is_root());
        assert_eq!(root.parent_normalized_error, ROOT_PARENT_ERROR);
        assert_eq!(
            root.parent_bounding_sphere.radius(),
            root.bounding_sphere.radius() * ROOT_PARENT_SPHERE_SCALE
        );

        Ok(())
    }

    fn checked_levels() -> Result<MeshHierarchy, Box<dyn std::error::Error>> {
        let hierarchy = HierarchyBuilder::from_tri_mesh(
            &TriMesh::torus(2.0, 0.5, 32, 16),
            "torus",
            BuildConfig {
                max_levels: 2,
                ..Default::default()
            },
        )
        .run()?;

        for lod in &hierarchy.lods {
            check_level(lod)?;
        }
        check_parent_consistency(&hierarchy.lods[0], &hierarchy.lods[1].clusters)?;

        Ok(hierarchy)
    }

    #[test]
    fn test_negative_error_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let mut hierarchy = checked_levels()?;
        let lod = &mut hierarchy.lods[1];
        lod.clusters[2].lod_error = -0.5;

        assert!(matches!(
            check_level(lod),
            Err(BuildError::NegativeError {
                level: 1,
                cluster: 2,
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn test_degenerate_bounds_are_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let mut hierarchy = checked_levels()?;
        let lod = &mut hierarchy.lods[0];
        let c = lod.clusters.iter().position(|c| !c.is_empty()).ok_or("No clusters")?;
        lod.clusters[c].bounding_sphere.set_radius(0.0);

        assert!(matches!(
            check_level(lod),
            Err(BuildError::DegenerateBounds { level: 0, cluster, .. }) if cluster == c
        ));

        Ok(())
    }

    #[test]
    fn test_out_of_range_cluster_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let mut hierarchy = checked_levels()?;
        let lod = &mut hierarchy.lods[0];
        let count = lod.clusters.len();
        lod.face_clusters[5] = count as u32;

        assert!(matches!(
            check_level(lod),
            Err(BuildError::OutOfRangeCluster { level: 0, face: 5, cluster, count: n })
                if cluster == count && n == count
        ));

        Ok(())
    }

    #[test]
    fn test_inconsistent_parent_error_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let mut hierarchy = checked_levels()?;
        let (children, parents) = hierarchy.lods.split_at_mut(1);
        let parent = children[0].clusters[0].parent_cluster_indices[0] as usize;
        parents[0].clusters[parent].normalized_lod_error += 0.25;

        assert!(matches!(
            check_parent_consistency(&children[0], &parents[0].clusters),
            Err(BuildError::InconsistentParentError { level: 0, .. })
        ));

        Ok(())
    }

    #[test]
    fn test_out_of_range_parent_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let mut hierarchy = checked_levels()?;
        let count = hierarchy.lods[1].clusters.len();
        hierarchy.lods[0].clusters[3].parent_cluster_indices.push(count as u32 + 7);

        assert!(matches!(
            check_parent_consistency(&hierarchy.lods[0], &hierarchy.lods[1].clusters),
            Err(BuildError::OutOfRangeParent {
                level: 0,
                cluster: 3,
                parent,
                count: n,
            }) if parent == count + 7 && n == count
        ));

        Ok(())
    }

    #[test]
    fn test_colours_are_proper() -> Result<(), Box<dyn std::error::Error>> {
        let hierarchy = HierarchyBuilder::from_tri_mesh(
            &TriMesh::torus(2.0, 0.5, 32, 16),
            "torus",
            BuildConfig {
                max_levels: 1,
                colour_groups: true,
                ..Default::default()
            },
        )
        .run()?;

        let lod = &hierarchy.lods[0];
        let mesh_colours: Vec<_> = lod.clusters.iter().map(|c| c.colour).collect();

        // Neighbouring faces in different clusters never share a colour
        for f in 0..lod.face_count() {
            for g in 0..lod.face_count() {
                let (cf, cg) = (lod.face_clusters[f], lod.face_clusters[g]);
                if cf == cg {
                    continue;
                }
                let shared = lod
                    .triangle(f)
                    .iter()
                    .filter(|v| lod.triangle(g).contains(v))
                    .count();
                if shared == 2 {
                    assert_ne!(mesh_colours[cf as usize], mesh_colours[cg as usize]);
                }
            }
        }

        Ok(())
    }
}
