use std::ops::Range;

use common::CLUSTER_GROUP_THRESHOLD;
use partitioner::{
    pack_partitioning, pad_graph, padded_len, PartitioningConfig, PartitioningError, WeightedGraph,
};
use rayon::prelude::*;

use super::{
    graph::dual_graph_padding,
    half_edge_mesh::{HalfEdgeMesh, MeshError},
};

/// Partition a padded dual graph into clusters of about `cluster_size` nodes.
/// Returns the packed cluster of every real face, in node order, and the cluster count.
fn partition_dual_graph<V: Clone + Send + Sync>(
    config: &PartitioningConfig,
    mut graph: WeightedGraph<Option<V>>,
    cluster_size: usize,
) -> Result<(Vec<(V, u32)>, u32), PartitioningError> {
    let faces = graph.node_count();
    if faces == 0 {
        return Ok((Vec::new(), 0));
    }

    let padded = faces + dual_graph_padding(faces, cluster_size);
    pad_graph(&mut graph, padded, None);

    let partitions = (padded / cluster_size.max(1)) as u32;

    let mut part = config.partition_from_edge_weighted_graph(partitions, &graph)?;

    // Padding nodes were appended last
    part.truncate(faces);
    let count = pack_partitioning(&mut part);

    let assignment = graph
        .node_weights()
        .zip(part)
        .filter_map(|(w, p)| w.clone().map(|w| (w, p)))
        .collect();

    Ok((assignment, count))
}

impl HalfEdgeMesh {
    /// Cluster the mesh ignoring group boundaries. Returns the cluster count.
    pub fn cluster_full_mesh(
        &mut self,
        config: &PartitioningConfig,
        cluster_size: usize,
    ) -> Result<usize, PartitioningError> {
        let mesh_dual = self.generate_face_graph();

        log::debug!(
            "Partitioning {} faces into clusters of {cluster_size}",
            mesh_dual.node_count()
        );

        let (assignment, count) = partition_dual_graph(config, mesh_dual, cluster_size)?;

        for (fid, cluster) in assignment {
            fid.face_mut(self).cluster_idx = cluster as usize;
        }

        Ok(count as usize)
    }

    /// Within each group, split triangles into completely new clusters, so as not to preserve any old seams.
    /// Returns the range of new cluster ids created from each group.
    pub fn cluster_within_groups(
        &mut self,
        config: &PartitioningConfig,
        group_count: usize,
        cluster_size: usize,
    ) -> Result<Vec<Range<usize>>, PartitioningError> {
        let graphs = self.generate_group_face_graphs(group_count);

        log::debug!("Partitioning {} groups into sub-clusters", graphs.len());

        let parts = graphs
            .into_par_iter()
            .map(|graph| partition_dual_graph(config, graph, cluster_size))
            .collect::<Result<Vec<_>, _>>()?;

        let mut ranges = Vec::with_capacity(parts.len());
        let mut offset = 0;

        for (group_idx, (assignment, count)) in parts.into_iter().enumerate() {
            if count == 0 {
                log::warn!("Group {group_idx} face graph has no nodes");
            }

            for (fid, cluster) in assignment {
                fid.face_mut(self).cluster_idx = offset + cluster as usize;
            }

            ranges.push(offset..offset + count as usize);
            offset += count as usize;
        }

        Ok(ranges)
    }

    /// Group clusters by partitioning the cluster graph. Returns the group of every cluster, densely numbered.
    pub fn group_clusters(
        &self,
        config: &PartitioningConfig,
        cluster_count: usize,
        group_size: usize,
    ) -> Result<Vec<u32>, PartitioningError> {
        if cluster_count == 0 {
            return Ok(Vec::new());
        }

        let mut cluster_graph = self.generate_cluster_graph(cluster_count);

        let padded = padded_len(cluster_count, group_size);
        let group_count = (padded / group_size.max(1)) as u32;

        if group_count == 1 {
            return Ok(vec![0; cluster_count]);
        }

        pad_graph(&mut cluster_graph, padded, u32::MAX);

        let mut groups = config.partition_from_edge_weighted_graph(group_count, &cluster_graph)?;
        groups.truncate(cluster_count);
        pack_partitioning(&mut groups);

        let mut occupancies = vec![0u32; group_count as usize];
        for &g in &groups {
            occupancies[g as usize] += 1;
        }
        if let Some(over) = occupancies.iter().position(|&o| o > CLUSTER_GROUP_THRESHOLD) {
            log::warn!(
                "Group {over} holds {} clusters, over the limit of {CLUSTER_GROUP_THRESHOLD}",
                occupancies[over]
            );
        }

        Ok(groups)
    }

    /// Tag every half-edge with `group + 1` of its face's cluster
    pub fn tag_groups(&mut self, cluster_groups: &[u32]) -> Result<(), MeshError> {
        let faces: Vec<_> = self
            .faces()
            .iter_items()
            .map(|(fid, f)| (fid, cluster_groups[f.cluster_idx] + 1))
            .collect();

        for (fid, tag) in faces {
            self.set_face_tag(fid, tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use common::{
        TriMesh, CLUSTER_GROUP_SIZE, CLUSTER_GROUP_THRESHOLD, CLUSTER_SIZE, CLUSTER_THRESHOLD,
        PARTITION_SEED,
    };

    use super::*;

    fn config() -> PartitioningConfig {
        PartitioningConfig::default().with_seed(PARTITION_SEED)
    }

    fn cluster_sizes(mesh: &HalfEdgeMesh, count: usize) -> Vec<usize> {
        let mut sizes = vec![0; count];
        for f in mesh.faces().iter() {
            sizes[f.cluster_idx] += 1;
        }
        sizes
    }

    #[test]
    pub fn test_cluster_full_mesh() -> anyhow::Result<()> {
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&TriMesh::torus(2.0, 0.5, 32, 16));

        let count = mesh.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;

        assert!(count <= 19 && count >= 17, "{count} clusters");

        let sizes = cluster_sizes(&mesh, count);
        assert_eq!(sizes.iter().sum::<usize>(), 1024);
        assert!(sizes.iter().all(|&s| s > 0 && s <= CLUSTER_THRESHOLD as usize), "{sizes:?}");

        Ok(())
    }

    #[test]
    pub fn test_small_mesh_single_cluster() -> anyhow::Result<()> {
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&TriMesh::grid_plane(2, 2));

        // 8 faces pad to 56 nodes, a single partition
        let count = mesh.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;

        assert_eq!(count, 1);
        assert!(mesh.faces().iter().all(|f| f.cluster_idx == 0));
        Ok(())
    }

    #[test]
    pub fn test_group_sizes() -> anyhow::Result<()> {
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&TriMesh::torus(2.0, 0.5, 64, 32));

        let count = mesh.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;
        let groups = mesh.group_clusters(&config(), count, CLUSTER_GROUP_SIZE as _)?;

        assert_eq!(groups.len(), count);
        let group_count = *groups.iter().max().unwrap() as usize + 1;

        let mut occupancies = vec![0; group_count];
        for &g in &groups {
            occupancies[g as usize] += 1;
        }
        assert!(occupancies.iter().all(|&o| o > 0));
        assert!(
            occupancies.iter().all(|&o| o <= CLUSTER_GROUP_THRESHOLD),
            "{occupancies:?}"
        );

        mesh.tag_groups(&groups)?;
        assert!(mesh.edges().iter().all(|e| e.tag > 0 && e.tag as usize <= group_count));

        Ok(())
    }

    #[test]
    pub fn test_cluster_within_groups() -> anyhow::Result<()> {
        let mut mesh = HalfEdgeMesh::from_tri_mesh(&TriMesh::torus(2.0, 0.5, 64, 32));

        let count = mesh.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;
        let groups = mesh.group_clusters(&config(), count, CLUSTER_GROUP_SIZE as _)?;
        mesh.tag_groups(&groups)?;
        let group_count = *groups.iter().max().unwrap() as usize + 1;

        let ranges = mesh.cluster_within_groups(&config(), group_count, CLUSTER_SIZE as _)?;

        assert_eq!(ranges.len(), group_count);
        assert_eq!(ranges[0].start, 0);
        for w in ranges.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }

        // New clusters never straddle a group
        for (g, range) in ranges.iter().enumerate() {
            for f in mesh.faces().iter_keys() {
                if range.contains(&f.face(&mesh).cluster_idx) {
                    assert_eq!(f.tag(&mesh) as usize, g + 1);
                }
            }
        }

        Ok(())
    }

    #[test]
    pub fn test_partition_determinism() -> anyhow::Result<()> {
        let tri_mesh = TriMesh::uv_sphere(1.0, 24, 48);

        let mut a = HalfEdgeMesh::from_tri_mesh(&tri_mesh);
        let mut b = HalfEdgeMesh::from_tri_mesh(&tri_mesh);

        a.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;
        b.cluster_full_mesh(&config(), CLUSTER_SIZE as _)?;

        let ca: Vec<_> = a.faces().iter().map(|f| f.cluster_idx).collect();
        let cb: Vec<_> = b.faces().iter().map(|f| f.cluster_idx).collect();

        assert_eq!(ca, cb);
        Ok(())
    }
}
