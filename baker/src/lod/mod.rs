use common::LodMesh;

pub mod hierarchy;

/// Summary of one level of a hierarchy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    pub level: u32,
    pub triangles: usize,
    pub clusters: usize,
    pub groups: usize,
    pub min_tris: usize,
    pub max_tris: usize,
    pub min_error: f64,
    pub max_error: f64,
}

impl LevelStats {
    pub fn new(lod: &LodMesh) -> Self {
        let min_tris = lod
            .clusters
            .iter()
            .map(|c| c.triangle_count())
            .min()
            .unwrap_or_default();

        let mut min_error = f64::MAX;
        let mut max_error = f64::MIN;

        for node in lod.cluster_nodes() {
            min_error = min_error.min(node.lod_error);
            max_error = max_error.max(node.lod_error);
        }

        if lod.clusters.is_empty() {
            min_error = 0.0;
            max_error = 0.0;
        }

        Self {
            level: lod.level,
            triangles: lod.face_count(),
            clusters: lod.clusters.len(),
            groups: lod.groups.len(),
            min_tris,
            max_tris: lod.max_cluster_size(),
            min_error,
            max_error,
        }
    }
}

pub fn stat_readout(lod: &LodMesh) -> LevelStats {
    let stats = LevelStats::new(lod);

    log::info!(
        "L{}: {} tris, {} clusters ({}..={} tris), {} groups, error {:e}..={:e}",
        stats.level,
        stats.triangles,
        stats.clusters,
        stats.min_tris,
        stats.max_tris,
        stats.groups,
        stats.min_error,
        stats.max_error,
    );

    stats
}
