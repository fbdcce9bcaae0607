#![cfg(test)]
use std::error::Error;

use baker::{build_hierarchy, stat_readout, BuildConfig, HierarchyBuilder};
use common::{
    asset::Asset, MeshHierarchy, TriMesh, CLUSTER_SIZE, CLUSTER_THRESHOLD, ROOT_PARENT_ERROR,
};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn torus_hierarchy(rings: usize, segments: usize, max_levels: u32) -> Result<MeshHierarchy, Box<dyn Error>> {
    let config = BuildConfig {
        max_levels,
        ..Default::default()
    };

    Ok(build_hierarchy(
        &TriMesh::torus(2.0, 0.5, rings, segments),
        "torus",
        &config,
    )?)
}

#[test]
fn test_level_zero_cluster_count() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(32, 16, 1)?;
    let lod = &hierarchy.lods[0];

    assert_eq!(lod.face_count(), 1024);
    // 19 partitions of the padded graph, one of which may hold only padding
    assert!((17..=19).contains(&lod.clusters.len()), "{} clusters", lod.clusters.len());

    let total: usize = lod.clusters.iter().map(|c| c.triangle_count()).sum();
    assert_eq!(total, 1024);

    for c in &lod.clusters {
        assert!(c.triangle_count() <= CLUSTER_THRESHOLD as usize);
    }

    // Parts only overshoot the target by the partitioner's imbalance, so the total shortfall
    // below the target is bounded by the padding that took the place of real triangles.
    let target = CLUSTER_SIZE as usize;
    let padding = 19 * target - 1024;
    let slack = target * 3 / 100 + 1;

    let mut counts: Vec<_> = lod.clusters.iter().map(|c| c.triangle_count()).collect();
    counts.sort_unstable();

    let shortfall: usize = counts.iter().map(|&n| target.saturating_sub(n)).sum();
    assert!(shortfall <= padding + 19 * slack, "{counts:?}");
    assert!(counts.iter().all(|&n| n <= target + slack), "{counts:?}");

    // Even with the padding spread evenly, a typical cluster is close to full
    let median = counts[counts.len() / 2];
    assert!((1024 / 19 - slack..=target + slack).contains(&median), "{counts:?}");

    Ok(())
}

#[test]
fn test_level_stats() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(64, 32, 3)?;

    for lod in &hierarchy.lods {
        let stats = stat_readout(lod);
        let sizes: Vec<_> = lod.clusters.iter().map(|c| c.triangle_count()).collect();

        assert_eq!(stats.level, lod.level);
        assert_eq!(stats.clusters, lod.clusters.len());
        assert_eq!(stats.triangles, sizes.iter().sum::<usize>());
        assert_eq!(stats.max_tris, *sizes.iter().max().unwrap());
        assert_eq!(stats.min_tris, *sizes.iter().min().unwrap());
        assert!(stats.max_tris <= CLUSTER_THRESHOLD as usize);

        assert!(stats.min_error <= stats.max_error);
        for c in &lod.clusters {
            assert!((stats.min_error..=stats.max_error).contains(&c.normalized_lod_error));
        }
    }

    // Full resolution clusters have no error
    assert_eq!(stat_readout(&hierarchy.lods[0]).max_error, 0.0);

    Ok(())
}

#[test]
fn test_child_error_propagation() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(64, 32, 3)?;
    assert_eq!(hierarchy.level_count(), 3);

    let l0 = &hierarchy.lods[0];
    let l1 = &hierarchy.lods[1];

    // Each group loses up to half its faces, plus one for an overshooting collapse
    let min_faces = l0.face_count() / 2 - l0.groups.len();
    assert!(l1.face_count() >= min_faces, "{} < {min_faces}", l1.face_count());
    assert!(
        (l1.face_count() as f64) < l0.face_count() as f64 * 0.75,
        "Only reduced {} to {}",
        l0.face_count(),
        l1.face_count()
    );

    for pair in hierarchy.lods.windows(2) {
        let (children, parents) = (&pair[0], &pair[1]);

        for parent in &parents.clusters {
            assert!(!parent.child_cluster_indices.is_empty());

            let max_child_error = parent
                .child_cluster_indices
                .iter()
                .map(|&c| children.clusters[c as usize].lod_error)
                .fold(0.0, f64::max);

            assert_eq!(parent.child_lod_error_max, max_child_error);
            assert!(parent.lod_error >= parent.child_lod_error_max);

            // The group's error is spread over the clusters it was split into, plus one
            let first_child = &children.clusters[parent.child_cluster_indices[0] as usize];
            let siblings = first_child.parent_cluster_indices.len();
            let expected = parent.qem_error / (siblings + 1) as f64 + max_child_error;
            assert!(
                (parent.lod_error - expected).abs() <= 1e-9 * expected.max(1.0),
                "{} != {expected}",
                parent.lod_error
            );
        }
    }

    Ok(())
}

#[test]
fn test_bounded_clusters_and_containment() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(64, 32, 4)?;

    for lod in &hierarchy.lods {
        for (c, cluster) in lod.clusters.iter().enumerate() {
            assert!(
                cluster.triangle_count() <= CLUSTER_THRESHOLD as usize,
                "L{} cluster {c} has {} triangles",
                lod.level,
                cluster.triangle_count()
            );

            if cluster.is_empty() {
                continue;
            }

            let sphere = cluster.bounding_sphere;
            assert!(sphere.radius() > 0.0);

            for &f in &cluster.triangle_indices {
                assert_eq!(lod.face_clusters[f as usize] as usize, c);

                for p in lod.triangle_positions(f as usize) {
                    assert!(
                        sphere.contains_point(p, 1e-4),
                        "L{} cluster {c}: {p} outside {sphere:?}",
                        lod.level
                    );
                }
            }

            // Parents always enclose their children
            assert!(cluster.parent_bounding_sphere.radius() >= sphere.radius());
        }
    }

    Ok(())
}

#[test]
fn test_monotonic_and_consistent_error() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(64, 32, 4)?;

    for pair in hierarchy.lods.windows(2) {
        let (children, parents) = (&pair[0], &pair[1]);

        for child in &children.clusters {
            for &p in &child.parent_cluster_indices {
                let parent = &parents.clusters[p as usize];

                assert!(parent.normalized_lod_error >= child.normalized_lod_error);
                assert!(
                    (parent.normalized_lod_error - child.parent_normalized_error).abs()
                        <= f32::EPSILON as f64
                );
            }
        }
    }

    let roots = hierarchy.lods.last().ok_or("No levels")?;
    assert!(roots.is_terminal());
    for root in &roots.clusters {
        assert_eq!(root.parent_normalized_error, ROOT_PARENT_ERROR);
    }

    // Every non-root cluster has parents, and every parent lists its children back
    for pair in hierarchy.lods.windows(2) {
        for (c, child) in pair[0].clusters.iter().enumerate() {
            assert!(!child.parent_cluster_indices.is_empty());

            for &p in &child.parent_cluster_indices {
                assert!(pair[1].clusters[p as usize]
                    .child_cluster_indices
                    .contains(&(c as u32)));
            }
        }
    }

    Ok(())
}

#[test]
fn test_sorted_triangle_ranges() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(32, 16, 3)?;

    for lod in &hierarchy.lods {
        let ranges = lod.cluster_triangle_ranges();

        for (cluster, range) in lod.clusters.iter().zip(&ranges) {
            assert_eq!(range.len(), cluster.triangle_count());

            for i in range.clone() {
                assert!(cluster
                    .triangle_indices
                    .contains(&lod.sorted_triangles[i as usize]));
            }
        }
    }

    Ok(())
}

#[test]
fn test_serialization_round_trip() -> Result<(), Box<dyn Error>> {
    let hierarchy = torus_hierarchy(32, 16, 3)?;

    let bytes = hierarchy.to_bytes()?;
    let loaded = MeshHierarchy::from_bytes(&bytes)?;

    assert_eq!(loaded.level_count(), hierarchy.level_count());
    for (a, b) in hierarchy.lods.iter().zip(&loaded.lods) {
        assert_eq!(a.clusters.len(), b.clusters.len());
        assert_eq!(a.sorted_triangles, b.sorted_triangles);

        for (ca, cb) in a.clusters.iter().zip(&b.clusters) {
            assert_eq!(ca.triangle_indices, cb.triangle_indices);
            assert_eq!(ca.bounding_sphere, cb.bounding_sphere);
        }
    }
    assert_eq!(loaded, hierarchy);

    // Truncated data must not decode
    assert!(MeshHierarchy::from_bytes(&bytes[..bytes.len() / 2]).is_err());

    Ok(())
}

#[test]
fn test_build_determinism() -> Result<(), Box<dyn Error>> {
    let a = torus_hierarchy(32, 16, 3)?;
    let b = torus_hierarchy(32, 16, 3)?;

    assert_eq!(a, b);
    assert!(a.same_shape(&b));

    Ok(())
}

#[test]
fn test_builds_to_roots() -> Result<(), Box<dyn Error>> {
    let hierarchy = HierarchyBuilder::from_tri_mesh(
        &TriMesh::uv_sphere(1.0, 16, 32),
        "sphere",
        BuildConfig::default(),
    )
    .run()?;

    let roots = hierarchy.lods.last().ok_or("No levels")?;
    assert!(hierarchy.level_count() > 1);
    assert!(roots.clusters.len() < hierarchy.lods[0].clusters.len());

    for pair in hierarchy.lods.windows(2) {
        assert!(pair[1].face_count() < pair[0].face_count());
    }
    for lod in &hierarchy.lods {
        assert_eq!(lod.sorted_indices.len(), lod.indices.len());
    }

    Ok(())
}

#[test]
fn test_noisy_surface_invariants() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut mesh = TriMesh::torus(2.0, 0.5, 48, 24);

    for v in mesh.verts.iter_mut() {
        let offset = Vec3::new(
            rng.gen_range(-0.03..0.03),
            rng.gen_range(-0.03..0.03),
            rng.gen_range(-0.03..0.03),
        );
        *v += offset.extend(0.0);
    }

    let hierarchy = build_hierarchy(&mesh, "noisy", &BuildConfig::default())?;
    assert!(hierarchy.level_count() > 1);

    for pair in hierarchy.lods.windows(2) {
        let (children, parents) = (&pair[0], &pair[1]);

        for child in children.clusters.iter().filter(|c| !c.is_empty()) {
            for &p in &child.parent_cluster_indices {
                let parent = &parents.clusters[p as usize];
                assert!(parent.normalized_lod_error >= child.normalized_lod_error);
                assert!(parent.bounding_sphere.radius() >= child.bounding_sphere.radius());
            }
        }
    }

    // Simplifying noise costs something
    let errors: f64 = hierarchy.lods[1].clusters.iter().map(|c| c.lod_error).sum();
    assert!(errors > 0.0);

    Ok(())
}

#[test]
fn test_error_independent_of_position() -> Result<(), Box<dyn Error>> {
    let config = BuildConfig {
        max_levels: 2,
        ..Default::default()
    };

    let at_origin = TriMesh::torus(2.0, 0.5, 64, 32);
    let mut moved = at_origin.clone();
    for v in moved.verts.iter_mut() {
        *v += Vec3::new(100.0, 0.0, 0.0).extend(0.0);
    }

    let max_error = |mesh: &TriMesh| -> Result<f64, Box<dyn Error>> {
        let hierarchy = build_hierarchy(mesh, "torus", &config)?;
        let l1 = hierarchy.lods.get(1).ok_or("No level 1")?;
        Ok(l1.clusters.iter().map(|c| c.lod_error).fold(0.0, f64::max))
    };

    let a = max_error(&at_origin)?;
    let b = max_error(&moved)?;

    assert!(a > 0.0);
    // Rounding of the moved positions may reorder a few collapses, nothing more
    assert!(b < a * 2.0 && a < b * 2.0, "{a} at the origin, {b} moved");

    Ok(())
}
