//! Balanced k-way graph partitioning over METIS.

mod graph;
mod partition;

pub use graph::*;
pub use partition::*;

#[cfg(test)]
pub mod test {
    use petgraph::graph::NodeIndex;

    use super::*;

    /// Grid of `w * h` nodes, 4-connected with unit weights
    fn grid_graph(w: usize, h: usize) -> WeightedGraph<()> {
        let mut g = WeightedGraph::default();
        for _ in 0..w * h {
            g.add_node(());
        }
        for y in 0..h {
            for x in 0..w {
                let i = NodeIndex::new(y * w + x);
                if x + 1 < w {
                    set_edge(&mut g, i, NodeIndex::new(y * w + x + 1), 1);
                }
                if y + 1 < h {
                    set_edge(&mut g, i, NodeIndex::new((y + 1) * w + x), 1);
                }
            }
        }
        g
    }

    fn seeded() -> PartitioningConfig {
        PartitioningConfig::default().with_seed(42)
    }

    #[test]
    fn test_2_node_graph() {
        let mut g = WeightedGraph::default();

        let a = g.add_node(());
        let b = g.add_node(());

        set_edge(&mut g, a, b, 1);

        let test_config = &seeded().with_method(PartitioningMethod::MultilevelRecursiveBisection);

        let p = test_config.partition_from_edge_weighted_graph(2, &g).unwrap();

        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn test_single_partition_shortcut() {
        let g = grid_graph(5, 5);

        let p = seeded().partition_from_edge_weighted_graph(1, &g).unwrap();

        assert_eq!(p, vec![0; 25]);
    }

    #[test]
    fn test_partition_determinism() {
        let g = grid_graph(16, 12);
        let config = seeded().with_u_factor(1);

        let first = config.partition_from_edge_weighted_graph(8, &g).unwrap();

        for _ in 0..4 {
            assert_eq!(first, config.partition_from_edge_weighted_graph(8, &g).unwrap());
        }

        assert!(first.iter().all(|&p| p < 8));
    }

    #[test]
    fn test_partition_balance() {
        let g = grid_graph(16, 12);

        let p = seeded()
            .with_u_factor(1)
            .partition_from_edge_weighted_graph(4, &g)
            .unwrap();

        let mut sizes = [0; 4];
        for i in p {
            sizes[i as usize] += 1;
        }

        println!("{sizes:?}");
        assert_eq!(sizes.iter().sum::<usize>(), 16 * 12);
        assert!(sizes.iter().all(|&s| s > 0));
    }

    #[test]
    fn test_too_many_partitions() {
        let g = grid_graph(2, 2);

        assert_eq!(
            seeded().partition_from_edge_weighted_graph(5, &g),
            Err(PartitioningError::PartitionCount(5, 4))
        );
    }

    #[test]
    fn test_edgeless_graph() {
        let mut g = WeightedGraph::default();
        pad_graph(&mut g, 6, ());

        let p = seeded().partition_from_edge_weighted_graph(3, &g).unwrap();

        assert_eq!(p, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_edge_cost_accumulates() {
        let mut g = WeightedGraph::default();
        let a = g.add_node(());
        let b = g.add_node(());

        add_edge_cost(&mut g, a, b, 1);
        add_edge_cost(&mut g, b, a, 1);
        add_edge_cost(&mut g, a, b, 3);

        assert_eq!(g.edge_count(), 1);
        assert_eq!(g[g.find_edge(a, b).unwrap()], 5);

        set_edge(&mut g, a, b, 1);
        assert_eq!(g[g.find_edge(a, b).unwrap()], 1);
    }

    #[test]
    fn test_csr_layout() {
        let g = grid_graph(3, 1);

        let csr = CsrGraph::from_graph(&g);

        assert_eq!(csr.node_count(), 3);
        assert_eq!(csr.xadj, vec![0, 1, 3, 4]);
        assert_eq!(csr.neighbours(0), &[1]);
        assert_eq!(csr.neighbours(2), &[1]);
        let mut middle = csr.neighbours(1).to_vec();
        middle.sort();
        assert_eq!(middle, vec![0, 2]);
        assert_eq!(csr.adjwgt, vec![1; 4]);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padded_len(19, 15), 30);
        assert_eq!(padded_len(30, 15), 30);
        assert_eq!(padded_len(0, 15), 0);

        let mut g = grid_graph(2, 2);
        pad_graph(&mut g, padded_len(4, 3), ());
        assert_eq!(g.node_count(), 6);
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_pack_partitioning() {
        let mut p = vec![4, 0, 4, 7, 0];

        assert_eq!(pack_partitioning(&mut p), 3);
        assert_eq!(p, vec![1, 0, 1, 2, 0]);

        assert_eq!(pack_partitioning(&mut []), 0);
    }
}
