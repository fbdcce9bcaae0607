use petgraph::{
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::Idx;

/// Undirected graph with integer edge costs, the shape METIS consumes.
pub type WeightedGraph<V> = UnGraph<V, Idx>;

/// Connect `a` and `b` with exactly `weight`, overwriting any previous weight.
pub fn set_edge<V>(graph: &mut WeightedGraph<V>, a: NodeIndex, b: NodeIndex, weight: Idx) {
    graph.update_edge(a, b, weight);
}

/// Connect `a` and `b`, accumulating `cost` onto an existing connection.
pub fn add_edge_cost<V>(graph: &mut WeightedGraph<V>, a: NodeIndex, b: NodeIndex, cost: Idx) {
    match graph.find_edge(a, b) {
        Some(e) => graph[e] += cost,
        None => {
            graph.add_edge(a, b, cost);
        }
    }
}

/// Smallest multiple of `multiple` that can hold `count` nodes.
pub fn padded_len(count: usize, multiple: usize) -> usize {
    count.div_ceil(multiple.max(1)) * multiple.max(1)
}

/// Append isolated nodes with weight `pad` until the graph holds `len` nodes.
pub fn pad_graph<V: Clone>(graph: &mut WeightedGraph<V>, len: usize, pad: V) {
    while graph.node_count() < len {
        graph.add_node(pad.clone());
    }
}

/// Compressed sparse row adjacency, as described in section 5.5 of the METIS manual.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrGraph {
    pub xadj: Vec<Idx>,
    pub adjncy: Vec<Idx>,
    pub adjwgt: Vec<Idx>,
}

impl CsrGraph {
    pub fn from_graph<V>(graph: &WeightedGraph<V>) -> Self {
        let mut adjncy = Vec::with_capacity(2 * graph.edge_count());
        let mut adjwgt = Vec::with_capacity(2 * graph.edge_count());
        let mut xadj = Vec::with_capacity(graph.node_count() + 1);

        for v in graph.node_indices() {
            xadj.push(adjncy.len() as Idx);

            for e in graph.edges(v) {
                let other = if v == e.target() {
                    e.source()
                } else {
                    e.target()
                };

                adjncy.push(other.index() as Idx);
                adjwgt.push(*e.weight());
            }
        }
        xadj.push(adjncy.len() as Idx);

        debug_assert_eq!(adjncy.len(), 2 * graph.edge_count());

        Self {
            xadj,
            adjncy,
            adjwgt,
        }
    }

    pub fn node_count(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    pub fn neighbours(&self, v: usize) -> &[Idx] {
        &self.adjncy[self.xadj[v] as usize..self.xadj[v + 1] as usize]
    }
}
