use petgraph::{visit::EdgeRef, EdgeType, Graph};

/// Generate a graph corresponding to the dual mesh of a mesh generated from triangulating a grid
///
/// For example, the triangle grid:
/// / -------------------
/// / |A/|C/|E/|G/|I/|K/|
/// / |/B|/D|/F|/H|/J|/L|
/// / -------------------
/// / |M/|O/|Q/|S/|U/|W/|
/// / |/N|/P|/R|/T|/V|/X|
/// / -------------------
///
/// Will have a graph with node Q connecting to R, P, and F
pub fn generate_triangle_plane_weighted<const N: usize, const M: usize, E>(
    f: impl Fn(usize, usize) -> E,
) -> Graph<(), E, petgraph::Undirected> {
    let mut graph = Graph::with_capacity(N * M, N * M * 3);
    let mut nodes = [[petgraph::graph::node_index(0); N]; M];
    for row in nodes.iter_mut() {
        for n in row.iter_mut() {
            *n = graph.add_node(());
        }
    }

    for m in 0..M {
        for n in 0..N {
            let a = nodes[m][n];

            if n < N - 1 {
                graph.update_edge(a, nodes[m][n + 1], f(a.index(), nodes[m][n + 1].index()));

                if m < M - 1 && n % 2 == 0 {
                    graph.update_edge(
                        a,
                        nodes[m + 1][n + 1],
                        f(a.index(), nodes[m + 1][n + 1].index()),
                    );
                }
            }
        }
    }

    graph
}

pub fn generate_triangle_plane<const N: usize, const M: usize>(
) -> Graph<(), (), petgraph::Undirected> {
    generate_triangle_plane_weighted::<N, M, _>(|_, _| ())
}

/// Debug colours for graph colourings, indexed modulo length
pub const PALETTE: [[f32; 3]; 10] = [
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.5, 0.0],
    [0.0, 1.0, 1.0],
    [0.39, 0.58, 0.93],
    [1.0, 0.73, 0.06],
    [1.0, 0.08, 0.58],
    [0.29, 0.0, 0.51],
    [0.85, 0.44, 0.84],
    [0.8, 0.52, 0.25],
];

pub fn palette_colour(i: u32) -> [f32; 3] {
    PALETTE[i as usize % PALETTE.len()]
}

/// Greedy colouring so no two neighbours share a colour.
///
/// Nodes are visited from highest to lowest degree, each taking the smallest colour none of its
/// already coloured neighbours use.
pub fn colour_graph<V, E, Ty: EdgeType>(graph: &Graph<V, E, Ty>) -> Vec<u32> {
    let mut order: Vec<_> = graph.node_indices().collect();
    order.sort_by_key(|&n| std::cmp::Reverse(graph.edges(n).count()));

    let mut colours = vec![u32::MAX; graph.node_count()];
    let mut used = Vec::new();

    for n in order {
        used.clear();
        for e in graph.edges(n) {
            let other = if e.source() == n { e.target() } else { e.source() };
            let c = colours[other.index()];
            if c != u32::MAX {
                used.push(c);
            }
        }

        colours[n.index()] = (0..).find(|c| !used.contains(c)).unwrap_or_default();
    }

    colours
}

pub fn graph_contiguous<V, E, Ty: EdgeType>(graph: &Graph<V, E, Ty>) -> bool {
    if graph.node_count() == 0 {
        return true;
    }

    let mut search = vec![0];
    let mut seen = vec![false; graph.node_count()];

    while let Some(next) = search.pop() {
        seen[next] = true;

        for n in graph.neighbors_undirected(petgraph::graph::node_index(next)) {
            if !seen[n.index()] {
                search.push(n.index())
            }
        }
    }

    seen.iter().all(|&x| x)
}

pub fn assert_graph_contiguous<V: std::fmt::Debug, E: std::fmt::Debug, Ty: EdgeType>(
    graph: &Graph<V, E, Ty>,
) {
    assert!(
        graph_contiguous(graph),
        "Graph is not contiguous: {graph:?}"
    );
}
