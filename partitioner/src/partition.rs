use thiserror::Error;

use crate::graph::{CsrGraph, WeightedGraph};

pub type Idx = metis::Idx;

/// Specifies the used algorithm.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum PartitioningMethod {
    /// Multilevel k-way partitioning
    /// `METIS_PartGraphKway`
    #[default]
    MultilevelKWay,
    /// Multilevel recursive bisection
    /// `METIS_PartGraphRecursive`
    MultilevelRecursiveBisection,
}

/// Configuration for METIS graph partitioning.
/// Used to select an algorithm and configure METIS options.
/// [`None`] values correspond to the default METIS option.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitioningConfig {
    /// Specifies the used algorithm.
    pub method: PartitioningMethod,
    /// Specifies the number of different partitionings that it will compute.
    /// The final partitioning is the one that achieves the best edgecut or communication volume.
    /// Default is 1.
    /// `METIS_OPTION_NCUTS`
    pub partitioning_attempts: Option<Idx>,
    /// Specifies the number of iterations for the refinement algorithms at each stage of the uncoarsening process.
    /// Default is 10.
    /// `METIS_OPTION_NITER`
    pub refinement_iterations: Option<Idx>,
    /// Specifies the seed for the random number generator.
    /// `METIS_OPTION_SEED`
    pub rng_seed: Option<Idx>,
    /// Specifies that the partitioning routines should try to minimize the maximum degree of the subdomain graph.
    /// Only used by k-way partitioning.
    /// `METIS_OPTION_MINCONN`
    pub minimize_subgraph_degree: Option<bool>,
    /// Specifies that the partitioning routines should try to produce partitions that are contiguous.
    /// Only used by k-way partitioning, and ignored by METIS if the input graph is not connected.
    /// `METIS_OPTION_CONTIG`
    pub force_contiguous_partitions: Option<bool>,
    /// Specifies the maximum allowed load imbalance among the partitions, in thousandths.
    /// `METIS_OPTION_UFACTOR`
    pub u_factor: Option<Idx>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitioningError {
    #[error("Requested {0} partitions of a graph with {1} nodes")]
    PartitionCount(u32, usize),
    #[error("Erroneous inputs and/or options")]
    Input,
    #[error("Insufficient memory")]
    Memory,
    #[error("Other error")]
    Other,
}

impl From<metis::Error> for PartitioningError {
    fn from(value: metis::Error) -> Self {
        match value {
            metis::Error::Input => PartitioningError::Input,
            metis::Error::Memory => PartitioningError::Memory,
            _ => PartitioningError::Other,
        }
    }
}

impl PartitioningConfig {
    pub fn with_seed(mut self, seed: Idx) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_u_factor(mut self, u_factor: Idx) -> Self {
        self.u_factor = Some(u_factor);
        self
    }

    pub fn with_method(mut self, method: PartitioningMethod) -> Self {
        self.method = method;
        self
    }

    /// Split `graph` into `partitions` balanced parts, minimising the total weight of cut edges.
    ///
    /// Returns the part of every node, indexed by node index. The result is deterministic
    /// for a fixed seed and graph.
    pub fn partition_from_edge_weighted_graph<V>(
        &self,
        partitions: u32,
        graph: &WeightedGraph<V>,
    ) -> Result<Vec<u32>, PartitioningError> {
        self.partition_from_csr(partitions, &CsrGraph::from_graph(graph))
    }

    pub fn partition_from_csr(
        &self,
        partitions: u32,
        csr: &CsrGraph,
    ) -> Result<Vec<u32>, PartitioningError> {
        let nodes = csr.node_count();

        if partitions == 0 || partitions as usize > nodes.max(1) {
            return Err(PartitioningError::PartitionCount(partitions, nodes));
        }

        if partitions == 1 {
            return Ok(vec![0; nodes]);
        }

        if csr.adjncy.is_empty() {
            // Nothing to cut, split by node order
            let part_size = nodes.div_ceil(partitions as usize);
            log::debug!("Partitioning edgeless graph of {nodes} nodes by order");
            return Ok((0..nodes).map(|i| (i / part_size) as u32).collect());
        }

        let mut part = vec![0 as Idx; nodes];

        let mut graph = metis::Graph::new(1, partitions as Idx, &csr.xadj, &csr.adjncy)
            .map_err(|_| PartitioningError::Input)?
            .set_adjwgt(&csr.adjwgt);

        if let Some(x) = self.rng_seed {
            graph = graph.set_option(metis::option::Seed(x));
        }
        if let Some(x) = self.u_factor {
            graph = graph.set_option(metis::option::UFactor(x));
        }
        if let Some(x) = self.partitioning_attempts {
            graph = graph.set_option(metis::option::NCuts(x));
        }
        if let Some(x) = self.refinement_iterations {
            graph = graph.set_option(metis::option::NIter(x));
        }

        match self.method {
            PartitioningMethod::MultilevelKWay => {
                if let Some(x) = self.minimize_subgraph_degree {
                    graph = graph.set_option(metis::option::MinConn(x));
                }
                if let Some(x) = self.force_contiguous_partitions {
                    graph = graph.set_option(metis::option::Contig(x));
                }
                graph.part_kway(&mut part)?;
            }
            PartitioningMethod::MultilevelRecursiveBisection => {
                graph.part_recursive(&mut part)?;
            }
        }

        part.into_iter()
            .map(|p| {
                u32::try_from(p)
                    .ok()
                    .filter(|&p| p < partitions)
                    .ok_or(PartitioningError::Other)
            })
            .collect()
    }
}

/// Renumber partition ids so they densely span `0..N`, preserving their relative order.
/// Returns `N`.
pub fn pack_partitioning(partitioning: &mut [u32]) -> u32 {
    let Some(&max) = partitioning.iter().max() else {
        return 0;
    };

    let mut remap = vec![u32::MAX; max as usize + 1];
    for &p in partitioning.iter() {
        remap[p as usize] = 0;
    }

    let mut next = 0;
    for r in remap.iter_mut() {
        if *r == 0 {
            *r = next;
            next += 1;
        }
    }

    for p in partitioning.iter_mut() {
        *p = remap[*p as usize];
    }

    next
}
