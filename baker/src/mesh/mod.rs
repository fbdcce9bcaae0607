pub mod edge;
pub mod face;
pub mod half_edge_mesh;
pub mod pidge;
pub mod plane;
pub mod quadric;
pub mod quadric_error;
pub mod vertex;

mod graph;
mod partition;
mod reduction;

pub use graph::dual_graph_padding;
