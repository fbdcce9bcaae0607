//! Runtime side of cluster hierarchies: instances placed in a [scene::Scene], the records uploaded
//! for the compute stages, and the per frame selection of which clusters to draw.

pub mod components;
pub mod gpu_records;
pub mod scene;
pub mod selection;

pub use selection::{FrameSelection, SelectionConfig, SelectionError, SelectionStage};
