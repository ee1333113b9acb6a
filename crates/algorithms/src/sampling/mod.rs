//! Spatial point sampling along the river network
//!
//! - `sampler`: threshold the accumulation raster, read flow direction,
//!   thin candidates to a minimum spacing
//! - `conflict`: explicit adjacency graph behind the thinning
//! - `kdtree`: fixed-radius neighbour search for the graph

mod conflict;
mod kdtree;
mod point;
mod sampler;

pub use conflict::{ConflictGraph, DistanceMetric};
pub use kdtree::KdTree;
pub use point::{
    TransectPoint, FLOW_ACC_FIELD, FLOW_DIR_FIELD, HALF_LENGTH_FIELD, PERP1_FIELD, PERP2_FIELD,
};
pub use sampler::{extract_candidates, sample_points, SampleOutcome, SamplerParams, SpatialPointSampler};
