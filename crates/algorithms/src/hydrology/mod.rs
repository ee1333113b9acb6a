//! Flow rasters and their derivation from elevation

mod flow;

pub use flow::{
    derive_flow_raster, flow_accumulation, flow_direction_esri, FlowDerivation, FlowRaster,
    METRES_PER_DEGREE,
};
