//! # rivertrend algorithms
//!
//! Pipeline stages for tracking river-channel change from surface-water
//! rasters.
//!
//! ## Stages
//!
//! - **hydrology**: flow accumulation and direction, derivable from a DEM
//! - **sampling**: on-river transect points thinned to a minimum spacing
//! - **transect**: perpendicular transects drawn and vectorized with centroid ids
//! - **seasonal**: dry, wet and permanent water composites per year
//! - **statistics**: per-region class areas, Sen's-slope trends, wide pivot
//!   and display views
//!
//! All stage parameters live in [`config::PipelineConfig`].

pub mod config;
pub mod hydrology;
pub(crate) mod maybe_rayon;
pub mod sampling;
pub mod seasonal;
pub mod statistics;
pub mod transect;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::hydrology::{derive_flow_raster, FlowDerivation, FlowRaster};
    pub use crate::sampling::{sample_points, SampleOutcome, SamplerParams, SpatialPointSampler, TransectPoint};
    pub use crate::seasonal::{
        build_composites, MonthlyArchive, MonthlyDirectory, MonthlySource, PixClass, SeasonWindows,
        SeasonalComposite, SeasonalCompositeBuilder,
    };
    pub use crate::statistics::{
        aggregate_composites, display_rows, estimate_trends, pivot_wide, sens_slope, DisplayParams,
        Region, RegionAreaAggregator, RegionAreaRecord, TrendEstimator, TrendParams, TrendRecord,
    };
    pub use crate::transect::{generate_transects, TransectParams, TransectRasterizer, TransectSet};
    pub use rivertrend_core::prelude::*;
}
