//! Region statistics over seasonal composites
//!
//! - **region_area**: per-class hectares of each region, year and season
//! - **theil_sen**: Sen's slope line fitting
//! - **trend**: gated per-region trends with placeholders
//! - **pivot**: long time series to a wide table
//! - **display**: slope-ranked views with minimum zoom levels

pub mod display;
pub mod pivot;
pub mod region_area;
pub mod theil_sen;
pub mod trend;

pub use display::{display_by_season, display_rows, region_centroids, DisplayParams, DisplayRow};
pub use pivot::{pivot_wide, PivotTable};
pub use region_area::{
    aggregate_band, aggregate_composites, cell_area_ha, class_areas, season_tag, ClassAreas,
    Footprint, FootprintCache, Region, RegionAreaAggregator, RegionAreaRecord, EARTH_RADIUS,
};
pub use theil_sen::{median, sens_slope, LinearFit};
pub use trend::{
    estimate_trends, fit_region, split_by_season, TrendEstimator, TrendParams, TrendRecord,
    INVALID_SLOPE,
};
