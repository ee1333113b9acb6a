//! Seasonal water composites.
//!
//! Monthly rasters hold one of three classes per pixel (no-data, not water,
//! water). Each year gets a dry and a wet composite over fixed month
//! windows plus a permanent composite crossing the two.

mod archive;
mod class;
mod composite;
mod window;

pub use archive::{
    build_composites, composite_year, parse_month_name, CompositeMetadata, MonthlyArchive,
    MonthlyDirectory, MonthlySource, SeasonalComposite, SeasonalCompositeBuilder,
};
pub use class::{permanent_class, season_class, PixClass};
pub use composite::{permanent_composite, season_composite};
pub use window::{SeasonWindows, DRY_BAND_PREFIX, PERMANENT_BAND_PREFIX, WET_BAND_PREFIX};
