//! # rivertrend core
//!
//! Core types, traits and I/O for the rivertrend river-channel change pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced grid
//! - `GeoTransform`: affine georeferencing, snapping to a coarser grid
//! - `CRS`: coordinate reference system, with geographic detection
//! - `d8`: flow-direction code tables and grid-angle helpers
//! - `vector`: features with typed attributes
//! - I/O for GeoTIFF (single and multi-page), GeoJSON and CSV

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{d8, GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// A pipeline stage.
///
/// Each stage is also callable as a free function; the trait gives the
/// stages a uniform name, description and parameter type.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;
}
