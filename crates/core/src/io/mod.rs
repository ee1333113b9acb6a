//! I/O for rasters, vectors and tables

mod raster;
mod table;
mod vector;

pub use raster::{
    read_geotiff, read_geotiff_bands, write_geotiff, write_geotiff_bands, GeoTiffOptions,
    MultiBand, PixelType,
};
pub use table::{read_csv, write_csv, write_records};
pub use vector::{read_geojson, write_geojson};
