//! Georeferencing of axis-aligned grids

use serde::{Deserialize, Serialize};

/// Origin and pixel size of an axis-aligned raster.
///
/// `(col, row)` lattice coordinates map to `x = origin_x + col * pixel_width`
/// and `y = origin_y + row * pixel_height`. The GeoTIFFs this pipeline reads
/// carry a tie point and a pixel scale, never a rotated model transform, so
/// rotation is not represented. North-up grids have a negative
/// `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// North-up transform whose origin is snapped outward to a multiple of
    /// `resolution`, covering `(min_x, min_y, max_x, max_y)`.
    ///
    /// Returns the transform and the `(rows, cols)` needed to cover the box.
    /// Grids built this way for different extents share pixel edges, so
    /// outputs of separately processed sub-regions line up.
    pub fn snapped(bounds: (f64, f64, f64, f64), resolution: f64) -> (Self, usize, usize) {
        let (min_x, min_y, max_x, max_y) = bounds;
        let origin_x = (min_x / resolution).floor() * resolution;
        let origin_y = (max_y / resolution).ceil() * resolution;
        let cols = (((max_x - origin_x) / resolution).ceil() as usize).max(1);
        let rows = (((origin_y - min_y) / resolution).ceil() as usize).max(1);
        (Self::new(origin_x, origin_y, resolution, -resolution), rows, cols)
    }

    /// Map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of a lattice vertex
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional lattice coordinates `(col, row)` of a map point.
    ///
    /// NaN for a degenerate (zero-sized) pixel.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Pixel width; cells are taken to be square
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Planar area of one cell in squared map units
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// Whether two transforms describe the same lattice within `tolerance`
    /// (relative to the cell size)
    pub fn aligned_with(&self, other: &GeoTransform, tolerance: f64) -> bool {
        let eps = tolerance * self.cell_size().max(f64::MIN_POSITIVE);
        [
            self.origin_x - other.origin_x,
            self.origin_y - other.origin_y,
            self.pixel_width - other.pixel_width,
            self.pixel_height - other.pixel_height,
        ]
        .iter()
        .all(|d| d.abs() <= eps)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
