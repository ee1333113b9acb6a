//! Georeferenced grid shared by every pipeline stage

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// Cells of one band plus the georeferencing that places them.
///
/// Flow accumulation, flow direction, monthly water class and seasonal
/// composites are all `Raster`s; derived grids inherit the source's
/// transform and CRS through [`Raster::with_data`], [`Raster::like`] or
/// [`Raster::map`].
///
/// ```ignore
/// use rivertrend_core::Raster;
///
/// let mut acc: Raster<f64> = Raster::new(100, 100);
/// acc.set(10, 20, 5200.0)?;
/// let river = acc.map(|v| u8::from(v > 5000.0));
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled, on the default unit grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::zero())
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::ungeoreferenced(Array2::from_elem((rows, cols), value))
    }

    /// Row-major `data` of a `rows` x `cols` grid
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        let data = Array2::from_shape_vec((rows, cols), data).map_err(|_| Error::InvalidDimensions {
            width: cols,
            height: rows,
        })?;
        Ok(Self::ungeoreferenced(data))
    }

    fn ungeoreferenced(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Wrap `data` in this raster's georeferencing.
    ///
    /// Fails when `data` does not have this raster's shape.
    pub fn with_data<U: RasterElement>(&self, data: Array2<U>) -> Result<Raster<U>> {
        let (er, ec) = self.shape();
        let (ar, ac) = data.dim();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(self.rewrap(data))
    }

    /// Same grid, every cell set to `fill_value`
    pub fn like<U: RasterElement>(&self, fill_value: U) -> Raster<U> {
        self.rewrap(Array2::from_elem(self.data.dim(), fill_value))
    }

    /// Cell-wise conversion onto the same grid
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        self.rewrap(self.data.mapv(f))
    }

    // no-data is not carried over: its meaning depends on the cell type
    fn rewrap<U: RasterElement>(&self, data: Array2<U>) -> Raster<U> {
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        let (rows, cols) = self.shape();
        Error::IndexOutOfBounds { row, col, rows, cols }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    /// # Safety
    /// `row < self.rows()` and `col < self.cols()`
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Whether the raster is in geographic (degree) coordinates
    pub fn is_geographic(&self) -> bool {
        self.crs.as_ref().is_some_and(CRS::is_geographic)
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map coordinates of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Cell `(row, col)` containing map point `(x, y)`, if inside the grid
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Inclusive-exclusive cell window `(row_start, row_end, col_start, col_end)`
    /// covering a map-space box, clipped to the grid. `None` if disjoint.
    pub fn window(&self, bounds: (f64, f64, f64, f64)) -> Option<(usize, usize, usize, usize)> {
        let (min_x, min_y, max_x, max_y) = bounds;
        let corners = [
            self.transform.geo_to_pixel(min_x, min_y),
            self.transform.geo_to_pixel(min_x, max_y),
            self.transform.geo_to_pixel(max_x, min_y),
            self.transform.geo_to_pixel(max_x, max_y),
        ];
        let (c0, r0, c1, r1) = corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(c0, r0, c1, r1), &(c, r)| (c0.min(c), r0.min(r), c1.max(c), r1.max(r)),
        );
        if !(c0.is_finite() && r0.is_finite() && c1.is_finite() && r1.is_finite()) {
            return None;
        }

        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        let row_start = clamp(r0.floor(), self.rows());
        let row_end = clamp(r1.ceil(), self.rows());
        let col_start = clamp(c0.floor(), self.cols());
        let col_end = clamp(c1.ceil(), self.cols());

        (row_start < row_end && col_start < col_end)
            .then_some((row_start, row_end, col_start, col_end))
    }

    /// Fail unless `other` has the same shape and lattice as this raster
    pub fn ensure_same_grid<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        if !self.transform.aligned_with(other.transform(), 1e-6) {
            return Err(Error::GridMismatch(format!(
                "{:?} vs {:?}",
                self.transform,
                other.transform()
            )));
        }
        Ok(())
    }

    /// Whether `value` is missing under this raster's no-data sentinel
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }
}
