//! Flow rasters: the accumulation/direction pair the sampler walks.
//!
//! The pair normally comes from an external hydrography dataset. For local
//! runs it can be derived from a DEM: D8 steepest descent written as ESRI
//! codes, then an upstream cell count propagated in topological order.

use crate::maybe_rayon::*;
use ndarray::Array2;
use rivertrend_core::raster::d8::{self, DirectionEncoding};
use rivertrend_core::raster::Raster;
use rivertrend_core::{Algorithm, Error, Result};

/// Metres per degree of latitude on the mean-radius sphere
pub const METRES_PER_DEGREE: f64 = 111_195.08;

/// Co-registered flow accumulation and flow direction grids.
#[derive(Debug, Clone)]
pub struct FlowRaster {
    accumulation: Raster<f64>,
    direction: Raster<u8>,
    encoding: DirectionEncoding,
}

impl FlowRaster {
    /// Pair two rasters, failing unless they share one grid
    pub fn new(
        accumulation: Raster<f64>,
        direction: Raster<u8>,
        encoding: DirectionEncoding,
    ) -> Result<Self> {
        accumulation.ensure_same_grid(&direction)?;
        Ok(Self {
            accumulation,
            direction,
            encoding,
        })
    }

    pub fn accumulation(&self) -> &Raster<f64> {
        &self.accumulation
    }

    pub fn direction(&self) -> &Raster<u8> {
        &self.direction
    }

    pub fn encoding(&self) -> DirectionEncoding {
        self.encoding
    }

    pub fn shape(&self) -> (usize, usize) {
        self.accumulation.shape()
    }

    pub fn is_geographic(&self) -> bool {
        self.accumulation.is_geographic()
    }

    /// Upstream grid angle at a cell, `None` for pits and unknown codes
    pub fn upstream_degrees(&self, row: usize, col: usize) -> Option<u16> {
        let code = self.direction.get(row, col).ok()?;
        self.encoding.upstream_degrees(code)
    }

    /// Nominal cell size in metres for geographic grids, map units otherwise
    pub fn nominal_scale(&self) -> f64 {
        let size = self.accumulation.cell_size();
        if self.is_geographic() {
            size * METRES_PER_DEGREE
        } else {
            size
        }
    }
}

/// Derive a flow raster from a DEM
#[derive(Debug, Clone, Default)]
pub struct FlowDerivation;

impl Algorithm for FlowDerivation {
    type Input = Raster<f64>;
    type Output = FlowRaster;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Derivation (D8)"
    }

    fn description(&self) -> &'static str {
        "Derive ESRI-coded D8 flow direction and upstream cell counts from a DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        derive_flow_raster(&input)
    }
}

/// D8 direction plus accumulation from a DEM, direction in ESRI codes.
///
/// The DEM should be hydrologically conditioned; pits and flats get code 0.
pub fn derive_flow_raster(dem: &Raster<f64>) -> Result<FlowRaster> {
    let direction = flow_direction_esri(dem)?;
    let accumulation = flow_accumulation(&direction, dem)?;
    FlowRaster::new(accumulation, direction, DirectionEncoding::Esri)
}

/// Horizontal spacing `(dx, dy)` of one cell step on a given row
fn cell_spacing(dem: &Raster<f64>, row: usize) -> (f64, f64) {
    let gt = dem.transform();
    let (dx, dy) = (gt.pixel_width.abs(), gt.pixel_height.abs());
    if dem.is_geographic() {
        let (_, lat) = dem.cell_center(row, 0);
        let cos_lat = lat.to_radians().cos().max(1e-6);
        (dx * METRES_PER_DEGREE * cos_lat, dy * METRES_PER_DEGREE)
    } else {
        (dx, dy)
    }
}

/// Steepest-descent D8 direction as ESRI codes, 0 where no neighbour is lower
pub fn flow_direction_esri(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();

    let codes: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_codes = vec![0u8; cols];
            let (dx, dy) = cell_spacing(dem, row);

            for col in 0..cols {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                for &code in &d8::ESRI_CODES {
                    let Some((dr, dc)) = d8::esri_offset(code) else {
                        continue;
                    };
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }

                    let neighbor = unsafe { dem.get_unchecked(nr as usize, nc as usize) };
                    if dem.is_nodata(neighbor) {
                        continue;
                    }

                    let distance = ((dr as f64 * dy).powi(2) + (dc as f64 * dx).powi(2)).sqrt();
                    let drop = (center - neighbor) / distance;
                    if drop > max_drop {
                        max_drop = drop;
                        row_codes[col] = code;
                    }
                }
            }

            row_codes
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), codes).map_err(|e| Error::Other(e.to_string()))?;
    let mut output = dem.with_data(data)?;
    output.set_nodata(Some(0));
    Ok(output)
}

/// Upstream cell count for every cell of an ESRI direction raster.
///
/// Headwater cells get 0. Cells that are no-data in `dem` get NaN.
pub fn flow_accumulation(direction: &Raster<u8>, dem: &Raster<f64>) -> Result<Raster<f64>> {
    dem.ensure_same_grid(direction)?;
    let (rows, cols) = direction.shape();

    let downstream = |row: usize, col: usize| -> Option<(usize, usize)> {
        let code = unsafe { direction.get_unchecked(row, col) };
        let (dr, dc) = d8::esri_offset(code)?;
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        (nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols)
            .then_some((nr as usize, nc as usize))
    };

    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if let Some(target) = downstream(row, col) {
                in_degree[target] += 1;
            }
        }
    }

    let mut queue: Vec<(usize, usize)> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if in_degree[(row, col)] == 0 {
                queue.push((row, col));
            }
        }
    }

    let mut accumulation = Array2::<f64>::zeros((rows, cols));
    while let Some((row, col)) = queue.pop() {
        let Some(target) = downstream(row, col) else {
            continue;
        };
        accumulation[target] += accumulation[(row, col)] + 1.0;
        in_degree[target] -= 1;
        if in_degree[target] == 0 {
            queue.push(target);
        }
    }

    for ((row, col), value) in accumulation.indexed_iter_mut() {
        if dem.is_nodata(unsafe { dem.get_unchecked(row, col) }) {
            *value = f64::NAN;
        }
    }

    dem.with_data(accumulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivertrend_core::{GeoTransform, CRS};

    /// Valley draining south along column 2
    fn valley_dem() -> Raster<f64> {
        let mut dem = Raster::new(6, 5);
        dem.set_transform(GeoTransform::new(0.0, 6.0, 1.0, -1.0));
        for row in 0..6 {
            for col in 0..5 {
                let across = (col as f64 - 2.0).abs() * 10.0;
                let along = (6 - row) as f64;
                dem.set(row, col, across + along).unwrap();
            }
        }
        dem
    }

    #[test]
    fn valley_floor_flows_south() {
        let flow = derive_flow_raster(&valley_dem()).unwrap();
        // ESRI 4 = south
        for row in 0..5 {
            assert_eq!(flow.direction().get(row, 2).unwrap(), 4, "row {row}");
        }
        assert_eq!(flow.upstream_degrees(2, 2), Some(270));
    }

    #[test]
    fn accumulation_grows_downstream() {
        let flow = derive_flow_raster(&valley_dem()).unwrap();
        let acc = flow.accumulation();
        let mut previous = -1.0;
        for row in 0..6 {
            let v = acc.get(row, 2).unwrap();
            assert!(v > previous, "row {row}: {v} <= {previous}");
            previous = v;
        }
        // every other cell drains into the outlet
        assert_eq!(acc.get(5, 2).unwrap(), 29.0);
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let acc: Raster<f64> = Raster::new(4, 4);
        let dir: Raster<u8> = Raster::new(4, 5);
        assert!(FlowRaster::new(acc, dir, DirectionEncoding::Esri).is_err());
    }

    #[test]
    fn nominal_scale_in_metres_for_geographic_grids() {
        let mut acc: Raster<f64> = Raster::new(2, 2);
        acc.set_transform(GeoTransform::new(85.0, 27.0, 0.000833333, -0.000833333));
        acc.set_crs(Some(CRS::wgs84()));
        let dir = acc.map(|_| 0u8);
        let flow = FlowRaster::new(acc, dir, DirectionEncoding::Esri).unwrap();
        assert!((flow.nominal_scale() - 92.66).abs() < 0.01);
    }
}
