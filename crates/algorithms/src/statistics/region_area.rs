//! Per-region class areas of seasonal composites
//!
//! A pixel belongs to a region when its centre lies inside the region
//! polygon. Areas are in hectares; geographic grids use spherical cell
//! areas that shrink toward the poles.

use crate::maybe_rayon::*;
use crate::seasonal::{PixClass, SeasonalComposite};
use geo::{Area, BoundingRect, ChamberlainDuquetteArea, Contains};
use geo_types::{MultiPolygon, Point};
use rivertrend_core::vector::FeatureCollection;
use rivertrend_core::{Algorithm, Error, Raster, Result, CRS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Mean earth radius (IUGG), metres
pub const EARTH_RADIUS: f64 = 6_371_008.8;
const SQ_METRES_PER_HECTARE: f64 = 1e4;

/// An aggregation region: a transect or a basin
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
}

impl Region {
    /// Regions from areal features, keyed by `id_field`
    pub fn from_features(collection: &FeatureCollection, id_field: &str) -> Result<Vec<Region>> {
        collection
            .iter()
            .enumerate()
            .map(|(i, f)| {
                Ok(Region {
                    id: f.key(id_field, i)?,
                    geometry: f.areal(i)?,
                })
            })
            .collect()
    }

    /// Polygon area in hectares, spherical when `crs` is lon/lat
    pub fn area_ha(&self, crs: &CRS) -> f64 {
        let square_metres = if crs.is_geographic() {
            self.geometry.chamberlain_duquette_unsigned_area()
        } else {
            self.geometry.unsigned_area()
        };
        square_metres / SQ_METRES_PER_HECTARE
    }
}

/// One row of the area time series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionAreaRecord {
    #[serde(rename = "regionId")]
    pub region_id: String,
    pub year: i32,
    pub season: String,
    pub nodata_ha: f64,
    pub notwater_ha: f64,
    pub water_ha: f64,
    #[serde(rename = "nodataFrac")]
    pub nodata_frac: f64,
}

impl RegionAreaRecord {
    pub fn total_ha(&self) -> f64 {
        self.nodata_ha + self.notwater_ha + self.water_ha
    }
}

/// Class areas of one region on one band
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassAreas {
    pub nodata_ha: f64,
    pub notwater_ha: f64,
    pub water_ha: f64,
}

impl ClassAreas {
    pub fn total(&self) -> f64 {
        self.nodata_ha + self.notwater_ha + self.water_ha
    }

    /// No-data share of the footprint; 1.0 for an empty footprint
    pub fn nodata_fraction(&self) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.nodata_ha / total
        } else {
            1.0
        }
    }

    fn add(&mut self, class: PixClass, area: f64) {
        match class {
            PixClass::NoData => self.nodata_ha += area,
            PixClass::NotWater => self.notwater_ha += area,
            PixClass::Water => self.water_ha += area,
        }
    }
}

/// Cells of a grid whose centres fall inside a region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Footprint {
    pub cells: Vec<(usize, usize)>,
}

impl Footprint {
    pub fn of<T: rivertrend_core::RasterElement>(grid: &Raster<T>, geometry: &MultiPolygon<f64>) -> Self {
        let Some(rect) = geometry.bounding_rect() else {
            return Self::default();
        };
        let bounds = (rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        let Some((r0, r1, c0, c1)) = grid.window(bounds) else {
            return Self::default();
        };

        let mut cells = Vec::new();
        for row in r0..r1 {
            for col in c0..c1 {
                let (x, y) = grid.cell_center(row, col);
                if geometry.contains(&Point::new(x, y)) {
                    cells.push((row, col));
                }
            }
        }
        Self { cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Area in hectares of the cells of `row`
pub fn cell_area_ha<T: rivertrend_core::RasterElement>(grid: &Raster<T>, row: usize) -> f64 {
    let gt = grid.transform();
    if !grid.is_geographic() {
        return gt.cell_area() / SQ_METRES_PER_HECTARE;
    }
    let (_, lat_top) = gt.pixel_to_geo_corner(0, row);
    let (_, lat_bottom) = gt.pixel_to_geo_corner(0, row + 1);
    let d_lon = gt.pixel_width.abs().to_radians();
    let strip = (lat_top.to_radians().sin() - lat_bottom.to_radians().sin()).abs();
    EARTH_RADIUS * EARTH_RADIUS * d_lon * strip / SQ_METRES_PER_HECTARE
}

/// Sum class areas over a footprint; unknown codes count as no-data
pub fn class_areas(band: &Raster<u8>, footprint: &Footprint) -> ClassAreas {
    let mut areas = ClassAreas::default();
    for &(row, col) in &footprint.cells {
        let code = unsafe { band.get_unchecked(row, col) };
        areas.add(PixClass::from_code_lossy(code), cell_area_ha(band, row));
    }
    areas
}

/// Season tag of a band: its first three and last four characters
pub fn season_tag(band: &str) -> Result<String> {
    let chars: Vec<char> = band.chars().collect();
    if chars.len() < 7 {
        return Err(Error::InvalidBandName(band.to_string()));
    }
    Ok(chars[..3].iter().chain(&chars[chars.len() - 4..]).collect())
}

/// Area records of every region on one band
pub fn aggregate_band(
    regions: &[Region],
    footprints: &[Footprint],
    band_name: &str,
    band: &Raster<u8>,
    year: i32,
) -> Result<Vec<RegionAreaRecord>> {
    let season = season_tag(band_name)?;
    let records = regions
        .into_par_iter()
        .zip(footprints)
        .map(|(region, footprint)| {
            let areas = class_areas(band, footprint);
            RegionAreaRecord {
                region_id: region.id.clone(),
                year,
                season: season.clone(),
                nodata_ha: areas.nodata_ha,
                notwater_ha: areas.notwater_ha,
                water_ha: areas.water_ha,
                nodata_frac: areas.nodata_fraction(),
            }
        })
        .collect();
    Ok(records)
}

/// Footprints of `regions` on one grid, cached across composites that
/// share the grid
#[derive(Debug)]
pub struct FootprintCache {
    grid: Option<Raster<u8>>,
    footprints: Vec<Footprint>,
}

impl FootprintCache {
    pub fn new() -> Self {
        Self {
            grid: None,
            footprints: Vec::new(),
        }
    }

    pub fn get(&mut self, regions: &[Region], band: &Raster<u8>) -> &[Footprint] {
        let reusable = self
            .grid
            .as_ref()
            .is_some_and(|g| g.ensure_same_grid(band).is_ok() && g.crs() == band.crs());
        if !reusable {
            self.footprints = regions
                .into_par_iter()
                .map(|r| Footprint::of(band, &r.geometry))
                .collect();
            let empty = self.footprints.iter().filter(|f| f.is_empty()).count();
            if empty > 0 {
                warn!(empty, regions = regions.len(), "regions without pixels on the composite grid");
            }
            self.grid = Some(band.like(0u8));
        }
        &self.footprints
    }
}

impl Default for FootprintCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Area records of every region on every band of every composite, in
/// composite, band, region order
pub fn aggregate_composites(
    regions: &[Region],
    composites: &[SeasonalComposite],
) -> Result<Vec<RegionAreaRecord>> {
    let mut cache = FootprintCache::new();
    let mut records = Vec::with_capacity(regions.len() * composites.len() * 3);

    for composite in composites {
        for (name, band) in &composite.bands {
            let footprints = cache.get(regions, band);
            records.extend(aggregate_band(regions, footprints, name, band, composite.year)?);
        }
        debug!(year = composite.year, records = records.len(), "aggregated composite");
    }
    Ok(records)
}

/// Region area aggregation stage
#[derive(Debug, Clone, Default)]
pub struct RegionAreaAggregator;

impl Algorithm for RegionAreaAggregator {
    type Input = (Vec<Region>, Vec<SeasonalComposite>);
    type Output = Vec<RegionAreaRecord>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Region Area Aggregator"
    }

    fn description(&self) -> &'static str {
        "Sum per-class pixel area in hectares for each region, year and season"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let (regions, composites) = input;
        aggregate_composites(&regions, &composites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::polygon;
    use rivertrend_core::{GeoTransform, CRS};

    fn band(codes: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
        let mut r = Raster::from_vec(codes, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 100.0, 100.0, -100.0));
        r
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)
        ]])
    }

    #[test]
    fn polygon_area_follows_crs_units() {
        let planar = Region {
            id: "a".into(),
            geometry: square(0.0, 0.0, 1000.0, 1000.0),
        };
        assert_relative_eq!(planar.area_ha(&CRS::from_epsg(32645)), 100.0, epsilon = 1e-9);

        // 0.01 degree square on the equator, about 1113 m a side
        let lon_lat = Region {
            id: "b".into(),
            geometry: square(0.0, 0.0, 0.01, 0.01),
        };
        assert_relative_eq!(lon_lat.area_ha(&CRS::wgs84()), 123.9, epsilon = 0.5);
    }

    #[test]
    fn season_tags() {
        assert_eq!(season_tag("drySeasCompos_fma").unwrap(), "dry_fma");
        assert_eq!(season_tag("prmSeasCompos_DnW").unwrap(), "prm_DnW");
        assert!(season_tag("dry").is_err());
    }

    #[test]
    fn areas_close_to_footprint_area() {
        let b = band(vec![2, 2, 1, 0, 1, 7, 2, 1, 0], 3, 3);
        let region = square(0.0, 0.0, 300.0, 300.0);
        let fp = Footprint::of(&b, &region);
        assert_eq!(fp.cells.len(), 9);

        let areas = class_areas(&b, &fp);
        assert_relative_eq!(areas.water_ha, 3.0);
        assert_relative_eq!(areas.notwater_ha, 3.0);
        // 7 is not a class and counts as no-data
        assert_relative_eq!(areas.nodata_ha, 3.0);
        assert_relative_eq!(areas.total(), 9.0);
        assert_relative_eq!(areas.nodata_fraction(), 1.0 / 3.0);
    }

    #[test]
    fn only_cells_with_centres_inside_count() {
        let b = band(vec![2; 9], 3, 3);
        let fp = Footprint::of(&b, &square(0.0, 0.0, 120.0, 120.0));
        assert_eq!(fp.cells, vec![(2, 0)]);
    }

    #[test]
    fn missing_classes_are_zero() {
        let b = band(vec![2; 4], 2, 2);
        let fp = Footprint::of(&b, &square(0.0, 0.0, 200.0, 200.0));
        let areas = class_areas(&b, &fp);
        assert_eq!(areas.nodata_ha, 0.0);
        assert_eq!(areas.notwater_ha, 0.0);
        assert_eq!(areas.nodata_fraction(), 0.0);
    }

    #[test]
    fn empty_footprint_is_all_nodata() {
        let b = band(vec![2; 4], 2, 2);
        let fp = Footprint::of(&b, &square(5000.0, 5000.0, 6000.0, 6000.0));
        assert!(fp.is_empty());
        let areas = class_areas(&b, &fp);
        assert_eq!(areas.total(), 0.0);
        assert_eq!(areas.nodata_fraction(), 1.0);
    }

    #[test]
    fn geographic_cells_shrink_poleward() {
        let mut b: Raster<u8> = Raster::new(2, 1);
        b.set_transform(GeoTransform::new(0.0, 61.0, 1.0, -1.0));
        b.set_crs(Some(CRS::wgs84()));
        let north = cell_area_ha(&b, 0);
        let south = cell_area_ha(&b, 1);
        assert!(north < south);

        let mut eq: Raster<u8> = Raster::new(1, 1);
        eq.set_transform(GeoTransform::new(0.0, 0.5, 1.0, -1.0));
        eq.set_crs(Some(CRS::wgs84()));
        // one degree square at the equator, about 1.236e6 ha
        assert_relative_eq!(cell_area_ha(&eq, 0), 1.2364e6, max_relative = 1e-3);
    }

    #[test]
    fn records_follow_band_order() {
        let windows = crate::seasonal::SeasonWindows::default();
        let composite = SeasonalComposite {
            year: 2005,
            windows: windows.clone(),
            bands: windows
                .band_names()
                .into_iter()
                .map(|n| (n, band(vec![2, 1, 0, 2], 2, 2)))
                .collect(),
        };
        let regions = vec![
            Region { id: "a".into(), geometry: square(0.0, 0.0, 200.0, 200.0) },
            Region { id: "b".into(), geometry: square(0.0, 100.0, 100.0, 200.0) },
        ];
        let records = aggregate_composites(&regions, &[composite]).unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].season, "dry_fma");
        assert_eq!(records[0].region_id, "a");
        assert_relative_eq!(records[0].water_ha, 2.0);
        assert_eq!(records[1].region_id, "b");
        assert_relative_eq!(records[1].water_ha, 1.0);
        assert_eq!(records[5].season, "prm_DnW");
        for r in &records {
            assert_eq!(r.year, 2005);
        }
    }
}
