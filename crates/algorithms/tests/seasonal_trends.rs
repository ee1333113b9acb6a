//! Monthly archive on disk -> seasonal composites -> region areas ->
//! trends and wide pivot.

use approx::assert_relative_eq;
use geo_types::{polygon, MultiPolygon};
use rivertrend_algorithms::seasonal::{build_composites, MonthlyDirectory, SeasonWindows, SeasonalComposite};
use rivertrend_algorithms::statistics::{
    aggregate_composites, estimate_trends, pivot_wide, Region, RegionAreaRecord, TrendParams,
    INVALID_SLOPE,
};
use rivertrend_core::io::{write_geotiff, GeoTiffOptions};
use rivertrend_core::{GeoTransform, Raster, CRS};
use std::collections::BTreeMap;

const ROWS: usize = 10;
const COLS: usize = 12;

/// Water in the first `year - 1999` columns, not water elsewhere.
/// 100 m cells, so each cell is one hectare.
fn month_raster(year: i32) -> Raster<u8> {
    let water_cols = (year - 1999).clamp(0, COLS as i32) as usize;
    let mut r: Raster<u8> = Raster::filled(ROWS, COLS, 1);
    for row in 0..ROWS {
        for col in 0..water_cols {
            r.set(row, col, 2).unwrap();
        }
    }
    r.set_transform(GeoTransform::new(600_000.0, 2_001_000.0, 100.0, -100.0));
    r.set_crs(Some(CRS::from_epsg(32644)));
    r
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)
    ]])
}

fn regions() -> Vec<Region> {
    vec![
        Region {
            id: "whole".into(),
            geometry: square(600_000.0, 2_000_000.0, 601_200.0, 2_001_000.0),
        },
        Region {
            id: "outside".into(),
            geometry: square(700_000.0, 2_000_000.0, 700_500.0, 2_000_500.0),
        },
    ]
}

fn composites_from_disk() -> Vec<SeasonalComposite> {
    let dir = tempfile::tempdir().unwrap();
    for year in 2000..=2010 {
        for month in 1..=12 {
            let path = dir.path().join(format!("{}_{:02}.tif", year, month));
            write_geotiff(&month_raster(year), &path, Some(GeoTiffOptions::uint8())).unwrap();
        }
    }
    let source = MonthlyDirectory::open(dir.path()).unwrap();
    assert_eq!(source.len(), 132);
    build_composites(&source, &SeasonWindows::default()).unwrap()
}

#[test]
fn composites_cover_all_but_the_last_year() {
    let composites = composites_from_disk();
    let years: Vec<i32> = composites.iter().map(|c| c.year).collect();
    assert_eq!(years, (2000..=2009).collect::<Vec<_>>());

    let c2004 = &composites[4];
    let water = |band: &str| {
        c2004
            .band(band)
            .unwrap()
            .data()
            .iter()
            .filter(|&&v| v == 2)
            .count()
    };
    // wet window is Oct-Dec 2004, dry window Feb-Apr 2005
    assert_eq!(water("wetSeasCompos_ond"), 5 * ROWS);
    assert_eq!(water("drySeasCompos_fma"), 6 * ROWS);
    assert_eq!(water("prmSeasCompos_DnW"), 5 * ROWS);
}

#[test]
fn composite_files_round_trip() {
    let composites = composites_from_disk();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SeasonalComposite::file_name(composites[0].year));
    composites[0].write(&path).unwrap();

    let back = SeasonalComposite::read(&path).unwrap();
    assert_eq!(back.year, 2000);
    assert_eq!(back.windows, SeasonWindows::default());
    assert_eq!(back.bands.len(), 3);
    for ((name_a, a), (name_b, b)) in back.bands.iter().zip(&composites[0].bands) {
        assert_eq!(name_a, name_b);
        assert_eq!(a.data(), b.data());
    }
}

#[test]
fn areas_close_and_trends_follow_the_growth() {
    let composites = composites_from_disk();
    let records = aggregate_composites(&regions(), &composites).unwrap();
    assert_eq!(records.len(), 10 * 3 * 2);

    for r in records.iter().filter(|r| r.region_id == "whole") {
        assert_relative_eq!(r.total_ha(), (ROWS * COLS) as f64, epsilon = 1e-9);
        assert_eq!(r.nodata_frac, 0.0);
    }
    for r in records.iter().filter(|r| r.region_id == "outside") {
        assert_eq!(r.total_ha(), 0.0);
        assert_eq!(r.nodata_frac, 1.0);
    }

    let trends = estimate_trends(&records, &TrendParams::default()).unwrap();
    assert_eq!(trends.len(), 6);

    let get = |region: &str, season: &str| {
        trends
            .iter()
            .find(|t| t.region_id == region && t.season == season)
            .unwrap()
    };
    let wet = get("whole", "wet_ond");
    assert_relative_eq!(wet.slope, 10.0);
    assert_relative_eq!(wet.offset.unwrap(), -19_990.0);
    assert_eq!(wet.point_count, 10);
    assert_relative_eq!(get("whole", "dry_fma").slope, 10.0);
    assert_relative_eq!(get("whole", "prm_DnW").slope, 10.0);

    let empty = get("outside", "dry_fma");
    assert_eq!(empty.slope, INVALID_SLOPE);
    assert_eq!(empty.point_count, 0);
}

#[test]
fn pivot_of_aggregated_areas() {
    let composites = composites_from_disk();
    let records = aggregate_composites(&regions()[..1], &composites).unwrap();
    let table = pivot_wide(&records, "txId", Some("prm_DnW"), None);

    assert_eq!(table.rows.len(), 10);
    let water = table.column("wet_ond_water_ha").unwrap();
    assert_eq!(table.rows[0][water], "10");
    assert!(table.column("total_nodata_ha").is_some());
    assert_eq!(table.rows[9][2], "2009");
}

#[test]
fn pivot_area_is_the_region_polygon_area() {
    let composites = composites_from_disk();
    // 1 ha cells; the region only covers half of the last column
    let partial = Region {
        id: "partial".into(),
        geometry: square(600_000.0, 2_000_000.0, 601_150.0, 2_001_000.0),
    };
    let records = aggregate_composites(std::slice::from_ref(&partial), &composites).unwrap();
    let areas = BTreeMap::from([(partial.id.clone(), partial.area_ha(&CRS::from_epsg(32644)))]);

    let by_footprint = pivot_wide(&records, "txId", Some("prm_DnW"), None);
    let by_polygon = pivot_wide(&records, "txId", Some("prm_DnW"), Some(&areas));

    assert_eq!(by_footprint.rows[0][1], "110");
    let area: f64 = by_polygon.rows[0][1].parse().unwrap();
    assert_relative_eq!(area, 115.0, epsilon = 1e-6);
}

fn series_record(year: i32, water_ha: f64, nodata_frac: f64) -> RegionAreaRecord {
    RegionAreaRecord {
        region_id: "tx".into(),
        year,
        season: "dry_fma".into(),
        nodata_ha: 0.0,
        notwater_ha: 30.0 - water_ha,
        water_ha,
        nodata_frac,
    }
}

#[test]
fn ten_year_series_matches_least_squares() {
    let water = [10.0, 12.0, 11.0, 14.0, 13.0, 16.0, 15.0, 18.0, 17.0, 20.0];
    let records: Vec<_> = (2000..2010)
        .zip(water)
        .map(|(y, w)| series_record(y, w, 0.0))
        .collect();
    let trends = estimate_trends(&records, &TrendParams::default()).unwrap();

    // ordinary least squares gives 83 / 82.5
    assert_relative_eq!(trends[0].slope, 83.0 / 82.5, epsilon = 0.01);
    assert_relative_eq!(trends[0].slope, 1.0);
    assert_relative_eq!(trends[0].offset.unwrap(), -1989.5);
    assert_eq!(trends[0].point_count, 10);
}

#[test]
fn gated_years_count_against_the_minimum() {
    // six years, two of them too cloudy
    let records: Vec<_> = (2000..2006)
        .map(|y| series_record(y, (y - 1990) as f64, if y % 3 == 0 { 0.2 } else { 0.01 }))
        .collect();
    let trends = estimate_trends(&records, &TrendParams::default()).unwrap();
    assert_eq!(trends[0].slope, INVALID_SLOPE);
    assert_eq!(trends[0].point_count, 4);

    let lenient = TrendParams {
        min_points: 4,
        ..TrendParams::default()
    };
    let trends = estimate_trends(&records, &lenient).unwrap();
    assert_relative_eq!(trends[0].slope, 1.0);
}
