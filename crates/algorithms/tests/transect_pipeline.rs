//! End-to-end transect generation: DEM -> flow raster -> thinned points ->
//! drawn and vectorized transects -> GeoJSON regions.

use rivertrend_algorithms::hydrology::derive_flow_raster;
use rivertrend_algorithms::sampling::{sample_points, DistanceMetric, SamplerParams, TransectPoint};
use rivertrend_algorithms::statistics::Region;
use rivertrend_algorithms::transect::{generate_transects, TransectParams};
use rivertrend_core::io::{read_geojson, write_geojson};
use rivertrend_core::raster::Raster;
use rivertrend_core::vector::FeatureCollection;
use rivertrend_core::{GeoTransform, CRS};
use std::collections::HashSet;

const CELL: f64 = 30.0;
/// About 28 m at the equator, 25 m east-west at 26 degrees north
const CELL_DEGREES: f64 = 0.00025;

fn utm() -> CRS {
    CRS::from_epsg(32645)
}

/// East-draining valley with its floor on row 20
fn valley_dem() -> Raster<f64> {
    valley_on(GeoTransform::new(500_000.0, 3_001_230.0, CELL, -CELL), utm())
}

/// The same valley on a lon/lat grid near 85 E, 26 N
fn lon_lat_valley_dem() -> Raster<f64> {
    let transform = GeoTransform::new(85.0, 26.0 + 41.0 * CELL_DEGREES, CELL_DEGREES, -CELL_DEGREES);
    valley_on(transform, CRS::wgs84())
}

fn valley_on(transform: GeoTransform, crs: CRS) -> Raster<f64> {
    let (rows, cols) = (41, 120);
    let mut dem = Raster::new(rows, cols);
    dem.set_transform(transform);
    dem.set_crs(Some(crs));
    for row in 0..rows {
        for col in 0..cols {
            let across = (row as f64 - 20.0).abs() * 10.0;
            let along = (cols - 1 - col) as f64 * 0.1;
            dem.set(row, col, 100.0 + across + along).unwrap();
        }
    }
    dem
}

fn sampler_params() -> SamplerParams {
    SamplerParams {
        flow_acc_threshold: 1000.0,
        ..SamplerParams::default()
    }
}

fn transect_params() -> TransectParams {
    TransectParams {
        bucket_boundaries: vec![1000.0, 4000.0, 1e12],
        half_lengths: vec![3.0, 5.0],
        resolution: CELL,
        ..TransectParams::default()
    }
}

fn sampled_points() -> Vec<TransectPoint> {
    let flow = derive_flow_raster(&valley_dem()).unwrap();
    sample_points(&flow, None, &sampler_params()).unwrap().points
}

#[test]
fn points_are_spaced_along_the_valley_floor() {
    let flow = derive_flow_raster(&valley_dem()).unwrap();
    let outcome = sample_points(&flow, None, &sampler_params()).unwrap();

    // floor cells 24..=118 exceed the threshold; the outlet column is a pit
    assert_eq!(outcome.candidates, 95);
    assert_eq!(outcome.invalid_direction, 1);
    assert_eq!(outcome.min_spacing, 200.0);
    assert_eq!(outcome.points.len(), 14);

    for p in &outcome.points {
        assert_eq!(p.flow_degrees, 180);
        assert_eq!((p.perp1, p.perp2), (270, 90));
    }
    for (i, a) in outcome.points.iter().enumerate() {
        for b in &outcome.points[i + 1..] {
            let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
            assert!(d >= outcome.min_spacing, "{d} < {}", outcome.min_spacing);
        }
    }
}

#[test]
fn every_point_becomes_one_transect() {
    let points = sampled_points();
    let set = generate_transects(&points, Some(&utm()), &transect_params()).unwrap();

    assert_eq!(set.transects.len(), points.len());
    assert_eq!(set.report.dropped_oversized, 0);
    assert!(set.report.duplicate_ids.is_empty());

    let mut counts: Vec<usize> = set.transects.iter().map(|t| t.pixel_count).collect();
    counts.sort_unstable();
    let long = counts.iter().filter(|&&c| c == 11).count();
    let short = counts.iter().filter(|&&c| c == 7).count();
    assert_eq!((short, long), (11, 3));

    let ids: HashSet<&str> = set.transects.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids.len(), set.transects.len());
}

#[test]
fn reruns_give_identical_ids() {
    let first = generate_transects(&sampled_points(), Some(&utm()), &transect_params()).unwrap();
    let second = generate_transects(&sampled_points(), Some(&utm()), &transect_params()).unwrap();

    let a: Vec<&str> = first.transects.iter().map(|t| t.id.as_str()).collect();
    let b: Vec<&str> = second.transects.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(a, b);
}

#[test]
fn crossing_transects_merge_and_are_dropped() {
    let points = vec![
        // flowing east: vertical transect
        TransectPoint::new(1045.0, 2045.0, 5e6, 180),
        // flowing north: horizontal transect through the same cell
        TransectPoint::new(1045.0, 2045.0, 5e6, 90),
        TransectPoint::new(5045.0, 2045.0, 5e6, 180),
    ];
    let set = generate_transects(&points, None, &TransectParams::default()).unwrap();

    assert_eq!(set.report.components, 2);
    assert_eq!(set.report.dropped_oversized, 1);
    assert_eq!(set.report.drop_rate(), 0.5);
    assert_eq!(set.transects.len(), 1);
    assert_eq!(set.transects[0].pixel_count, 13);
}

#[test]
fn transects_round_trip_as_regions() {
    let params = transect_params();
    let set = generate_transects(&sampled_points(), Some(&utm()), &params).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transects.geojson");
    write_geojson(&set.to_features(&params), &path).unwrap();

    let fc = read_geojson(&path).unwrap();
    assert!(fc.metadata.contains_key("bucketBoundaries"));
    let regions = Region::from_features(&fc, "txId").unwrap();
    assert_eq!(regions.len(), set.transects.len());
    for (region, transect) in regions.iter().zip(&set.transects) {
        assert_eq!(region.id, transect.id);
    }
}

#[test]
fn lon_lat_points_survive_sampling_transects_and_geojson() {
    let flow = derive_flow_raster(&lon_lat_valley_dem()).unwrap();
    let outcome = sample_points(&flow, None, &sampler_params()).unwrap();

    assert_eq!(outcome.metric, DistanceMetric::Geodesic);
    assert_eq!(outcome.min_spacing, 200.0);
    assert!(outcome.points.len() > 1);
    for (i, a) in outcome.points.iter().enumerate() {
        for b in &outcome.points[i + 1..] {
            let d = DistanceMetric::Geodesic.distance(a.coords(), b.coords());
            assert!(d >= outcome.min_spacing, "{d} m < {} m", outcome.min_spacing);
        }
    }

    // point layer as written by the sampler, read back from disk
    let dir = tempfile::tempdir().unwrap();
    let points_path = dir.path().join("points.geojson");
    let mut layer: FeatureCollection = outcome.points.iter().map(TransectPoint::to_feature).collect();
    layer.set_crs(&CRS::wgs84());
    write_geojson(&layer, &points_path).unwrap();

    let layer = read_geojson(&points_path).unwrap();
    let crs = layer.crs();
    assert!(crs.is_geographic());
    let points: Vec<TransectPoint> = layer
        .iter()
        .enumerate()
        .map(|(i, f)| TransectPoint::from_feature(f, i))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(points.len(), outcome.points.len());
    for (read, sampled) in points.iter().zip(&outcome.points) {
        assert_eq!(read.flow_degrees, sampled.flow_degrees);
        assert!((read.x - sampled.x).abs() < 1e-9 && (read.y - sampled.y).abs() < 1e-9);
    }

    // 30 m operational pixels, drawn in degrees
    let params = transect_params();
    let set = generate_transects(&points, Some(&crs), &params).unwrap();
    assert_eq!(set.transects.len(), points.len());
    assert_eq!(set.report.dropped_oversized, 0);
    for t in &set.transects {
        assert!(t.pixel_count == 7 || t.pixel_count == 11, "{}", t.pixel_count);
    }

    let transects_path = dir.path().join("transects.geojson");
    write_geojson(&set.to_features(&params), &transects_path).unwrap();
    let fc = read_geojson(&transects_path).unwrap();
    assert_eq!(fc.crs(), CRS::wgs84());
    let regions = Region::from_features(&fc, "txId").unwrap();
    let ids: Vec<&str> = regions.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = set.transects.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, expected);

    // transect footprints stay within a few hundred metres of the valley floor
    for region in &regions {
        let bbox = geo::BoundingRect::bounding_rect(&region.geometry).unwrap();
        assert!(bbox.height() < 0.01, "{} degrees tall", bbox.height());
    }
}
