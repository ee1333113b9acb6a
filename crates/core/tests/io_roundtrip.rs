//! File round trips through the native GeoTIFF, GeoJSON and CSV writers.

use geo_types::{polygon, Geometry};
use rivertrend_core::io::{
    read_csv, read_geojson, read_geotiff, read_geotiff_bands, write_csv, write_geojson,
    write_geotiff, write_geotiff_bands, GeoTiffOptions,
};
use rivertrend_core::vector::{AttributeValue, Feature, FeatureCollection};
use rivertrend_core::{GeoTransform, Raster, CRS};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

fn class_band(rows: usize, cols: usize, seed: usize) -> Raster<u8> {
    let data = (0..rows * cols).map(|i| ((i + seed) % 3) as u8).collect();
    let mut r = Raster::from_vec(data, rows, cols).unwrap();
    r.set_transform(GeoTransform::new(85.0, 27.0, 0.00025, -0.00025));
    r.set_crs(Some(CRS::wgs84()));
    r
}

#[test]
fn single_band_float_keeps_georeferencing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("acc.tif");

    let mut acc: Raster<f64> = Raster::filled(6, 9, 1.5);
    acc.set(2, 3, 12000.0).unwrap();
    acc.set_transform(GeoTransform::new(500000.0, 3000000.0, 90.0, -90.0));
    acc.set_crs(Some(CRS::from_epsg(32645)));
    acc.set_nodata(Some(-9999.0));

    write_geotiff(&acc, &path, None).unwrap();
    let back: Raster<f64> = read_geotiff(&path, None).unwrap();

    assert_eq!(back.shape(), (6, 9));
    assert_eq!(back.get(2, 3).unwrap(), 12000.0);
    assert_eq!(back.transform(), acc.transform());
    assert_eq!(back.crs().and_then(CRS::epsg), Some(32645));
    assert_eq!(back.nodata(), Some(-9999.0));
}

#[test]
fn multi_page_preserves_bands_and_description() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seasonal.tif");

    let bands = [class_band(4, 5, 0), class_band(4, 5, 1), class_band(4, 5, 2)];
    let refs: Vec<&Raster<u8>> = bands.iter().collect();
    write_geotiff_bands(&refs, Some("{\"year\":2001}"), &path, Some(GeoTiffOptions::uint8())).unwrap();

    let back = read_geotiff_bands::<u8, _>(&path).unwrap();
    assert_eq!(back.bands.len(), 3);
    assert_eq!(back.description.as_deref(), Some("{\"year\":2001}"));
    for (orig, read) in bands.iter().zip(&back.bands) {
        assert_eq!(orig.data(), read.data());
        assert!(read.is_geographic());
    }

    let third: Raster<u8> = read_geotiff(&path, Some(2)).unwrap();
    assert_eq!(third.data(), bands[2].data());
    assert!(read_geotiff::<u8, _>(&path, Some(3)).is_err());
}

#[test]
fn misaligned_bands_are_rejected() {
    let dir = tempdir().unwrap();
    let a = class_band(4, 5, 0);
    let b = class_band(5, 5, 0);
    let err = write_geotiff_bands(&[&a, &b], None, dir.path().join("bad.tif"), None);
    assert!(err.is_err());
}

#[test]
fn geojson_roundtrip_keeps_properties_and_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tx.geojson");

    let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
    let mut fc: FeatureCollection = std::iter::once(
        Feature::new(poly)
            .with_property("txId", "1.0000_0.5000")
            .with_property("numSuperPixelsInTx", 2usize),
    )
    .collect();
    fc.metadata.insert("halfLengths".into(), serde_json::json!([4.0, 5.0, 6.0]));

    write_geojson(&fc, &path).unwrap();
    let back = read_geojson(&path).unwrap();

    assert_eq!(back.len(), 1);
    let f = &back.features[0];
    assert_eq!(f.get_property("txId"), Some(&AttributeValue::String("1.0000_0.5000".into())));
    assert_eq!(f.get_property("numSuperPixelsInTx"), Some(&AttributeValue::Int(2)));
    assert!(matches!(f.geometry, Some(Geometry::Polygon(_))));
    assert_eq!(back.metadata.get("halfLengths"), Some(&serde_json::json!([4.0, 5.0, 6.0])));
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Row {
    id: String,
    year: i32,
    water_ha: f64,
}

#[test]
fn csv_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.csv");
    let rows = vec![
        Row { id: "a".into(), year: 2000, water_ha: 1.25 },
        Row { id: "b".into(), year: 2001, water_ha: 0.0 },
    ];
    write_csv(&rows, &path).unwrap();
    let back: Vec<Row> = read_csv(&path).unwrap();
    assert_eq!(back, rows);
}

#[test]
fn empty_table_keeps_its_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    write_csv::<Row, _>(&[], &path).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,year,water_ha\n");
    let back: Vec<Row> = read_csv(&path).unwrap();
    assert!(back.is_empty());
}
