//! Vector features: geometry plus typed attributes

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
            AttributeValue::Null | AttributeValue::Bool(_) => None,
        }
    }

    /// Text form used as a join key.
    ///
    /// Integral floats print without a fractional part so that basin ids
    /// stored as `1.0e9` and `1000000000` join.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// A feature with optional geometry and attributes
#[derive(Debug, Clone, Default)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    /// Attributes, ordered by name so output files are stable
    pub properties: BTreeMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Attribute `field` as a join key.
    ///
    /// `index` is the feature's position, used only in the error.
    pub fn key(&self, field: &str, index: usize) -> Result<String> {
        self.get_property(field)
            .and_then(AttributeValue::as_key)
            .ok_or_else(|| Error::MissingAttribute {
                field: field.to_string(),
                feature: index,
            })
    }

    /// Numeric attribute `field`
    pub fn number(&self, field: &str, index: usize) -> Result<f64> {
        self.get_property(field)
            .and_then(AttributeValue::as_f64)
            .ok_or_else(|| Error::MissingAttribute {
                field: field.to_string(),
                feature: index,
            })
    }

    /// Areal geometry as a MultiPolygon.
    ///
    /// Polygons are promoted; other geometry kinds are rejected.
    pub fn areal(&self, index: usize) -> Result<MultiPolygon<f64>> {
        match &self.geometry {
            Some(Geometry::Polygon(p)) => Ok(MultiPolygon::new(vec![p.clone()])),
            Some(Geometry::MultiPolygon(mp)) => Ok(mp.clone()),
            Some(Geometry::GeometryCollection(gc)) => {
                let mut polygons = Vec::new();
                for g in gc.iter() {
                    match g {
                        Geometry::Polygon(p) => polygons.push(p.clone()),
                        Geometry::MultiPolygon(mp) => polygons.extend(mp.0.iter().cloned()),
                        _ => {}
                    }
                }
                Ok(MultiPolygon::new(polygons))
            }
            Some(other) => Err(Error::UnsupportedGeometry {
                kind: geometry_kind(other).to_string(),
                feature: index,
            }),
            None => Err(Error::UnsupportedGeometry {
                kind: "null".to_string(),
                feature: index,
            }),
        }
    }
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

const CRS_MEMBER: &str = "crs";

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// File-level metadata, written as foreign members of the GeoJSON object
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// CRS named by the collection's `crs` member.
    ///
    /// Files without one are lon/lat, as GeoJSON prescribes.
    pub fn crs(&self) -> CRS {
        let name = self
            .metadata
            .get(CRS_MEMBER)
            .and_then(|c| c.pointer("/properties/name"))
            .and_then(|n| n.as_str());
        match name {
            Some(name) if name.ends_with("CRS84") => CRS::wgs84(),
            Some(name) if name.contains("EPSG") => name
                .rsplit(':')
                .next()
                .and_then(|code| code.parse().ok())
                .map_or_else(CRS::wgs84, CRS::from_epsg),
            _ => CRS::wgs84(),
        }
    }

    /// Record `crs` as a named `crs` member. WKT-only systems cannot be
    /// named and leave the member unset.
    pub fn set_crs(&mut self, crs: &CRS) {
        match crs.epsg() {
            Some(code) => {
                self.metadata.insert(
                    CRS_MEMBER.into(),
                    serde_json::json!({
                        "type": "name",
                        "properties": { "name": format!("urn:ogc:def:crs:EPSG::{code}") }
                    }),
                );
            }
            None => {
                self.metadata.remove(CRS_MEMBER);
            }
        }
    }

    /// Every polygon of every feature as one MultiPolygon.
    ///
    /// Parts are concatenated, not dissolved.
    pub fn areal_parts(&self) -> Result<MultiPolygon<f64>> {
        let mut polygons = Vec::new();
        for (i, f) in self.features.iter().enumerate() {
            polygons.extend(f.areal(i)?.0);
        }
        Ok(MultiPolygon::new(polygons))
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
            metadata: serde_json::Map::new(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
