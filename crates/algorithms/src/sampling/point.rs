//! Transect centre points

use geo_types::{Geometry, Point};
use rivertrend_core::raster::d8;
use rivertrend_core::vector::Feature;
use rivertrend_core::{Error, Result};

/// Attribute names of a point layer
pub const FLOW_ACC_FIELD: &str = "flowAccum";
/// Optional on read; never written
pub const FLOW_DIR_FIELD: &str = "flowDir";
pub const PERP1_FIELD: &str = "perpFlow1";
pub const PERP2_FIELD: &str = "perpFlow2";
pub const HALF_LENGTH_FIELD: &str = "halfLength";

/// A sampled on-river pixel centre with its flow attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransectPoint {
    pub x: f64,
    pub y: f64,
    pub flow_accumulation: f64,
    /// Upstream grid angle of the local flow, degrees
    pub flow_degrees: u16,
    /// `flow_degrees + 90`
    pub perp1: u16,
    /// `flow_degrees + 270`
    pub perp2: u16,
    /// Drawing half-length in operational pixels, set by bucket assignment
    pub half_length: Option<f64>,
}

impl TransectPoint {
    pub fn new(x: f64, y: f64, flow_accumulation: f64, flow_degrees: u16) -> Self {
        let (perp1, perp2) = d8::perpendiculars(flow_degrees);
        Self {
            x,
            y,
            flow_accumulation,
            flow_degrees,
            perp1,
            perp2,
            half_length: None,
        }
    }

    pub fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Whether the transect runs along a grid diagonal
    pub fn is_diagonal(&self) -> bool {
        d8::is_diagonal(self.perp1)
    }

    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(Point::new(self.x, self.y))
            .with_property(FLOW_ACC_FIELD, self.flow_accumulation)
            .with_property(PERP1_FIELD, self.perp1 as i64)
            .with_property(PERP2_FIELD, self.perp2 as i64);
        if let Some(h) = self.half_length {
            feature.set_property(HALF_LENGTH_FIELD, h);
        }
        feature
    }

    /// Rebuild a point from a point-layer feature.
    ///
    /// The flow angle is taken from `flowDir` when present, otherwise it is
    /// recovered from `perpFlow1` (`perpFlow1 = flow + 90`), in which case
    /// `perpFlow2` must lie opposite it.
    pub fn from_feature(feature: &Feature, index: usize) -> Result<Self> {
        let Some(Geometry::Point(p)) = &feature.geometry else {
            return Err(Error::UnsupportedGeometry {
                kind: "non-point".to_string(),
                feature: index,
            });
        };
        let acc = feature.number(FLOW_ACC_FIELD, index)?;

        let flow_degrees = match feature.number(FLOW_DIR_FIELD, index) {
            Ok(degrees) => grid_angle(FLOW_DIR_FIELD, degrees, index)?,
            Err(_) => {
                let perp1 = grid_angle(PERP1_FIELD, feature.number(PERP1_FIELD, index)?, index)?;
                let perp2 = grid_angle(PERP2_FIELD, feature.number(PERP2_FIELD, index)?, index)?;
                if perp2 != (perp1 + 180) % 360 {
                    return Err(Error::InvalidParameter {
                        name: PERP2_FIELD,
                        value: perp2.to_string(),
                        reason: format!("feature {index}: not opposite {PERP1_FIELD} = {perp1}"),
                    });
                }
                (perp1 + 270) % 360
            }
        };

        let mut point = Self::new(p.x(), p.y(), acc, flow_degrees);
        point.half_length = feature.number(HALF_LENGTH_FIELD, index).ok();
        Ok(point)
    }
}

/// A D8 grid angle: a multiple of 45 in `[0, 360)`
fn grid_angle(name: &'static str, degrees: f64, index: usize) -> Result<u16> {
    if degrees < 0.0 || degrees >= 360.0 || degrees % 45.0 != 0.0 {
        return Err(Error::InvalidParameter {
            name,
            value: degrees.to_string(),
            reason: format!("feature {index}: not a multiple of 45 in [0, 360)"),
        });
    }
    Ok(degrees as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_roundtrip() {
        let mut p = TransectPoint::new(85.25, 26.5, 12345.0, 225);
        p.half_length = Some(5.0 * std::f64::consts::SQRT_2);
        let back = TransectPoint::from_feature(&p.to_feature(), 0).unwrap();
        assert_eq!(back, p);
        assert_eq!((back.perp1, back.perp2), (315, 135));
        assert!(back.is_diagonal());
    }

    #[test]
    fn written_layer_has_point_attributes_only() {
        let f = TransectPoint::new(85.0, 26.0, 1e4, 180).to_feature();
        assert_eq!(f.number("flowAccum", 0).unwrap(), 1e4);
        assert_eq!(f.number("perpFlow1", 0).unwrap(), 270.0);
        assert_eq!(f.number("perpFlow2", 0).unwrap(), 90.0);
        assert!(f.get_property(FLOW_DIR_FIELD).is_none());
    }

    #[test]
    fn loads_layer_with_perpendiculars_only() {
        let f = Feature::new(Point::new(85.0, 26.0))
            .with_property("flowAccum", 1e4)
            .with_property("perpFlow1", 270i64)
            .with_property("perpFlow2", 90i64);
        let p = TransectPoint::from_feature(&f, 0).unwrap();

        assert_eq!(p.flow_degrees, 180);
        assert_eq!((p.perp1, p.perp2), (270, 90));
        assert_eq!(p.flow_accumulation, 1e4);
        assert_eq!(p.half_length, None);
    }

    #[test]
    fn perpendiculars_must_be_opposite() {
        let f = Feature::new(Point::new(85.0, 26.0))
            .with_property("flowAccum", 1e4)
            .with_property("perpFlow1", 270i64)
            .with_property("perpFlow2", 45i64);
        assert!(TransectPoint::from_feature(&f, 0).is_err());
    }

    #[test]
    fn off_grid_angles_are_rejected() {
        let f = TransectPoint::new(0.0, 0.0, 1.0, 90)
            .to_feature()
            .with_property(FLOW_DIR_FIELD, 30i64);
        assert!(TransectPoint::from_feature(&f, 4).is_err());
        let g = TransectPoint::new(0.0, 0.0, 1.0, 90)
            .to_feature()
            .with_property(PERP1_FIELD, 100i64);
        assert!(TransectPoint::from_feature(&g, 4).is_err());
    }
}
