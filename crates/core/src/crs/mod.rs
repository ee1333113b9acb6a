//! Coordinate reference systems
//!
//! The pipeline only needs to know two things about a CRS: how to write it
//! back into a GeoTIFF key directory, and whether its axes are degrees
//! (which switches distances to haversine and cell areas to spherical).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lon/lat datums seen in the flow and surface-water archives
const GEOGRAPHIC_EPSG: [u32; 4] = [4326, 4269, 4258, 4283];

/// Axis units of a CRS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Degrees,
    /// Projected; assumed metres
    Linear,
}

/// A CRS as recorded in a raster header or a vector file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CRS {
    Epsg(u32),
    Wkt(String),
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        CRS::Epsg(code)
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        CRS::Wkt(wkt.into())
    }

    /// EPSG:4326
    pub fn wgs84() -> Self {
        CRS::Epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            CRS::Epsg(code) => Some(*code),
            CRS::Wkt(_) => None,
        }
    }

    pub fn units(&self) -> Units {
        let geographic = match self {
            CRS::Epsg(code) => GEOGRAPHIC_EPSG.contains(code),
            CRS::Wkt(wkt) => {
                let head = wkt.trim_start().to_ascii_uppercase();
                ["GEOGCS", "GEOGCRS", "GEODCRS"]
                    .iter()
                    .any(|kw| head.starts_with(kw))
            }
        };
        if geographic {
            Units::Degrees
        } else {
            Units::Linear
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.units() == Units::Degrees
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CRS::Epsg(code) => write!(f, "EPSG:{code}"),
            CRS::Wkt(wkt) => {
                let head: String = wkt.chars().take(40).collect();
                write!(f, "WKT:{head}")
            }
        }
    }
}
