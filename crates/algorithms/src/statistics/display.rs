//! Map-display views of trend tables.
//!
//! Rows are ranked by slope, steepest increase first. Over a quadtree of
//! the data extent, a row first appears at the lowest zoom where it ranks
//! within `max_features_per_tile` in its tile.

use super::region_area::Region;
use super::trend::TrendRecord;
use geo::Centroid;
use rivertrend_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayParams {
    pub max_features_per_tile: usize,
    pub max_zoom: u8,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            max_features_per_tile: 2000,
            max_zoom: 12,
        }
    }
}

impl DisplayParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_features_per_tile == 0 {
            return Err(Error::InvalidParameter {
                name: "max_features_per_tile",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }
        if self.max_zoom > 24 {
            return Err(Error::InvalidParameter {
                name: "max_zoom",
                value: self.max_zoom.to_string(),
                reason: "at most 24".into(),
            });
        }
        Ok(())
    }
}

/// Trend row placed for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    #[serde(rename = "regionId")]
    pub region_id: String,
    pub season: String,
    #[serde(rename = "sl_perYr")]
    pub slope: f64,
    pub offset: Option<f64>,
    #[serde(rename = "tsPtCount")]
    pub point_count: usize,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "minZoom")]
    pub min_zoom: u8,
}

/// Centroid of every region, by id
pub fn region_centroids(regions: &[Region]) -> HashMap<String, (f64, f64)> {
    regions
        .iter()
        .filter_map(|r| r.geometry.centroid().map(|c| (r.id.clone(), (c.x(), c.y()))))
        .collect()
}

fn tile_of(x: f64, y: f64, extent: (f64, f64, f64, f64), zoom: u8) -> (u32, u32) {
    let (min_x, min_y, max_x, max_y) = extent;
    let n = 1u32 << zoom;
    let index = |v: f64, lo: f64, hi: f64| {
        let span = hi - lo;
        if span <= 0.0 {
            return 0;
        }
        (((v - lo) / span * n as f64).floor() as u32).min(n - 1)
    };
    (index(x, min_x, max_x), index(y, min_y, max_y))
}

/// Rank trends by slope and give each its minimum display zoom.
///
/// Trends whose region has no centroid are left out.
pub fn display_rows(
    trends: &[TrendRecord],
    centroids: &HashMap<String, (f64, f64)>,
    params: &DisplayParams,
) -> Result<Vec<DisplayRow>> {
    params.validate()?;

    let mut rows: Vec<DisplayRow> = trends
        .iter()
        .filter_map(|t| {
            let &(x, y) = centroids.get(&t.region_id)?;
            Some(DisplayRow {
                region_id: t.region_id.clone(),
                season: t.season.clone(),
                slope: t.slope,
                offset: t.offset,
                point_count: t.point_count,
                x,
                y,
                min_zoom: params.max_zoom,
            })
        })
        .collect();
    let unplaced = trends.len() - rows.len();
    if unplaced > 0 {
        warn!(unplaced, "trend rows without a region centroid");
    }

    rows.sort_by(|a, b| {
        b.slope
            .total_cmp(&a.slope)
            .then_with(|| a.region_id.cmp(&b.region_id))
            .then_with(|| a.season.cmp(&b.season))
    });

    let Some(first) = rows.first() else {
        return Ok(rows);
    };
    let extent = rows.iter().fold((first.x, first.y, first.x, first.y), |(a, b, c, d), r| {
        (a.min(r.x), b.min(r.y), c.max(r.x), d.max(r.y))
    });

    let mut placed = vec![false; rows.len()];
    for zoom in 0..=params.max_zoom {
        let mut counts: HashMap<(u32, u32), usize> = HashMap::new();
        for (i, row) in rows.iter_mut().enumerate() {
            let rank = counts.entry(tile_of(row.x, row.y, extent, zoom)).or_default();
            if !placed[i] && *rank < params.max_features_per_tile {
                row.min_zoom = zoom;
                placed[i] = true;
            }
            *rank += 1;
        }
        if placed.iter().all(|&p| p) {
            break;
        }
    }

    Ok(rows)
}

/// Display rows per season tag
pub fn display_by_season(rows: &[DisplayRow]) -> BTreeMap<String, Vec<DisplayRow>> {
    let mut out: BTreeMap<String, Vec<DisplayRow>> = BTreeMap::new();
    for r in rows {
        out.entry(r.season.clone()).or_default().push(r.clone());
    }
    out
}
