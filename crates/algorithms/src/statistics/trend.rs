//! Per-region water-area trends

use super::region_area::RegionAreaRecord;
use super::theil_sen::sens_slope;
use crate::maybe_rayon::*;
use rivertrend_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Slope given to regions without enough valid points
pub const INVALID_SLOPE: f64 = -9999.0;

/// Data-sufficiency gates for trend fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendParams {
    /// Fewest gated points a region needs for a fit
    pub min_points: usize,
    /// Records with `nodataFrac` at or above this are excluded
    pub max_nodata_fraction: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            min_points: 5,
            max_nodata_fraction: 0.05,
        }
    }
}

impl TrendParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_points < 2 {
            return Err(Error::InvalidParameter {
                name: "min_points",
                value: self.min_points.to_string(),
                reason: "a slope needs at least 2 points".into(),
            });
        }
        if !(self.max_nodata_fraction > 0.0 && self.max_nodata_fraction <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "max_nodata_fraction",
                value: self.max_nodata_fraction.to_string(),
                reason: "must be in (0, 1]".into(),
            });
        }
        Ok(())
    }

    pub fn passes_gate(&self, record: &RegionAreaRecord) -> bool {
        record.nodata_frac < self.max_nodata_fraction
    }
}

/// Water-area trend of one region in one season
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    #[serde(rename = "regionId")]
    pub region_id: String,
    pub season: String,
    /// Hectares per year, or `INVALID_SLOPE`
    #[serde(rename = "sl_perYr")]
    pub slope: f64,
    pub offset: Option<f64>,
    /// Records that passed the no-data gate
    #[serde(rename = "tsPtCount")]
    pub point_count: usize,
}

impl TrendRecord {
    pub fn is_valid(&self) -> bool {
        self.offset.is_some()
    }

    fn placeholder(region_id: &str, season: &str, point_count: usize) -> Self {
        Self {
            region_id: region_id.to_string(),
            season: season.to_string(),
            slope: INVALID_SLOPE,
            offset: None,
            point_count,
        }
    }
}

/// Fit one region's series: `(year, water_ha)` pairs that passed the gate
pub fn fit_region(region_id: &str, season: &str, series: &[(f64, f64)], params: &TrendParams) -> TrendRecord {
    if series.len() < params.min_points {
        return TrendRecord::placeholder(region_id, season, series.len());
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = series.iter().copied().unzip();
    match sens_slope(&xs, &ys) {
        Some(fit) => TrendRecord {
            region_id: region_id.to_string(),
            season: season.to_string(),
            slope: fit.slope,
            offset: Some(fit.offset),
            point_count: series.len(),
        },
        None => {
            warn!(region = region_id, season, "no pair of distinct years, slope undefined");
            TrendRecord::placeholder(region_id, season, series.len())
        }
    }
}

/// Trends of every region in every season.
///
/// Records are grouped by season then region id; each group is reduced
/// before fitting. Output is ordered by season then region id.
pub fn estimate_trends(records: &[RegionAreaRecord], params: &TrendParams) -> Result<Vec<TrendRecord>> {
    params.validate()?;

    let mut groups: BTreeMap<(&str, &str), Vec<(f64, f64)>> = BTreeMap::new();
    for r in records {
        let series = groups.entry((r.season.as_str(), r.region_id.as_str())).or_default();
        if params.passes_gate(r) {
            series.push((r.year as f64, r.water_ha));
        }
    }

    let groups: Vec<((&str, &str), Vec<(f64, f64)>)> = groups.into_iter().collect();
    let trends: Vec<TrendRecord> = (&groups)
        .into_par_iter()
        .map(|((season, region), series)| fit_region(region, season, series, params))
        .collect();

    let invalid = trends.iter().filter(|t| !t.is_valid()).count();
    info!(trends = trends.len(), invalid, "estimated trends");
    Ok(trends)
}

/// Trends split by season tag
pub fn split_by_season(trends: &[TrendRecord]) -> BTreeMap<String, Vec<TrendRecord>> {
    let mut out: BTreeMap<String, Vec<TrendRecord>> = BTreeMap::new();
    for t in trends {
        out.entry(t.season.clone()).or_default().push(t.clone());
    }
    out
}

/// Trend estimation stage
#[derive(Debug, Clone, Default)]
pub struct TrendEstimator;

impl Algorithm for TrendEstimator {
    type Input = Vec<RegionAreaRecord>;
    type Output = Vec<TrendRecord>;
    type Params = TrendParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Trend Estimator"
    }

    fn description(&self) -> &'static str {
        "Fit Sen's slope of water area against year per region and season"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        estimate_trends(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(region: &str, season: &str, year: i32, water: f64, nodata_frac: f64) -> RegionAreaRecord {
        RegionAreaRecord {
            region_id: region.into(),
            year,
            season: season.into(),
            nodata_ha: 0.0,
            notwater_ha: 1.0,
            water_ha: water,
            nodata_frac,
        }
    }

    #[test]
    fn gate_excludes_at_threshold() {
        let p = TrendParams::default();
        assert!(p.passes_gate(&record("a", "dry_fma", 2000, 1.0, 0.049)));
        assert!(!p.passes_gate(&record("a", "dry_fma", 2000, 1.0, 0.05)));
    }

    #[test]
    fn too_few_points_give_a_placeholder() {
        let records: Vec<_> = (0..6)
            .map(|i| record("a", "dry_fma", 2000 + i, i as f64, if i < 2 { 0.5 } else { 0.0 }))
            .collect();
        let trends = estimate_trends(&records, &TrendParams::default()).unwrap();

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].slope, INVALID_SLOPE);
        assert_eq!(trends[0].offset, None);
        assert_eq!(trends[0].point_count, 4);
    }

    #[test]
    fn fully_gated_region_keeps_a_row() {
        let records = vec![record("a", "wet_ond", 2000, 1.0, 1.0)];
        let trends = estimate_trends(&records, &TrendParams::default()).unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].point_count, 0);
        assert!(!trends[0].is_valid());
    }

    #[test]
    fn groups_by_season_and_region() {
        let mut records = Vec::new();
        for (i, y) in (2000..2006).enumerate() {
            records.push(record("b", "dry_fma", y, 2.0 * i as f64, 0.0));
            records.push(record("a", "dry_fma", y, i as f64, 0.0));
            records.push(record("a", "wet_ond", y, 5.0, 0.0));
        }
        let trends = estimate_trends(&records, &TrendParams::default()).unwrap();

        let keys: Vec<(&str, &str)> = trends
            .iter()
            .map(|t| (t.season.as_str(), t.region_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("dry_fma", "a"), ("dry_fma", "b"), ("wet_ond", "a")]);
        assert_relative_eq!(trends[0].slope, 1.0);
        assert_relative_eq!(trends[1].slope, 2.0);
        assert_relative_eq!(trends[2].slope, 0.0);
        assert_eq!(trends[2].point_count, 6);
    }

    #[test]
    fn repeated_year_only_is_a_placeholder() {
        let records: Vec<_> = (0..5).map(|i| record("a", "dry_fma", 2000, i as f64, 0.0)).collect();
        let trends = estimate_trends(&records, &TrendParams::default()).unwrap();
        assert_eq!(trends[0].slope, INVALID_SLOPE);
        assert_eq!(trends[0].point_count, 5);
    }

    #[test]
    fn split_by_season_keeps_rows() {
        let t = vec![
            TrendRecord::placeholder("a", "dry_fma", 0),
            TrendRecord::placeholder("a", "wet_ond", 0),
            TrendRecord::placeholder("b", "dry_fma", 0),
        ];
        let split = split_by_season(&t);
        assert_eq!(split["dry_fma"].len(), 2);
        assert_eq!(split["wet_ond"].len(), 1);
    }

    #[test]
    fn rejects_bad_params() {
        let p = TrendParams {
            max_nodata_fraction: 0.0,
            ..TrendParams::default()
        };
        assert!(p.validate().is_err());
    }
}
