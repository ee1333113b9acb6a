//! On-river candidate extraction and minimum-spacing thinning

use super::conflict::{ConflictGraph, DistanceMetric};
use super::point::TransectPoint;
use crate::hydrology::FlowRaster;
use crate::maybe_rayon::*;
use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point};
use rivertrend_core::raster::d8::DirectionEncoding;
use rivertrend_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters for point sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerParams {
    /// Pixels with accumulation strictly above this are on-river
    pub flow_acc_threshold: f64,
    /// Nominal scale is rounded up to a multiple of this (map units or metres)
    pub spacing_round_to: f64,
    /// Minimum spacing = multiplier x rounded nominal scale
    pub spacing_multiplier: f64,
    /// Code convention of the flow-direction raster
    pub direction_encoding: DirectionEncoding,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            flow_acc_threshold: 5000.0,
            spacing_round_to: 100.0,
            spacing_multiplier: 2.0,
            direction_encoding: DirectionEncoding::Esri,
        }
    }
}

impl SamplerParams {
    pub fn validate(&self) -> Result<()> {
        if !self.flow_acc_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "flow_acc_threshold",
                value: self.flow_acc_threshold.to_string(),
                reason: "must be finite".into(),
            });
        }
        if !(self.spacing_round_to > 0.0) {
            return Err(Error::InvalidParameter {
                name: "spacing_round_to",
                value: self.spacing_round_to.to_string(),
                reason: "must be positive".into(),
            });
        }
        if !(self.spacing_multiplier > 0.0) {
            return Err(Error::InvalidParameter {
                name: "spacing_multiplier",
                value: self.spacing_multiplier.to_string(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// `multiplier x ceil(nominal_scale / round_to) x round_to`
    pub fn min_spacing(&self, nominal_scale: f64) -> f64 {
        self.spacing_multiplier
            * (nominal_scale / self.spacing_round_to).ceil()
            * self.spacing_round_to
    }
}

/// Result of sampling one region
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    /// Surviving points in raster scan order
    pub points: Vec<TransectPoint>,
    /// On-river pixels with a valid direction, before thinning
    pub candidates: usize,
    /// On-river pixels skipped because their direction code is a pit or unknown
    pub invalid_direction: usize,
    /// Spacing enforced between survivors (metres for geographic grids)
    pub min_spacing: f64,
    pub metric: DistanceMetric,
}

/// Spatial point sampler stage
#[derive(Debug, Clone, Default)]
pub struct SpatialPointSampler;

impl Algorithm for SpatialPointSampler {
    type Input = (FlowRaster, Option<MultiPolygon<f64>>);
    type Output = SampleOutcome;
    type Params = SamplerParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Spatial Point Sampler"
    }

    fn description(&self) -> &'static str {
        "Sample on-river pixels and thin them to a minimum spacing"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (flow, roi) = input;
        sample_points(&flow, roi.as_ref(), &params)
    }
}

/// On-river candidates in raster scan order, plus the count of on-river
/// pixels without a usable direction.
pub fn extract_candidates(
    flow: &FlowRaster,
    roi: Option<&MultiPolygon<f64>>,
    params: &SamplerParams,
) -> (Vec<TransectPoint>, usize) {
    let acc = flow.accumulation();
    let (rows, cols) = acc.shape();

    let window = match roi {
        Some(region) => match region.bounding_rect() {
            Some(rect) => acc.window((rect.min().x, rect.min().y, rect.max().x, rect.max().y)),
            None => None,
        },
        None => Some((0, rows, 0, cols)),
    };
    let Some((row_start, row_end, col_start, col_end)) = window else {
        return (Vec::new(), 0);
    };

    let per_row: Vec<(Vec<TransectPoint>, usize)> = (row_start..row_end)
        .into_par_iter()
        .map(|row| {
            let mut points = Vec::new();
            let mut invalid = 0usize;
            for col in col_start..col_end {
                let value = unsafe { acc.get_unchecked(row, col) };
                if acc.is_nodata(value) || !(value > params.flow_acc_threshold) {
                    continue;
                }
                let (x, y) = acc.cell_center(row, col);
                if let Some(region) = roi {
                    if !region.contains(&Point::new(x, y)) {
                        continue;
                    }
                }
                match flow.upstream_degrees(row, col) {
                    Some(degrees) => points.push(TransectPoint::new(x, y, value, degrees)),
                    None => invalid += 1,
                }
            }
            (points, invalid)
        })
        .collect();

    let invalid = per_row.iter().map(|(_, n)| n).sum();
    let points = per_row.into_iter().flat_map(|(p, _)| p).collect();
    (points, invalid)
}

/// Sample transect centres from a flow raster.
///
/// Candidates are visited in raster scan order (row-major), so the thinned
/// set is reproducible for a given raster and region.
pub fn sample_points(
    flow: &FlowRaster,
    roi: Option<&MultiPolygon<f64>>,
    params: &SamplerParams,
) -> Result<SampleOutcome> {
    params.validate()?;

    let metric = if flow.is_geographic() {
        DistanceMetric::Geodesic
    } else {
        DistanceMetric::Planar
    };
    let min_spacing = params.min_spacing(flow.nominal_scale());

    let (candidates, invalid_direction) = extract_candidates(flow, roi, params);
    if invalid_direction > 0 {
        debug!(invalid_direction, "on-river pixels without a valid flow direction skipped");
    }

    let coords: Vec<[f64; 2]> = candidates.iter().map(TransectPoint::coords).collect();
    let graph = ConflictGraph::build(&coords, min_spacing, metric);
    let survivors = graph.greedy_survivors();

    info!(
        candidates = candidates.len(),
        conflicts = graph.edge_count(),
        survivors = survivors.len(),
        min_spacing,
        "thinned transect points"
    );

    let candidate_count = candidates.len();
    let mut keep = vec![false; candidate_count];
    for &i in &survivors {
        keep[i] = true;
    }
    let points = candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect();

    Ok(SampleOutcome {
        points,
        candidates: candidate_count,
        invalid_direction,
        min_spacing,
        metric,
    })
}
