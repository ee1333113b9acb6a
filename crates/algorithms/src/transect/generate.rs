//! Transect stage: half-length assignment, drawing and vectorization

use super::half_length::HalfLengthBuckets;
use super::rasterize::draw_transects;
use super::vectorize::{vectorize_transects, Transect};
use crate::hydrology::METRES_PER_DEGREE;
use crate::sampling::TransectPoint;
use rivertrend_core::vector::FeatureCollection;
use rivertrend_core::{Algorithm, Error, Result, CRS};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Parameters for transect generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransectParams {
    /// Flow-accumulation bucket edges, one more than `half_lengths`
    pub bucket_boundaries: Vec<f64>,
    /// Half-length in operational pixels per bucket
    pub half_lengths: Vec<f64>,
    /// Operational pixel size in metres
    pub resolution: f64,
    /// Cap on directional distances, in pixels
    pub max_distance: f64,
    /// Decimal places of the centroid id
    pub id_decimals: usize,
}

impl Default for TransectParams {
    fn default() -> Self {
        Self {
            bucket_boundaries: vec![5e3, 1202e3, 3269e3, 1e12],
            half_lengths: vec![4.0, 5.0, 6.0],
            resolution: 90.0,
            max_distance: 512.0,
            id_decimals: 4,
        }
    }
}

impl TransectParams {
    pub fn buckets(&self) -> Result<HalfLengthBuckets> {
        HalfLengthBuckets::new(self.bucket_boundaries.clone(), self.half_lengths.clone())
    }

    /// Operational pixel size in the units of `crs`.
    ///
    /// Lon/lat points get `resolution / 111 195.08 m` degrees; points
    /// without a CRS are taken to be in metres.
    pub fn grid_resolution(&self, crs: Option<&CRS>) -> f64 {
        if crs.is_some_and(CRS::is_geographic) {
            self.resolution / METRES_PER_DEGREE
        } else {
            self.resolution
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.buckets()?;
        if !(self.resolution > 0.0) || !self.resolution.is_finite() {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: self.resolution.to_string(),
                reason: "must be positive".into(),
            });
        }
        let longest = self.half_lengths.iter().fold(0.0_f64, |a, &b| a.max(b));
        if !(self.max_distance > longest * std::f64::consts::SQRT_2) {
            return Err(Error::InvalidParameter {
                name: "max_distance",
                value: self.max_distance.to_string(),
                reason: format!("must exceed the longest diagonal arm ({:.3})", longest * std::f64::consts::SQRT_2),
            });
        }
        if self.id_decimals > 12 {
            return Err(Error::InvalidParameter {
                name: "id_decimals",
                value: self.id_decimals.to_string(),
                reason: "at most 12".into(),
            });
        }
        Ok(())
    }
}

/// Counts from one transect run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransectReport {
    pub points_in: usize,
    pub points_without_bucket: usize,
    pub groups: usize,
    pub components: usize,
    pub dropped_oversized: usize,
    pub duplicate_ids: Vec<String>,
}

impl TransectReport {
    pub fn drop_rate(&self) -> f64 {
        if self.components == 0 {
            0.0
        } else {
            self.dropped_oversized as f64 / self.components as f64
        }
    }
}

/// Transects of one processed sub-region
#[derive(Debug, Clone)]
pub struct TransectSet {
    pub transects: Vec<Transect>,
    pub report: TransectReport,
    /// CRS of the points the transects were drawn from
    pub crs: Option<CRS>,
}

impl TransectSet {
    /// Features with `txId` and `numSuperPixelsInTx`, tagged with the
    /// parameters that produced them
    pub fn to_features(&self, params: &TransectParams) -> FeatureCollection {
        let mut fc: FeatureCollection = self.transects.iter().map(Transect::to_feature).collect();
        fc.metadata.insert("bucketBoundaries".into(), json!(params.bucket_boundaries));
        fc.metadata.insert("halfLengths".into(), json!(params.half_lengths));
        fc.metadata.insert("resolution".into(), json!(params.resolution));
        if let Some(crs) = &self.crs {
            fc.set_crs(crs);
        }
        fc
    }
}

/// Transect rasterizer stage
#[derive(Debug, Clone, Default)]
pub struct TransectRasterizer;

impl Algorithm for TransectRasterizer {
    type Input = (Vec<TransectPoint>, Option<CRS>);
    type Output = TransectSet;
    type Params = TransectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Transect Rasterizer"
    }

    fn description(&self) -> &'static str {
        "Draw perpendicular-to-flow transects and vectorize them with centroid ids"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (points, crs) = input;
        generate_transects(&points, crs.as_ref(), &params)
    }
}

/// Assign half-lengths, draw and vectorize the transects of `points`,
/// whose coordinates are in `crs`.
///
/// An empty point set, or one with no point inside a bucket, yields an
/// empty set.
pub fn generate_transects(
    points: &[TransectPoint],
    crs: Option<&CRS>,
    params: &TransectParams,
) -> Result<TransectSet> {
    params.validate()?;
    let buckets = params.buckets()?;
    let (assigned, without_bucket) = buckets.assign(points);

    let mut report = TransectReport {
        points_in: points.len(),
        points_without_bucket: without_bucket,
        ..TransectReport::default()
    };

    let resolution = params.grid_resolution(crs);
    let crs = crs.cloned();
    let Some(drawn) = draw_transects(&assigned, resolution, params.max_distance)? else {
        info!(points = points.len(), "no transects to draw");
        return Ok(TransectSet {
            transects: Vec::new(),
            report,
            crs,
        });
    };

    let (transects, vreport) =
        vectorize_transects(&drawn.raster, buckets.max_pixel_count(), params.id_decimals)?;
    report.groups = drawn.groups;
    report.components = vreport.components;
    report.dropped_oversized = vreport.dropped_oversized;
    report.duplicate_ids = vreport.duplicate_ids;

    info!(
        points = report.points_in,
        without_bucket = report.points_without_bucket,
        groups = report.groups,
        transects = transects.len(),
        "generated transects"
    );

    Ok(TransectSet {
        transects,
        report,
        crs,
    })
}
