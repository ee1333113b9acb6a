//! Flow-accumulation buckets to transect half-lengths

use crate::sampling::TransectPoint;
use rivertrend_core::{Error, Result};
use tracing::debug;

/// Half-length lookup: bucket `i` holds `boundaries[i] <= acc < boundaries[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HalfLengthBuckets {
    boundaries: Vec<f64>,
    half_lengths: Vec<f64>,
}

impl HalfLengthBuckets {
    pub fn new(boundaries: Vec<f64>, half_lengths: Vec<f64>) -> Result<Self> {
        if half_lengths.is_empty() || boundaries.len() != half_lengths.len() + 1 {
            return Err(Error::InvalidParameter {
                name: "bucket_boundaries",
                value: format!("{:?}", boundaries),
                reason: format!("need exactly {} boundaries for {} half-lengths", half_lengths.len() + 1, half_lengths.len()),
            });
        }
        if boundaries.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::InvalidParameter {
                name: "bucket_boundaries",
                value: format!("{:?}", boundaries),
                reason: "must be strictly increasing".into(),
            });
        }
        if half_lengths.iter().any(|&h| !(h > 0.0)) {
            return Err(Error::InvalidParameter {
                name: "half_lengths",
                value: format!("{:?}", half_lengths),
                reason: "must be positive".into(),
            });
        }
        Ok(Self {
            boundaries,
            half_lengths,
        })
    }

    /// Bucket index for an accumulation value
    pub fn bucket(&self, accumulation: f64) -> Option<usize> {
        self.boundaries
            .windows(2)
            .position(|w| accumulation >= w[0] && accumulation < w[1])
    }

    /// Half-length in pixels; diagonal transects are scaled by sqrt(2) so
    /// that their arms cover the same number of pixels
    pub fn half_length(&self, bucket: usize, diagonal: bool) -> f64 {
        let base = self.half_lengths[bucket];
        if diagonal {
            // Arms are clipped by walked distance, and a diagonal step is
            // sqrt(2) cells long. The scaled arm keeps the pixel count of an
            // axis-aligned one but reaches sqrt(2) times further on the ground.
            base * std::f64::consts::SQRT_2
        } else {
            base
        }
    }

    /// Largest pixel count a single drawn transect can have
    pub fn max_pixel_count(&self) -> usize {
        let longest = self.half_lengths.iter().fold(0.0_f64, |a, &b| a.max(b));
        (2.0 * longest.floor() + 1.0) as usize
    }

    /// Copy points with their half-length set, dropping points that fall
    /// outside every bucket. Returns the points and the drop count.
    pub fn assign(&self, points: &[TransectPoint]) -> (Vec<TransectPoint>, usize) {
        let mut dropped = 0;
        let assigned: Vec<TransectPoint> = points
            .iter()
            .filter_map(|p| match self.bucket(p.flow_accumulation) {
                Some(b) => Some(TransectPoint {
                    half_length: Some(self.half_length(b, p.is_diagonal())),
                    ..p.clone()
                }),
                None => {
                    dropped += 1;
                    None
                }
            })
            .collect();

        if dropped > 0 {
            debug!(dropped, "points outside every half-length bucket");
        }
        (assigned, dropped)
    }
}
