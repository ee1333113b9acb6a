//! Splitting transect points into sub-regions processed one at a time

use crate::sampling::TransectPoint;
use crate::statistics::Region;
use geo::Contains;
use geo_types::Point;
use tracing::{debug, warn};

/// Points of one sub-region
#[derive(Debug, Clone)]
pub struct PointChunk {
    pub id: String,
    pub points: Vec<TransectPoint>,
}

/// Assign each point to the first region containing it.
///
/// Chunks keep the region order; regions without points are omitted.
/// Returns the chunks and the number of points outside every region.
pub fn partition_points(points: &[TransectPoint], regions: &[Region]) -> (Vec<PointChunk>, usize) {
    let mut buckets: Vec<Vec<TransectPoint>> = vec![Vec::new(); regions.len()];
    let mut outside = 0;

    for p in points {
        let pt = Point::new(p.x, p.y);
        match regions.iter().position(|r| r.geometry.contains(&pt)) {
            Some(i) => buckets[i].push(p.clone()),
            None => outside += 1,
        }
    }
    if outside > 0 {
        warn!(outside, "points outside every chunk left out");
    }

    let chunks: Vec<PointChunk> = regions
        .iter()
        .zip(buckets)
        .filter(|(_, pts)| !pts.is_empty())
        .map(|(r, pts)| PointChunk {
            id: r.id.clone(),
            points: pts,
        })
        .collect();
    debug!(chunks = chunks.len(), regions = regions.len(), "partitioned points");
    (chunks, outside)
}
