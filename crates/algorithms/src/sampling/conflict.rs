//! Minimum-spacing conflict graph and greedy thinning.
//!
//! Candidates are nodes; an undirected edge joins two distinct candidates
//! closer than the minimum spacing. Thinning walks the nodes in index order
//! and, for every node not yet removed, removes all of its neighbours. The
//! survivors are pairwise at least the spacing apart. The result is a
//! maximal independent set, not a maximum one, and depends on node order.

use super::kdtree::KdTree;
use crate::hydrology::METRES_PER_DEGREE;
use crate::maybe_rayon::*;
use geo::{Distance, Euclidean, Haversine, Point};

/// How distances between candidates are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Euclidean distance in map units
    Planar,
    /// Great-circle distance in metres between lon/lat degree coordinates
    Geodesic,
}

impl DistanceMetric {
    pub fn distance(self, a: [f64; 2], b: [f64; 2]) -> f64 {
        let (pa, pb) = (Point::new(a[0], a[1]), Point::new(b[0], b[1]));
        match self {
            DistanceMetric::Planar => Euclidean::distance(pa, pb),
            DistanceMetric::Geodesic => Haversine::distance(pa, pb),
        }
    }
}

/// Adjacency-list conflict graph over an arena of candidate coordinates
#[derive(Debug, Clone)]
pub struct ConflictGraph {
    adjacency: Vec<Vec<usize>>,
}

impl ConflictGraph {
    /// Connect every pair of distinct candidates closer than `min_spacing`.
    ///
    /// Self-pairs are never edges, including exact duplicates of one index;
    /// two different candidates at the same location do conflict.
    pub fn build(coords: &[[f64; 2]], min_spacing: f64, metric: DistanceMetric) -> Self {
        let tree = KdTree::build(coords);
        let radius = search_radius(coords, min_spacing, metric);

        let adjacency: Vec<Vec<usize>> = (0..coords.len())
            .into_par_iter()
            .map(|i| {
                let p = coords[i];
                tree.within_radius(p[0], p[1], radius)
                    .into_iter()
                    .filter(|&j| j != i && metric.distance(p, coords[j]) < min_spacing)
                    .collect()
            })
            .collect();

        Self { adjacency }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Sorted neighbours of node `i`
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Greedy thinning in node order; returns surviving node indices ascending.
    pub fn greedy_survivors(&self) -> Vec<usize> {
        let mut removed = vec![false; self.len()];
        let mut survivors = Vec::new();

        for i in 0..self.len() {
            if removed[i] {
                continue;
            }
            survivors.push(i);
            for &j in &self.adjacency[i] {
                removed[j] = true;
            }
        }

        survivors
    }
}

/// Radius in coordinate units that encloses every candidate within
/// `min_spacing` under `metric`.
fn search_radius(coords: &[[f64; 2]], min_spacing: f64, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Planar => min_spacing,
        DistanceMetric::Geodesic => {
            let lat_span = min_spacing / METRES_PER_DEGREE;
            let max_lat = coords
                .iter()
                .map(|p| p[1].abs())
                .fold(0.0_f64, f64::max);
            let cos_lat = (max_lat + lat_span).min(89.9).to_radians().cos();
            // a degree of longitude shrinks with latitude; 1% slack for the
            // small-angle approximation
            std::f64::consts::SQRT_2 * 1.01 * lat_span / cos_lat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_pairs_are_not_conflicts() {
        let graph = ConflictGraph::build(&[[0.0, 0.0]], 200.0, DistanceMetric::Planar);
        assert!(graph.neighbors(0).is_empty());
        assert_eq!(graph.greedy_survivors(), vec![0]);
    }

    #[test]
    fn chain_keeps_alternate_points() {
        // 0-1-2-3-4 spaced 150 apart with a 200 minimum: neighbours only adjacent
        let coords: Vec<[f64; 2]> = (0..5).map(|i| [i as f64 * 150.0, 0.0]).collect();
        let graph = ConflictGraph::build(&coords, 200.0, DistanceMetric::Planar);

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.neighbors(2), &[1, 3]);
        assert_eq!(graph.greedy_survivors(), vec![0, 2, 4]);
    }

    #[test]
    fn exact_spacing_is_not_a_conflict() {
        let coords = [[0.0, 0.0], [200.0, 0.0]];
        let graph = ConflictGraph::build(&coords, 200.0, DistanceMetric::Planar);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn coincident_candidates_conflict() {
        let coords = [[5.0, 5.0], [5.0, 5.0]];
        let graph = ConflictGraph::build(&coords, 1.0, DistanceMetric::Planar);
        assert_eq!(graph.greedy_survivors(), vec![0]);
    }

    #[test]
    fn geodesic_spacing_accounts_for_latitude() {
        // 0.003 deg of longitude at 60N is ~167 m; at the equator ~334 m
        let north = [[10.0, 60.0], [10.003, 60.0]];
        let equator = [[10.0, 0.0], [10.003, 0.0]];

        let g = ConflictGraph::build(&north, 200.0, DistanceMetric::Geodesic);
        assert_eq!(g.edge_count(), 1);

        let g = ConflictGraph::build(&equator, 200.0, DistanceMetric::Geodesic);
        assert_eq!(g.edge_count(), 0);
    }
}
