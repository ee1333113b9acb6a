//! 2D k-d tree over candidate point coordinates.
//!
//! Only fixed-radius queries are needed: the conflict graph asks, for each
//! candidate, which others lie within the minimum spacing.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;

/// A 2D k-d tree storing indices into the caller's coordinate slice.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    coords: Vec<[f64; 2]>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `coords` (and the caller's slice)
    point: usize,
    /// 0 = x, 1 = y
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a tree over `coords`. O(n log n) with median selection.
    pub fn build(coords: &[[f64; 2]]) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(coords.len()),
            coords: coords.to_vec(),
        };
        let mut indices: Vec<usize> = (0..coords.len()).collect();
        tree.build_subtree(&mut indices, 0);
        tree
    }

    fn build_subtree(&mut self, indices: &mut [usize], depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let axis = depth % 2;
        let median = indices.len() / 2;
        let coords = &self.coords;
        indices.select_nth_unstable_by(median, |&a, &b| {
            coords[a][axis]
                .partial_cmp(&coords[b][axis])
                .unwrap_or(Ordering::Equal)
        });

        let node = self.nodes.len();
        self.nodes.push(KdNode {
            point: indices[median],
            axis,
            left: None,
            right: None,
        });

        let (lower, rest) = indices.split_at_mut(median);
        let left = self.build_subtree(lower, depth + 1);
        let right = self.build_subtree(&mut rest[1..], depth + 1);
        self.nodes[node].left = left;
        self.nodes[node].right = right;

        Some(node)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Indices of all points with Euclidean distance `<= radius` from `(qx, qy)`,
    /// sorted ascending.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return found;
        }

        let radius_sq = radius * radius;
        let query = [qx, qy];
        let mut stack = vec![0usize];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            let p = self.coords[node.point];

            let dx = qx - p[0];
            let dy = qy - p[1];
            if dx * dx + dy * dy <= radius_sq {
                found.push(node.point);
            }

            // signed distance from the splitting plane
            let diff = query[node.axis] - p[node.axis];
            if let Some(left) = node.left {
                if diff <= radius {
                    stack.push(left);
                }
            }
            if let Some(right) = node.right {
                if diff >= -radius {
                    stack.push(right);
                }
            }
        }

        found.sort_unstable();
        found
    }
}
