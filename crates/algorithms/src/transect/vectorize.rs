//! Drawn raster to transect polygons.
//!
//! Non-zero cells are labelled into 8-connected components. Each component
//! is outlined along pixel edges; cells that touch only at a corner become
//! separate members of the component's MultiPolygon. Components larger than
//! a single transect are merged blobs and are dropped.

use geo::orient::{Direction, Orient};
use geo::{Area, Centroid, Contains, InteriorPoint};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use ndarray::Array2;
use rivertrend_core::vector::{Feature, FeatureCollection};
use rivertrend_core::{Error, Raster, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{info, warn};

pub const TX_ID_FIELD: &str = "txId";
pub const PIXEL_COUNT_FIELD: &str = "numSuperPixelsInTx";

const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// One vectorized transect
#[derive(Debug, Clone)]
pub struct Transect {
    pub id: String,
    pub pixel_count: usize,
    pub geometry: MultiPolygon<f64>,
}

impl Transect {
    pub fn to_feature(&self) -> Feature {
        Feature::new(self.geometry.clone())
            .with_property(TX_ID_FIELD, self.id.as_str())
            .with_property(PIXEL_COUNT_FIELD, self.pixel_count)
    }
}

/// Counts gathered while vectorizing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorizeReport {
    pub components: usize,
    pub dropped_oversized: usize,
    /// Ids shared by more than one surviving transect, sorted
    pub duplicate_ids: Vec<String>,
}

impl VectorizeReport {
    /// Fraction of components dropped as oversized
    pub fn drop_rate(&self) -> f64 {
        if self.components == 0 {
            0.0
        } else {
            self.dropped_oversized as f64 / self.components as f64
        }
    }
}

/// Label 8-connected non-zero cells; 0 is background, labels start at 1 in
/// raster scan order of each component's first cell.
pub fn label_components(raster: &Raster<u8>) -> (Array2<u32>, Vec<Vec<(usize, usize)>>) {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if data[(row, col)] == 0 || labels[(row, col)] != 0 {
                continue;
            }
            let label = components.len() as u32 + 1;
            let mut cells = Vec::new();
            labels[(row, col)] = label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                cells.push((r, c));
                for &(dr, dc) in &NEIGHBORS_8 {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if data[(nr, nc)] != 0 && labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = label;
                        queue.push_back((nr, nc));
                    }
                }
            }
            cells.sort_unstable();
            components.push(cells);
        }
    }

    (labels, components)
}

/// Lattice vertex `(col, row)` of a pixel corner
type Vertex = (usize, usize);

struct Edge {
    from: Vertex,
    to: Vertex,
    cell: (usize, usize),
}

/// Boundary edges of one component, walked with the component on a
/// consistent side
fn boundary_edges(labels: &Array2<u32>, label: u32, cells: &[(usize, usize)]) -> Vec<Edge> {
    let (rows, cols) = labels.dim();
    let inside = |r: isize, c: isize| {
        r >= 0 && c >= 0 && r < rows as isize && c < cols as isize && labels[(r as usize, c as usize)] == label
    };

    let mut edges = Vec::new();
    for &(r, c) in cells {
        let (ri, ci) = (r as isize, c as isize);
        if !inside(ri - 1, ci) {
            edges.push(Edge { from: (c, r), to: (c + 1, r), cell: (r, c) });
        }
        if !inside(ri, ci + 1) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1), cell: (r, c) });
        }
        if !inside(ri + 1, ci) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1), cell: (r, c) });
        }
        if !inside(ri, ci - 1) {
            edges.push(Edge { from: (c, r + 1), to: (c, r), cell: (r, c) });
        }
    }
    edges
}

/// Chain boundary edges into closed vertex rings.
///
/// Where two rings meet at a corner the walk stays on the current cell,
/// which separates corner-touching cells.
fn trace_rings(edges: &[Edge]) -> Result<Vec<Vec<Vertex>>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let vertex = edges[current].to;
            let candidates = outgoing.get(&vertex).map(Vec::as_slice).unwrap_or(&[]);
            let next = candidates
                .iter()
                .copied()
                .find(|&e| edges[e].cell == edges[current].cell)
                .or_else(|| candidates.iter().copied().find(|&e| !used[e] || e == start));

            match next {
                Some(e) if e == start => break,
                Some(e) if !used[e] => {
                    used[e] = true;
                    ring.push(vertex);
                    current = e;
                }
                _ => {
                    return Err(Error::Algorithm(format!(
                        "open boundary at lattice vertex {:?}",
                        vertex
                    )))
                }
            }
        }

        ring.push(ring[0]);
        rings.push(drop_collinear(ring));
    }

    Ok(rings)
}

/// Remove vertices lying on a straight run; input and output are closed
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len() - 1;
    let turns = |i: usize| {
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        let a = (cur.0 as isize - prev.0 as isize, cur.1 as isize - prev.1 as isize);
        let b = (next.0 as isize - cur.0 as isize, next.1 as isize - cur.1 as isize);
        a.0 * b.1 - a.1 * b.0 != 0
    };

    let mut out: Vec<Vertex> = (0..n).filter(|&i| turns(i)).map(|i| ring[i]).collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

/// Outline one component as a MultiPolygon in map coordinates
fn component_outline(
    raster: &Raster<u8>,
    labels: &Array2<u32>,
    label: u32,
    cells: &[(usize, usize)],
) -> Result<MultiPolygon<f64>> {
    let gt = raster.transform();
    // lattice walk order maps to clockwise map order on north-up grids
    let exterior_sign = (gt.pixel_width * gt.pixel_height).signum();

    let to_map = |ring: &[Vertex]| -> LineString<f64> {
        ring.iter()
            .map(|&(c, r)| {
                let (x, y) = gt.pixel_to_geo_corner(c, r);
                Coord { x, y }
            })
            .collect()
    };

    let mut exteriors = Vec::new();
    let mut holes = Vec::new();
    for ring in trace_rings(&boundary_edges(labels, label, cells))? {
        let line = to_map(&ring);
        let signed = Polygon::new(line.clone(), vec![]).signed_area();
        if signed * exterior_sign > 0.0 {
            exteriors.push(line);
        } else {
            holes.push(line);
        }
    }

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let inside = Polygon::new(hole.clone(), vec![]).interior_point();
        let owner = inside.and_then(|pt| {
            exteriors
                .iter()
                .position(|ext| Polygon::new(ext.clone(), vec![]).contains(&pt))
        });
        match owner {
            Some(i) => interiors[i].push(hole),
            None => warn!(label, "hole ring without an enclosing exterior ignored"),
        }
    }

    let polygons = exteriors
        .into_iter()
        .zip(interiors)
        .map(|(ext, ints)| Polygon::new(ext, ints).orient(Direction::Default))
        .collect();
    Ok(MultiPolygon::new(polygons))
}

/// Centroid id: both coordinates at fixed precision joined by `_`
pub fn transect_id(geometry: &MultiPolygon<f64>, decimals: usize) -> Option<String> {
    let c = geometry.centroid()?;
    Some(format!("{:.*}_{:.*}", decimals, c.x(), decimals, c.y()))
}

/// Ids that occur more than once, sorted
pub fn find_duplicate_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Vectorize a drawn raster into transects.
///
/// Components with more than `max_pixel_count` cells are dropped. Ids
/// are not de-duplicated; collisions are listed in the report.
pub fn vectorize_transects(
    raster: &Raster<u8>,
    max_pixel_count: usize,
    decimals: usize,
) -> Result<(Vec<Transect>, VectorizeReport)> {
    let (labels, components) = label_components(raster);
    let mut report = VectorizeReport {
        components: components.len(),
        ..VectorizeReport::default()
    };

    let mut transects = Vec::new();
    for (i, cells) in components.iter().enumerate() {
        if cells.len() > max_pixel_count {
            report.dropped_oversized += 1;
            continue;
        }
        let geometry = component_outline(raster, &labels, i as u32 + 1, cells)?;
        let id = transect_id(&geometry, decimals)
            .ok_or_else(|| Error::Algorithm(format!("component {} has no centroid", i + 1)))?;
        transects.push(Transect {
            id,
            pixel_count: cells.len(),
            geometry,
        });
    }

    report.duplicate_ids = find_duplicate_ids(transects.iter().map(|t| t.id.as_str()));

    info!(
        components = report.components,
        dropped = report.dropped_oversized,
        drop_rate = format!("{:.4}", report.drop_rate()),
        "vectorized transects"
    );
    if !report.duplicate_ids.is_empty() {
        warn!(
            count = report.duplicate_ids.len(),
            first = %report.duplicate_ids[0],
            "duplicate transect ids"
        );
    }

    Ok((transects, report))
}

/// Transects as a feature collection
pub fn transects_to_features(transects: &[Transect]) -> FeatureCollection {
    transects.iter().map(Transect::to_feature).collect()
}
