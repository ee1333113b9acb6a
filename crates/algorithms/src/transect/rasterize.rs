//! Drawing transects on the operational grid.
//!
//! Points are grouped by transect axis and half-length. Each group gets a
//! seed raster and, for both directions along its axis, a directional
//! distance raster: the distance from the nearest seed reached by walking
//! backwards along that direction. Arm pixels are those within the
//! half-length. The two arms plus the seed are summed per group, and the
//! groups are OR-ed into one drawn raster.

use crate::maybe_rayon::*;
use crate::sampling::TransectPoint;
use ndarray::{Array2, ArrayView2};
use rivertrend_core::raster::d8;
use rivertrend_core::{Error, GeoTransform, Raster, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Tolerance on the half-length comparison
const LENGTH_EPS: f64 = 1e-9;

/// Points of one drawing group, as seed cells
#[derive(Debug, Clone)]
pub struct DrawGroup {
    /// Smaller of the two perpendicular angles
    pub axis: u16,
    pub half_length: f64,
    pub seeds: Vec<(usize, usize)>,
}

/// The OR-union of all drawn groups
#[derive(Debug, Clone)]
pub struct DrawnTransects {
    /// 1 on transect pixels, 0 elsewhere
    pub raster: Raster<u8>,
    pub groups: usize,
    pub seeds: usize,
}

/// Grid of `resolution` cells snapped to multiples of the resolution and
/// padded by the longest arm, covering every point.
pub fn transect_grid(points: &[TransectPoint], resolution: f64) -> Option<Raster<u8>> {
    let longest = points
        .iter()
        .filter_map(|p| p.half_length)
        .fold(0.0_f64, f64::max);
    let first = points.first()?;

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(a, b, c, d), p| (a.min(p.x), b.min(p.y), c.max(p.x), d.max(p.y)),
    );
    let pad = (longest.ceil() + 2.0) * resolution;
    let (transform, rows, cols) =
        GeoTransform::snapped((min_x - pad, min_y - pad, max_x + pad, max_y + pad), resolution);

    let mut grid: Raster<u8> = Raster::new(rows, cols);
    grid.set_transform(transform);
    Some(grid)
}

/// Group points by (axis, half-length), in a stable key order.
///
/// Points without a half-length are skipped.
pub fn group_points(points: &[TransectPoint], grid: &Raster<u8>) -> Vec<DrawGroup> {
    let mut groups: BTreeMap<(u16, u64), DrawGroup> = BTreeMap::new();

    for p in points {
        let Some(half_length) = p.half_length else {
            continue;
        };
        let Some(cell) = grid.locate(p.x, p.y) else {
            continue;
        };
        let axis = p.perp1.min(p.perp2);
        groups
            .entry((axis, half_length.to_bits()))
            .or_insert_with(|| DrawGroup {
                axis,
                half_length,
                seeds: Vec::new(),
            })
            .seeds
            .push(cell);
    }

    groups.into_values().collect()
}

/// Distance from the nearest seed along `degrees`, in pixel units.
///
/// A cell is reached from the cell one step behind it, so distances grow
/// in the direction of the angle. Diagonal steps count sqrt(2). Cells
/// farther than `max_distance` from any seed stay infinite.
pub fn directional_distance(seeds: ArrayView2<'_, bool>, degrees: u16, max_distance: f64) -> Array2<f64> {
    let (rows, cols) = seeds.dim();
    let (dr, dc) = d8::grid_step(degrees);
    let step = ((dr * dr + dc * dc) as f64).sqrt();
    let mut dist = Array2::from_elem((rows, cols), f64::INFINITY);

    let row_order: Vec<usize> = if dr >= 0 { (0..rows).collect() } else { (0..rows).rev().collect() };
    let col_order: Vec<usize> = if dc >= 0 { (0..cols).collect() } else { (0..cols).rev().collect() };

    for &row in &row_order {
        for &col in &col_order {
            if seeds[(row, col)] {
                dist[(row, col)] = 0.0;
                continue;
            }
            let pr = row as isize - dr;
            let pc = col as isize - dc;
            if pr < 0 || pc < 0 || pr >= rows as isize || pc >= cols as isize {
                continue;
            }
            let d = dist[(pr as usize, pc as usize)] + step;
            if d <= max_distance {
                dist[(row, col)] = d;
            }
        }
    }

    dist
}

/// Draw one group: seed plus both arms, non-zero where drawn
pub fn draw_group(group: &DrawGroup, shape: (usize, usize), max_distance: f64) -> Array2<f64> {
    let mut seeds = Array2::from_elem(shape, false);
    for &cell in &group.seeds {
        seeds[cell] = true;
    }

    let arm = |degrees: u16| {
        directional_distance(seeds.view(), degrees, max_distance).mapv(|d| {
            if d > 0.0 && d <= group.half_length + LENGTH_EPS {
                d
            } else {
                0.0
            }
        })
    };

    let forward = arm(group.axis);
    let backward = arm((group.axis + 180) % 360);
    let seed = seeds.mapv(|s| if s { 1.0 } else { 0.0 });

    forward + backward + seed
}

/// Draw every point with an assigned half-length onto one grid
pub fn draw_transects(
    points: &[TransectPoint],
    resolution: f64,
    max_distance: f64,
) -> Result<Option<DrawnTransects>> {
    if !(resolution > 0.0) {
        return Err(Error::InvalidParameter {
            name: "resolution",
            value: resolution.to_string(),
            reason: "must be positive".into(),
        });
    }
    let Some(grid) = transect_grid(points, resolution) else {
        return Ok(None);
    };

    let groups = group_points(points, &grid);
    let seeds = groups.iter().map(|g| g.seeds.len()).sum();
    let shape = grid.shape();
    debug!(groups = groups.len(), seeds, rows = shape.0, cols = shape.1, "drawing transect groups");

    let layers: Vec<Array2<f64>> = (&groups)
        .into_par_iter()
        .map(|g| draw_group(g, shape, max_distance))
        .collect();

    let mut union = Array2::<u8>::zeros(shape);
    for layer in &layers {
        union.zip_mut_with(layer, |u, &v| {
            if v > 0.0 {
                *u = 1;
            }
        });
    }

    Ok(Some(DrawnTransects {
        raster: grid.with_data(union)?,
        groups: groups.len(),
        seeds,
    }))
}
