//! Theil-Sen line fitting

/// Fitted line `y = slope * x + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub offset: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.offset
    }
}

/// Median of a slice, averaging the middle pair for even lengths.
///
/// Reorders `values`. Returns `None` when empty.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Sen's slope: the median of slopes over all pairs with distinct `x`.
///
/// The offset is the median of `y - slope * x`. `None` when no pair has
/// distinct `x` or the inputs differ in length.
pub fn sens_slope(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() {
        return None;
    }
    let n = xs.len();
    let mut slopes = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = xs[j] - xs[i];
            if dx != 0.0 {
                slopes.push((ys[j] - ys[i]) / dx);
            }
        }
    }
    let slope = median(&mut slopes)?;

    let mut intercepts: Vec<f64> = xs.iter().zip(ys).map(|(&x, &y)| y - slope * x).collect();
    let offset = median(&mut intercepts)?;
    Some(LinearFit { slope, offset })
}
