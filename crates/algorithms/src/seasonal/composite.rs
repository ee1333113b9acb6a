//! Seasonal and permanent composites of three-state rasters

use super::class::{permanent_class, season_class, PixClass};
use crate::maybe_rayon::*;
use ndarray::Array2;
use rivertrend_core::{Error, Raster, Result};

/// Combine the monthly rasters of one window cell by cell.
///
/// Months absent from the archive are simply not passed; since an all
/// no-data month never changes the outcome this equals treating them as
/// no-data. All months must share one grid.
pub fn season_composite(months: &[&Raster<u8>]) -> Result<Raster<u8>> {
    let first = months.first().ok_or_else(|| Error::InvalidParameter {
        name: "months",
        value: "0".into(),
        reason: "a season needs at least one monthly raster".into(),
    })?;
    for month in &months[1..] {
        first.ensure_same_grid(*month)?;
    }

    let (rows, cols) = first.shape();
    let codes: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut classes = Vec::with_capacity(months.len());
            (0..cols)
                .map(|col| {
                    classes.clear();
                    classes.extend(
                        months
                            .iter()
                            .map(|m| PixClass::from_code_lossy(unsafe { m.get_unchecked(row, col) })),
                    );
                    season_class(&classes).code()
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), codes).map_err(|e| Error::Other(e.to_string()))?;
    first.with_data(data)
}

/// Cross a year's dry and wet composites
pub fn permanent_composite(dry: &Raster<u8>, wet: &Raster<u8>) -> Result<Raster<u8>> {
    dry.ensure_same_grid(wet)?;
    let mut data = Array2::<u8>::zeros(dry.shape());
    ndarray::Zip::from(&mut data)
        .and(dry.data())
        .and(wet.data())
        .for_each(|out, &d, &w| {
            *out = permanent_class(PixClass::from_code_lossy(d), PixClass::from_code_lossy(w)).code();
        });
    dry.with_data(data)
}
