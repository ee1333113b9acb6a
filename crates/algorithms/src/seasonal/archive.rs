//! Monthly archives and per-year seasonal composites

use super::composite::{permanent_composite, season_composite};
use super::window::SeasonWindows;
use crate::maybe_rayon::*;
use rivertrend_core::io::{read_geotiff, read_geotiff_bands, write_geotiff_bands, GeoTiffOptions, MultiBand};
use rivertrend_core::{Algorithm, Error, Raster, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of monthly three-state rasters
pub trait MonthlySource: Sync {
    /// `(year, month)` keys present, sorted
    fn available_months(&self) -> Vec<(i32, u32)>;

    /// Raster of one month, `None` when the month is absent
    fn month(&self, year: i32, month: u32) -> Result<Option<Raster<u8>>>;
}

/// In-memory monthly archive
#[derive(Debug, Clone, Default)]
pub struct MonthlyArchive {
    months: BTreeMap<(i32, u32), Raster<u8>>,
}

impl MonthlyArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, month: u32, raster: Raster<u8>) {
        self.months.insert((year, month), raster);
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

impl MonthlySource for MonthlyArchive {
    fn available_months(&self) -> Vec<(i32, u32)> {
        self.months.keys().copied().collect()
    }

    fn month(&self, year: i32, month: u32) -> Result<Option<Raster<u8>>> {
        Ok(self.months.get(&(year, month)).cloned())
    }
}

/// Directory of `YYYY_MM.tif` files, read on demand
#[derive(Debug, Clone)]
pub struct MonthlyDirectory {
    files: BTreeMap<(i32, u32), PathBuf>,
}

impl MonthlyDirectory {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if let Some(key) = path.file_name().and_then(|n| n.to_str()).and_then(parse_month_name) {
                files.insert(key, path);
            }
        }
        debug!(dir = %dir.as_ref().display(), months = files.len(), "indexed monthly rasters");
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl MonthlySource for MonthlyDirectory {
    fn available_months(&self) -> Vec<(i32, u32)> {
        self.files.keys().copied().collect()
    }

    fn month(&self, year: i32, month: u32) -> Result<Option<Raster<u8>>> {
        self.files
            .get(&(year, month))
            .map(|path| read_geotiff(path, None))
            .transpose()
    }
}

/// `2003_07.tif` -> `(2003, 7)`
pub fn parse_month_name(name: &str) -> Option<(i32, u32)> {
    let stem = name
        .strip_suffix(".tif")
        .or_else(|| name.strip_suffix(".tiff"))?;
    let (year, month) = stem.split_once('_')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Provenance stored with each composite file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    pub year: i32,
    pub bands: Vec<String>,
    pub windows: SeasonWindows,
}

/// Dry, wet and permanent composites of one year
#[derive(Debug, Clone)]
pub struct SeasonalComposite {
    pub year: i32,
    pub windows: SeasonWindows,
    pub bands: Vec<(String, Raster<u8>)>,
}

impl SeasonalComposite {
    pub fn file_name(year: i32) -> String {
        format!("seasonalWater{}.tif", year)
    }

    pub fn band(&self, name: &str) -> Option<&Raster<u8>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn metadata(&self) -> CompositeMetadata {
        CompositeMetadata {
            year: self.year,
            bands: self.bands.iter().map(|(n, _)| n.clone()).collect(),
            windows: self.windows.clone(),
        }
    }

    /// One page per band; band names, year and windows go in the
    /// ImageDescription as JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let description = serde_json::to_string(&self.metadata())?;
        let rasters: Vec<&Raster<u8>> = self.bands.iter().map(|(_, r)| r).collect();
        write_geotiff_bands(&rasters, Some(&description), path, Some(GeoTiffOptions::uint8()))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_multiband(read_geotiff_bands(path)?)
    }

    pub fn from_multiband(multi: MultiBand<u8>) -> Result<Self> {
        let description = multi
            .description
            .ok_or_else(|| Error::Other("composite file has no description".into()))?;
        let meta: CompositeMetadata = serde_json::from_str(&description)?;
        if meta.bands.len() != multi.bands.len() {
            return Err(Error::Other(format!(
                "description names {} bands, file has {}",
                meta.bands.len(),
                multi.bands.len()
            )));
        }
        Ok(Self {
            year: meta.year,
            windows: meta.windows,
            bands: meta.bands.into_iter().zip(multi.bands).collect(),
        })
    }
}

fn load_window<S: MonthlySource + ?Sized>(source: &S, months: &[(i32, u32)]) -> Result<Vec<Raster<u8>>> {
    let mut rasters = Vec::with_capacity(months.len());
    for &(y, m) in months {
        if let Some(r) = source.month(y, m)? {
            rasters.push(r);
        }
    }
    Ok(rasters)
}

/// Composite one year, or `None` when either window has no monthly raster
pub fn composite_year<S: MonthlySource + ?Sized>(
    source: &S,
    windows: &SeasonWindows,
    year: i32,
) -> Result<Option<SeasonalComposite>> {
    let dry_months = load_window(source, &windows.dry_months(year))?;
    let wet_months = load_window(source, &windows.wet_months(year))?;
    if dry_months.is_empty() || wet_months.is_empty() {
        debug!(year, dry = dry_months.len(), wet = wet_months.len(), "incomplete season windows");
        return Ok(None);
    }

    let dry = season_composite(&dry_months.iter().collect::<Vec<_>>())?;
    let wet = season_composite(&wet_months.iter().collect::<Vec<_>>())?;
    let permanent = permanent_composite(&dry, &wet)?;

    Ok(Some(SeasonalComposite {
        year,
        windows: windows.clone(),
        bands: vec![
            (windows.dry_band(), dry),
            (windows.wet_band(), wet),
            (windows.permanent_band(), permanent),
        ],
    }))
}

/// Composite every archive year whose windows have data, in year order
pub fn build_composites<S: MonthlySource + ?Sized>(
    source: &S,
    windows: &SeasonWindows,
) -> Result<Vec<SeasonalComposite>> {
    windows.validate()?;
    let available = source.available_months();
    let (Some(first), Some(last)) = (available.first(), available.last()) else {
        return Ok(Vec::new());
    };
    let years: Vec<i32> = (first.0..=last.0).collect();

    let results: Result<Vec<Option<SeasonalComposite>>> = years
        .into_par_iter()
        .map(|year| composite_year(source, windows, year))
        .collect();
    let results = results?;

    let skipped: Vec<i32> = (first.0..=last.0)
        .zip(&results)
        .filter(|(_, c)| c.is_none())
        .map(|(y, _)| y)
        .collect();
    let composites: Vec<SeasonalComposite> = results.into_iter().flatten().collect();

    info!(
        composites = composites.len(),
        skipped = ?skipped,
        "built seasonal composites"
    );
    Ok(composites)
}

/// Seasonal composite builder stage
#[derive(Debug, Clone, Default)]
pub struct SeasonalCompositeBuilder;

impl Algorithm for SeasonalCompositeBuilder {
    type Input = MonthlyArchive;
    type Output = Vec<SeasonalComposite>;
    type Params = SeasonWindows;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Seasonal Composite Builder"
    }

    fn description(&self) -> &'static str {
        "Reduce monthly water classes to dry, wet and permanent composites per year"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        build_composites(&input, &params)
    }
}
