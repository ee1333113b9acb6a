//! Long area time series to one row per region and year

use super::region_area::RegionAreaRecord;
use rivertrend_core::io::write_records;
use rivertrend_core::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Wide table with dynamic season columns
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PivotTable {
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_records(&self.header, &self.rows, path)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

#[derive(Default)]
struct WideRow {
    footprint_ha: f64,
    seasons: BTreeMap<usize, (f64, f64)>,
}

/// Pivot area records to `id, area_ha, year` followed by
/// `{season}_nodata_ha, {season}_water_ha` per season, seasons in order of
/// first appearance.
///
/// The nodata column of `permanent_season` is named `total_nodata_ha`.
/// Missing cells are left empty.
///
/// `area_ha` is the region's polygon area from `region_areas`. Regions
/// missing from it fall back to the largest per-year class total, which is
/// the area of the pixels whose centres fall inside the polygon.
pub fn pivot_wide(
    records: &[RegionAreaRecord],
    id_column: &str,
    permanent_season: Option<&str>,
    region_areas: Option<&BTreeMap<String, f64>>,
) -> PivotTable {
    let mut seasons: Vec<&str> = Vec::new();
    let mut rows: BTreeMap<(&str, i32), WideRow> = BTreeMap::new();

    for r in records {
        let season = match seasons.iter().position(|s| *s == r.season) {
            Some(i) => i,
            None => {
                seasons.push(&r.season);
                seasons.len() - 1
            }
        };
        let row = rows.entry((r.region_id.as_str(), r.year)).or_default();
        row.footprint_ha = row.footprint_ha.max(r.total_ha());
        row.seasons.insert(season, (r.nodata_ha, r.water_ha));
    }

    let mut header = vec![id_column.to_string(), "area_ha".to_string(), "year".to_string()];
    for &s in &seasons {
        if Some(s) == permanent_season {
            header.push("total_nodata_ha".to_string());
        } else {
            header.push(format!("{}_nodata_ha", s));
        }
        header.push(format!("{}_water_ha", s));
    }

    let rows = rows
        .into_iter()
        .map(|((id, year), row)| {
            let area_ha = region_areas
                .and_then(|areas| areas.get(id))
                .copied()
                .unwrap_or(row.footprint_ha);
            let mut cells = vec![id.to_string(), area_ha.to_string(), year.to_string()];
            for i in 0..seasons.len() {
                match row.seasons.get(&i) {
                    Some((nodata, water)) => {
                        cells.push(nodata.to_string());
                        cells.push(water.to_string());
                    }
                    None => {
                        cells.push(String::new());
                        cells.push(String::new());
                    }
                }
            }
            cells
        })
        .collect();

    PivotTable { header, rows }
}
