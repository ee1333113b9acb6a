//! rivertrend CLI - river-channel change from surface-water rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rivertrend_algorithms::config::PipelineConfig;
use rivertrend_algorithms::hydrology::{derive_flow_raster, FlowRaster};
use rivertrend_algorithms::sampling::{sample_points, TransectPoint};
use rivertrend_algorithms::seasonal::{build_composites, MonthlyDirectory, SeasonalComposite};
use rivertrend_algorithms::statistics::{
    aggregate_composites, display_by_season, display_rows, estimate_trends, pivot_wide,
    region_centroids, split_by_season, Region, RegionAreaRecord,
};
use rivertrend_algorithms::transect::{find_duplicate_ids, generate_transects, partition_points};
use rivertrend_core::io::{
    read_csv, read_geojson, read_geotiff, write_csv, write_geojson, write_geotiff, GeoTiffOptions,
};
use rivertrend_core::vector::FeatureCollection;
use rivertrend_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rivertrend")]
#[command(author, version, about = "River-channel change from surface-water rasters", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pipeline configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive flow accumulation and ESRI flow direction from a DEM
    Flow {
        /// Input DEM file
        dem: PathBuf,
        /// Output flow accumulation file
        accumulation: PathBuf,
        /// Output flow direction file
        direction: PathBuf,
    },
    /// Sample transect centre points along the river network
    Points {
        /// Flow accumulation raster
        accumulation: PathBuf,
        /// Flow direction raster
        direction: PathBuf,
        /// Output point GeoJSON
        output: PathBuf,
        /// Region of interest (GeoJSON polygons)
        #[arg(long)]
        roi: Option<PathBuf>,
    },
    /// Draw and vectorize transects around sampled points
    Transects {
        /// Point GeoJSON from `points`
        points: PathBuf,
        /// Output GeoJSON, or a directory when `--chunks` is given
        output: PathBuf,
        /// Sub-regions processed one at a time (GeoJSON polygons)
        #[arg(long)]
        chunks: Option<PathBuf>,
        /// Attribute naming each chunk
        #[arg(long, default_value = "name")]
        chunk_field: String,
        /// Operational pixel size in metres, overriding the config
        #[arg(short, long)]
        resolution: Option<f64>,
    },
    /// Build per-year seasonal composites from monthly rasters
    Composites {
        /// Directory of monthly rasters named YYYY_MM.tif
        monthly: PathBuf,
        /// Output directory for seasonalWater{YYYY}.tif
        output: PathBuf,
    },
    /// Per-region class areas of every composite
    Areas {
        /// Directory of seasonal composite files
        composites: PathBuf,
        /// Output long time-series CSV
        output: PathBuf,
        /// Region GeoJSON files (merged)
        #[arg(short = 'g', long = "regions", required = true, num_args = 1..)]
        regions: Vec<PathBuf>,
        /// Attribute holding the region id (txId, HYBAS_ID)
        #[arg(long, default_value = "txId")]
        id_field: String,
    },
    /// Pivot a long time series to one row per region and year
    Pivot {
        /// Long time-series CSV from `areas`
        input: PathBuf,
        /// Output wide CSV
        output: PathBuf,
        /// Header of the region id column
        #[arg(long, default_value = "regionId")]
        id_column: String,
        /// Region GeoJSON files giving each region's polygon area
        #[arg(short = 'g', long = "regions", num_args = 1..)]
        regions: Vec<PathBuf>,
        /// Attribute holding the region id
        #[arg(long, default_value = "txId")]
        id_field: String,
    },
    /// Fit per-region water-area trends
    Trends {
        /// Long time-series CSV from `areas`
        input: PathBuf,
        /// Output trend CSV; per-season tables are written next to it
        output: PathBuf,
        /// Region GeoJSON files for display views
        #[arg(short = 'g', long = "regions", num_args = 1..)]
        regions: Vec<PathBuf>,
        /// Attribute holding the region id
        #[arg(long, default_value = "txId")]
        id_field: String,
        /// Directory for display views (needs --regions)
        #[arg(long)]
        display: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rivertrend={level},rivertrend_core={level},rivertrend_algorithms={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_raster<T: rivertrend_core::RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<T> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_features(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...");
    let fc = read_geojson(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features", path.display(), fc.len());
    Ok(fc)
}

fn read_regions(paths: &[PathBuf], id_field: &str) -> Result<Vec<Region>> {
    let mut regions = Vec::new();
    for path in paths {
        let fc = read_features(path)?;
        let mut part = Region::from_features(&fc, id_field)
            .with_context(|| format!("Bad regions in {}", path.display()))?;
        regions.append(&mut part);
    }
    Ok(regions)
}

/// Polygon area in hectares of every region, in each file's own CRS
fn region_areas(paths: &[PathBuf], id_field: &str) -> Result<BTreeMap<String, f64>> {
    let mut areas = BTreeMap::new();
    for path in paths {
        let fc = read_features(path)?;
        let crs = fc.crs();
        let regions = Region::from_features(&fc, id_field)
            .with_context(|| format!("Bad regions in {}", path.display()))?;
        for region in regions {
            let area = region.area_ha(&crs);
            areas.insert(region.id, area);
        }
    }
    Ok(areas)
}

fn read_records(path: &Path) -> Result<Vec<RegionAreaRecord>> {
    let pb = spinner("Reading time series...");
    let records: Vec<RegionAreaRecord> =
        read_csv(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("{} area records", records.len());
    Ok(records)
}

/// `dir/stem_suffix.ext` next to `path`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    path.with_file_name(format!("{stem}_{suffix}.{ext}"))
}

/// File-name safe form of a chunk id
fn slug(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn composite_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("seasonalWater") && n.ends_with(".tif"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Flow {
            dem,
            accumulation,
            direction,
        } => {
            let dem: Raster<f64> = read_raster(&dem)?;
            let start = Instant::now();
            let flow = derive_flow_raster(&dem).context("Failed to derive flow raster")?;
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            write_geotiff(flow.accumulation(), &accumulation, None)
                .context("Failed to write accumulation")?;
            write_geotiff(flow.direction(), &direction, Some(GeoTiffOptions::uint8()))
                .context("Failed to write direction")?;
            pb.finish_and_clear();
            done("Flow accumulation", &accumulation, elapsed);
            done("Flow direction", &direction, elapsed);
        }

        Commands::Points {
            accumulation,
            direction,
            output,
            roi,
        } => {
            let acc: Raster<f64> = read_raster(&accumulation)?;
            let dir: Raster<u8> = read_raster(&direction)?;
            let flow = FlowRaster::new(acc, dir, config.sampling.direction_encoding)
                .context("Flow rasters do not share a grid")?;
            let roi = match roi {
                Some(path) => Some(
                    read_features(&path)?
                        .areal_parts()
                        .context("Region of interest must be polygons")?,
                ),
                None => None,
            };

            let start = Instant::now();
            let outcome = sample_points(&flow, roi.as_ref(), &config.sampling)
                .context("Failed to sample points")?;
            let elapsed = start.elapsed();

            println!(
                "{} points from {} candidates (min spacing {:.1}, {} without direction)",
                outcome.points.len(),
                outcome.candidates,
                outcome.min_spacing,
                outcome.invalid_direction
            );
            let mut fc: FeatureCollection = outcome.points.iter().map(TransectPoint::to_feature).collect();
            if let Some(crs) = flow.accumulation().crs() {
                fc.set_crs(crs);
            }
            write_geojson(&fc, &output).context("Failed to write points")?;
            done("Transect points", &output, elapsed);
        }

        Commands::Transects {
            points,
            output,
            chunks,
            chunk_field,
            resolution,
        } => {
            let mut params = config.transects.clone();
            if let Some(res) = resolution {
                params.resolution = res;
            }
            let fc = read_features(&points)?;
            let crs = fc.crs();
            info!("Points CRS: {crs}");
            let points: Vec<TransectPoint> = fc
                .iter()
                .enumerate()
                .map(|(i, f)| TransectPoint::from_feature(f, i))
                .collect::<rivertrend_core::Result<_>>()
                .context("Bad transect point")?;

            let start = Instant::now();
            match chunks {
                None => {
                    let set = generate_transects(&points, Some(&crs), &params)
                        .context("Failed to generate transects")?;
                    println!(
                        "{} transects, {} oversized dropped ({:.2}%), {} duplicate ids",
                        set.transects.len(),
                        set.report.dropped_oversized,
                        100.0 * set.report.drop_rate(),
                        set.report.duplicate_ids.len()
                    );
                    write_geojson(&set.to_features(&params), &output)
                        .context("Failed to write transects")?;
                    done("Transects", &output, start.elapsed());
                }
                Some(chunks) => {
                    let regions = read_regions(&[chunks], &chunk_field)?;
                    let (parts, outside) = partition_points(&points, &regions);
                    if outside > 0 {
                        println!("{} points outside every chunk", outside);
                    }
                    std::fs::create_dir_all(&output)
                        .with_context(|| format!("Failed to create {}", output.display()))?;

                    let mut all_ids = Vec::new();
                    for part in &parts {
                        let set = generate_transects(&part.points, Some(&crs), &params)
                            .with_context(|| format!("Failed on chunk {}", part.id))?;
                        let path = output.join(format!("transects_{}.geojson", slug(&part.id)));
                        write_geojson(&set.to_features(&params), &path)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!(
                            "{}: {} transects, {} oversized dropped",
                            part.id,
                            set.transects.len(),
                            set.report.dropped_oversized
                        );
                        all_ids.extend(set.transects.into_iter().map(|t| t.id));
                    }

                    let dups = find_duplicate_ids(all_ids.iter().map(String::as_str));
                    if !dups.is_empty() {
                        warn!(count = dups.len(), "transect ids repeated across chunks");
                        println!("{} ids repeated across chunks", dups.len());
                    }
                    done("Transects", &output, start.elapsed());
                }
            }
        }

        Commands::Composites { monthly, output } => {
            let source = MonthlyDirectory::open(&monthly)
                .with_context(|| format!("Failed to index {}", monthly.display()))?;
            if source.is_empty() {
                anyhow::bail!("No YYYY_MM.tif rasters in {}", monthly.display());
            }
            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;

            let start = Instant::now();
            let pb = spinner("Building composites...");
            let composites =
                build_composites(&source, &config.seasons).context("Failed to build composites")?;
            pb.finish_and_clear();

            for composite in &composites {
                let path = output.join(SeasonalComposite::file_name(composite.year));
                composite
                    .write(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!("{} yearly composites", composites.len());
            done("Seasonal composites", &output, start.elapsed());
        }

        Commands::Areas {
            composites,
            output,
            regions,
            id_field,
        } => {
            let regions = read_regions(&regions, &id_field)?;
            let files = composite_files(&composites)?;
            if files.is_empty() {
                anyhow::bail!("No seasonalWater*.tif files in {}", composites.display());
            }

            let start = Instant::now();
            let mut loaded = Vec::with_capacity(files.len());
            let pb = spinner("Reading composites...");
            for path in &files {
                loaded.push(
                    SeasonalComposite::read(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                );
            }
            pb.finish_and_clear();

            let records = aggregate_composites(&regions, &loaded).context("Failed to aggregate areas")?;
            write_csv(&records, &output).context("Failed to write time series")?;
            println!("{} records for {} regions", records.len(), regions.len());
            done("Area time series", &output, start.elapsed());
        }

        Commands::Pivot {
            input,
            output,
            id_column,
            regions,
            id_field,
        } => {
            let records = read_records(&input)?;
            let start = Instant::now();
            let permanent = config.permanent_season()?;
            let areas = if regions.is_empty() {
                None
            } else {
                Some(region_areas(&regions, &id_field)?)
            };
            let table = pivot_wide(&records, &id_column, Some(permanent.as_str()), areas.as_ref());
            table.write(&output).context("Failed to write pivot")?;
            done("Wide table", &output, start.elapsed());
        }

        Commands::Trends {
            input,
            output,
            regions,
            id_field,
            display,
        } => {
            let records = read_records(&input)?;
            let start = Instant::now();
            let trends = estimate_trends(&records, &config.trends).context("Failed to fit trends")?;

            write_csv(&trends, &output).context("Failed to write trends")?;
            for (season, rows) in split_by_season(&trends) {
                let path = sibling(&output, &season);
                write_csv(&rows, &path).with_context(|| format!("Failed to write {}", path.display()))?;
            }
            let valid = trends.iter().filter(|t| t.is_valid()).count();
            println!("{} trends, {} with enough data", trends.len(), valid);

            if let Some(dir) = display {
                if regions.is_empty() {
                    anyhow::bail!("--display needs --regions for centroids");
                }
                let regions = read_regions(&regions, &id_field)?;
                let rows = display_rows(&trends, &region_centroids(&regions), &config.display)
                    .context("Failed to build display views")?;
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                write_csv(&rows, dir.join("display_all.csv")).context("Failed to write display view")?;
                for (season, season_rows) in display_by_season(&rows) {
                    let path = dir.join(format!("display_{season}.csv"));
                    write_csv(&season_rows, &path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                done("Display views", &dir, start.elapsed());
            }
            done("Trends", &output, start.elapsed());
        }
    }

    Ok(())
}
