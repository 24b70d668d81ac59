//! Render GPX/FIT tracks over OpenStreetMap tiles.
//!
//! Run with:
//!   cargo run --example render_tracks --features http -- ~/export/activities -z 13
//!
//! Month series (`--month 0` or `--month 3-9`) read the tracks of month `m`
//! from the `MM` subdirectory of every input directory and render all
//! months on one shared frame.

use std::path::{Path, PathBuf};

use activity_heatmap::tracks::track_files;
use activity_heatmap::{
    output_file_name, read_tracks, render_heatmap, Bounds, CachedTileProvider, ColorRamp,
    FileTileCache, HeatmapConfig, HttpTileProvider, MonthSelection,
};
use clap::Parser;
use log::{info, warn};

#[derive(clap::Parser)]
struct ClArgs {
    /// Track files or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Tile zoom level
    #[arg(short, long, default_value_t = 10)]
    zoom: u8,

    /// Gaussian kernel sigma in pixels
    #[arg(short, long, default_value_t = 1)]
    sigma: u32,

    /// Bounding box: lat_min lat_max lon_min lon_max
    #[arg(short, long, num_args = 4, allow_negative_numbers = true)]
    bounds: Option<Vec<f64>>,

    /// Frame every render by the bounding box instead of the data
    #[arg(short, long)]
    equal: bool,

    /// Color ramp (hot, jet, gray)
    #[arg(long, default_value = "hot")]
    ramp: ColorRamp,

    /// Year label used in the output file name
    #[arg(short, long, default_value = "all")]
    year: String,

    /// Month: all, 1-12, 0 for a series over the year, or a range like 3-9
    #[arg(short, long, default_value = "all")]
    month: MonthSelection,

    /// Output file name prefix
    #[arg(short, long, default_value = "heatmap")]
    output: String,

    /// Tile cache directory
    #[arg(long, default_value = "tiles")]
    tiles: PathBuf,

    /// Tile server base URL
    #[arg(long, default_value = activity_heatmap::config::DEFAULT_TILE_URL)]
    tile_url: String,
}

/// Expand directories into the track files they contain.
fn collect_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            match track_files(input) {
                Ok(found) => files.extend(found),
                Err(e) => warn!("[Main] Cannot list {}: {}", input.display(), e),
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn month_inputs(inputs: &[PathBuf], month: u32) -> Vec<PathBuf> {
    inputs
        .iter()
        .map(|dir| dir.join(format!("{:02}", month)))
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Render one month (or the whole selection) to `output`. Nothing is
/// written when no point falls inside the bounds.
fn render(
    label: &str,
    files: &[PathBuf],
    config: &HeatmapConfig,
    tiles: &CachedTileProvider<FileTileCache, HttpTileProvider>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let tracks = read_tracks(files);
    let inside = tracks.within(&config.bounds);
    info!(
        "[Main] {} of {} points inside bounds from {} activities",
        inside.points.len(),
        tracks.points.len(),
        tracks.activity_count
    );
    if inside.is_empty() {
        warn!("[Main] No activities in month {}, skipping", label);
        return Ok(());
    }

    let heatmap = render_heatmap(&inside.points, inside.activity_count, config, tiles)?;
    heatmap.save_png(output)?;
    println!(
        "{}: {}x{} px, {} points",
        output.display(),
        heatmap.width(),
        heatmap.height(),
        heatmap.point_count()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ClArgs::parse();

    let mut config = HeatmapConfig::default()
        .with_zoom(args.zoom)
        .with_sigma(args.sigma)
        .with_color_ramp(args.ramp)
        .with_tile_base_url(args.tile_url.clone())
        // A series shares one frame
        .with_equal_extent(args.equal || args.month.is_series());
    if let Some(b) = &args.bounds {
        config = config.with_bounds(Bounds::new(b[0], b[1], b[2], b[3]));
    }
    config.validate()?;

    let tiles = CachedTileProvider::new(
        FileTileCache::new(&args.tiles),
        HttpTileProvider::from_config(&config)?,
    );

    if args.month.is_series() {
        if args.month.is_empty() {
            warn!("[Main] Month range {} selects no month", args.month);
        }
        for month in args.month.months() {
            let dirs = month_inputs(&args.inputs, month);
            if dirs.is_empty() {
                warn!("[Main] No track directory for month {:02}, skipping", month);
                continue;
            }
            let output = PathBuf::from(output_file_name(&args.output, &args.year, month));
            render(&format!("{:02}", month), &collect_files(&dirs), &config, &tiles, &output)?;
        }
    } else {
        let output = PathBuf::from(output_file_name(&args.output, &args.year, args.month));
        render(&args.month.to_string(), &collect_files(&args.inputs), &config, &tiles, &output)?;
    }

    Ok(())
}
