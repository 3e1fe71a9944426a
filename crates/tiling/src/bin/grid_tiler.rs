//! Offline survey grid tiler.
//!
//! Runs the tiling pipeline over a local KML or GeoJSON file and prints the
//! run manifest as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tiling::{Pipeline, TilingConfig, TilingParams, WorkingCrs};

#[derive(Parser, Debug)]
#[command(name = "grid-tiler")]
#[command(about = "Tile an AOI into a buffered survey grid and export KML tiles")]
struct Args {
    /// AOI file (.kml, .geojson or .json)
    input: PathBuf,

    /// Tile width in working CRS units
    #[arg(long, default_value_t = tiling::params::DEFAULT_TILE_SIZE, env = "TILER_TILE_WIDTH")]
    tile_width: f64,

    /// Tile height in working CRS units
    #[arg(long, default_value_t = tiling::params::DEFAULT_TILE_SIZE, env = "TILER_TILE_HEIGHT")]
    tile_height: f64,

    /// Buffer distance in working CRS units
    #[arg(long, default_value_t = tiling::params::DEFAULT_BUFFER_DISTANCE, env = "TILER_BUFFER_DISTANCE")]
    buffer_distance: f64,

    /// Prefix for tile and archive file names
    #[arg(long, default_value = tiling::params::DEFAULT_PREFIX, env = "TILER_PREFIX")]
    prefix: String,

    /// Pipeline configuration file (YAML)
    #[arg(short, long, env = "TILER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving run directories (overrides the config file)
    #[arg(short, long, env = "TILER_OUTPUT_ROOT")]
    output_root: Option<PathBuf>,

    /// Working CRS, e.g. EPSG:32646 or "auto" (overrides the config file)
    #[arg(long, env = "TILER_WORKING_CRS")]
    working_crs: Option<WorkingCrs>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let mut config = match &args.config {
        Some(path) => TilingConfig::from_yaml_file(path)?,
        None => TilingConfig::default(),
    };
    if let Some(root) = args.output_root {
        config.output_root = root;
    }
    if let Some(crs) = args.working_crs {
        config.working_crs = crs;
    }

    let params = TilingParams {
        tile_width: args.tile_width,
        tile_height: args.tile_height,
        buffer_distance: args.buffer_distance,
        prefix: args.prefix,
    };

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read AOI file {:?}", args.input))?;
    let file_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    info!(input = %args.input.display(), working_crs = %config.working_crs, "Starting run");

    let pipeline = Pipeline::new(config);
    let result = pipeline
        .run_upload(&bytes, file_name, &params)
        .with_context(|| format!("Tiling {:?} failed", args.input))?;

    info!(
        run_id = %result.run_id(),
        run_dir = %result.run_dir.display(),
        "Artifacts written"
    );

    println!("{}", serde_json::to_string_pretty(&result.manifest)?);
    Ok(())
}
