//! Survey Grid Tiler API Server
//!
//! Accepts AOI uploads, tiles them into a buffered survey grid and serves
//! the resulting layers, KML tiles and archives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tiler_api::cleanup::{CleanupConfig, CleanupTask};
use tiler_api::state::AppState;
use tiling::{TilingConfig, WorkingCrs};

/// Survey Grid Tiler API Server
#[derive(Parser, Debug)]
#[command(name = "tiler-api")]
#[command(about = "HTTP service that tiles AOI uploads into survey grids")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "TILER_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Pipeline configuration file (YAML)
    #[arg(short, long, env = "TILER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving run directories (overrides the config file)
    #[arg(short, long, env = "TILER_OUTPUT_ROOT")]
    output_root: Option<PathBuf>,

    /// Working CRS, e.g. EPSG:32646 or "auto" (overrides the config file)
    #[arg(long, env = "TILER_WORKING_CRS")]
    working_crs: Option<WorkingCrs>,

    /// Prefix for links in responses
    #[arg(long, default_value = "", env = "TILER_BASE_URL")]
    base_url: String,

    /// Largest accepted upload, in megabytes
    #[arg(long, default_value_t = 32, env = "TILER_MAX_UPLOAD_MB")]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting survey grid tiler API");

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
    let retention_hours = config.retention_hours;

    info!(
        output_root = %config.output_root.display(),
        working_crs = %config.working_crs,
        "Pipeline configured"
    );

    let state = Arc::new(AppState::new(
        config,
        args.base_url,
        args.max_upload_mb * 1024 * 1024,
    ));

    // Start run retention task
    let cleanup = CleanupTask::new(state.clone(), CleanupConfig::from_env(retention_hours));
    tokio::spawn(cleanup.run_forever());

    let app = tiler_api::app(state, prometheus_handle);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", args.listen))?;

    info!("Tiler API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
