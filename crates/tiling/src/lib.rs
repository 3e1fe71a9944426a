//! Survey grid tiling library.
//!
//! Turns an uploaded area of interest (KML or GeoJSON) into a regular
//! survey grid clipped to the AOI, buffers each clipped tile, and exports
//! the results.
//!
//! # Architecture
//!
//! Used by both the `grid-tiler` CLI and the `tiler-api` service. A run
//! goes through:
//!
//! - Extent resolution in the working CRS (UTM)
//! - Grid generation over the extent
//! - Overlay of the AOI with the grid
//! - Buffering of every clipped piece
//! - Export of GeoJSON layers, per-tile KML files and a zip archive

pub mod buffer;
pub mod config;
pub mod error;
pub mod export;
pub mod extent;
pub mod feature;
pub mod formats;
pub mod grid;
pub mod manifest;
pub mod overlay;
pub mod params;
pub mod pipeline;
pub mod store;

// Re-exports
pub use buffer::{buffer_collection, BufferParams};
pub use config::{TilingConfig, WorkingCrs};
pub use error::{Result, TilerError};
pub use export::{archive_file_name, tile_file_name, tile_stem, LayerFiles};
pub use extent::{resolve_extent, ResolvedExtent};
pub use feature::{Feature, FeatureCollection, Properties};
pub use formats::decode_upload;
pub use grid::{generate_grid, grid_collection, GridCell};
pub use manifest::RunManifest;
pub use overlay::overlay;
pub use params::TilingParams;
pub use pipeline::{Pipeline, RunResult, TiledLayers};
pub use store::{parse_run_id, ArtifactStore};
