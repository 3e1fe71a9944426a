//! End-to-end tiling run.
//!
//! Stages run strictly in sequence, each over the previous stage's output:
//! extent, grid, overlay, buffer, export. All artifacts of a run go into
//! its own directory in the [`ArtifactStore`].

use std::path::PathBuf;

use chrono::Utc;
use grid_common::{BoundingBox, CrsCode};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::buffer::{buffer_collection, BufferParams};
use crate::config::TilingConfig;
use crate::error::Result;
use crate::export::{
    archive_file_name, export_run, with_download_refs, write_atomic, LayerFiles, BUFFER_LAYER,
    INPUT_LAYER, INTERSECT_LAYER,
};
use crate::extent::resolve_extent;
use crate::feature::FeatureCollection;
use crate::formats::decode_upload;
use crate::grid::generate_grid;
use crate::manifest::{RunManifest, MANIFEST_FILE};
use crate::overlay::overlay;
use crate::params::TilingParams;
use crate::store::ArtifactStore;

/// The three layers of a run, all in the working CRS.
#[derive(Debug, Clone)]
pub struct TiledLayers {
    pub working_crs: CrsCode,
    pub extent: BoundingBox,
    pub input: FeatureCollection,
    pub intersect: FeatureCollection,
    /// Index-aligned with `intersect`, each feature tagged with its download reference.
    pub buffer: FeatureCollection,
}

/// What a completed run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub manifest: RunManifest,
    pub run_dir: PathBuf,
    pub layers: LayerFiles,
    pub tile_paths: Vec<PathBuf>,
    pub archive: PathBuf,
}

impl RunResult {
    pub fn run_id(&self) -> Uuid {
        self.manifest.run_id
    }
}

/// Tiling pipeline bound to a configuration and an artifact store.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: TilingConfig,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(config: TilingConfig) -> Self {
        let store = ArtifactStore::new(config.output_root.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &TilingConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Compute the input, intersection and buffer layers without writing anything.
    pub fn process(&self, input: &FeatureCollection, params: &TilingParams) -> Result<TiledLayers> {
        params.validate()?;

        let working_crs = self.config.working_crs.resolve(input)?;
        let resolved = resolve_extent(input, working_crs)?;

        let cells = generate_grid(
            &resolved.extent,
            params.tile_width,
            params.tile_height,
            self.config.max_grid_cells,
        )?;

        let intersect = overlay(&resolved.collection, &cells)?;
        if intersect.is_empty() {
            warn!(cells = cells.len(), "AOI has no area inside the grid");
        }

        let buffer_params = BufferParams {
            distance: params.buffer_distance,
            quadrant_segments: self.config.quadrant_segments,
        };
        let buffered = buffer_collection(&intersect, &buffer_params)?;
        let buffer = with_download_refs(&buffered, &params.prefix);

        info!(
            working_crs = %working_crs,
            cells = cells.len(),
            intersect = intersect.len(),
            buffer = buffer.len(),
            "Processed AOI"
        );

        Ok(TiledLayers {
            working_crs,
            extent: resolved.extent,
            input: resolved.collection,
            intersect,
            buffer,
        })
    }

    /// Process `input` and export every artifact into a fresh run directory.
    ///
    /// If anything fails after the directory is allocated, the directory is
    /// removed so no partial run can be retrieved.
    #[instrument(skip_all, fields(prefix = %params.prefix))]
    pub fn run(&self, input: &FeatureCollection, params: &TilingParams) -> Result<RunResult> {
        let started = std::time::Instant::now();
        let layers = self.process(input, params)?;

        let (run_id, run_dir) = self.store.create_run()?;
        match self.export(run_id, &run_dir, params, &layers) {
            Ok(result) => {
                info!(
                    run_id = %run_id,
                    tiles = result.manifest.tiles.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Run failed, discarding artifacts");
                if let Err(cleanup) = self.store.discard(&run_id) {
                    warn!(run_id = %run_id, error = %cleanup, "Failed to discard run directory");
                }
                Err(e)
            }
        }
    }

    /// Decode an uploaded file and run it.
    pub fn run_upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        params: &TilingParams,
    ) -> Result<RunResult> {
        let input = decode_upload(bytes, file_name)?;
        self.run(&input, params)
    }

    fn export(
        &self,
        run_id: Uuid,
        run_dir: &std::path::Path,
        params: &TilingParams,
        layers: &TiledLayers,
    ) -> Result<RunResult> {
        let exported = export_run(
            run_dir,
            &params.prefix,
            &layers.input,
            &layers.intersect,
            &layers.buffer,
        )?;

        let manifest = RunManifest {
            run_id,
            created_at: Utc::now(),
            params: params.clone(),
            working_crs: layers.working_crs,
            extent: layers.extent,
            input_features: layers.input.len(),
            intersect_features: layers.intersect.len(),
            buffer_features: layers.buffer.len(),
            tiles: exported.tiles.clone(),
            archive: archive_file_name(&params.prefix),
            layers: vec![
                INPUT_LAYER.to_string(),
                INTERSECT_LAYER.to_string(),
                BUFFER_LAYER.to_string(),
            ],
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(run_dir, MANIFEST_FILE, &manifest_bytes)?;

        Ok(RunResult {
            tile_paths: exported.tiles.iter().map(|t| run_dir.join(t)).collect(),
            manifest,
            run_dir: run_dir.to_path_buf(),
            layers: exported.layers,
            archive: exported.archive,
        })
    }
}
