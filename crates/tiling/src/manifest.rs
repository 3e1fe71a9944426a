//! Run manifest, stored as `run.json` next to a run's artifacts.

use chrono::{DateTime, Utc};
use grid_common::{BoundingBox, CrsCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::TilingParams;

pub const MANIFEST_FILE: &str = "run.json";

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub params: TilingParams,
    pub working_crs: CrsCode,
    pub extent: BoundingBox,
    pub input_features: usize,
    pub intersect_features: usize,
    pub buffer_features: usize,
    /// Tile file names, index order.
    pub tiles: Vec<String>,
    pub archive: String,
    /// Layer file names: input, intersection, buffer.
    pub layers: Vec<String>,
}

impl RunManifest {
    /// Every file name a client may retrieve for this run.
    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        self.layers
            .iter()
            .chain(self.tiles.iter())
            .chain(std::iter::once(&self.archive))
            .map(String::as_str)
    }
}
