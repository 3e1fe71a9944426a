//! Extent resolution: put the AOI in the working CRS and measure it.

use grid_common::{BoundingBox, CrsCode};
use tracing::{debug, info};

use crate::error::{Result, TilerError};
use crate::feature::FeatureCollection;

/// CRS assumed for input that does not declare one.
pub const DEFAULT_INPUT_CRS: CrsCode = CrsCode::Epsg4326;

/// The AOI in the working CRS together with its bounding box.
#[derive(Debug, Clone)]
pub struct ResolvedExtent {
    pub collection: FeatureCollection,
    pub extent: BoundingBox,
}

/// Reproject `input` into `working_crs` and compute its extent.
///
/// A collection without a CRS is taken to be geographic lon/lat.
pub fn resolve_extent(input: &FeatureCollection, working_crs: CrsCode) -> Result<ResolvedExtent> {
    if input.is_empty() {
        return Err(TilerError::EmptyInput(
            "the file contains no features".to_string(),
        ));
    }

    let source = input.crs.unwrap_or_else(|| {
        debug!(crs = %DEFAULT_INPUT_CRS, "Input has no CRS, assuming geographic");
        DEFAULT_INPUT_CRS
    });

    let assigned = FeatureCollection::with_features(Some(source), input.features.clone());
    let collection = assigned.reproject(working_crs)?;

    let extent = collection.bounds().ok_or_else(|| {
        TilerError::EmptyInput("no feature has any coordinates".to_string())
    })?;

    info!(
        source_crs = %source,
        working_crs = %working_crs,
        features = collection.len(),
        extent = %extent,
        "Resolved AOI extent"
    );

    Ok(ResolvedExtent { collection, extent })
}
