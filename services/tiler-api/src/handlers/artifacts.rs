//! Artifact download handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use tiling::parse_run_id;

use super::{blocking, ApiError};
use crate::metrics::record_download;
use crate::state::AppState;

/// Content type and metric label for an artifact name.
pub fn content_type_for(name: &str) -> (&'static str, &'static str) {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "kml" => ("application/vnd.google-earth.kml+xml", "kml"),
        "zip" => ("application/zip", "zip"),
        "geojson" => ("application/geo+json", "geojson"),
        "json" => ("application/json", "json"),
        _ => ("application/octet-stream", "other"),
    }
}

/// GET /runs/:run_id/files/:name - Download one artifact
pub async fn artifact_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((run_id, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let run_id = parse_run_id(&run_id)?;

    let worker = state.clone();
    let file = name.clone();
    let bytes = blocking(move || worker.store().open(&run_id, &file)).await?;

    let (content_type, kind) = content_type_for(&name);
    record_download(kind);

    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "_"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(
            content_type_for("Drone_Grid_polygon_0.kml").0,
            "application/vnd.google-earth.kml+xml"
        );
        assert_eq!(content_type_for("Drone_Grid_Grids_KML.zip").0, "application/zip");
        assert_eq!(content_type_for("Grid_Buffer.geojson").0, "application/geo+json");
        assert_eq!(content_type_for("run.json").0, "application/json");
        assert_eq!(content_type_for("README").1, "other");
    }
}
