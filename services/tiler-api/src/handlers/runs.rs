//! Run submission and run summary handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Multipart, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use tiling::params::{DEFAULT_BUFFER_DISTANCE, DEFAULT_PREFIX, DEFAULT_TILE_SIZE};
use tiling::{parse_run_id, RunManifest, RunResult, TilerError, TilingParams};

use super::{blocking, ApiError};
use crate::metrics::{record_run_failure, record_run_success};
use crate::state::AppState;

// ============================================================================
// Form parsing
// ============================================================================

/// Fields of a `POST /runs` multipart body.
#[derive(Debug, Default)]
pub struct RunForm {
    pub file_name: Option<String>,
    pub file: Option<Bytes>,
    pub tile_width: Option<f64>,
    pub tile_height: Option<f64>,
    /// Square tile size, used for whichever of width/height is unset.
    pub grid_size: Option<f64>,
    pub buffer_distance: Option<f64>,
    pub prefix: Option<String>,
}

impl RunForm {
    /// Read every field of the multipart body. Unknown fields are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, TilerError> {
        let mut form = RunForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| TilerError::Decode(format!("multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" | "kml_file" => {
                    form.file_name = field.file_name().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| TilerError::Decode(format!("upload: {}", e)))?;
                    form.file = Some(data);
                }
                "tile_width" | "tile_height" | "grid_size" | "buffer_distance" | "buffer_size" => {
                    let text = field_text(field, &name).await?;
                    let value = parse_number(&name, &text)?;
                    match name.as_str() {
                        "tile_width" => form.tile_width = value,
                        "tile_height" => form.tile_height = value,
                        "grid_size" => form.grid_size = value,
                        _ => form.buffer_distance = value,
                    }
                }
                "prefix" | "grid_prefix" => {
                    let text = field_text(field, &name).await?;
                    let text = text.trim();
                    if !text.is_empty() {
                        form.prefix = Some(text.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Split into the uploaded file and validated parameters.
    pub fn into_parts(self) -> Result<(String, Bytes, TilingParams), TilerError> {
        let file = self
            .file
            .ok_or_else(|| TilerError::MissingParameter("file".to_string()))?;
        let params = TilingParams {
            tile_width: self.tile_width.or(self.grid_size).unwrap_or(DEFAULT_TILE_SIZE),
            tile_height: self.tile_height.or(self.grid_size).unwrap_or(DEFAULT_TILE_SIZE),
            buffer_distance: self.buffer_distance.unwrap_or(DEFAULT_BUFFER_DISTANCE),
            prefix: self.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        };
        params.validate()?;
        Ok((self.file_name.unwrap_or_default(), file, params))
    }
}

async fn field_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, TilerError> {
    field
        .text()
        .await
        .map_err(|e| TilerError::invalid_parameter(name, e.to_string()))
}

/// Empty input means "use the default".
fn parse_number(name: &str, text: &str) -> Result<Option<f64>, TilerError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| TilerError::invalid_parameter(name, format!("'{}' is not a number", text)))
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ArtifactLink {
    pub name: String,
    pub url: String,
}

/// Body of a successful `POST /runs`.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: Uuid,
    pub url: String,
    pub tiles: Vec<ArtifactLink>,
    pub archive: ArtifactLink,
    pub layers: Vec<ArtifactLink>,
    pub manifest: RunManifest,
}

impl RunResponse {
    fn new(state: &AppState, manifest: RunManifest) -> Self {
        let run_id = manifest.run_id;
        let link = |name: &String| ArtifactLink {
            name: name.clone(),
            url: state.file_url(&run_id, name),
        };
        Self {
            run_id,
            url: state.run_url(&run_id),
            tiles: manifest.tiles.iter().map(link).collect(),
            archive: link(&manifest.archive),
            layers: manifest.layers.iter().map(link).collect(),
            manifest,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /runs - Tile an uploaded AOI
#[instrument(skip_all)]
pub async fn create_run_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let started = Instant::now();

    let result = match submit(&state, multipart).await {
        Ok(result) => result,
        Err(ApiError(e)) => {
            record_run_failure(e.code());
            return Err(ApiError(e));
        }
    };

    record_run_success(
        result.manifest.tiles.len(),
        started.elapsed().as_secs_f64() * 1000.0,
    );

    let body = RunResponse::new(&state, result.manifest);
    let location = body.url.clone();
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response())
}

async fn submit(state: &Arc<AppState>, multipart: Multipart) -> Result<RunResult, ApiError> {
    let form = RunForm::from_multipart(multipart).await?;
    let (file_name, file, params) = form.into_parts()?;

    info!(
        file_name = %file_name,
        bytes = file.len(),
        tile_width = params.tile_width,
        tile_height = params.tile_height,
        buffer_distance = params.buffer_distance,
        prefix = %params.prefix,
        "Received run request"
    );

    let worker = state.clone();
    blocking(move || worker.pipeline.run_upload(&file, &file_name, &params)).await
}

/// GET /runs/:run_id - Run manifest
pub async fn get_run_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunManifest>, ApiError> {
    let run_id = parse_run_id(&run_id)?;
    let worker = state.clone();
    let manifest = blocking(move || worker.store().manifest(&run_id)).await?;
    Ok(Json(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("grid_size", " 500 ").unwrap(), Some(500.0));
        assert_eq!(parse_number("grid_size", "").unwrap(), None);
        let err = parse_number("grid_size", "abc").unwrap_err();
        assert!(matches!(err, TilerError::InvalidParameter { .. }));
    }

    #[test]
    fn test_grid_size_fills_both_dimensions() {
        let form = RunForm {
            file: Some(Bytes::from_static(b"<kml/>")),
            grid_size: Some(250.0),
            tile_height: Some(400.0),
            ..RunForm::default()
        };
        let (_, _, params) = form.into_parts().unwrap();
        assert_eq!(params.tile_width, 250.0);
        assert_eq!(params.tile_height, 400.0);
        assert_eq!(params.buffer_distance, 0.0);
        assert_eq!(params.prefix, "Drone_Grid");
    }

    #[test]
    fn test_missing_file() {
        let err = RunForm::default().into_parts().unwrap_err();
        assert!(matches!(err, TilerError::MissingParameter(_)));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let form = RunForm {
            file: Some(Bytes::from_static(b"{}")),
            buffer_distance: Some(-5.0),
            ..RunForm::default()
        };
        assert!(matches!(
            form.into_parts().unwrap_err(),
            TilerError::InvalidParameter { .. }
        ));
    }
}
