//! Error types for the survey grid pipeline and services.

use thiserror::Error;

use crate::crs::CrsParseError;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Primary error type for tiling runs and artifact access.
#[derive(Debug, Error)]
pub enum TilerError {
    // === Input Errors ===
    #[error("Input file loaded but contains no usable geometry: {0}")]
    EmptyInput(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode input: {0}")]
    Decode(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    // === Processing Errors ===
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    // === Output Errors ===
    #[error("Failed to write {artifact}: {message}")]
    Serialization { artifact: String, message: String },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    // === Infrastructure Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TilerError {
    /// Shorthand for an [`TilerError::InvalidParameter`].
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        TilerError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`TilerError::Serialization`] failure on a named artifact.
    pub fn serialization(artifact: impl Into<String>, message: impl ToString) -> Self {
        TilerError::Serialization {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }

    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            TilerError::EmptyInput(_) => "EmptyInput",
            TilerError::InvalidParameter { .. } | TilerError::MissingParameter(_) => {
                "InvalidParameter"
            }
            TilerError::UnsupportedFormat(_) | TilerError::Decode(_) => "InvalidInput",
            TilerError::InvalidCrs(_) => "InvalidCrs",
            TilerError::Projection(_) | TilerError::Geometry(_) => "ProcessingFailed",
            TilerError::Serialization { .. } => "SerializationFailed",
            TilerError::ArtifactNotFound(_) => "NotFound",
            TilerError::Storage(_) | TilerError::Internal(_) => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TilerError::EmptyInput(_)
            | TilerError::InvalidParameter { .. }
            | TilerError::MissingParameter(_)
            | TilerError::UnsupportedFormat(_)
            | TilerError::Decode(_)
            | TilerError::InvalidCrs(_) => 400,

            TilerError::Projection(_) | TilerError::Geometry(_) => 422,

            TilerError::ArtifactNotFound(_) => 404,

            _ => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for TilerError {
    fn from(err: std::io::Error) -> Self {
        TilerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TilerError {
    fn from(err: serde_json::Error) -> Self {
        TilerError::Internal(format!("JSON error: {}", err))
    }
}

impl From<CrsParseError> for TilerError {
    fn from(err: CrsParseError) -> Self {
        TilerError::InvalidCrs(err.to_string())
    }
}
