//! Vector file codecs for AOI uploads and exported artifacts.

pub mod geojson;
pub mod kml;

use std::path::Path;

use tracing::debug;

use crate::error::{Result, TilerError};
use crate::feature::FeatureCollection;

pub use geojson::{from_geojson_slice, to_geojson_vec};
pub use kml::{from_kml_slice, to_kml_vec};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Kml,
    GeoJson,
}

impl InputFormat {
    /// Detect format from the file extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "kml" => Some(InputFormat::Kml),
            "geojson" | "json" => Some(InputFormat::GeoJson),
            _ => None,
        }
    }

    /// Guess the format from the first non-whitespace byte.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match body.iter().find(|b| !b.is_ascii_whitespace())? {
            b'<' => Some(InputFormat::Kml),
            b'{' => Some(InputFormat::GeoJson),
            _ => None,
        }
    }
}

/// Decode an uploaded AOI file.
///
/// The extension wins when it is recognized; otherwise the content is sniffed.
pub fn decode_upload(bytes: &[u8], file_name: &str) -> Result<FeatureCollection> {
    let format = InputFormat::from_file_name(file_name)
        .or_else(|| InputFormat::sniff(bytes))
        .ok_or_else(|| {
            TilerError::UnsupportedFormat(format!(
                "'{}' is neither KML nor GeoJSON",
                file_name
            ))
        })?;

    debug!(file_name = %file_name, format = ?format, bytes = bytes.len(), "Decoding upload");

    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match format {
        InputFormat::Kml => from_kml_slice(body),
        InputFormat::GeoJson => from_geojson_slice(body),
    }
}
