//! Per-run tiling parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TilerError};

pub const DEFAULT_TILE_SIZE: f64 = 1000.0;
pub const DEFAULT_BUFFER_DISTANCE: f64 = 0.0;
pub const DEFAULT_PREFIX: &str = "Drone_Grid";

/// Longest accepted prefix in bytes. Leaves room for `_polygon_{usize}.kml`
/// plus the staging suffix within a 255-byte file name.
pub const MAX_PREFIX_BYTES: usize = 200;

/// Tile size, buffer distance and naming prefix for one run.
///
/// Lengths are in the working CRS's linear unit (meters for UTM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingParams {
    pub tile_width: f64,
    pub tile_height: f64,
    pub buffer_distance: f64,
    pub prefix: String,
}

impl Default for TilingParams {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl TilingParams {
    /// Reject values that would make the grid or file names meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.tile_width.is_finite() || self.tile_width <= 0.0 {
            return Err(TilerError::invalid_parameter(
                "tile_width",
                format!("must be a positive number, got {}", self.tile_width),
            ));
        }
        if !self.tile_height.is_finite() || self.tile_height <= 0.0 {
            return Err(TilerError::invalid_parameter(
                "tile_height",
                format!("must be a positive number, got {}", self.tile_height),
            ));
        }
        if !self.buffer_distance.is_finite() || self.buffer_distance < 0.0 {
            return Err(TilerError::invalid_parameter(
                "buffer_distance",
                format!("must be a non-negative number, got {}", self.buffer_distance),
            ));
        }
        validate_prefix(&self.prefix)
    }
}

/// A prefix becomes part of file names, so it must be a safe path component.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(TilerError::invalid_parameter("prefix", "cannot be empty"));
    }
    if prefix.len() > MAX_PREFIX_BYTES {
        return Err(TilerError::invalid_parameter(
            "prefix",
            format!(
                "is {} bytes long, at most {} allowed",
                prefix.len(),
                MAX_PREFIX_BYTES
            ),
        ));
    }
    if prefix.contains(['/', '\\']) || prefix.contains("..") {
        return Err(TilerError::invalid_parameter(
            "prefix",
            format!("'{}' contains a path separator or '..'", prefix),
        ));
    }
    if prefix.chars().any(char::is_control) {
        return Err(TilerError::invalid_parameter(
            "prefix",
            "contains control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TilingParams::default();
        assert_eq!(params.tile_width, 1000.0);
        assert_eq!(params.tile_height, 1000.0);
        assert_eq!(params.buffer_distance, 0.0);
        assert_eq!(params.prefix, "Drone_Grid");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_sizes() {
        let cases = [
            TilingParams { tile_width: 0.0, ..Default::default() },
            TilingParams { tile_height: -5.0, ..Default::default() },
            TilingParams { tile_width: f64::NAN, ..Default::default() },
            TilingParams { buffer_distance: -0.1, ..Default::default() },
            TilingParams { buffer_distance: f64::INFINITY, ..Default::default() },
        ];
        for params in cases {
            assert!(matches!(
                params.validate(),
                Err(TilerError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_prefix_rules() {
        assert!(validate_prefix("Block A 2024").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("a/b").is_err());
        assert!(validate_prefix("a\\b").is_err());
        assert!(validate_prefix("..").is_err());
        assert!(validate_prefix("tab\there").is_err());
    }

    #[test]
    fn test_prefix_length_limit() {
        assert!(validate_prefix(&"x".repeat(MAX_PREFIX_BYTES)).is_ok());
        assert!(matches!(
            validate_prefix(&"x".repeat(MAX_PREFIX_BYTES + 1)),
            Err(TilerError::InvalidParameter { .. })
        ));
        // Multi-byte characters count by their encoded length
        assert!(validate_prefix(&"é".repeat(MAX_PREFIX_BYTES / 2 + 1)).is_err());

        let longest = format!(
            "{}_polygon_{}.kml.partial",
            "x".repeat(MAX_PREFIX_BYTES),
            usize::MAX
        );
        assert!(longest.len() <= 255);
    }
}
