//! Pipeline configuration.
//!
//! Settings are fixed per deployment and may come from a YAML file:
//!
//! ```yaml
//! working_crs: "EPSG:32646"   # or "auto"
//! quadrant_segments: 16
//! output_root: "${TILER_OUTPUT_ROOT:-./runs}"
//! max_grid_cells: 250000
//! retention_hours: 24
//! ```
//!
//! Supports environment variable substitution using ${VAR} and
//! ${VAR:-default} syntax.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use grid_common::CrsCode;
use projection::CrsTransform;
use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_QUADRANT_SEGMENTS;
use crate::error::TilerError;
use crate::extent::DEFAULT_INPUT_CRS;
use crate::feature::FeatureCollection;
use crate::grid::DEFAULT_MAX_GRID_CELLS;

// ============================================================================
// Working CRS
// ============================================================================

/// The projected CRS every run computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorkingCrs {
    /// Always the same CRS.
    Fixed(CrsCode),
    /// The UTM zone containing the centre of each AOI.
    Auto,
}

impl Default for WorkingCrs {
    fn default() -> Self {
        WorkingCrs::Fixed(CrsCode::UTM_46N)
    }
}

impl WorkingCrs {
    /// Pick the CRS for one input collection.
    pub fn resolve(&self, input: &FeatureCollection) -> crate::Result<CrsCode> {
        match self {
            WorkingCrs::Fixed(crs) => Ok(*crs),
            WorkingCrs::Auto => {
                let source = input.crs.unwrap_or(DEFAULT_INPUT_CRS);
                let bounds = input.bounds().ok_or_else(|| {
                    TilerError::EmptyInput("no feature has any coordinates".to_string())
                })?;
                let (x, y) = bounds.center();
                let (lon, lat) = CrsTransform::new(source, CrsCode::Epsg4326).transform(x, y)?;
                Ok(CrsCode::utm_for_lon_lat(lon, lat))
            }
        }
    }
}

impl FromStr for WorkingCrs {
    type Err = TilerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(WorkingCrs::Auto);
        }
        let crs = CrsCode::parse(s)?;
        if crs.is_geographic() {
            return Err(TilerError::InvalidCrs(format!(
                "working CRS must be projected, got {}",
                crs
            )));
        }
        Ok(WorkingCrs::Fixed(crs))
    }
}

impl TryFrom<String> for WorkingCrs {
    type Error = TilerError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkingCrs> for String {
    fn from(value: WorkingCrs) -> Self {
        value.to_string()
    }
}

impl fmt::Display for WorkingCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkingCrs::Fixed(crs) => write!(f, "{}", crs),
            WorkingCrs::Auto => write!(f, "auto"),
        }
    }
}

// ============================================================================
// Tiling Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// CRS used for extent, grid, overlay and buffer
    pub working_crs: WorkingCrs,
    /// Segments per quarter circle in buffer curves
    pub quadrant_segments: usize,
    /// Directory holding one subdirectory per run
    pub output_root: PathBuf,
    /// Largest grid a single run may generate
    pub max_grid_cells: usize,
    /// Runs older than this are purged by the service
    pub retention_hours: u64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            working_crs: WorkingCrs::default(),
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
            output_root: PathBuf::from("./runs"),
            max_grid_cells: DEFAULT_MAX_GRID_CELLS,
            retention_hours: 24,
        }
    }
}

impl TilingConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read tiling config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML configuration text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: TilingConfig = serde_yaml::from_str(&expanded)
            .with_context(|| "Failed to parse tiling config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.quadrant_segments > 0,
            "quadrant_segments must be greater than 0"
        );
        anyhow::ensure!(
            self.max_grid_cells > 0,
            "max_grid_cells must be greater than 0"
        );
        anyhow::ensure!(
            !self.output_root.as_os_str().is_empty(),
            "output_root cannot be empty"
        );
        Ok(())
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand ${VAR} and ${VAR:-default} references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
