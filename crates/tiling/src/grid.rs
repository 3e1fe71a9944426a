//! Regular survey grid over an extent.
//!
//! Cells are laid out from the extent's lower-left corner. A column or row
//! is emitted while its origin is strictly below the far edge, so the last
//! cells may overshoot the extent; they are never truncated. Overlay with
//! the AOI removes the excess.

use geo::{coord, Polygon, Rect};
use grid_common::{BoundingBox, CrsCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TilerError};
use crate::feature::{Feature, FeatureCollection};

/// Upper bound on cells per run unless configured otherwise.
pub const DEFAULT_MAX_GRID_CELLS: usize = 250_000;

/// One rectangular cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Column index, counted from `min_x`.
    pub column: usize,
    /// Row index, counted from `min_y`.
    pub row: usize,
    pub bounds: BoundingBox,
}

impl GridCell {
    /// The cell as a closed counter-clockwise polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        Rect::new(
            coord! { x: self.bounds.min_x, y: self.bounds.min_y },
            coord! { x: self.bounds.max_x, y: self.bounds.max_y },
        )
        .to_polygon()
    }
}

fn check_step(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TilerError::invalid_parameter(
            name,
            format!("must be a positive number, got {}", value),
        ));
    }
    Ok(())
}

/// Origins `start + i * step` strictly below `end`.
///
/// Each origin is computed from its index rather than by accumulation so
/// that neighbouring cells share exactly the same edge coordinate.
fn origins(start: f64, end: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut i = 0usize;
    loop {
        let origin = start + i as f64 * step;
        if origin >= end {
            break;
        }
        out.push(origin);
        i += 1;
    }
    out
}

/// Tile `extent` into `width` x `height` cells.
///
/// Cells are ordered by column (x) first, then by row (y) within a column.
/// Fails with `InvalidParameter` for non-positive steps or when the grid
/// would exceed `max_cells`.
pub fn generate_grid(
    extent: &BoundingBox,
    width: f64,
    height: f64,
    max_cells: usize,
) -> Result<Vec<GridCell>> {
    check_step("tile_width", width)?;
    check_step("tile_height", height)?;

    let columns = (extent.width().max(0.0) / width).ceil();
    let rows = (extent.height().max(0.0) / height).ceil();
    let estimated = columns * rows;
    if !estimated.is_finite() || estimated > max_cells as f64 {
        return Err(TilerError::invalid_parameter(
            "tile_width",
            format!(
                "a {} x {} grid over {} needs about {} cells, the limit is {}",
                width, height, extent, estimated, max_cells
            ),
        ));
    }

    let xs = origins(extent.min_x, extent.max_x, width);
    let ys = origins(extent.min_y, extent.max_y, height);

    let mut cells = Vec::with_capacity(xs.len() * ys.len());
    for (column, &min_x) in xs.iter().enumerate() {
        let max_x = extent.min_x + (column + 1) as f64 * width;
        for (row, &min_y) in ys.iter().enumerate() {
            let max_y = extent.min_y + (row + 1) as f64 * height;
            cells.push(GridCell {
                column,
                row,
                bounds: BoundingBox::new(min_x, min_y, max_x, max_y),
            });
        }
    }

    debug!(
        columns = xs.len(),
        rows = ys.len(),
        cells = cells.len(),
        "Generated grid"
    );

    Ok(cells)
}

/// The grid as a feature collection in `crs`, one feature per cell.
///
/// Each feature carries its `column` and `row`.
pub fn grid_collection(cells: &[GridCell], crs: CrsCode) -> FeatureCollection {
    let features = cells
        .iter()
        .map(|cell| {
            Feature::new(cell.polygon())
                .with_property("column", Value::from(cell.column))
                .with_property("row", Value::from(cell.row))
        })
        .collect();
    FeatureCollection::with_features(Some(crs), features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_overshoot_lattice() {
        let extent = BoundingBox::new(0.0, 0.0, 250.0, 250.0);
        let cells = generate_grid(&extent, 100.0, 100.0, DEFAULT_MAX_GRID_CELLS).unwrap();
        assert_eq!(cells.len(), 9);

        let origins: Vec<(f64, f64)> = cells
            .iter()
            .map(|c| (c.bounds.min_x, c.bounds.min_y))
            .collect();
        assert_eq!(
            origins,
            vec![
                (0.0, 0.0),
                (0.0, 100.0),
                (0.0, 200.0),
                (100.0, 0.0),
                (100.0, 100.0),
                (100.0, 200.0),
                (200.0, 0.0),
                (200.0, 100.0),
                (200.0, 200.0),
            ]
        );
        assert_eq!(cells[8].bounds.max_x, 300.0);
        assert_eq!(cells[8].bounds.max_y, 300.0);
    }

    #[test]
    fn test_exact_fit_has_no_extra_column() {
        let extent = BoundingBox::new(0.0, 0.0, 200.0, 100.0);
        let cells = generate_grid(&extent, 100.0, 100.0, DEFAULT_MAX_GRID_CELLS).unwrap();
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_independent_steps() {
        let extent = BoundingBox::new(10.0, 20.0, 60.0, 50.0);
        let cells = generate_grid(&extent, 20.0, 10.0, DEFAULT_MAX_GRID_CELLS).unwrap();
        // 3 columns (10, 30, 50) x 3 rows (20, 30, 40)
        assert_eq!(cells.len(), 9);
        for cell in &cells {
            assert_eq!(cell.bounds.width(), 20.0);
            assert_eq!(cell.bounds.height(), 10.0);
            assert_eq!(cell.polygon().unsigned_area(), 200.0);
        }
    }

    #[test]
    fn test_degenerate_extent_yields_no_cells() {
        let extent = BoundingBox::new(5.0, 5.0, 5.0, 9.0);
        let cells = generate_grid(&extent, 1.0, 1.0, DEFAULT_MAX_GRID_CELLS).unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn test_invalid_steps_rejected() {
        let extent = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        for (w, h) in [(0.0, 1.0), (1.0, -1.0), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
            assert!(matches!(
                generate_grid(&extent, w, h, DEFAULT_MAX_GRID_CELLS),
                Err(TilerError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_cell_limit() {
        let extent = BoundingBox::new(0.0, 0.0, 1000.0, 1000.0);
        assert!(generate_grid(&extent, 1.0, 1.0, 1000).is_err());
        assert_eq!(generate_grid(&extent, 100.0, 100.0, 100).unwrap().len(), 100);
    }

    #[test]
    fn test_grid_collection_properties() {
        let extent = BoundingBox::new(0.0, 0.0, 150.0, 50.0);
        let cells = generate_grid(&extent, 100.0, 100.0, DEFAULT_MAX_GRID_CELLS).unwrap();
        let fc = grid_collection(&cells, CrsCode::UTM_46N);
        assert_eq!(fc.crs, Some(CrsCode::UTM_46N));
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[1].properties["column"], 1);
        assert_eq!(fc.features[1].properties["row"], 0);
    }
}
