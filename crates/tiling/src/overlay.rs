//! Overlay of the AOI with the survey grid.

use geo::{Area, BooleanOps, MultiPolygon};
use tracing::{debug, warn};

use crate::error::{Result, TilerError};
use crate::feature::{polygonal_geometry, Feature, FeatureCollection};
use crate::grid::GridCell;

/// Clip every AOI feature against every grid cell.
///
/// Output order is input feature order, then cell order within a feature.
/// Each output feature carries a copy of its input feature's attributes.
/// Pieces with no area (cells that only touch the AOI along an edge or at
/// a corner) are omitted. Features without polygonal geometry are skipped.
pub fn overlay(input: &FeatureCollection, cells: &[GridCell]) -> Result<FeatureCollection> {
    let crs = input.crs.ok_or_else(|| {
        TilerError::InvalidCrs("overlay input has no CRS".to_string())
    })?;

    let mut features = Vec::new();
    for (index, feature) in input.iter().enumerate() {
        let Some(aoi) = feature.polygons() else {
            warn!(
                feature = index,
                "Skipping feature without polygonal geometry in overlay"
            );
            continue;
        };
        let Some(aoi_bounds) = feature.bounds() else {
            continue;
        };

        let before = features.len();
        for cell in cells.iter().filter(|c| c.bounds.intersects(&aoi_bounds)) {
            let cell_polygon = MultiPolygon::new(vec![cell.polygon()]);
            let clipped = aoi.intersection(&cell_polygon);
            let clipped = drop_empty(clipped);
            if clipped.0.is_empty() {
                continue;
            }
            features.push(
                Feature::new(polygonal_geometry(clipped))
                    .with_properties(feature.properties.clone()),
            );
        }

        debug!(
            feature = index,
            pieces = features.len() - before,
            "Clipped feature against grid"
        );
    }

    Ok(FeatureCollection::with_features(Some(crs), features))
}

/// Remove polygons with no area left behind by clipping.
fn drop_empty(multi: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(
        multi
            .into_iter()
            .filter(|p| p.unsigned_area() > 0.0)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{generate_grid, DEFAULT_MAX_GRID_CELLS};
    use geo::{line_string, polygon, Geometry, Polygon};
    use grid_common::{BoundingBox, CrsCode};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    fn area(geometry: &Geometry<f64>) -> f64 {
        geometry.unsigned_area()
    }

    #[test]
    fn test_aoi_inside_single_cell() {
        let aoi = square(20.0, 20.0, 50.0);
        let input = FeatureCollection::with_features(
            Some(CrsCode::UTM_46N),
            vec![Feature::new(aoi.clone()).with_property("name", "inner")],
        );
        let cells = generate_grid(
            &BoundingBox::new(0.0, 0.0, 250.0, 250.0),
            100.0,
            100.0,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();

        let result = overlay(&input, &cells).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.features[0].properties["name"], "inner");
        assert!((area(&result.features[0].geometry) - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_pieces_cover_aoi_in_cell_order() {
        let aoi = square(0.0, 0.0, 250.0);
        let input =
            FeatureCollection::with_features(Some(CrsCode::UTM_46N), vec![Feature::new(aoi)]);
        let cells = generate_grid(
            &BoundingBox::new(0.0, 0.0, 250.0, 250.0),
            100.0,
            100.0,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();

        let result = overlay(&input, &cells).unwrap();
        assert_eq!(result.len(), 9);

        let total: f64 = result.iter().map(|f| area(&f.geometry)).sum();
        assert!((total - 62_500.0).abs() < 1e-6);

        // last column, middle row: 50 x 100
        assert!((area(&result.features[7].geometry) - 5_000.0).abs() < 1e-9);
        // corner cell: 50 x 50
        assert!((area(&result.features[8].geometry) - 2_500.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_contact_omitted() {
        // AOI exactly fills the first cell; its neighbours only touch it
        let aoi = square(0.0, 0.0, 100.0);
        let input =
            FeatureCollection::with_features(Some(CrsCode::UTM_46N), vec![Feature::new(aoi)]);
        let cells = generate_grid(
            &BoundingBox::new(0.0, 0.0, 200.0, 200.0),
            100.0,
            100.0,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();

        let result = overlay(&input, &cells).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_lines_skipped() {
        let input = FeatureCollection::with_features(
            Some(CrsCode::UTM_46N),
            vec![
                Feature::new(line_string![(x: 0.0, y: 0.0), (x: 50.0, y: 50.0)]),
                Feature::new(square(10.0, 10.0, 10.0)),
            ],
        );
        let cells = generate_grid(
            &BoundingBox::new(0.0, 0.0, 50.0, 50.0),
            100.0,
            100.0,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();

        let result = overlay(&input, &cells).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_multiple_features_keep_input_order() {
        let input = FeatureCollection::with_features(
            Some(CrsCode::UTM_46N),
            vec![
                Feature::new(square(150.0, 0.0, 50.0)).with_property("id", 1),
                Feature::new(square(0.0, 0.0, 50.0)).with_property("id", 2),
            ],
        );
        let cells = generate_grid(
            &BoundingBox::new(0.0, 0.0, 200.0, 50.0),
            100.0,
            100.0,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();

        let result = overlay(&input, &cells).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.features[0].properties["id"], 1);
        assert_eq!(result.features[1].properties["id"], 2);
    }
}
