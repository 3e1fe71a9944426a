//! Generators for synthetic AOI geometry and documents.
//!
//! These produce predictable shapes whose areas and extents are easy to
//! verify by hand, in plain tuples so callers can build whatever geometry
//! type they need.

/// Closed, counter-clockwise ring for an axis-aligned rectangle.
///
/// # Example
///
/// ```
/// use test_utils::rect_ring;
///
/// let ring = rect_ring(0.0, 0.0, 2.0, 1.0);
/// assert_eq!(ring.len(), 5);
/// assert_eq!(ring.first(), ring.last());
/// ```
pub fn rect_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<(f64, f64)> {
    vec![
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ]
}

/// Closed ring for a square of side `size` anchored at its lower-left corner.
pub fn square_ring(min_x: f64, min_y: f64, size: f64) -> Vec<(f64, f64)> {
    rect_ring(min_x, min_y, min_x + size, min_y + size)
}

fn kml_coordinates(ring: &[(f64, f64)]) -> String {
    ring.iter()
        .map(|(x, y)| format!("{},{},0", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a KML document with one polygon Placemark per `(name, ring)` pair.
pub fn kml_document(placemarks: &[(&str, Vec<(f64, f64)>)]) -> String {
    let mut body = String::new();
    for (name, ring) in placemarks {
        body.push_str(&format!(
            "    <Placemark>\n      <name>{}</name>\n      <Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs></Polygon>\n    </Placemark>\n",
            name,
            kml_coordinates(ring)
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n  <Document>\n{}  </Document>\n</kml>\n",
        body
    )
}

/// Build a GeoJSON FeatureCollection of polygons with an `index` property.
///
/// When `crs` is given it is written as a legacy named `crs` member.
pub fn geojson_polygons(rings: &[Vec<(f64, f64)>], crs: Option<&str>) -> String {
    let features: Vec<String> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let coords = ring
                .iter()
                .map(|(x, y)| format!("[{},{}]", x, y))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{{\"type\":\"Feature\",\"properties\":{{\"index\":{}}},\"geometry\":{{\"type\":\"Polygon\",\"coordinates\":[[{}]]}}}}",
                i, coords
            )
        })
        .collect();

    let crs_member = crs
        .map(|name| {
            format!(
                "\"crs\":{{\"type\":\"name\",\"properties\":{{\"name\":\"{}\"}}}},",
                name
            )
        })
        .unwrap_or_default();

    format!(
        "{{\"type\":\"FeatureCollection\",{}\"features\":[{}]}}",
        crs_member,
        features.join(",")
    )
}
