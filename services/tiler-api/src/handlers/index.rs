//! Upload form.

use axum::response::Html;
use tiling::params::{DEFAULT_BUFFER_DISTANCE, DEFAULT_PREFIX, DEFAULT_TILE_SIZE};

/// GET / - HTML upload form
pub async fn index_handler() -> Html<String> {
    Html(render_form())
}

fn render_form() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Survey Grid Tiler</title>
</head>
<body>
  <h1>Survey Grid Tiler</h1>
  <form action="/runs" method="post" enctype="multipart/form-data">
    <p><label>AOI file (KML or GeoJSON) <input type="file" name="file" accept=".kml,.geojson,.json" required></label></p>
    <p><label>Tile width (m) <input type="number" name="tile_width" value="{size}" min="1" step="any"></label></p>
    <p><label>Tile height (m) <input type="number" name="tile_height" value="{size}" min="1" step="any"></label></p>
    <p><label>Buffer distance (m) <input type="number" name="buffer_distance" value="{buffer}" min="0" step="any"></label></p>
    <p><label>Prefix <input type="text" name="prefix" value="{prefix}"></label></p>
    <p><button type="submit">Generate grid</button></p>
  </form>
</body>
</html>
"#,
        size = DEFAULT_TILE_SIZE,
        buffer = DEFAULT_BUFFER_DISTANCE,
        prefix = DEFAULT_PREFIX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_defaults() {
        let html = render_form();
        assert!(html.contains(r#"name="tile_width" value="1000""#));
        assert!(html.contains(r#"name="buffer_distance" value="0""#));
        assert!(html.contains(r#"name="prefix" value="Drone_Grid""#));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
    }
}
