//! Common AOI documents for tiling tests.
//!
//! Geographic fixtures sit inside UTM zone 46N (the default working CRS),
//! around Dhaka.

/// A ~2 km square AOI in lon/lat with ExtendedData attributes.
pub const DHAKA_AOI_KML: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Survey AOI</name>
    <Folder>
      <name>Boundaries</name>
      <Placemark>
        <name>Block A</name>
        <description>North survey block</description>
        <ExtendedData>
          <Data name="owner"><value>survey-team</value></Data>
          <SchemaData schemaUrl="#aoi">
            <SimpleData name="priority">1</SimpleData>
          </SchemaData>
        </ExtendedData>
        <Polygon>
          <outerBoundaryIs>
            <LinearRing>
              <coordinates>
                90.40,23.80,0 90.42,23.80,0 90.42,23.82,0 90.40,23.82,0 90.40,23.80,0
              </coordinates>
            </LinearRing>
          </outerBoundaryIs>
        </Polygon>
      </Placemark>
    </Folder>
  </Document>
</kml>
"##;

/// A Placemark mix: polygon with a hole, a MultiGeometry, a line and a point.
pub const MIXED_GEOMETRY_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Holed</name>
      <Polygon>
        <outerBoundaryIs><LinearRing><coordinates>90.0,23.0 90.1,23.0 90.1,23.1 90.0,23.1 90.0,23.0</coordinates></LinearRing></outerBoundaryIs>
        <innerBoundaryIs><LinearRing><coordinates>90.04,23.04 90.06,23.04 90.06,23.06 90.04,23.06 90.04,23.04</coordinates></LinearRing></innerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <name>Twin blocks</name>
      <MultiGeometry>
        <Polygon><outerBoundaryIs><LinearRing><coordinates>90.2,23.0 90.3,23.0 90.3,23.1 90.2,23.0</coordinates></LinearRing></outerBoundaryIs></Polygon>
        <Polygon><outerBoundaryIs><LinearRing><coordinates>90.4,23.0 90.5,23.0 90.5,23.1 90.4,23.0</coordinates></LinearRing></outerBoundaryIs></Polygon>
      </MultiGeometry>
    </Placemark>
    <Placemark>
      <name>Road</name>
      <LineString><coordinates>90.0,22.9 90.5,22.9</coordinates></LineString>
    </Placemark>
    <Placemark>
      <name>Launch point</name>
      <Point><coordinates>90.25,22.95,12</coordinates></Point>
    </Placemark>
  </Document>
</kml>
"#;

/// A polygon whose vertices are collinear in UTM zone 46N: valid, zero area.
pub const COLLINEAR_UTM_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "EPSG:32646" } },
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "Sliver" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[400000, 2600000], [400100, 2600100], [400250, 2600250], [400000, 2600000]]]
      }
    }
  ]
}"#;

/// A well-formed KML document without any Placemark.
pub const EMPTY_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document><name>Nothing here</name></Document>
</kml>
"#;

/// A 250 m square already in UTM zone 46N, with attributes.
pub const UTM_SQUARE_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32646" } },
  "features": [
    {
      "type": "Feature",
      "properties": { "block": "A", "priority": 2 },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[400000, 2600000], [400250, 2600000], [400250, 2600250], [400000, 2600250], [400000, 2600000]]]
      }
    }
  ]
}"#;
