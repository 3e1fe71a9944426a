//! Artifact export: layer files, per-tile KML files and the tile archive.
//!
//! Tile identity is positional. Buffer feature `i` becomes
//! `{prefix}_polygon_{i}.kml`, so the naming depends on the buffer
//! collection staying index-aligned with the intersection collection.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use grid_common::CrsCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Result, TilerError};
use crate::feature::{Feature, FeatureCollection};
use crate::formats::{to_geojson_vec, to_kml_vec};

/// Layer file holding the reprojected AOI.
pub const INPUT_LAYER: &str = "Input_File.geojson";
/// Layer file holding the AOI clipped to the grid.
pub const INTERSECT_LAYER: &str = "Grid_Intersect.geojson";
/// Layer file holding the buffered tiles.
pub const BUFFER_LAYER: &str = "Grid_Buffer.geojson";

/// Property on buffer features naming their tile file (without extension).
pub const DOWNLOAD_REF: &str = "download_ref";

const TILE_EXTENSION: &str = "kml";
const STAGING_SUFFIX: &str = ".partial";

/// `{prefix}_polygon_{index}`
pub fn tile_stem(prefix: &str, index: usize) -> String {
    format!("{}_polygon_{}", prefix, index)
}

/// `{prefix}_polygon_{index}.kml`
pub fn tile_file_name(prefix: &str, index: usize) -> String {
    format!("{}.{}", tile_stem(prefix, index), TILE_EXTENSION)
}

/// `{prefix}_Grids_KML.zip`
pub fn archive_file_name(prefix: &str) -> String {
    format!("{}_Grids_KML.zip", prefix)
}

/// Paths of the three layer files of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFiles {
    pub input: PathBuf,
    pub intersect: PathBuf,
    pub buffer: PathBuf,
}

/// Everything the exporter wrote into a run directory.
#[derive(Debug, Clone)]
pub struct ExportedArtifacts {
    pub layers: LayerFiles,
    /// Tile file names in index order.
    pub tiles: Vec<String>,
    pub archive: PathBuf,
}

/// Copy of `buffer` where feature `i` carries `download_ref = {prefix}_polygon_{i}`.
pub fn with_download_refs(buffer: &FeatureCollection, prefix: &str) -> FeatureCollection {
    let features = buffer
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            feature
                .clone()
                .with_property(DOWNLOAD_REF, Value::String(tile_stem(prefix, index)))
        })
        .collect();
    FeatureCollection::with_features(buffer.crs, features)
}

/// Write `bytes` to `dir/name` through a staging file and a rename.
///
/// Readers never observe a partially written file under `name`.
pub fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(name);
    let staging = dir.join(format!("{}{}", name, STAGING_SUFFIX));

    let write = || -> std::io::Result<()> {
        let mut file = File::create(&staging)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&staging, &target)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&staging);
        TilerError::serialization(name, e)
    })?;
    Ok(target)
}

fn write_layer(dir: &Path, name: &str, collection: &FeatureCollection) -> Result<PathBuf> {
    let layer_name = name.trim_end_matches(".geojson");
    let bytes = to_geojson_vec(collection, Some(layer_name))
        .map_err(|e| TilerError::serialization(name, e))?;
    let path = write_atomic(dir, name, &bytes)?;
    debug!(layer = name, features = collection.len(), "Wrote layer");
    Ok(path)
}

/// Write the input, intersection and buffer layers as GeoJSON.
pub fn write_layers(
    dir: &Path,
    input: &FeatureCollection,
    intersect: &FeatureCollection,
    buffer: &FeatureCollection,
) -> Result<LayerFiles> {
    Ok(LayerFiles {
        input: write_layer(dir, INPUT_LAYER, input)?,
        intersect: write_layer(dir, INTERSECT_LAYER, intersect)?,
        buffer: write_layer(dir, BUFFER_LAYER, buffer)?,
    })
}

/// Write one single-Placemark KML file per buffer feature.
///
/// Geometries are reprojected to EPSG:4326. Returns the file names in
/// index order.
pub fn write_tiles(dir: &Path, buffer: &FeatureCollection, prefix: &str) -> Result<Vec<String>> {
    let crs = buffer.crs.ok_or_else(|| {
        TilerError::InvalidCrs("buffer collection has no CRS".to_string())
    })?;

    let mut names = Vec::with_capacity(buffer.len());
    for (index, feature) in buffer.iter().enumerate() {
        let stem = tile_stem(prefix, index);
        let file_name = tile_file_name(prefix, index);

        let single = FeatureCollection::with_features(
            Some(crs),
            vec![Feature::new(feature.geometry.clone())],
        );
        let geographic = single.reproject(CrsCode::Epsg4326)?;
        let bytes = to_kml_vec(&geographic, &stem)
            .map_err(|e| TilerError::serialization(&file_name, e))?;

        write_atomic(dir, &file_name, &bytes)?;
        names.push(file_name);
    }
    Ok(names)
}

/// Package `files` (names relative to `dir`) into a flat zip archive.
///
/// Entries use deflate compression and the default fixed timestamp, so
/// the same tiles always produce the same archive bytes.
pub fn write_archive(dir: &Path, archive_name: &str, files: &[String]) -> Result<PathBuf> {
    let build = || -> zip::result::ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        for name in files {
            let bytes = fs::read(dir.join(name))?;
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&bytes)?;
        }
        Ok(writer.finish()?.into_inner())
    };

    let bytes = build().map_err(|e| TilerError::serialization(archive_name, e))?;
    write_atomic(dir, archive_name, &bytes)
}

/// Export all artifacts of a run into `dir`.
///
/// `buffer` must already carry its download references.
pub fn export_run(
    dir: &Path,
    prefix: &str,
    input: &FeatureCollection,
    intersect: &FeatureCollection,
    buffer: &FeatureCollection,
) -> Result<ExportedArtifacts> {
    let layers = write_layers(dir, input, intersect, buffer)?;
    let tiles = write_tiles(dir, buffer, prefix)?;
    let archive = write_archive(dir, &archive_file_name(prefix), &tiles)?;

    info!(
        dir = %dir.display(),
        tiles = tiles.len(),
        archive = %archive.display(),
        "Exported run artifacts"
    );

    Ok(ExportedArtifacts {
        layers,
        tiles,
        archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use std::io::Read;
    use test_utils::scratch_dir;

    fn utm_buffer() -> FeatureCollection {
        let tiles = (0..3)
            .map(|i| {
                let x = 400_000.0 + i as f64 * 100.0;
                Feature::new(polygon![
                    (x: x, y: 2_600_000.0),
                    (x: x + 100.0, y: 2_600_000.0),
                    (x: x + 100.0, y: 2_600_100.0),
                    (x: x, y: 2_600_100.0),
                ])
            })
            .collect();
        FeatureCollection::with_features(Some(CrsCode::UTM_46N), tiles)
    }

    #[test]
    fn test_naming() {
        assert_eq!(tile_stem("Drone_Grid", 0), "Drone_Grid_polygon_0");
        assert_eq!(tile_file_name("P", 12), "P_polygon_12.kml");
        assert_eq!(archive_file_name("Drone_Grid"), "Drone_Grid_Grids_KML.zip");
    }

    #[test]
    fn test_download_refs_follow_index() {
        let tagged = with_download_refs(&utm_buffer(), "P");
        let refs: Vec<&str> = tagged
            .iter()
            .map(|f| f.properties[DOWNLOAD_REF].as_str().unwrap())
            .collect();
        assert_eq!(refs, vec!["P_polygon_0", "P_polygon_1", "P_polygon_2"]);
    }

    #[test]
    fn test_write_atomic_leaves_no_staging_file() {
        let dir = scratch_dir();
        let path = write_atomic(dir.path(), "a.txt", b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(!dir.path().join("a.txt.partial").exists());
    }

    #[test]
    fn test_write_atomic_missing_dir_is_serialization_error() {
        let dir = scratch_dir();
        let missing = dir.path().join("gone");
        assert!(matches!(
            write_atomic(&missing, "a.txt", b"x"),
            Err(TilerError::Serialization { .. })
        ));
    }

    #[test]
    fn test_tiles_are_geographic_kml() {
        let dir = scratch_dir();
        let names = write_tiles(dir.path(), &utm_buffer(), "T").unwrap();
        assert_eq!(names, vec!["T_polygon_0.kml", "T_polygon_1.kml", "T_polygon_2.kml"]);

        let text = fs::read_to_string(dir.path().join(&names[1])).unwrap();
        assert!(text.contains("<name>T_polygon_1</name>"));
        let fc = crate::formats::from_kml_slice(text.as_bytes()).unwrap();
        let bounds = fc.bounds().unwrap();
        // 400 km easting in zone 46N sits west of the 93E central meridian
        assert!(bounds.min_x > 91.0 && bounds.max_x < 93.0);
        assert!(bounds.min_y > 23.0 && bounds.max_y < 24.0);
    }

    #[test]
    fn test_archive_contents_and_determinism() {
        let dir = scratch_dir();
        let names = write_tiles(dir.path(), &utm_buffer(), "Z").unwrap();
        let first = write_archive(dir.path(), "Z_Grids_KML.zip", &names).unwrap();
        let first_bytes = fs::read(&first).unwrap();
        let again = write_archive(dir.path(), "Z_Grids_KML.zip", &names).unwrap();
        assert_eq!(fs::read(&again).unwrap(), first_bytes);

        let mut archive = zip::ZipArchive::new(File::open(&first).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
        for (i, name) in names.iter().enumerate() {
            let mut entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), name);
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            assert_eq!(body, fs::read_to_string(dir.path().join(name)).unwrap());
        }
    }

    #[test]
    fn test_export_run_layout() {
        let dir = scratch_dir();
        let buffer = with_download_refs(&utm_buffer(), "Run");
        let exported = export_run(dir.path(), "Run", &buffer, &buffer, &buffer).unwrap();

        assert_eq!(exported.layers.input, dir.path().join(INPUT_LAYER));
        assert!(exported.layers.intersect.exists());
        assert!(exported.layers.buffer.exists());
        assert_eq!(exported.tiles.len(), 3);
        assert_eq!(exported.archive, dir.path().join("Run_Grids_KML.zip"));

        let layer = fs::read(&exported.layers.buffer).unwrap();
        let back = crate::formats::from_geojson_slice(&layer).unwrap();
        assert_eq!(back.crs, Some(CrsCode::UTM_46N));
        assert_eq!(back.features[2].properties[DOWNLOAD_REF], "Run_polygon_2");
    }
}
