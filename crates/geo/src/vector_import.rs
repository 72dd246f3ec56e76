//! # Vector Data Import
//!
//! Parses lot datasets (GeoJSON, ESRI shapefile) into WGS84 polygon
//! collections. Each usable feature becomes a `MitigationPolygon`.
//!
//! ## Table of Contents
//! 1. MitigationPolygon — Lot geometry in lon/lat
//! 2. GeoJSON import
//! 3. Shapefile import
//! 4. Ring assembly helpers

use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, GeoJson, Geometry, Value};
use shapefile::dbase::{self, FieldValue};
use shapefile::{PolygonRing, Shape, ShapeReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::coords::Reprojector;
use crate::error::{GeoError, Result};
use crate::shx;

/// Attribute keys a lot name is read from, in order
const NAME_FIELDS: [&str; 3] = ["name", "Name", "NAME"];

// ============================================================================
// 1. MitigationPolygon — Lot geometry in lon/lat
// ============================================================================

/// A vacant or parking lot that can be converted to green space.
/// Coordinates are WGS84 `(x = lon, y = lat)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MitigationPolygon {
    /// Feature/record index within the source file
    pub index: usize,
    /// Feature name (GeoJSON "name" property or `.dbf` NAME field)
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

impl MitigationPolygon {
    pub fn new(index: usize, geometry: MultiPolygon<f64>) -> Self {
        Self { index, name: None, geometry }
    }

    /// Strict interior test ("within" predicate; boundary points excluded)
    pub fn contains_lon_lat(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }
}

// ============================================================================
// 2. GeoJSON import
// ============================================================================

/// Import Polygon/MultiPolygon features from a GeoJSON file (WGS84 per RFC 7946)
pub fn import_geojson(path: &Path) -> Result<Vec<MitigationPolygon>> {
    let content = std::fs::read_to_string(path).map_err(|source| GeoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson: GeoJson = content.parse().map_err(|e| GeoError::Parse {
        path: path.to_path_buf(),
        message: format!("{}", e),
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let mut lots = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let polygons = geojson_polygons(geometry);
        if polygons.is_empty() {
            tracing::debug!("Skipping non-polygon feature {} in {}", index, path.display());
            continue;
        }
        lots.push(MitigationPolygon {
            index,
            name: extract_name(&feature.properties),
            geometry: MultiPolygon::new(polygons),
        });
    }

    tracing::info!("Imported {} lot polygons from {}", lots.len(), path.display());
    Ok(lots)
}

/// Collect the polygons of a GeoJSON geometry; non-areal parts are ignored
fn geojson_polygons(geometry: &Geometry) -> Vec<Polygon<f64>> {
    match &geometry.value {
        Value::Polygon(rings) => geojson_rings_to_polygon(rings).into_iter().collect(),
        Value::MultiPolygon(polys) => polys
            .iter()
            .filter_map(|rings| geojson_rings_to_polygon(rings))
            .collect(),
        Value::GeometryCollection(geoms) => geoms.iter().flat_map(geojson_polygons).collect(),
        _ => Vec::new(),
    }
}

fn geojson_rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let to_ring = |ring: &Vec<Vec<f64>>| -> LineString<f64> {
        ring.iter()
            .filter(|c| c.len() >= 2)
            .map(|c| Coord { x: c[0], y: c[1] })
            .collect()
    };
    let outer = to_ring(rings.first()?);
    if !is_areal(&outer) {
        return None;
    }
    let holes = rings.iter().skip(1).map(to_ring).filter(is_areal).collect();
    Some(Polygon::new(outer, holes))
}

/// Extract a "name" property from GeoJSON feature properties
fn extract_name(properties: &Option<serde_json::Map<String, serde_json::Value>>) -> Option<String> {
    let props = properties.as_ref()?;
    NAME_FIELDS
        .iter()
        .find_map(|key| props.get(*key))
        .and_then(|v| v.as_str().map(|s| s.to_string()))
}

// ============================================================================
// 3. Shapefile import
// ============================================================================

/// Import polygon records from a `.shp` file, reprojecting every vertex.
///
/// Records are read sequentially from the `.shp` alone; the `.shx` sidecar
/// is the caller's concern (see `lots::load_lots`). Names come from the
/// `.dbf` table when one sits next to the file.
pub fn import_shapefile(path: &Path, reprojector: &Reprojector) -> Result<Vec<MitigationPolygon>> {
    let file = File::open(path).map_err(|source| GeoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let shapes = ShapeReader::new(BufReader::new(file))
        .and_then(|reader| reader.read())
        .map_err(|source| GeoError::Shapefile {
            path: path.to_path_buf(),
            source,
        })?;
    let names = read_dbf_names(path);

    let mut lots = Vec::with_capacity(shapes.len());
    let mut skipped = 0usize;

    for (index, shape) in shapes.iter().enumerate() {
        let rings = match shape {
            Shape::Polygon(p) => collect_rings(p.rings(), |pt: &shapefile::Point| (pt.x, pt.y), reprojector)?,
            Shape::PolygonM(p) => collect_rings(p.rings(), |pt: &shapefile::PointM| (pt.x, pt.y), reprojector)?,
            Shape::PolygonZ(p) => collect_rings(p.rings(), |pt: &shapefile::PointZ| (pt.x, pt.y), reprojector)?,
            Shape::NullShape => continue,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let geometry = assemble_polygons(rings);
        if geometry.0.is_empty() {
            tracing::debug!("Dropping degenerate record {} in {}", index, path.display());
            continue;
        }
        lots.push(MitigationPolygon {
            index,
            name: names.get(index).cloned().flatten(),
            geometry,
        });
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} non-polygon records in {}",
            skipped,
            path.display()
        );
    }
    tracing::info!("Imported {} lot polygons from {}", lots.len(), path.display());
    Ok(lots)
}

/// Per-record names from the `.dbf` next to `shp_path`. A missing or
/// unreadable table only costs the names.
fn read_dbf_names(shp_path: &Path) -> Vec<Option<String>> {
    let dbf = shx::sidecar_path(shp_path, "dbf");
    if !dbf.is_file() {
        return Vec::new();
    }

    let records = match dbase::Reader::from_path(&dbf).and_then(|mut reader| reader.read()) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Ignoring attributes in {}: {}", dbf.display(), e);
            return Vec::new();
        }
    };

    records
        .iter()
        .map(|record| {
            NAME_FIELDS.iter().find_map(|key| match record.get(key)? {
                FieldValue::Character(Some(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                FieldValue::Memo(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
        })
        .collect()
}

/// A ring tagged with its role, already in lon/lat
type TaggedRing = (bool, LineString<f64>);

fn collect_rings<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
    reprojector: &Reprojector,
) -> Result<Vec<TaggedRing>> {
    rings
        .iter()
        .map(|ring| {
            let outer = matches!(ring, PolygonRing::Outer(_));
            let coords = ring
                .points()
                .iter()
                .map(|p| {
                    let (x, y) = xy(p);
                    reprojector.to_lon_lat(x, y).map(|(lon, lat)| Coord { x: lon, y: lat })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((outer, LineString::new(coords)))
        })
        .collect()
}

// ============================================================================
// 4. Ring assembly helpers
// ============================================================================

/// At least three distinct vertices
fn is_areal(ring: &LineString<f64>) -> bool {
    let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(4);
    for c in ring.coords() {
        if !distinct.contains(c) {
            distinct.push(*c);
            if distinct.len() >= 3 {
                return true;
            }
        }
    }
    false
}

/// Group shapefile rings into polygons: every outer ring opens a polygon,
/// each hole joins the outer ring that contains its first vertex (or the
/// most recent outer ring when none does).
fn assemble_polygons(rings: Vec<TaggedRing>) -> MultiPolygon<f64> {
    let mut shells: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut orphans = Vec::new();

    for (outer, ring) in rings {
        if !is_areal(&ring) {
            continue;
        }
        if outer {
            shells.push((ring, Vec::new()));
        } else {
            orphans.push(ring);
        }
    }

    for hole in orphans {
        let Some(first) = hole.0.first().copied() else {
            continue;
        };
        let vertex = Point::from(first);
        let owner = shells
            .iter()
            .position(|(shell, _)| Polygon::new(shell.clone(), Vec::new()).contains(&vertex));
        match owner.or_else(|| shells.len().checked_sub(1)) {
            Some(i) => shells[i].1.push(hole),
            // A lone inner ring is most likely a mis-wound shell
            None => shells.push((hole, Vec::new())),
        }
    }

    shells
        .into_iter()
        .map(|(shell, holes)| Polygon::new(shell, holes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clockwise_square, dbf_bytes, multipart_shp_bytes, polygon_shp_bytes};

    fn counter_clockwise(ring: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
        ring.into_iter().rev().collect()
    }

    #[test]
    fn geojson_keeps_polygons_and_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lots.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"NAME":"Lot A"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type":"Feature","properties":{},
                 "geometry":{"type":"Point","coordinates":[5,5]}},
                {"type":"Feature","properties":null,
                 "geometry":{"type":"MultiPolygon","coordinates":[
                    [[[2,2],[3,2],[3,3],[2,3],[2,2]]],
                    [[[4,4],[5,4],[5,5],[4,5],[4,4]]]]}}
            ]}"#,
        )
        .unwrap();

        let lots = import_geojson(&path).unwrap();
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].name.as_deref(), Some("Lot A"));
        assert_eq!(lots[1].index, 2);
        assert_eq!(lots[1].geometry.0.len(), 2);
        assert!(lots[1].contains_lon_lat(4.5, 4.5));
    }

    #[test]
    fn geojson_parse_failure_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(import_geojson(&path), Err(GeoError::Parse { .. })));
    }

    #[test]
    fn shapefile_polygons_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lots.shp");
        std::fs::write(
            &path,
            polygon_shp_bytes(&[clockwise_square(0.0, 0.0, 1.0), clockwise_square(3.0, 3.0, 2.0)]),
        )
        .unwrap();

        let lots = import_shapefile(&path, &Reprojector::wgs84()).unwrap();
        assert_eq!(lots.len(), 2);
        assert!(lots[0].contains_lon_lat(0.5, 0.5));
        assert!(!lots[0].contains_lon_lat(3.5, 3.5));
        assert!(lots[1].contains_lon_lat(4.0, 4.0));
    }

    #[test]
    fn shapefile_names_come_from_dbf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lots.shp");
        std::fs::write(
            &path,
            polygon_shp_bytes(&[clockwise_square(0.0, 0.0, 1.0), clockwise_square(3.0, 3.0, 2.0)]),
        )
        .unwrap();
        std::fs::write(dir.path().join("lots.dbf"), dbf_bytes("NAME", &["Lot A", ""])).unwrap();

        let lots = import_shapefile(&path, &Reprojector::wgs84()).unwrap();
        assert_eq!(lots[0].name.as_deref(), Some("Lot A"));
        assert_eq!(lots[1].name, None);
    }

    #[test]
    fn unreadable_dbf_keeps_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lots.shp");
        std::fs::write(&path, polygon_shp_bytes(&[clockwise_square(0.0, 0.0, 1.0)])).unwrap();
        std::fs::write(dir.path().join("lots.dbf"), b"garbage").unwrap();

        let lots = import_shapefile(&path, &Reprojector::wgs84()).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].name, None);
    }

    #[test]
    fn shapefile_holes_exclude_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ring.shp");
        let shell = clockwise_square(0.0, 0.0, 10.0);
        let hole = counter_clockwise(clockwise_square(4.0, 4.0, 2.0));
        std::fs::write(&path, multipart_shp_bytes(&[vec![shell, hole]])).unwrap();

        let lots = import_shapefile(&path, &Reprojector::wgs84()).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].geometry.0[0].interiors().len(), 1);
        assert!(lots[0].contains_lon_lat(1.0, 1.0));
        assert!(!lots[0].contains_lon_lat(5.0, 5.0));
    }

    #[test]
    fn boundary_points_are_not_contained() {
        let lot = MitigationPolygon::new(
            0,
            MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
                vec![],
            )]),
        );
        assert!(!lot.contains_lon_lat(0.0, 0.5));
        assert!(!lot.contains_lon_lat(1.0, 1.0));
        assert!(lot.contains_lon_lat(0.5, 0.5));
    }

    #[test]
    fn degenerate_rings_are_dropped() {
        let flat = LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(!is_areal(&flat));
        assert!(assemble_polygons(vec![(true, flat)]).0.is_empty());
    }
}
