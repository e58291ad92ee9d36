use super::{ZoneFeature, ZoneFeatureSource, ZoneFeatures};
use crate::error::{self, Error};
use crate::util::Result;
use geo::MultiPolygon;
use geojson::{GeoJson, JsonObject, JsonValue};
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use snafu::ResultExt;
use std::path::Path;
use tracing::{debug, warn};

/// Reads zones from GeoJSON files.
///
/// Coordinates are interpreted in the configured reference system (WGS 84 by default)
/// unless the file declares an EPSG code in a legacy `crs` member.
#[derive(Debug, Clone)]
pub struct GeoJsonZoneSource {
    default_crs: SpatialReference,
}

impl GeoJsonZoneSource {
    pub fn new(default_crs: SpatialReference) -> Self {
        Self { default_crs }
    }
}

impl Default for GeoJsonZoneSource {
    fn default() -> Self {
        Self::new(SpatialReference::wgs84())
    }
}

impl ZoneFeatureSource for GeoJsonZoneSource {
    fn read_zone_features(&self, path: &Path, zone_field: &str) -> Result<ZoneFeatures> {
        let text = std::fs::read_to_string(path).context(error::ReadZoneDataset { path })?;

        let geojson = text.parse::<GeoJson>().map_err(|source| Error::GeoJson {
            path: path.to_owned(),
            source: Box::new(source),
        })?;

        let (features, foreign_members) = match geojson {
            GeoJson::FeatureCollection(collection) => {
                (collection.features, collection.foreign_members)
            }
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(_) => {
                return error::GeoJsonWithoutFeatures { path }.fail();
            }
        };

        let crs = foreign_members
            .as_ref()
            .and_then(declared_crs)
            .unwrap_or_else(|| self.default_crs.clone());

        let mut zones = Vec::with_capacity(features.len());

        for (index, feature) in features.into_iter().enumerate() {
            let zone_id = feature
                .property(zone_field)
                .and_then(zone_id_from_json)
                .ok_or_else(|| Error::MissingZoneField {
                    path: path.to_owned(),
                    field: zone_field.to_string(),
                    feature: index,
                })?;

            let Some(geometry) = feature.geometry else {
                warn!("feature {index} of zone {zone_id} has no geometry, skipping it");
                continue;
            };

            let geometry = geo::Geometry::<f64>::try_from(geometry.value).map_err(|source| {
                Error::GeoJson {
                    path: path.to_owned(),
                    source: Box::new(source),
                }
            })?;

            let geometry = match geometry {
                geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                geo::Geometry::MultiPolygon(multi_polygon) => multi_polygon,
                _ => {
                    warn!("feature {index} of zone {zone_id} is not a polygon, skipping it");
                    continue;
                }
            };

            zones.push(ZoneFeature { zone_id, geometry });
        }

        debug!("read {} zone features from {}", zones.len(), path.display());

        Ok(ZoneFeatures {
            crs,
            features: zones,
        })
    }
}

fn zone_id_from_json(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Reads `{"crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::5070"}}}`
fn declared_crs(foreign_members: &JsonObject) -> Option<SpatialReference> {
    let name = foreign_members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    // CRS84 is WGS 84 in longitude, latitude order which is what GeoJSON uses anyway
    if name.ends_with("CRS84") {
        return Some(SpatialReference::wgs84());
    }

    let code = name
        .rsplit(':')
        .next()
        .and_then(|code| code.parse::<u32>().ok())?;

    match SpatialReference::from_epsg(code) {
        Ok(crs) => Some(crs),
        Err(error) => {
            warn!("ignoring the declared reference system `{name}`: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_geojson(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".geojson")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const ZONES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "upper", "id": 1 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "lower", "id": 2 },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[20, 0], [30, 0], [30, 10], [20, 0]]],
                        [[[40, 0], [50, 0], [50, 10], [40, 0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "gauge", "id": 3 },
                "geometry": { "type": "Point", "coordinates": [5, 5] }
            }
        ]
    }"#;

    #[test]
    fn it_reads_polygon_zones() {
        let file = write_geojson(ZONES);

        let zones = GeoJsonZoneSource::default()
            .read_zone_features(file.path(), "name")
            .unwrap();

        assert_eq!(zones.crs, SpatialReference::wgs84());
        assert_eq!(zones.features.len(), 2);
        assert_eq!(zones.features[0].zone_id, "upper");
        assert_eq!(zones.features[0].geometry.0.len(), 1);
        assert_eq!(zones.features[1].zone_id, "lower");
        assert_eq!(zones.features[1].geometry.0.len(), 2);
    }

    #[test]
    fn it_renders_numeric_zone_ids() {
        let file = write_geojson(ZONES);

        let zones = GeoJsonZoneSource::default()
            .read_zone_features(file.path(), "id")
            .unwrap();

        assert_eq!(zones.features[0].zone_id, "1");
        assert_eq!(zones.features[1].zone_id, "2");
    }

    #[test]
    fn it_fails_for_a_missing_zone_field() {
        let file = write_geojson(ZONES);

        let result = GeoJsonZoneSource::default().read_zone_features(file.path(), "basin");

        assert!(matches!(
            result,
            Err(Error::MissingZoneField { feature: 0, .. })
        ));
    }

    #[test]
    fn it_uses_a_declared_reference_system() {
        let file = write_geojson(
            r#"{
                "type": "FeatureCollection",
                "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::5070" } },
                "features": []
            }"#,
        );

        let zones = GeoJsonZoneSource::default()
            .read_zone_features(file.path(), "name")
            .unwrap();

        assert_eq!(zones.crs, SpatialReference::from_epsg(5070).unwrap());
        assert!(zones.features.is_empty());
    }

    #[test]
    fn it_falls_back_to_the_configured_reference_system() {
        let file = write_geojson(
            r#"{
                "type": "FeatureCollection",
                "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::31467" } },
                "features": []
            }"#,
        );
        let default_crs = SpatialReference::from_epsg(3857).unwrap();

        let zones = GeoJsonZoneSource::new(default_crs.clone())
            .read_zone_features(file.path(), "name")
            .unwrap();

        assert_eq!(zones.crs, default_crs);
    }

    #[test]
    fn it_reports_io_and_parse_errors() {
        let source = GeoJsonZoneSource::default();

        assert!(matches!(
            source.read_zone_features(Path::new("/does/not/exist.geojson"), "name"),
            Err(Error::ReadZoneDataset { .. })
        ));

        let file = write_geojson("{ not json");
        assert!(matches!(
            source.read_zone_features(file.path(), "name"),
            Err(Error::GeoJson { .. })
        ));
    }

    #[test]
    fn it_rejects_bare_geometries() {
        let file = write_geojson(
            r#"{
                "type": "Polygon",
                "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
            }"#,
        );

        let result = GeoJsonZoneSource::default().read_zone_features(file.path(), "name");

        assert!(matches!(
            result,
            Err(Error::GeoJsonWithoutFeatures { path }) if path == file.path()
        ));
    }
}
