use super::{ZoneFeature, ZoneFeatureSource, ZoneFeatures};
use crate::error::Error;
use crate::util::Result;
use crate::util::gdal::gdal_open_vector_dataset;
use gdal::vector::LayerAccess;
use geo::MultiPolygon;
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use std::path::Path;
use tracing::{debug, warn};

/// Reads zones from the first layer of any vector dataset OGR can open
#[derive(Debug, Clone, Default)]
pub struct OgrZoneSource;

impl ZoneFeatureSource for OgrZoneSource {
    fn read_zone_features(&self, path: &Path, zone_field: &str) -> Result<ZoneFeatures> {
        let dataset = gdal_open_vector_dataset(path)?;

        if dataset.layer_count() == 0 {
            return Err(Error::NoZoneLayer {
                path: path.to_owned(),
            });
        }

        let mut layer = dataset.layer(0)?;

        let crs = match layer.spatial_ref().map(|srs| srs.to_wkt()) {
            Some(Ok(wkt)) => SpatialReference::new(wkt),
            _ => {
                warn!(
                    "zone dataset {} has no reference system, assuming WGS 84",
                    path.display()
                );
                SpatialReference::wgs84()
            }
        };

        let field_index = layer.defn().field_index(zone_field).map_err(|_| {
            Error::MissingZoneField {
                path: path.to_owned(),
                field: zone_field.to_string(),
                feature: 0,
            }
        })?;

        let mut zones = Vec::new();

        for (index, feature) in layer.features().enumerate() {
            let Some(zone_id) = feature.field_as_string(field_index)? else {
                return Err(Error::MissingZoneField {
                    path: path.to_owned(),
                    field: zone_field.to_string(),
                    feature: index,
                });
            };

            let Some(geometry) = feature.geometry() else {
                warn!("feature {index} of zone {zone_id} has no geometry, skipping it");
                continue;
            };

            let geometry = match geometry.to_geo()? {
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
