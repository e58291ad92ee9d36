mod geojson_zones;
#[cfg(feature = "gdal")]
mod ogr_zones;

pub use geojson_zones::GeoJsonZoneSource;
#[cfg(feature = "gdal")]
pub use ogr_zones::OgrZoneSource;

use crate::util::Result;
use geo::MultiPolygon;
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use std::path::Path;

/// One polygon feature of a zone dataset, tagged with the value of the zone field
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFeature {
    pub zone_id: String,
    pub geometry: MultiPolygon<f64>,
}

/// All polygon features of a zone dataset in the dataset's reference system
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFeatures {
    pub crs: SpatialReference,
    pub features: Vec<ZoneFeature>,
}

/// Reads the polygons of a vector dataset together with the value of a zone field
pub trait ZoneFeatureSource: Send + Sync {
    fn read_zone_features(&self, path: &Path, zone_field: &str) -> Result<ZoneFeatures>;
}
