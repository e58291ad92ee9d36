mod statistics;
mod zone_mask;

pub use statistics::{ZonalStatistics, statistics_for};
pub use zone_mask::ZoneMask;

use crate::error;
use crate::processing::reprojection::Reprojector;
use crate::source::{ZoneFeatureSource, ZoneFeatures};
use crate::util::config::{self, get_config_element};
use crate::util::{Result, safe_lock_mutex};
use geo::{Centroid, MultiPolygon};
use hydrogrid_datatypes::raster::{Grid, RasterValue};
use lru::LruCache;
use rayon::prelude::*;
use snafu::ensure;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

type ZoneMaskKey = (Grid, PathBuf, String);

/// Computes per-zone statistics of rasters.
///
/// Zone masks are built once per grid geometry, zone dataset and zone field and then reused
/// for every raster on that grid.
pub struct ZonalStatisticsCalculator {
    reprojector: Reprojector,
    zone_source: Arc<dyn ZoneFeatureSource>,
    masks: Mutex<LruCache<ZoneMaskKey, Arc<Vec<ZoneMask>>>>,
}

impl ZonalStatisticsCalculator {
    pub fn new(
        reprojector: Reprojector,
        zone_source: Arc<dyn ZoneFeatureSource>,
        mask_cache_capacity: NonZeroUsize,
    ) -> Self {
        Self {
            reprojector,
            zone_source,
            masks: Mutex::new(LruCache::new(mask_cache_capacity)),
        }
    }

    /// Creates a calculator with the mask cache capacity from the `zonal_statistics` settings
    pub fn from_config(
        reprojector: Reprojector,
        zone_source: Arc<dyn ZoneFeatureSource>,
    ) -> Result<Self> {
        let settings = get_config_element::<config::ZonalStatistics>()?;
        let capacity = NonZeroUsize::new(settings.mask_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self::new(reprojector, zone_source, capacity))
    }

    /// One mask per distinct value of `zone_field`, ordered by that value.
    ///
    /// A zone too small to cover any cell center is assigned the cell that contains its centroid.
    ///
    /// # Errors
    ///
    /// Fails if the zones cannot be read, reprojected or rasterized
    ///
    #[tracing::instrument(
        level = "debug",
        skip(self, grid),
        fields(nx = grid.nx(), ny = grid.ny())
    )]
    pub fn create_zone_masks(
        &self,
        path: &Path,
        zone_field: &str,
        grid: &Grid,
    ) -> Result<Arc<Vec<ZoneMask>>> {
        let key = (grid.clone(), path.to_owned(), zone_field.to_string());

        if let Some(masks) = safe_lock_mutex(&self.masks).get(&key) {
            trace!("zone mask cache hit");
            return Ok(masks.clone());
        }

        let ZoneFeatures { crs, features } = self.zone_source.read_zone_features(path, zone_field)?;

        let mut zones: BTreeMap<String, Vec<geo::Polygon<f64>>> = BTreeMap::new();
        for feature in features {
            zones
                .entry(feature.zone_id)
                .or_default()
                .extend(feature.geometry);
        }
        let zones: Vec<(String, MultiPolygon<f64>)> = zones
            .into_iter()
            .map(|(zone_id, polygons)| (zone_id, MultiPolygon::new(polygons)))
            .collect();

        debug!("rasterizing {} zones", zones.len());

        let masks = zones
            .par_iter()
            .map(|(zone_id, geometry)| {
                let geometry = self
                    .reprojector
                    .reproject_geometry(geometry, &crs, grid.crs())?;
                self.zone_mask(zone_id, &geometry, grid)
            })
            .collect::<Result<Vec<_>>>()?;

        let masks = Arc::new(masks);
        safe_lock_mutex(&self.masks).put(key, masks.clone());

        Ok(masks)
    }

    fn zone_mask(
        &self,
        zone_id: &str,
        geometry: &MultiPolygon<f64>,
        grid: &Grid,
    ) -> Result<ZoneMask> {
        let mut bits = self.reprojector.engine().rasterize_to_mask(
            geometry,
            &grid.geo_transform(),
            grid.nx(),
            grid.ny(),
        )?;

        ensure!(
            bits.len() == grid.len(),
            error::MaskLengthMismatch {
                mask_length: bits.len(),
                raster_length: grid.len(),
            }
        );

        if !bits.contains(&true) {
            match geometry
                .centroid()
                .and_then(|centroid| grid.index_of(centroid.into()))
            {
                Some(index) => {
                    debug!("zone {zone_id} covers no cell center, using the cell of its centroid");
                    bits[index] = true;
                }
                None => warn!("zone {zone_id} does not overlap the grid"),
            }
        }

        Ok(ZoneMask::new(zone_id, bits))
    }

    /// The statistics of every zone
    ///
    /// # Errors
    ///
    /// Fails if a mask does not match the raster's size
    ///
    pub fn zonal_statistics(
        &self,
        raster: &RasterValue,
        masks: &[ZoneMask],
    ) -> Result<Vec<ZonalStatistics>> {
        masks
            .iter()
            .map(|mask| statistics_for(mask, raster.data(), raster.no_data()))
            .collect()
    }

    pub fn cached_masks(&self) -> usize {
        safe_lock_mutex(&self.masks).len()
    }

    pub fn clear_cache(&self) {
        safe_lock_mutex(&self.masks).clear();
    }
}

impl std::fmt::Debug for ZonalStatisticsCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZonalStatisticsCalculator")
            .field("cached_masks", &self.cached_masks())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::{MockTransformEngine, MockZoneSource};
    use crate::source::ZoneFeature;
    use hydrogrid_datatypes::raster::Provenance;
    use hydrogrid_datatypes::spatial_reference::SpatialReference;
    use hydrogrid_datatypes::util::crs_definitions::{CONUS_ALBERS, WGS_84};

    const ZONES: &str = "/data/basins.geojson";

    fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![geo::Polygon::new(
            geo::LineString::from(vec![
                (min_x, min_y),
                (max_x, min_y),
                (max_x, max_y),
                (min_x, max_y),
            ]),
            vec![],
        )])
    }

    fn feature(zone_id: &str, geometry: MultiPolygon<f64>) -> ZoneFeature {
        ZoneFeature {
            zone_id: zone_id.to_string(),
            geometry,
        }
    }

    /// 10 x 10 cells of 1 degree covering [0, 10] x [0, 10]
    fn grid() -> Grid {
        Grid::new(0., 10., 1., -1., 10, 10, SpatialReference::new(WGS_84)).unwrap()
    }

    fn setup(
        features: Vec<ZoneFeature>,
    ) -> (
        Arc<MockTransformEngine>,
        Arc<MockZoneSource>,
        ZonalStatisticsCalculator,
    ) {
        let engine = Arc::new(MockTransformEngine::new().with_transform(
            SpatialReference::new(CONUS_ALBERS),
            SpatialReference::new(WGS_84),
            |x, y| (x / 1000., y / 1000.),
        ));
        let source = Arc::new(MockZoneSource::new().with_zones(
            ZONES,
            "basin",
            ZoneFeatures {
                crs: SpatialReference::new(WGS_84),
                features,
            },
        ));
        let calculator = ZonalStatisticsCalculator::new(
            Reprojector::new(engine.clone()),
            source.clone(),
            NonZeroUsize::new(4).unwrap(),
        );
        (engine, source, calculator)
    }

    #[test]
    fn it_creates_one_mask_per_zone() {
        let (_, _, calculator) = setup(vec![
            feature("upper", rectangle(0., 5., 5., 10.)),
            feature("lower", rectangle(0., 2., 0., 1.)),
            // a second feature of the same zone
            feature("lower", rectangle(8., 10., 0., 1.)),
        ]);

        let masks = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();

        assert_eq!(masks.len(), 2);
        assert_eq!(masks[0].zone_id(), "lower");
        assert_eq!(
            masks[0].indices().collect::<Vec<_>>(),
            vec![90, 91, 98, 99]
        );
        assert_eq!(masks[1].zone_id(), "upper");
        assert_eq!(masks[1].count(), 25);
        assert!(masks.iter().all(|mask| mask.len() == 100));
    }

    #[test]
    fn tiny_zones_get_the_cell_of_their_centroid() {
        let (_, _, calculator) = setup(vec![feature("gauge", rectangle(3.2, 3.4, 6.2, 6.4))]);

        let masks = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();

        assert_eq!(masks[0].count(), 1);
        // row 3 (y in [6, 7]), column 3
        assert_eq!(masks[0].indices().next(), Some(33));
    }

    #[test]
    fn zones_outside_the_grid_stay_empty() {
        let (_, _, calculator) = setup(vec![feature("far", rectangle(20.2, 20.4, 6.2, 6.4))]);

        let masks = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();

        assert_eq!(masks[0].count(), 0);
    }

    #[test]
    fn masks_are_memoized_per_grid() {
        let (engine, source, calculator) =
            setup(vec![feature("upper", rectangle(0., 5., 5., 10.))]);

        let first = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();
        let second = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.read_count(), 1);
        assert_eq!(engine.rasterize_count(), 1);

        calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid().shift(1., 0.))
            .unwrap();

        assert_eq!(source.read_count(), 2);
        assert_eq!(calculator.cached_masks(), 2);
    }

    #[test]
    fn zones_are_reprojected_into_the_grid_system() {
        let engine = Arc::new(MockTransformEngine::new().with_transform(
            SpatialReference::new(CONUS_ALBERS),
            SpatialReference::new(WGS_84),
            |x, y| (x / 1000., y / 1000.),
        ));
        let source = Arc::new(MockZoneSource::new().with_zones(
            ZONES,
            "basin",
            ZoneFeatures {
                crs: SpatialReference::new(CONUS_ALBERS),
                features: vec![feature("upper", rectangle(0., 5000., 5000., 10000.))],
            },
        ));
        let calculator = ZonalStatisticsCalculator::new(
            Reprojector::new(engine.clone()),
            source,
            NonZeroUsize::new(4).unwrap(),
        );

        let masks = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid())
            .unwrap();

        assert_eq!(masks[0].count(), 25);
        assert_eq!(engine.geometry_transform_count(), 1);
    }

    #[test]
    fn unknown_zone_fields_fail() {
        let (_, _, calculator) = setup(vec![]);

        assert!(matches!(
            calculator.create_zone_masks(Path::new(ZONES), "gauge", &grid()),
            Err(Error::MissingZoneField { .. })
        ));
    }

    #[test]
    fn it_computes_statistics_per_zone() {
        let (_, _, calculator) = setup(vec![
            feature("upper", rectangle(0., 10., 5., 10.)),
            feature("lower", rectangle(0., 10., 0., 5.)),
        ]);
        let grid = grid();
        let data = (0..100)
            .map(|i| if i < 50 { 1. } else { 3. })
            .collect::<Vec<f32>>();
        let raster = RasterValue::new(grid.clone(), data, -9999., Provenance::default()).unwrap();

        let masks = calculator
            .create_zone_masks(Path::new(ZONES), "basin", &grid)
            .unwrap();
        let statistics = calculator.zonal_statistics(&raster, &masks).unwrap();

        assert_eq!(statistics.len(), 2);
        assert_eq!(statistics[0].id, "lower");
        assert_eq!(statistics[0].average, 3.);
        assert_eq!(statistics[1].id, "upper");
        assert_eq!(statistics[1].average, 1.);
        assert_eq!(statistics[1].pct_cells_greater_than_zero, 100.);
    }

    #[test]
    fn mismatching_masks_fail() {
        let (_, _, calculator) = setup(vec![]);
        let raster = RasterValue::new_no_data(grid(), -9999., Provenance::default());

        assert!(matches!(
            calculator.zonal_statistics(&raster, &[ZoneMask::new("zone", vec![true; 99])]),
            Err(Error::MaskLengthMismatch {
                mask_length: 99,
                raster_length: 100
            })
        ));
    }
}
