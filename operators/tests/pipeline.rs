#![allow(clippy::float_cmp)]

use chrono::{TimeZone, Utc};
use hydrogrid_datatypes::assert_approx_eq;
use hydrogrid_datatypes::primitives::{Coordinate2D, Envelope};
use hydrogrid_datatypes::raster::{Grid, Provenance, RasterValue, ResamplingMethod, TimeExtent};
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use hydrogrid_datatypes::util::crs_definitions::{CONUS_ALBERS, WGS_84};
use hydrogrid_operators::cache::EnvelopeReprojectionCache;
use hydrogrid_operators::mock::MockTransformEngine;
use hydrogrid_operators::processing::{
    GridCoordinates, IndexSearcherRegistry, Reprojector, Resampler, SearchHint, Subsetter,
    ZonalStatisticsCalculator,
};
use hydrogrid_operators::source::GeoJsonZoneSource;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine() -> Arc<MockTransformEngine> {
    Arc::new(
        MockTransformEngine::new()
            .with_transform(
                SpatialReference::new(WGS_84),
                SpatialReference::new(CONUS_ALBERS),
                |x, y| (x * 1000., y * 1000.),
            )
            .with_transform(
                SpatialReference::new(CONUS_ALBERS),
                SpatialReference::new(WGS_84),
                |x, y| (x / 1000., y / 1000.),
            ),
    )
}

/// 10 x 10 cells of 10 m covering [0, 100] x [0, 100], the value of a cell is `row * 10 + col`
fn precipitation() -> RasterValue {
    let grid =
        Grid::new(0., 100., 10., -10., 10, 10, SpatialReference::new(CONUS_ALBERS)).unwrap();

    RasterValue::new(
        grid,
        (0..100u8).map(f32::from).collect(),
        -9999.,
        Provenance {
            name: "APCP".to_string(),
            description: "total precipitation".to_string(),
            units: "mm".to_string(),
            time: Some(TimeExtent::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                Some(Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()),
            )),
        },
    )
    .unwrap()
}

fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> String {
    format!(
        "[[[{min_x}, {min_y}], [{max_x}, {min_y}], [{max_x}, {max_y}], [{min_x}, {max_y}], [{min_x}, {min_y}]]]"
    )
}

/// Zones in degrees, the mock engine maps them onto meters by multiplying with 1000
fn write_basins() -> tempfile::NamedTempFile {
    let zones = [
        ("a", rectangle(0.03, 0.04, 0.04, 0.07)),
        ("b", rectangle(0.04, 0.06, 0.04, 0.07)),
        ("c", rectangle(1.0, 1.001, 1.0, 1.001)),
        ("d", rectangle(0.0351, 0.0352, 0.0551, 0.0552)),
    ];
    let features = zones
        .iter()
        .map(|(basin, coordinates)| {
            format!(
                r#"{{"type": "Feature", "properties": {{"basin": "{basin}"}}, "geometry": {{"type": "Polygon", "coordinates": {coordinates}}}}}"#
            )
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut file = tempfile::Builder::new()
        .suffix(".geojson")
        .tempfile()
        .unwrap();
    write!(
        file,
        r#"{{"type": "FeatureCollection", "features": [{features}]}}"#
    )
    .unwrap();
    file
}

#[test]
fn resample_subset_and_aggregate() {
    init_tracing();

    let engine = engine();
    let reprojector = Reprojector::new(engine.clone());
    let envelope_cache = Arc::new(EnvelopeReprojectionCache::new(
        reprojector.clone(),
        NonZeroUsize::new(16).unwrap(),
    ));
    let source = precipitation();

    let resampled = Resampler::builder(envelope_cache.clone())
        .source(&source)
        .clip_envelope_in(
            Envelope::new(0.021, 0.079, 0.021, 0.079).unwrap(),
            SpatialReference::new(WGS_84),
        )
        .cell_size(10.)
        .method(ResamplingMethod::Nearest)
        .build()
        .unwrap()
        .resample()
        .unwrap();

    // the clip envelope is snapped outwards onto the cell size
    assert_eq!(resampled.grid().envelope(), Envelope::new(20., 80., 20., 80.).unwrap());
    assert_eq!((resampled.grid().nx(), resampled.grid().ny()), (6, 6));
    assert_eq!(resampled.value_at(0, 0), Some(22.));
    assert_eq!(resampled.provenance(), source.provenance());
    assert_eq!(engine.warp_count(), 1);
    assert_eq!(engine.envelope_transform_count(), 1);

    let subset = Subsetter::builder()
        .source(&resampled)
        .envelope(Envelope::new(30., 60., 40., 70.).unwrap())
        .build()
        .unwrap()
        .subset()
        .unwrap();

    assert_eq!((subset.grid().nx(), subset.grid().ny()), (3, 3));
    assert_eq!(subset.grid().origin_x(), 30.);
    assert_eq!(subset.grid().origin_y(), 70.);
    assert_eq!(subset.value_at(0, 0), Some(33.));
    assert_eq!(subset.provenance(), source.provenance());

    let basins = write_basins();
    let calculator = ZonalStatisticsCalculator::new(
        reprojector,
        Arc::new(GeoJsonZoneSource::default()),
        NonZeroUsize::new(4).unwrap(),
    );

    let masks = calculator
        .create_zone_masks(basins.path(), "basin", subset.grid())
        .unwrap();
    let statistics = calculator.zonal_statistics(&subset, &masks).unwrap();

    assert_eq!(
        statistics.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c", "d"]
    );
    assert_eq!(engine.geometry_transform_count(), 4);

    let a = &statistics[0];
    assert_approx_eq!(
        &[a.average, a.min, a.max, a.median, a.first_quartile],
        &[43., 33., 53., 43., f64::NAN]
    );

    let b = &statistics[1];
    assert_approx_eq!(
        &[
            b.average,
            b.median,
            b.first_quartile,
            b.third_quartile,
            b.pct_cells_greater_than_zero,
            b.pct_cells_greater_than_first_quartile,
        ],
        &[44.5, 44.5, 35., 55., 100., 400. / 6.]
    );

    // outside of the grid
    assert!(statistics[2].average.is_nan());

    // too small for any cell center, so it falls back to the cell of its centroid
    assert_eq!(masks[3].count(), 1);
    assert_eq!(statistics[3].average, 43.);

    // the second raster on the same grid reuses the masks
    let again = calculator
        .create_zone_masks(basins.path(), "basin", subset.grid())
        .unwrap();
    assert!(Arc::ptr_eq(&masks, &again));
    assert_eq!(engine.rasterize_count(), 4);
}

#[test]
fn searchers_are_shared_per_grid() {
    init_tracing();

    let grid = Grid::new(30., 70., 10., -10., 3, 3, SpatialReference::new(CONUS_ALBERS)).unwrap();
    let registry = IndexSearcherRegistry::new();

    let searcher = registry
        .get_or_build(&GridCoordinates::from_grid(&grid))
        .unwrap();
    let same = registry
        .get_or_build(&GridCoordinates::from_grid(&grid))
        .unwrap();

    assert!(Arc::ptr_eq(&searcher, &same));
    assert_eq!(registry.len(), 1);

    let mut hint = SearchHint::default();
    let centroid = Coordinate2D::new(35.15, 55.15);

    assert_eq!(searcher.index_of(centroid, &mut hint), grid.index_of(centroid));
    assert_eq!(hint.last_index(), 3);
    assert_eq!(searcher.index_of(Coordinate2D::new(95., 55.), &mut hint), None);

    let shifted = grid.shift(10., 0.);
    registry
        .get_or_build(&GridCoordinates::from_grid(&shifted))
        .unwrap();
    assert_eq!(registry.len(), 2);
}
