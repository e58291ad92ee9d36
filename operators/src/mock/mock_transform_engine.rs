use crate::util::safe_lock_mutex;
use geo::{Contains, MapCoords, MultiPolygon, Point};
use hydrogrid_datatypes::error::Error as DataTypeError;
use hydrogrid_datatypes::operations::{CoordinateTransformEngine, WarpRequest, WarpedRaster};
use hydrogrid_datatypes::primitives::{Coordinate2D, Envelope};
use hydrogrid_datatypes::raster::{GeoTransform, ResamplingMethod};
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use hydrogrid_datatypes::util::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type CoordinateFn = Arc<dyn Fn(f64, f64) -> (f64, f64) + Send + Sync>;

/// Points per envelope edge that are transformed to find the target bounds
const DENSIFY_POINTS: usize = 20;

/// What the last call to [`MockTransformEngine::warp`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWarp {
    pub source_crs: SpatialReference,
    pub target_crs: SpatialReference,
    pub target_envelope: Option<Envelope>,
    pub target_cell_size: Option<f64>,
    pub method: ResamplingMethod,
    pub no_data: f32,
}

/// A transform engine that applies registered closures instead of real map projections.
///
/// Warping samples the nearest source cell for every target cell, whatever method is requested.
/// Every operation is counted so tests can check what was delegated to the engine.
#[derive(Default)]
pub struct MockTransformEngine {
    transforms: Vec<(SpatialReference, SpatialReference, CoordinateFn)>,
    envelope_transforms: AtomicUsize,
    geometry_transforms: AtomicUsize,
    warps: AtomicUsize,
    rasterizations: AtomicUsize,
    last_warp: Mutex<Option<RecordedWarp>>,
}

impl MockTransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the coordinate function for transformations from `from` to `to`
    #[must_use]
    pub fn with_transform<F>(mut self, from: SpatialReference, to: SpatialReference, f: F) -> Self
    where
        F: Fn(f64, f64) -> (f64, f64) + Send + Sync + 'static,
    {
        self.transforms.push((from, to, Arc::new(f)));
        self
    }

    pub fn envelope_transform_count(&self) -> usize {
        self.envelope_transforms.load(Ordering::SeqCst)
    }

    pub fn geometry_transform_count(&self) -> usize {
        self.geometry_transforms.load(Ordering::SeqCst)
    }

    pub fn warp_count(&self) -> usize {
        self.warps.load(Ordering::SeqCst)
    }

    pub fn rasterize_count(&self) -> usize {
        self.rasterizations.load(Ordering::SeqCst)
    }

    pub fn last_warp(&self) -> Option<RecordedWarp> {
        safe_lock_mutex(&self.last_warp).clone()
    }

    fn coordinate_fn(
        &self,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<CoordinateFn> {
        if self.is_same_crs(from, to) {
            return Ok(Arc::new(|x, y| (x, y)));
        }

        self.transforms
            .iter()
            .find(|(f, t, _)| self.is_same_crs(f, from) && self.is_same_crs(t, to))
            .map(|(_, _, transform)| transform.clone())
            .ok_or_else(|| DataTypeError::CoordinateTransform {
                details: "no transformation registered for this pair of reference systems"
                    .to_string(),
            })
    }

    fn densified_bounds(envelope: &Envelope, transform: &CoordinateFn) -> Result<Envelope> {
        let along = |min: f64, max: f64, i: usize| {
            if i == DENSIFY_POINTS {
                max
            } else {
                min + (max - min) * i as f64 / DENSIFY_POINTS as f64
            }
        };

        let edge_points = (0..=DENSIFY_POINTS).flat_map(|i| {
            let x = along(envelope.min_x(), envelope.max_x(), i);
            let y = along(envelope.min_y(), envelope.max_y(), i);
            [
                (x, envelope.min_y()),
                (x, envelope.max_y()),
                (envelope.min_x(), y),
                (envelope.max_x(), y),
            ]
        });

        Envelope::from_coordinates(
            edge_points.map(|(x, y)| Coordinate2D::from(transform(x, y))),
        )
        .ok_or_else(|| DataTypeError::CoordinateTransform {
            details: "the transformed envelope has no finite bounds".to_string(),
        })
    }
}

impl CoordinateTransformEngine for MockTransformEngine {
    fn transform_envelope(
        &self,
        envelope: &Envelope,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Envelope> {
        self.envelope_transforms.fetch_add(1, Ordering::SeqCst);

        let transform = self.coordinate_fn(from, to)?;
        Self::densified_bounds(envelope, &transform)
    }

    fn transform_geometry(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<MultiPolygon<f64>> {
        self.geometry_transforms.fetch_add(1, Ordering::SeqCst);

        let transform = self.coordinate_fn(from, to)?;
        Ok(geometry.map_coords(|coord| {
            let (x, y) = transform(coord.x, coord.y);
            geo::coord! { x: x, y: y }
        }))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn warp(&self, request: &WarpRequest<'_>) -> Result<WarpedRaster> {
        self.warps.fetch_add(1, Ordering::SeqCst);
        *safe_lock_mutex(&self.last_warp) = Some(RecordedWarp {
            source_crs: request.source_crs().clone(),
            target_crs: request.target_crs.clone(),
            target_envelope: request.target_envelope,
            target_cell_size: request.target_cell_size,
            method: request.method,
            no_data: request.no_data(),
        });

        let source_grid = request.source.grid();

        let target_envelope = match request.target_envelope {
            Some(envelope) => envelope,
            None => {
                let forward = self.coordinate_fn(request.source_crs(), request.target_crs)?;
                Self::densified_bounds(&source_grid.envelope(), &forward)?
            }
        };

        let cell_size = request.target_cell_size.unwrap_or_else(|| {
            (target_envelope.width() * target_envelope.height() / source_grid.len().max(1) as f64)
                .sqrt()
        });
        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(DataTypeError::Warp {
                details: format!("cannot warp to a cell size of {cell_size}"),
            });
        }

        let nx = ((target_envelope.width() / cell_size).round() as usize).max(1);
        let ny = ((target_envelope.height() / cell_size).round() as usize).max(1);
        let geo_transform = GeoTransform::new_with_coordinate_x_y(
            target_envelope.min_x(),
            cell_size,
            target_envelope.max_y(),
            -cell_size,
        );

        let inverse = self.coordinate_fn(request.target_crs, request.source_crs())?;

        let mut data = Vec::with_capacity(nx * ny);
        for row in 0..ny {
            for col in 0..nx {
                let center = geo_transform.pixel_to_coordinate(col as f64 + 0.5, row as f64 + 0.5);
                let source_coordinate = Coordinate2D::from(inverse(center.x, center.y));

                let value = source_grid
                    .index_of(source_coordinate)
                    .and_then(|index| request.source.data().get(index).copied())
                    .unwrap_or(request.no_data());
                data.push(value);
            }
        }

        Ok(WarpedRaster {
            geo_transform,
            nx,
            ny,
            data,
        })
    }

    fn rasterize_to_mask(
        &self,
        geometry: &MultiPolygon<f64>,
        geo_transform: &GeoTransform,
        nx: usize,
        ny: usize,
    ) -> Result<Vec<bool>> {
        self.rasterizations.fetch_add(1, Ordering::SeqCst);

        let mask = (0..ny)
            .flat_map(|row| (0..nx).map(move |col| (col, row)))
            .map(|(col, row)| {
                let center = geo_transform.pixel_to_coordinate(col as f64 + 0.5, row as f64 + 0.5);
                geometry.contains(&Point::from(center))
            })
            .collect();

        Ok(mask)
    }
}

impl std::fmt::Debug for MockTransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransformEngine")
            .field("transforms", &self.transforms.len())
            .field("envelope_transforms", &self.envelope_transform_count())
            .field("geometry_transforms", &self.geometry_transform_count())
            .field("warps", &self.warp_count())
            .field("rasterizations", &self.rasterize_count())
            .finish()
    }
}
