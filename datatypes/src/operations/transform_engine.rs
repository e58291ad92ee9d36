use crate::primitives::Envelope;
use crate::raster::{GeoTransform, Grid, RasterValue, ResamplingMethod};
use crate::spatial_reference::{CrsDefinition, SpatialReference};
use crate::util::Result;
use geo::MultiPolygon;

/// The native geometry, reference system and raster engine.
///
/// The processing only decides *what* to transform (caching keys, snapping, fallbacks),
/// implementations of this trait do the actual numeric work.
pub trait CoordinateTransformEngine: Send + Sync {
    /// Validates a descriptor and reads its properties
    fn parse_crs(&self, crs: &SpatialReference) -> Result<CrsDefinition> {
        crs.definition()
    }

    /// Checks if two descriptors denote the same reference system
    fn is_same_crs(&self, a: &SpatialReference, b: &SpatialReference) -> bool {
        a.is_same_reference_system(b)
    }

    /// The bounding box of the transformed envelope
    fn transform_envelope(
        &self,
        envelope: &Envelope,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Envelope>;

    fn transform_geometry(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<MultiPolygon<f64>>;

    /// Resamples and reprojects a raster
    fn warp(&self, request: &WarpRequest<'_>) -> Result<WarpedRaster>;

    /// Burns the geometry into a `nx * ny` row-major mask of the grid described by `geo_transform`.
    /// The geometry must already be in the reference system of that grid.
    fn rasterize_to_mask(
        &self,
        geometry: &MultiPolygon<f64>,
        geo_transform: &GeoTransform,
        nx: usize,
        ny: usize,
    ) -> Result<Vec<bool>>;
}

/// Everything a warp needs to know.
/// `None` for the envelope or the cell size leaves the choice to the engine.
#[derive(Debug, Clone, Copy)]
pub struct WarpRequest<'r> {
    pub source: &'r RasterValue,
    pub target_crs: &'r SpatialReference,
    pub target_envelope: Option<Envelope>,
    pub target_cell_size: Option<f64>,
    pub method: ResamplingMethod,
}

impl WarpRequest<'_> {
    pub fn source_crs(&self) -> &SpatialReference {
        self.source.grid().crs()
    }

    pub fn no_data(&self) -> f32 {
        self.source.no_data()
    }
}

/// The result of a warp: geotransform, dimensions and row-major data
#[derive(Debug, Clone, PartialEq)]
pub struct WarpedRaster {
    pub geo_transform: GeoTransform,
    pub nx: usize,
    pub ny: usize,
    pub data: Vec<f32>,
}

impl WarpedRaster {
    pub fn grid(&self, crs: SpatialReference) -> Result<Grid> {
        Grid::from_geo_transform(self.geo_transform, self.nx, self.ny, crs)
    }
}
