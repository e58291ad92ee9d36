mod geo_transform;
mod grid;
mod grid_cell;
mod raster_value;
mod resampling;

pub use self::geo_transform::{GdalGeoTransform, GeoTransform};
pub use self::grid::{Cells, Grid};
pub use self::grid_cell::GridCell;
pub use self::raster_value::{Provenance, RasterValue, TimeExtent};
pub use self::resampling::ResamplingMethod;
