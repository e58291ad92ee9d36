use snafu::Snafu;

use crate::primitives::Coordinate2D;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display(
        "The conditions min.x <= max.x && min.y <= max.y are not met by min:{} max:{}",
        min_coordinate,
        max_coordinate
    ))]
    InvalidEnvelope {
        min_coordinate: Coordinate2D,
        max_coordinate: Coordinate2D,
    },

    #[snafu(display("Invalid grid geometry. Reason: \"{}\".", description))]
    InvalidGrid {
        description: &'static str,
    },

    #[snafu(display(
        "Dimension capacity ≠ data capacity ({} ≠ {})",
        dimension_cap,
        data_cap
    ))]
    DimensionCapacityDoesNotMatchDataCapacity {
        dimension_cap: usize,
        data_cap: usize,
    },

    #[snafu(display("Invalid WKT at position {}: {}", position, reason))]
    InvalidWkt {
        position: usize,
        reason: String,
    },

    #[snafu(display("Unable to parse number `{}` in WKT: {}", value, source))]
    WktNumber {
        value: String,
        source: std::num::ParseFloatError,
    },

    #[snafu(display("There is no built-in definition for EPSG:{}", code))]
    UnknownEpsgCode {
        code: u32,
    },

    #[snafu(display("Invalid spatial reference string: {}", spatial_reference_string))]
    InvalidSpatialReferenceString {
        spatial_reference_string: String,
    },

    #[snafu(display("Coordinate transformation failed: {}", details))]
    CoordinateTransform {
        details: String,
    },

    #[snafu(display("Raster warp failed: {}", details))]
    Warp {
        details: String,
    },

    #[snafu(display("Rasterization failed: {}", details))]
    Rasterization {
        details: String,
    },
}
