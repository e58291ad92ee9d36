use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: hydrogrid_datatypes::error::Error,
    },

    #[snafu(display("{builder} is missing the required field `{field}`"))]
    MissingBuilderField {
        builder: &'static str,
        field: &'static str,
    },

    #[snafu(display("Unsupported grid coordinate layout: {}", reason))]
    InvalidAxisLayout {
        reason: String,
    },

    #[snafu(display(
        "Mask length ≠ raster length ({} ≠ {})",
        mask_length,
        raster_length
    ))]
    MaskLengthMismatch {
        mask_length: usize,
        raster_length: usize,
    },

    #[snafu(display("Could not read zone dataset {}: {}", path.display(), source))]
    ReadZoneDataset {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid GeoJSON in {}: {}", path.display(), source))]
    GeoJson {
        path: PathBuf,
        // boxed since the GeoJSON error is large
        source: Box<geojson::Error>,
    },

    #[snafu(display(
        "Zone dataset {} is a bare geometry, zones must be features with a zone field",
        path.display()
    ))]
    GeoJsonWithoutFeatures {
        path: PathBuf,
    },

    #[snafu(display("Zone dataset {} has no layer", path.display()))]
    NoZoneLayer {
        path: PathBuf,
    },

    #[snafu(display(
        "Feature {} of {} has no usable value in field `{}`",
        feature,
        path.display(),
        field
    ))]
    MissingZoneField {
        path: PathBuf,
        field: String,
        feature: usize,
    },

    #[snafu(display("Config error: {}", source))]
    Config {
        source: config::ConfigError,
    },

    ConfigLockFailed,

    #[cfg(feature = "gdal")]
    #[snafu(display("GdalError: {}", source))]
    Gdal {
        source: gdal::errors::GdalError,
    },
}

impl From<hydrogrid_datatypes::error::Error> for Error {
    fn from(datatype_error: hydrogrid_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source }
    }
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}
