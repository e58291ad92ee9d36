use crate::primitives::Coordinate2D;
use serde::{Deserialize, Serialize};

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
/// Rotation terms are not supported.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTransform {
    pub origin_coordinate: Coordinate2D,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
}

impl GeoTransform {
    /// Generates a new `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new((0.0, 0.0).into(), 1.0, -1.0);
    /// ```
    ///
    pub fn new(origin_coordinate: Coordinate2D, x_pixel_size: f64, y_pixel_size: f64) -> Self {
        Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Generates a new `GeoTransform` with explicit x, y values of the upper left edge
    pub fn new_with_coordinate_x_y(
        origin_coordinate_x: f64,
        x_pixel_size: f64,
        origin_coordinate_y: f64,
        y_pixel_size: f64,
    ) -> Self {
        Self {
            origin_coordinate: (origin_coordinate_x, origin_coordinate_y).into(),
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Transforms a (possibly fractional) pixel position into a SRS coordinate (x,y).
    /// The position `(0.5, 0.5)` is the center of the first pixel.
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// assert_eq!(geo_transform.pixel_to_coordinate(2.0, 1.0), (2.0, -1.0).into())
    /// ```
    ///
    pub fn pixel_to_coordinate(&self, column: f64, row: f64) -> Coordinate2D {
        Coordinate2D::new(
            self.origin_coordinate.x + column * self.x_pixel_size,
            self.origin_coordinate.y + row * self.y_pixel_size,
        )
    }

    /// Transforms an SRS coordinate (x,y) into the fractional pixel position (column, row)
    pub fn coordinate_to_pixel(&self, coordinate: Coordinate2D) -> (f64, f64) {
        (
            (coordinate.x - self.origin_coordinate.x) / self.x_pixel_size,
            (coordinate.y - self.origin_coordinate.y) / self.y_pixel_size,
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0)
    }
}

impl From<GdalGeoTransform> for GeoTransform {
    fn from(gdal_geo_transform: GdalGeoTransform) -> Self {
        Self::new_with_coordinate_x_y(
            gdal_geo_transform[0],
            gdal_geo_transform[1],
            // gdal_geo_transform[2],
            gdal_geo_transform[3],
            // gdal_geo_transform[4],
            gdal_geo_transform[5],
        )
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            0.0, // x rotation
            geo_transform.origin_coordinate.y,
            0.0, // y rotation
            geo_transform.y_pixel_size,
        ]
    }
}
