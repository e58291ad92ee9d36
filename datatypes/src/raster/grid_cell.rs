use crate::primitives::{Coordinate2D, Envelope};
use serde::{Deserialize, Serialize};

/// The bounds of one cell of a [`Grid`](super::Grid) together with its row-major index
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub index: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl GridCell {
    /// Half-open containment: the minimum bounds are inclusive, the maximum bounds exclusive.
    /// A point on a grid line shared by two cells belongs to exactly one of them.
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::raster::GridCell;
    ///
    /// let cell = GridCell { index: 0, min_x: 0.0, max_x: 10.0, min_y: 0.0, max_y: 10.0 };
    ///
    /// assert!(cell.contains((0.0, 0.0).into()));
    /// assert!(!cell.contains((10.0, 5.0).into()));
    /// ```
    pub fn contains(&self, coordinate: Coordinate2D) -> bool {
        (self.min_x..self.max_x).contains(&coordinate.x)
            && (self.min_y..self.max_y).contains(&coordinate.y)
    }

    /// Strict containment, points on the cell boundary are outside
    pub fn contains_interior(&self, coordinate: Coordinate2D) -> bool {
        self.min_x < coordinate.x
            && coordinate.x < self.max_x
            && self.min_y < coordinate.y
            && coordinate.y < self.max_y
    }

    pub fn center(&self) -> Coordinate2D {
        Coordinate2D::new(
            (self.min_x + self.max_x) / 2.,
            (self.min_y + self.max_y) / 2.,
        )
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::new_unchecked(self.min_x, self.max_x, self.min_y, self.max_y)
    }
}
