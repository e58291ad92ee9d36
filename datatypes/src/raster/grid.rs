use super::{GeoTransform, GridCell};
use crate::error;
use crate::primitives::{Coordinate2D, Envelope};
use crate::spatial_reference::SpatialReference;
use crate::util::Result;
use crate::util::helpers::float_key;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

/// The geometry of a regular raster: origin, signed cell size, dimensions and reference system.
///
/// Cells are addressed in row-major order, index `i` is row `i / nx` and column `i % nx`.
/// A `Grid` is an immutable value, every transformation returns a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GridDef")]
pub struct Grid {
    origin_x: f64,
    origin_y: f64,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
    crs: SpatialReference,
}

/// The unchecked wire form of a [`Grid`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridDef {
    origin_x: f64,
    origin_y: f64,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
    crs: SpatialReference,
}

impl TryFrom<GridDef> for Grid {
    type Error = error::Error;

    fn try_from(def: GridDef) -> Result<Self> {
        Self::new(def.origin_x, def.origin_y, def.dx, def.dy, def.nx, def.ny, def.crs)
    }
}

impl Grid {
    /// Creates a new grid
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::raster::Grid;
    /// use hydrogrid_datatypes::spatial_reference::SpatialReference;
    ///
    /// let grid = Grid::new(0.0, 0.0, 10.0, -10.0, 5, 4, SpatialReference::wgs84()).unwrap();
    ///
    /// assert_eq!(grid.len(), 20);
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the origin or the cell size are not finite or a cell size is zero
    ///
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
        crs: SpatialReference,
    ) -> Result<Self> {
        ensure!(
            origin_x.is_finite() && origin_y.is_finite(),
            error::InvalidGrid {
                description: "the origin must be finite",
            }
        );
        ensure!(
            dx.is_finite() && dy.is_finite() && dx != 0. && dy != 0.,
            error::InvalidGrid {
                description: "the cell size must be finite and non-zero",
            }
        );
        ensure!(
            nx.checked_mul(ny).is_some(),
            error::InvalidGrid {
                description: "the number of cells overflows",
            }
        );

        Ok(Self {
            origin_x,
            origin_y,
            dx,
            dy,
            nx,
            ny,
            crs,
        })
    }

    pub fn from_geo_transform(
        geo_transform: GeoTransform,
        nx: usize,
        ny: usize,
        crs: SpatialReference,
    ) -> Result<Self> {
        Self::new(
            geo_transform.origin_coordinate.x,
            geo_transform.origin_coordinate.y,
            geo_transform.x_pixel_size,
            geo_transform.y_pixel_size,
            nx,
            ny,
            crs,
        )
    }

    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn crs(&self) -> &SpatialReference {
        &self.crs
    }

    /// The number of cells
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn geo_transform(&self) -> GeoTransform {
        GeoTransform::new_with_coordinate_x_y(self.origin_x, self.dx, self.origin_y, self.dy)
    }

    /// The extent covered by all cells
    pub fn envelope(&self) -> Envelope {
        let far_x = self.origin_x + self.nx as f64 * self.dx;
        let far_y = self.origin_y + self.ny as f64 * self.dy;

        Envelope::new_unchecked(
            self.origin_x.min(far_x),
            self.origin_x.max(far_x),
            self.origin_y.min(far_y),
            self.origin_y.max(far_y),
        )
    }

    /// Enumerates all cells lazily in row-major order
    pub fn cells(&self) -> Cells<'_> {
        Cells {
            grid: self,
            front: 0,
            back: self.len(),
        }
    }

    /// The cell at a row-major index
    pub fn cell(&self, index: usize) -> Option<GridCell> {
        (index < self.len()).then(|| self.cell_unchecked(index))
    }

    fn cell_unchecked(&self, index: usize) -> GridCell {
        let (row, col) = (index / self.nx, index % self.nx);

        let x_0 = self.origin_x + col as f64 * self.dx;
        let x_1 = self.origin_x + (col + 1) as f64 * self.dx;
        let y_0 = self.origin_y + row as f64 * self.dy;
        let y_1 = self.origin_y + (row + 1) as f64 * self.dy;

        GridCell {
            index,
            min_x: x_0.min(x_1),
            max_x: x_0.max(x_1),
            min_y: y_0.min(y_1),
            max_y: y_0.max(y_1),
        }
    }

    /// The center of the cell at a row-major index
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::raster::Grid;
    /// use hydrogrid_datatypes::spatial_reference::SpatialReference;
    ///
    /// let grid = Grid::new(0.0, 0.0, 10.0, -10.0, 5, 4, SpatialReference::wgs84()).unwrap();
    ///
    /// assert_eq!(grid.point_at(0), Some((5.0, -5.0).into()));
    /// assert_eq!(grid.point_at(6), Some((15.0, -15.0).into()));
    /// assert_eq!(grid.point_at(20), None);
    /// ```
    pub fn point_at(&self, index: usize) -> Option<Coordinate2D> {
        if index >= self.len() {
            return None;
        }

        let (row, col) = (index / self.nx, index % self.nx);

        Some(
            self.geo_transform()
                .pixel_to_coordinate(col as f64 + 0.5, row as f64 + 0.5),
        )
    }

    /// The row-major index of the cell containing the coordinate.
    /// Cells are half-open, a coordinate on a shared grid line belongs to the cell with the larger minimum.
    pub fn index_of(&self, coordinate: Coordinate2D) -> Option<usize> {
        let col = axis_index(coordinate.x - self.origin_x, self.dx, self.nx)?;
        let row = axis_index(coordinate.y - self.origin_y, self.dy, self.ny)?;

        Some(row * self.nx + col)
    }

    /// Returns a new grid with the origin translated by `(dx, dy)`
    #[must_use]
    pub fn shift(&self, dx: f64, dy: f64) -> Self {
        Self {
            origin_x: self.origin_x + dx,
            origin_y: self.origin_y + dy,
            ..self.clone()
        }
    }

    /// Returns the same geometry in another reference system
    #[must_use]
    pub fn with_crs(&self, crs: SpatialReference) -> Self {
        Self {
            crs,
            ..self.clone()
        }
    }
}

/// The cell position along one axis, `None` outside of `0..n`
fn axis_index(offset: f64, cell_size: f64, n: usize) -> Option<usize> {
    let position = offset / cell_size;

    // with a negative cell size the minimum bound of a cell is its far edge
    let index = if cell_size > 0. {
        position.floor()
    } else {
        position.ceil() - 1.
    };

    (index >= 0. && index < n as f64).then_some(index as usize)
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        float_key(self.origin_x) == float_key(other.origin_x)
            && float_key(self.origin_y) == float_key(other.origin_y)
            && float_key(self.dx) == float_key(other.dx)
            && float_key(self.dy) == float_key(other.dy)
            && self.nx == other.nx
            && self.ny == other.ny
            && self.crs == other.crs
    }
}

impl Eq for Grid {}

impl Hash for Grid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        float_key(self.origin_x).hash(state);
        float_key(self.origin_y).hash(state);
        float_key(self.dx).hash(state);
        float_key(self.dy).hash(state);
        self.nx.hash(state);
        self.ny.hash(state);
        self.crs.hash(state);
    }
}

/// Lazy row-major iterator over the cells of a [`Grid`]
#[derive(Debug, Clone)]
pub struct Cells<'g> {
    grid: &'g Grid,
    front: usize,
    back: usize,
}

impl Iterator for Cells<'_> {
    type Item = GridCell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        let cell = self.grid.cell_unchecked(self.front);
        self.front += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.front = self.front.saturating_add(n).min(self.back);
        self.next()
    }
}

impl DoubleEndedIterator for Cells<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }

        self.back -= 1;
        Some(self.grid.cell_unchecked(self.back))
    }
}

impl ExactSizeIterator for Cells<'_> {}

impl FusedIterator for Cells<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid() -> Grid {
        Grid::new(0.0, 0.0, 10.0, -10.0, 5, 4, SpatialReference::wgs84()).unwrap()
    }

    #[test]
    fn it_enumerates_all_cells() {
        let grid = grid();

        let cells: Vec<GridCell> = grid.cells().collect();

        assert_eq!(cells.len(), 20);
        assert_eq!(grid.cells().len(), 20);

        let union = cells
            .iter()
            .map(GridCell::envelope)
            .reduce(|a, b| a.union(&b))
            .unwrap();
        assert_eq!(union, Envelope::new(0.0, 50.0, -40.0, 0.0).unwrap());
        assert_eq!(union, grid.envelope());
    }

    #[test]
    fn cells_are_row_major() {
        let grid = grid();

        for (i, cell) in grid.cells().enumerate() {
            assert_eq!(cell.index, i);
            assert_eq!(Some(cell.center()), grid.point_at(i));
        }

        let cell = grid.cell(7).unwrap();
        assert_eq!(
            cell,
            GridCell {
                index: 7,
                min_x: 20.0,
                max_x: 30.0,
                min_y: -20.0,
                max_y: -10.0,
            }
        );
        assert_eq!(grid.cell(20), None);
    }

    #[test]
    fn cells_can_be_iterated_from_both_ends() {
        let grid = grid();
        let mut cells = grid.cells();

        assert_eq!(cells.next_back().map(|c| c.index), Some(19));
        assert_eq!(cells.nth(2).map(|c| c.index), Some(2));
        assert_eq!(cells.len(), 16);
    }

    #[test]
    fn point_at_is_the_cell_center() {
        let grid = grid();

        assert_eq!(grid.point_at(0), Some(Coordinate2D::new(5.0, -5.0)));
        assert_eq!(grid.point_at(19), Some(Coordinate2D::new(45.0, -35.0)));
    }

    #[test]
    fn index_of_inverts_point_at() {
        let grid = grid();

        for i in 0..grid.len() {
            assert_eq!(grid.index_of(grid.point_at(i).unwrap()), Some(i));
        }

        assert_eq!(grid.index_of((-0.1, -5.0).into()), None);
        assert_eq!(grid.index_of((50.0, -5.0).into()), None);
        assert_eq!(grid.index_of((5.0, 0.0).into()), None);
    }

    #[test]
    fn index_of_agrees_with_cell_containment() {
        let grid = grid();

        for point in [(10.0, -10.0), (0.0, -40.0), (49.99, -0.01), (20.0, -35.0)] {
            let point = Coordinate2D::from(point);
            let containing: Vec<usize> = grid
                .cells()
                .filter(|cell| cell.contains(point))
                .map(|cell| cell.index)
                .collect();

            assert_eq!(containing.len(), 1, "{point}");
            assert_eq!(grid.index_of(point), Some(containing[0]), "{point}");
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn cells_work_for_any_cell_size_sign() {
        let grid = Grid::new(50.0, -40.0, -10.0, 10.0, 5, 4, SpatialReference::wgs84()).unwrap();

        let cell = grid.cell(0).unwrap();
        assert_eq!(cell.min_x, 40.0);
        assert_eq!(cell.max_x, 50.0);
        assert_eq!(cell.min_y, -40.0);
        assert_eq!(cell.max_y, -30.0);

        assert_eq!(grid.envelope(), Envelope::new(0.0, 50.0, -40.0, 0.0).unwrap());
        assert_eq!(grid.index_of((45.0, -35.0).into()), Some(0));
        assert_eq!(grid.index_of((40.0, -40.0).into()), Some(0));
        assert_eq!(grid.index_of((50.0, -35.0).into()), None);
    }

    #[test]
    fn shift_returns_a_new_grid() {
        let grid = grid();
        let cells_before: Vec<GridCell> = grid.cells().collect();

        let shifted = grid.shift(5.0, -5.0);

        assert_eq!(grid.cells().collect::<Vec<_>>(), cells_before);
        assert_eq!(shifted.point_at(0), Some((10.0, -10.0).into()));
        assert_eq!(
            shifted.cells().next().map(|c| c.envelope()),
            Some(Envelope::new(5.0, 15.0, -15.0, -5.0).unwrap())
        );
        assert_ne!(shifted, grid);
    }

    #[test]
    fn grids_compare_and_hash_by_value() {
        let a = grid();
        let b = Grid::new(0.0, -0.0, 10.0, -10.0, 5, 4, SpatialReference::wgs84()).unwrap();

        assert_eq!(a, b);

        let set: HashSet<Grid> = [a.clone(), b, a.shift(1.0, 0.0)].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_ne!(a, a.with_crs(SpatialReference::from_epsg(5070).unwrap()));
    }

    #[test]
    fn new_rejects_invalid_geometry() {
        let crs = SpatialReference::wgs84();

        assert!(Grid::new(0.0, 0.0, 0.0, -1.0, 1, 1, crs.clone()).is_err());
        assert!(Grid::new(0.0, 0.0, 1.0, f64::NAN, 1, 1, crs.clone()).is_err());
        assert!(Grid::new(f64::INFINITY, 0.0, 1.0, -1.0, 1, 1, crs.clone()).is_err());
        assert!(Grid::new(0.0, 0.0, 1.0, -1.0, 0, 0, crs).unwrap().is_empty());
    }

    #[test]
    fn geo_transform_round_trip() {
        let grid = grid();

        let rebuilt =
            Grid::from_geo_transform(grid.geo_transform(), 5, 4, grid.crs().clone()).unwrap();

        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn deserialization_validates() {
        let grid = grid();
        let mut json = serde_json::to_value(&grid).unwrap();

        assert_eq!(serde_json::from_value::<Grid>(json.clone()).unwrap(), grid);

        json["dy"] = serde_json::json!(0.0);
        assert!(serde_json::from_value::<Grid>(json).is_err());
    }
}
