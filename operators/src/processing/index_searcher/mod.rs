mod coordinates;
mod registry;
mod ring;

pub use coordinates::{AxisEdges, GridCoordinates};
pub use registry::IndexSearcherRegistry;

use crate::util::config::{self, get_config_element};
use crate::util::{Result, safe_lock_mutex};
use hydrogrid_datatypes::primitives::{Coordinate2D, Envelope};
use lru::LruCache;
use ordered_float::OrderedFloat;
use ring::PreparedRing;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::{debug, trace};

type PointKey = (OrderedFloat<f64>, OrderedFloat<f64>);

/// Where the previous lookup of a caller ended.
///
/// Consecutive queries are usually close to each other, so the scan for the
/// next query starts at the last hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchHint {
    last_index: usize,
}

impl SearchHint {
    pub fn last_index(&self) -> usize {
        self.last_index
    }
}

/// Finds the cell of an irregular grid that contains a coordinate.
///
/// Every cell is a quadrilateral of its four corners, cell `i` is at row `i / nx` and column `i % nx`.
pub struct IndexSearcher {
    coordinates: GridCoordinates,
    nx: usize,
    ny: usize,
    cells: Vec<PreparedRing>,
    domain: PreparedRing,
    point_cache: Mutex<LruCache<PointKey, Option<usize>>>,
}

impl IndexSearcher {
    /// Builds the cell polygons, with a point cache capacity from the `index_searcher` settings
    ///
    /// # Errors
    ///
    /// Fails for unsupported coordinate layouts or if the settings cannot be read
    ///
    pub fn new(coordinates: GridCoordinates) -> Result<Self> {
        let settings = get_config_element::<config::IndexSearcher>()?;
        let capacity =
            NonZeroUsize::new(settings.point_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Self::with_point_cache_capacity(coordinates, capacity)
    }

    pub fn with_point_cache_capacity(
        coordinates: GridCoordinates,
        point_cache_capacity: NonZeroUsize,
    ) -> Result<Self> {
        let (nx, ny) = coordinates.cell_dimensions()?;

        let cells = (0..ny)
            .flat_map(|row| (0..nx).map(move |col| (col, row)))
            .map(|(col, row)| {
                PreparedRing::new(vec![
                    coordinates.corner(col, row),
                    coordinates.corner(col + 1, row),
                    coordinates.corner(col + 1, row + 1),
                    coordinates.corner(col, row + 1),
                ])
            })
            .collect();

        let domain = PreparedRing::new(perimeter(&coordinates, nx, ny));

        debug!("built index of {nx}x{ny} cells");

        Ok(Self {
            coordinates,
            nx,
            ny,
            cells,
            domain,
            point_cache: Mutex::new(LruCache::new(point_cache_capacity)),
        })
    }

    pub fn coordinates(&self) -> &GridCoordinates {
        &self.coordinates
    }

    /// The number of cells along x and y
    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The area covered by all cells
    pub fn domain(&self) -> geo::Polygon<f64> {
        self.domain.to_polygon()
    }

    pub fn bounds(&self) -> Envelope {
        *self.domain.bounds()
    }

    pub fn cell_polygon(&self, index: usize) -> Option<geo::Polygon<f64>> {
        self.cells.get(index).map(PreparedRing::to_polygon)
    }

    /// The index of the cell containing the coordinate, `None` outside the grid
    pub fn index_of(&self, coordinate: Coordinate2D, hint: &mut SearchHint) -> Option<usize> {
        let key = (OrderedFloat(coordinate.x), OrderedFloat(coordinate.y));

        if let Some(&index) = safe_lock_mutex(&self.point_cache).get(&key) {
            trace!("point cache hit for {coordinate}");
            if let Some(index) = index {
                hint.last_index = index;
            }
            return index;
        }

        if !self.domain.contains(coordinate) {
            return None;
        }

        let start = hint.last_index.min(self.cells.len().saturating_sub(1));
        let index = (0..self.cells.len())
            .map(|offset| (start + offset) % self.cells.len())
            .find(|&index| self.cells[index].contains(coordinate));

        if let Some(index) = index {
            hint.last_index = index;
        }

        safe_lock_mutex(&self.point_cache).put(key, index);

        index
    }

    /// Looks up a batch of coordinates, sharing one hint
    pub fn index_of_all<I>(&self, coordinates: I) -> Vec<Option<usize>>
    where
        I: IntoIterator<Item = Coordinate2D>,
    {
        let mut hint = SearchHint::default();
        coordinates
            .into_iter()
            .map(|coordinate| self.index_of(coordinate, &mut hint))
            .collect()
    }

    pub fn cached_points(&self) -> usize {
        safe_lock_mutex(&self.point_cache).len()
    }
}

/// The outline of the corner lattice, clockwise in lattice space
fn perimeter(coordinates: &GridCoordinates, nx: usize, ny: usize) -> Vec<Coordinate2D> {
    let top = (0..=nx).map(|col| (col, 0));
    let right = (1..=ny).map(|row| (nx, row));
    let bottom = (0..nx).rev().map(|col| (col, ny));
    let left = (1..ny).rev().map(|row| (0, row));

    top.chain(right)
        .chain(bottom)
        .chain(left)
        .map(|(col, row)| coordinates.corner(col, row))
        .collect()
}

impl std::fmt::Debug for IndexSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSearcher")
            .field("nx", &self.nx)
            .field("ny", &self.ny)
            .field("bounds", self.domain.bounds())
            .finish_non_exhaustive()
    }
}
