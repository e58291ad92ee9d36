use crate::error;
use crate::util::Result;
use hydrogrid_datatypes::primitives::Coordinate2D;
use hydrogrid_datatypes::raster::Grid;
use ordered_float::OrderedFloat;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::hash::{Hash, Hasher};

/// The cell edges along one coordinate axis.
///
/// Edges are compared and hashed by value with `-0.0` equal to `0.0` and all `NaN`s equal,
/// so fill values in curvilinear corner arrays do not break lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisEdges {
    /// `n + 1` edges for `n` cells, shared by every row (or column)
    Separable(Vec<f64>),
    /// One value per cell corner, `rows * cols` values in row-major order
    Curvilinear {
        edges: Vec<f64>,
        rows: usize,
        cols: usize,
    },
}

impl PartialEq for AxisEdges {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Separable(a), Self::Separable(b)) => same_edges(a, b),
            (
                Self::Curvilinear {
                    edges: a,
                    rows: a_rows,
                    cols: a_cols,
                },
                Self::Curvilinear {
                    edges: b,
                    rows: b_rows,
                    cols: b_cols,
                },
            ) => a_rows == b_rows && a_cols == b_cols && same_edges(a, b),
            _ => false,
        }
    }
}

impl Eq for AxisEdges {}

impl Hash for AxisEdges {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Separable(edges) => {
                state.write_u8(0);
                hash_edges(state, edges);
            }
            Self::Curvilinear { edges, rows, cols } => {
                state.write_u8(1);
                rows.hash(state);
                cols.hash(state);
                hash_edges(state, edges);
            }
        }
    }
}

fn same_edges(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(&a, &b)| OrderedFloat(a) == OrderedFloat(b))
}

fn hash_edges<H: Hasher>(state: &mut H, edges: &[f64]) {
    edges.len().hash(state);
    for &edge in edges {
        OrderedFloat(edge).hash(state);
    }
}

/// The corner coordinates of a (possibly irregular) grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoordinates {
    pub x: AxisEdges,
    pub y: AxisEdges,
}

impl GridCoordinates {
    pub fn new(x: AxisEdges, y: AxisEdges) -> Self {
        Self { x, y }
    }

    /// Separable edges of a regular grid
    pub fn from_grid(grid: &Grid) -> Self {
        let edges = |origin: f64, d: f64, n: usize| {
            (0..=n).map(|i| origin + i as f64 * d).collect::<Vec<_>>()
        };

        Self {
            x: AxisEdges::Separable(edges(grid.origin_x(), grid.dx(), grid.nx())),
            y: AxisEdges::Separable(edges(grid.origin_y(), grid.dy(), grid.ny())),
        }
    }

    /// The number of cells along x and y
    ///
    /// # Errors
    ///
    /// Fails for mixed layouts, curvilinear arrays of different shape or too few edges
    ///
    pub fn cell_dimensions(&self) -> Result<(usize, usize)> {
        match (&self.x, &self.y) {
            (AxisEdges::Separable(x), AxisEdges::Separable(y)) => {
                ensure!(
                    x.len() >= 2 && y.len() >= 2,
                    error::InvalidAxisLayout {
                        reason: format!(
                            "separable axes need at least two edges, got {} and {}",
                            x.len(),
                            y.len()
                        ),
                    }
                );
                Ok((x.len() - 1, y.len() - 1))
            }
            (
                AxisEdges::Curvilinear {
                    edges: x,
                    rows: x_rows,
                    cols: x_cols,
                },
                AxisEdges::Curvilinear {
                    edges: y,
                    rows: y_rows,
                    cols: y_cols,
                },
            ) => {
                ensure!(
                    x_rows == y_rows && x_cols == y_cols,
                    error::InvalidAxisLayout {
                        reason: format!(
                            "curvilinear axes differ in shape ({x_rows}x{x_cols} and {y_rows}x{y_cols})"
                        ),
                    }
                );
                ensure!(
                    *x_rows >= 2 && *x_cols >= 2,
                    error::InvalidAxisLayout {
                        reason: format!(
                            "curvilinear axes need at least 2x2 corners, got {x_rows}x{x_cols}"
                        ),
                    }
                );
                ensure!(
                    x.len() == x_rows * x_cols && y.len() == x_rows * x_cols,
                    error::InvalidAxisLayout {
                        reason: format!(
                            "expected {} corners per axis, got {} and {}",
                            x_rows * x_cols,
                            x.len(),
                            y.len()
                        ),
                    }
                );
                Ok((x_cols - 1, x_rows - 1))
            }
            _ => error::InvalidAxisLayout {
                reason: "separable and curvilinear axes cannot be mixed".to_string(),
            }
            .fail(),
        }
    }

    /// The corner at column `col` and row `row` of the corner lattice.
    /// The layout must have been checked with [`Self::cell_dimensions`].
    pub(crate) fn corner(&self, col: usize, row: usize) -> Coordinate2D {
        match (&self.x, &self.y) {
            (AxisEdges::Separable(x), AxisEdges::Separable(y)) => {
                Coordinate2D::new(x[col], y[row])
            }
            (
                AxisEdges::Curvilinear { edges: x, cols, .. },
                AxisEdges::Curvilinear { edges: y, .. },
            ) => {
                let i = row * cols + col;
                Coordinate2D::new(x[i], y[i])
            }
            _ => Coordinate2D::new(f64::NAN, f64::NAN),
        }
    }

    /// A hash of the layout and every edge value, equal coordinates have equal fingerprints
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
