use super::Grid;
use crate::error;
use crate::util::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// The time span a raster snapshot is valid for. An instantaneous value has no end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExtent {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeExtent {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn instant(time: DateTime<Utc>) -> Self {
        Self::new(time, None)
    }
}

/// Descriptive fields that geometry operations pass through unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub name: String,
    pub description: String,
    pub units: String,
    pub time: Option<TimeExtent>,
}

/// A grid together with its row-major cell values.
/// Deserialization checks the data length like [`RasterValue::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RasterValueDef")]
pub struct RasterValue {
    grid: Grid,
    data: Vec<f32>,
    no_data: f32,
    provenance: Provenance,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RasterValueDef {
    grid: Grid,
    data: Vec<f32>,
    no_data: f32,
    #[serde(default)]
    provenance: Provenance,
}

impl TryFrom<RasterValueDef> for RasterValue {
    type Error = error::Error;

    fn try_from(def: RasterValueDef) -> Result<Self> {
        Self::new(def.grid, def.data, def.no_data, def.provenance)
    }
}

impl RasterValue {
    /// Creates a new raster
    ///
    /// # Errors
    ///
    /// This constructor fails if the data does not hold exactly one value per cell
    ///
    pub fn new(grid: Grid, data: Vec<f32>, no_data: f32, provenance: Provenance) -> Result<Self> {
        ensure!(
            data.len() == grid.len(),
            error::DimensionCapacityDoesNotMatchDataCapacity {
                dimension_cap: grid.len(),
                data_cap: data.len(),
            }
        );

        Ok(Self {
            grid,
            data,
            no_data,
            provenance,
        })
    }

    /// A raster with every cell set to the no-data value
    pub fn new_no_data(grid: Grid, no_data: f32, provenance: Provenance) -> Self {
        let data = vec![no_data; grid.len()];
        Self {
            grid,
            data,
            no_data,
            provenance,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn no_data(&self) -> f32 {
        self.no_data
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// The value at a pixel position, `None` outside the grid
    pub fn value_at(&self, column: usize, row: usize) -> Option<f32> {
        if column >= self.grid.nx() || row >= self.grid.ny() {
            return None;
        }
        self.data.get(row * self.grid.nx() + column).copied()
    }

    /// Checks a value against the no-data sentinel. A `NaN` sentinel matches every `NaN`.
    #[allow(clippy::float_cmp)]
    pub fn is_no_data(&self, value: f32) -> bool {
        value == self.no_data || (self.no_data.is_nan() && value.is_nan())
    }

    /// A new raster with another geometry and data but the same no-data value and provenance
    pub fn derive(&self, grid: Grid, data: Vec<f32>) -> Result<Self> {
        Self::new(grid, data, self.no_data, self.provenance.clone())
    }
}
