use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

const METERS_PER_FOOT: f64 = 0.3048;

/// The unit a requested target cell size is stated in
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum CellSizeUnit {
    #[default]
    #[serde(rename = "meters", alias = "Meters", alias = "m")]
    #[strum(to_string = "meters", serialize = "Meters", serialize = "m")]
    Meters,
    #[serde(rename = "feet", alias = "Feet", alias = "ft")]
    #[strum(to_string = "feet", serialize = "Feet", serialize = "ft")]
    Feet,
}

impl CellSizeUnit {
    pub fn key(self) -> &'static str {
        match self {
            CellSizeUnit::Meters => "meters",
            CellSizeUnit::Feet => "feet",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CellSizeUnit::Meters => "Meters",
            CellSizeUnit::Feet => "Feet",
        }
    }

    pub fn meters_per_unit(self) -> f64 {
        match self {
            CellSizeUnit::Meters => 1.0,
            CellSizeUnit::Feet => METERS_PER_FOOT,
        }
    }

    /// Converts a length in this unit into the given CRS unit.
    /// Returns `None` if the CRS unit is not a length.
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::primitives::{CellSizeUnit, CrsUnit};
    ///
    /// let size = CellSizeUnit::Feet.convert_to(1000.0, &CrsUnit::metre()).unwrap();
    ///
    /// assert!((size - 304.8).abs() < 1e-9);
    /// ```
    pub fn convert_to(self, value: f64, unit: &CrsUnit) -> Option<f64> {
        match unit.kind {
            UnitKind::Linear if unit.to_base > 0. => {
                Some(value * self.meters_per_unit() / unit.to_base)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Linear,
    Angular,
}

/// The unit of a reference system's coordinates.
/// `to_base` is meters per unit for linear and radians per unit for angular units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrsUnit {
    pub name: String,
    pub kind: UnitKind,
    pub to_base: f64,
}

impl CrsUnit {
    pub fn new(name: impl Into<String>, kind: UnitKind, to_base: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            to_base,
        }
    }

    pub fn metre() -> Self {
        Self::new("metre", UnitKind::Linear, 1.0)
    }

    pub fn degree() -> Self {
        Self::new("degree", UnitKind::Angular, std::f64::consts::PI / 180.)
    }

    pub fn is_linear(&self) -> bool {
        self.kind == UnitKind::Linear
    }

    /// Two units match if they measure the same dimension with the same scale.
    /// Names are ignored, `metre` and `meter` are the same unit.
    pub fn matches(&self, other: &Self) -> bool {
        self.kind == other.kind
            && float_cmp::approx_eq!(f64, self.to_base, other.to_base, epsilon = 1e-12)
    }
}
