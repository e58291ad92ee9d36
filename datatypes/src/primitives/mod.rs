mod coordinate;
mod envelope;
mod units;

pub use coordinate::Coordinate2D;
pub use envelope::Envelope;
pub use units::{CellSizeUnit, CrsUnit, UnitKind};
