use serde::{Deserialize, Serialize};

/// Marks the cells of one grid that belong to a zone, in the grid's row-major order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMask {
    zone_id: String,
    bits: Vec<bool>,
}

impl ZoneMask {
    pub fn new(zone_id: impl Into<String>, bits: Vec<bool>) -> Self {
        Self {
            zone_id: zone_id.into(),
            bits,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The number of cells in the zone
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    /// The indices of the cells in the zone
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(index, &bit)| bit.then_some(index))
    }
}
