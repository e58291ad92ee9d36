use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How cell values are computed when a raster is warped onto another grid
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
pub enum ResamplingMethod {
    #[default]
    #[serde(rename = "near", alias = "nearest", alias = "Nearest Neighbor")]
    #[strum(to_string = "near", serialize = "nearest", serialize = "Nearest Neighbor")]
    Nearest,
    #[serde(rename = "bilinear", alias = "Bilinear")]
    #[strum(to_string = "bilinear", serialize = "Bilinear")]
    Bilinear,
    #[serde(rename = "average", alias = "Average")]
    #[strum(to_string = "average", serialize = "Average")]
    Average,
}

impl ResamplingMethod {
    /// The canonical key, as understood by `gdalwarp -r`
    pub fn key(self) -> &'static str {
        match self {
            ResamplingMethod::Nearest => "near",
            ResamplingMethod::Bilinear => "bilinear",
            ResamplingMethod::Average => "average",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ResamplingMethod::Nearest => "Nearest Neighbor",
            ResamplingMethod::Bilinear => "Bilinear",
            ResamplingMethod::Average => "Average",
        }
    }
}
