use super::ZoneMask;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// Summary of the valid cell values of one zone. Statistics that are undefined
/// for the number of values are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonalStatistics {
    pub id: String,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub first_quartile: f64,
    pub third_quartile: f64,
    pub pct_cells_greater_than_zero: f64,
    pub pct_cells_greater_than_first_quartile: f64,
}

impl ZonalStatistics {
    pub fn undefined(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            average: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            median: f64::NAN,
            first_quartile: f64::NAN,
            third_quartile: f64::NAN,
            pct_cells_greater_than_zero: f64::NAN,
            pct_cells_greater_than_first_quartile: f64::NAN,
        }
    }
}

impl Default for ZonalStatistics {
    fn default() -> Self {
        Self::undefined(String::new())
    }
}

/// Computes the statistics of the cells marked in the mask.
///
/// No-data and `NaN` values are ignored. The median needs two values, the quartiles four.
/// Quartiles are not interpolated: `q1 = sorted[(n + 1) / 4]` and `q3 = sorted[3 * (n + 1) / 4]`.
///
/// # Errors
/// This function fails if the mask and the data differ in length.
#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
pub fn statistics_for(mask: &ZoneMask, data: &[f32], no_data: f32) -> Result<ZonalStatistics> {
    ensure!(
        mask.len() == data.len(),
        error::MaskLengthMismatch {
            mask_length: mask.len(),
            raster_length: data.len(),
        }
    );

    let mut values: Vec<f64> = mask
        .bits()
        .iter()
        .zip(data)
        .filter(|&(&in_zone, &value)| in_zone && value != no_data && !value.is_nan())
        .map(|(_, &value)| f64::from(value))
        .collect();
    values.sort_unstable_by(f64::total_cmp);

    let mut statistics = ZonalStatistics::undefined(mask.zone_id());

    let count = values.len();
    if count == 0 {
        return Ok(statistics);
    }

    let percentage_greater_than = |threshold: f64| {
        100. * values.iter().filter(|&&v| v > threshold).count() as f64 / count as f64
    };

    statistics.average = values.iter().sum::<f64>() / count as f64;
    statistics.min = values[0];
    statistics.max = values[count - 1];
    statistics.pct_cells_greater_than_zero = percentage_greater_than(0.);

    if count >= 2 {
        statistics.median = if count % 2 == 0 {
            (values[count / 2 - 1] + values[count / 2]) / 2.
        } else {
            values[count / 2]
        };
    }

    if count >= 4 {
        statistics.first_quartile = values[(count + 1) / 4];
        statistics.third_quartile = values[3 * (count + 1) / 4];
        statistics.pct_cells_greater_than_first_quartile =
            percentage_greater_than(statistics.first_quartile);
    }

    Ok(statistics)
}
