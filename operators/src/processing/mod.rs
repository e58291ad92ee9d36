pub mod index_searcher;
pub mod reprojection;
mod resampler;
mod subsetter;
pub mod zonal_statistics;

pub use index_searcher::{
    AxisEdges, GridCoordinates, IndexSearcher, IndexSearcherRegistry, SearchHint,
};
pub use reprojection::Reprojector;
pub use resampler::{Resampler, ResamplerBuilder};
pub use subsetter::{PixelWindow, Subsetter, SubsetterBuilder};
pub use zonal_statistics::{ZonalStatistics, ZonalStatisticsCalculator, ZoneMask, statistics_for};
