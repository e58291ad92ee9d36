mod mock_transform_engine;
mod mock_zone_source;

pub use mock_transform_engine::*;
pub use mock_zone_source::*;
