pub mod crs_definitions;
pub mod helpers;
mod result;

pub use result::Result;
