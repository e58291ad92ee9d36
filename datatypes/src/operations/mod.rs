mod transform_engine;

pub use transform_engine::{CoordinateTransformEngine, WarpRequest, WarpedRaster};
