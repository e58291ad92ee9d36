mod envelope_reprojection_cache;

pub use envelope_reprojection_cache::{EnvelopeReprojectionCache, EnvelopeReprojectionKey};
