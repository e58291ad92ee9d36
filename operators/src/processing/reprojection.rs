use crate::util::Result;
use geo::MultiPolygon;
use hydrogrid_datatypes::operations::CoordinateTransformEngine;
use hydrogrid_datatypes::primitives::Envelope;
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reprojects envelopes and geometries between two reference systems.
///
/// If both systems are the same the input is returned untouched.
/// Descriptors the engine cannot parse are reported but the transformation is still attempted.
#[derive(Clone)]
pub struct Reprojector {
    engine: Arc<dyn CoordinateTransformEngine>,
}

impl Reprojector {
    pub fn new(engine: Arc<dyn CoordinateTransformEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn CoordinateTransformEngine> {
        &self.engine
    }

    #[tracing::instrument(level = "trace", skip(self, from, to))]
    pub fn reproject_envelope(
        &self,
        envelope: &Envelope,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Envelope> {
        if self.is_noop(from, to) {
            return Ok(*envelope);
        }

        Ok(self.engine.transform_envelope(envelope, from, to)?)
    }

    pub fn reproject_geometry(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<MultiPolygon<f64>> {
        if self.is_noop(from, to) {
            return Ok(geometry.clone());
        }

        Ok(self.engine.transform_geometry(geometry, from, to)?)
    }

    fn is_noop(&self, from: &SpatialReference, to: &SpatialReference) -> bool {
        if self.engine.is_same_crs(from, to) {
            debug!("source and target reference system are the same, skipping reprojection");
            return true;
        }

        self.validate(from, "source");
        self.validate(to, "target");

        false
    }

    fn validate(&self, crs: &SpatialReference, role: &str) {
        if let Err(error) = self.engine.parse_crs(crs) {
            warn!("invalid {role} reference system, attempting reprojection anyway: {error}");
        }
    }
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector").finish_non_exhaustive()
    }
}
