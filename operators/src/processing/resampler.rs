use crate::cache::EnvelopeReprojectionCache;
use crate::error;
use crate::util::Result;
use crate::util::config::{self, get_config_element};
use hydrogrid_datatypes::operations::WarpRequest;
use hydrogrid_datatypes::primitives::{CellSizeUnit, CrsUnit, Envelope};
use hydrogrid_datatypes::raster::{RasterValue, ResamplingMethod};
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use snafu::OptionExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reprojects and resizes a raster, optionally clipped to an envelope.
///
/// The clip envelope is snapped outward to multiples of the target cell size, so rasters that are
/// resampled independently to the same cell size stay pixel-aligned.
#[derive(Debug, Clone)]
pub struct Resampler<'r> {
    envelope_cache: Arc<EnvelopeReprojectionCache>,
    source: &'r RasterValue,
    clip_envelope: Option<(Envelope, Option<SpatialReference>)>,
    target_crs: Option<SpatialReference>,
    cell_size: Option<(f64, CellSizeUnit)>,
    method: ResamplingMethod,
}

#[derive(Debug, Clone)]
pub struct ResamplerBuilder<'r> {
    envelope_cache: Arc<EnvelopeReprojectionCache>,
    source: Option<&'r RasterValue>,
    clip_envelope: Option<(Envelope, Option<SpatialReference>)>,
    target_crs: Option<SpatialReference>,
    cell_size: Option<f64>,
    cell_size_unit: Option<CellSizeUnit>,
    method: Option<ResamplingMethod>,
}

impl<'r> ResamplerBuilder<'r> {
    pub fn new(envelope_cache: Arc<EnvelopeReprojectionCache>) -> Self {
        Self {
            envelope_cache,
            source: None,
            clip_envelope: None,
            target_crs: None,
            cell_size: None,
            cell_size_unit: None,
            method: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: &'r RasterValue) -> Self {
        self.source = Some(source);
        self
    }

    /// Clips the result to an envelope given in the source's reference system
    #[must_use]
    pub fn clip_envelope(mut self, envelope: Envelope) -> Self {
        self.clip_envelope = Some((envelope, None));
        self
    }

    /// Clips the result to an envelope given in an arbitrary reference system
    #[must_use]
    pub fn clip_envelope_in(mut self, envelope: Envelope, crs: SpatialReference) -> Self {
        self.clip_envelope = Some((envelope, Some(crs)));
        self
    }

    #[must_use]
    pub fn target_crs(mut self, crs: SpatialReference) -> Self {
        self.target_crs = Some(crs);
        self
    }

    /// The requested cell size, in the configured default unit unless [`Self::cell_size_unit`] is set
    #[must_use]
    pub fn cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    #[must_use]
    pub fn cell_size_unit(mut self, unit: CellSizeUnit) -> Self {
        self.cell_size_unit = Some(unit);
        self
    }

    #[must_use]
    pub fn method(mut self, method: ResamplingMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// # Errors
    ///
    /// Fails if no source raster was given or if the `resampling` settings cannot be read
    ///
    pub fn build(self) -> Result<Resampler<'r>> {
        let source = self.source.context(error::MissingBuilderField {
            builder: "ResamplerBuilder",
            field: "source",
        })?;

        let defaults = if self.method.is_none() || self.cell_size_unit.is_none() {
            Some(get_config_element::<config::Resampling>()?)
        } else {
            None
        };

        let method = self
            .method
            .or(defaults.map(|d| d.default_method))
            .unwrap_or_default();

        let cell_size = self.cell_size.map(|cell_size| {
            let unit = self
                .cell_size_unit
                .or(defaults.map(|d| d.default_cell_size_unit))
                .unwrap_or_default();
            (cell_size, unit)
        });

        Ok(Resampler {
            envelope_cache: self.envelope_cache,
            source,
            clip_envelope: self.clip_envelope,
            target_crs: self.target_crs,
            cell_size,
            method,
        })
    }
}

impl<'r> Resampler<'r> {
    pub fn builder(envelope_cache: Arc<EnvelopeReprojectionCache>) -> ResamplerBuilder<'r> {
        ResamplerBuilder::new(envelope_cache)
    }

    pub fn method(&self) -> ResamplingMethod {
        self.method
    }

    /// The explicit target reference system, or the source's
    pub fn target_crs(&self) -> &SpatialReference {
        self.target_crs
            .as_ref()
            .unwrap_or_else(|| self.source.grid().crs())
    }

    /// The cell size in units of the target reference system, `None` lets the engine choose
    #[allow(clippy::float_cmp)]
    pub fn target_cell_size(&self) -> Option<f64> {
        let grid = self.source.grid();

        let Some((cell_size, unit)) = self.cell_size else {
            if grid.dx().abs() != grid.dy().abs() {
                debug!("source cells are not square, the engine chooses the cell size");
                return None;
            }

            if self.target_crs.is_none() || self.units_match(grid.crs(), self.target_crs()) {
                return Some(grid.dx().abs());
            }

            debug!("target units differ from the source units, the engine chooses the cell size");
            return None;
        };

        let target_unit = self.crs_unit(self.target_crs());
        let converted = target_unit
            .as_ref()
            .and_then(|target_unit| unit.convert_to(cell_size, target_unit));

        if converted.is_none() {
            warn!(
                "cannot express a cell size in {} in the units of the target reference system, \
                 the engine chooses the cell size",
                unit.display_name()
            );
        }

        converted
    }

    fn crs_unit(&self, crs: &SpatialReference) -> Option<CrsUnit> {
        match self.envelope_cache.reprojector().engine().parse_crs(crs) {
            Ok(definition) => definition.unit,
            Err(error) => {
                warn!("cannot read the unit of a reference system: {error}");
                None
            }
        }
    }

    fn units_match(&self, source: &SpatialReference, target: &SpatialReference) -> bool {
        match (self.crs_unit(source), self.crs_unit(target)) {
            (Some(source), Some(target)) => source.matches(&target),
            (None, None) => true,
            _ => false,
        }
    }

    /// The clip envelope in the target reference system, snapped to the cell size
    ///
    /// # Errors
    ///
    /// Fails if the envelope cannot be reprojected
    ///
    pub fn target_envelope(&self, cell_size: Option<f64>) -> Result<Option<Envelope>> {
        let Some((envelope, envelope_crs)) = &self.clip_envelope else {
            return Ok(None);
        };

        let envelope_crs = envelope_crs.as_ref().unwrap_or_else(|| self.source.grid().crs());
        let reprojected = self
            .envelope_cache
            .get(envelope, envelope_crs, self.target_crs())?;

        Ok(Some(match cell_size {
            Some(cell_size) => reprojected.snapped_to(cell_size),
            None => reprojected,
        }))
    }

    /// Warps the source onto the target grid
    ///
    /// # Errors
    ///
    /// Fails if the envelope cannot be reprojected or the engine cannot warp the raster
    ///
    #[tracing::instrument(level = "debug", skip(self), fields(method = %self.method))]
    pub fn resample(&self) -> Result<RasterValue> {
        let target_crs = self.target_crs();
        let target_cell_size = self.target_cell_size();
        let target_envelope = self.target_envelope(target_cell_size)?;

        debug!(
            "resampling to cell size {target_cell_size:?} within {}",
            target_envelope.map_or_else(|| "the full extent".to_string(), |e| e.to_string())
        );

        let warped = self
            .envelope_cache
            .reprojector()
            .engine()
            .warp(&WarpRequest {
                source: self.source,
                target_crs,
                target_envelope,
                target_cell_size,
                method: self.method,
            })?;

        let grid = warped.grid(target_crs.clone())?;

        Ok(self.source.derive(grid, warped.data)?)
    }
}
