use crate::error;
use crate::util::Result;
use hydrogrid_datatypes::primitives::Envelope;
use hydrogrid_datatypes::raster::{Grid, RasterValue};
use snafu::OptionExt;
use tracing::debug;

/// A rectangle of cells, in pixel space of the source grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub offset_x: usize,
    pub offset_y: usize,
    pub nx: usize,
    pub ny: usize,
}

impl PixelWindow {
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}

/// Clips a raster to an envelope in the raster's own reference system.
///
/// Every cell that intersects the envelope is kept. Nothing is reprojected,
/// an envelope in another reference system gives a meaningless result.
#[derive(Debug, Clone)]
pub struct Subsetter<'r> {
    source: &'r RasterValue,
    envelope: Envelope,
}

#[derive(Debug, Clone, Default)]
pub struct SubsetterBuilder<'r> {
    source: Option<&'r RasterValue>,
    envelope: Option<Envelope>,
}

impl<'r> SubsetterBuilder<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn source(mut self, source: &'r RasterValue) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn build(self) -> Result<Subsetter<'r>> {
        Ok(Subsetter {
            source: self.source.context(error::MissingBuilderField {
                builder: "SubsetterBuilder",
                field: "source",
            })?,
            envelope: self.envelope.context(error::MissingBuilderField {
                builder: "SubsetterBuilder",
                field: "envelope",
            })?,
        })
    }
}

impl<'r> Subsetter<'r> {
    pub fn builder() -> SubsetterBuilder<'r> {
        SubsetterBuilder::new()
    }

    /// The cells covered by the envelope, clamped to the grid
    pub fn window(&self) -> PixelWindow {
        let grid = self.source.grid();

        let (offset_x, end_x) = axis_window(
            grid.origin_x(),
            grid.dx(),
            grid.nx(),
            self.envelope.min_x(),
            self.envelope.max_x(),
        );
        let (offset_y, end_y) = axis_window(
            grid.origin_y(),
            grid.dy(),
            grid.ny(),
            self.envelope.min_y(),
            self.envelope.max_y(),
        );

        PixelWindow {
            offset_x,
            offset_y,
            nx: end_x - offset_x,
            ny: end_y - offset_y,
        }
    }

    /// Copies the window into a new raster
    ///
    /// # Errors
    ///
    /// Fails if the clipped grid is invalid
    ///
    pub fn subset(&self) -> Result<RasterValue> {
        let grid = self.source.grid();
        let window = self.window();

        if window.is_empty() {
            debug!("envelope {} does not overlap the grid", self.envelope);
        }

        let subset_grid = Grid::new(
            grid.origin_x() + window.offset_x as f64 * grid.dx(),
            grid.origin_y() + window.offset_y as f64 * grid.dy(),
            grid.dx(),
            grid.dy(),
            window.nx,
            window.ny,
            grid.crs().clone(),
        )?;

        let data = if window.is_empty() {
            Vec::new()
        } else {
            let source = self.source.data();
            (window.offset_y..window.offset_y + window.ny)
                .flat_map(|row| {
                    let start = row * grid.nx() + window.offset_x;
                    source[start..start + window.nx].iter().copied()
                })
                .collect()
        };

        Ok(self.source.derive(subset_grid, data)?)
    }
}

/// The clamped range `start..end` of cells along one axis that intersect `[min, max]`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_window(origin: f64, cell_size: f64, n: usize, min: f64, max: f64) -> (usize, usize) {
    // with a negative cell size the first cell holds the largest coordinates
    let (near, far) = if cell_size > 0. {
        ((min - origin) / cell_size, (max - origin) / cell_size)
    } else {
        ((origin - max) / cell_size.abs(), (origin - min) / cell_size.abs())
    };

    let n = n as f64;
    let start = near.floor().max(0.).min(n);
    let end = far.ceil().max(start).min(n);

    (start as usize, end as usize)
}
