use super::Coordinate2D;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// An axis-aligned bounding box `(min_x, max_x, min_y, max_y)`.
/// Note: may degenerate to a point!
#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase", try_from = "EnvelopeDef")]
pub struct Envelope {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDef {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl TryFrom<EnvelopeDef> for Envelope {
    type Error = error::Error;

    fn try_from(def: EnvelopeDef) -> Result<Self> {
        Self::new(def.min_x, def.max_x, def.min_y, def.max_y)
    }
}

impl Envelope {
    /// Creates a new envelope
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::primitives::Envelope;
    ///
    /// let envelope = Envelope::new(0.0, 10.0, -5.0, 5.0).unwrap();
    ///
    /// assert_eq!(envelope.width(), 10.0);
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the bounds are not in order
    ///
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self> {
        ensure!(
            min_x <= max_x && min_y <= max_y,
            error::InvalidEnvelope {
                min_coordinate: Coordinate2D::new(min_x, min_y),
                max_coordinate: Coordinate2D::new(max_x, max_y),
            }
        );
        Ok(Self::new_unchecked(min_x, max_x, min_y, max_y))
    }

    /// Creates a new envelope without checking the order of the bounds
    pub fn new_unchecked(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn from_min_max(min: Coordinate2D, max: Coordinate2D) -> Result<Self> {
        Self::new(min.x, max.x, min.y, max.y)
    }

    /// Creates the smallest envelope that contains all coordinates, `None` for an empty input
    pub fn from_coordinates<I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate2D>,
    {
        let mut iter = coordinates.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), c| {
            (min.min_elements(c), max.max_elements(c))
        });
        Some(Self::new_unchecked(min.x, max.x, min.y, max.y))
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn min_coordinate(&self) -> Coordinate2D {
        Coordinate2D::new(self.min_x, self.min_y)
    }

    pub fn max_coordinate(&self) -> Coordinate2D {
        Coordinate2D::new(self.max_x, self.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coordinate2D {
        Coordinate2D::new(
            (self.min_x + self.max_x) / 2.,
            (self.min_y + self.max_y) / 2.,
        )
    }

    /// Checks if a coordinate lies inside the envelope or on its boundary
    pub fn contains_coordinate(&self, coordinate: Coordinate2D) -> bool {
        (self.min_x..=self.max_x).contains(&coordinate.x)
            && (self.min_y..=self.max_y).contains(&coordinate.y)
    }

    pub fn contains_envelope(&self, other: &Self) -> bool {
        self.contains_coordinate(other.min_coordinate())
            && self.contains_coordinate(other.max_coordinate())
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// The overlapping area of two envelopes, `None` if they are disjoint
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }

        Some(Self::new_unchecked(
            self.min_x.max(other.min_x),
            self.max_x.min(other.max_x),
            self.min_y.max(other.min_y),
            self.max_y.min(other.max_y),
        ))
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new_unchecked(
            self.min_x.min(other.min_x),
            self.max_x.max(other.max_x),
            self.min_y.min(other.min_y),
            self.max_y.max(other.max_y),
        )
    }

    /// Rounds the bounds outwards to multiples of `cell_size`.
    ///
    /// A non-finite or non-positive cell size leaves the envelope untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrogrid_datatypes::primitives::Envelope;
    ///
    /// let envelope = Envelope::new(12.0, 88.0, 12.0, 88.0).unwrap();
    /// let snapped = envelope.snapped_to(10.0);
    ///
    /// assert_eq!(snapped, Envelope::new(10.0, 90.0, 10.0, 90.0).unwrap());
    /// ```
    ///
    #[must_use]
    pub fn snapped_to(&self, cell_size: f64) -> Self {
        if !cell_size.is_finite() || cell_size <= 0. {
            return *self;
        }

        Self::new_unchecked(
            (self.min_x / cell_size).floor() * cell_size,
            (self.max_x / cell_size).ceil() * cell_size,
            (self.min_y / cell_size).floor() * cell_size,
            (self.max_y / cell_size).ceil() * cell_size,
        )
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

impl From<Envelope> for geo::Rect<f64> {
    fn from(envelope: Envelope) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord::from(envelope.min_coordinate()),
            geo::Coord::from(envelope.max_coordinate()),
        )
    }
}

impl From<geo::Rect<f64>> for Envelope {
    fn from(rect: geo::Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new_unchecked(min.x, max.x, min.y, max.y)
    }
}
