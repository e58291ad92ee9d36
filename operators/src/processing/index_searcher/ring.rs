use hydrogrid_datatypes::primitives::{Coordinate2D, Envelope};

/// A closed ring with precomputed edge equations for repeated even-odd point tests.
///
/// The algorithm is taken from <http://alienryderflex.com/polygon/>
///
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedRing {
    /// corners without the closing coordinate
    corners: Vec<Coordinate2D>,
    constants: Vec<f64>,
    multiples: Vec<f64>,
    bounds: Envelope,
}

impl PreparedRing {
    /// `corners` must not repeat the first corner at the end
    pub fn new(corners: Vec<Coordinate2D>) -> Self {
        let number_of_corners = corners.len();
        let mut constants = vec![0.; number_of_corners];
        let mut multiples = vec![0.; number_of_corners];

        let mut j = number_of_corners.saturating_sub(1);
        for i in 0..number_of_corners {
            let c_i = corners[i];
            let c_j = corners[j];

            if float_cmp::approx_eq!(f64, c_j.y, c_i.y) {
                constants[i] = c_i.x;
                multiples[i] = 0.0;
            } else {
                constants[i] =
                    c_i.x - (c_i.y * c_j.x) / (c_j.y - c_i.y) + (c_i.y * c_i.x) / (c_j.y - c_i.y);
                multiples[i] = (c_j.x - c_i.x) / (c_j.y - c_i.y);
            }

            j = i;
        }

        let bounds = Envelope::from_coordinates(corners.iter().copied())
            .unwrap_or_else(|| Envelope::new_unchecked(0., 0., 0., 0.));

        Self {
            corners,
            constants,
            multiples,
            bounds,
        }
    }

    pub fn bounds(&self) -> &Envelope {
        &self.bounds
    }

    pub fn corners(&self) -> &[Coordinate2D] {
        &self.corners
    }

    pub fn contains(&self, coordinate: Coordinate2D) -> bool {
        if self.corners.len() < 3 || !self.bounds.contains_coordinate(coordinate) {
            return false;
        }

        let mut j = self.corners.len() - 1;
        let mut odd_nodes = false;

        for i in 0..self.corners.len() {
            let c_i = self.corners[i];
            let c_j = self.corners[j];

            if (c_i.y < coordinate.y && c_j.y >= coordinate.y)
                || (c_j.y < coordinate.y && c_i.y >= coordinate.y)
            {
                odd_nodes ^= coordinate.y * self.multiples[i] + self.constants[i] < coordinate.x;
            }

            j = i;
        }

        odd_nodes
    }

    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        // `Polygon::new` closes the ring
        geo::Polygon::new(
            self.corners
                .iter()
                .map(|&c| geo::Coord::from(c))
                .collect::<Vec<_>>()
                .into(),
            vec![],
        )
    }
}
