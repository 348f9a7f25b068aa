use std::fmt::{Display, Formatter};
use std::num::NonZero;

use ndarray::Ix;

pub(crate) type Coord = usize;
/// A board dimension; boards are never empty along either axis.
pub type Dimension = NonZero<Coord>;

/// A location `(x, y)` on a grid. The top left corner is `Location(0, 0)`; `x` counts columns and `y` counts rows.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    /// The `(row, column)` index of this location in a row-major [`ndarray::Array2`].
    pub fn as_index(&self) -> (Coord, Coord) {
        (self.1, self.0)
    }

    // out-of-bounds results wrap around and are rejected by the caller's bounds check
    pub(crate) fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    pub(crate) fn within(&self, dims: (Dimension, Dimension)) -> bool {
        self.0 < dims.0.get() && self.1 < dims.1.get()
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.1, value.0)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // row, column reads naturally next to the printed board
        write!(f, "(row {}, col {})", self.1, self.0)
    }
}
