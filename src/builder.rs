use std::num::NonZero;
use std::ops::IndexMut;

use ndarray::{Array2, AssignElem};

use crate::error::GridError;
use crate::grid::{Grid, PathId};
use crate::location::{Dimension, Location};

/// Builds a [`Grid`] by placing pairs of terminals, assigning path-ids `1, 2, ...` in the order pairs are added.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// The first invalid placement is remembered and every later call does nothing until [`build`](Self::build) reports it.
#[derive(Clone, Debug)]
pub struct GridBuilder {
    // width, height
    dims: (Dimension, Dimension),
    cells: Array2<Option<PathId>>,
    pairs: Vec<(Location, Location)>,
    invalid_reasons: Vec<GridError>,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::<usize>::MIN.saturating_add(4), NonZero::<usize>::MIN.saturating_add(4)))
    }
}

impl GridBuilder {
    /// Construct an empty builder with the specified dimensions, in `(width, height)` order.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            // row major
            cells: Array2::from_elem((dims.1.get(), dims.0.get()), None),
            pairs: Default::default(),
            invalid_reasons: Default::default(),
        }
    }

    /// Add the two terminals of the next path. The order in which `locations` are specified does not matter.
    ///
    /// Invalidates the builder if either location is out of bounds or already holds a terminal.
    pub fn add_termini(&mut self, locations: (Location, Location)) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        for location in [locations.0, locations.1] {
            if !location.within(self.dims) {
                self.invalid_reasons.push(GridError::OutOfBounds { location });
                return self;
            }
            if self.cells[location.as_index()].is_some() {
                self.invalid_reasons.push(GridError::Occupied { location });
                return self;
            }
        }

        if locations.0 == locations.1 {
            self.invalid_reasons.push(GridError::Occupied { location: locations.1 });
            return self;
        }

        // path ids start at 1
        let path = self.pairs.len() + 1;
        self.pairs.push(locations);
        for location in [locations.0, locations.1] {
            self.cells.index_mut(location.as_index()).assign_elem(Some(path));
        }

        self
    }

    /// Remove the most recently added pair of terminals.
    ///
    /// If the builder is in an invalid state or no terminals are present, this function does nothing.
    pub fn pop_termini(&mut self) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if let Some((first, second)) = self.pairs.pop() {
            for location in [first, second] {
                self.cells.index_mut(location.as_index()).assign_elem(None);
            }
        }

        self
    }

    /// Returns the reasons this builder became invalid, or `None` if it is valid.
    pub fn is_valid(&self) -> Option<&Vec<GridError>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Validate and convert the state of this builder into a [`Grid`].
    pub fn build(&self) -> Result<Grid, GridError> {
        if let Some(reason) = self.invalid_reasons.first() {
            return Err(reason.clone());
        }

        Grid::from_cells(self.cells.clone())
    }
}
