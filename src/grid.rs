use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::num::NonZero;
use std::ops::RangeInclusive;
use std::str::FromStr;

use itertools::Itertools;
use ndarray::Array2;
use strum::VariantArray;

use crate::error::GridError;
use crate::location::{Dimension, Location};
use crate::shape::SquareStep;

/// Identifies one path, and the label printed on its two terminals. Valid ids are `1..=P`.
pub type PathId = usize;

/// The marker for a cell without a terminal in the textual puzzle format.
pub const EMPTY_MARKER: &str = ".";
/// Separates cells within a row in the textual puzzle format.
pub const CELL_DELIMITER: char = ',';

/// A validated Numberlink puzzle: a rectangular grid in which every path-id `1..=P` labels exactly two terminal cells.
///
/// A [`Grid`] never changes once built. Construct one with [`Grid::from_cells`], by parsing text with [`str::parse`], or with a [`GridBuilder`](crate::builder::GridBuilder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    // width, height
    dims: (Dimension, Dimension),
    cells: Array2<Option<PathId>>,
    // termini of path p live at index p - 1, first in row-major order
    termini: Vec<(Location, Location)>,
}

impl Grid {
    /// Validate a row-major array of cells, each empty or carrying a path-id.
    ///
    /// Fails if the array is empty, if labels are not exactly `1..=P`, or if any label appears other than twice.
    pub fn from_cells(cells: Array2<Option<PathId>>) -> Result<Self, GridError> {
        let (Some(height), Some(width)) = (NonZero::new(cells.nrows()), NonZero::new(cells.ncols())) else {
            return Err(GridError::Empty);
        };

        let mut found: BTreeMap<PathId, Vec<Location>> = BTreeMap::new();
        for (index, cell) in cells.indexed_iter() {
            if let Some(path) = cell {
                found.entry(*path).or_default().push(Location::from(index));
            }
        }

        let num_paths = found.len();
        if let Some(missing) = (1..=num_paths).find(|path| !found.contains_key(path)) {
            return Err(GridError::LabelGap { expected_max: num_paths, missing });
        }

        let mut termini = Vec::with_capacity(num_paths);
        for (path, locations) in found {
            match locations.as_slice() {
                [first, second] => termini.push((*first, *second)),
                _ => return Err(GridError::TerminusCount { path, count: locations.len() }),
            }
        }

        Ok(Self {
            dims: (width, height),
            cells,
            termini,
        })
    }

    pub fn width(&self) -> usize {
        self.dims.0.get()
    }

    pub fn height(&self) -> usize {
        self.dims.1.get()
    }

    /// `(width, height)`.
    pub fn dims(&self) -> (Dimension, Dimension) {
        self.dims
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// P, the number of distinct paths.
    pub fn num_paths(&self) -> usize {
        self.termini.len()
    }

    /// All valid path-ids, `1..=P`.
    pub fn paths(&self) -> RangeInclusive<PathId> {
        1..=self.num_paths()
    }

    /// The terminal label at `location`, if any.
    pub fn label_at(&self, location: Location) -> Option<PathId> {
        self.cells.get(location.as_index()).copied().flatten()
    }

    pub fn is_terminus(&self, location: Location) -> bool {
        self.label_at(location).is_some()
    }

    /// Both terminals of `path`, the first in row-major order leading.
    pub fn termini(&self, path: PathId) -> Option<(Location, Location)> {
        path.checked_sub(1).and_then(|index| self.termini.get(index)).copied()
    }

    /// Every location in row-major order.
    pub fn locations(&self) -> impl Iterator<Item=Location> + '_ {
        self.cells.indexed_iter().map(|(index, _)| Location::from(index))
    }

    /// Grid-adjacent neighbors of `location`, in [`SquareStep`] declaration order.
    pub fn neighbors(&self, location: Location) -> Vec<(SquareStep, Location)> {
        SquareStep::VARIANTS.iter()
            .filter_map(|dir| dir.attempt_from(location, self.dims).map(|neighbor| (*dir, neighbor)))
            .collect_vec()
    }

    pub fn cells(&self) -> &Array2<Option<PathId>> {
        &self.cells
    }
}

impl FromStr for Grid {
    type Err = GridError;

    /// Parse rows separated by line breaks, cells separated by [`CELL_DELIMITER`], each cell [`EMPTY_MARKER`] or a positive path-id.
    /// Blank lines are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows = s.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split(CELL_DELIMITER).map(str::trim).collect_vec())
            .collect_vec();

        let width = rows.first().map(Vec::len).ok_or(GridError::Empty)?;
        let mut cells = Vec::with_capacity(rows.len() * width);

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::Ragged { row: y, expected: width, found: row.len() });
            }

            for (x, token) in row.iter().enumerate() {
                if *token == EMPTY_MARKER {
                    cells.push(None);
                    continue;
                }

                match token.parse::<PathId>() {
                    Ok(path) if path > 0 => cells.push(Some(path)),
                    _ => return Err(GridError::BadToken { token: token.to_string(), location: Location(x, y) }),
                }
            }
        }

        let cells = Array2::from_shape_vec((rows.len(), width), cells)
            .map_err(|_| GridError::Empty)?;
        Self::from_cells(cells)
    }
}

impl Display for Grid {
    /// Writes the puzzle back in the textual format accepted by [`Grid::from_str`].
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.rows() {
            let line = row.iter()
                .map(|cell| cell.map_or_else(|| EMPTY_MARKER.to_string(), |path| path.to_string()))
                .join(&CELL_DELIMITER.to_string());
            writeln!(f, "{line}")?;
        }

        Ok(())
    }
}
